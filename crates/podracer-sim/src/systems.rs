//! Pod resources and the per-frame step system.

use std::time::Duration;

use bevy::prelude::*;
use podracer_core::prelude::*;
use podracer_physics::prelude::CollisionWorld;
use podracer_vehicle::prelude::*;
use tracing::info;

use crate::input::PodInput;

// ---------------------------------------------------------------------------
// ActivePod
// ---------------------------------------------------------------------------

/// The simulated pod, over whichever collision world it was built on.
#[derive(Resource, Debug)]
pub struct ActivePod(pub Podracer<Box<dyn CollisionWorld>>);

impl ActivePod {
    /// Build a pod and its track inside `world`.
    pub fn build(
        world: impl CollisionWorld + 'static,
        geometry: &PodGeometry,
        track: &TrackGeometry,
        config: PodConfig,
        spawn: Iso3,
    ) -> Result<Self, PodracerError> {
        let world: Box<dyn CollisionWorld> = Box::new(world);
        Podracer::new(world, geometry, track, config, spawn).map(Self)
    }
}

// ---------------------------------------------------------------------------
// PodTelemetry
// ---------------------------------------------------------------------------

/// What the last step produced, for HUD, audio and camera.
#[derive(Resource, Clone, Debug, Default)]
pub struct PodTelemetry {
    /// `None` until the first step and after a reset.
    pub frame: Option<PodFrame>,
    /// Steps since the last reset.
    pub steps: u64,
    /// Vertex count of the left and right cable buffers.
    pub cable_vertices: [usize; 2],
    /// Vertex count of the current power arc.
    pub power_vertices: usize,
}

impl PodTelemetry {
    pub fn speed_kmh(&self) -> f32 {
        self.frame.map_or(0.0, |f| f.speed_kmh)
    }

    pub fn stage(&self) -> EngineStage {
        self.frame.map_or(EngineStage::Idle, |f| f.stage)
    }

    pub fn contacts(&self) -> ContactEvent {
        self.frame.map(|f| f.contacts).unwrap_or_default()
    }

    fn record<W: CollisionWorld>(&mut self, frame: PodFrame, pod: &Podracer<W>) {
        self.frame = Some(frame);
        self.steps += 1;
        self.refresh_buffers(pod);
    }

    fn refresh_buffers<W: CollisionWorld>(&mut self, pod: &Podracer<W>) {
        self.cable_vertices = CableSide::BOTH.map(|side| pod.cable_vertices(side).len());
        self.power_vertices = pod.power_arc().map_or(0, |arc| arc.vertices().len());
    }
}

// ---------------------------------------------------------------------------
// RaceStatus
// ---------------------------------------------------------------------------

/// Race progress mirrored out of the pod after every step.
#[derive(Resource, Clone, Debug, Default)]
pub struct RaceStatus(pub RaceProgress);

/// Sent on the step that completes a lap.
#[derive(Event, Clone, Copy, Debug, PartialEq, Eq)]
pub struct LapCompleted {
    /// 1-based lap number.
    pub lap: u32,
    pub time: Duration,
    /// Set when this lap finished the race.
    pub finished: bool,
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// Step the pod once with the pending input, or reset it if asked to.
#[allow(clippy::needless_pass_by_value)]
pub fn pod_step_system(
    mut pod: ResMut<ActivePod>,
    mut input: ResMut<PodInput>,
    mut telemetry: ResMut<PodTelemetry>,
    mut race: ResMut<RaceStatus>,
    mut laps: EventWriter<LapCompleted>,
) {
    let pod = &mut pod.0;

    if input.reset {
        pod.reset();
        input.consume_presses();
        *telemetry = PodTelemetry::default();
        telemetry.refresh_buffers(pod);
        race.0.clone_from(pod.progress());
        return;
    }

    let frame = pod.step(&input.frame);
    input.consume_presses();
    telemetry.record(frame, pod);
    race.0.clone_from(pod.progress());

    if let Some(time) = frame.lap_time {
        let progress = pod.progress();
        laps.write(LapCompleted {
            lap: progress.laps_done(),
            time,
            finished: progress.finished(),
        });
        if progress.finished() {
            info!(
                laps = progress.laps_done(),
                total = %progress.total_time(),
                "race complete"
            );
        }
    }
}
