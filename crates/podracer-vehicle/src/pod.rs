//! The podracer as one steppable unit.
//!
//! [`Podracer`] owns the collision world and every vehicle-side piece built on
//! it. One call to [`Podracer::step`] runs a whole frame in a fixed order:
//! engine update, drive commands, physics step, readback, contact
//! classification, animation, race bookkeeping.

use std::time::Duration;

use podracer_core::prelude::*;
use podracer_physics::prelude::*;
use tracing::{debug, info, warn};

use crate::animation::{PartAnimation, PartTransforms};
use crate::cable::{CableBody, CableSide};
use crate::chassis::{ChassisPose, PodChassis};
use crate::classifier::ContactClassifier;
use crate::engine::{EngineStage, EngineState};
use crate::geometry::PodGeometry;
use crate::power::PowerArc;
use crate::progress::RaceProgress;

// ---------------------------------------------------------------------------
// PodFrame
// ---------------------------------------------------------------------------

/// Everything a renderer or HUD needs from one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PodFrame {
    pub parts: PartTransforms,
    /// Reactor block speed in km/h; zero until the turbojet runs.
    pub speed_kmh: f32,
    pub stage: EngineStage,
    pub afterburn: bool,
    pub contacts: ContactEvent,
    /// Reactor block forward axis in world space.
    pub direction: Vec3,
    /// Race time at the end of the step.
    pub time: SimTime,
    /// Set on the step that completed a lap.
    pub lap_time: Option<Duration>,
}

// ---------------------------------------------------------------------------
// Podracer
// ---------------------------------------------------------------------------

pub struct Podracer<W: CollisionWorld> {
    world: W,
    config: PodConfig,
    track: TrackColliders,
    chassis: PodChassis,
    cables: [Option<CableBody>; 2],
    classifier: ContactClassifier,
    engine: EngineState,
    animation: PartAnimation,
    power: Option<PowerArc>,
    clock: RaceClock,
    progress: RaceProgress,
    pose: ChassisPose,
    speed_kmh: f32,
}

impl<W: CollisionWorld> Podracer<W> {
    /// Build the track and the pod at `spawn` inside `world`.
    ///
    /// The chassis is mandatory; a cable or connector set that cannot be used
    /// is logged and left out. A cable whose corners do not all resolve to a
    /// node is an error.
    pub fn new(
        mut world: W,
        geometry: &PodGeometry,
        track: &TrackGeometry,
        config: PodConfig,
        spawn: Iso3,
    ) -> Result<Self, PodracerError> {
        config.validate()?;

        let track = build_track_colliders(&mut world, track);
        let chassis = PodChassis::build(&mut world, &config, &spawn)?;
        let bodies = (chassis.chariot(), chassis.reactor());

        let mut cables = [None, None];
        for side in CableSide::BOTH {
            let mesh = match side {
                CableSide::Left => &geometry.cable_left,
                CableSide::Right => &geometry.cable_right,
            };
            match CableBody::build(&mut world, side, mesh, &spawn, bodies, &config.cable) {
                Ok(cable) => cables[side.index()] = Some(cable),
                Err(err @ PodracerError::Geometry(GeometryError::UnmatchedCorner { .. })) => {
                    return Err(err);
                }
                Err(err) => warn!(cable = %mesh.name, "leaving cable out: {err}"),
            }
        }

        let mut probes = vec![ContactProbe::Rigid(chassis.reactor())];
        probes.extend(cables.iter().flatten().map(|c| ContactProbe::Soft(c.soft_body())));
        let classifier = ContactClassifier::new(
            probes,
            vec![chassis.chariot(), chassis.reactor()],
            track.lap_boundary.clone(),
        );

        let power = PowerArc::new(&geometry.connector_left, &geometry.connector_right, &config.power)
            .inspect_err(|err| warn!("power arc disabled: {err}"))
            .ok();

        let pose = chassis.read(&world);
        let clock = RaceClock::new(config.sim.physics_dt);
        let progress = RaceProgress::new(config.race.laps);

        debug!(
            world = world.name(),
            colliders = track.len(),
            cables = cables.iter().flatten().count(),
            "podracer built"
        );

        Ok(Self {
            world,
            config,
            track,
            chassis,
            cables,
            classifier,
            engine: EngineState::new(),
            animation: PartAnimation::default(),
            power,
            clock,
            progress,
            pose,
            speed_kmh: 0.0,
        })
    }

    /// Run one fixed-interval frame.
    pub fn step(&mut self, input: &InputFrame) -> PodFrame {
        // Steering clamp sees the speed measured at the end of the last step.
        if let Some(stage) = self.engine.update(input, self.speed_kmh, &self.config.engine) {
            info!(stage = stage.name(), "engine stage entered");
        }
        self.chassis.apply(&mut self.world, &self.engine);

        self.world
            .step(self.clock.dt_secs(), self.config.sim.substeps);

        self.pose = self.chassis.read(&self.world);
        self.speed_kmh = if self.engine.turbojet_on() {
            self.pose.speed_kmh()
        } else {
            0.0
        };
        for cable in self.cables.iter_mut().flatten() {
            cable.sync(&self.world);
        }

        let contacts = self.classifier.classify(&self.world);

        self.animation.update(
            &self.engine,
            input,
            &self.config.animation,
            self.config.engine.max_engine_force,
        );
        let parts = self.animation.transforms(&self.pose, &self.config.animation);

        if let Some(power) = &mut self.power {
            if self.engine.power_coupling_on() {
                power.regenerate();
            } else {
                power.clear();
            }
        }

        self.clock.advance();
        let lap_time = self
            .progress
            .record(self.clock.time(), self.speed_kmh, &contacts);

        PodFrame {
            parts,
            speed_kmh: self.speed_kmh,
            stage: self.engine.stage(),
            afterburn: self.engine.afterburn_on(),
            contacts,
            direction: self.pose.direction(),
            time: self.clock.time(),
            lap_time,
        }
    }

    /// Put the whole pod back where it was built: engine idle, bodies home at
    /// rest, cables at their initial shape, animation and race state cleared.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.chassis.reset(&mut self.world);
        self.chassis.apply(&mut self.world, &self.engine);
        for cable in self.cables.iter_mut().flatten() {
            cable.reset(&mut self.world);
        }
        self.classifier.reset();
        self.animation.reset();
        if let Some(power) = &mut self.power {
            power.clear();
        }
        self.clock.reset();
        self.progress.reset();
        self.pose = self.chassis.home();
        self.speed_kmh = 0.0;
        info!("podracer reset");
    }

    /// Render buffer of one cable; empty if that cable was left out.
    pub fn cable_vertices(&self, side: CableSide) -> &[RenderVertex] {
        self.cables[side.index()]
            .as_ref()
            .map(CableBody::vertices)
            .unwrap_or_default()
    }

    pub fn cable(&self, side: CableSide) -> Option<&CableBody> {
        self.cables[side.index()].as_ref()
    }

    /// Reactor block forward axis in world space.
    pub fn pod_direction(&self) -> Vec3 {
        self.pose.direction()
    }

    pub const fn pose(&self) -> &ChassisPose {
        &self.pose
    }

    pub const fn speed_kmh(&self) -> f32 {
        self.speed_kmh
    }

    pub const fn engine(&self) -> &EngineState {
        &self.engine
    }

    pub const fn chassis(&self) -> &PodChassis {
        &self.chassis
    }

    pub const fn classifier(&self) -> &ContactClassifier {
        &self.classifier
    }

    pub const fn animation(&self) -> &PartAnimation {
        &self.animation
    }

    pub fn power_arc(&self) -> Option<&PowerArc> {
        self.power.as_ref()
    }

    pub const fn progress(&self) -> &RaceProgress {
        &self.progress
    }

    pub const fn clock(&self) -> &RaceClock {
        &self.clock
    }

    pub const fn track(&self) -> &TrackColliders {
        &self.track
    }

    pub const fn config(&self) -> &PodConfig {
        &self.config
    }

    pub const fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }
}

impl<W: CollisionWorld> std::fmt::Debug for Podracer<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Podracer")
            .field("world", &self.world.name())
            .field("stage", &self.engine.stage())
            .field("speed_kmh", &self.speed_kmh)
            .field("time", &self.clock.time())
            .field("laps", &self.progress.laps_done())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use podracer_test_utils::{ScriptedWorld, test_track};

    fn pod() -> Podracer<ScriptedWorld> {
        let config = PodConfig::default();
        Podracer::new(
            ScriptedWorld::default(),
            &PodGeometry::procedural(&config),
            &test_track(),
            config,
            Iso3::translation(0.0, 1.0, 0.0),
        )
        .unwrap()
    }

    fn pressed(f: impl FnOnce(&mut InputFrame)) -> InputFrame {
        let mut input = InputFrame::idle();
        f(&mut input);
        input
    }

    fn start(pod: &mut Podracer<ScriptedWorld>) {
        pod.step(&pressed(|i| i.power_coupling = true));
        pod.step(&pressed(|i| i.engine_start = true));
        pod.step(&pressed(|i| i.throttle = true));
    }

    #[test]
    fn builds_everything() {
        let pod = pod();
        assert_eq!(pod.world().body_count(), 2);
        assert_eq!(pod.world().soft_body_count(), 2);
        assert_eq!(pod.track().len(), 3);
        assert_eq!(pod.classifier().probes().len(), 3);
        assert!(pod.power_arc().is_some());
        assert!(!pod.cable_vertices(CableSide::Left).is_empty());
        assert!(pod.pod_direction().z > 0.99);
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = PodConfig::default();
        config.sim.substeps = 0;
        let result = Podracer::new(
            ScriptedWorld::default(),
            &PodGeometry::procedural(&PodConfig::default()),
            &test_track(),
            config,
            Iso3::identity(),
        );
        assert!(matches!(result, Err(PodracerError::Config(_))));
    }

    #[test]
    fn empty_cable_is_left_out() {
        let config = PodConfig::default();
        let mut geometry = PodGeometry::procedural(&config);
        geometry.cable_right = CableMesh::default();
        let pod = Podracer::new(
            ScriptedWorld::default(),
            &geometry,
            &test_track(),
            config,
            Iso3::identity(),
        )
        .unwrap();
        assert!(pod.cable(CableSide::Right).is_none());
        assert!(pod.cable_vertices(CableSide::Right).is_empty());
        assert!(pod.cable(CableSide::Left).is_some());
        assert_eq!(pod.world().soft_body_count(), 1);
    }

    #[test]
    fn missing_connectors_disable_power_arc() {
        let config = PodConfig::default();
        let mut geometry = PodGeometry::procedural(&config);
        geometry.connector_left.clear();
        let mut pod = Podracer::new(
            ScriptedWorld::default(),
            &geometry,
            &test_track(),
            config,
            Iso3::identity(),
        )
        .unwrap();
        assert!(pod.power_arc().is_none());
        start(&mut pod);
        assert_eq!(pod.engine().stage(), EngineStage::TurbojetRunning);
    }

    #[test]
    fn speed_is_zero_before_turbojet() {
        let mut pod = pod();
        let reactor = pod.chassis().reactor();
        pod.world_mut()
            .set_body_velocity(reactor, Vec3::new(0.0, 0.0, 10.0));
        let frame = pod.step(&InputFrame::idle());
        assert!(frame.speed_kmh.abs() < f32::EPSILON);
        assert_eq!(frame.stage, EngineStage::Idle);
    }

    #[test]
    fn power_arc_follows_coupling() {
        let mut pod = pod();
        pod.step(&InputFrame::idle());
        assert!(pod.power_arc().is_some_and(|p| p.vertices().is_empty()));
        pod.step(&pressed(|i| i.power_coupling = true));
        assert!(pod.power_arc().is_some_and(|p| !p.vertices().is_empty()));
        pod.reset();
        assert!(pod.power_arc().is_some_and(|p| p.vertices().is_empty()));
    }

    #[test]
    fn clock_advances_one_interval_per_step() {
        let mut pod = pod();
        for _ in 0..60 {
            pod.step(&InputFrame::idle());
        }
        assert_eq!(pod.clock().steps(), 60);
        let secs = pod.clock().time().secs_f64();
        assert!((secs - 1.0).abs() < 1e-6);
    }

    #[test]
    fn reset_returns_to_build_state() {
        let mut pod = pod();
        start(&mut pod);
        for _ in 0..30 {
            pod.step(&pressed(|i| {
                i.throttle = true;
                i.turn_left = true;
            }));
        }
        assert!(pod.speed_kmh() > 0.0);

        pod.reset();
        assert_eq!(pod.engine().stage(), EngineStage::Idle);
        assert_eq!(*pod.pose(), pod.chassis().home());
        assert_eq!(pod.chassis().read(pod.world()), pod.chassis().home());
        assert_eq!(pod.clock().steps(), 0);
        assert_eq!(*pod.animation(), PartAnimation::default());
        let cable = pod.cable(CableSide::Left).unwrap();
        assert_eq!(cable.vertices(), cable.initial_vertices());
        assert!(
            pod.world()
                .wheel_controls()
                .iter()
                .all(|c| *c == WheelControl::default())
        );
    }
}
