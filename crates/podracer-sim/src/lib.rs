//! Bevy host for the podracer.
//!
//! - [`PodracerSimPlugin`] steps the pod once per app update
//! - [`PodracerSimPluginFixed`] steps it in `FixedUpdate` at the simulation rate
//! - [`KeyboardBindings`] maps keys to [`PodInput`]
//! - [`PodTelemetry`] and [`RaceStatus`] publish what each step produced
//!
//! # Example
//!
//! ```no_run
//! use bevy::prelude::*;
//! use podracer_core::prelude::*;
//! use podracer_physics::prelude::RapierWorld;
//! use podracer_sim::prelude::*;
//! use podracer_vehicle::prelude::PodGeometry;
//!
//! let config = PodConfig::default();
//! let pod = ActivePod::build(
//!     RapierWorld::from_config(&config.sim),
//!     &PodGeometry::procedural(&config),
//!     &TrackGeometry::default(),
//!     config,
//!     Iso3::identity(),
//! )
//! .unwrap();
//!
//! App::new()
//!     .add_plugins(DefaultPlugins)
//!     .add_plugins(PodracerSimPluginFixed)
//!     .insert_resource(pod)
//!     .run();
//! ```

pub mod input;
pub mod plugin;
pub mod systems;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use input::{KeyboardBindings, PodInput};
pub use plugin::{PodracerSet, PodracerSimPlugin, PodracerSimPluginFixed};
pub use systems::{ActivePod, LapCompleted, PodTelemetry, RaceStatus};

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        ActivePod, KeyboardBindings, LapCompleted, PodInput, PodTelemetry, PodracerSet,
        PodracerSimPlugin, PodracerSimPluginFixed, RaceStatus,
    };
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use bevy::prelude::*;
    use podracer_core::prelude::*;
    use podracer_physics::prelude::ContactProbe;
    use podracer_test_utils::{ScriptedWorld, test_track};
    use podracer_vehicle::prelude::*;

    use super::*;

    fn config(laps: u32) -> PodConfig {
        let mut config = PodConfig::default();
        config.race.laps = laps;
        config
    }

    fn spawn() -> Iso3 {
        Iso3::translation(0.0, 1.0, 0.0)
    }

    fn active_pod(world: ScriptedWorld, laps: u32) -> ActivePod {
        let config = config(laps);
        ActivePod::build(
            world,
            &PodGeometry::procedural(&config),
            &test_track(),
            config,
            spawn(),
        )
        .unwrap()
    }

    fn app_with(world: ScriptedWorld) -> App {
        let mut app = App::new();
        app.add_plugins(PodracerSimPlugin);
        app.insert_resource(active_pod(world, 1));
        app.finish();
        app.cleanup();
        app
    }

    fn app() -> App {
        app_with(ScriptedWorld::default())
    }

    fn press(app: &mut App, f: impl FnOnce(&mut InputFrame)) {
        f(&mut app.world_mut().resource_mut::<PodInput>().frame);
        app.update();
    }

    #[test]
    fn plugin_builds_without_pod() {
        let mut app = App::new();
        app.add_plugins(PodracerSimPlugin);
        app.finish();
        app.cleanup();
        app.update();

        assert!(app.world().get_resource::<PodInput>().is_some());
        assert!(app.world().get_resource::<KeyboardBindings>().is_some());
        assert!(app.world().resource::<PodTelemetry>().frame.is_none());
    }

    #[test]
    fn update_steps_pod_and_publishes_telemetry() {
        let mut app = app();
        app.update();
        app.update();

        let telemetry = app.world().resource::<PodTelemetry>();
        assert_eq!(telemetry.steps, 2);
        assert_eq!(telemetry.stage(), EngineStage::Idle);
        assert!(telemetry.cable_vertices.iter().all(|&n| n > 0));
        assert_eq!(app.world().resource::<ActivePod>().0.clock().steps(), 2);
    }

    #[test]
    fn presses_are_consumed_by_one_step() {
        let mut app = app();
        press(&mut app, |i| i.power_coupling = true);
        assert_eq!(
            app.world().resource::<PodTelemetry>().stage(),
            EngineStage::PowerCoupled
        );
        assert!(!app.world().resource::<PodInput>().frame.power_coupling);
        assert!(app.world().resource::<PodTelemetry>().power_vertices > 0);

        press(&mut app, |i| i.engine_start = true);
        press(&mut app, |i| i.throttle = true);
        assert_eq!(
            app.world().resource::<PodTelemetry>().stage(),
            EngineStage::TurbojetRunning
        );
        // Held keys stay set until the input source changes them.
        assert!(app.world().resource::<PodInput>().frame.throttle);
    }

    #[test]
    fn lap_completion_is_published() {
        // Ids are issued in build order, so a twin pod tells which probe and
        // gate the hosted one will get.
        let twin = Podracer::new(
            ScriptedWorld::default(),
            &PodGeometry::procedural(&config(1)),
            &test_track(),
            config(1),
            spawn(),
        )
        .unwrap();
        let probe = ContactProbe::Rigid(twin.chassis().reactor());
        let gate = twin.track().lap_boundary[0];

        let mut world = ScriptedWorld::default();
        world.touch(probe, gate);
        let mut app = app_with(world);
        app.update();

        let race = &app.world().resource::<RaceStatus>().0;
        assert_eq!(race.laps_done(), 1);
        assert!(race.finished());

        let events = app.world().resource::<Events<LapCompleted>>();
        let mut cursor = events.get_cursor();
        let sent: Vec<LapCompleted> = cursor.read(events).copied().collect();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].lap, 1);
        assert!(sent[0].finished);
    }

    #[test]
    fn reset_request_resets_pod() {
        let mut app = app();
        press(&mut app, |i| i.power_coupling = true);
        app.world_mut().resource_mut::<PodInput>().reset = true;
        app.update();

        let telemetry = app.world().resource::<PodTelemetry>();
        assert!(telemetry.frame.is_none());
        assert_eq!(telemetry.steps, 0);
        assert_eq!(telemetry.power_vertices, 0);
        let pod = &app.world().resource::<ActivePod>().0;
        assert_eq!(pod.engine().stage(), EngineStage::Idle);
        assert_eq!(pod.clock().steps(), 0);
        assert!(!app.world().resource::<PodInput>().reset);
    }

    #[test]
    fn fixed_plugin_steps_in_fixed_update() {
        let mut app = App::new();
        app.add_plugins(PodracerSimPluginFixed);
        app.insert_resource(active_pod(ScriptedWorld::default(), 3));
        app.finish();
        app.cleanup();

        app.world_mut().run_schedule(FixedUpdate);
        app.world_mut().run_schedule(FixedUpdate);
        assert_eq!(app.world().resource::<PodTelemetry>().steps, 2);

        let step = app.world().resource::<Time<Fixed>>().timestep();
        assert!((step.as_secs_f32() - FIXED_DT).abs() < 1e-6);
    }
}
