//! Plugins that wire the pod systems into an app.

use bevy::prelude::*;
use podracer_core::prelude::FIXED_DT;

use crate::input::{KeyboardBindings, PodInput, keyboard_input_system};
use crate::systems::{ActivePod, LapCompleted, PodTelemetry, RaceStatus, pod_step_system};

/// Ordering of the pod systems within one schedule run.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PodracerSet {
    /// Keyboard (or any other source) writes [`PodInput`].
    Input,
    /// The pod steps and publishes telemetry.
    Step,
}

fn insert_resources(app: &mut App) {
    app.init_resource::<PodInput>()
        .init_resource::<KeyboardBindings>()
        .init_resource::<PodTelemetry>()
        .init_resource::<RaceStatus>()
        .add_event::<LapCompleted>()
        .configure_sets(Update, (PodracerSet::Input, PodracerSet::Step).chain())
        .add_systems(
            Update,
            keyboard_input_system
                .run_if(resource_exists::<ButtonInput<KeyCode>>)
                .in_set(PodracerSet::Input),
        );
}

/// Steps the pod once per app update.
///
/// The pod itself is not created here: insert an [`ActivePod`] resource
/// once the track and world are ready. Until then nothing is stepped.
pub struct PodracerSimPlugin;

impl Plugin for PodracerSimPlugin {
    fn build(&self, app: &mut App) {
        insert_resources(app);
        app.add_systems(
            Update,
            pod_step_system
                .run_if(resource_exists::<ActivePod>)
                .in_set(PodracerSet::Step),
        );
    }
}

/// Steps the pod in `FixedUpdate` at the simulation rate, independent of the
/// render frame rate. Input is still read every frame.
pub struct PodracerSimPluginFixed;

impl Plugin for PodracerSimPluginFixed {
    fn build(&self, app: &mut App) {
        insert_resources(app);
        app.insert_resource(Time::<Fixed>::from_seconds(f64::from(FIXED_DT)))
            .add_systems(
                FixedUpdate,
                pod_step_system.run_if(resource_exists::<ActivePod>),
            );
    }
}
