// podracer-vehicle: The pod itself, built on any `CollisionWorld`.
//
// Engine start-up and drive forces, the chariot/reactor chassis with its
// wheels, the two power cables, contact classification into race events,
// procedural part animation, the power-coupling arc and race progress. The
// `Podracer` type ties them together and runs one frame per `step`.

pub mod animation;
pub mod cable;
pub mod chassis;
pub mod classifier;
pub mod engine;
pub mod geometry;
pub mod pod;
pub mod power;
pub mod progress;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        animation::{PartAnimation, PartTransforms},
        cable::{CableBody, CableSide},
        chassis::{ChassisPose, PodChassis},
        classifier::{ContactClassifier, LapGate, classify_surfaces},
        engine::{EngineStage, EngineState, WHEEL_COUNT, steering_clamp},
        geometry::{PodGeometry, cable_ribbon},
        pod::{PodFrame, Podracer},
        power::{BoltVertex, PowerArc},
        progress::RaceProgress,
    };
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify the prelude re-exports compile.
    #[test]
    fn prelude_exports() {
        use prelude::*;

        let _engine = EngineState::new();
        let _gate = LapGate::default();
        let _progress = RaceProgress::default();
        let _animation = PartAnimation::default();
        assert_eq!(CableSide::BOTH.len(), 2);
        assert_eq!(WHEEL_COUNT, 4);
    }
}
