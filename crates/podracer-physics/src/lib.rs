// podracer-physics: Solver-agnostic collision world for the podracer.
//
// Provides a `CollisionWorld` trait so the concrete solver (rapier3d, a
// scripted in-memory fake) can be swapped without changing the vehicle. The
// cable cloth solver and the static track collider builder sit on top of it.

pub mod backend;
pub mod cloth;
pub mod rapier;
pub mod track;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        backend::{
            BodyShape, BodyState, CollisionWorld, ContactProbe, ContactTarget, LinkDesc,
            RawContact, RigidBodyDesc, SoftBodyMaterial, WheelControl, WheelDesc,
        },
        cloth::ClothBody,
        rapier::RapierWorld,
        track::{TrackColliders, build_track_colliders},
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

        fn _accepts_world(_: &dyn CollisionWorld) {}

        let _control = WheelControl::default();
        let _material = SoftBodyMaterial::default();
        let _colliders = TrackColliders::default();
    }
}
