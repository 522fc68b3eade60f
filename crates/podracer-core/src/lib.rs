// podracer-core: Types, config, clock and errors shared by the podracer crates.

pub mod config;
pub mod error;
pub mod time;
pub mod types;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        config::PodConfig,
        error::{ConfigError, GeometryError, PhysicsError, PodracerError},
        time::{FIXED_DT, RaceClock, SimTime},
        types::{
            BodyId, CableMesh, ColliderId, CollisionGroup, ContactEvent, InputFrame, Iso3,
            JointId, Point3, Real, RenderVertex, SoftBodyId, SurfaceKind, TrackGeometry,
            TriangleMesh, Vec3,
        },
    };
}
