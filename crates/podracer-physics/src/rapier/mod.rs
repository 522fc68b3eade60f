//! Raw `rapier3d` collision world.
//!
//! We own the [`PhysicsPipeline`](rapier3d::pipeline::PhysicsPipeline) and
//! the raycast vehicle controller, call `step()` ourselves and keep the cable
//! cloth bodies next to the rigid sets.

pub mod backend;
pub mod bridge;
pub mod context;

pub use backend::RapierWorld;
pub use context::RapierContext;
