//! Solver-agnostic collision world contract.
//!
//! Any solver (rapier3d, an in-memory scripted fake) implements
//! [`CollisionWorld`] and is handed to the vehicle by value. The vehicle only
//! talks to the world through ids and copied-out state, never through
//! references into solver internals.

use podracer_core::prelude::*;

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// Collision shape of a rigid body, expressed in body space.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyShape {
    Cuboid { half_extents: Vec3 },
    Ball { radius: Real },
    ConvexHull { points: Vec<Point3> },
}

/// Everything needed to register one rigid body.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyDesc {
    pub shape: BodyShape,
    /// Mass in kg. Zero yields a fixed body.
    pub mass: Real,
    pub transform: Iso3,
    pub group: CollisionGroup,
    pub collides_with: CollisionGroup,
    pub linear_damping: Real,
    pub angular_damping: Real,
}

impl RigidBodyDesc {
    pub fn is_fixed(&self) -> bool {
        self.mass <= 0.0
    }
}

/// Six-axis joint between two bodies. Every axis is locked except for the
/// `[lo, hi]` play given per axis.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDesc {
    /// Joint frame origin in the first body's space.
    pub anchor_a: Point3,
    /// Joint frame origin in the second body's space.
    pub anchor_b: Point3,
    pub linear_limits: [[Real; 2]; 3],
    pub angular_limits: [[Real; 2]; 3],
}

/// One raycast wheel, in chassis space.
#[derive(Debug, Clone, PartialEq)]
pub struct WheelDesc {
    pub connection: Point3,
    /// Suspension ray direction (usually -Y).
    pub suspension_dir: Vec3,
    pub axle: Vec3,
    pub rest_length: Real,
    pub radius: Real,
    pub suspension_stiffness: Real,
    pub damping_compression: Real,
    pub damping_relaxation: Real,
    pub friction_slip: Real,
    pub roll_influence: Real,
    pub max_suspension_travel: Real,
}

/// Per-wheel drive command for the next step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelControl {
    pub engine_force: Real,
    pub brake: Real,
    pub steering: Real,
}

/// Material of a cloth-like soft body.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftBodyMaterial {
    pub total_mass: Real,
    pub stiffness: Real,
    pub bending_stiffness: Real,
    pub pose_matching: Real,
    pub iterations: u32,
    pub damping: Real,
    /// Capsule radius along each cloth edge in [`CollisionWorld::contact_test`].
    pub contact_margin: Real,
    pub group: CollisionGroup,
}

impl Default for SoftBodyMaterial {
    fn default() -> Self {
        Self {
            total_mass: 1.0,
            stiffness: 0.9,
            bending_stiffness: 0.4,
            pose_matching: 0.2,
            iterations: 8,
            damping: 0.02,
            contact_margin: 0.05,
            group: CollisionGroup::POD,
        }
    }
}

// ---------------------------------------------------------------------------
// Readback / queries
// ---------------------------------------------------------------------------

/// Motion state copied out of the world after a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub transform: Iso3,
    pub linvel: Vec3,
    pub angvel: Vec3,
}

impl BodyState {
    pub fn at_rest(transform: Iso3) -> Self {
        Self {
            transform,
            linvel: Vec3::zeros(),
            angvel: Vec3::zeros(),
        }
    }
}

/// What is being tested for overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactProbe {
    Rigid(BodyId),
    /// Every structural edge is tested as a capsule of the material's contact margin.
    Soft(SoftBodyId),
}

/// What the probe is tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactTarget {
    World,
    Collider(ColliderId),
}

/// One collider overlapping a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawContact {
    pub collider: ColliderId,
    pub group: CollisionGroup,
    /// Set for static track colliders.
    pub surface: Option<SurfaceKind>,
    /// Set for colliders attached to a rigid body.
    pub owner: Option<BodyId>,
}

// ---------------------------------------------------------------------------
// CollisionWorld
// ---------------------------------------------------------------------------

/// Single authority over rigid bodies, soft bodies and static colliders.
///
/// Per-frame operations never fail: unknown ids are ignored and queries return
/// empty results.
pub trait CollisionWorld: Send + Sync {
    /// Human-readable solver name (e.g., "rapier3d").
    fn name(&self) -> &str;

    /// Register an immovable triangle mesh. Logs and returns `None` for an
    /// empty or malformed mesh. Lap-boundary meshes become sensors.
    fn add_static_collider(
        &mut self,
        mesh: &TriangleMesh,
        group: CollisionGroup,
        surface: SurfaceKind,
    ) -> Option<ColliderId>;

    /// Number of registered static colliders.
    fn static_collider_count(&self) -> usize;

    fn add_rigid_body(&mut self, desc: &RigidBodyDesc) -> Result<BodyId, PhysicsError>;

    /// Remove a rigid body together with its colliders, joints and wheels.
    fn remove_body(&mut self, body: BodyId) -> Result<(), PhysicsError>;

    fn link_bodies(&mut self, a: BodyId, b: BodyId, link: &LinkDesc)
    -> Result<JointId, PhysicsError>;

    /// Attach raycast wheels to `chassis`. Only one chassis per world.
    fn attach_wheels(&mut self, chassis: BodyId, wheels: &[WheelDesc]) -> Result<(), PhysicsError>;

    /// Drive command for wheel `index` (attach order). Unknown indices are ignored.
    fn set_wheel_control(&mut self, index: usize, control: WheelControl);

    /// Allow or lock angular response about each body-space axis.
    fn set_enabled_rotations(&mut self, body: BodyId, enabled: [bool; 3]);

    fn add_soft_body(
        &mut self,
        nodes: &[Point3],
        faces: &[[u32; 3]],
        material: &SoftBodyMaterial,
    ) -> Result<SoftBodyId, PhysicsError>;

    /// Pin `node` to `body` at its current body-relative position.
    fn anchor_soft_node(
        &mut self,
        soft: SoftBodyId,
        node: usize,
        body: BodyId,
    ) -> Result<(), PhysicsError>;

    /// Advance every body by exactly `dt`, subdivided into `substeps`.
    fn step(&mut self, dt: Real, substeps: u32);

    fn body_state(&self, body: BodyId) -> Option<BodyState>;

    /// Teleport with zero velocity and cleared forces.
    fn reset_body(&mut self, body: BodyId, transform: &Iso3);

    /// Current node positions, in creation order.
    fn soft_body_nodes(&self, soft: SoftBodyId) -> Option<&[Point3]>;

    /// Overwrite node positions and zero their velocity. Anchors are kept.
    fn reset_soft_body(&mut self, soft: SoftBodyId, nodes: &[Point3]);

    /// One-shot overlap query, de-duplicated per collider.
    fn contact_test(&self, probe: ContactProbe, target: ContactTarget) -> Vec<RawContact>;
}

impl<T: CollisionWorld + ?Sized> CollisionWorld for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn add_static_collider(
        &mut self,
        mesh: &TriangleMesh,
        group: CollisionGroup,
        surface: SurfaceKind,
    ) -> Option<ColliderId> {
        (**self).add_static_collider(mesh, group, surface)
    }
    fn static_collider_count(&self) -> usize {
        (**self).static_collider_count()
    }
    fn add_rigid_body(&mut self, desc: &RigidBodyDesc) -> Result<BodyId, PhysicsError> {
        (**self).add_rigid_body(desc)
    }
    fn remove_body(&mut self, body: BodyId) -> Result<(), PhysicsError> {
        (**self).remove_body(body)
    }
    fn link_bodies(
        &mut self,
        a: BodyId,
        b: BodyId,
        link: &LinkDesc,
    ) -> Result<JointId, PhysicsError> {
        (**self).link_bodies(a, b, link)
    }
    fn attach_wheels(&mut self, chassis: BodyId, wheels: &[WheelDesc]) -> Result<(), PhysicsError> {
        (**self).attach_wheels(chassis, wheels)
    }
    fn set_wheel_control(&mut self, index: usize, control: WheelControl) {
        (**self).set_wheel_control(index, control);
    }
    fn set_enabled_rotations(&mut self, body: BodyId, enabled: [bool; 3]) {
        (**self).set_enabled_rotations(body, enabled);
    }
    fn add_soft_body(
        &mut self,
        nodes: &[Point3],
        faces: &[[u32; 3]],
        material: &SoftBodyMaterial,
    ) -> Result<SoftBodyId, PhysicsError> {
        (**self).add_soft_body(nodes, faces, material)
    }
    fn anchor_soft_node(
        &mut self,
        soft: SoftBodyId,
        node: usize,
        body: BodyId,
    ) -> Result<(), PhysicsError> {
        (**self).anchor_soft_node(soft, node, body)
    }
    fn step(&mut self, dt: Real, substeps: u32) {
        (**self).step(dt, substeps);
    }
    fn body_state(&self, body: BodyId) -> Option<BodyState> {
        (**self).body_state(body)
    }
    fn reset_body(&mut self, body: BodyId, transform: &Iso3) {
        (**self).reset_body(body, transform);
    }
    fn soft_body_nodes(&self, soft: SoftBodyId) -> Option<&[Point3]> {
        (**self).soft_body_nodes(soft)
    }
    fn reset_soft_body(&mut self, soft: SoftBodyId, nodes: &[Point3]) {
        (**self).reset_soft_body(soft, nodes);
    }
    fn contact_test(&self, probe: ContactProbe, target: ContactTarget) -> Vec<RawContact> {
        (**self).contact_test(probe, target)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
