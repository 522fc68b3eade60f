//! Conversions from collision-world descriptors to rapier builders.

use podracer_core::prelude::*;
use rapier3d::control::WheelTuning;
use rapier3d::prelude::{
    Collider, ColliderBuilder, GenericJoint, GenericJointBuilder, Group, InteractionGroups,
    JointAxesMask, JointAxis, RigidBody, RigidBodyBuilder,
};

use crate::backend::{BodyShape, LinkDesc, RigidBodyDesc, WheelDesc};

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

pub fn group_bits(group: CollisionGroup) -> Group {
    Group::from_bits_truncate(group.bits())
}

/// Membership `group`, accepting pairs with `filter`.
pub fn interaction_groups(group: CollisionGroup, filter: CollisionGroup) -> InteractionGroups {
    InteractionGroups::new(group_bits(group), group_bits(filter))
}

/// Static track colliders only ever interact with the pod.
pub fn static_groups(group: CollisionGroup) -> InteractionGroups {
    interaction_groups(group, CollisionGroup::POD)
}

// ---------------------------------------------------------------------------
// Colliders
// ---------------------------------------------------------------------------

/// Immovable trimesh for a validated track mesh.
pub fn static_collider(
    mesh: &TriangleMesh,
    group: CollisionGroup,
    surface: SurfaceKind,
) -> Collider {
    ColliderBuilder::trimesh(mesh.positions.clone(), mesh.indices.clone())
        .collision_groups(static_groups(group))
        .sensor(surface == SurfaceKind::LapBoundary)
        .friction(0.8)
        .build()
}

pub fn body_collider(desc: &RigidBodyDesc) -> Result<Collider, PhysicsError> {
    let builder = match &desc.shape {
        BodyShape::Cuboid { half_extents } => {
            if half_extents.iter().any(|h| *h <= 0.0) {
                return Err(PhysicsError::InvalidShape(format!(
                    "cuboid half extents must be > 0, got {half_extents:?}"
                )));
            }
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }
        BodyShape::Ball { radius } => {
            if *radius <= 0.0 {
                return Err(PhysicsError::InvalidShape(format!(
                    "ball radius must be > 0, got {radius}"
                )));
            }
            ColliderBuilder::ball(*radius)
        }
        BodyShape::ConvexHull { points } => ColliderBuilder::convex_hull(points).ok_or_else(
            || PhysicsError::InvalidShape(format!("degenerate convex hull ({} points)", points.len())),
        )?,
    };
    let builder = builder.collision_groups(interaction_groups(desc.group, desc.collides_with));
    Ok(if desc.is_fixed() {
        builder.build()
    } else {
        builder.mass(desc.mass).build()
    })
}

pub fn rigid_body(desc: &RigidBodyDesc) -> RigidBody {
    let builder = if desc.is_fixed() {
        RigidBodyBuilder::fixed()
    } else {
        RigidBodyBuilder::dynamic()
    };
    builder
        .position(desc.transform)
        .linear_damping(desc.linear_damping)
        .angular_damping(desc.angular_damping)
        .can_sleep(false)
        .build()
}

// ---------------------------------------------------------------------------
// Joints / wheels
// ---------------------------------------------------------------------------

const LINEAR_AXES: [(JointAxis, JointAxesMask); 3] = [
    (JointAxis::LinX, JointAxesMask::LIN_X),
    (JointAxis::LinY, JointAxesMask::LIN_Y),
    (JointAxis::LinZ, JointAxesMask::LIN_Z),
];
const ANGULAR_AXES: [(JointAxis, JointAxesMask); 3] = [
    (JointAxis::AngX, JointAxesMask::ANG_X),
    (JointAxis::AngY, JointAxesMask::ANG_Y),
    (JointAxis::AngZ, JointAxesMask::ANG_Z),
];

/// Six-axis joint: axes with an empty `[lo, hi]` range are locked, the others
/// are free within their limits.
pub fn link_joint(link: &LinkDesc) -> GenericJoint {
    let axes = LINEAR_AXES
        .iter()
        .zip(&link.linear_limits)
        .chain(ANGULAR_AXES.iter().zip(&link.angular_limits));

    let mut locked = JointAxesMask::empty();
    let mut limited = Vec::new();
    for (&(axis, mask), &[lo, hi]) in axes {
        if (hi - lo).abs() <= Real::EPSILON {
            locked |= mask;
        } else {
            limited.push((axis, [lo, hi]));
        }
    }

    let mut builder = GenericJointBuilder::new(locked)
        .local_anchor1(link.anchor_a)
        .local_anchor2(link.anchor_b);
    for (axis, limits) in limited {
        builder = builder.limits(axis, limits);
    }
    builder.build()
}

pub fn wheel_tuning(wheel: &WheelDesc) -> WheelTuning {
    WheelTuning {
        suspension_stiffness: wheel.suspension_stiffness,
        suspension_compression: wheel.damping_compression,
        suspension_damping: wheel.damping_relaxation,
        max_suspension_travel: wheel.max_suspension_travel,
        friction_slip: wheel.friction_slip,
        ..WheelTuning::default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
