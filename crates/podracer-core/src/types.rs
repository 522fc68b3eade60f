use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

// ---------------------------------------------------------------------------
// Math aliases
// ---------------------------------------------------------------------------

/// Scalar type used throughout the simulation.
pub type Real = f32;
/// World/body-space vector.
pub type Vec3 = nalgebra::Vector3<Real>;
/// World/body-space point.
pub type Point3 = nalgebra::Point3<Real>;
/// Rigid transform (rotation + translation).
pub type Iso3 = nalgebra::Isometry3<Real>;

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

macro_rules! world_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

world_id!(
    /// Rigid body issued by a collision world.
    BodyId
);
world_id!(
    /// Static or body-attached collider issued by a collision world.
    ColliderId
);
world_id!(
    /// Constraint between two rigid bodies.
    JointId
);
world_id!(
    /// Deformable mesh registered with a collision world.
    SoftBodyId
);

// ---------------------------------------------------------------------------
// CollisionGroup / SurfaceKind
// ---------------------------------------------------------------------------

bitflags! {
    /// Membership/filter bits deciding which object pairs may interact.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CollisionGroup: u32 {
        const NONE = 0;
        const POD = 1 << 0;
        const ENV = 1 << 1;
        const LAP_BOUNDARY = 1 << 2;
    }
}

/// Semantic role of a static track surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    /// Drivable ground and walls.
    Ground,
    /// Ground that counts as a hazard when touched.
    Hazard,
    /// Non-physical start/finish gate.
    LapBoundary,
}

impl SurfaceKind {
    /// Collision group a static collider of this kind is registered under.
    pub const fn group(self) -> CollisionGroup {
        match self {
            Self::Ground | Self::Hazard => CollisionGroup::ENV,
            Self::LapBoundary => CollisionGroup::LAP_BOUNDARY,
        }
    }
}

// ---------------------------------------------------------------------------
// TriangleMesh / TrackGeometry
// ---------------------------------------------------------------------------

/// Triangle soup used as static collision geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    /// Mesh name, used in log messages.
    pub name: String,
    pub positions: Vec<Point3>,
    pub indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
    pub fn new(name: impl Into<String>, positions: Vec<Point3>, indices: Vec<[u32; 3]>) -> Self {
        Self {
            name: name.into(),
            positions,
            indices,
        }
    }

    /// Build from a flat index list (three indices per triangle).
    pub fn from_flat(
        name: impl Into<String>,
        positions: Vec<Point3>,
        flat: &[u32],
    ) -> Result<Self, GeometryError> {
        let name = name.into();
        if flat.len() % 3 != 0 {
            return Err(GeometryError::RaggedIndices {
                mesh: name,
                len: flat.len(),
            });
        }
        let indices = flat.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect();
        Ok(Self {
            name,
            positions,
            indices,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Check that the mesh is non-empty, finite and that every index is in range.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.is_empty() {
            return Err(GeometryError::EmptyMesh(self.name.clone()));
        }
        if self
            .positions
            .iter()
            .any(|p| !p.coords.iter().all(|c| c.is_finite()))
        {
            return Err(GeometryError::NonFinitePosition(self.name.clone()));
        }
        let len = self.positions.len();
        for tri in &self.indices {
            for &index in tri {
                if index as usize >= len {
                    return Err(GeometryError::IndexOutOfRange {
                        mesh: self.name.clone(),
                        index,
                        len,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Static track geometry grouped by semantic role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackGeometry {
    pub ground: Vec<TriangleMesh>,
    pub hazard: Vec<TriangleMesh>,
    pub lap_boundary: Vec<TriangleMesh>,
}

impl TrackGeometry {
    /// Iterate over every mesh together with its surface kind.
    pub fn iter(&self) -> impl Iterator<Item = (SurfaceKind, &TriangleMesh)> {
        self.ground
            .iter()
            .map(|m| (SurfaceKind::Ground, m))
            .chain(self.hazard.iter().map(|m| (SurfaceKind::Hazard, m)))
            .chain(
                self.lap_boundary
                    .iter()
                    .map(|m| (SurfaceKind::LapBoundary, m)),
            )
    }

    pub fn mesh_count(&self) -> usize {
        self.ground.len() + self.hazard.len() + self.lap_boundary.len()
    }
}

// ---------------------------------------------------------------------------
// RenderVertex / CableMesh
// ---------------------------------------------------------------------------

/// Vertex layout shared with the external mesh renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderVertex {
    pub position: Point3,
    pub normal: Vec3,
    pub tex_coords: [f32; 2],
    pub bone_ids: [f32; 2],
    pub bone_weights: [f32; 2],
}

impl RenderVertex {
    /// Vertex with only a position and texture coordinates set.
    pub fn new(position: Point3, tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            normal: Vec3::y(),
            tex_coords,
            bone_ids: [0.0; 2],
            bone_weights: [0.0; 2],
        }
    }
}

/// Authoring-space cable geometry with per-face duplicated vertices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CableMesh {
    pub name: String,
    pub vertices: Vec<RenderVertex>,
    /// Flat triangle list, three indices per face.
    pub indices: Vec<u32>,
}

impl CableMesh {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.is_empty() {
            return Err(GeometryError::EmptyMesh(self.name.clone()));
        }
        if self.indices.len() % 3 != 0 {
            return Err(GeometryError::RaggedIndices {
                mesh: self.name.clone(),
                len: self.indices.len(),
            });
        }
        let len = self.vertices.len();
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= len) {
            return Err(GeometryError::IndexOutOfRange {
                mesh: self.name.clone(),
                index,
                len,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// InputFrame
// ---------------------------------------------------------------------------

/// Per-frame player intent supplied by the input collaborator before `step()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFrame {
    pub throttle: bool,
    pub brake: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    /// Afterburn modifier, only effective together with `throttle`.
    pub boost: bool,
    /// Power coupling button pressed this frame.
    pub power_coupling: bool,
    /// Electric engine start button pressed this frame.
    pub engine_start: bool,
}

impl InputFrame {
    pub const fn idle() -> Self {
        Self {
            throttle: false,
            brake: false,
            turn_left: false,
            turn_right: false,
            boost: false,
            power_coupling: false,
            engine_start: false,
        }
    }

    /// True when exactly one turn direction is held.
    pub const fn turning(&self) -> bool {
        self.turn_left ^ self.turn_right
    }

    /// Signed steer direction: +1 left, -1 right, 0 none or both.
    pub const fn steer_sign(&self) -> f32 {
        match (self.turn_left, self.turn_right) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// ContactEvent
// ---------------------------------------------------------------------------

/// Gameplay facts derived from the contact queries of one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEvent {
    /// Raw: the vehicle overlaps a lap-boundary volume this step.
    pub lap_boundary_touched: bool,
    /// Rising edge of `lap_boundary_touched`.
    pub lap_advance: bool,
    pub terrain_touched: bool,
    pub ground_hazard_touched: bool,
}

impl ContactEvent {
    pub const fn any(&self) -> bool {
        self.lap_boundary_touched || self.terrain_touched || self.ground_hazard_touched
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(name: &str) -> TriangleMesh {
        TriangleMesh::from_flat(
            name,
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 1.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            &[0, 1, 2, 0, 2, 3],
        )
        .unwrap()
    }

    #[test]
    fn ids_display() {
        assert_eq!(BodyId(3).to_string(), "BodyId(3)");
        assert_eq!(SoftBodyId(0).to_string(), "SoftBodyId(0)");
    }

    #[test]
    fn surface_kind_groups() {
        assert_eq!(SurfaceKind::Ground.group(), CollisionGroup::ENV);
        assert_eq!(SurfaceKind::Hazard.group(), CollisionGroup::ENV);
        assert_eq!(
            SurfaceKind::LapBoundary.group(),
            CollisionGroup::LAP_BOUNDARY
        );
        assert!(CollisionGroup::NONE.is_empty());
    }

    #[test]
    fn triangle_mesh_from_flat() {
        let mesh = quad("ground");
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn triangle_mesh_ragged_indices_rejected() {
        let err = TriangleMesh::from_flat("bad", vec![Point3::origin()], &[0, 0]).unwrap_err();
        assert!(matches!(err, GeometryError::RaggedIndices { len: 2, .. }));
    }

    #[test]
    fn triangle_mesh_out_of_range_rejected() {
        let mut mesh = quad("ground");
        mesh.indices.push([0, 1, 9]);
        let err = mesh.validate().unwrap_err();
        assert!(matches!(err, GeometryError::IndexOutOfRange { index: 9, .. }));
    }

    #[test]
    fn triangle_mesh_empty_rejected() {
        let mesh = TriangleMesh::new("empty", vec![], vec![]);
        assert!(matches!(mesh.validate(), Err(GeometryError::EmptyMesh(_))));
    }

    #[test]
    fn triangle_mesh_nan_rejected() {
        let mut mesh = quad("ground");
        mesh.positions[0].x = f32::NAN;
        assert!(matches!(
            mesh.validate(),
            Err(GeometryError::NonFinitePosition(_))
        ));
    }

    #[test]
    fn track_geometry_iterates_all_roles() {
        let track = TrackGeometry {
            ground: vec![quad("g")],
            hazard: vec![quad("h")],
            lap_boundary: vec![quad("l")],
        };
        let kinds: Vec<_> = track.iter().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![
                SurfaceKind::Ground,
                SurfaceKind::Hazard,
                SurfaceKind::LapBoundary
            ]
        );
        assert_eq!(track.mesh_count(), 3);
    }

    #[test]
    fn cable_mesh_validation() {
        let v = RenderVertex::new(Point3::origin(), [0.0, 0.0]);
        let mesh = CableMesh {
            name: "cable".into(),
            vertices: vec![v; 3],
            indices: vec![0, 1, 2],
        };
        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.triangle_count(), 1);

        let ragged = CableMesh {
            indices: vec![0, 1],
            ..mesh.clone()
        };
        assert!(ragged.validate().is_err());

        let empty = CableMesh::default();
        assert!(matches!(empty.validate(), Err(GeometryError::EmptyMesh(_))));
    }

    #[test]
    fn input_steer_sign() {
        let mut input = InputFrame::idle();
        assert!((input.steer_sign()).abs() < f32::EPSILON);
        input.turn_left = true;
        assert!((input.steer_sign() - 1.0).abs() < f32::EPSILON);
        input.turn_right = true;
        assert!(!input.turning());
        assert!((input.steer_sign()).abs() < f32::EPSILON);
        input.turn_left = false;
        assert!((input.steer_sign() + 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn contact_event_any() {
        assert!(!ContactEvent::default().any());
        let event = ContactEvent {
            terrain_touched: true,
            ..ContactEvent::default()
        };
        assert!(event.any());
    }
}
