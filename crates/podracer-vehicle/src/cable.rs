//! Power cables: soft bodies stretched between chariot and reactor block.
//!
//! Authoring meshes duplicate every vertex per triangle. Construction merges
//! coincident vertices into simulation nodes and records, for every corner of
//! every triangle, which node it became. Readback walks those corners, so no
//! position matching is needed once the cloth starts moving.

use std::collections::HashMap;

use podracer_core::config::CableConfig;
use podracer_core::prelude::*;
use podracer_physics::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ---------------------------------------------------------------------------
// CableSide
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CableSide {
    Left,
    Right,
}

impl CableSide {
    pub const BOTH: [Self; 2] = [Self::Left, Self::Right];

    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Deduplication
// ---------------------------------------------------------------------------

/// Unique simulation nodes of a cable mesh and the node behind every corner.
#[derive(Debug, Clone, PartialEq)]
pub struct CableTopology {
    /// Unique positions, in first-seen order, authoring space.
    pub nodes: Vec<Point3>,
    /// Node index of every corner, in index-buffer order.
    pub corner_nodes: Vec<usize>,
    /// Triangles over `nodes`; faces that collapse onto fewer than three
    /// nodes are left out.
    pub faces: Vec<[u32; 3]>,
}

/// Bit-exact key; `-0.0` and `0.0` share one.
fn position_key(p: &Point3) -> [u32; 3] {
    [
        (p.x + 0.0).to_bits(),
        (p.y + 0.0).to_bits(),
        (p.z + 0.0).to_bits(),
    ]
}

/// Merge vertices that share a position.
pub fn deduplicate(mesh: &CableMesh) -> Result<CableTopology, GeometryError> {
    mesh.validate()?;
    if mesh
        .vertices
        .iter()
        .any(|v| !v.position.coords.iter().all(|c| c.is_finite()))
    {
        return Err(GeometryError::NonFinitePosition(mesh.name.clone()));
    }

    let mut lookup: HashMap<[u32; 3], usize> = HashMap::new();
    let mut nodes = Vec::new();
    for vertex in &mesh.vertices {
        lookup.entry(position_key(&vertex.position)).or_insert_with(|| {
            nodes.push(vertex.position);
            nodes.len() - 1
        });
    }

    let corner_nodes = mesh
        .indices
        .iter()
        .enumerate()
        .map(|(corner, &index)| {
            mesh.vertices
                .get(index as usize)
                .and_then(|v| lookup.get(&position_key(&v.position)))
                .copied()
                .ok_or_else(|| GeometryError::UnmatchedCorner {
                    mesh: mesh.name.clone(),
                    corner,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    #[allow(clippy::cast_possible_truncation)]
    let faces = corner_nodes
        .chunks_exact(3)
        .filter(|t| t[0] != t[1] && t[1] != t[2] && t[0] != t[2])
        .map(|t| [t[0] as u32, t[1] as u32, t[2] as u32])
        .collect();

    Ok(CableTopology {
        nodes,
        corner_nodes,
        faces,
    })
}

/// Nodes at both ends of `nodes` along `axis`: the lowest `count` and the
/// highest `count`, never overlapping.
pub fn anchor_clusters(nodes: &[Point3], axis: usize, count: usize) -> (Vec<usize>, Vec<usize>) {
    let count = count.min(nodes.len() / 2);
    let mut order: Vec<usize> = (0..nodes.len()).collect();
    order.sort_by(|&a, &b| nodes[a][axis].total_cmp(&nodes[b][axis]).then(a.cmp(&b)));
    let low = order[..count].to_vec();
    let high = order[order.len() - count..].to_vec();
    (low, high)
}

/// One flat vertex per corner with a recomputed face normal.
fn flat_vertices(
    nodes: &[Point3],
    corner_nodes: &[usize],
    templates: &[RenderVertex],
    out: &mut Vec<RenderVertex>,
) {
    out.clear();
    for (corners, template) in corner_nodes.chunks_exact(3).zip(templates.chunks_exact(3)) {
        let p = [nodes[corners[0]], nodes[corners[1]], nodes[corners[2]]];
        let normal = (p[1] - p[0])
            .cross(&(p[2] - p[0]))
            .try_normalize(1e-12)
            .unwrap_or(template[0].normal);
        for (position, t) in p.into_iter().zip(template) {
            out.push(RenderVertex {
                position,
                normal,
                ..*t
            });
        }
    }
}

// ---------------------------------------------------------------------------
// CableBody
// ---------------------------------------------------------------------------

/// One cable registered as a soft body, with its render buffer.
#[derive(Debug, Clone)]
pub struct CableBody {
    side: CableSide,
    soft: SoftBodyId,
    corner_nodes: Vec<usize>,
    /// Authoring vertex of every corner; supplies UVs and bone data.
    templates: Vec<RenderVertex>,
    initial_nodes: Vec<Point3>,
    initial_vertices: Vec<RenderVertex>,
    vertices: Vec<RenderVertex>,
}

impl CableBody {
    /// Place `mesh` (pod space) at `spawn`, register it and anchor its ends:
    /// the low end along the anchor axis to `chariot`, the high end to
    /// `reactor`.
    pub fn build<W: CollisionWorld + ?Sized>(
        world: &mut W,
        side: CableSide,
        mesh: &CableMesh,
        spawn: &Iso3,
        (chariot, reactor): (BodyId, BodyId),
        config: &CableConfig,
    ) -> Result<Self, PodracerError> {
        let topology = deduplicate(mesh)?;
        let world_nodes: Vec<Point3> = topology.nodes.iter().map(|p| spawn * p).collect();

        let material = SoftBodyMaterial {
            total_mass: config.total_mass,
            stiffness: config.stiffness,
            bending_stiffness: config.bending_stiffness,
            pose_matching: config.pose_matching,
            iterations: config.iterations,
            damping: config.damping,
            contact_margin: config.contact_margin,
            group: CollisionGroup::POD,
        };
        let soft = world.add_soft_body(&world_nodes, &topology.faces, &material)?;

        let (low, high) = anchor_clusters(&topology.nodes, config.anchor_axis, config.anchor_count);
        for &node in &low {
            world.anchor_soft_node(soft, node, chariot)?;
        }
        for &node in &high {
            world.anchor_soft_node(soft, node, reactor)?;
        }

        let templates: Vec<RenderVertex> = mesh
            .indices
            .iter()
            .filter_map(|&i| mesh.vertices.get(i as usize).copied())
            .collect();
        let mut initial_vertices = Vec::with_capacity(templates.len());
        flat_vertices(
            &world_nodes,
            &topology.corner_nodes,
            &templates,
            &mut initial_vertices,
        );

        debug!(
            cable = %mesh.name,
            %soft,
            nodes = world_nodes.len(),
            faces = topology.faces.len(),
            anchors = low.len() + high.len(),
            "cable soft body built"
        );

        Ok(Self {
            side,
            soft,
            corner_nodes: topology.corner_nodes,
            templates,
            vertices: initial_vertices.clone(),
            initial_vertices,
            initial_nodes: world_nodes,
        })
    }

    /// Rewrite the render buffer from the current node positions.
    ///
    /// Leaves the previous buffer untouched if the world no longer knows the
    /// soft body or its node count changed.
    pub fn sync<W: CollisionWorld + ?Sized>(&mut self, world: &W) {
        let Some(nodes) = world.soft_body_nodes(self.soft) else {
            return;
        };
        if nodes.len() != self.initial_nodes.len() {
            return;
        }
        flat_vertices(nodes, &self.corner_nodes, &self.templates, &mut self.vertices);
    }

    /// Restore the initial node positions and render buffer.
    pub fn reset<W: CollisionWorld + ?Sized>(&mut self, world: &mut W) {
        world.reset_soft_body(self.soft, &self.initial_nodes);
        self.vertices.clone_from(&self.initial_vertices);
    }

    pub const fn side(&self) -> CableSide {
        self.side
    }

    pub const fn soft_body(&self) -> SoftBodyId {
        self.soft
    }

    /// Flat triangle list: three vertices per triangle, none shared.
    pub fn vertices(&self) -> &[RenderVertex] {
        &self.vertices
    }

    pub fn initial_vertices(&self) -> &[RenderVertex] {
        &self.initial_vertices
    }

    pub fn node_count(&self) -> usize {
        self.initial_nodes.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use podracer_core::config::PodConfig;
    use podracer_test_utils::{ScriptedWorld, cable_strip};

    use crate::chassis::PodChassis;

    #[test]
    fn deduplicate_merges_shared_corners() {
        let mesh = cable_strip("cable", Point3::origin(), 2.0, 4);
        let topology = deduplicate(&mesh).unwrap();
        assert_eq!(topology.nodes.len(), 10);
        assert_eq!(topology.corner_nodes.len(), 24);
        assert_eq!(topology.faces.len(), 8);
        for (corner, &node) in topology.corner_nodes.iter().enumerate() {
            let authored = mesh.vertices[mesh.indices[corner] as usize].position;
            assert_eq!(topology.nodes[node], authored);
        }
    }

    #[test]
    fn negative_zero_is_same_node() {
        let mut mesh = cable_strip("cable", Point3::origin(), 1.0, 1);
        mesh.vertices[2].position.x = -0.0;
        let topology = deduplicate(&mesh).unwrap();
        assert_eq!(topology.nodes.len(), 4);
    }

    #[test]
    fn empty_and_nan_meshes_rejected() {
        assert!(matches!(
            deduplicate(&CableMesh::default()),
            Err(GeometryError::EmptyMesh(_))
        ));
        let mut mesh = cable_strip("cable", Point3::origin(), 1.0, 1);
        mesh.vertices[0].position.y = f32::NAN;
        assert!(matches!(
            deduplicate(&mesh),
            Err(GeometryError::NonFinitePosition(_))
        ));
    }

    #[test]
    fn anchor_clusters_take_both_ends() {
        let nodes: Vec<Point3> = (0..10).map(|i| Point3::new(0.0, 0.0, i as f32)).collect();
        let (low, high) = anchor_clusters(&nodes, 2, 3);
        assert_eq!(low, vec![0, 1, 2]);
        assert_eq!(high, vec![7, 8, 9]);

        let (low, high) = anchor_clusters(&nodes[..3], 2, 4);
        assert_eq!(low.len(), 1);
        assert_eq!(high.len(), 1);
    }

    fn rig() -> (ScriptedWorld, PodChassis, CableBody) {
        let config = PodConfig::default();
        let mut world = ScriptedWorld::default();
        let spawn = Iso3::translation(0.0, 1.0, 0.0);
        let chassis = PodChassis::build(&mut world, &config, &spawn).unwrap();
        let mesh = cable_strip("cable_left", Point3::new(-0.5, 0.6, -5.0), 2.2, 6);
        let cable = CableBody::build(
            &mut world,
            CableSide::Left,
            &mesh,
            &spawn,
            (chassis.chariot(), chassis.reactor()),
            &config.cable,
        )
        .unwrap();
        (world, chassis, cable)
    }

    #[test]
    fn build_anchors_both_ends() {
        let (world, chassis, cable) = rig();
        let cloth = world.cloth(cable.soft_body()).unwrap();
        let anchors = cloth.anchors();
        assert_eq!(anchors.len(), 8);
        assert_eq!(
            anchors.iter().filter(|a| a.body == chassis.chariot()).count(),
            4
        );
        assert_eq!(cable.triangle_count(), 12);
        assert_eq!(cable.vertices(), cable.initial_vertices());
        // Placed at spawn height.
        assert!((cable.vertices()[0].position.y - 1.6).abs() < 1e-5);
    }

    #[test]
    fn sync_keeps_topology_and_attributes() {
        let (mut world, _chassis, mut cable) = rig();
        for _ in 0..30 {
            world.step(1.0 / 60.0, 4);
            cable.sync(&world);
            assert_eq!(cable.triangle_count(), 12);
        }
        let moved = cable
            .vertices()
            .iter()
            .zip(cable.initial_vertices())
            .any(|(a, b)| a.position != b.position);
        assert!(moved, "free middle of the cable should sag");
        for (now, then) in cable.vertices().iter().zip(cable.initial_vertices()) {
            assert_eq!(now.tex_coords, then.tex_coords);
            assert_eq!(now.bone_weights, then.bone_weights);
            assert!((now.normal.norm() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn reset_restores_snapshot() {
        let (mut world, _chassis, mut cable) = rig();
        for _ in 0..10 {
            world.step(1.0 / 60.0, 4);
        }
        cable.sync(&world);
        cable.reset(&mut world);
        assert_eq!(cable.vertices(), cable.initial_vertices());
        cable.sync(&world);
        assert_eq!(cable.vertices(), cable.initial_vertices());
    }
}
