//! Position-based cloth used for the power cables.
//!
//! Verlet prediction, iterated distance constraints over structural edges and
//! bending links, then shape matching toward the rest pose. Anchored nodes are
//! pinned to their rigid body every substep. Node order and count are fixed at
//! construction.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::{Matrix3, Rotation3};
use podracer_core::prelude::*;

use crate::backend::SoftBodyMaterial;

/// Distance constraint between two nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceLink {
    pub a: usize,
    pub b: usize,
    pub rest_length: Real,
}

/// Node pinned to a rigid body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClothAnchor {
    pub node: usize,
    pub body: BodyId,
    /// Node position in body space.
    pub local: Point3,
}

/// Deformable triangle mesh simulated with position-based dynamics.
#[derive(Debug, Clone)]
pub struct ClothBody {
    positions: Vec<Point3>,
    previous: Vec<Point3>,
    rest: Vec<Point3>,
    rest_centroid: Point3,
    inv_mass: Vec<Real>,
    faces: Vec<[u32; 3]>,
    edges: Vec<DistanceLink>,
    bends: Vec<DistanceLink>,
    anchors: Vec<ClothAnchor>,
    material: SoftBodyMaterial,
}

impl ClothBody {
    pub fn new(
        nodes: &[Point3],
        faces: &[[u32; 3]],
        material: &SoftBodyMaterial,
    ) -> Result<Self, PhysicsError> {
        if nodes.is_empty() || faces.is_empty() {
            return Err(PhysicsError::InvalidShape(
                "soft body needs at least one node and one face".into(),
            ));
        }
        if let Some(&bad) = faces.iter().flatten().find(|&&i| i as usize >= nodes.len()) {
            return Err(PhysicsError::InvalidShape(format!(
                "face index {bad} out of range ({} nodes)",
                nodes.len()
            )));
        }

        let node_mass = material.total_mass / nodes.len() as Real;
        let inv = if node_mass > 0.0 { 1.0 / node_mass } else { 0.0 };

        let (edges, bends) = build_links(nodes, faces);

        Ok(Self {
            positions: nodes.to_vec(),
            previous: nodes.to_vec(),
            rest: nodes.to_vec(),
            rest_centroid: centroid(nodes),
            inv_mass: vec![inv; nodes.len()],
            faces: faces.to_vec(),
            edges,
            bends,
            anchors: Vec::new(),
            material: material.clone(),
        })
    }

    pub fn node_count(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[Point3] {
        &self.positions
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    pub fn edges(&self) -> &[DistanceLink] {
        &self.edges
    }

    pub fn bends(&self) -> &[DistanceLink] {
        &self.bends
    }

    pub fn anchors(&self) -> &[ClothAnchor] {
        &self.anchors
    }

    pub fn material(&self) -> &SoftBodyMaterial {
        &self.material
    }

    /// Pin `node` to `body` at its current position relative to `body_pose`.
    ///
    /// Returns the node count as the error payload when `node` is out of range.
    pub fn anchor(&mut self, node: usize, body: BodyId, body_pose: &Iso3) -> Result<(), usize> {
        let Some(position) = self.positions.get(node) else {
            return Err(self.positions.len());
        };
        let local = body_pose.inverse_transform_point(position);
        self.inv_mass[node] = 0.0;
        if let Some(existing) = self.anchors.iter_mut().find(|a| a.node == node) {
            existing.body = body;
            existing.local = local;
        } else {
            self.anchors.push(ClothAnchor { node, body, local });
        }
        Ok(())
    }

    /// Drop every anchor on `body`; those nodes become free again.
    pub fn release_body(&mut self, body: BodyId) {
        let node_mass = self.material.total_mass / self.positions.len() as Real;
        let inv = if node_mass > 0.0 { 1.0 / node_mass } else { 0.0 };
        for anchor in self.anchors.iter().filter(|a| a.body == body) {
            self.inv_mass[anchor.node] = inv;
        }
        self.anchors.retain(|a| a.body != body);
    }

    /// Advance by one substep. `body_pose` resolves anchor bodies; anchors
    /// whose body is unknown keep their last position.
    pub fn step(&mut self, dt: Real, gravity: &Vec3, body_pose: impl Fn(BodyId) -> Option<Iso3>) {
        let keep = 1.0 - self.material.damping;
        let accel = gravity * dt * dt;
        for i in 0..self.positions.len() {
            if self.inv_mass[i] <= 0.0 {
                continue;
            }
            let velocity = (self.positions[i] - self.previous[i]) * keep;
            self.previous[i] = self.positions[i];
            self.positions[i] += velocity + accel;
        }

        self.pin_anchors(&body_pose);
        for _ in 0..self.material.iterations {
            solve_links(
                &mut self.positions,
                &self.inv_mass,
                &self.edges,
                self.material.stiffness,
            );
            solve_links(
                &mut self.positions,
                &self.inv_mass,
                &self.bends,
                self.material.bending_stiffness,
            );
        }
        if self.material.pose_matching > 0.0 {
            self.match_shape();
        }
        self.pin_anchors(&body_pose);
    }

    /// Restore node positions and zero velocities. Anchors are kept.
    pub fn reset(&mut self, positions: &[Point3]) -> Result<(), usize> {
        if positions.len() != self.positions.len() {
            return Err(self.positions.len());
        }
        self.positions.copy_from_slice(positions);
        self.previous.copy_from_slice(positions);
        Ok(())
    }

    fn pin_anchors(&mut self, body_pose: &impl Fn(BodyId) -> Option<Iso3>) {
        for anchor in &self.anchors {
            if let Some(pose) = body_pose(anchor.body) {
                let target = pose * anchor.local;
                self.previous[anchor.node] = target;
                self.positions[anchor.node] = target;
            }
        }
    }

    /// Pull free nodes toward the best rigid fit of the rest shape.
    fn match_shape(&mut self) {
        let current = centroid(&self.positions);
        let mut moment = Matrix3::zeros();
        for (p, q) in self.positions.iter().zip(&self.rest) {
            moment += (p - current) * (q - self.rest_centroid).transpose();
        }
        let rotation = Rotation3::from_matrix(&moment);
        let alpha = self.material.pose_matching;
        for i in 0..self.positions.len() {
            if self.inv_mass[i] <= 0.0 {
                continue;
            }
            let goal = current + rotation * (self.rest[i] - self.rest_centroid);
            let delta = (goal - self.positions[i]) * alpha;
            self.positions[i] += delta;
        }
    }
}

fn centroid(points: &[Point3]) -> Point3 {
    if points.is_empty() {
        return Point3::origin();
    }
    let sum = points.iter().fold(Vec3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / points.len() as Real)
}

fn solve_links(positions: &mut [Point3], inv_mass: &[Real], links: &[DistanceLink], stiffness: Real) {
    for link in links {
        let (wa, wb) = (inv_mass[link.a], inv_mass[link.b]);
        let w = wa + wb;
        if w <= 0.0 {
            continue;
        }
        let delta = positions[link.b] - positions[link.a];
        let dist = delta.norm();
        if dist < 1e-9 {
            continue;
        }
        let correction = delta * ((dist - link.rest_length) / (dist * w) * stiffness);
        positions[link.a] += correction * wa;
        positions[link.b] -= correction * wb;
    }
}

/// Structural edges of every face, plus one bending link across every edge
/// shared by two faces (between the two opposite corners).
fn build_links(nodes: &[Point3], faces: &[[u32; 3]]) -> (Vec<DistanceLink>, Vec<DistanceLink>) {
    let link = |a: usize, b: usize| DistanceLink {
        a,
        b,
        rest_length: (nodes[b] - nodes[a]).norm(),
    };

    let mut opposite: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
    for face in faces {
        let [a, b, c] = face.map(|i| i as usize);
        for (u, v, w) in [(a, b, c), (b, c, a), (c, a, b)] {
            if u == v {
                continue;
            }
            opposite.entry((u.min(v), u.max(v))).or_default().push(w);
        }
    }

    let edges = opposite.keys().map(|&(a, b)| link(a, b)).collect();

    let mut bend_pairs = BTreeSet::new();
    for (&(a, b), corners) in &opposite {
        for (i, &p) in corners.iter().enumerate() {
            for &q in &corners[i + 1..] {
                if p != q && !opposite.contains_key(&(p.min(q), p.max(q))) && p != a && p != b {
                    bend_pairs.insert((p.min(q), p.max(q)));
                }
            }
        }
    }
    let bends = bend_pairs.into_iter().map(|(a, b)| link(a, b)).collect();

    (edges, bends)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat strip along +Z: 2 x `rows` grid of nodes, two triangles per quad.
    fn strip(rows: usize) -> (Vec<Point3>, Vec<[u32; 3]>) {
        let mut nodes = Vec::new();
        for r in 0..rows {
            nodes.push(Point3::new(0.0, 0.0, r as f32));
            nodes.push(Point3::new(0.2, 0.0, r as f32));
        }
        let mut faces = Vec::new();
        for r in 0..rows as u32 - 1 {
            let (a, b, c, d) = (2 * r, 2 * r + 1, 2 * r + 2, 2 * r + 3);
            faces.push([a, b, c]);
            faces.push([b, d, c]);
        }
        (nodes, faces)
    }

    fn material() -> SoftBodyMaterial {
        SoftBodyMaterial {
            total_mass: 1.0,
            ..SoftBodyMaterial::default()
        }
    }

    #[test]
    fn empty_cloth_rejected() {
        let err = ClothBody::new(&[], &[], &material()).unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidShape(_)));
    }

    #[test]
    fn out_of_range_face_rejected() {
        let (nodes, mut faces) = strip(2);
        faces.push([0, 1, 99]);
        assert!(ClothBody::new(&nodes, &faces, &material()).is_err());
    }

    #[test]
    fn links_built_once_per_edge() {
        let (nodes, faces) = strip(2);
        let cloth = ClothBody::new(&nodes, &faces, &material()).unwrap();
        // Quad: 4 border edges + 1 diagonal.
        assert_eq!(cloth.edges().len(), 5);
        // One shared edge, one bending link across it.
        assert_eq!(cloth.bends().len(), 1);
    }

    #[test]
    fn free_cloth_falls_under_gravity() {
        let (nodes, faces) = strip(3);
        let mut cloth = ClothBody::new(&nodes, &faces, &material()).unwrap();
        let gravity = Vec3::new(0.0, -9.81, 0.0);
        for _ in 0..30 {
            cloth.step(1.0 / 60.0, &gravity, |_| None);
        }
        assert!(cloth.positions().iter().all(|p| p.y < -0.1));
    }

    #[test]
    fn anchored_nodes_follow_body() {
        let (nodes, faces) = strip(4);
        let mut cloth = ClothBody::new(&nodes, &faces, &material()).unwrap();
        let body = BodyId(0);
        cloth.anchor(0, body, &Iso3::identity()).unwrap();
        cloth.anchor(1, body, &Iso3::identity()).unwrap();

        let moved = Iso3::translation(0.0, 2.0, 0.0);
        let gravity = Vec3::new(0.0, -9.81, 0.0);
        for _ in 0..10 {
            cloth.step(1.0 / 60.0, &gravity, |_| Some(moved));
        }
        assert!((cloth.positions()[0].y - 2.0).abs() < 1e-5);
        assert!((cloth.positions()[1].y - 2.0).abs() < 1e-5);
        assert_eq!(cloth.node_count(), 8);
    }

    #[test]
    fn anchor_out_of_range() {
        let (nodes, faces) = strip(2);
        let mut cloth = ClothBody::new(&nodes, &faces, &material()).unwrap();
        assert_eq!(cloth.anchor(40, BodyId(0), &Iso3::identity()), Err(4));
    }

    #[test]
    fn edges_hold_length_when_hanging() {
        let (nodes, faces) = strip(5);
        let mut cloth = ClothBody::new(
            &nodes,
            &faces,
            &SoftBodyMaterial {
                stiffness: 1.0,
                iterations: 40,
                ..material()
            },
        )
        .unwrap();
        cloth.anchor(0, BodyId(0), &Iso3::identity()).unwrap();
        cloth.anchor(1, BodyId(0), &Iso3::identity()).unwrap();
        let gravity = Vec3::new(0.0, -9.81, 0.0);
        for _ in 0..120 {
            cloth.step(1.0 / 60.0, &gravity, |_| Some(Iso3::identity()));
        }
        for link in cloth.edges() {
            let len = (cloth.positions()[link.b] - cloth.positions()[link.a]).norm();
            assert!((len - link.rest_length).abs() < 0.1 * link.rest_length.max(0.2));
        }
    }

    #[test]
    fn shape_matching_restores_rest_shape() {
        let (nodes, faces) = strip(3);
        let mut cloth = ClothBody::new(
            &nodes,
            &faces,
            &SoftBodyMaterial {
                pose_matching: 1.0,
                iterations: 0,
                damping: 1.0,
                ..material()
            },
        )
        .unwrap();
        let mut bent = nodes.clone();
        bent[5].y += 0.3;
        cloth.reset(&bent).unwrap();

        cloth.step(1.0 / 60.0, &Vec3::zeros(), |_| None);

        let p = cloth.positions();
        assert!(p[5].y < 0.3);
        for link in cloth.edges() {
            let len = (p[link.b] - p[link.a]).norm();
            assert!((len - link.rest_length).abs() < 0.02, "{link:?}: {len}");
        }
    }

    #[test]
    fn reset_restores_positions() {
        let (nodes, faces) = strip(3);
        let mut cloth = ClothBody::new(&nodes, &faces, &material()).unwrap();
        let gravity = Vec3::new(0.0, -9.81, 0.0);
        for _ in 0..10 {
            cloth.step(1.0 / 60.0, &gravity, |_| None);
        }
        cloth.reset(&nodes).unwrap();
        assert_eq!(cloth.positions(), nodes.as_slice());
        assert_eq!(cloth.reset(&nodes[..2]), Err(6));
    }
}
