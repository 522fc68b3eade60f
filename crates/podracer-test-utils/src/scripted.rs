//! [`ScriptedWorld`]: deterministic in-memory collision world.
//!
//! Rigid bodies move only when driven: the wheeled chassis follows a
//! kinematic bicycle model from its wheel controls, linked bodies keep their
//! link-time offset to the first body of the link, and everything else stays
//! put. Contacts are scripted per probe with [`ScriptedWorld::touch`]. Cable
//! soft bodies run the real [`ClothBody`] solver so readback stays realistic.

use std::collections::{BTreeMap, HashMap};

use nalgebra::UnitQuaternion;
use podracer_core::prelude::*;
use podracer_physics::prelude::*;

#[derive(Debug, Clone)]
struct ScriptedBody {
    desc: RigidBodyDesc,
    state: BodyState,
    collider: ColliderId,
    enabled_rotations: [bool; 3],
    forward_speed: Real,
}

#[derive(Debug, Clone)]
struct ScriptedLink {
    a: BodyId,
    b: BodyId,
    /// Pose of `b` in the frame of `a` when linked.
    offset: Iso3,
}

#[derive(Debug, Clone)]
struct ScriptedRig {
    chassis: BodyId,
    wheels: Vec<WheelDesc>,
    controls: Vec<WheelControl>,
}

impl ScriptedRig {
    /// Front-to-rear distance between the wheel connections.
    fn wheelbase(&self) -> Real {
        let (lo, hi) = self.z_range();
        if hi - lo > Real::EPSILON { hi - lo } else { 1.0 }
    }

    fn z_range(&self) -> (Real, Real) {
        self.wheels
            .iter()
            .map(|w| w.connection.z)
            .fold((Real::MAX, Real::MIN), |(lo, hi), z| (lo.min(z), hi.max(z)))
    }

    /// Mean steering angle of the front axle.
    fn steering(&self) -> Real {
        let (_, front) = self.z_range();
        let (sum, count) = self
            .wheels
            .iter()
            .zip(&self.controls)
            .filter(|(w, _)| (w.connection.z - front).abs() <= 1e-4)
            .fold((0.0, 0u32), |(sum, n), (_, c)| (sum + c.steering, n + 1));
        if count == 0 { 0.0 } else { sum / count as Real }
    }
}

/// Collision world with scripted contacts and kinematic vehicle motion.
#[derive(Debug, Clone)]
pub struct ScriptedWorld {
    gravity: Vec3,
    colliders: BTreeMap<ColliderId, RawContact>,
    static_count: usize,
    bodies: BTreeMap<BodyId, ScriptedBody>,
    links: Vec<ScriptedLink>,
    rig: Option<ScriptedRig>,
    cloths: Vec<ClothBody>,
    touching: HashMap<ContactProbe, Vec<ColliderId>>,
    steps: u64,
    next_body: u32,
    next_collider: u32,
    next_joint: u32,
}

impl Default for ScriptedWorld {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, -9.81, 0.0))
    }
}

impl ScriptedWorld {
    /// `gravity` only acts on cloth nodes.
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity,
            colliders: BTreeMap::new(),
            static_count: 0,
            bodies: BTreeMap::new(),
            links: Vec::new(),
            rig: None,
            cloths: Vec::new(),
            touching: HashMap::new(),
            steps: 0,
            next_body: 0,
            next_collider: 0,
            next_joint: 0,
        }
    }

    // -- scripting ----------------------------------------------------------

    /// Report `collider` as overlapping `probe` until released.
    pub fn touch(&mut self, probe: ContactProbe, collider: ColliderId) {
        let list = self.touching.entry(probe).or_default();
        if !list.contains(&collider) {
            list.push(collider);
        }
    }

    pub fn release(&mut self, probe: ContactProbe, collider: ColliderId) {
        if let Some(list) = self.touching.get_mut(&probe) {
            list.retain(|c| *c != collider);
        }
    }

    pub fn release_all(&mut self) {
        self.touching.clear();
    }

    /// Overwrite a body's velocity; the chassis keeps the forward component.
    pub fn set_body_velocity(&mut self, body: BodyId, linvel: Vec3) {
        if let Some(entry) = self.bodies.get_mut(&body) {
            let forward = entry.state.transform.rotation * Vec3::z();
            entry.forward_speed = linvel.dot(&forward);
            entry.state.linvel = linvel;
        }
    }

    // -- inspection ---------------------------------------------------------

    /// Number of completed `step` calls.
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn wheel_controls(&self) -> &[WheelControl] {
        self.rig.as_ref().map_or(&[], |rig| rig.controls.as_slice())
    }

    pub fn wheels(&self) -> &[WheelDesc] {
        self.rig.as_ref().map_or(&[], |rig| rig.wheels.as_slice())
    }

    pub fn enabled_rotations(&self, body: BodyId) -> Option<[bool; 3]> {
        self.bodies.get(&body).map(|b| b.enabled_rotations)
    }

    pub fn body_desc(&self, body: BodyId) -> Option<&RigidBodyDesc> {
        self.bodies.get(&body).map(|b| &b.desc)
    }

    pub fn cloth(&self, soft: SoftBodyId) -> Option<&ClothBody> {
        self.cloths.get(soft.0 as usize)
    }

    pub fn soft_body_count(&self) -> usize {
        self.cloths.len()
    }

    fn new_collider(
        &mut self,
        group: CollisionGroup,
        surface: Option<SurfaceKind>,
        owner: Option<BodyId>,
    ) -> ColliderId {
        let id = ColliderId(self.next_collider);
        self.next_collider += 1;
        self.colliders.insert(
            id,
            RawContact {
                collider: id,
                group,
                surface,
                owner,
            },
        );
        id
    }

    fn drive(&mut self, h: Real) {
        let Some(rig) = self.rig.as_ref() else {
            return;
        };
        let engine: Real = rig.controls.iter().map(|c| c.engine_force).sum();
        let brake: Real = rig.controls.iter().map(|c| c.brake).sum();
        let steering = rig.steering();
        let wheelbase = rig.wheelbase();
        let Some(body) = self.bodies.get_mut(&rig.chassis) else {
            return;
        };
        if body.desc.is_fixed() {
            return;
        }

        let mass = body.desc.mass;
        let mut v = body.forward_speed + engine / mass * h;
        let decel = brake / mass * h;
        v = if v > 0.0 {
            (v - decel).max(0.0)
        } else {
            (v + decel).min(0.0)
        };

        let yaw_rate = if body.enabled_rotations[1] {
            v * steering.tan() / wheelbase
        } else {
            0.0
        };

        let pose = &mut body.state.transform;
        pose.rotation = UnitQuaternion::from_axis_angle(&Vec3::y_axis(), yaw_rate * h) * pose.rotation;
        let forward = pose.rotation * Vec3::z();
        pose.translation.vector += forward * v * h;

        body.forward_speed = v;
        body.state.linvel = forward * v;
        body.state.angvel = Vec3::y() * yaw_rate;
    }

    fn follow_links(&mut self) {
        for link in &self.links {
            let Some(lead) = self.bodies.get(&link.a).map(|a| a.state) else {
                continue;
            };
            if let Some(follower) = self.bodies.get_mut(&link.b) {
                follower.state = BodyState {
                    transform: lead.transform * link.offset,
                    linvel: lead.linvel,
                    angvel: lead.angvel,
                };
            }
        }
    }
}

impl CollisionWorld for ScriptedWorld {
    fn name(&self) -> &str {
        "scripted"
    }

    fn add_static_collider(
        &mut self,
        mesh: &TriangleMesh,
        group: CollisionGroup,
        surface: SurfaceKind,
    ) -> Option<ColliderId> {
        mesh.validate().ok()?;
        self.static_count += 1;
        Some(self.new_collider(group, Some(surface), None))
    }

    fn static_collider_count(&self) -> usize {
        self.static_count
    }

    fn add_rigid_body(&mut self, desc: &RigidBodyDesc) -> Result<BodyId, PhysicsError> {
        if let BodyShape::Cuboid { half_extents } = &desc.shape
            && half_extents.iter().any(|h| *h <= 0.0)
        {
            return Err(PhysicsError::InvalidShape(format!(
                "cuboid half extents must be > 0, got {half_extents:?}"
            )));
        }
        let id = BodyId(self.next_body);
        self.next_body += 1;
        let collider = self.new_collider(desc.group, None, Some(id));
        self.bodies.insert(
            id,
            ScriptedBody {
                desc: desc.clone(),
                state: BodyState::at_rest(desc.transform),
                collider,
                enabled_rotations: [true; 3],
                forward_speed: 0.0,
            },
        );
        Ok(id)
    }

    fn remove_body(&mut self, body: BodyId) -> Result<(), PhysicsError> {
        let entry = self
            .bodies
            .remove(&body)
            .ok_or(PhysicsError::UnknownBody(body))?;
        self.colliders.remove(&entry.collider);
        self.links.retain(|l| l.a != body && l.b != body);
        if self.rig.as_ref().is_some_and(|r| r.chassis == body) {
            self.rig = None;
        }
        for cloth in &mut self.cloths {
            cloth.release_body(body);
        }
        Ok(())
    }

    fn link_bodies(
        &mut self,
        a: BodyId,
        b: BodyId,
        _link: &LinkDesc,
    ) -> Result<JointId, PhysicsError> {
        let pa = self.body_pose(a)?;
        let pb = self.body_pose(b)?;
        self.links.push(ScriptedLink {
            a,
            b,
            offset: pa.inv_mul(&pb),
        });
        let id = JointId(self.next_joint);
        self.next_joint += 1;
        Ok(id)
    }

    fn attach_wheels(&mut self, chassis: BodyId, wheels: &[WheelDesc]) -> Result<(), PhysicsError> {
        if self.rig.is_some() {
            return Err(PhysicsError::WheelsAlreadyAttached);
        }
        if !self.bodies.contains_key(&chassis) {
            return Err(PhysicsError::UnknownBody(chassis));
        }
        self.rig = Some(ScriptedRig {
            chassis,
            wheels: wheels.to_vec(),
            controls: vec![WheelControl::default(); wheels.len()],
        });
        Ok(())
    }

    fn set_wheel_control(&mut self, index: usize, control: WheelControl) {
        if let Some(slot) = self.rig.as_mut().and_then(|r| r.controls.get_mut(index)) {
            *slot = control;
        }
    }

    fn set_enabled_rotations(&mut self, body: BodyId, enabled: [bool; 3]) {
        if let Some(entry) = self.bodies.get_mut(&body) {
            entry.enabled_rotations = enabled;
        }
    }

    fn add_soft_body(
        &mut self,
        nodes: &[Point3],
        faces: &[[u32; 3]],
        material: &SoftBodyMaterial,
    ) -> Result<SoftBodyId, PhysicsError> {
        let cloth = ClothBody::new(nodes, faces, material)?;
        #[allow(clippy::cast_possible_truncation)]
        let id = SoftBodyId(self.cloths.len() as u32);
        self.cloths.push(cloth);
        Ok(id)
    }

    fn anchor_soft_node(
        &mut self,
        soft: SoftBodyId,
        node: usize,
        body: BodyId,
    ) -> Result<(), PhysicsError> {
        let pose = self.body_pose(body)?;
        let cloth = self
            .cloths
            .get_mut(soft.0 as usize)
            .ok_or(PhysicsError::UnknownSoftBody(soft))?;
        cloth
            .anchor(node, body, &pose)
            .map_err(|len| PhysicsError::NodeOutOfRange { soft, node, len })
    }

    fn step(&mut self, dt: Real, substeps: u32) {
        let substeps = substeps.max(1);
        let h = dt / substeps as Real;
        for _ in 0..substeps {
            self.drive(h);
            self.follow_links();

            let gravity = self.gravity;
            let bodies = &self.bodies;
            for cloth in &mut self.cloths {
                cloth.step(h, &gravity, |id| bodies.get(&id).map(|b| b.state.transform));
            }
        }
        self.steps += 1;
    }

    fn body_state(&self, body: BodyId) -> Option<BodyState> {
        self.bodies.get(&body).map(|b| b.state)
    }

    fn reset_body(&mut self, body: BodyId, transform: &Iso3) {
        let Some(entry) = self.bodies.get_mut(&body) else {
            return;
        };
        entry.state = BodyState::at_rest(*transform);
        entry.forward_speed = 0.0;
        entry.enabled_rotations = [true; 3];
        if let Some(rig) = self.rig.as_mut()
            && rig.chassis == body
        {
            rig.controls.fill(WheelControl::default());
        }
    }

    fn soft_body_nodes(&self, soft: SoftBodyId) -> Option<&[Point3]> {
        self.cloth(soft).map(ClothBody::positions)
    }

    fn reset_soft_body(&mut self, soft: SoftBodyId, nodes: &[Point3]) {
        if let Some(cloth) = self.cloths.get_mut(soft.0 as usize) {
            let _ = cloth.reset(nodes);
        }
    }

    fn contact_test(&self, probe: ContactProbe, target: ContactTarget) -> Vec<RawContact> {
        let own = match probe {
            ContactProbe::Rigid(body) => {
                if !self.bodies.contains_key(&body) {
                    return Vec::new();
                }
                Some(body)
            }
            ContactProbe::Soft(soft) => {
                if self.cloth(soft).is_none() {
                    return Vec::new();
                }
                None
            }
        };
        let Some(list) = self.touching.get(&probe) else {
            return Vec::new();
        };
        list.iter()
            .filter(|&&c| match target {
                ContactTarget::World => true,
                ContactTarget::Collider(id) => c == id,
            })
            .filter_map(|c| self.colliders.get(c))
            .filter(|raw| own.is_none() || raw.owner != own)
            .copied()
            .collect()
    }
}

impl ScriptedWorld {
    fn body_pose(&self, body: BodyId) -> Result<Iso3, PhysicsError> {
        self.bodies
            .get(&body)
            .map(|b| b.state.transform)
            .ok_or(PhysicsError::UnknownBody(body))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
