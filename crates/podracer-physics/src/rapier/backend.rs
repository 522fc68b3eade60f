//! [`RapierWorld`]: collision world backed by raw `rapier3d`.

use std::collections::HashMap;

use podracer_core::config::SimConfig;
use podracer_core::prelude::*;
use rapier3d::control::DynamicRayCastVehicleController;
use rapier3d::prelude::{
    Capsule, Collider, ColliderHandle, Group, InteractionGroups, Isometry, QueryFilter,
    RigidBodyHandle, Shape, vector,
};
use tracing::{debug, warn};

use crate::backend::{
    BodyState, CollisionWorld, ContactProbe, ContactTarget, LinkDesc, RawContact, RigidBodyDesc,
    SoftBodyMaterial, WheelControl, WheelDesc,
};
use crate::cloth::ClothBody;

use super::bridge;
use super::context::RapierContext;

/// Bookkeeping stored for every collider we create.
#[derive(Debug, Clone, Copy)]
struct ColliderMeta {
    id: ColliderId,
    group: CollisionGroup,
    surface: Option<SurfaceKind>,
    owner: Option<BodyId>,
}

struct VehicleRig {
    controller: DynamicRayCastVehicleController,
    chassis: BodyId,
}

/// Collision world on top of a [`RapierContext`].
///
/// Raycast wheels run once per substep before the pipeline step; cable cloth
/// bodies are stepped after it against the fresh body poses.
pub struct RapierWorld {
    context: RapierContext,
    bodies: HashMap<BodyId, RigidBodyHandle>,
    colliders: HashMap<ColliderId, ColliderHandle>,
    collider_meta: HashMap<ColliderHandle, ColliderMeta>,
    cloths: Vec<ClothBody>,
    vehicle: Option<VehicleRig>,
    static_count: usize,
    next_body: u32,
    next_collider: u32,
    next_joint: u32,
}

impl RapierWorld {
    pub fn new(gravity: Vec3, dt: Real) -> Self {
        Self {
            context: RapierContext::new(gravity, dt),
            bodies: HashMap::new(),
            colliders: HashMap::new(),
            collider_meta: HashMap::new(),
            cloths: Vec::new(),
            vehicle: None,
            static_count: 0,
            next_body: 0,
            next_collider: 0,
            next_joint: 0,
        }
    }

    /// Build from the `[sim]` config section.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_config(sim: &SimConfig) -> Self {
        let [x, y, z] = sim.gravity;
        Self::new(vector![x, y, z], sim.physics_dt as Real)
    }

    pub fn context(&self) -> &RapierContext {
        &self.context
    }

    fn handle(&self, body: BodyId) -> Result<RigidBodyHandle, PhysicsError> {
        self.bodies
            .get(&body)
            .copied()
            .ok_or(PhysicsError::UnknownBody(body))
    }

    fn body_pose(&self, body: BodyId) -> Option<Iso3> {
        let handle = self.bodies.get(&body)?;
        self.context.rigid_body_set.get(*handle).map(|b| *b.position())
    }

    fn register_collider(
        &mut self,
        handle: ColliderHandle,
        group: CollisionGroup,
        surface: Option<SurfaceKind>,
        owner: Option<BodyId>,
    ) -> ColliderId {
        let id = ColliderId(self.next_collider);
        self.next_collider += 1;
        self.colliders.insert(id, handle);
        self.collider_meta.insert(
            handle,
            ColliderMeta {
                id,
                group,
                surface,
                owner,
            },
        );
        id
    }

    fn soft(&self, soft: SoftBodyId) -> Option<&ClothBody> {
        self.cloths.get(soft.0 as usize)
    }

    /// Every collider overlapping `shape` at `pos`, appended once to `hits`.
    fn collect_hits(
        &self,
        pos: &Isometry<Real>,
        shape: &dyn Shape,
        filter: QueryFilter,
        hits: &mut Vec<ColliderHandle>,
    ) {
        self.context.query_pipeline.intersections_with_shape(
            &self.context.rigid_body_set,
            &self.context.collider_set,
            pos,
            shape,
            filter,
            |handle| {
                if !hits.contains(&handle) {
                    hits.push(handle);
                }
                true
            },
        );
    }
}

impl CollisionWorld for RapierWorld {
    fn name(&self) -> &str {
        "rapier3d"
    }

    fn add_static_collider(
        &mut self,
        mesh: &TriangleMesh,
        group: CollisionGroup,
        surface: SurfaceKind,
    ) -> Option<ColliderId> {
        if let Err(err) = mesh.validate() {
            warn!(mesh = %mesh.name, "static collider rejected: {err}");
            return None;
        }
        let collider = bridge::static_collider(mesh, group, surface);
        let handle = self.context.collider_set.insert(collider);
        self.static_count += 1;
        self.context.refresh_queries();
        Some(self.register_collider(handle, group, Some(surface), None))
    }

    fn static_collider_count(&self) -> usize {
        self.static_count
    }

    fn add_rigid_body(&mut self, desc: &RigidBodyDesc) -> Result<BodyId, PhysicsError> {
        let collider = bridge::body_collider(desc)?;
        let handle = self.context.rigid_body_set.insert(bridge::rigid_body(desc));
        let collider_handle = self.context.collider_set.insert_with_parent(
            collider,
            handle,
            &mut self.context.rigid_body_set,
        );

        let id = BodyId(self.next_body);
        self.next_body += 1;
        self.bodies.insert(id, handle);
        self.register_collider(collider_handle, desc.group, None, Some(id));
        self.context.refresh_queries();
        debug!(body = %id, mass = desc.mass, "rigid body added");
        Ok(id)
    }

    fn remove_body(&mut self, body: BodyId) -> Result<(), PhysicsError> {
        let handle = self.handle(body)?;
        let ctx = &mut self.context;
        ctx.rigid_body_set.remove(
            handle,
            &mut ctx.island_manager,
            &mut ctx.collider_set,
            &mut ctx.impulse_joint_set,
            &mut ctx.multibody_joint_set,
            true,
        );
        self.bodies.remove(&body);
        self.collider_meta.retain(|_, meta| meta.owner != Some(body));
        let live = &self.collider_meta;
        self.colliders.retain(|_, h| live.contains_key(h));
        if self.vehicle.as_ref().is_some_and(|v| v.chassis == body) {
            self.vehicle = None;
        }
        for cloth in &mut self.cloths {
            cloth.release_body(body);
        }
        self.context.refresh_queries();
        Ok(())
    }

    fn link_bodies(
        &mut self,
        a: BodyId,
        b: BodyId,
        link: &LinkDesc,
    ) -> Result<JointId, PhysicsError> {
        let (ha, hb) = (self.handle(a)?, self.handle(b)?);
        self.context
            .impulse_joint_set
            .insert(ha, hb, bridge::link_joint(link), true);
        let id = JointId(self.next_joint);
        self.next_joint += 1;
        Ok(id)
    }

    fn attach_wheels(&mut self, chassis: BodyId, wheels: &[WheelDesc]) -> Result<(), PhysicsError> {
        if self.vehicle.is_some() {
            return Err(PhysicsError::WheelsAlreadyAttached);
        }
        let handle = self.handle(chassis)?;
        let mut controller = DynamicRayCastVehicleController::new(handle);
        controller.index_up_axis = 1;
        controller.index_forward_axis = 2;
        for wheel in wheels {
            controller.add_wheel(
                wheel.connection,
                wheel.suspension_dir,
                wheel.axle,
                wheel.rest_length,
                wheel.radius,
                &bridge::wheel_tuning(wheel),
            );
        }
        debug!(chassis = %chassis, wheels = wheels.len(), "raycast wheels attached");
        self.vehicle = Some(VehicleRig {
            controller,
            chassis,
        });
        Ok(())
    }

    fn set_wheel_control(&mut self, index: usize, control: WheelControl) {
        let Some(rig) = self.vehicle.as_mut() else {
            return;
        };
        if let Some(wheel) = rig.controller.wheels_mut().get_mut(index) {
            wheel.engine_force = control.engine_force;
            wheel.brake = control.brake;
            wheel.steering = control.steering;
        }
    }

    fn set_enabled_rotations(&mut self, body: BodyId, enabled: [bool; 3]) {
        let Some(&handle) = self.bodies.get(&body) else {
            return;
        };
        if let Some(rb) = self.context.rigid_body_set.get_mut(handle) {
            rb.set_enabled_rotations(enabled[0], enabled[1], enabled[2], true);
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
        debug!(
            soft = %id,
            nodes = cloth.node_count(),
            edges = cloth.edges().len(),
            bends = cloth.bends().len(),
            "soft body added"
        );
        self.cloths.push(cloth);
        Ok(id)
    }

    fn anchor_soft_node(
        &mut self,
        soft: SoftBodyId,
        node: usize,
        body: BodyId,
    ) -> Result<(), PhysicsError> {
        let pose = self.body_pose(body).ok_or(PhysicsError::UnknownBody(body))?;
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
        self.context.integration_parameters.dt = h;

        for _ in 0..substeps {
            if let Some(rig) = self.vehicle.as_mut()
                && let Some(&chassis) = self.bodies.get(&rig.chassis)
            {
                let ctx = &mut self.context;
                let filter = QueryFilter::default()
                    .exclude_sensors()
                    .exclude_rigid_body(chassis)
                    .groups(bridge::interaction_groups(
                        CollisionGroup::POD,
                        CollisionGroup::ENV,
                    ));
                rig.controller.update_vehicle(
                    h,
                    &mut ctx.rigid_body_set,
                    &ctx.collider_set,
                    &ctx.query_pipeline,
                    filter,
                );
            }

            self.context.step();

            let gravity = self.context.gravity;
            let bodies = &self.context.rigid_body_set;
            let handles = &self.bodies;
            for cloth in &mut self.cloths {
                cloth.step(h, &gravity, |id| {
                    handles
                        .get(&id)
                        .and_then(|&handle| bodies.get(handle))
                        .map(|rb| *rb.position())
                });
            }
        }
    }

    fn body_state(&self, body: BodyId) -> Option<BodyState> {
        let handle = self.bodies.get(&body)?;
        let rb = self.context.rigid_body_set.get(*handle)?;
        Some(BodyState {
            transform: *rb.position(),
            linvel: *rb.linvel(),
            angvel: *rb.angvel(),
        })
    }

    fn reset_body(&mut self, body: BodyId, transform: &Iso3) {
        let Some(&handle) = self.bodies.get(&body) else {
            return;
        };
        if let Some(rb) = self.context.rigid_body_set.get_mut(handle) {
            rb.set_position(*transform, true);
            rb.set_linvel(Vec3::zeros(), true);
            rb.set_angvel(Vec3::zeros(), true);
            rb.reset_forces(true);
            rb.reset_torques(true);
            rb.set_enabled_rotations(true, true, true, true);
        }
        if let Some(rig) = self.vehicle.as_mut()
            && rig.chassis == body
        {
            for wheel in rig.controller.wheels_mut() {
                wheel.engine_force = 0.0;
                wheel.brake = 0.0;
                wheel.steering = 0.0;
            }
        }
        self.context.refresh_queries();
    }

    fn soft_body_nodes(&self, soft: SoftBodyId) -> Option<&[Point3]> {
        self.soft(soft).map(ClothBody::positions)
    }

    fn reset_soft_body(&mut self, soft: SoftBodyId, nodes: &[Point3]) {
        let Some(cloth) = self.cloths.get_mut(soft.0 as usize) else {
            return;
        };
        if let Err(len) = cloth.reset(nodes) {
            warn!(%soft, expected = len, got = nodes.len(), "soft body reset ignored");
        }
    }

    fn contact_test(&self, probe: ContactProbe, target: ContactTarget) -> Vec<RawContact> {
        let target_handle = match target {
            ContactTarget::World => None,
            ContactTarget::Collider(id) => match self.colliders.get(&id) {
                Some(&handle) => Some(handle),
                None => return Vec::new(),
            },
        };
        let accept = |handle: ColliderHandle, _: &Collider| {
            target_handle.is_none_or(|target| target == handle)
        };

        let mut hits = Vec::new();
        match probe {
            ContactProbe::Rigid(body) => {
                let Some(&handle) = self.bodies.get(&body) else {
                    return Vec::new();
                };
                let Some(rb) = self.context.rigid_body_set.get(handle) else {
                    return Vec::new();
                };
                for &collider_handle in rb.colliders() {
                    let Some(collider) = self.context.collider_set.get(collider_handle) else {
                        continue;
                    };
                    let groups =
                        InteractionGroups::new(collider.collision_groups().memberships, Group::ALL);
                    let filter = QueryFilter::default()
                        .exclude_rigid_body(handle)
                        .groups(groups)
                        .predicate(&accept);
                    self.collect_hits(collider.position(), collider.shape(), filter, &mut hits);
                }
            }
            ContactProbe::Soft(soft) => {
                let Some(cloth) = self.soft(soft) else {
                    return Vec::new();
                };
                // One capsule per structural edge keeps the probe continuous
                // from one anchored end to the other.
                let radius = cloth.material().contact_margin;
                let groups =
                    InteractionGroups::new(bridge::group_bits(cloth.material().group), Group::ALL);
                let positions = cloth.positions();
                for edge in cloth.edges() {
                    let segment = Capsule::new(positions[edge.a], positions[edge.b], radius);
                    let filter = QueryFilter::default().groups(groups).predicate(&accept);
                    self.collect_hits(&Isometry::identity(), &segment, filter, &mut hits);
                }
            }
        }

        hits.into_iter()
            .filter_map(|handle| self.collider_meta.get(&handle))
            .map(|meta| RawContact {
                collider: meta.id,
                group: meta.group,
                surface: meta.surface,
                owner: meta.owner,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
