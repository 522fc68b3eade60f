//! All rapier pipeline state in one place.

use rapier3d::prelude::{
    CCDSolver, ColliderSet, DefaultBroadPhase, ImpulseJointSet, IntegrationParameters,
    IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline, QueryPipeline, Real,
    RigidBodySet, Vector,
};

// ---------------------------------------------------------------------------
// RapierContext
// ---------------------------------------------------------------------------

/// Rapier sets, pipeline objects and parameters.
///
/// `PhysicsPipeline::step()` requires mutable access to every set
/// simultaneously, so they must all live together.
pub struct RapierContext {
    // -- Rapier sets --
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,

    // -- Pipeline objects --
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,

    // -- Parameters --
    pub integration_parameters: IntegrationParameters,
    pub gravity: Vector<Real>,
}

impl RapierContext {
    pub fn new(gravity: Vector<Real>, dt: Real) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = dt;

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            integration_parameters,
            gravity,
        }
    }

    /// Run one physics substep of `integration_parameters.dt`.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Bring collider poses and the query structure in line with bodies that
    /// were moved or created outside of a step.
    pub fn refresh_queries(&mut self) {
        self.rigid_body_set
            .propagate_modified_body_positions_to_colliders(&mut self.collider_set);
        self.query_pipeline.update(&self.collider_set);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rapier3d::prelude::{ColliderBuilder, RigidBodyBuilder, vector};

    #[test]
    fn free_body_falls() {
        let mut ctx = RapierContext::new(vector![0.0, -9.81, 0.0], 1.0 / 60.0);
        let handle = ctx.rigid_body_set.insert(
            RigidBodyBuilder::dynamic()
                .translation(vector![0.0, 5.0, 0.0])
                .build(),
        );
        ctx.collider_set.insert_with_parent(
            ColliderBuilder::ball(0.5).build(),
            handle,
            &mut ctx.rigid_body_set,
        );
        for _ in 0..30 {
            ctx.step();
        }
        let y = ctx.rigid_body_set[handle].translation().y;
        assert!(y < 5.0, "body should fall, y = {y}");
    }

    #[test]
    fn refresh_without_bodies_is_harmless() {
        let mut ctx = RapierContext::new(vector![0.0, -9.81, 0.0], 1.0 / 60.0);
        ctx.refresh_queries();
        assert_eq!(ctx.collider_set.len(), 0);
    }
}
