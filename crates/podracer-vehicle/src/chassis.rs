//! Two-body pod chassis: chariot linked to the wheeled reactor block.

use podracer_core::config::{BodyBlockConfig, PodConfig, WheelConfig};
use podracer_core::prelude::*;
use podracer_physics::prelude::*;
use tracing::debug;

use crate::engine::EngineState;

// ---------------------------------------------------------------------------
// ChassisPose
// ---------------------------------------------------------------------------

/// Motion state of both bodies, copied out of the world after a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChassisPose {
    pub chariot: BodyState,
    pub reactor: BodyState,
}

impl ChassisPose {
    /// Reactor block speed in km/h.
    pub fn speed_kmh(&self) -> f32 {
        self.reactor.linvel.norm() * 3.6
    }

    /// Reactor block forward axis (+Z) in world space.
    pub fn direction(&self) -> Vec3 {
        self.reactor.transform.rotation * Vec3::z()
    }
}

// ---------------------------------------------------------------------------
// PodChassis
// ---------------------------------------------------------------------------

fn vec3(v: [f32; 3]) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}

fn block_desc(block: &BodyBlockConfig, pose: Iso3, config: &PodConfig) -> RigidBodyDesc {
    RigidBodyDesc {
        shape: BodyShape::Cuboid {
            half_extents: vec3(block.half_extents),
        },
        mass: block.mass,
        transform: pose,
        group: CollisionGroup::POD,
        collides_with: CollisionGroup::ENV,
        linear_damping: config.chassis.linear_damping,
        angular_damping: config.chassis.angular_damping,
    }
}

/// Wheel descriptors in FL, FR, RL, RR order.
pub fn wheel_descs(wheels: &WheelConfig) -> Vec<WheelDesc> {
    wheels
        .connections
        .iter()
        .map(|&c| WheelDesc {
            connection: Point3::from(vec3(c)),
            suspension_dir: -Vec3::y(),
            axle: -Vec3::x(),
            rest_length: wheels.rest_length,
            radius: wheels.radius,
            suspension_stiffness: wheels.suspension_stiffness,
            damping_compression: wheels.damping_compression,
            damping_relaxation: wheels.damping_relaxation,
            friction_slip: wheels.friction_slip,
            roll_influence: wheels.roll_influence,
            max_suspension_travel: wheels.max_suspension_travel,
        })
        .collect()
}

/// Chariot and reactor block registered in a collision world.
///
/// The home transforms are cached at construction; they are what
/// [`reset`](Self::reset) restores.
#[derive(Debug, Clone)]
pub struct PodChassis {
    chariot: BodyId,
    reactor: BodyId,
    link: JointId,
    chariot_home: Iso3,
    reactor_home: Iso3,
    roll_locked: bool,
}

impl PodChassis {
    /// Register both bodies, their link and the reactor wheels at `spawn`.
    pub fn build<W: CollisionWorld + ?Sized>(
        world: &mut W,
        config: &PodConfig,
        spawn: &Iso3,
    ) -> Result<Self, PhysicsError> {
        let chassis = &config.chassis;
        let chariot_offset = vec3(chassis.chariot.offset);
        let reactor_offset = vec3(chassis.reactor.offset);
        let chariot_home = spawn * Iso3::translation(chariot_offset.x, chariot_offset.y, chariot_offset.z);
        let reactor_home = spawn * Iso3::translation(reactor_offset.x, reactor_offset.y, reactor_offset.z);

        let reactor = world.add_rigid_body(&block_desc(&chassis.reactor, reactor_home, config))?;
        let chariot = world.add_rigid_body(&block_desc(&chassis.chariot, chariot_home, config))?;

        // Joint frame at the chariot origin, expressed in both bodies.
        let link = world.link_bodies(
            reactor,
            chariot,
            &LinkDesc {
                anchor_a: Point3::from(chariot_offset - reactor_offset),
                anchor_b: Point3::origin(),
                linear_limits: chassis.link_linear_limits,
                angular_limits: chassis.link_angular_limits,
            },
        )?;

        world.attach_wheels(reactor, &wheel_descs(&config.wheels))?;
        debug!(%chariot, %reactor, %link, world = world.name(), "pod chassis built");

        Ok(Self {
            chariot,
            reactor,
            link,
            chariot_home,
            reactor_home,
            roll_locked: false,
        })
    }

    /// Push the engine outputs for the next step.
    pub fn apply<W: CollisionWorld + ?Sized>(&mut self, world: &mut W, engine: &EngineState) {
        for (i, control) in engine.wheel_controls().into_iter().enumerate() {
            world.set_wheel_control(i, control);
        }
        if engine.roll_locked() != self.roll_locked {
            self.roll_locked = engine.roll_locked();
            world.set_enabled_rotations(self.reactor, [true, true, !self.roll_locked]);
        }
    }

    /// Current motion state. A body missing from the world reads as resting
    /// at its home transform.
    pub fn read<W: CollisionWorld + ?Sized>(&self, world: &W) -> ChassisPose {
        ChassisPose {
            chariot: world
                .body_state(self.chariot)
                .unwrap_or(BodyState::at_rest(self.chariot_home)),
            reactor: world
                .body_state(self.reactor)
                .unwrap_or(BodyState::at_rest(self.reactor_home)),
        }
    }

    /// Both bodies back home with zero velocity and no pending force.
    pub fn reset<W: CollisionWorld + ?Sized>(&mut self, world: &mut W) {
        world.reset_body(self.reactor, &self.reactor_home);
        world.reset_body(self.chariot, &self.chariot_home);
        if self.roll_locked {
            world.set_enabled_rotations(self.reactor, [true; 3]);
            self.roll_locked = false;
        }
    }

    pub const fn chariot(&self) -> BodyId {
        self.chariot
    }

    pub const fn reactor(&self) -> BodyId {
        self.reactor
    }

    pub const fn link(&self) -> JointId {
        self.link
    }

    pub fn home(&self) -> ChassisPose {
        ChassisPose {
            chariot: BodyState::at_rest(self.chariot_home),
            reactor: BodyState::at_rest(self.reactor_home),
        }
    }

    pub const fn roll_locked(&self) -> bool {
        self.roll_locked
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use podracer_test_utils::ScriptedWorld;

    fn build() -> (ScriptedWorld, PodChassis, PodConfig) {
        let config = PodConfig::default();
        let mut world = ScriptedWorld::default();
        let chassis =
            PodChassis::build(&mut world, &config, &Iso3::translation(0.0, 1.0, 0.0)).unwrap();
        (world, chassis, config)
    }

    #[test]
    fn builds_two_bodies_link_and_wheels() {
        let (world, chassis, config) = build();
        assert_eq!(world.body_count(), 2);
        assert_eq!(world.link_count(), 1);
        assert_eq!(world.wheels().len(), 4);
        assert_ne!(chassis.chariot(), chassis.reactor());

        let reactor = world.body_desc(chassis.reactor()).unwrap();
        assert!((reactor.mass - config.chassis.reactor.mass).abs() < f32::EPSILON);
        assert_eq!(reactor.group, CollisionGroup::POD);
        assert_eq!(reactor.collides_with, CollisionGroup::ENV);
    }

    #[test]
    fn chariot_sits_at_its_offset() {
        let (world, chassis, config) = build();
        let pose = chassis.read(&world);
        let [x, y, z] = config.chassis.chariot.offset;
        let t = pose.chariot.transform.translation.vector;
        assert!((t - Vec3::new(x, 1.0 + y, z)).norm() < 1e-6);
        assert!(pose.direction().z > 0.99);
        assert!(pose.speed_kmh().abs() < f32::EPSILON);
    }

    #[test]
    fn wheel_order_front_then_rear() {
        let descs = wheel_descs(&WheelConfig::default());
        assert!(descs[0].connection.z > 0.0 && descs[1].connection.z > 0.0);
        assert!(descs[2].connection.z < 0.0 && descs[3].connection.z < 0.0);
        assert!(descs[0].connection.x < descs[1].connection.x);
    }

    #[test]
    fn roll_lock_toggles_reactor_rotation() {
        let (mut world, mut chassis, config) = build();
        let mut engine = EngineState::new();
        for input in [
            InputFrame {
                power_coupling: true,
                ..InputFrame::idle()
            },
            InputFrame {
                engine_start: true,
                ..InputFrame::idle()
            },
            InputFrame {
                throttle: true,
                boost: true,
                turn_left: true,
                ..InputFrame::idle()
            },
        ] {
            engine.update(&input, 0.0, &config.engine);
        }
        chassis.apply(&mut world, &engine);
        assert_eq!(
            world.enabled_rotations(chassis.reactor()),
            Some([true, true, false])
        );
        assert!(world.wheel_controls()[2].engine_force > 0.0);

        engine.update(&InputFrame::idle(), 0.0, &config.engine);
        chassis.apply(&mut world, &engine);
        assert_eq!(
            world.enabled_rotations(chassis.reactor()),
            Some([true, true, true])
        );
    }

    #[test]
    fn reset_restores_home() {
        let (mut world, mut chassis, _) = build();
        world.set_body_velocity(chassis.reactor(), Vec3::new(0.0, 0.0, 20.0));
        world.step(1.0 / 60.0, 4);
        assert!(chassis.read(&world).speed_kmh() > 0.0);

        chassis.reset(&mut world);
        assert_eq!(chassis.read(&world), chassis.home());
    }
}
