//! Procedural motion of the visible pod parts.
//!
//! Rotor spin, direction-vane lean and air-scoop opening are plain fields
//! advanced once per step, so they reset with the rest of the pod.

use std::f32::consts::TAU;

use nalgebra::{Translation3, Unit, UnitQuaternion};
use podracer_core::config::AnimationConfig;
use podracer_core::prelude::*;
use serde::{Deserialize, Serialize};

use crate::chassis::ChassisPose;
use crate::engine::EngineState;

/// Move `value` toward `target` by at most `rate`.
fn approach(value: f32, target: f32, rate: f32) -> f32 {
    if (target - value).abs() <= rate {
        target
    } else {
        value + rate * (target - value).signum()
    }
}

/// Rotation by `angle` about `axis` through `pivot`, in parent space.
fn about_pivot(pivot: [f32; 3], axis: &Unit<Vec3>, angle: f32) -> Iso3 {
    let to = Translation3::new(pivot[0], pivot[1], pivot[2]);
    let rotation = UnitQuaternion::from_axis_angle(axis, angle);
    to * rotation * to.inverse()
}

// ---------------------------------------------------------------------------
// PartTransforms
// ---------------------------------------------------------------------------

/// World transform of every animated part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartTransforms {
    pub chariot: Iso3,
    pub dir_left: Iso3,
    pub dir_right: Iso3,
    pub reactors: Iso3,
    pub rotor_left: Iso3,
    pub rotor_right: Iso3,
    pub scoops_left: [Iso3; 3],
    pub scoop_hinges_left: [Iso3; 3],
    pub scoops_right: [Iso3; 3],
    pub scoop_hinges_right: [Iso3; 3],
}

impl PartTransforms {
    pub const PART_COUNT: usize = 18;

    /// Every transform, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Iso3> {
        [
            &self.chariot,
            &self.dir_left,
            &self.dir_right,
            &self.reactors,
            &self.rotor_left,
            &self.rotor_right,
        ]
        .into_iter()
        .chain(&self.scoops_left)
        .chain(&self.scoop_hinges_left)
        .chain(&self.scoops_right)
        .chain(&self.scoop_hinges_right)
    }
}

// ---------------------------------------------------------------------------
// PartAnimation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartAnimation {
    /// Rotor angle in `[0, TAU)`.
    pub rotor_angle: f32,
    /// Vane lean, positive to the left.
    pub vane_angle: f32,
    /// Air-scoop opening, `0` closed.
    pub scoop_angle: f32,
}

impl PartAnimation {
    pub fn update(
        &mut self,
        engine: &EngineState,
        input: &InputFrame,
        config: &AnimationConfig,
        max_engine_force: f32,
    ) {
        if engine.electric_engine_on() {
            let share = if max_engine_force > 0.0 {
                engine.engine_force() / max_engine_force
            } else {
                0.0
            };
            let spin = config.rotor_idle_rate + config.rotor_spin_rate * share;
            self.rotor_angle = (self.rotor_angle + spin).rem_euclid(TAU);
        }

        let lean = if engine.turbojet_on() {
            input.steer_sign() * config.vane_max_angle
        } else {
            0.0
        };
        self.vane_angle = approach(self.vane_angle, lean, config.vane_rate);

        let open = if engine.afterburn_on() {
            config.scoop_max_angle
        } else {
            0.0
        };
        self.scoop_angle = approach(self.scoop_angle, open, config.scoop_rate);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn transforms(&self, pose: &ChassisPose, config: &AnimationConfig) -> PartTransforms {
        let pivots = &config.pivots;
        let reactor = pose.reactor.transform;
        let (x, y, z) = (Vec3::x_axis(), Vec3::y_axis(), Vec3::z_axis());

        let scoops = |points: &[[f32; 3]; 3], angle: f32| {
            points.map(|p| reactor * about_pivot(p, &z, angle))
        };
        let half = self.scoop_angle * 0.5;

        PartTransforms {
            chariot: pose.chariot.transform,
            dir_left: reactor * about_pivot(pivots.dir_left, &y, self.vane_angle),
            dir_right: reactor * about_pivot(pivots.dir_right, &y, self.vane_angle),
            reactors: reactor,
            rotor_left: reactor * about_pivot(pivots.rotor_left, &z, self.rotor_angle),
            rotor_right: reactor * about_pivot(pivots.rotor_right, &z, -self.rotor_angle),
            scoops_left: scoops(&pivots.scoops_left, self.scoop_angle),
            scoop_hinges_left: pivots
                .scoops_left
                .map(|p| reactor * about_pivot(p, &x, half)),
            scoops_right: scoops(&pivots.scoops_right, -self.scoop_angle),
            scoop_hinges_right: pivots
                .scoops_right
                .map(|p| reactor * about_pivot(p, &x, half)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
