//! Engine start-up sequence and per-step drive forces.
//!
//! The pod has to be brought up in order: couple the power, start the
//! electric engine, then light the turbojet with throttle (or brake + turn).
//! Only a running turbojet turns input into engine force, brake force and
//! steering angle.

use podracer_core::config::EngineConfig;
use podracer_core::prelude::*;
use podracer_physics::prelude::WheelControl;
use serde::{Deserialize, Serialize};

/// Wheel order used everywhere: front-left, front-right, rear-left, rear-right.
pub const WHEEL_COUNT: usize = 4;

// ---------------------------------------------------------------------------
// EngineStage
// ---------------------------------------------------------------------------

/// Start-up stage, in strict unlock order.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum EngineStage {
    #[default]
    Idle,
    PowerCoupled,
    ElectricEngineRunning,
    TurbojetRunning,
}

impl EngineStage {
    /// The stage `input` unlocks from here, if any.
    pub const fn next(self, input: &InputFrame) -> Option<Self> {
        match self {
            Self::Idle if input.power_coupling => Some(Self::PowerCoupled),
            Self::PowerCoupled if input.engine_start => Some(Self::ElectricEngineRunning),
            Self::ElectricEngineRunning if input.throttle || (input.brake && input.turning()) => {
                Some(Self::TurbojetRunning)
            }
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PowerCoupled => "power coupled",
            Self::ElectricEngineRunning => "electric engine running",
            Self::TurbojetRunning => "turbojet running",
        }
    }
}

// ---------------------------------------------------------------------------
// Steering clamp
// ---------------------------------------------------------------------------

/// Largest steering angle allowed at `speed_kmh`.
///
/// Decays exponentially from `max_steering_clamp` at rest, never below
/// `min_steering_clamp`, and is exactly `min_steering_clamp` from
/// `steering_floor_speed` on.
pub fn steering_clamp(speed_kmh: f32, config: &EngineConfig) -> f32 {
    let speed = speed_kmh.abs();
    if speed >= config.steering_floor_speed {
        return config.min_steering_clamp;
    }
    (config.max_steering_clamp * (-config.steering_decay * speed).exp())
        .max(config.min_steering_clamp)
}

// ---------------------------------------------------------------------------
// EngineState
// ---------------------------------------------------------------------------

/// Engine stage plus the continuous drive outputs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    stage: EngineStage,
    engine_force: f32,
    brake_force: f32,
    steering: f32,
    afterburn: bool,
    roll_locked: bool,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one step. Returns the stage entered this step, if any.
    ///
    /// At most one transition happens per call; drive outputs follow the
    /// stage reached after it.
    pub fn update(
        &mut self,
        input: &InputFrame,
        speed_kmh: f32,
        config: &EngineConfig,
    ) -> Option<EngineStage> {
        let entered = self.stage.next(input);
        if let Some(stage) = entered {
            self.stage = stage;
        }

        if self.stage < EngineStage::TurbojetRunning {
            self.hold();
            return entered;
        }

        self.afterburn = input.throttle && input.boost;
        self.engine_force = if !input.throttle {
            0.0
        } else if self.afterburn {
            (self.engine_force + config.boost_force_increment).min(config.max_boost_force)
        } else {
            (self.engine_force + config.engine_force_increment).min(config.max_engine_force)
        };

        self.brake_force = if input.brake {
            config.max_brake_force
        } else {
            0.0
        };

        let clamp = steering_clamp(speed_kmh, config);
        let step = config.steering_increment;
        self.steering = match input.steer_sign() {
            s if s > 0.0 => self.steering + step,
            s if s < 0.0 => self.steering - step,
            _ if self.steering.abs() <= step => 0.0,
            _ => self.steering - step * self.steering.signum(),
        }
        .clamp(-clamp, clamp);

        self.roll_locked = self.afterburn && input.turning();
        entered
    }

    fn hold(&mut self) {
        self.engine_force = 0.0;
        self.brake_force = 0.0;
        self.steering = 0.0;
        self.afterburn = false;
        self.roll_locked = false;
    }

    /// Back to [`EngineStage::Idle`] with every output at zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Commands for the four wheels: front pair steers, rear pair drives and
    /// brakes.
    pub fn wheel_controls(&self) -> [WheelControl; WHEEL_COUNT] {
        let front = WheelControl {
            engine_force: 0.0,
            brake: 0.0,
            steering: self.steering,
        };
        let rear = WheelControl {
            engine_force: self.engine_force,
            brake: self.brake_force,
            steering: 0.0,
        };
        [front, front, rear, rear]
    }

    pub const fn stage(&self) -> EngineStage {
        self.stage
    }

    pub const fn engine_force(&self) -> f32 {
        self.engine_force
    }

    pub const fn brake_force(&self) -> f32 {
        self.brake_force
    }

    /// Steering angle in radians, positive to the left.
    pub const fn steering(&self) -> f32 {
        self.steering
    }

    /// Throttle and boost held together in the turbojet stage.
    pub const fn afterburn_on(&self) -> bool {
        self.afterburn
    }

    /// Reactor roll is locked while boosting through a turn.
    pub const fn roll_locked(&self) -> bool {
        self.roll_locked
    }

    pub fn power_coupling_on(&self) -> bool {
        self.stage >= EngineStage::PowerCoupled
    }

    pub fn electric_engine_on(&self) -> bool {
        self.stage >= EngineStage::ElectricEngineRunning
    }

    pub fn turbojet_on(&self) -> bool {
        self.stage == EngineStage::TurbojetRunning
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> InputFrame {
        InputFrame::idle()
    }

    fn running(config: &EngineConfig) -> EngineState {
        let mut engine = EngineState::new();
        engine.update(
            &InputFrame {
                power_coupling: true,
                ..input()
            },
            0.0,
            config,
        );
        engine.update(
            &InputFrame {
                engine_start: true,
                ..input()
            },
            0.0,
            config,
        );
        engine.update(
            &InputFrame {
                brake: true,
                turn_left: true,
                ..input()
            },
            0.0,
            config,
        );
        assert_eq!(engine.stage(), EngineStage::TurbojetRunning);
        engine.update(&input(), 0.0, config);
        engine
    }

    #[test]
    fn stages_unlock_in_order() {
        let config = EngineConfig::default();
        let mut engine = EngineState::new();

        // Engine start before coupling does nothing.
        let start = InputFrame {
            engine_start: true,
            ..input()
        };
        assert_eq!(engine.update(&start, 0.0, &config), None);
        assert_eq!(engine.stage(), EngineStage::Idle);

        let couple = InputFrame {
            power_coupling: true,
            ..input()
        };
        assert_eq!(
            engine.update(&couple, 0.0, &config),
            Some(EngineStage::PowerCoupled)
        );
        assert!(engine.power_coupling_on());
        assert!(!engine.electric_engine_on());

        assert_eq!(
            engine.update(&start, 0.0, &config),
            Some(EngineStage::ElectricEngineRunning)
        );
        let throttle = InputFrame {
            throttle: true,
            ..input()
        };
        assert_eq!(
            engine.update(&throttle, 0.0, &config),
            Some(EngineStage::TurbojetRunning)
        );
        assert!(engine.turbojet_on());
    }

    #[test]
    fn one_transition_per_step() {
        let config = EngineConfig::default();
        let mut engine = EngineState::new();
        let everything = InputFrame {
            throttle: true,
            power_coupling: true,
            engine_start: true,
            ..input()
        };
        engine.update(&everything, 0.0, &config);
        assert_eq!(engine.stage(), EngineStage::PowerCoupled);
        engine.update(&everything, 0.0, &config);
        assert_eq!(engine.stage(), EngineStage::ElectricEngineRunning);
        engine.update(&everything, 0.0, &config);
        assert_eq!(engine.stage(), EngineStage::TurbojetRunning);
    }

    #[test]
    fn brake_alone_does_not_light_turbojet() {
        let config = EngineConfig::default();
        let mut engine = EngineState::new();
        engine.update(
            &InputFrame {
                power_coupling: true,
                ..input()
            },
            0.0,
            &config,
        );
        engine.update(
            &InputFrame {
                engine_start: true,
                ..input()
            },
            0.0,
            &config,
        );
        engine.update(
            &InputFrame {
                brake: true,
                ..input()
            },
            0.0,
            &config,
        );
        assert_eq!(engine.stage(), EngineStage::ElectricEngineRunning);
        assert!(engine.brake_force().abs() < f32::EPSILON);
    }

    #[test]
    fn no_output_before_turbojet() {
        let config = EngineConfig::default();
        let mut engine = EngineState::new();
        let all = InputFrame {
            throttle: true,
            brake: true,
            turn_left: true,
            boost: true,
            ..input()
        };
        for _ in 0..10 {
            engine.update(&all, 0.0, &config);
        }
        assert_eq!(engine.stage(), EngineStage::Idle);
        assert_eq!(engine.wheel_controls(), [WheelControl::default(); 4]);
        assert!(!engine.afterburn_on());
    }

    #[test]
    fn throttle_ramps_to_cap_and_release_zeroes() {
        let config = EngineConfig::default();
        let mut engine = running(&config);
        let throttle = InputFrame {
            throttle: true,
            ..input()
        };

        let mut last = engine.engine_force();
        for _ in 0..200 {
            engine.update(&throttle, 0.0, &config);
            let force = engine.engine_force();
            assert!(force <= config.max_engine_force);
            assert!(force >= last);
            last = force;
        }
        assert!((last - config.max_engine_force).abs() < f32::EPSILON);

        engine.update(&input(), 0.0, &config);
        assert!(engine.engine_force().abs() < f32::EPSILON);
    }

    #[test]
    fn boost_raises_cap_and_leaving_it_clamps() {
        let config = EngineConfig::default();
        let mut engine = running(&config);
        let boost = InputFrame {
            throttle: true,
            boost: true,
            ..input()
        };
        for _ in 0..100 {
            engine.update(&boost, 0.0, &config);
        }
        assert!(engine.afterburn_on());
        assert!((engine.engine_force() - config.max_boost_force).abs() < f32::EPSILON);

        let throttle = InputFrame {
            throttle: true,
            ..input()
        };
        engine.update(&throttle, 0.0, &config);
        assert!(!engine.afterburn_on());
        assert!((engine.engine_force() - config.max_engine_force).abs() < f32::EPSILON);
    }

    #[test]
    fn boost_without_throttle_is_not_afterburn() {
        let config = EngineConfig::default();
        let mut engine = running(&config);
        engine.update(
            &InputFrame {
                boost: true,
                ..input()
            },
            0.0,
            &config,
        );
        assert!(!engine.afterburn_on());
        assert!(engine.engine_force().abs() < f32::EPSILON);
    }

    #[test]
    fn boosting_through_turn_locks_roll() {
        let config = EngineConfig::default();
        let mut engine = running(&config);
        engine.update(
            &InputFrame {
                throttle: true,
                boost: true,
                turn_right: true,
                ..input()
            },
            0.0,
            &config,
        );
        assert!(engine.roll_locked());
        engine.update(
            &InputFrame {
                throttle: true,
                turn_right: true,
                ..input()
            },
            0.0,
            &config,
        );
        assert!(!engine.roll_locked());
    }

    #[test]
    fn steering_ramps_and_self_centers() {
        let config = EngineConfig::default();
        let mut engine = running(&config);
        let left = InputFrame {
            turn_left: true,
            ..input()
        };
        engine.update(&left, 0.0, &config);
        assert!((engine.steering() - config.steering_increment).abs() < 1e-6);
        for _ in 0..100 {
            engine.update(&left, 0.0, &config);
        }
        assert!((engine.steering() - config.max_steering_clamp).abs() < 1e-6);

        for _ in 0..100 {
            engine.update(&input(), 0.0, &config);
        }
        assert!(engine.steering().abs() < f32::EPSILON);
    }

    #[test]
    fn steering_respects_speed_clamp() {
        let config = EngineConfig::default();
        let mut engine = running(&config);
        let right = InputFrame {
            turn_right: true,
            ..input()
        };
        for _ in 0..100 {
            engine.update(&right, 300.0, &config);
        }
        let clamp = steering_clamp(300.0, &config);
        assert!((engine.steering() + clamp).abs() < 1e-6);
        assert!(clamp < config.max_steering_clamp);
    }

    #[test]
    fn clamp_shrinks_with_speed_and_floors() {
        let config = EngineConfig::default();
        let mut last = steering_clamp(0.0, &config);
        assert!((last - config.max_steering_clamp).abs() < f32::EPSILON);
        for kmh in (10..600).step_by(10) {
            let clamp = steering_clamp(kmh as f32, &config);
            assert!(clamp <= last);
            assert!(clamp >= config.min_steering_clamp);
            last = clamp;
        }
        assert!(
            (steering_clamp(config.steering_floor_speed, &config) - config.min_steering_clamp)
                .abs()
                < f32::EPSILON
        );
    }

    #[test]
    fn wheel_controls_split_front_and_rear() {
        let config = EngineConfig::default();
        let mut engine = running(&config);
        engine.update(
            &InputFrame {
                throttle: true,
                brake: true,
                turn_left: true,
                ..input()
            },
            0.0,
            &config,
        );
        let [fl, fr, rl, rr] = engine.wheel_controls();
        assert!(fl.steering > 0.0 && (fl.steering - fr.steering).abs() < f32::EPSILON);
        assert!(fl.engine_force.abs() < f32::EPSILON);
        assert!(rl.engine_force > 0.0 && (rl.engine_force - rr.engine_force).abs() < f32::EPSILON);
        assert!((rl.brake - config.max_brake_force).abs() < f32::EPSILON);
        assert!(rl.steering.abs() < f32::EPSILON);
    }

    #[test]
    fn reset_returns_to_idle() {
        let config = EngineConfig::default();
        let mut engine = running(&config);
        engine.update(
            &InputFrame {
                throttle: true,
                ..input()
            },
            0.0,
            &config,
        );
        engine.reset();
        assert_eq!(engine, EngineState::default());
        engine.reset();
        assert_eq!(engine.stage(), EngineStage::Idle);
    }
}
