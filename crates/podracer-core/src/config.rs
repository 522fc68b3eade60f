use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_physics_dt() -> f64 {
    1.0 / 60.0
}
const fn default_substeps() -> u32 {
    4
}
const fn default_gravity() -> [f32; 3] {
    [0.0, -9.81, 0.0]
}

const fn default_max_engine_force() -> f32 {
    3000.0
}
const fn default_engine_force_increment() -> f32 {
    50.0
}
const fn default_max_boost_force() -> f32 {
    9000.0
}
const fn default_boost_force_increment() -> f32 {
    250.0
}
const fn default_max_brake_force() -> f32 {
    120.0
}
const fn default_steering_increment() -> f32 {
    0.02
}
const fn default_max_steering_clamp() -> f32 {
    0.35
}
const fn default_min_steering_clamp() -> f32 {
    0.03
}
const fn default_steering_decay() -> f32 {
    0.012
}
const fn default_steering_floor_speed() -> f32 {
    400.0
}

const fn default_rest_length() -> f32 {
    0.6
}
const fn default_wheel_radius() -> f32 {
    0.5
}
const fn default_suspension_stiffness() -> f32 {
    20.0
}
const fn default_damping_compression() -> f32 {
    4.4
}
const fn default_damping_relaxation() -> f32 {
    2.3
}
const fn default_friction_slip() -> f32 {
    1000.0
}
const fn default_roll_influence() -> f32 {
    0.1
}
const fn default_max_suspension_travel() -> f32 {
    0.5
}
const fn default_wheel_connections() -> [[f32; 3]; 4] {
    [
        [-1.6, -0.4, 2.2],
        [1.6, -0.4, 2.2],
        [-1.6, -0.4, -2.2],
        [1.6, -0.4, -2.2],
    ]
}

fn default_chariot_block() -> BodyBlockConfig {
    BodyBlockConfig {
        half_extents: [0.6, 0.4, 1.0],
        mass: 150.0,
        offset: [0.0, 0.2, -6.0],
    }
}
fn default_reactor_block() -> BodyBlockConfig {
    BodyBlockConfig {
        half_extents: [2.0, 0.6, 2.8],
        mass: 800.0,
        offset: [0.0, 0.0, 0.0],
    }
}
const fn default_link_linear_limits() -> [[f32; 2]; 3] {
    [[-0.1, 0.1], [-0.2, 0.2], [0.0, 0.0]]
}
const fn default_link_angular_limits() -> [[f32; 2]; 3] {
    [[0.0, 0.0], [0.0, 0.0], [0.0, 0.0]]
}
const fn default_linear_damping() -> f32 {
    0.1
}
const fn default_angular_damping() -> f32 {
    0.8
}

const fn default_cable_mass() -> f32 {
    4.0
}
const fn default_cable_stiffness() -> f32 {
    0.9
}
const fn default_bending_stiffness() -> f32 {
    0.4
}
const fn default_pose_matching() -> f32 {
    0.2
}
const fn default_cable_iterations() -> u32 {
    8
}
const fn default_cable_damping() -> f32 {
    0.02
}
const fn default_anchor_count() -> usize {
    4
}
const fn default_anchor_axis() -> usize {
    2
}
const fn default_contact_margin() -> f32 {
    0.05
}

const fn default_rotor_spin_rate() -> f32 {
    0.6
}
const fn default_rotor_idle_rate() -> f32 {
    0.1
}
const fn default_vane_max_angle() -> f32 {
    0.5
}
const fn default_vane_rate() -> f32 {
    0.05
}
const fn default_scoop_max_angle() -> f32 {
    0.9
}
const fn default_scoop_rate() -> f32 {
    0.08
}
fn default_pivots() -> PartPivots {
    PartPivots::default()
}

const fn default_laps() -> u32 {
    3
}

const fn default_thickness() -> f32 {
    0.05
}
const fn default_narrow_jitter() -> f32 {
    0.0625
}
const fn default_wide_jitter() -> f32 {
    0.125
}
const fn default_segments() -> usize {
    12
}
const fn default_bolts() -> usize {
    3
}

fn positive(field: &str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} must be > 0")))
    }
}

// ---------------------------------------------------------------------------
// PodConfig
// ---------------------------------------------------------------------------

/// Complete tuning of one podracer: solver rates, engine laws, wheels,
/// chassis bodies, cables, animation, race rules and the power arc.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodConfig {
    #[serde(default)]
    pub sim: SimConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub wheels: WheelConfig,
    #[serde(default)]
    pub chassis: ChassisConfig,
    #[serde(default)]
    pub cable: CableConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub race: RaceConfig,
    #[serde(default)]
    pub power: PowerConfig,
}

impl PodConfig {
    /// Validate every section. Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sim.validate()?;
        self.engine.validate()?;
        self.wheels.validate()?;
        self.chassis.validate()?;
        self.cable.validate()?;
        self.animation.validate()?;
        if self.race.laps == 0 {
            return Err(ConfigError::invalid("race.laps", "must be >= 1"));
        }
        self.power.validate()
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse from a TOML string. Missing sections and fields take defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Fixed physics timestep in seconds (default: 1/60).
    #[serde(default = "default_physics_dt")]
    pub physics_dt: f64,

    /// Solver subdivisions of one fixed step.
    #[serde(default = "default_substeps")]
    pub substeps: u32,

    /// Gravity vector [x, y, z] in m/s^2. Y is up.
    #[serde(default = "default_gravity")]
    pub gravity: [f32; 3],
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            physics_dt: default_physics_dt(),
            substeps: default_substeps(),
            gravity: default_gravity(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.physics_dt <= 0.0 || !self.physics_dt.is_finite() {
            return Err(ConfigError::InvalidPhysicsDt(self.physics_dt));
        }
        if self.substeps == 0 {
            return Err(ConfigError::InvalidSubsteps(self.substeps));
        }
        Ok(())
    }

    /// Physics rate in Hz.
    pub fn physics_hz(&self) -> f64 {
        1.0 / self.physics_dt
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Force and steering laws of the engine state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_max_engine_force")]
    pub max_engine_force: f32,
    /// Per-step ramp while throttle is held.
    #[serde(default = "default_engine_force_increment")]
    pub engine_force_increment: f32,
    #[serde(default = "default_max_boost_force")]
    pub max_boost_force: f32,
    #[serde(default = "default_boost_force_increment")]
    pub boost_force_increment: f32,
    #[serde(default = "default_max_brake_force")]
    pub max_brake_force: f32,
    /// Per-step steering ramp in radians.
    #[serde(default = "default_steering_increment")]
    pub steering_increment: f32,
    /// Steering lock at standstill (radians).
    #[serde(default = "default_max_steering_clamp")]
    pub max_steering_clamp: f32,
    /// Steering lock floor (radians).
    #[serde(default = "default_min_steering_clamp")]
    pub min_steering_clamp: f32,
    /// Exponential shrink rate of the lock, per km/h.
    #[serde(default = "default_steering_decay")]
    pub steering_decay: f32,
    /// Speed (km/h) at and above which the lock is the floor value.
    #[serde(default = "default_steering_floor_speed")]
    pub steering_floor_speed: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_engine_force: default_max_engine_force(),
            engine_force_increment: default_engine_force_increment(),
            max_boost_force: default_max_boost_force(),
            boost_force_increment: default_boost_force_increment(),
            max_brake_force: default_max_brake_force(),
            steering_increment: default_steering_increment(),
            max_steering_clamp: default_max_steering_clamp(),
            min_steering_clamp: default_min_steering_clamp(),
            steering_decay: default_steering_decay(),
            steering_floor_speed: default_steering_floor_speed(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("engine.max_engine_force", self.max_engine_force)?;
        positive("engine.engine_force_increment", self.engine_force_increment)?;
        positive("engine.max_boost_force", self.max_boost_force)?;
        positive("engine.boost_force_increment", self.boost_force_increment)?;
        positive("engine.max_brake_force", self.max_brake_force)?;
        positive("engine.steering_increment", self.steering_increment)?;
        positive("engine.max_steering_clamp", self.max_steering_clamp)?;
        positive("engine.min_steering_clamp", self.min_steering_clamp)?;
        positive("engine.steering_floor_speed", self.steering_floor_speed)?;
        if self.max_boost_force < self.max_engine_force {
            return Err(ConfigError::invalid(
                "engine.max_boost_force",
                "must be >= engine.max_engine_force",
            ));
        }
        if self.min_steering_clamp > self.max_steering_clamp {
            return Err(ConfigError::invalid(
                "engine.min_steering_clamp",
                "must be <= engine.max_steering_clamp",
            ));
        }
        if self.steering_decay < 0.0 {
            return Err(ConfigError::invalid("engine.steering_decay", "must be >= 0"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WheelConfig
// ---------------------------------------------------------------------------

/// Raycast wheel tuning shared by all four wheels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelConfig {
    #[serde(default = "default_rest_length")]
    pub rest_length: f32,
    #[serde(default = "default_wheel_radius")]
    pub radius: f32,
    #[serde(default = "default_suspension_stiffness")]
    pub suspension_stiffness: f32,
    #[serde(default = "default_damping_compression")]
    pub damping_compression: f32,
    #[serde(default = "default_damping_relaxation")]
    pub damping_relaxation: f32,
    #[serde(default = "default_friction_slip")]
    pub friction_slip: f32,
    #[serde(default = "default_roll_influence")]
    pub roll_influence: f32,
    #[serde(default = "default_max_suspension_travel")]
    pub max_suspension_travel: f32,
    /// Reactor-local connection points: front-left, front-right, rear-left, rear-right.
    #[serde(default = "default_wheel_connections")]
    pub connections: [[f32; 3]; 4],
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            rest_length: default_rest_length(),
            radius: default_wheel_radius(),
            suspension_stiffness: default_suspension_stiffness(),
            damping_compression: default_damping_compression(),
            damping_relaxation: default_damping_relaxation(),
            friction_slip: default_friction_slip(),
            roll_influence: default_roll_influence(),
            max_suspension_travel: default_max_suspension_travel(),
            connections: default_wheel_connections(),
        }
    }
}

impl WheelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("wheels.rest_length", self.rest_length)?;
        positive("wheels.radius", self.radius)?;
        positive("wheels.suspension_stiffness", self.suspension_stiffness)?;
        positive("wheels.max_suspension_travel", self.max_suspension_travel)?;
        if self.connections.iter().flatten().any(|c| !c.is_finite()) {
            return Err(ConfigError::invalid("wheels.connections", "must be finite"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ChassisConfig
// ---------------------------------------------------------------------------

/// One rigid box of the chassis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyBlockConfig {
    pub half_extents: [f32; 3],
    pub mass: f32,
    /// Position relative to the pod spawn origin.
    #[serde(default)]
    pub offset: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChassisConfig {
    #[serde(default = "default_chariot_block")]
    pub chariot: BodyBlockConfig,
    #[serde(default = "default_reactor_block")]
    pub reactor: BodyBlockConfig,
    /// Per-axis `[lo, hi]` translation play of the chariot link.
    #[serde(default = "default_link_linear_limits")]
    pub link_linear_limits: [[f32; 2]; 3],
    /// Per-axis `[lo, hi]` rotation play of the chariot link (radians).
    #[serde(default = "default_link_angular_limits")]
    pub link_angular_limits: [[f32; 2]; 3],
    #[serde(default = "default_linear_damping")]
    pub linear_damping: f32,
    #[serde(default = "default_angular_damping")]
    pub angular_damping: f32,
}

impl Default for ChassisConfig {
    fn default() -> Self {
        Self {
            chariot: default_chariot_block(),
            reactor: default_reactor_block(),
            link_linear_limits: default_link_linear_limits(),
            link_angular_limits: default_link_angular_limits(),
            linear_damping: default_linear_damping(),
            angular_damping: default_angular_damping(),
        }
    }
}

impl ChassisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, block) in [("chassis.chariot", &self.chariot), ("chassis.reactor", &self.reactor)] {
            positive(&format!("{name}.mass"), block.mass)?;
            if block.half_extents.iter().any(|h| *h <= 0.0) {
                return Err(ConfigError::invalid(
                    &format!("{name}.half_extents"),
                    "must all be > 0",
                ));
            }
        }
        let mut limits = self.link_linear_limits.iter().chain(&self.link_angular_limits);
        if limits.any(|[lo, hi]| lo > hi) {
            return Err(ConfigError::invalid("chassis.link_limits", "lo must be <= hi"));
        }
        if self.linear_damping < 0.0 || self.angular_damping < 0.0 {
            return Err(ConfigError::invalid("chassis.damping", "must be >= 0"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CableConfig
// ---------------------------------------------------------------------------

/// Soft-body material and anchoring of the two power cables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableConfig {
    #[serde(default = "default_cable_mass")]
    pub total_mass: f32,
    /// Structural edge stiffness in `(0, 1]`.
    #[serde(default = "default_cable_stiffness")]
    pub stiffness: f32,
    #[serde(default = "default_bending_stiffness")]
    pub bending_stiffness: f32,
    /// Pull toward the rest shape in `[0, 1]`.
    #[serde(default = "default_pose_matching")]
    pub pose_matching: f32,
    #[serde(default = "default_cable_iterations")]
    pub iterations: u32,
    #[serde(default = "default_cable_damping")]
    pub damping: f32,
    /// Nodes pinned at each end.
    #[serde(default = "default_anchor_count")]
    pub anchor_count: usize,
    /// Axis (0 = x, 1 = y, 2 = z) the nodes are sorted along to find both ends.
    #[serde(default = "default_anchor_axis")]
    pub anchor_axis: usize,
    /// Radius of the probe ball placed on each node for contact tests.
    #[serde(default = "default_contact_margin")]
    pub contact_margin: f32,
}

impl Default for CableConfig {
    fn default() -> Self {
        Self {
            total_mass: default_cable_mass(),
            stiffness: default_cable_stiffness(),
            bending_stiffness: default_bending_stiffness(),
            pose_matching: default_pose_matching(),
            iterations: default_cable_iterations(),
            damping: default_cable_damping(),
            anchor_count: default_anchor_count(),
            anchor_axis: default_anchor_axis(),
            contact_margin: default_contact_margin(),
        }
    }
}

impl CableConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("cable.total_mass", self.total_mass)?;
        positive("cable.contact_margin", self.contact_margin)?;
        for (field, value) in [
            ("cable.stiffness", self.stiffness),
            ("cable.bending_stiffness", self.bending_stiffness),
            ("cable.pose_matching", self.pose_matching),
            ("cable.damping", self.damping),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(field, format!("{value} must be in [0, 1]")));
            }
        }
        if self.iterations == 0 {
            return Err(ConfigError::invalid("cable.iterations", "must be >= 1"));
        }
        if self.anchor_count == 0 {
            return Err(ConfigError::invalid("cable.anchor_count", "must be >= 1"));
        }
        if self.anchor_axis > 2 {
            return Err(ConfigError::invalid("cable.anchor_axis", "must be 0, 1 or 2"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AnimationConfig
// ---------------------------------------------------------------------------

/// Reactor-local hinge points of the animated parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartPivots {
    pub dir_left: [f32; 3],
    pub dir_right: [f32; 3],
    pub rotor_left: [f32; 3],
    pub rotor_right: [f32; 3],
    pub scoops_left: [[f32; 3]; 3],
    pub scoops_right: [[f32; 3]; 3],
}

impl Default for PartPivots {
    fn default() -> Self {
        Self {
            dir_left: [-1.9, 0.6, -2.4],
            dir_right: [1.9, 0.6, -2.4],
            rotor_left: [-1.6, 0.0, 2.6],
            rotor_right: [1.6, 0.0, 2.6],
            scoops_left: [[-2.1, 0.3, 1.6], [-2.1, 0.0, 1.6], [-2.1, -0.3, 1.6]],
            scoops_right: [[2.1, 0.3, 1.6], [2.1, 0.0, 1.6], [2.1, -0.3, 1.6]],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Rotor radians per step at full engine force.
    #[serde(default = "default_rotor_spin_rate")]
    pub rotor_spin_rate: f32,
    /// Rotor radians per step once the electric engine runs.
    #[serde(default = "default_rotor_idle_rate")]
    pub rotor_idle_rate: f32,
    #[serde(default = "default_vane_max_angle")]
    pub vane_max_angle: f32,
    #[serde(default = "default_vane_rate")]
    pub vane_rate: f32,
    #[serde(default = "default_scoop_max_angle")]
    pub scoop_max_angle: f32,
    #[serde(default = "default_scoop_rate")]
    pub scoop_rate: f32,
    #[serde(default = "default_pivots")]
    pub pivots: PartPivots,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            rotor_spin_rate: default_rotor_spin_rate(),
            rotor_idle_rate: default_rotor_idle_rate(),
            vane_max_angle: default_vane_max_angle(),
            vane_rate: default_vane_rate(),
            scoop_max_angle: default_scoop_max_angle(),
            scoop_rate: default_scoop_rate(),
            pivots: default_pivots(),
        }
    }
}

impl AnimationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("animation.vane_rate", self.vane_rate)?;
        positive("animation.scoop_rate", self.scoop_rate)?;
        if self.vane_max_angle < 0.0 || self.scoop_max_angle < 0.0 {
            return Err(ConfigError::invalid("animation.max_angle", "must be >= 0"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RaceConfig / PowerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceConfig {
    #[serde(default = "default_laps")]
    pub laps: u32,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            laps: default_laps(),
        }
    }
}

/// Lightning arc drawn between the two engine connectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerConfig {
    #[serde(default = "default_thickness")]
    pub thickness: f32,
    #[serde(default = "default_narrow_jitter")]
    pub narrow_jitter: f32,
    #[serde(default = "default_wide_jitter")]
    pub wide_jitter: f32,
    /// Nodes per bolt, both ends included.
    #[serde(default = "default_segments")]
    pub segments: usize,
    #[serde(default = "default_bolts")]
    pub bolts: usize,
    /// Fixed RNG seed. `None` seeds from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            thickness: default_thickness(),
            narrow_jitter: default_narrow_jitter(),
            wide_jitter: default_wide_jitter(),
            segments: default_segments(),
            bolts: default_bolts(),
            seed: None,
        }
    }
}

impl PowerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("power.thickness", self.thickness)?;
        positive("power.narrow_jitter", self.narrow_jitter)?;
        positive("power.wide_jitter", self.wide_jitter)?;
        if self.segments < 2 {
            return Err(ConfigError::invalid("power.segments", "must be >= 2"));
        }
        if self.bolts == 0 {
            return Err(ConfigError::invalid("power.bolts", "must be >= 1"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
