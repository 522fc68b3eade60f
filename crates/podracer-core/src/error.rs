use thiserror::Error;

use crate::types::{BodyId, SoftBodyId};

/// Top-level error type for the podracer crates.
#[derive(Debug, Error)]
pub enum PodracerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Physics error: {0}")]
    Physics(#[from] PhysicsError),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Invalid physics_dt: {0} (must be > 0)")]
    InvalidPhysicsDt(f64),

    #[error("Invalid substeps: {0} (must be >= 1)")]
    InvalidSubsteps(u32),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_owned(),
            message: message.into(),
        }
    }
}

/// Problems with ingested track or vehicle geometry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("Mesh '{0}' has no vertices or no triangles")]
    EmptyMesh(String),

    #[error("Mesh '{mesh}' index {index} out of range (vertex count {len})")]
    IndexOutOfRange { mesh: String, index: u32, len: usize },

    #[error("Mesh '{mesh}' index count {len} is not a multiple of 3")]
    RaggedIndices { mesh: String, len: usize },

    #[error("Mesh '{0}' contains a non-finite position")]
    NonFinitePosition(String),

    #[error("Mesh '{mesh}' corner {corner} does not resolve to a simulated node")]
    UnmatchedCorner { mesh: String, corner: usize },
}

/// Errors raised by a collision world while building bodies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhysicsError {
    #[error("Unknown rigid body: {0}")]
    UnknownBody(BodyId),

    #[error("Unknown soft body: {0}")]
    UnknownSoftBody(SoftBodyId),

    #[error("Invalid collision shape: {0}")]
    InvalidShape(String),

    #[error("Wheels are already attached to a chassis")]
    WheelsAlreadyAttached,

    #[error("Node {node} out of range for {soft} ({len} nodes)")]
    NodeOutOfRange {
        soft: SoftBodyId,
        node: usize,
        len: usize,
    },
}
