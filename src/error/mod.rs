use std::path::PathBuf;

use thiserror::Error;

use crate::model::Compartment;

/// Errors raised while assembling a model or reading a run configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Expected {expected} parameter values, got {actual}")]
    Arity { expected: usize, actual: usize },

    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("Missing value for parameter '{0}'")]
    MissingParameter(String),

    #[error("Invalid value for {name}: {value} (must be finite and non-negative)")]
    InvalidValue { name: String, value: f64 },

    #[error("Invalid simulation horizon {0} (must be finite and non-negative)")]
    InvalidHorizon(f64),

    #[error("Failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while evaluating the right-hand side of the model.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ModelError {
    /// A load ratio was requested while its biomass compartment is exactly zero.
    #[error("Load ratio is undefined: {compartment} biomass is zero")]
    SingularState { compartment: Compartment },
}

/// Errors raised while integrating the model.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Singular state at t = {time}: {compartment} biomass reached zero")]
    SingularState { time: f64, compartment: Compartment },

    #[error("Integration failed after t = {time}: {reason}")]
    NumericalInstability { time: f64, reason: String },

    #[error("Failed to set up the ODE problem: {0}")]
    Solver(#[from] diffsol::error::DiffsolError),
}

/// Errors raised while writing run artifacts.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to render {artifact}: {reason}")]
    Render { artifact: String, reason: String },
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum EcotoxError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
