//! JSON run configuration. Every field is optional and falls back to the
//! default scenario.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{Model, Parameters, DEFAULT_INITIAL};
use crate::results::IdentifierScope;
use crate::simulator::{SolverSettings, T_MAX};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub parameters: Parameters,
    /// `[C, C_P, C_H, P, H]`
    pub initial: Vec<f64>,
    pub t_max: f64,
    pub solver: SolverSettings,
    pub output: OutputSettings,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parameters: Parameters::default(),
            initial: DEFAULT_INITIAL.to_vec(),
            t_max: T_MAX,
            solver: SolverSettings::default(),
            output: OutputSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    /// Directory under which each run gets its own folder.
    pub root: PathBuf,
    pub identifier: IdentifierScope,
    /// TrueType font for figure text. Common system fonts are tried when unset.
    pub font: Option<PathBuf>,
    pub trajectory_csv: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("output"),
            identifier: IdentifierScope::default(),
            font: None,
            trajectory_csv: false,
        }
    }
}

impl RunConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Assemble and validate the model described by this configuration.
    pub fn model(&self) -> Result<Model, ConfigError> {
        if !self.t_max.is_finite() || self.t_max < 0.0 {
            return Err(ConfigError::InvalidHorizon(self.t_max));
        }
        Model::builder()
            .parameters(self.parameters)
            .initial(self.initial.clone())
            .build()
    }
}
