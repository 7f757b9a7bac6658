use std::fs::File;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;

use crate::error::PersistenceError;
use crate::model::{EquationSystem, Parameters};
use crate::results::fingerprint::RunId;
use crate::results::render::Renderer;
use crate::simulator::{Overview, Trajectory};

pub const MODEL_FIGURE: &str = "model.png";
pub const PARAMETERS_TABLE: &str = "parameters.csv";
pub const OVERVIEW_FIGURE: &str = "results_overview.png";
pub const TRAJECTORY_TABLE: &str = "trajectory.csv";

const ALL_ARTIFACTS: [&str; 4] = [MODEL_FIGURE, PARAMETERS_TABLE, OVERVIEW_FIGURE, TRAJECTORY_TABLE];

/// Everything a run leaves behind.
#[derive(Debug, Clone, Copy)]
pub struct Artifacts<'a> {
    pub system: &'a EquationSystem,
    pub parameters: &'a Parameters,
    pub overview: &'a Overview,
    /// Written as [TRAJECTORY_TABLE] when present.
    pub trajectory: Option<&'a Trajectory>,
}

/// Output directories keyed by [RunId] under a common root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `root/<id>/`
    pub fn location(&self, id: &RunId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Write all artifacts of a run into [ResultStore::location].
    ///
    /// Files are first produced in a staging directory inside the root and
    /// only moved to their final names once every one of them was written, so
    /// a failing renderer leaves the files of an earlier run untouched. A new
    /// run directory is moved into place whole. An existing run with the same
    /// id is overwritten file by file, and artifacts this run did not produce
    /// are removed from it.
    pub fn persist(
        &self,
        id: &RunId,
        artifacts: &Artifacts<'_>,
        renderer: &dyn Renderer,
    ) -> Result<PathBuf, PersistenceError> {
        std::fs::create_dir_all(&self.root).map_err(|e| PersistenceError::io(&self.root, e))?;
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.root)
            .map_err(|e| PersistenceError::io(&self.root, e))?;

        let mut written = Vec::with_capacity(4);

        let path = staging.path().join(MODEL_FIGURE);
        renderer.render_model(artifacts.system, &path)?;
        written.push(MODEL_FIGURE);

        let path = staging.path().join(PARAMETERS_TABLE);
        write_parameters(artifacts.parameters, &path)?;
        written.push(PARAMETERS_TABLE);

        let path = staging.path().join(OVERVIEW_FIGURE);
        renderer.render_overview(artifacts.overview, &path)?;
        written.push(OVERVIEW_FIGURE);

        if let Some(trajectory) = artifacts.trajectory {
            let path = staging.path().join(TRAJECTORY_TABLE);
            let file = File::create(&path).map_err(|e| PersistenceError::io(&path, e))?;
            trajectory.write_csv(file)?;
            written.push(TRAJECTORY_TABLE);
        }

        for name in &written {
            let path = staging.path().join(name);
            if !path.is_file() {
                return Err(PersistenceError::Render {
                    artifact: name.to_string(),
                    reason: "no file was produced".to_string(),
                });
            }
        }

        let location = self.location(id);
        if !location.exists() {
            // A fresh run directory appears in one step.
            std::fs::rename(staging.path(), &location)
                .map_err(|e| PersistenceError::io(&location, e))?;
        } else {
            // Replacing an earlier run goes file by file, so a failing rename
            // can leave a mix of old and new files behind.
            for name in ALL_ARTIFACTS {
                let stale = location.join(name);
                if !written.contains(&name) && stale.exists() {
                    std::fs::remove_file(&stale).map_err(|e| PersistenceError::io(&stale, e))?;
                }
            }
            for name in written {
                let target = location.join(name);
                std::fs::rename(staging.path().join(name), &target)
                    .map_err(|e| PersistenceError::io(&target, e))?;
            }
        }
        tracing::debug!(location = %location.display(), "Artifacts written");
        Ok(location)
    }
}

/// Header row of the parameter names and a single row of values.
fn write_parameters(parameters: &Parameters, path: &Path) -> Result<(), PersistenceError> {
    let file = File::create(path).map_err(|e| PersistenceError::io(path, e))?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);
    writer.write_record(Parameters::NAMES)?;
    writer.write_record(parameters.to_vec().iter().map(|v| v.to_string()))?;
    writer.flush().map_err(|e| PersistenceError::io(path, e))?;
    Ok(())
}
