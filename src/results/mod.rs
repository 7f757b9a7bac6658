//! Run identifiers, persisted artifacts and the end-to-end pipeline.
mod fingerprint;
mod render;
mod store;

pub use fingerprint::{IdentifierScope, RunId};
pub use render::{PlotRenderer, Renderer};
pub use store::{
    Artifacts, ResultStore, MODEL_FIGURE, OVERVIEW_FIGURE, PARAMETERS_TABLE, TRAJECTORY_TABLE,
};

use std::path::PathBuf;

use crate::config::RunConfig;
use crate::error::EcotoxError;
use crate::model::Model;
use crate::simulator::{simulate, SolverSettings, Trajectory};

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub id: RunId,
    pub location: PathBuf,
    pub trajectory: Trajectory,
}

/// Integrates a model and stores what it produced.
pub struct Pipeline<R> {
    store: ResultStore,
    renderer: R,
    trajectory_csv: bool,
}

impl<R: Renderer> Pipeline<R> {
    pub fn new(store: ResultStore, renderer: R) -> Self {
        Self {
            store,
            renderer,
            trajectory_csv: false,
        }
    }

    /// Also write the sampled trajectory as [TRAJECTORY_TABLE].
    pub fn with_trajectory_csv(mut self, enabled: bool) -> Self {
        self.trajectory_csv = enabled;
        self
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Integrate `model` up to `t_max`, derive the overview and persist every
    /// artifact. Nothing is written unless integration succeeded.
    pub fn run(
        &self,
        model: &Model,
        t_max: f64,
        settings: &SolverSettings,
        scope: IdentifierScope,
    ) -> Result<RunReport, EcotoxError> {
        let id = RunId::for_scope(model, scope);
        tracing::info!(id = %id, t_max, "Simulating model");
        tracing::debug!("Equations:\n{}", model.system());

        let trajectory = simulate(model, t_max, settings)?;
        if let Some((t, state)) = trajectory.last() {
            tracing::info!(t, state = %state, "Integration complete");
        }

        let overview = trajectory.overview();
        let artifacts = Artifacts {
            system: model.system(),
            parameters: model.parameters(),
            overview: &overview,
            trajectory: self.trajectory_csv.then_some(&trajectory),
        };
        let location = self.store.persist(&id, &artifacts, &self.renderer)?;
        tracing::info!(location = %location.display(), "Results saved");

        Ok(RunReport {
            id,
            location,
            trajectory,
        })
    }
}

/// Run a complete configuration with the default [PlotRenderer].
pub fn run(config: &RunConfig) -> Result<RunReport, EcotoxError> {
    let model = config.model()?;
    let renderer = PlotRenderer::new(config.output.font.as_deref());
    Pipeline::new(ResultStore::new(&config.output.root), renderer)
        .with_trajectory_csv(config.output.trajectory_csv)
        .run(&model, config.t_max, &config.solver, config.output.identifier)
}
