//! Five-compartment soil-plant-herbivore contamination model.
//!
//! A contaminant enters the soil (`C`), is absorbed by plants (`C_P`), moves to
//! herbivores through predation (`C_H`) and returns to the soil when biomass
//! dies. Plant (`P`) and herbivore (`H`) biomass follow logistic growth and
//! predator-prey dynamics. The crate assembles the equations from named
//! processes, integrates them, and stores figures and tables under a directory
//! named after the model structure.
pub mod config;
pub mod error;
pub mod model;
pub mod results;
pub mod simulator;

pub use config::{OutputSettings, RunConfig};
pub use error::{ConfigError, EcotoxError, ModelError, PersistenceError, SimulationError};
pub use results::run;

pub mod prelude {
    pub mod model {
        pub use crate::model::{
            Compartment, Compartments, EquationSystem, Flux, Load, Model, ModelBuilder,
            Parameters, Process, Sign, Transfer,
        };
    }
    pub mod simulator {
        pub use crate::simulator::{simulate, Overview, Panel, SolverSettings, Trajectory};
    }
    pub mod results {
        pub use crate::results::{
            IdentifierScope, Pipeline, PlotRenderer, Renderer, ResultStore, RunId, RunReport,
        };
    }

    pub use crate::config::{OutputSettings, RunConfig};
    pub use crate::error::EcotoxError;
    pub use crate::model::{Compartment, Compartments, EquationSystem, Model, Parameters};
    pub use crate::results::{run, IdentifierScope, Pipeline, PlotRenderer, ResultStore, RunId};
    pub use crate::simulator::{simulate, SolverSettings, Trajectory};
}
