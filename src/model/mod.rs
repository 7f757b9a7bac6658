//! Model definition: compartments, rate constants, process terms and the
//! equation system that couples them.
mod compartment;
mod equation;
mod params;
mod process;

pub use compartment::{Compartment, Compartments};
pub use equation::{EquationSystem, Flux, Sign, Transfer, CANONICAL_VERSION};
pub use params::Parameters;
pub use process::{Load, Process};

use crate::error::{ConfigError, ModelError};

/// Initial state used when none is given: `[C, C_P, C_H, P, H] = [1, 0, 0, 1, 1]`.
pub const DEFAULT_INITIAL: [f64; 5] = [1.0, 0.0, 0.0, 1.0, 1.0];

/// A closed system of five ODEs bound to its parameters and initial state.
///
/// Built through [Model::builder]; the parameter set and initial state are
/// validated once and never change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    parameters: Parameters,
    initial: Compartments,
    system: EquationSystem,
}

impl Model {
    /// Returns a new [ModelBuilder].
    ///
    /// # Example
    /// ```no_run
    /// use ecotox::prelude::*;
    ///
    /// # fn main() -> Result<(), ecotox::ConfigError> {
    /// let model = Model::builder()
    ///     .parameters(Parameters { b: 0.2, ..Parameters::default() })
    ///     .initial([1.0, 0.0, 0.0, 1.0, 1.0])
    ///     .build()?;
    /// assert_eq!(model.parameters().b, 0.2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> ModelBuilder {
        ModelBuilder::new()
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn initial(&self) -> &Compartments {
        &self.initial
    }

    pub fn system(&self) -> &EquationSystem {
        &self.system
    }

    /// Used by the solver when it pushes a parameter vector back into the model.
    pub(crate) fn set_parameters(&mut self, parameters: Parameters) {
        self.parameters = parameters;
    }

    /// Right-hand side at state `x`.
    #[inline(always)]
    pub fn derivatives(&self, x: &Compartments) -> Result<Compartments, ModelError> {
        self.system.derivatives(&self.parameters, x)
    }
}

impl Default for Model {
    fn default() -> Self {
        Self {
            parameters: Parameters::default(),
            initial: Compartments::from(DEFAULT_INITIAL),
            system: EquationSystem::standard(),
        }
    }
}

/// Builder for [Model]. Every field is optional and falls back to the
/// documented defaults.
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    parameters: Option<Parameters>,
    values: Option<Vec<f64>>,
    initial: Option<Vec<f64>>,
    system: Option<EquationSystem>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self.values = None;
        self
    }

    /// Parameter values in [Parameters::NAMES] order. Arity is checked in
    /// [ModelBuilder::build].
    pub fn parameter_values(mut self, values: impl Into<Vec<f64>>) -> Self {
        self.values = Some(values.into());
        self.parameters = None;
        self
    }

    /// Initial state in `[C, C_P, C_H, P, H]` order.
    pub fn initial(mut self, initial: impl Into<Vec<f64>>) -> Self {
        self.initial = Some(initial.into());
        self
    }

    pub fn system(mut self, system: EquationSystem) -> Self {
        self.system = Some(system);
        self
    }

    pub fn build(self) -> Result<Model, ConfigError> {
        let parameters = match (self.parameters, self.values) {
            (_, Some(values)) => Parameters::from_slice(&values)?,
            (Some(parameters), None) => parameters,
            (None, None) => Parameters::default(),
        };
        parameters.validate()?;

        let initial = match self.initial {
            Some(values) => Compartments::from_slice(&values).ok_or(ConfigError::Arity {
                expected: Compartment::ALL.len(),
                actual: values.len(),
            })?,
            None => Compartments::from(DEFAULT_INITIAL),
        };
        for (compartment, value) in initial.iter() {
            if !value.is_finite() {
                return Err(ConfigError::InvalidValue {
                    name: compartment.symbol().to_string(),
                    value,
                });
            }
        }

        Ok(Model {
            parameters,
            initial,
            system: self.system.unwrap_or_default(),
        })
    }
}
