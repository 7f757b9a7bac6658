//! Time integration of the model onto a uniform integer grid.
mod closure;
mod trajectory;

pub use trajectory::{Overview, Panel, Series, Trajectory};

use std::cell::Cell;
use std::rc::Rc;

use diffsol::{
    ode_solver::method::OdeSolverMethod, OdeBuilder, OdeSolverProblem, OdeSolverStopReason,
};
use indicatif::ProgressBar;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ModelError, SimulationError};
use crate::model::{Compartment, Model};
use closure::{to_compartments, EcoProblem, Singularity};

type T = f64;
type V = nalgebra::DVector<T>;
type M = nalgebra::DMatrix<T>;

pub const RTOL: f64 = 1e-6;
pub const ATOL: f64 = 1e-8;
/// Default simulation horizon.
pub const T_MAX: f64 = 500.0;

/// Error control of the adaptive solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverSettings {
    pub rtol: f64,
    pub atol: f64,
    /// Initial step size
    pub h0: f64,
    /// Show a progress bar over the output grid
    pub progress: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            rtol: RTOL,
            atol: ATOL,
            h0: 1e-3,
            progress: false,
        }
    }
}

/// Output times `0, 1, …, floor(t_max)`.
pub fn grid(t_max: f64) -> Result<Vec<f64>, ConfigError> {
    if !t_max.is_finite() || t_max < 0.0 {
        return Err(ConfigError::InvalidHorizon(t_max));
    }
    Ok((0..=t_max.floor() as usize).map(|i| i as f64).collect())
}

/// Integrate `model` from `t = 0` to `t_max` with diffsol's adaptive BDF
/// method, recording the state at every integer time.
///
/// The solver is stopped exactly on each grid point, so the returned samples
/// sit on the requested times whatever internal steps were taken. States are
/// not clamped.
///
/// # Errors
/// - [SimulationError::SingularState] when a biomass compartment is zero
///   under an active load ratio, with the time at which it was evaluated.
/// - [SimulationError::NumericalInstability] when the solver cannot meet its
///   tolerances or the state stops being finite, with the last time reached.
pub fn simulate(
    model: &Model,
    t_max: f64,
    settings: &SolverSettings,
) -> Result<Trajectory, SimulationError> {
    let times = grid(t_max)?;
    let nstates = Compartment::ALL.len();
    let mut states = Array2::<f64>::zeros((times.len(), nstates));

    if let Err(ModelError::SingularState { compartment }) = model.derivatives(model.initial()) {
        return Err(SimulationError::SingularState {
            time: 0.0,
            compartment,
        });
    }
    for (compartment, value) in model.initial().iter() {
        states[[0, compartment.index()]] = value;
    }
    if times.len() == 1 {
        return Ok(Trajectory::new(times, states));
    }

    let singularity: Singularity = Rc::new(Cell::new(None));
    let problem = problem(model, settings, &singularity)?;
    let mut solver = problem.bdf::<diffsol::NalgebraLU<f64>>()?;

    let progress = if settings.progress {
        ProgressBar::new(times.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    progress.inc(1);
    let reached = integrate(&mut solver, &singularity, &times, &mut states, &progress)?;
    progress.finish_and_clear();

    tracing::debug!(samples = times.len(), t_max = reached, "Integration finished");
    Ok(Trajectory::new(times, states))
}

fn problem(
    model: &Model,
    settings: &SolverSettings,
    singularity: &Singularity,
) -> Result<OdeSolverProblem<EcoProblem>, SimulationError> {
    let problem = OdeBuilder::<M>::new()
        .atol(vec![settings.atol; Compartment::ALL.len()])
        .rtol(settings.rtol)
        .t0(0.0)
        .h0(settings.h0)
        .p(model.parameters().to_vec())
        .build_from_eqn(EcoProblem::new(model.clone(), singularity.clone()))?;
    Ok(problem)
}

/// Step `solver` through `times[1..]`, filling the matching rows of `states`.
/// Returns the last grid time reached.
fn integrate<'a, S>(
    solver: &mut S,
    singularity: &Singularity,
    times: &[f64],
    states: &mut Array2<f64>,
    progress: &ProgressBar,
) -> Result<f64, SimulationError>
where
    S: OdeSolverMethod<'a, EcoProblem>,
{
    let mut reached = 0.0;
    for (index, &time) in times.iter().enumerate().skip(1) {
        if let Err(err) = solver.set_stop_time(time) {
            return Err(SimulationError::NumericalInstability {
                time: reached,
                reason: err.to_string(),
            });
        }
        loop {
            let step = solver.step();
            if let Some((time, compartment)) = singularity.get() {
                return Err(SimulationError::SingularState { time, compartment });
            }
            match step {
                Ok(OdeSolverStopReason::InternalTimestep) => reached = solver.state().t,
                Ok(OdeSolverStopReason::TstopReached) => break,
                Ok(reason) => {
                    return Err(SimulationError::NumericalInstability {
                        time: reached,
                        reason: format!("Unexpected solver return value: {:?}", reason),
                    })
                }
                Err(err) => {
                    return Err(SimulationError::NumericalInstability {
                        time: reached,
                        reason: err.to_string(),
                    })
                }
            }
        }

        let state = to_compartments(solver.state().y);
        if !state.is_finite() {
            return Err(SimulationError::NumericalInstability {
                time: reached,
                reason: "the state is no longer finite".to_string(),
            });
        }
        for (compartment, value) in state.iter() {
            states[[index, compartment.index()]] = value;
        }
        reached = time;
        progress.inc(1);
    }
    Ok(reached)
}
