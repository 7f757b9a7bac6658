use std::cell::Cell;
use std::rc::Rc;

use diffsol::{
    ConstantOp, LinearOp, NonLinearOp, NonLinearOpJacobian, OdeEquations, OdeEquationsRef, Op,
};
use nalgebra::DVector;

use crate::error::ModelError;
use crate::model::{Compartment, Compartments, Model, Parameters};
use crate::simulator::{M, T, V};

/// First singular right-hand-side evaluation seen by the solver.
pub(crate) type Singularity = Rc<Cell<Option<(T, Compartment)>>>;

#[inline(always)]
pub(crate) fn to_compartments(x: &V) -> Compartments {
    Compartments::new(x[0], x[1], x[2], x[3], x[4])
}

pub struct EcoRhs<'a> {
    nstates: usize,
    nparams: usize,
    model: &'a Model,
    singularity: &'a Cell<Option<(T, Compartment)>>,
}

impl Op for EcoRhs<'_> {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nstates
    }
    fn nparams(&self) -> usize {
        self.nparams
    }
}

pub struct EcoMass {
    nstates: usize,
    nout: usize,
    nparams: usize,
}

impl Op for EcoMass {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nout
    }
    fn nparams(&self) -> usize {
        self.nparams
    }
}

pub struct EcoInit {
    nstates: usize,
    nout: usize,
    nparams: usize,
    init: V,
}

impl Op for EcoInit {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nout
    }
    fn nparams(&self) -> usize {
        self.nparams
    }
}

pub struct EcoRoot {
    nstates: usize,
    nout: usize,
    nparams: usize,
}

impl Op for EcoRoot {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nout
    }
    fn nparams(&self) -> usize {
        self.nparams
    }
}

pub struct EcoOut {
    nstates: usize,
    nout: usize,
    nparams: usize,
}

impl Op for EcoOut {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nout
    }
    fn nparams(&self) -> usize {
        self.nparams
    }
}

impl NonLinearOp for EcoRhs<'_> {
    /// A singular state poisons the derivative with NaN and records where it
    /// happened; the integrator turns the record into an error.
    fn call_inplace(&self, x: &Self::V, t: Self::T, y: &mut Self::V) {
        match self.model.derivatives(&to_compartments(x)) {
            Ok(dx) => {
                for compartment in Compartment::ALL {
                    y[compartment.index()] = dx[compartment];
                }
            }
            Err(ModelError::SingularState { compartment }) => {
                if self.singularity.get().is_none() {
                    self.singularity.set(Some((t, compartment)));
                }
                y.fill(f64::NAN);
            }
        }
    }
}

impl NonLinearOpJacobian for EcoRhs<'_> {
    /// Forward-difference directional derivative `J(x)·v`.
    fn jac_mul_inplace(&self, x: &Self::V, t: Self::T, v: &Self::V, y: &mut Self::V) {
        let norm = v.norm();
        if norm == 0.0 {
            y.fill(0.0);
            return;
        }
        let h = f64::EPSILON.sqrt() * (1.0 + x.norm()) / norm;
        let shifted = x + v * h;
        let mut base = DVector::zeros(self.nstates);
        self.call_inplace(x, t, &mut base);
        self.call_inplace(&shifted, t, y);
        *y -= &base;
        *y /= h;
    }
}

impl LinearOp for EcoMass {
    fn gemv_inplace(&self, _x: &Self::V, _t: Self::T, _beta: Self::T, _y: &mut Self::V) {}
}

impl ConstantOp for EcoInit {
    fn call_inplace(&self, _t: Self::T, y: &mut Self::V) {
        y.copy_from(&self.init);
    }
}

impl NonLinearOp for EcoRoot {
    fn call_inplace(&self, _x: &Self::V, _t: Self::T, _y: &mut Self::V) {}
}

impl NonLinearOp for EcoOut {
    fn call_inplace(&self, _x: &Self::V, _t: Self::T, _y: &mut Self::V) {}
}

/// The model in the shape diffsol integrates: an explicit right-hand side, an
/// identity mass matrix, no roots and no extra outputs.
#[derive(Clone)]
pub struct EcoProblem {
    model: Model,
    nstates: usize,
    nparams: usize,
    init: V,
    singularity: Singularity,
}

impl EcoProblem {
    pub(crate) fn new(model: Model, singularity: Singularity) -> Self {
        let init = DVector::from_row_slice(model.initial().as_array());
        Self {
            nstates: Compartment::ALL.len(),
            nparams: Parameters::NAMES.len(),
            model,
            init,
            singularity,
        }
    }
}

impl Op for EcoProblem {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nstates
    }
    fn nparams(&self) -> usize {
        self.nparams
    }
}

impl<'b> OdeEquationsRef<'b> for EcoProblem {
    type Rhs = EcoRhs<'b>;
    type Mass = EcoMass;
    type Init = EcoInit;
    type Root = EcoRoot;
    type Out = EcoOut;
}

impl OdeEquations for EcoProblem {
    fn rhs(&self) -> EcoRhs<'_> {
        EcoRhs {
            nstates: self.nstates,
            nparams: self.nparams,
            model: &self.model,
            singularity: &self.singularity,
        }
    }

    fn mass(&self) -> Option<EcoMass> {
        None
    }

    fn init(&self) -> EcoInit {
        EcoInit {
            nstates: self.nstates(),
            nout: self.nout(),
            nparams: self.nparams(),
            init: self.init.clone(),
        }
    }

    fn get_params(&self, p: &mut V) {
        p.copy_from(&DVector::from_vec(self.model.parameters().to_vec()));
    }

    fn root(&self) -> Option<EcoRoot> {
        None
    }

    fn out(&self) -> Option<EcoOut> {
        None
    }

    fn set_params(&mut self, p: &V) {
        match Parameters::from_slice(p.as_slice()) {
            Ok(parameters) => self.model.set_parameters(parameters),
            Err(err) => {
                debug_assert!(false, "rejected parameter vector: {err}");
                tracing::error!("Keeping previous parameters: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn problem(model: Model) -> (EcoProblem, Singularity) {
        let singularity: Singularity = Rc::new(Cell::new(None));
        (EcoProblem::new(model, singularity.clone()), singularity)
    }

    #[test]
    fn test_rhs_matches_model_derivatives() {
        let model = Model::default();
        let (problem, singularity) = problem(model.clone());
        let x = DVector::from_vec(vec![0.9, 0.05, 0.02, 1.2, 0.8]);
        let mut y = DVector::zeros(5);
        problem.rhs().call_inplace(&x, 0.0, &mut y);

        let expected = model.derivatives(&to_compartments(&x)).unwrap();
        for c in Compartment::ALL {
            assert_eq!(y[c.index()], expected[c]);
        }
        assert!(singularity.get().is_none());
    }

    #[test]
    fn test_rhs_records_singularity() {
        let (problem, singularity) = problem(Model::default());
        let x = DVector::from_vec(vec![1.0, 0.0, 0.0, 0.0, 1.0]);
        let mut y = DVector::zeros(5);
        problem.rhs().call_inplace(&x, 2.5, &mut y);

        assert!(y.iter().all(|v| v.is_nan()));
        assert_eq!(singularity.get(), Some((2.5, Compartment::Plant)));
    }

    #[test]
    fn test_jacobian_product_matches_difference_quotient() {
        let (problem, _) = problem(Model::default());
        let rhs = problem.rhs();
        let x = DVector::from_vec(vec![0.9, 0.05, 0.02, 1.2, 0.8]);
        // Unit vector along P: the logistic, predation and mortality terms.
        let v = DVector::from_vec(vec![0.0, 0.0, 0.0, 1.0, 0.0]);
        let mut jv = DVector::zeros(5);
        rhs.jac_mul_inplace(&x, 0.0, &v, &mut jv);

        let p = Parameters::default();
        let (pl, h) = (1.2, 0.8);
        let dp_dp = p.r * (1.0 - 2.0 * pl / p.k) - p.a * h - p.m_p;
        let dh_dp = p.epsilon * p.a * h;
        assert_relative_eq!(jv[3], dp_dp, epsilon = 1e-6);
        assert_relative_eq!(jv[4], dh_dp, epsilon = 1e-6);
    }

    #[test]
    fn test_params_round_trip_through_solver_vector() {
        let (mut problem, _) = problem(Model::default());
        let mut values = Parameters::default().to_vec();
        values[4] = 0.5;
        problem.set_params(&DVector::from_vec(values.clone()));

        let mut p = DVector::zeros(10);
        problem.get_params(&mut p);
        assert_eq!(p.as_slice(), values.as_slice());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "rejected parameter vector")]
    fn test_wrong_length_parameter_vector_is_rejected() {
        let (mut problem, _) = problem(Model::default());
        problem.set_params(&DVector::from_vec(vec![0.1; 3]));
    }
}
