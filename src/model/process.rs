use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::model::{Compartment, Compartments, Parameters};

/// The eight biological and chemical processes that couple the compartments.
///
/// Each process is a pure scalar function of the parameters and the current
/// state. They are recomputed at every right-hand-side evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Process {
    /// Net soil input minus leaching, `θ − μ·C`
    Contamination,
    /// Plant uptake of soil contaminant, `b·P·C`
    Absorption,
    /// Logistic plant growth, `r·P·(1 − P/K)`
    Growth,
    /// Mass-action consumption of plants, `a·P·H`
    Predation,
    /// Share of consumed biomass turned into herbivores, `ϵ·a·P·H`
    Conversion,
    /// Natural plant death, `m_P·P`
    PlantMortality,
    /// Natural herbivore death, `m_H·H`
    HerbivoreMortality,
    /// Herbivore death driven by the tissue concentration, `γ_H·(C_H/H)·H`
    ContaminantMortality,
}

impl Process {
    pub const ALL: [Process; 8] = [
        Process::Contamination,
        Process::Absorption,
        Process::Growth,
        Process::Predation,
        Process::Conversion,
        Process::PlantMortality,
        Process::HerbivoreMortality,
        Process::ContaminantMortality,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Process::Contamination => "contamination",
            Process::Absorption => "absorption",
            Process::Growth => "growth",
            Process::Predation => "predation",
            Process::Conversion => "conversion",
            Process::PlantMortality => "plant_mortality",
            Process::HerbivoreMortality => "herbivore_mortality",
            Process::ContaminantMortality => "contaminant_mortality",
        }
    }

    /// Formula in terms of the flat parameter names and compartment symbols.
    pub fn formula(self) -> &'static str {
        match self {
            Process::Contamination => "theta - mu*C",
            Process::Absorption => "b*P*C",
            Process::Growth => "r*P*(1 - P/K)",
            Process::Predation => "a*P*H",
            Process::Conversion => "epsilon*a*P*H",
            Process::PlantMortality => "m_P*P",
            Process::HerbivoreMortality => "m_H*H",
            Process::ContaminantMortality => "gamma_H*(C_H/H)*H",
        }
    }

    /// Names of the rate constants scaling the process, see [Parameters::NAMES].
    pub fn rate_parameters(self) -> &'static [&'static str] {
        match self {
            Process::Contamination => &["theta", "mu"],
            Process::Absorption => &["b"],
            Process::Growth => &["r"],
            Process::Predation => &["a"],
            Process::Conversion => &["epsilon", "a"],
            Process::PlantMortality => &["m_P"],
            Process::HerbivoreMortality => &["m_H"],
            Process::ContaminantMortality => &["gamma_H"],
        }
    }

    /// Whether the process takes part in the equations for this parameter set.
    ///
    /// A process whose rate constants are all exactly zero vanishes from the
    /// assembled equations, together with any load ratio scaling it.
    pub fn is_active(self, p: &Parameters) -> bool {
        match self {
            Process::Contamination => p.theta != 0.0 || p.mu != 0.0,
            Process::Absorption => p.b != 0.0,
            Process::Growth => p.r != 0.0,
            Process::Predation => p.a != 0.0,
            Process::Conversion => p.epsilon != 0.0 && p.a != 0.0,
            Process::PlantMortality => p.m_p != 0.0,
            Process::HerbivoreMortality => p.m_h != 0.0,
            Process::ContaminantMortality => p.gamma_h != 0.0,
        }
    }

    pub fn evaluate(self, p: &Parameters, x: &Compartments) -> Result<f64, ModelError> {
        let c = x[Compartment::Soil];
        let plant = x[Compartment::Plant];
        let herbivore = x[Compartment::Herbivore];
        let value = match self {
            Process::Contamination => p.theta - p.mu * c,
            Process::Absorption => p.b * plant * c,
            Process::Growth => p.r * plant * (1.0 - plant / p.k),
            Process::Predation => p.a * plant * herbivore,
            Process::Conversion => p.epsilon * Process::Predation.evaluate(p, x)?,
            Process::PlantMortality => p.m_p * plant,
            Process::HerbivoreMortality => p.m_h * herbivore,
            Process::ContaminantMortality => {
                if !self.is_active(p) {
                    return Ok(0.0);
                }
                p.gamma_h * Load::Herbivore.evaluate(x)? * herbivore
            }
        };
        Ok(value)
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Contaminant concentration per unit biomass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Load {
    /// `C_P / P`
    Plant,
    /// `C_H / H`
    Herbivore,
}

impl Load {
    pub fn symbol(self) -> &'static str {
        match self {
            Load::Plant => "C_P/P",
            Load::Herbivore => "C_H/H",
        }
    }

    /// The contaminant pool in the numerator.
    pub fn contaminant(self) -> Compartment {
        match self {
            Load::Plant => Compartment::PlantContaminant,
            Load::Herbivore => Compartment::HerbivoreContaminant,
        }
    }

    /// The biomass pool in the denominator.
    pub fn biomass(self) -> Compartment {
        match self {
            Load::Plant => Compartment::Plant,
            Load::Herbivore => Compartment::Herbivore,
        }
    }

    /// Undefined when the biomass is exactly zero; no floor is applied.
    #[inline(always)]
    pub fn evaluate(self, x: &Compartments) -> Result<f64, ModelError> {
        let biomass = x[self.biomass()];
        if biomass == 0.0 {
            return Err(ModelError::SingularState {
                compartment: self.biomass(),
            });
        }
        Ok(x[self.contaminant()] / biomass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn state() -> Compartments {
        Compartments::new(2.0, 0.5, 0.3, 4.0, 1.5)
    }

    #[test]
    fn test_process_values() {
        let p = Parameters {
            theta: 0.3,
            mu: 0.1,
            ..Parameters::default()
        };
        let x = state();
        let eval = |process: Process| process.evaluate(&p, &x).unwrap();

        assert_relative_eq!(eval(Process::Contamination), 0.3 - 0.1 * 2.0, epsilon = 1e-12);
        assert_relative_eq!(eval(Process::Absorption), 0.1 * 4.0 * 2.0, epsilon = 1e-12);
        assert_relative_eq!(eval(Process::Growth), 0.2 * 4.0 * (1.0 - 4.0 / 10.0), epsilon = 1e-12);
        assert_relative_eq!(eval(Process::Predation), 0.2 * 4.0 * 1.5, epsilon = 1e-12);
        assert_relative_eq!(eval(Process::Conversion), 0.6 * 0.2 * 4.0 * 1.5, epsilon = 1e-12);
        assert_relative_eq!(eval(Process::PlantMortality), 0.08 * 4.0, epsilon = 1e-12);
        assert_relative_eq!(eval(Process::HerbivoreMortality), 0.08 * 1.5, epsilon = 1e-12);
        assert_relative_eq!(eval(Process::ContaminantMortality), 0.05 * 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_load_is_singular_at_zero_biomass() {
        let x = Compartments::new(1.0, 0.0, 0.0, 0.0, 1.0);
        assert_eq!(
            Load::Plant.evaluate(&x),
            Err(ModelError::SingularState {
                compartment: Compartment::Plant
            })
        );
        assert_eq!(Load::Herbivore.evaluate(&x), Ok(0.0));
    }

    #[test]
    fn test_inactive_contaminant_mortality_skips_the_ratio() {
        let x = Compartments::new(1.0, 0.0, 0.0, 1.0, 0.0);
        let mut p = Parameters::default();
        assert!(Process::ContaminantMortality.evaluate(&p, &x).is_err());

        p.gamma_h = 0.0;
        assert_eq!(Process::ContaminantMortality.evaluate(&p, &x), Ok(0.0));
    }

    #[test]
    fn test_rate_parameters_decide_activity() {
        let zero = Parameters::zero();
        for process in Process::ALL {
            assert!(!process.is_active(&zero), "{process} active with zero rates");
            for name in process.rate_parameters() {
                assert!(Parameters::NAMES.contains(name));
            }
        }
        let mut p = Parameters::zero();
        p.theta = 1.0;
        assert!(Process::Contamination.is_active(&p));
        p.epsilon = 0.6;
        assert!(!Process::Conversion.is_active(&p));
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<&str> = Process::ALL.iter().map(|p| p.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Process::ALL.len());
    }
}
