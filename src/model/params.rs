use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The ten rate constants of the model.
///
/// Field order is the flat order used by [Parameters::from_slice],
/// [Parameters::to_vec] and the `parameters.csv` artifact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    /// Contaminant input rate into the soil, `θ`
    pub theta: f64,
    /// Contaminant leaching rate, `μ`
    pub mu: f64,
    /// Attack rate of herbivores on plants, `a`
    pub a: f64,
    /// Conversion efficiency of consumed plant biomass, `ϵ`
    pub epsilon: f64,
    /// Plant contaminant-absorption rate, `b`
    pub b: f64,
    /// Contaminant-induced herbivore mortality rate, `γ_H`
    #[serde(rename = "gamma_H")]
    pub gamma_h: f64,
    /// Natural plant mortality, `m_P`
    #[serde(rename = "m_P")]
    pub m_p: f64,
    /// Natural herbivore mortality, `m_H`
    #[serde(rename = "m_H")]
    pub m_h: f64,
    /// Plant growth rate, `r`
    pub r: f64,
    /// Plant carrying capacity, `K`
    #[serde(rename = "K")]
    pub k: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            theta: 0.0,
            mu: 0.0,
            a: 0.2,
            epsilon: 0.6,
            b: 0.1,
            gamma_h: 0.05,
            m_p: 0.08,
            m_h: 0.08,
            r: 0.2,
            k: 10.0,
        }
    }
}

impl Parameters {
    pub const NAMES: [&'static str; 10] = [
        "theta", "mu", "a", "epsilon", "b", "gamma_H", "m_P", "m_H", "r", "K",
    ];

    /// Every rate set to zero. The carrying capacity is kept at one so the
    /// logistic term stays defined.
    pub fn zero() -> Self {
        Self {
            theta: 0.0,
            mu: 0.0,
            a: 0.0,
            epsilon: 0.0,
            b: 0.0,
            gamma_h: 0.0,
            m_p: 0.0,
            m_h: 0.0,
            r: 0.0,
            k: 1.0,
        }
    }

    pub fn from_slice(values: &[f64]) -> Result<Self, ConfigError> {
        if values.len() != Self::NAMES.len() {
            return Err(ConfigError::Arity {
                expected: Self::NAMES.len(),
                actual: values.len(),
            });
        }
        Ok(Self {
            theta: values[0],
            mu: values[1],
            a: values[2],
            epsilon: values[3],
            b: values[4],
            gamma_h: values[5],
            m_p: values[6],
            m_h: values[7],
            r: values[8],
            k: values[9],
        })
    }

    /// Build a parameter set from `(name, value)` pairs. Every name in
    /// [Parameters::NAMES] must be present; a repeated name keeps its last value.
    pub fn from_named<'a, I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut values: HashMap<&str, f64> = HashMap::new();
        for (name, value) in pairs {
            let known = Self::NAMES
                .iter()
                .find(|&&n| n == name)
                .ok_or_else(|| ConfigError::UnknownParameter(name.to_string()))?;
            values.insert(*known, value);
        }
        let ordered = Self::NAMES
            .iter()
            .map(|name| {
                values
                    .get(name)
                    .copied()
                    .ok_or_else(|| ConfigError::MissingParameter(name.to_string()))
            })
            .collect::<Result<Vec<f64>, ConfigError>>()?;
        Self::from_slice(&ordered)
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.theta,
            self.mu,
            self.a,
            self.epsilon,
            self.b,
            self.gamma_h,
            self.m_p,
            self.m_h,
            self.r,
            self.k,
        ]
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        let index = Self::NAMES.iter().position(|&n| n == name)?;
        Some(self.to_vec()[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        Self::NAMES.into_iter().zip(self.to_vec())
    }

    /// Reject non-finite or negative values. The conversion efficiency is
    /// expected to lie in `[0, 1]` but that is a modelling convention and is
    /// not checked. The carrying capacity must be strictly positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.iter() {
            if !value.is_finite() || value < 0.0 || (name == "K" && value == 0.0) {
                return Err(ConfigError::InvalidValue {
                    name: name.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let p = Parameters::default();
        assert_eq!(
            p.to_vec(),
            vec![0.0, 0.0, 0.2, 0.6, 0.1, 0.05, 0.08, 0.08, 0.2, 10.0]
        );
    }

    #[test]
    fn test_from_slice_round_trips_field_order() {
        let values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let p = Parameters::from_slice(&values).unwrap();
        assert_eq!(p.to_vec(), values);
        assert_eq!(p.get("gamma_H"), Some(6.0));
        assert_eq!(p.get("K"), Some(10.0));
        assert_eq!(p.get("nope"), None);
    }

    #[test]
    fn test_wrong_arity_is_a_config_error() {
        let err = Parameters::from_slice(&[0.1, 0.2]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Arity {
                expected: 10,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_from_named_requires_every_parameter() {
        let mut pairs: Vec<(&str, f64)> = Parameters::default().iter().collect();
        assert_eq!(
            Parameters::from_named(pairs.clone()).unwrap(),
            Parameters::default()
        );

        pairs.pop();
        let err = Parameters::from_named(pairs.clone()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameter(name) if name == "K"));

        pairs.push(("kappa", 1.0));
        let err = Parameters::from_named(pairs).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownParameter(name) if name == "kappa"));
    }

    #[test]
    fn test_validate_rejects_negative_and_non_finite() {
        let mut p = Parameters::default();
        p.mu = -0.1;
        assert!(matches!(
            p.validate(),
            Err(ConfigError::InvalidValue { ref name, .. }) if name == "mu"
        ));

        let mut p = Parameters::default();
        p.r = f64::NAN;
        assert!(p.validate().is_err());

        let mut p = Parameters::default();
        p.k = 0.0;
        assert!(p.validate().is_err());

        assert!(Parameters::zero().validate().is_ok());
    }

    #[test]
    fn test_deserialize_uses_flat_names() {
        let p: Parameters = serde_json::from_str(r#"{"gamma_H": 0.5, "K": 4.0}"#).unwrap();
        assert_eq!(p.gamma_h, 0.5);
        assert_eq!(p.k, 4.0);
        assert_eq!(p.a, 0.2);
        assert!(serde_json::from_str::<Parameters>(r#"{"gamma": 0.5}"#).is_err());
    }
}
