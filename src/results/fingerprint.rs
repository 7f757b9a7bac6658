use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::{EquationSystem, Model};

/// Number of hex characters kept from the digest.
const ID_LEN: usize = 16;

/// What a [RunId] is derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierScope {
    /// Equation structure only. Runs that differ in parameters or initial
    /// state share an output directory.
    #[default]
    Structure,
    /// Structure plus the bound parameter values and initial state.
    StructureAndInputs,
}

/// Deterministic name of a run's output directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(String);

impl RunId {
    /// SHA-256 of [EquationSystem::canonical], truncated.
    pub fn structural(system: &EquationSystem) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(system.canonical().as_bytes());
        Self::from_digest(hasher)
    }

    /// Like [RunId::structural] but also hashes the parameter values and the
    /// initial state, bit for bit.
    pub fn with_inputs(model: &Model) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(model.system().canonical().as_bytes());
        hasher.update(b"parameters\n");
        for value in model.parameters().to_vec() {
            hasher.update(value.to_le_bytes());
        }
        hasher.update(b"initial\n");
        for value in model.initial().as_array() {
            hasher.update(value.to_le_bytes());
        }
        Self::from_digest(hasher)
    }

    pub fn for_scope(model: &Model, scope: IdentifierScope) -> Self {
        match scope {
            IdentifierScope::Structure => Self::structural(model.system()),
            IdentifierScope::StructureAndInputs => Self::with_inputs(model),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_digest(hasher: Sha256) -> Self {
        let mut hex = format!("{:x}", hasher.finalize());
        hex.truncate(ID_LEN);
        RunId(hex)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Compartment, Flux, Parameters, Process};

    #[test]
    fn test_structural_id_is_short_hex() {
        let id = RunId::structural(&EquationSystem::standard());
        assert_eq!(id.as_str().len(), 16);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, RunId::structural(&EquationSystem::standard()));
    }

    #[test]
    fn test_structural_id_ignores_inputs() {
        let a = Model::default();
        let b = Model::builder()
            .parameters(Parameters {
                r: 0.5,
                ..Parameters::default()
            })
            .initial(vec![2.0, 0.0, 0.0, 3.0, 1.0])
            .build()
            .unwrap();
        assert_eq!(
            RunId::for_scope(&a, IdentifierScope::Structure),
            RunId::for_scope(&b, IdentifierScope::Structure)
        );
        assert_ne!(
            RunId::for_scope(&a, IdentifierScope::StructureAndInputs),
            RunId::for_scope(&b, IdentifierScope::StructureAndInputs)
        );
    }

    #[test]
    fn test_added_term_changes_id() {
        let extended = EquationSystem::standard()
            .with_flux(Compartment::Herbivore, Flux::loss(Process::PlantMortality));
        assert_ne!(
            RunId::structural(&extended),
            RunId::structural(&EquationSystem::standard())
        );
    }

    #[test]
    fn test_scope_deserializes_from_snake_case() {
        let scope: IdentifierScope = serde_json::from_str("\"structure_and_inputs\"").unwrap();
        assert_eq!(scope, IdentifierScope::StructureAndInputs);
        assert_eq!(IdentifierScope::default(), IdentifierScope::Structure);
    }
}
