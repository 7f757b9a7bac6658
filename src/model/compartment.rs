use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// The five pools of the model, in state-vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Compartment {
    /// Contaminant in the soil, `C`
    Soil,
    /// Contaminant stored in plant biomass, `C_P`
    PlantContaminant,
    /// Contaminant stored in herbivore biomass, `C_H`
    HerbivoreContaminant,
    /// Plant biomass, `P`
    Plant,
    /// Herbivore biomass, `H`
    Herbivore,
}

impl Compartment {
    pub const ALL: [Compartment; 5] = [
        Compartment::Soil,
        Compartment::PlantContaminant,
        Compartment::HerbivoreContaminant,
        Compartment::Plant,
        Compartment::Herbivore,
    ];

    pub const CONTAMINANT: [Compartment; 3] = [
        Compartment::Soil,
        Compartment::PlantContaminant,
        Compartment::HerbivoreContaminant,
    ];

    pub const BIOMASS: [Compartment; 2] = [Compartment::Plant, Compartment::Herbivore];

    #[inline(always)]
    pub fn index(self) -> usize {
        match self {
            Compartment::Soil => 0,
            Compartment::PlantContaminant => 1,
            Compartment::HerbivoreContaminant => 2,
            Compartment::Plant => 3,
            Compartment::Herbivore => 4,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Compartment::Soil => "C",
            Compartment::PlantContaminant => "C_P",
            Compartment::HerbivoreContaminant => "C_H",
            Compartment::Plant => "P",
            Compartment::Herbivore => "H",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Compartment::Soil => "soil contaminant",
            Compartment::PlantContaminant => "plant contaminant",
            Compartment::HerbivoreContaminant => "herbivore contaminant",
            Compartment::Plant => "plant",
            Compartment::Herbivore => "herbivore",
        }
    }

    pub fn is_contaminant(self) -> bool {
        Self::CONTAMINANT.contains(&self)
    }
}

impl fmt::Display for Compartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Complete state of the system at one point in time: `[C, C_P, C_H, P, H]`.
///
/// Values are conceptually non-negative but are never clamped, so small
/// negative excursions produced by the integrator are kept as-is.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 5]", into = "[f64; 5]")]
pub struct Compartments([f64; 5]);

impl Compartments {
    pub fn new(
        soil: f64,
        plant_contaminant: f64,
        herbivore_contaminant: f64,
        plant: f64,
        herbivore: f64,
    ) -> Self {
        Self([
            soil,
            plant_contaminant,
            herbivore_contaminant,
            plant,
            herbivore,
        ])
    }

    pub fn zeros() -> Self {
        Self([0.0; 5])
    }

    /// Build a state from a slice in compartment order, `None` on wrong length.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        let values: [f64; 5] = values.try_into().ok()?;
        Some(Self(values))
    }

    pub fn as_array(&self) -> &[f64; 5] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Compartment, f64)> + '_ {
        Compartment::ALL.iter().map(move |&c| (c, self[c]))
    }

    /// Total contaminant mass, `C + C_P + C_H`.
    pub fn total_contaminant(&self) -> f64 {
        Compartment::CONTAMINANT.iter().map(|&c| self[c]).sum()
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl From<[f64; 5]> for Compartments {
    fn from(values: [f64; 5]) -> Self {
        Self(values)
    }
}

impl From<Compartments> for [f64; 5] {
    fn from(state: Compartments) -> Self {
        state.0
    }
}

impl Index<Compartment> for Compartments {
    type Output = f64;

    #[inline(always)]
    fn index(&self, compartment: Compartment) -> &f64 {
        &self.0[compartment.index()]
    }
}

impl IndexMut<Compartment> for Compartments {
    #[inline(always)]
    fn index_mut(&mut self, compartment: Compartment) -> &mut f64 {
        &mut self.0[compartment.index()]
    }
}

impl fmt::Display for Compartments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(c, v)| format!("{}={:.6}", c.symbol(), v))
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}
