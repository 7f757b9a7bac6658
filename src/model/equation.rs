use std::collections::BTreeSet;
use std::fmt;

use crate::error::ModelError;
use crate::model::{Compartment, Compartments, Load, Parameters, Process};

/// Version tag of [EquationSystem::canonical]. Bump it whenever the
/// serialization format changes, since run identifiers are derived from it.
pub const CANONICAL_VERSION: &str = "ecotox-equations/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    fn symbol(self) -> char {
        match self {
            Sign::Plus => '+',
            Sign::Minus => '-',
        }
    }
}

/// One signed term of a right-hand side: a process, optionally scaled by the
/// contaminant load of the biomass it moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flux {
    pub sign: Sign,
    pub process: Process,
    pub load: Option<Load>,
}

impl Flux {
    pub fn gain(process: Process) -> Self {
        Self {
            sign: Sign::Plus,
            process,
            load: None,
        }
    }

    pub fn loss(process: Process) -> Self {
        Self {
            sign: Sign::Minus,
            process,
            load: None,
        }
    }

    pub fn scaled(mut self, load: Load) -> Self {
        self.load = Some(load);
        self
    }

    /// Inactive processes contribute zero without touching their load ratio.
    #[inline(always)]
    pub fn evaluate(&self, p: &Parameters, x: &Compartments) -> Result<f64, ModelError> {
        if !self.process.is_active(p) {
            return Ok(0.0);
        }
        let mut value = self.process.evaluate(p, x)?;
        if let Some(load) = self.load {
            value *= load.evaluate(x)?;
        }
        Ok(match self.sign {
            Sign::Plus => value,
            Sign::Minus => -value,
        })
    }

    /// The unsigned term, e.g. `predation*(C_P/P)`.
    pub fn term(&self) -> String {
        match self.load {
            Some(load) => format!("{}*({})", self.process.name(), load.symbol()),
            None => self.process.name().to_string(),
        }
    }
}

/// A flux that leaves one compartment and enters another.
///
/// `from == None` marks an external source and `to == None` a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub process: Process,
    pub load: Option<Load>,
    pub from: Option<Compartment>,
    pub to: Option<Compartment>,
}

impl Transfer {
    pub fn is_internal(&self) -> bool {
        self.from.is_some() && self.to.is_some()
    }
}

/// The five right-hand sides, each an ordered list of fluxes.
#[derive(Debug, Clone, PartialEq)]
pub struct EquationSystem {
    rhs: [Vec<Flux>; 5],
}

impl Default for EquationSystem {
    fn default() -> Self {
        Self::standard()
    }
}

impl EquationSystem {
    /// A system with no terms at all.
    pub fn empty() -> Self {
        Self {
            rhs: Default::default(),
        }
    }

    /// The soil-plant-herbivore contamination model.
    pub fn standard() -> Self {
        use Process::*;

        Self::empty()
            // dC/dt
            .with_flux(Compartment::Soil, Flux::gain(Contamination))
            .with_flux(Compartment::Soil, Flux::loss(Absorption))
            .with_flux(Compartment::Soil, Flux::gain(PlantMortality).scaled(Load::Plant))
            .with_flux(
                Compartment::Soil,
                Flux::gain(ContaminantMortality).scaled(Load::Herbivore),
            )
            .with_flux(
                Compartment::Soil,
                Flux::gain(HerbivoreMortality).scaled(Load::Herbivore),
            )
            // dC_P/dt
            .with_flux(Compartment::PlantContaminant, Flux::gain(Absorption))
            .with_flux(
                Compartment::PlantContaminant,
                Flux::loss(PlantMortality).scaled(Load::Plant),
            )
            .with_flux(
                Compartment::PlantContaminant,
                Flux::loss(Predation).scaled(Load::Plant),
            )
            // dC_H/dt
            .with_flux(
                Compartment::HerbivoreContaminant,
                Flux::gain(Predation).scaled(Load::Plant),
            )
            .with_flux(
                Compartment::HerbivoreContaminant,
                Flux::loss(HerbivoreMortality).scaled(Load::Herbivore),
            )
            .with_flux(
                Compartment::HerbivoreContaminant,
                Flux::loss(ContaminantMortality).scaled(Load::Herbivore),
            )
            // dP/dt
            .with_flux(Compartment::Plant, Flux::gain(Growth))
            .with_flux(Compartment::Plant, Flux::loss(Predation))
            .with_flux(Compartment::Plant, Flux::loss(PlantMortality))
            // dH/dt
            .with_flux(Compartment::Herbivore, Flux::gain(Conversion))
            .with_flux(Compartment::Herbivore, Flux::loss(HerbivoreMortality))
            .with_flux(Compartment::Herbivore, Flux::loss(ContaminantMortality))
    }

    /// Append a flux to the right-hand side of `compartment`.
    pub fn with_flux(mut self, compartment: Compartment, flux: Flux) -> Self {
        self.rhs[compartment.index()].push(flux);
        self
    }

    pub fn fluxes(&self, compartment: Compartment) -> &[Flux] {
        &self.rhs[compartment.index()]
    }

    /// Processes referenced anywhere in the system, in declaration order.
    pub fn processes(&self) -> BTreeSet<Process> {
        self.rhs
            .iter()
            .flat_map(|fluxes| fluxes.iter().map(|f| f.process))
            .collect()
    }

    /// Evaluate the five derivatives at state `x`.
    pub fn derivatives(
        &self,
        p: &Parameters,
        x: &Compartments,
    ) -> Result<Compartments, ModelError> {
        let mut dx = Compartments::zeros();
        for compartment in Compartment::ALL {
            let mut rate = 0.0;
            for flux in self.fluxes(compartment) {
                rate += flux.evaluate(p, x)?;
            }
            dx[compartment] = rate;
        }
        Ok(dx)
    }

    /// Pair every outgoing flux with the identical incoming flux of another
    /// compartment. Unpaired gains are external sources, unpaired losses sinks.
    pub fn transfers(&self) -> Vec<Transfer> {
        let mut gains: Vec<(Compartment, Flux, bool)> = Compartment::ALL
            .iter()
            .flat_map(|&c| {
                self.fluxes(c)
                    .iter()
                    .filter(|f| f.sign == Sign::Plus)
                    .map(move |&f| (c, f, false))
            })
            .collect();

        let mut transfers = Vec::new();
        for from in Compartment::ALL {
            for flux in self.fluxes(from).iter().filter(|f| f.sign == Sign::Minus) {
                let matched = gains.iter_mut().find(|(to, gain, used)| {
                    !*used && *to != from && gain.process == flux.process && gain.load == flux.load
                });
                let to = match matched {
                    Some((to, _, used)) => {
                        *used = true;
                        Some(*to)
                    }
                    None => None,
                };
                transfers.push(Transfer {
                    process: flux.process,
                    load: flux.load,
                    from: Some(from),
                    to,
                });
            }
        }
        for (to, flux, _) in gains.into_iter().filter(|(_, _, used)| !used) {
            transfers.push(Transfer {
                process: flux.process,
                load: flux.load,
                from: None,
                to: Some(to),
            });
        }
        transfers
    }

    /// Fixed, versioned text form of the structure. Parameter values never
    /// appear here, so it identifies the model shape only.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        out.push_str(CANONICAL_VERSION);
        out.push('\n');
        for process in self.processes() {
            out.push_str(&format!("process {} = {}\n", process.name(), process.formula()));
        }
        for compartment in Compartment::ALL {
            out.push_str(&format!("d{}/dt =", compartment.symbol()));
            for flux in self.fluxes(compartment) {
                out.push_str(&format!(" {}{}", flux.sign.symbol(), flux.term()));
            }
            out.push('\n');
        }
        out
    }

    /// Equations followed by the process definitions, as printed by `Display`.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// One human-readable line per compartment.
    pub fn lines(&self) -> Vec<String> {
        Compartment::ALL
            .iter()
            .map(|&c| {
                let mut line = format!("d{}/dt = ", c.symbol());
                let fluxes = self.fluxes(c);
                if fluxes.is_empty() {
                    line.push('0');
                }
                for (i, flux) in fluxes.iter().enumerate() {
                    match (i, flux.sign) {
                        (0, Sign::Plus) => {}
                        (0, Sign::Minus) => line.push('-'),
                        (_, sign) => line.push_str(&format!(" {} ", sign.symbol())),
                    }
                    line.push_str(&flux.term());
                }
                line
            })
            .collect()
    }
}

impl fmt::Display for EquationSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        writeln!(f)?;
        for process in self.processes() {
            writeln!(f, "{} = {}", process.name(), process.formula())?;
        }
        Ok(())
    }
}
