//! Boresch restraints: validation, serialization and standard-state corrections.
//!
//! A [`Restraint`] ties three atoms of the single decoupled ligand to three
//! atoms of the receptor through one distance, two angles and three dihedrals.
//! It owns a copy of the system it was validated against, so the atom indices
//! it writes for an MD engine always refer to that snapshot.

pub mod boresch;
pub mod builder;
pub mod config;
pub mod correction;
pub mod error;
pub mod format;

pub use boresch::{
    BoreschAnchor, BoreschAnchors, BoreschEquilibrium, BoreschForceConstants, BoreschGeometry,
    BoreschParameters, BoreschTerm, TermKind,
};
pub use builder::BoreschRestraintBuilder;
pub use config::{AnchorIndices, RestraintFile, RestraintFileError};
pub use error::RestraintError;

use crate::core::models::system::{AtomRef, MolecularSystem};
use crate::core::units::{Dimensions, KCAL_PER_MOL, Quantity};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, instrument};

/// Kinds of restraint the engine knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RestraintType {
    #[default]
    Boresch,
}

impl FromStr for RestraintType {
    type Err = RestraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "boresch" => Ok(RestraintType::Boresch),
            _ => Err(RestraintError::UnsupportedRestraintType(s.to_string())),
        }
    }
}

impl fmt::Display for RestraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestraintType::Boresch => write!(f, "boresch"),
        }
    }
}

/// MD engines a restraint can be written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    Gromacs,
    Somd,
}

impl FromStr for Engine {
    type Err = RestraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gromacs" => Ok(Engine::Gromacs),
            "somd" => Ok(Engine::Somd),
            _ => Err(RestraintError::UnsupportedEngine(s.to_string())),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::Gromacs => write!(f, "gromacs"),
            Engine::Somd => write!(f, "somd"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CorrectionMethod {
    /// Numerical integration of each degree of freedom.
    #[default]
    SemiAnalytical,
    /// Closed-form harmonic approximation.
    Analytical,
}

impl FromStr for CorrectionMethod {
    type Err = RestraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "semi-analytical" | "numerical" => Ok(CorrectionMethod::SemiAnalytical),
            "analytical" => Ok(CorrectionMethod::Analytical),
            _ => Err(RestraintError::UnknownCorrectionMethod(s.to_string())),
        }
    }
}

impl fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrectionMethod::SemiAnalytical => write!(f, "semi-analytical"),
            CorrectionMethod::Analytical => write!(f, "analytical"),
        }
    }
}

/// Checks that `system` has exactly one decoupled molecule holding the ligand
/// anchors and that the receptor anchors exist.
pub(crate) fn check_binding(
    system: &MolecularSystem,
    anchors: &BoreschAnchors,
) -> Result<(), RestraintError> {
    let decoupled = system.decoupled_molecules();
    let ligand = match decoupled.as_slice() {
        [ligand] => ligand.number(),
        _ => return Err(RestraintError::DecoupledMoleculeCount(decoupled.len())),
    };

    for anchor in BoreschAnchor::LIGAND {
        let atom = anchors.get(anchor);
        if atom.molecule != ligand || !system.contains_atom(&atom) {
            return Err(boresch::missing_anchor(anchor));
        }
    }
    for anchor in BoreschAnchor::RECEPTOR {
        if !system.contains_atom(&anchors.get(anchor)) {
            return Err(boresch::missing_anchor(anchor));
        }
    }
    Ok(())
}

fn check_temperature(temperature: &Quantity) -> Result<f64, RestraintError> {
    if !temperature.has_dimensions(Dimensions::TEMPERATURE) {
        return Err(RestraintError::InvalidDimension {
            parameter: "temperature",
            expected: Dimensions::TEMPERATURE,
            found: temperature.dimensions(),
        });
    }
    let kelvin = temperature.si_value();
    if !(kelvin.is_finite() && kelvin > 0.0) {
        return Err(RestraintError::InvalidTemperature {
            reason: format!("{kelvin} K is not a positive absolute temperature"),
        });
    }
    Ok(kelvin)
}

/// A validated restraint bound to a copy of a system.
#[derive(Debug, Clone, PartialEq)]
pub struct Restraint {
    system: MolecularSystem,
    parameters: BoreschParameters,
    temperature: Quantity,
    restraint_type: RestraintType,
}

impl Restraint {
    #[instrument(skip_all, name = "restraint_new")]
    pub fn new(
        system: &MolecularSystem,
        parameters: BoreschParameters,
        temperature: Quantity,
        restraint_type: RestraintType,
    ) -> Result<Self, RestraintError> {
        check_temperature(&temperature)?;
        parameters.validate()?;
        check_binding(system, &parameters.anchors)?;
        info!(
            %restraint_type,
            atoms = system.num_atoms(),
            "Restraint validated."
        );
        Ok(Self {
            system: system.clone(),
            parameters,
            temperature,
            restraint_type,
        })
    }

    /// Rebinds the restraint to another snapshot with the same atom layout,
    /// e.g. a later frame chosen as the reference geometry. Anchors follow
    /// their global atom index, so the frame may come from a separate file
    /// load. On failure the current system is kept.
    pub fn update_system(&mut self, system: &MolecularSystem) -> Result<(), RestraintError> {
        if system.num_atoms() != self.system.num_atoms() {
            return Err(RestraintError::FrameAtomCountMismatch {
                expected: self.system.num_atoms(),
                found: system.num_atoms(),
            });
        }
        let anchors = self.anchors_in(system)?;
        check_binding(system, &anchors)?;
        self.parameters.anchors = anchors;
        self.system = system.clone();
        debug!(atoms = system.num_atoms(), "Restraint rebound to a new system.");
        Ok(())
    }

    fn anchors_in(&self, system: &MolecularSystem) -> Result<BoreschAnchors, RestraintError> {
        let current = &self.parameters.anchors;
        let rebase = |anchor: BoreschAnchor| -> Result<AtomRef, RestraintError> {
            let index = current.index_in(&self.system, anchor)?;
            system
                .atom_ref(index)
                .ok_or_else(|| boresch::missing_anchor(anchor))
        };
        Ok(BoreschAnchors {
            r1: rebase(BoreschAnchor::R1)?,
            r2: rebase(BoreschAnchor::R2)?,
            r3: rebase(BoreschAnchor::R3)?,
            l1: rebase(BoreschAnchor::L1)?,
            l2: rebase(BoreschAnchor::L2)?,
            l3: rebase(BoreschAnchor::L3)?,
        })
    }

    pub fn system(&self) -> &MolecularSystem {
        &self.system
    }

    pub fn parameters(&self) -> &BoreschParameters {
        &self.parameters
    }

    pub fn temperature(&self) -> Quantity {
        self.temperature
    }

    pub fn restraint_type(&self) -> RestraintType {
        self.restraint_type
    }

    /// Renders the restraint for `engine`.
    pub fn to_engine_string(&self, engine: Engine) -> Result<String, RestraintError> {
        match (self.restraint_type, engine) {
            (RestraintType::Boresch, Engine::Gromacs) => {
                format::gromacs(&self.system, &self.parameters)
            }
            (RestraintType::Boresch, Engine::Somd) => format::somd(&self.system, &self.parameters),
        }
    }

    /// Free energy of releasing the restraint to the standard state, in kcal/mol.
    #[instrument(skip_all, name = "restraint_correction", fields(%method))]
    pub fn correction(&self, method: CorrectionMethod) -> Result<Quantity, RestraintError> {
        let temperature = check_temperature(&self.temperature)?;
        let dg = match method {
            CorrectionMethod::SemiAnalytical => {
                correction::semi_analytical(&self.parameters, temperature)?
            }
            CorrectionMethod::Analytical => correction::analytical(&self.parameters, temperature)?,
        };
        info!(dg, "Computed standard-state correction (kcal/mol).");
        Ok(dg * KCAL_PER_MOL)
    }

    /// Current values of the six restrained coordinates.
    pub fn measure(&self) -> Result<BoreschGeometry, RestraintError> {
        BoreschGeometry::measure(&self.system, &self.parameters.anchors)
    }

    /// Harmonic restraint energy of the bound coordinates.
    pub fn energy(&self) -> Result<Quantity, RestraintError> {
        let values = self.measure()?.values();
        let mut energy = 0.0;
        for (term, value) in self.parameters.terms().iter().zip(values) {
            energy += term.energy_at(value)?;
        }
        Ok(energy * KCAL_PER_MOL)
    }
}
