use super::boresch::{BoreschAnchors, BoreschEquilibrium, BoreschForceConstants};
use super::builder::BoreschRestraintBuilder;
use super::error::RestraintError;
use super::{Restraint, RestraintType};
use crate::core::models::system::{AtomRef, MolecularSystem};
use crate::core::units::Quantity;
use crate::engine::config::ConfigError;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RestraintFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid restraint file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Anchor atoms as 0-based global atom indices.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AnchorIndices {
    pub r1: usize,
    pub r2: usize,
    pub r3: usize,
    pub l1: usize,
    pub l2: usize,
    pub l3: usize,
}

impl AnchorIndices {
    pub fn resolve(&self, system: &MolecularSystem) -> Result<BoreschAnchors, ConfigError> {
        let atom = |index: usize| -> Result<AtomRef, ConfigError> {
            system
                .atom_ref(index)
                .ok_or_else(|| ConfigError::InvalidValue {
                    parameter: "anchors",
                    reason: format!(
                        "atom index {} is out of range for a system of {} atoms",
                        index,
                        system.num_atoms()
                    ),
                })
        };
        Ok(BoreschAnchors {
            r1: atom(self.r1)?,
            r2: atom(self.r2)?,
            r3: atom(self.r3)?,
            l1: atom(self.l1)?,
            l2: atom(self.l2)?,
            l3: atom(self.l3)?,
        })
    }
}

fn default_restraint_type() -> String {
    "boresch".to_string()
}

/// A restraint described in TOML.
///
/// ```toml
/// type = "boresch"
/// temperature = "300 K"
///
/// [anchors]
/// r1 = 0
/// r2 = 1
/// r3 = 2
/// l1 = 1495
/// l2 = 1496
/// l3 = 1497
///
/// [equilibrium]
/// r0 = "5.08 angstrom"
/// theta-a0 = "64.051 degree"
/// theta-b0 = "39.618 degree"
/// phi-a0 = "2.59 rad"
/// phi-b0 = "-1.20 rad"
/// phi-c0 = "2.63 rad"
///
/// [force-constants]
/// kr = "10 kcal/mol/angstrom^2"
/// k-theta-a = "10 kcal/mol/rad^2"
/// k-theta-b = "10 kcal/mol/rad^2"
/// k-phi-a = "10 kcal/mol/rad^2"
/// k-phi-b = "10 kcal/mol/rad^2"
/// k-phi-c = "10 kcal/mol/rad^2"
/// ```
///
/// Without an `[equilibrium]` table the equilibrium values are measured from
/// the system the restraint is bound to.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RestraintFile {
    #[serde(rename = "type", default = "default_restraint_type")]
    pub restraint_type: String,
    pub temperature: Quantity,
    pub anchors: AnchorIndices,
    #[serde(default)]
    pub equilibrium: Option<BoreschEquilibrium>,
    #[serde(rename = "force-constants")]
    pub force_constants: BoreschForceConstants,
}

impl RestraintFile {
    pub fn from_toml(content: &str) -> Result<Self, RestraintFileError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RestraintFileError> {
        let path = path.as_ref();
        debug!("Loading restraint from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Resolves the file against `system` into a builder ready to build.
    pub fn to_builder(
        &self,
        system: &MolecularSystem,
    ) -> Result<BoreschRestraintBuilder, RestraintError> {
        let restraint_type: RestraintType = self.restraint_type.parse()?;
        let builder = BoreschRestraintBuilder::new()
            .restraint_type(restraint_type)
            .anchors(self.anchors.resolve(system)?)
            .force_constants(self.force_constants)
            .temperature(self.temperature);
        Ok(match self.equilibrium {
            Some(equilibrium) => builder.equilibrium(equilibrium),
            None => builder.equilibrium_from_system(),
        })
    }

    pub fn build(&self, system: &MolecularSystem) -> Result<Restraint, RestraintError> {
        self.to_builder(system)?.build(system)
    }
}
