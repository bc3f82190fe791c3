use crate::core::units::Dimensions;
use crate::engine::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RestraintError {
    #[error("Parameter '{parameter}' has dimensions {found}, expected {expected}")]
    InvalidDimension {
        parameter: &'static str,
        expected: Dimensions,
        found: Dimensions,
    },

    #[error("Force constant '{parameter}' must not be negative")]
    NegativeForceConstant { parameter: &'static str },

    #[error("Expected exactly one decoupled molecule in the system, found {0}")]
    DecoupledMoleculeCount(usize),

    #[error("Ligand anchor '{anchor}' is not an atom of the decoupled molecule")]
    LigandAtomNotDecoupled { anchor: &'static str },

    #[error("Receptor anchor '{anchor}' is not an atom of the system")]
    ReceptorAtomMissing { anchor: &'static str },

    #[error("Frame has {found} atoms, the restraint is bound to a system of {expected}")]
    FrameAtomCountMismatch { expected: usize, found: usize },

    #[error("Invalid temperature: {reason}")]
    InvalidTemperature { reason: String },

    #[error("Restraint type '{0}' is not implemented, only 'boresch' is supported")]
    UnsupportedRestraintType(String),

    #[error("MD engine '{0}' is not supported, expected 'gromacs' or 'somd'")]
    UnsupportedEngine(String),

    #[error("Unknown correction method '{0}', expected 'analytical' or 'semi-analytical'")]
    UnknownCorrectionMethod(String),

    #[error("The bond force constant 'kr' must not be zero")]
    ZeroBondForceConstant,

    #[error("Cannot measure {0}: the anchor atoms are degenerate")]
    DegenerateGeometry(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RestraintError {
    /// True for requests the engine recognizes but does not implement, as
    /// opposed to invalid input.
    pub fn is_not_implemented(&self) -> bool {
        matches!(
            self,
            RestraintError::UnsupportedRestraintType(_) | RestraintError::UnsupportedEngine(_)
        )
    }
}
