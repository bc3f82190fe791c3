use super::mask::MaskError;
use crate::core::io::gro::GroError;
use crate::core::io::json::JsonFileError;
use crate::core::models::molecule::MissingEndStateError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SquashError {
    #[error(transparent)]
    MissingEndState(#[from] MissingEndStateError),

    #[error("Residue {residue} of molecule '{molecule}' has atoms that are dummies in both end states")]
    InconsistentResidue { molecule: String, residue: isize },

    #[error("Molecule index {index} is out of range for a system of {count} molecules")]
    MoleculeIndexOutOfRange { index: usize, count: usize },

    #[error("Atom count mismatch for molecule '{molecule}': expected {expected}, found {found}")]
    AtomCountMismatch {
        molecule: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid atom mask: {0}")]
    Mask(#[from] MaskError),

    #[error("Splice failed: {0}")]
    Splice(String),

    #[error("I/O error during splice: {0}")]
    Io(#[from] io::Error),

    #[error("Topology exchange failed: {0}")]
    Json(#[from] JsonFileError),

    #[error("Coordinate exchange failed: {0}")]
    Gro(#[from] GroError),
}
