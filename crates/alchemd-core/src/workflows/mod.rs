//! # Workflows Module
//!
//! File-level entry points that tie the core models and the engines together.
//!
//! - **Squash Workflow** ([`squash`]) - Reads a merged system from disk, writes the
//!   squashed topology, coordinates and index mapping, and maps engine output back
//! - **Restraint Workflow** ([`restraint`]) - Builds a Boresch restraint from a TOML
//!   description and reports its engine rendering and standard-state correction

pub mod restraint;
pub mod squash;

use crate::core::io::gro::GroError;
use crate::core::io::json::JsonFileError;
use crate::engine::restraint::{RestraintError, RestraintFileError};
use crate::engine::squash::SquashError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Squash failed: {0}")]
    Squash(#[from] SquashError),

    #[error("Restraint error: {0}")]
    Restraint(#[from] RestraintError),

    #[error("Restraint file error: {0}")]
    RestraintFile(#[from] RestraintFileError),

    #[error("Topology file error: {0}")]
    Topology(#[from] JsonFileError),

    #[error("Coordinate file error: {0}")]
    Coordinates(#[from] GroError),

    #[error("Mapping file error: {0}")]
    Mapping(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
