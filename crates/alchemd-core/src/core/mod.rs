//! # Core Module
//!
//! Fundamental data structures and numerical utilities shared by the squashing
//! and restraint engines.
//!
//! - **Molecular Representation** ([`models`]) - Atoms, residues, molecules and systems,
//!   including the paired end-state properties carried by perturbable molecules
//! - **Physical Quantities** ([`units`]) - Values tagged with their physical dimensions
//! - **File I/O** ([`io`]) - JSON topologies and GRO coordinate frames
//! - **Utilities** ([`utils`]) - Internal-coordinate geometry and 1-D quadrature

pub mod io;
pub mod models;
pub mod units;
pub mod utils;
