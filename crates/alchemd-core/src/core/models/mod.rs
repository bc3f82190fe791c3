//! # Core Models Module
//!
//! Data structures used to represent molecular systems handed to and received
//! from external simulation engines.
//!
//! ## Key Components
//!
//! - [`atom`] - Atom representation with position, velocity and optional end-state properties
//! - [`residue`] - Ordered group of atoms within a molecule
//! - [`molecule`] - Named sequence of residues with perturbable and decoupled flags
//! - [`system`] - Ordered collection of molecules with index lookups
//!
//! ## Usage
//!
//! ```ignore
//! use alchemd::core::models::{atom::Atom, molecule::Molecule, residue::Residue};
//! use alchemd::core::models::system::MolecularSystem;
//!
//! let mut residue = Residue::new("ALA", 1);
//! residue.add_atom(Atom::new("CA", "C", Point3::new(0.0, 0.0, 0.0)));
//! let molecule = Molecule::with_residues("protein", vec![residue]);
//! let system = MolecularSystem::from(molecule);
//! ```

pub mod atom;
pub mod molecule;
pub mod residue;
pub mod system;
