//! # alchemd Core Library
//!
//! Building blocks for alchemical free-energy workflows driven by external
//! molecular dynamics engines.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`MolecularSystem`,
//!   `Molecule`, `Atom`), dimensioned quantities, geometry and quadrature
//!   helpers, and the file formats used to exchange systems with external tools.
//!
//! - **[`engine`]: The Logic Core.** The topology squasher, which converts merged
//!   dual-state molecules into engine-ingestible single-state layouts and maps
//!   coordinates back, and the Boresch restraint engine, which validates,
//!   serializes and scores six-atom orientational restraints.
//!
//! - **[`workflows`]: The Public API.** File-level procedures tying the two
//!   layers together, such as squashing a system on disk or producing a
//!   restraint report from a TOML description.

pub mod core;
pub mod engine;
pub mod workflows;
