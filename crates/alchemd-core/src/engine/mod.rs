//! # Engine Module
//!
//! The two computational engines of alchemd and the configuration they share.
//!
//! ## Overview
//!
//! Both engines operate on a [`MolecularSystem`](crate::core::models::system::MolecularSystem)
//! and never touch the filesystem unless a collaborator asks them to (the
//! external splicer being the only one that does).
//!
//! - **Topology Squasher** ([`squash`]) - Converts merged dual-state molecules into
//!   single-state layouts and maps engine output back onto the merged system
//! - **Restraint Engine** ([`restraint`]) - Validates Boresch restraints, serializes
//!   them for MD engines and computes their standard-state corrections
//! - **Configuration** ([`config`]) - Builder errors and splicer selection

pub mod config;
pub mod restraint;
pub mod squash;
