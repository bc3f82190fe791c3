//! Reading and writing molecular systems.
//!
//! Two formats are supported: a JSON topology that carries the complete model
//! (including the paired end-state properties of merged molecules and the
//! perturbable/decoupled flags), and fixed-column GROMACS coordinate files that
//! carry positions, velocities and the periodic box. Both implement the
//! [`MolecularFile`](traits::MolecularFile) trait and preserve atom order.

pub mod gro;
pub mod json;
pub mod traits;
