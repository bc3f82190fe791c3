//! Numerical helpers shared by the engines: internal-coordinate geometry and
//! one-dimensional quadrature.

pub mod geometry;
pub mod quadrature;
