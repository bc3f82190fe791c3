//! Standard-state corrections for releasing a Boresch restraint.
//!
//! Both methods evaluate `ΔG = -RT ln(8π²V0 / Z)`, where `Z` is the product of
//! the configurational integrals of the six restrained degrees of freedom. All
//! quantities are in kcal/mol, Angstroms and radians.

use super::boresch::{BoreschParameters, BoreschTerm, TermKind};
use super::error::RestraintError;
use crate::core::utils::{geometry, quadrature};
use std::f64::consts::{PI, TAU};
use tracing::debug;

/// Molar gas constant in kcal/(mol·K).
pub const GAS_CONSTANT: f64 = 8.314_462_618 / 4184.0;
pub const AVOGADRO: f64 = 6.022_140_76e23;
/// Volume per molecule at 1 mol/L, in Å³.
pub const STANDARD_STATE_VOLUME: f64 = 1e27 / AVOGADRO;

/// Half-width, in units of `sqrt(RT/k)`, at which a harmonic well reaches 8RT.
const WELL_HALF_WIDTH: f64 = 4.0;

fn prefactor() -> f64 {
    8.0 * PI * PI * STANDARD_STATE_VOLUME
}

fn free_energy(rt: f64, partition: f64) -> f64 {
    -rt * (prefactor() / partition).ln()
}

struct TermValues {
    kind: TermKind,
    x0: f64,
    k: f64,
}

fn term_values(term: &BoreschTerm) -> Result<TermValues, RestraintError> {
    Ok(TermValues {
        kind: term.kind,
        x0: term.equilibrium_value()?,
        k: term.force_constant_value()?,
    })
}

/// Integrates the Boltzmann factor of every term numerically.
pub fn semi_analytical(params: &BoreschParameters, temperature: f64) -> Result<f64, RestraintError> {
    let rt = GAS_CONSTANT * temperature;
    let mut partition = 1.0;
    for term in &params.terms() {
        let TermValues { kind, x0, k } = term_values(term)?;
        let boltzmann = move |dx: f64| (-k * dx * dx / (2.0 * rt)).exp();
        let z = match kind {
            TermKind::Bond => {
                if k == 0.0 {
                    return Err(RestraintError::ZeroBondForceConstant);
                }
                let half_width = WELL_HALF_WIDTH * (rt / k).sqrt();
                quadrature::integrate(
                    |r| r * r * boltzmann(r - x0),
                    (x0 - half_width).max(0.0),
                    x0 + half_width,
                )
            }
            TermKind::Angle => {
                quadrature::integrate_split(|t| t.sin() * boltzmann(t - x0), 0.0, PI, &[x0])
            }
            TermKind::Dihedral => {
                // The integrand has a kink opposite the well.
                let cut = geometry::wrap_angle(x0 + PI);
                let f = |p: f64| boltzmann(geometry::periodic_difference(p, x0));
                quadrature::integrate_split(f, -PI, PI, &[geometry::wrap_angle(x0), cut])
            }
        };
        debug!(term = term.name, z, "Integrated restraint term.");
        partition *= z;
    }
    Ok(free_energy(rt, partition))
}

/// Closed-form harmonic approximation.
///
/// Terms with a zero angular force constant contribute their unrestrained
/// integral (2 for an angle, 2π for a dihedral).
pub fn analytical(params: &BoreschParameters, temperature: f64) -> Result<f64, RestraintError> {
    let rt = GAS_CONSTANT * temperature;
    let mut partition = 1.0;
    for term in &params.terms() {
        let TermValues { kind, x0, k } = term_values(term)?;
        let gaussian = || (TAU * rt / k).sqrt();
        let z = match kind {
            TermKind::Bond if k == 0.0 => return Err(RestraintError::ZeroBondForceConstant),
            TermKind::Bond => x0 * x0 * gaussian(),
            TermKind::Angle if k == 0.0 => 2.0,
            TermKind::Angle => x0.sin() * gaussian(),
            TermKind::Dihedral if k == 0.0 => TAU,
            TermKind::Dihedral => gaussian(),
        };
        partition *= z;
    }
    Ok(free_energy(rt, partition))
}
