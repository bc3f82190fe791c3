use super::error::RestraintError;
use crate::core::models::system::{AtomRef, MolecularSystem};
use crate::core::units::{ANGSTROM, Dimensions, KCAL_PER_MOL, Quantity, RADIAN, Unit};
use crate::core::utils::geometry;
use nalgebra::Point3;
use serde::Deserialize;
use std::fmt;
use BoreschAnchor::{L1, L2, L3, R1, R2, R3};

/// The six anchor atoms of a Boresch restraint: three receptor atoms and
/// three atoms of the decoupled ligand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoreschAnchor {
    R1,
    R2,
    R3,
    L1,
    L2,
    L3,
}

impl BoreschAnchor {
    pub const ALL: [BoreschAnchor; 6] = [
        BoreschAnchor::R1,
        BoreschAnchor::R2,
        BoreschAnchor::R3,
        BoreschAnchor::L1,
        BoreschAnchor::L2,
        BoreschAnchor::L3,
    ];
    pub const RECEPTOR: [BoreschAnchor; 3] =
        [BoreschAnchor::R1, BoreschAnchor::R2, BoreschAnchor::R3];
    pub const LIGAND: [BoreschAnchor; 3] =
        [BoreschAnchor::L1, BoreschAnchor::L2, BoreschAnchor::L3];

    pub fn name(self) -> &'static str {
        match self {
            BoreschAnchor::R1 => "r1",
            BoreschAnchor::R2 => "r2",
            BoreschAnchor::R3 => "r3",
            BoreschAnchor::L1 => "l1",
            BoreschAnchor::L2 => "l2",
            BoreschAnchor::L3 => "l3",
        }
    }

    pub fn is_ligand(self) -> bool {
        matches!(
            self,
            BoreschAnchor::L1 | BoreschAnchor::L2 | BoreschAnchor::L3
        )
    }

    fn position(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BoreschAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoreschAnchors {
    pub r1: AtomRef,
    pub r2: AtomRef,
    pub r3: AtomRef,
    pub l1: AtomRef,
    pub l2: AtomRef,
    pub l3: AtomRef,
}

impl BoreschAnchors {
    pub fn get(&self, anchor: BoreschAnchor) -> AtomRef {
        match anchor {
            BoreschAnchor::R1 => self.r1,
            BoreschAnchor::R2 => self.r2,
            BoreschAnchor::R3 => self.r3,
            BoreschAnchor::L1 => self.l1,
            BoreschAnchor::L2 => self.l2,
            BoreschAnchor::L3 => self.l3,
        }
    }

    /// Global 0-based index of `anchor` within `system`.
    pub fn index_in(
        &self,
        system: &MolecularSystem,
        anchor: BoreschAnchor,
    ) -> Result<usize, RestraintError> {
        system
            .atom_index(&self.get(anchor))
            .ok_or_else(|| missing_anchor(anchor))
    }
}

pub(super) fn missing_anchor(anchor: BoreschAnchor) -> RestraintError {
    if anchor.is_ligand() {
        RestraintError::LigandAtomNotDecoupled {
            anchor: anchor.name(),
        }
    } else {
        RestraintError::ReceptorAtomMissing {
            anchor: anchor.name(),
        }
    }
}

/// Equilibrium values: one distance and five angles.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoreschEquilibrium {
    pub r0: Quantity,
    #[serde(rename = "theta-a0")]
    pub theta_a0: Quantity,
    #[serde(rename = "theta-b0")]
    pub theta_b0: Quantity,
    #[serde(rename = "phi-a0")]
    pub phi_a0: Quantity,
    #[serde(rename = "phi-b0")]
    pub phi_b0: Quantity,
    #[serde(rename = "phi-c0")]
    pub phi_c0: Quantity,
}

impl BoreschEquilibrium {
    fn values(&self) -> [Quantity; 6] {
        [
            self.r0,
            self.theta_a0,
            self.theta_b0,
            self.phi_a0,
            self.phi_b0,
            self.phi_c0,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoreschForceConstants {
    pub kr: Quantity,
    #[serde(rename = "k-theta-a")]
    pub k_theta_a: Quantity,
    #[serde(rename = "k-theta-b")]
    pub k_theta_b: Quantity,
    #[serde(rename = "k-phi-a")]
    pub k_phi_a: Quantity,
    #[serde(rename = "k-phi-b")]
    pub k_phi_b: Quantity,
    #[serde(rename = "k-phi-c")]
    pub k_phi_c: Quantity,
}

impl BoreschForceConstants {
    /// The same bond constant for `kr` and the same angular constant for the five angles.
    pub fn uniform(bond: Quantity, angular: Quantity) -> Self {
        Self {
            kr: bond,
            k_theta_a: angular,
            k_theta_b: angular,
            k_phi_a: angular,
            k_phi_b: angular,
            k_phi_c: angular,
        }
    }

    fn values(&self) -> [Quantity; 6] {
        [
            self.kr,
            self.k_theta_a,
            self.k_theta_b,
            self.k_phi_a,
            self.k_phi_b,
            self.k_phi_c,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    Bond,
    Angle,
    Dihedral,
}

impl TermKind {
    /// Unit of the equilibrium value used in computations: Angstrom or radian.
    pub fn equilibrium_unit(self) -> Unit {
        match self {
            TermKind::Bond => ANGSTROM,
            TermKind::Angle | TermKind::Dihedral => RADIAN,
        }
    }

    /// Unit of the force constant used in computations: kcal/mol per Å² or per rad².
    pub fn force_constant_unit(self) -> Unit {
        KCAL_PER_MOL / self.equilibrium_unit().powi(2)
    }

    pub fn equilibrium_dimensions(self) -> Dimensions {
        self.equilibrium_unit().dimensions()
    }

    pub fn force_constant_dimensions(self) -> Dimensions {
        self.force_constant_unit().dimensions()
    }
}

struct TermLayout {
    kind: TermKind,
    name: &'static str,
    equilibrium_key: &'static str,
    force_constant_key: &'static str,
    anchors: &'static [BoreschAnchor],
}

const LAYOUT: [TermLayout; 6] = [
    TermLayout {
        kind: TermKind::Bond,
        name: "r",
        equilibrium_key: "r0",
        force_constant_key: "kr",
        anchors: &[R1, L1],
    },
    TermLayout {
        kind: TermKind::Angle,
        name: "thetaA",
        equilibrium_key: "thetaA0",
        force_constant_key: "kthetaA",
        anchors: &[R2, R1, L1],
    },
    TermLayout {
        kind: TermKind::Angle,
        name: "thetaB",
        equilibrium_key: "thetaB0",
        force_constant_key: "kthetaB",
        anchors: &[R1, L1, L2],
    },
    TermLayout {
        kind: TermKind::Dihedral,
        name: "phiA",
        equilibrium_key: "phiA0",
        force_constant_key: "kphiA",
        anchors: &[R3, R2, R1, L1],
    },
    TermLayout {
        kind: TermKind::Dihedral,
        name: "phiB",
        equilibrium_key: "phiB0",
        force_constant_key: "kphiB",
        anchors: &[R2, R1, L1, L2],
    },
    TermLayout {
        kind: TermKind::Dihedral,
        name: "phiC",
        equilibrium_key: "phiC0",
        force_constant_key: "kphiC",
        anchors: &[R1, L1, L2, L3],
    },
];

/// One harmonic degree of freedom of a Boresch restraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoreschTerm {
    pub kind: TermKind,
    pub name: &'static str,
    pub equilibrium_key: &'static str,
    pub force_constant_key: &'static str,
    pub anchors: &'static [BoreschAnchor],
    pub equilibrium: Quantity,
    pub force_constant: Quantity,
}

impl BoreschTerm {
    /// Equilibrium value in Angstroms (bond) or radians.
    pub fn equilibrium_value(&self) -> Result<f64, RestraintError> {
        convert(
            self.equilibrium_key,
            &self.equilibrium,
            self.kind.equilibrium_unit(),
        )
    }

    /// Force constant in kcal/mol/Å² (bond) or kcal/mol/rad².
    pub fn force_constant_value(&self) -> Result<f64, RestraintError> {
        convert(
            self.force_constant_key,
            &self.force_constant,
            self.kind.force_constant_unit(),
        )
    }

    fn validate(&self) -> Result<(), RestraintError> {
        self.equilibrium_value()?;
        if self.force_constant_value()? < 0.0 {
            return Err(RestraintError::NegativeForceConstant {
                parameter: self.force_constant_key,
            });
        }
        Ok(())
    }

    /// Deviation of `value` from equilibrium; periodic for dihedrals.
    pub fn deviation(&self, value: f64) -> Result<f64, RestraintError> {
        let x0 = self.equilibrium_value()?;
        Ok(match self.kind {
            TermKind::Dihedral => geometry::periodic_difference(value, x0),
            TermKind::Bond | TermKind::Angle => value - x0,
        })
    }

    /// Harmonic energy `k/2 (x - x0)^2` in kcal/mol.
    pub fn energy_at(&self, value: f64) -> Result<f64, RestraintError> {
        let dx = self.deviation(value)?;
        Ok(0.5 * self.force_constant_value()? * dx * dx)
    }
}

pub(super) fn convert(
    parameter: &'static str,
    quantity: &Quantity,
    unit: Unit,
) -> Result<f64, RestraintError> {
    quantity
        .value_in(unit)
        .map_err(|_| RestraintError::InvalidDimension {
            parameter,
            expected: unit.dimensions(),
            found: quantity.dimensions(),
        })
}

/// A complete Boresch restraint definition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoreschParameters {
    pub anchors: BoreschAnchors,
    pub equilibrium: BoreschEquilibrium,
    pub force_constants: BoreschForceConstants,
}

impl BoreschParameters {
    pub fn new(
        anchors: BoreschAnchors,
        equilibrium: BoreschEquilibrium,
        force_constants: BoreschForceConstants,
    ) -> Self {
        Self {
            anchors,
            equilibrium,
            force_constants,
        }
    }

    /// The six terms in the order r, thetaA, thetaB, phiA, phiB, phiC.
    pub fn terms(&self) -> [BoreschTerm; 6] {
        let equilibrium = self.equilibrium.values();
        let force_constants = self.force_constants.values();
        std::array::from_fn(|i| {
            let layout = &LAYOUT[i];
            BoreschTerm {
                kind: layout.kind,
                name: layout.name,
                equilibrium_key: layout.equilibrium_key,
                force_constant_key: layout.force_constant_key,
                anchors: layout.anchors,
                equilibrium: equilibrium[i],
                force_constant: force_constants[i],
            }
        })
    }

    /// Checks the physical dimensions of every equilibrium value and force constant.
    pub fn validate(&self) -> Result<(), RestraintError> {
        self.terms().iter().try_for_each(BoreschTerm::validate)
    }
}

/// Internal coordinates of the six anchors, in Angstroms and radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoreschGeometry {
    pub r: f64,
    pub theta_a: f64,
    pub theta_b: f64,
    pub phi_a: f64,
    pub phi_b: f64,
    pub phi_c: f64,
}

impl BoreschGeometry {
    /// Measures the restraint coordinates from the positions in `system`.
    pub fn measure(
        system: &MolecularSystem,
        anchors: &BoreschAnchors,
    ) -> Result<Self, RestraintError> {
        let mut positions = [Point3::origin(); 6];
        for anchor in BoreschAnchor::ALL {
            let atom = system
                .atom(&anchors.get(anchor))
                .ok_or_else(|| missing_anchor(anchor))?;
            positions[anchor.position()] = atom.position;
        }

        let mut values = [0.0; 6];
        for (value, layout) in values.iter_mut().zip(&LAYOUT) {
            let p: Vec<&Point3<f64>> = layout
                .anchors
                .iter()
                .map(|a| &positions[a.position()])
                .collect();
            let measured = match layout.kind {
                TermKind::Bond => Some(geometry::distance(p[0], p[1])),
                TermKind::Angle => geometry::angle(p[0], p[1], p[2]),
                TermKind::Dihedral => geometry::dihedral(p[0], p[1], p[2], p[3]),
            };
            *value = measured.ok_or(RestraintError::DegenerateGeometry(layout.name))?;
        }
        Ok(Self::from_values(values))
    }

    fn from_values(values: [f64; 6]) -> Self {
        let [r, theta_a, theta_b, phi_a, phi_b, phi_c] = values;
        Self {
            r,
            theta_a,
            theta_b,
            phi_a,
            phi_b,
            phi_c,
        }
    }

    /// Values in term order: r, thetaA, thetaB, phiA, phiB, phiC.
    pub fn values(&self) -> [f64; 6] {
        [
            self.r,
            self.theta_a,
            self.theta_b,
            self.phi_a,
            self.phi_b,
            self.phi_c,
        ]
    }

    pub fn to_equilibrium(&self) -> BoreschEquilibrium {
        BoreschEquilibrium {
            r0: self.r * ANGSTROM,
            theta_a0: self.theta_a * RADIAN,
            theta_b0: self.theta_b * RADIAN,
            phi_a0: self.phi_a * RADIAN,
            phi_b0: self.phi_b * RADIAN,
            phi_c0: self.phi_c * RADIAN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BoreschAnchor::{L1, L2, L3, R1};
    use super::*;
    use crate::core::units::{DEGREE, KELVIN, NANOMETER};
    use crate::engine::restraint::fixtures::{scenario_parameters, scenario_system};
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn terms_follow_the_serialization_order() {
        let params = scenario_parameters(&scenario_system());
        let names: Vec<_> = params.terms().iter().map(|t| t.name).collect();
        assert_eq!(names, ["r", "thetaA", "thetaB", "phiA", "phiB", "phiC"]);
        let terms = params.terms();
        assert_eq!(terms[0].anchors, &[R1, L1]);
        assert_eq!(terms[5].anchors, &[R1, L1, L2, L3]);
    }

    #[test]
    fn scenario_parameters_are_valid() {
        let params = scenario_parameters(&scenario_system());
        assert!(params.validate().is_ok());
        let terms = params.terms();
        assert_relative_eq!(terms[0].equilibrium_value().unwrap(), 5.08, epsilon = 1e-12);
        assert_relative_eq!(
            terms[1].equilibrium_value().unwrap(),
            64.051_f64.to_radians(),
            epsilon = 1e-12
        );
        assert_relative_eq!(terms[3].force_constant_value().unwrap(), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn equilibrium_with_wrong_dimension_is_rejected() {
        let mut params = scenario_parameters(&scenario_system());
        params.equilibrium.theta_b0 = 0.2 * NANOMETER;
        assert_eq!(
            params.validate(),
            Err(RestraintError::InvalidDimension {
                parameter: "thetaB0",
                expected: Dimensions::ANGLE,
                found: Dimensions::LENGTH,
            })
        );

        params = scenario_parameters(&scenario_system());
        params.equilibrium.r0 = 90.0 * DEGREE;
        assert!(matches!(
            params.validate(),
            Err(RestraintError::InvalidDimension { parameter: "r0", .. })
        ));
    }

    #[test]
    fn force_constant_with_wrong_dimension_is_rejected() {
        let mut params = scenario_parameters(&scenario_system());
        params.force_constants.kr = 10.0 * (KCAL_PER_MOL / RADIAN.powi(2));
        assert_eq!(
            params.validate(),
            Err(RestraintError::InvalidDimension {
                parameter: "kr",
                expected: Dimensions::BOND_FORCE_CONSTANT,
                found: Dimensions::ANGLE_FORCE_CONSTANT,
            })
        );

        params = scenario_parameters(&scenario_system());
        params.force_constants.k_phi_c = 300.0 * KELVIN;
        assert!(matches!(
            params.validate(),
            Err(RestraintError::InvalidDimension { parameter: "kphiC", .. })
        ));
    }

    #[test]
    fn negative_force_constant_is_rejected() {
        let mut params = scenario_parameters(&scenario_system());
        params.force_constants.k_theta_a = -1.0 * (KCAL_PER_MOL / RADIAN.powi(2));
        assert_eq!(
            params.validate(),
            Err(RestraintError::NegativeForceConstant {
                parameter: "kthetaA"
            })
        );
    }

    #[test]
    fn measures_internal_coordinates_of_the_anchors() {
        let system = scenario_system();
        let params = scenario_parameters(&system);
        let geometry = BoreschGeometry::measure(&system, &params.anchors).unwrap();
        assert_relative_eq!(geometry.r, 5.0, epsilon = 1e-12);
        assert_relative_eq!(geometry.theta_a.cos(), -0.6, epsilon = 1e-12);
        assert_relative_eq!(geometry.theta_b, FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(geometry.phi_a.abs(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(geometry.phi_b, FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(geometry.phi_c, 2.214_297_435_588_181, epsilon = 1e-12);
    }

    #[test]
    fn measured_geometry_converts_to_equilibrium_values() {
        let system = scenario_system();
        let params = scenario_parameters(&system);
        let geometry = BoreschGeometry::measure(&system, &params.anchors).unwrap();
        let equilibrium = geometry.to_equilibrium();
        assert_relative_eq!(equilibrium.r0.value_in(NANOMETER).unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(
            equilibrium.theta_b0.value_in(DEGREE).unwrap(),
            90.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn dihedral_deviation_wraps_around() {
        let params = scenario_parameters(&scenario_system());
        let phi_a = params.terms()[3];
        // phiA0 = 2.59 rad; -3.0 rad lies 0.693 rad away across the branch cut.
        let dev = phi_a.deviation(-3.0).unwrap();
        assert_relative_eq!(dev, std::f64::consts::TAU - 5.59, epsilon = 1e-12);
        assert_relative_eq!(
            phi_a.energy_at(-3.0).unwrap(),
            0.5 * 10.0 * dev * dev,
            epsilon = 1e-12
        );
    }

    #[test]
    fn measure_reports_degenerate_angles() {
        let mut system = scenario_system();
        let params = scenario_parameters(&system);
        let r1 = system.atom(&params.anchors.r1).unwrap().position;
        let l1_ref = params.anchors.l1;
        let index = system.index_of(l1_ref.molecule).unwrap();
        system
            .molecule_mut(index)
            .unwrap()
            .atom_mut(l1_ref.index)
            .unwrap()
            .position = r1;
        assert!(matches!(
            BoreschGeometry::measure(&system, &params.anchors),
            Err(RestraintError::DegenerateGeometry(_))
        ));
    }
}
