//! Text renderings of a Boresch restraint for MD engines.
//!
//! Both outputs are read by downstream engines as-is; field widths and
//! precision are part of the contract.

use super::boresch::{BoreschAnchor, BoreschParameters, BoreschTerm, TermKind, convert};
use super::error::RestraintError;
use crate::core::models::system::MolecularSystem;
use crate::core::units::{DEGREE, KJ_PER_MOL, NANOMETER, RADIAN, Unit};

const GROMACS_BOND_HEADER: &str = "; ai         aj      type bA         kA         bB         kB";
const GROMACS_ANGLE_HEADER: &str =
    "; ai         aj         ak      type thA        fcA        thB        fcB";
const GROMACS_DIHEDRAL_HEADER: &str =
    "; ai         aj         ak         al      type phiA       fcA        phiB       fcB";

/// GROMACS function type of each term kind.
fn gromacs_function_type(kind: TermKind) -> u8 {
    match kind {
        TermKind::Bond => 6,
        TermKind::Angle => 1,
        TermKind::Dihedral => 2,
    }
}

fn gromacs_units(kind: TermKind) -> (Unit, Unit) {
    match kind {
        TermKind::Bond => (NANOMETER, KJ_PER_MOL / NANOMETER.powi(2)),
        TermKind::Angle | TermKind::Dihedral => (DEGREE, KJ_PER_MOL / RADIAN.powi(2)),
    }
}

fn gromacs_line(
    system: &MolecularSystem,
    params: &BoreschParameters,
    term: &BoreschTerm,
) -> Result<String, RestraintError> {
    let indices = term
        .anchors
        .iter()
        .map(|&anchor| {
            params
                .anchors
                .index_in(system, anchor)
                .map(|i| format!("{:<10}", i + 1))
        })
        .collect::<Result<Vec<_>, _>>()?
        .join(" ");

    let (length_unit, force_unit) = gromacs_units(term.kind);
    let equilibrium = format!(
        "{:.3}",
        convert(term.equilibrium_key, &term.equilibrium, length_unit)?
    );
    let force_constant = format!(
        "{:.2}",
        convert(term.force_constant_key, &term.force_constant, force_unit)?
    );
    // The restraint is switched on from zero in state A to full strength in state B.
    let parameters = format!(
        "{:<10} {:<10} {:<10} {:<10}",
        equilibrium,
        format!("{:.2}", 0.0),
        equilibrium,
        force_constant
    );

    Ok(format!(
        "  {} {} {}",
        indices,
        gromacs_function_type(term.kind),
        parameters
    ))
}

/// Renders an `[ intermolecular_interactions ]` block with 1-based atom indices.
pub fn gromacs(
    system: &MolecularSystem,
    params: &BoreschParameters,
) -> Result<String, RestraintError> {
    let terms = params.terms();
    let mut output = vec!["[ intermolecular_interactions ]".to_string()];
    let mut current = None;
    for term in &terms {
        if current != Some(term.kind) {
            let (section, header) = match term.kind {
                TermKind::Bond => ("[ bonds ]", GROMACS_BOND_HEADER),
                TermKind::Angle => ("[ angles ]", GROMACS_ANGLE_HEADER),
                TermKind::Dihedral => ("[ dihedrals ]", GROMACS_DIHEDRAL_HEADER),
            };
            output.push(section.to_string());
            output.push(header.to_string());
            current = Some(term.kind);
        }
        output.push(gromacs_line(system, params, term)?);
    }
    Ok(output.join("\n"))
}

/// Renders the single-line SOMD restraint dictionary.
///
/// Indices are 0-based, equilibrium values are in Angstroms and radians, and
/// force constants are halved since SOMD writes the potential as `k (x - x0)^2`.
pub fn somd(system: &MolecularSystem, params: &BoreschParameters) -> Result<String, RestraintError> {
    let anchors = BoreschAnchor::ALL
        .iter()
        .map(|&anchor| {
            params
                .anchors
                .index_in(system, anchor)
                .map(|i| format!("\"{}\":{}", anchor.name(), i))
        })
        .collect::<Result<Vec<_>, _>>()?
        .join(", ");

    let terms = params.terms();
    let equilibrium = terms
        .iter()
        .map(|t| {
            t.equilibrium_value()
                .map(|v| format!("\"{}\":{:.2}", t.equilibrium_key, v))
        })
        .collect::<Result<Vec<_>, _>>()?
        .join(", ");
    let force_constants = terms
        .iter()
        .map(|t| {
            t.force_constant_value()
                .map(|v| format!("\"{}\":{:.2}", t.force_constant_key, v / 2.0))
        })
        .collect::<Result<Vec<_>, _>>()?
        .join(", ");

    Ok(format!(
        "boresch restraints dictionary = {{\"anchor_points\":{{{anchors}}}, \
         \"equilibrium_values\":{{{equilibrium}}}, \
         \"force_constants\":{{{force_constants}}}}}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::restraint::fixtures::{scenario_parameters, scenario_system};

    mod gromacs {
        use super::*;

        fn render() -> Vec<String> {
            let system = scenario_system();
            let params = scenario_parameters(&system);
            gromacs(&system, &params)
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }

        fn fields(line: &str) -> Vec<&str> {
            line.split_whitespace().collect()
        }

        #[test]
        fn emits_sections_in_order() {
            let lines = render();
            assert_eq!(lines.len(), 13);
            assert_eq!(lines[0], "[ intermolecular_interactions ]");
            assert_eq!(lines[1], "[ bonds ]");
            assert_eq!(lines[2], GROMACS_BOND_HEADER);
            assert_eq!(lines[4], "[ angles ]");
            assert_eq!(lines[5], GROMACS_ANGLE_HEADER);
            assert_eq!(lines[8], "[ dihedrals ]");
            assert_eq!(lines[9], GROMACS_DIHEDRAL_HEADER);
        }

        #[test]
        fn bond_line_turns_the_restraint_on_in_state_b() {
            let lines = render();
            assert_eq!(
                fields(&lines[3]),
                ["1", "1496", "6", "0.508", "0.00", "0.508", "4184.00"]
            );
        }

        #[test]
        fn bond_line_uses_fixed_width_fields() {
            let lines = render();
            assert_eq!(
                lines[3],
                "  1          1496       6 0.508      0.00       0.508      4184.00   "
            );
        }

        #[test]
        fn angle_lines_are_in_degrees() {
            let lines = render();
            assert_eq!(
                fields(&lines[6]),
                ["2", "1", "1496", "1", "64.051", "0.00", "64.051", "41.84"]
            );
            assert_eq!(
                fields(&lines[7]),
                ["1", "1496", "1497", "1", "39.618", "0.00", "39.618", "41.84"]
            );
        }

        #[test]
        fn dihedral_lines_are_in_degrees() {
            let lines = render();
            assert_eq!(
                fields(&lines[10]),
                ["3", "2", "1", "1496", "2", "148.396", "0.00", "148.396", "41.84"]
            );
            assert_eq!(
                fields(&lines[11]),
                ["2", "1", "1496", "1497", "2", "-68.755", "0.00", "-68.755", "41.84"]
            );
            assert_eq!(
                fields(&lines[12]),
                ["1", "1496", "1497", "1498", "2", "150.688", "0.00", "150.688", "41.84"]
            );
        }
    }

    mod somd {
        use super::*;

        #[test]
        fn renders_a_single_line_dictionary() {
            let system = scenario_system();
            let params = scenario_parameters(&system);
            let text = somd(&system, &params).unwrap();
            assert_eq!(
                text,
                "boresch restraints dictionary = {\"anchor_points\":{\"r1\":0, \"r2\":1, \"r3\":2, \
                 \"l1\":1495, \"l2\":1496, \"l3\":1497}, \
                 \"equilibrium_values\":{\"r0\":5.08, \"thetaA0\":1.12, \"thetaB0\":0.69, \
                 \"phiA0\":2.59, \"phiB0\":-1.20, \"phiC0\":2.63}, \
                 \"force_constants\":{\"kr\":5.00, \"kthetaA\":5.00, \"kthetaB\":5.00, \
                 \"kphiA\":5.00, \"kphiB\":5.00, \"kphiC\":5.00}}"
            );
            assert!(!text.contains('\n'));
        }
    }
}
