//! Conversion between merged (dual-state) systems and squashed (single-state) layouts.
//!
//! Engines without native support for merged molecules receive a "squashed"
//! system: every perturbable molecule is moved to the end of the system and
//! replaced by ordinary molecules, either the two pure end states (single-residue
//! molecules) or one molecule spliced from both end states (multi-residue
//! molecules). The [`SquashMapping`] produced alongside records how indices move
//! so that [`unsquash`] can write engine output back into the merged system.

pub mod error;
pub mod mapping;
pub mod mask;
pub mod splicer;

pub use error::SquashError;
pub use mapping::{
    IndexMap, SquashMapping, StateMapping, squashed_atom_mapping, squashed_atom_mapping_molecule,
    squashed_molecule_mapping, squashed_size,
};
pub use mask::{AtomMask, MaskError};
pub use splicer::{ExternalSplicer, NativeSplicer, SpliceMasks, TopologySplicer};

use crate::core::models::atom::EndState;
use crate::core::models::molecule::{MolNum, Molecule};
use crate::core::models::system::MolecularSystem;
use nalgebra::{Point3, Vector3};
use tracing::{debug, info, instrument};

/// Squashes every perturbable molecule of `system`.
///
/// Non-perturbable molecules keep their relative order at the front; the
/// squashed forms of the perturbable molecules are appended in their original
/// order. The input system is not modified.
#[instrument(skip_all, name = "squash")]
pub fn squash(
    system: &MolecularSystem,
    splicer: &impl TopologySplicer,
) -> Result<(MolecularSystem, SquashMapping), SquashError> {
    let mapping = SquashMapping::from_system(system)?;

    let perturbable: Vec<MolNum> = system.perturbable_molecules().map(Molecule::number).collect();
    let mut squashed = system.clone();
    let removed = squashed.remove_molecules(&perturbable);
    for molecule in &removed {
        squashed.extend(squash_molecule(molecule, splicer)?);
    }

    info!(
        merged_molecules = system.num_molecules(),
        perturbable = removed.len(),
        squashed_molecules = squashed.num_molecules(),
        "Squashed system."
    );
    Ok((squashed, mapping))
}

/// Squashes a single molecule.
///
/// Non-perturbable molecules are returned unchanged. A single-residue
/// perturbable molecule becomes its two pure end states (state A first); a
/// multi-residue one is spliced into one molecule by `splicer`.
pub fn squash_molecule(
    molecule: &Molecule,
    splicer: &impl TopologySplicer,
) -> Result<MolecularSystem, SquashError> {
    if !molecule.is_perturbable() {
        return Ok(MolecularSystem::from(molecule.clone()));
    }

    let state_a = molecule.to_end_state(EndState::A)?;
    let state_b = molecule.to_end_state(EndState::B)?;
    if molecule.num_residues() == 1 {
        return Ok(MolecularSystem::from_molecules(vec![state_a, state_b]));
    }

    let perturbed = mapping::perturbed_residues(molecule)?;
    let masks = SpliceMasks::for_molecule(molecule, &perturbed);
    debug!(
        molecule = %molecule.name,
        perturbed_residues = perturbed.iter().filter(|p| **p).count(),
        "Splicing end states."
    );

    let combined = MolecularSystem::from_molecules(vec![state_a, state_b]);
    let spliced = splicer.splice(&combined, &masks)?;
    if spliced.num_atoms() != masks.spliced_atom_count() {
        return Err(SquashError::AtomCountMismatch {
            molecule: molecule.name.clone(),
            expected: masks.spliced_atom_count(),
            found: spliced.num_atoms(),
        });
    }
    Ok(MolecularSystem::from(spliced))
}

fn copy_coordinates(source: &Molecule, target: &mut Molecule) -> Result<(), SquashError> {
    if source.num_atoms() != target.num_atoms() {
        return Err(SquashError::AtomCountMismatch {
            molecule: target.name.clone(),
            expected: target.num_atoms(),
            found: source.num_atoms(),
        });
    }
    for (to, from) in target.atoms_mut().zip(source.atoms()) {
        to.position = from.position;
        if from.velocity.is_some() {
            to.velocity = from.velocity;
        }
    }
    Ok(())
}

fn squashed_molecule_at(squashed: &MolecularSystem, index: usize) -> Result<&Molecule, SquashError> {
    squashed
        .molecule(index)
        .ok_or(SquashError::MoleculeIndexOutOfRange {
            index,
            count: squashed.num_molecules(),
        })
}

/// Writes coordinates and velocities of a squashed system back into a copy of
/// the merged system.
///
/// `mapping` must be the one produced when `system` was squashed. Perturbable
/// molecules without squashed counterparts are left unchanged.
#[instrument(skip_all, name = "unsquash")]
pub fn unsquash(
    system: &MolecularSystem,
    squashed: &MolecularSystem,
    mapping: &SquashMapping,
) -> Result<MolecularSystem, SquashError> {
    if mapping.num_merged_molecules() != system.num_molecules() {
        return Err(SquashError::MoleculeIndexOutOfRange {
            index: mapping.num_merged_molecules().saturating_sub(1),
            count: system.num_molecules(),
        });
    }
    let mut result = system.clone();

    for (&merged, &squashed_idx) in mapping.molecule_mapping() {
        let source = squashed_molecule_at(squashed, squashed_idx)?;
        let count = result.num_molecules();
        let target = result
            .molecule_mut(merged)
            .ok_or(SquashError::MoleculeIndexOutOfRange {
                index: merged,
                count,
            })?;
        copy_coordinates(source, target)?;
    }

    let perturbed = mapping.perturbed_molecules();
    for (&merged, squashed_indices) in &perturbed {
        let sources = squashed_indices
            .iter()
            .map(|&i| squashed_molecule_at(squashed, i))
            .collect::<Result<Vec<_>, _>>()?;
        let molecule = system
            .molecule(merged)
            .ok_or(SquashError::MoleculeIndexOutOfRange {
                index: merged,
                count: system.num_molecules(),
            })?;
        let updated = unsquash_molecule(molecule, &sources)?;
        result.replace_molecule(merged, updated);
    }

    info!(
        non_perturbable = mapping.molecule_mapping().len(),
        perturbable = perturbed.len(),
        "Unsquashed system."
    );
    Ok(result)
}

/// Updates a merged molecule from its one or two squashed counterparts.
///
/// Every merged atom takes the coordinates of its squashed image, the state A
/// image winning for atoms present in both states. When the molecule was
/// squashed into two molecules, the state B copy is first translated so that the
/// first common atom coincides in both copies, undoing any periodic wrapping the
/// engine applied to one copy only. Velocities are copied when the squashed
/// molecules carry them.
pub fn unsquash_molecule(
    molecule: &Molecule,
    squashed: &[&Molecule],
) -> Result<Molecule, SquashError> {
    let mut result = molecule.clone();
    if !molecule.is_perturbable() {
        if let Some(source) = squashed.first() {
            copy_coordinates(source, &mut result)?;
        }
        return Ok(result);
    }

    let (mapping_a, expected) = squashed_atom_mapping_molecule(molecule, 0, 0, EndState::A)?;
    let (mapping_b, _) = squashed_atom_mapping_molecule(molecule, 0, 0, EndState::B)?;
    let found: usize = squashed.iter().map(|m| m.num_atoms()).sum();
    if found != expected {
        return Err(SquashError::AtomCountMismatch {
            molecule: molecule.name.clone(),
            expected,
            found,
        });
    }

    let mut positions: Vec<Point3<f64>> = squashed
        .iter()
        .flat_map(|m| m.atoms().map(|a| a.position))
        .collect();
    let velocities: Option<Vec<Vector3<f64>>> = squashed
        .iter()
        .flat_map(|m| m.atoms().map(|a| a.velocity))
        .collect();

    if squashed.len() == 2 {
        let common = mapping_a
            .iter()
            .find_map(|(merged, &a)| mapping_b.get(merged).map(|&b| (a, b)));
        if let Some((a, b)) = common {
            let shift = positions[b] - positions[a];
            for &i in mapping_b.values() {
                positions[i] -= shift;
            }
        }
    }

    let mut merged_mapping = mapping_b;
    merged_mapping.extend(mapping_a);
    for (i, atom) in result.atoms_mut().enumerate() {
        if let Some(&s) = merged_mapping.get(&i) {
            atom.position = positions[s];
            if let Some(v) = &velocities {
                atom.velocity = Some(v[s]);
            }
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::mapping::fixtures::*;
    use super::*;
    use crate::core::models::residue::Residue;
    use approx::assert_relative_eq;
    use std::cell::Cell;

    /// Splicer that records how often it is called.
    #[derive(Default)]
    struct CountingSplicer {
        calls: Cell<usize>,
    }

    impl TopologySplicer for CountingSplicer {
        fn splice(
            &self,
            combined: &MolecularSystem,
            masks: &SpliceMasks,
        ) -> Result<Molecule, SquashError> {
            self.calls.set(self.calls.get() + 1);
            NativeSplicer.splice(combined, masks)
        }
    }

    /// Splicer that loses an atom.
    struct LossySplicer;

    impl TopologySplicer for LossySplicer {
        fn splice(
            &self,
            combined: &MolecularSystem,
            masks: &SpliceMasks,
        ) -> Result<Molecule, SquashError> {
            let mut molecule = NativeSplicer.splice(combined, masks)?;
            let residue = Residue::with_atoms("X", 99, Vec::new());
            molecule.residues_mut()[0] = residue;
            Ok(molecule)
        }
    }

    fn mixed_system() -> MolecularSystem {
        MolecularSystem::from_molecules(vec![
            plain_molecule("W0", 3, 0.0),
            single_residue_ligand(),
            plain_molecule("W1", 3, 1.0),
            multi_residue_peptide(),
            plain_molecule("W2", 2, 2.0),
        ])
    }

    fn translate(system: &mut MolecularSystem, shift: Vector3<f64>) {
        for atom in system.atoms_mut() {
            atom.position += shift;
        }
    }

    mod squashing {
        use super::*;

        #[test]
        fn molecule_count_matches_expansion() {
            let system = mixed_system();
            let (squashed, mapping) = squash(&system, &NativeSplicer).unwrap();

            let n_nonpert = 3;
            let expansion: usize = system
                .perturbable_molecules()
                .map(squashed_size)
                .sum();
            assert_eq!(squashed.num_molecules(), n_nonpert + expansion);
            assert_eq!(mapping.molecule_mapping().len(), n_nonpert);
            assert_eq!(mapping.num_squashed_molecules(), squashed.num_molecules());
        }

        #[test]
        fn perturbable_molecules_move_to_the_tail() {
            let system = mixed_system();
            let (squashed, _) = squash(&system, &NativeSplicer).unwrap();

            let names: Vec<_> = squashed.molecules().iter().map(|m| m.name.as_str()).collect();
            assert_eq!(names, vec!["W0", "W1", "W2", "LIG", "LIG", "PEP"]);
            assert!(squashed.molecules().iter().all(|m| !m.is_perturbable()));
            // The input is untouched.
            assert_eq!(system.molecule(1).unwrap().name, "LIG");
        }

        #[test]
        fn squashed_atom_count_matches_atom_mapping() {
            let system = mixed_system();
            let (squashed, mapping) = squash(&system, &NativeSplicer).unwrap();

            let a = &mapping.state(EndState::A).atoms;
            let b = &mapping.state(EndState::B).atoms;
            let mut images: Vec<usize> = a.values().chain(b.values()).copied().collect();
            images.sort_unstable();
            images.dedup();
            assert_eq!(images, (0..squashed.num_atoms()).collect::<Vec<_>>());
        }

        #[test]
        fn atom_images_share_elements() {
            let system = mixed_system();
            let (squashed, mapping) = squash(&system, &NativeSplicer).unwrap();

            for state in EndState::BOTH {
                for (&merged, &image) in &mapping.state(state).atoms {
                    let source = system.atom_by_index(merged).unwrap();
                    let expected = source
                        .end_state(state)
                        .map_or(source.element.as_str(), |p| p.element.as_str());
                    assert_eq!(squashed.atom_by_index(image).unwrap().element, expected);
                }
            }
        }

        #[test]
        fn non_perturbable_molecule_is_identity() {
            let water = plain_molecule("W", 3, 0.0);
            let squashed = squash_molecule(&water, &NativeSplicer).unwrap();
            assert_eq!(squashed.num_molecules(), 1);
            assert_eq!(squashed.molecule(0).unwrap(), &water);
        }

        #[test]
        fn single_residue_molecule_becomes_two_end_states() {
            let splicer = CountingSplicer::default();
            let squashed = squash_molecule(&single_residue_ligand(), &splicer).unwrap();

            assert_eq!(squashed.num_molecules(), 2);
            assert_eq!(squashed.molecule(0).unwrap().num_atoms(), 3);
            assert_eq!(squashed.molecule(1).unwrap().num_atoms(), 3);
            assert_eq!(squashed.molecule(1).unwrap().atom(1).unwrap().element, "O");
            assert_eq!(splicer.calls.get(), 0);
        }

        #[test]
        fn multi_residue_molecule_is_spliced_once() {
            let splicer = CountingSplicer::default();
            let squashed = squash_molecule(&multi_residue_peptide(), &splicer).unwrap();

            assert_eq!(squashed.num_molecules(), 1);
            assert_eq!(squashed.num_atoms(), 8);
            assert_eq!(splicer.calls.get(), 1);
        }

        #[test]
        fn splicer_output_with_wrong_atom_count_is_rejected() {
            let err = squash_molecule(&multi_residue_peptide(), &LossySplicer).unwrap_err();
            assert!(matches!(
                err,
                SquashError::AtomCountMismatch { expected: 8, found: 6, .. }
            ));
        }
    }

    mod unsquashing {
        use super::*;

        #[test]
        fn round_trip_restores_moved_coordinates() {
            let system = mixed_system();
            let (mut squashed, mapping) = squash(&system, &NativeSplicer).unwrap();
            let shift = Vector3::new(1.0, -2.0, 0.5);
            translate(&mut squashed, shift);

            let restored = unsquash(&system, &squashed, &mapping).unwrap();

            assert_eq!(restored.num_molecules(), system.num_molecules());
            for (before, after) in system.atoms().zip(restored.atoms()) {
                assert_relative_eq!(after.position, before.position + shift, epsilon = 1e-12);
            }
            // Molecule identity survives.
            for (before, after) in system.molecules().iter().zip(restored.molecules()) {
                assert_eq!(before.number(), after.number());
                assert_eq!(before.is_perturbable(), after.is_perturbable());
            }
        }

        #[test]
        fn wrapped_state_b_copy_is_translated_back() {
            let system = MolecularSystem::from(single_residue_ligand());
            let (mut squashed, mapping) = squash(&system, &NativeSplicer).unwrap();
            let box_shift = Vector3::new(30.0, 0.0, 0.0);
            for atom in squashed.molecule_mut(1).unwrap().atoms_mut() {
                atom.position += box_shift;
            }

            let restored = unsquash(&system, &squashed, &mapping).unwrap();

            for (before, after) in system.atoms().zip(restored.atoms()) {
                assert_relative_eq!(after.position, before.position, epsilon = 1e-12);
            }
        }

        #[test]
        fn state_a_images_win_for_common_atoms() {
            let system = MolecularSystem::from(single_residue_ligand());
            let (mut squashed, mapping) = squash(&system, &NativeSplicer).unwrap();
            // Distort a common atom in the state B copy only; the translation is
            // taken from the first common atom, so distort the second one.
            let moved = squashed.molecule_mut(1).unwrap().atom_mut(2).unwrap();
            moved.position += Vector3::new(0.0, 0.0, 5.0);

            let restored = unsquash(&system, &squashed, &mapping).unwrap();

            let original = system.atom_by_index(3).unwrap().position;
            assert_relative_eq!(restored.atom_by_index(3).unwrap().position, original, epsilon = 1e-12);
        }

        #[test]
        fn velocities_are_copied_when_present() {
            let system = mixed_system();
            let (mut squashed, mapping) = squash(&system, &NativeSplicer).unwrap();
            for (i, atom) in squashed.atoms_mut().enumerate() {
                atom.velocity = Some(Vector3::new(i as f64, 0.0, 0.0));
            }

            let restored = unsquash(&system, &squashed, &mapping).unwrap();

            assert!(restored.atoms().all(|a| a.velocity.is_some()));
            // W1 starts at merged atom 7 and squashed atom 3.
            assert_eq!(restored.atom_by_index(7).unwrap().velocity, Some(Vector3::new(3.0, 0.0, 0.0)));
            // LIG state B only atom (merged 5) maps to squashed 12.
            assert_eq!(restored.atom_by_index(5).unwrap().velocity, Some(Vector3::new(12.0, 0.0, 0.0)));
        }

        #[test]
        fn missing_velocities_leave_existing_ones() {
            let mut system = mixed_system();
            for atom in system.atoms_mut() {
                atom.velocity = Some(Vector3::new(9.0, 9.0, 9.0));
            }
            let (mut squashed, mapping) = squash(&system, &NativeSplicer).unwrap();
            for atom in squashed.atoms_mut() {
                atom.velocity = None;
            }

            let restored = unsquash(&system, &squashed, &mapping).unwrap();

            assert!(restored
                .atoms()
                .all(|a| a.velocity == Some(Vector3::new(9.0, 9.0, 9.0))));
        }

        #[test]
        fn truncated_squashed_system_is_rejected() {
            let system = mixed_system();
            let (squashed, mapping) = squash(&system, &NativeSplicer).unwrap();
            let mut truncated = squashed.clone();
            let last = truncated.molecule(5).unwrap().number();
            truncated.remove_molecules(&[last]);

            let err = unsquash(&system, &truncated, &mapping).unwrap_err();
            assert!(matches!(
                err,
                SquashError::MoleculeIndexOutOfRange { index: 5, count: 5 }
            ));
        }

        #[test]
        fn mismatched_molecule_is_rejected() {
            let system = mixed_system();
            let (mut squashed, mapping) = squash(&system, &NativeSplicer).unwrap();
            squashed.replace_molecule(0, plain_molecule("W0", 4, 0.0));

            let err = unsquash(&system, &squashed, &mapping).unwrap_err();
            assert!(matches!(
                err,
                SquashError::AtomCountMismatch { expected: 3, found: 4, .. }
            ));
        }

        #[test]
        fn mapping_from_another_system_is_rejected() {
            let system = mixed_system();
            let (squashed, mapping) = squash(&system, &NativeSplicer).unwrap();
            let other = MolecularSystem::from(plain_molecule("W", 3, 0.0));
            assert!(unsquash(&other, &squashed, &mapping).is_err());
        }
    }
}
