//! Index bookkeeping between merged and squashed systems.
//!
//! In the squashed layout every non-perturbable molecule keeps its relative
//! order at the front of the system, and each perturbable molecule is appended
//! at the tail as either a single spliced molecule (multi-residue) or a pair of
//! adjacent molecules, state A first (single-residue). Atom numbering follows
//! the same layout; within the squashed form of one perturbable molecule the
//! state A atom stream comes first, followed by the atoms that exist only in the
//! state B copies of perturbed residues.

use super::error::SquashError;
use crate::core::models::atom::EndState;
use crate::core::models::molecule::Molecule;
use crate::core::models::system::MolecularSystem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index map from merged to squashed numbering.
pub type IndexMap = BTreeMap<usize, usize>;

/// Per-residue perturbation flags of a perturbable molecule.
///
/// Every residue of a single-residue molecule counts as perturbed.
pub(crate) fn perturbed_residues(molecule: &Molecule) -> Result<Vec<bool>, SquashError> {
    molecule.check_end_states()?;
    Ok((0..molecule.num_residues())
        .map(|i| molecule.residue_is_perturbed(i).unwrap_or(false))
        .collect())
}

/// Number of molecules a perturbable molecule expands into when squashed.
pub fn squashed_size(molecule: &Molecule) -> usize {
    match (molecule.is_perturbable(), molecule.num_residues()) {
        (false, _) => 1,
        (true, 1) => 2,
        (true, _) => 1,
    }
}

/// Maps molecule indices of a merged system onto the squashed system, for one end state.
///
/// Non-perturbable molecules are compacted to the front. A multi-residue perturbable
/// molecule maps to its single spliced molecule in both states; a single-residue one
/// maps to the first of its two squashed molecules in state A and the second in state B.
pub fn squashed_molecule_mapping(system: &MolecularSystem, state: EndState) -> IndexMap {
    let mut mapping = IndexMap::new();
    let mut next = 0;
    for (i, molecule) in system.molecules().iter().enumerate() {
        if !molecule.is_perturbable() {
            mapping.insert(i, next);
            next += 1;
        }
    }
    for (i, molecule) in system.molecules().iter().enumerate() {
        if !molecule.is_perturbable() {
            continue;
        }
        let slots: Vec<Option<usize>> = match squashed_size(molecule) {
            2 => match state {
                EndState::A => vec![Some(next), None],
                EndState::B => vec![None, Some(next + 1)],
            },
            _ => vec![Some(next)],
        };
        next += slots.len();
        if let Some(index) = slots.into_iter().flatten().next() {
            mapping.insert(i, index);
        }
    }
    mapping
}

/// Maps atoms of a single molecule onto its squashed form, for one end state.
///
/// `offset_merged` and `offset_squashed` shift the keys and values respectively.
/// Returns the mapping and the total number of atoms in the squashed form of the
/// molecule.
pub fn squashed_atom_mapping_molecule(
    molecule: &Molecule,
    offset_merged: usize,
    offset_squashed: usize,
    state: EndState,
) -> Result<(IndexMap, usize), SquashError> {
    if !molecule.is_perturbable() {
        let n = molecule.num_atoms();
        let mapping = (0..n).map(|i| (offset_merged + i, offset_squashed + i)).collect();
        return Ok((mapping, n));
    }

    let perturbed = perturbed_residues(molecule)?;
    let mut mapping = IndexMap::new();
    let mut merged = offset_merged;
    let mut squashed_a = 0;
    let mut squashed_b = 0;
    let mut pending_b = Vec::new();

    for (residue, &is_perturbed) in molecule.residues().iter().zip(&perturbed) {
        if !is_perturbed {
            for _ in residue.atoms() {
                mapping.insert(merged, offset_squashed + squashed_a);
                merged += 1;
                squashed_a += 1;
            }
            continue;
        }

        let mut in_a = 0;
        let mut in_b = 0;
        let mut common = 0;
        for (k, atom) in residue.atoms().iter().enumerate() {
            let present_a = !atom.is_dummy_in(EndState::A).unwrap_or(true);
            let present_b = !atom.is_dummy_in(EndState::B).unwrap_or(true);
            match state {
                EndState::A if present_a => {
                    mapping.insert(merged + k, offset_squashed + squashed_a + in_a);
                }
                EndState::B if present_b => pending_b.push((merged + k, squashed_b + in_b)),
                _ => {}
            }
            in_a += usize::from(present_a);
            in_b += usize::from(present_b);
            common += usize::from(present_a && present_b);
        }
        if in_a + in_b - common != residue.num_atoms() {
            return Err(SquashError::InconsistentResidue {
                molecule: molecule.name.clone(),
                residue: residue.number,
            });
        }

        merged += residue.num_atoms();
        squashed_a += in_a;
        squashed_b += in_b;
    }

    // State B atoms of perturbed residues follow the complete state A stream.
    mapping.extend(
        pending_b
            .into_iter()
            .map(|(m, s)| (m, offset_squashed + squashed_a + s)),
    );
    Ok((mapping, squashed_a + squashed_b))
}

/// Maps global atom indices of a merged system onto the squashed system, for one end state.
pub fn squashed_atom_mapping(
    system: &MolecularSystem,
    state: EndState,
) -> Result<IndexMap, SquashError> {
    let mut mapping = IndexMap::new();
    let offsets = system.atom_offsets();

    let mut squashed_offset = 0;
    for (molecule, &merged_offset) in system.molecules().iter().zip(&offsets) {
        if !molecule.is_perturbable() {
            let (m, n) = squashed_atom_mapping_molecule(molecule, merged_offset, squashed_offset, state)?;
            mapping.extend(m);
            squashed_offset += n;
        }
    }
    for (molecule, &merged_offset) in system.molecules().iter().zip(&offsets) {
        if molecule.is_perturbable() {
            let (m, n) = squashed_atom_mapping_molecule(molecule, merged_offset, squashed_offset, state)?;
            mapping.extend(m);
            squashed_offset += n;
        }
    }
    Ok(mapping)
}

/// Molecule and atom mappings of one end state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMapping {
    pub molecules: IndexMap,
    pub atoms: IndexMap,
}

impl StateMapping {
    fn from_system(system: &MolecularSystem, state: EndState) -> Result<Self, SquashError> {
        Ok(Self {
            molecules: squashed_molecule_mapping(system, state),
            atoms: squashed_atom_mapping(system, state)?,
        })
    }
}

fn invert(mapping: &IndexMap) -> IndexMap {
    mapping.iter().map(|(&k, &v)| (v, k)).collect()
}

/// The complete merged ↔ squashed bookkeeping of one squash operation.
///
/// Built once from the merged system and reused (or persisted as JSON) for the
/// reverse transformation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquashMapping {
    /// Non-perturbable molecules only: a bijection onto `0..n_nonperturbable`.
    molecules: IndexMap,
    state_a: StateMapping,
    state_b: StateMapping,
    num_merged_molecules: usize,
    num_squashed_molecules: usize,
}

impl SquashMapping {
    pub fn from_system(system: &MolecularSystem) -> Result<Self, SquashError> {
        let molecules = squashed_molecule_mapping(system, EndState::A)
            .into_iter()
            .filter(|(merged, _)| {
                system
                    .molecule(*merged)
                    .is_some_and(|m| !m.is_perturbable())
            })
            .collect();
        let num_squashed_molecules = system.molecules().iter().map(squashed_size).sum();

        Ok(Self {
            molecules,
            state_a: StateMapping::from_system(system, EndState::A)?,
            state_b: StateMapping::from_system(system, EndState::B)?,
            num_merged_molecules: system.num_molecules(),
            num_squashed_molecules,
        })
    }

    /// Merged → squashed indices of the non-perturbable molecules.
    pub fn molecule_mapping(&self) -> &IndexMap {
        &self.molecules
    }

    pub fn state(&self, state: EndState) -> &StateMapping {
        match state {
            EndState::A => &self.state_a,
            EndState::B => &self.state_b,
        }
    }

    pub fn num_merged_molecules(&self) -> usize {
        self.num_merged_molecules
    }

    pub fn num_squashed_molecules(&self) -> usize {
        self.num_squashed_molecules
    }

    pub fn squashed_molecule(&self, merged: usize, state: EndState) -> Option<usize> {
        self.state(state).molecules.get(&merged).copied()
    }

    pub fn merged_molecule(&self, squashed: usize, state: EndState) -> Option<usize> {
        self.state(state)
            .molecules
            .iter()
            .find_map(|(&m, &s)| (s == squashed).then_some(m))
    }

    pub fn squashed_atom(&self, merged: usize, state: EndState) -> Option<usize> {
        self.state(state).atoms.get(&merged).copied()
    }

    pub fn merged_atom(&self, squashed: usize, state: EndState) -> Option<usize> {
        self.state(state)
            .atoms
            .iter()
            .find_map(|(&m, &s)| (s == squashed).then_some(m))
    }

    /// Squashed → merged molecule indices of the perturbable molecules.
    ///
    /// The inverse mappings of both states are united, state A winning on
    /// collision, and restricted to molecules absent from the non-perturbable
    /// mapping.
    pub fn inverse_perturbed_molecules(&self) -> IndexMap {
        let mut inverse = invert(&self.state_b.molecules);
        inverse.extend(invert(&self.state_a.molecules));
        inverse.retain(|_, merged| !self.molecules.contains_key(merged));
        inverse
    }

    /// For every perturbable merged molecule, its squashed molecule indices in ascending order.
    pub fn perturbed_molecules(&self) -> BTreeMap<usize, Vec<usize>> {
        let mut grouped: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (squashed, merged) in self.inverse_perturbed_molecules() {
            grouped.entry(merged).or_default().push(squashed);
        }
        grouped
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::core::models::atom::{Atom, EndStateProperties, PerturbedProperties};
    use crate::core::models::molecule::Molecule;
    use crate::core::models::residue::Residue;
    use nalgebra::Point3;

    pub fn plain_molecule(name: &str, n_atoms: usize, x: f64) -> Molecule {
        let atoms = (0..n_atoms)
            .map(|i| Atom::new(&format!("A{i}"), "C", Point3::new(x, i as f64, 0.0)))
            .collect();
        Molecule::with_residues(name, vec![Residue::with_atoms(name, 1, atoms)])
    }

    /// (element A, type A, element B, type B)
    pub type AtomSpec<'a> = (&'a str, &'a str, &'a str, &'a str);

    pub fn merged_residue(name: &str, number: isize, specs: &[AtomSpec], x: f64) -> Residue {
        let atoms = specs
            .iter()
            .enumerate()
            .map(|(i, &(ea, ta, eb, tb))| {
                Atom::new(&format!("{name}{i}"), ea, Point3::new(x, i as f64, 1.0))
                    .with_perturbation(PerturbedProperties::new(
                        EndStateProperties::new(ea, ta),
                        EndStateProperties::new(eb, tb),
                    ))
            })
            .collect();
        Residue::with_atoms(name, number, atoms)
    }

    /// Single residue, 4 atoms: common C, H dummy in B, O dummy in A, common C.
    pub fn single_residue_ligand() -> Molecule {
        Molecule::perturbable(
            "LIG",
            vec![merged_residue(
                "LIG",
                1,
                &[
                    ("C", "c3", "C", "c3"),
                    ("H", "hc", "Xx", "du"),
                    ("Xx", "du", "O", "oh"),
                    ("C", "c3", "C", "c3"),
                ],
                10.0,
            )],
        )
    }

    /// Three residues: unperturbed, perturbed (one atom gained), unperturbed.
    pub fn multi_residue_peptide() -> Molecule {
        Molecule::perturbable(
            "PEP",
            vec![
                merged_residue("ALA", 1, &[("N", "N", "N", "N"), ("C", "CT", "C", "CT")], 20.0),
                merged_residue(
                    "MUT",
                    2,
                    &[
                        ("C", "CT", "C", "CT"),
                        ("H", "HC", "Xx", "du"),
                        ("Xx", "du", "O", "OH"),
                        ("Xx", "du", "H", "HO"),
                    ],
                    21.0,
                ),
                merged_residue("GLY", 3, &[("N", "N", "N", "N")], 22.0),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn mixed_system() -> MolecularSystem {
        MolecularSystem::from_molecules(vec![
            plain_molecule("W0", 3, 0.0),
            single_residue_ligand(),
            plain_molecule("W1", 3, 1.0),
            multi_residue_peptide(),
            plain_molecule("W2", 2, 2.0),
        ])
    }

    #[test]
    fn molecule_mapping_places_single_residue_states_adjacently() {
        let system = mixed_system();
        let a = squashed_molecule_mapping(&system, EndState::A);
        let b = squashed_molecule_mapping(&system, EndState::B);

        assert_eq!(a, IndexMap::from([(0, 0), (2, 1), (4, 2), (1, 3), (3, 5)]));
        assert_eq!(b, IndexMap::from([(0, 0), (2, 1), (4, 2), (1, 4), (3, 5)]));
    }

    #[test]
    fn non_perturbable_mapping_is_a_permutation() {
        let mapping = SquashMapping::from_system(&mixed_system()).unwrap();
        let mut values: Vec<usize> = mapping.molecule_mapping().values().copied().collect();
        values.sort_unstable();
        assert_eq!(values, vec![0, 1, 2]);
        assert_eq!(mapping.num_squashed_molecules(), 3 + 2 + 1);
        assert_eq!(mapping.num_merged_molecules(), 5);
    }

    #[test]
    fn single_residue_atoms_split_into_state_streams() {
        let ligand = single_residue_ligand();
        let (a, n) = squashed_atom_mapping_molecule(&ligand, 0, 0, EndState::A).unwrap();
        let (b, _) = squashed_atom_mapping_molecule(&ligand, 0, 0, EndState::B).unwrap();

        assert_eq!(n, 6);
        assert_eq!(a, IndexMap::from([(0, 0), (1, 1), (3, 2)]));
        assert_eq!(b, IndexMap::from([(0, 3), (2, 4), (3, 5)]));
    }

    #[test]
    fn multi_residue_atoms_follow_spliced_layout() {
        let peptide = multi_residue_peptide();
        let (a, n) = squashed_atom_mapping_molecule(&peptide, 0, 0, EndState::A).unwrap();
        let (b, _) = squashed_atom_mapping_molecule(&peptide, 0, 0, EndState::B).unwrap();

        // Squashed: ALA(2) MUT_A(2) GLY(1) | MUT_B(3)
        assert_eq!(n, 8);
        assert_eq!(
            a,
            IndexMap::from([(0, 0), (1, 1), (2, 2), (3, 3), (6, 4)])
        );
        assert_eq!(
            b,
            IndexMap::from([(0, 0), (1, 1), (2, 5), (4, 6), (5, 7), (6, 4)])
        );
    }

    #[test]
    fn offsets_shift_keys_and_values() {
        let ligand = single_residue_ligand();
        let (a, _) = squashed_atom_mapping_molecule(&ligand, 100, 10, EndState::A).unwrap();
        assert_eq!(a.get(&103), Some(&12));
    }

    #[test]
    fn perturbed_residue_coverage_holds() {
        let peptide = multi_residue_peptide();
        let (a, _) = squashed_atom_mapping_molecule(&peptide, 0, 0, EndState::A).unwrap();
        let (b, _) = squashed_atom_mapping_molecule(&peptide, 0, 0, EndState::B).unwrap();

        // Perturbed residue MUT occupies merged atoms 2..6.
        let residue_atoms = 2..6;
        let in_a = residue_atoms.clone().filter(|i| a.contains_key(i)).count();
        let in_b = residue_atoms.clone().filter(|i| b.contains_key(i)).count();
        let common = residue_atoms
            .clone()
            .filter(|i| a.contains_key(i) && b.contains_key(i))
            .count();
        assert_eq!(in_a + in_b - common, residue_atoms.len());
    }

    #[test]
    fn global_atom_mapping_puts_non_perturbable_atoms_first() {
        let system = mixed_system();
        let a = squashed_atom_mapping(&system, EndState::A).unwrap();
        let b = squashed_atom_mapping(&system, EndState::B).unwrap();

        // Merged offsets: W0 0..3, LIG 3..7, W1 7..10, PEP 10..17, W2 17..19.
        assert_eq!(a[&0], 0);
        assert_eq!(a[&7], 3);
        assert_eq!(a[&17], 6);
        assert_eq!(a[&18], 7);
        // LIG occupies squashed atoms 8..14, PEP follows at 14.
        assert_eq!(a[&3], 8);
        assert_eq!(b[&3], 11);
        assert_eq!(a[&10], 14);
        assert_eq!(b[&12], 19);
        assert_eq!(a.len() + b.len(), 2 * 8 + 3 + 3 + 5 + 6);
    }

    #[test]
    fn atoms_dummy_in_both_states_are_rejected() {
        let broken = Molecule::perturbable(
            "BAD",
            vec![merged_residue("BAD", 7, &[("C", "c3", "C", "c3"), ("Xx", "du", "Xx", "du")], 0.0)],
        );
        let err = squashed_atom_mapping_molecule(&broken, 0, 0, EndState::A).unwrap_err();
        assert!(matches!(
            err,
            SquashError::InconsistentResidue { residue: 7, .. }
        ));
    }

    #[test]
    fn missing_end_state_properties_are_reported() {
        let mut ligand = single_residue_ligand();
        ligand.residues_mut()[0].add_atom(crate::core::models::atom::Atom::new(
            "X",
            "C",
            nalgebra::Point3::origin(),
        ));
        let err = squashed_atom_mapping_molecule(&ligand, 0, 0, EndState::B).unwrap_err();
        assert!(matches!(err, SquashError::MissingEndState(_)));
    }

    #[test]
    fn inverse_queries_group_perturbed_molecules() {
        let mapping = SquashMapping::from_system(&mixed_system()).unwrap();

        let grouped = mapping.perturbed_molecules();
        assert_eq!(grouped, BTreeMap::from([(1, vec![3, 4]), (3, vec![5])]));
        assert_eq!(mapping.merged_molecule(4, EndState::B), Some(1));
        assert_eq!(mapping.merged_molecule(4, EndState::A), None);
        assert_eq!(mapping.squashed_atom(3, EndState::B), Some(11));
        assert_eq!(mapping.merged_atom(11, EndState::B), Some(3));
    }

    #[test]
    fn mapping_round_trips_through_json() {
        let mapping = SquashMapping::from_system(&mixed_system()).unwrap();
        let json = serde_json::to_string(&mapping).unwrap();
        let restored: SquashMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, mapping);
    }
}
