use super::atom::{Atom, EndState};
use super::residue::Residue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_MOL_NUM: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique identity of a molecule.
///
/// Clones share the number of their source, so a copied system still contains
/// every molecule (and atom reference) of the original. Freshly built or
/// deserialized molecules always receive a new number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MolNum(u64);

impl MolNum {
    pub(crate) fn next() -> Self {
        MolNum(NEXT_MOL_NUM.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MolNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Atom {atom_index} of molecule '{molecule}' has no end-state properties")]
pub struct MissingEndStateError {
    pub molecule: String,
    pub atom_index: usize,
}

/// A named, ordered sequence of residues.
///
/// A perturbable molecule encodes both end states of an alchemical
/// transformation through the [`PerturbedProperties`](super::atom::PerturbedProperties)
/// of its atoms. A decoupled molecule is the one whose interactions with the
/// environment are being switched off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    #[serde(skip, default = "MolNum::next")]
    number: MolNum,
    pub name: String,
    residues: Vec<Residue>,
    #[serde(default)]
    perturbable: bool,
    #[serde(default)]
    decoupled: bool,
}

impl Molecule {
    pub fn new(name: &str) -> Self {
        Self::with_residues(name, Vec::new())
    }

    pub fn with_residues(name: &str, residues: Vec<Residue>) -> Self {
        Self {
            number: MolNum::next(),
            name: name.to_string(),
            residues,
            perturbable: false,
            decoupled: false,
        }
    }

    /// Builds a merged (perturbable) molecule.
    pub fn perturbable(name: &str, residues: Vec<Residue>) -> Self {
        let mut molecule = Self::with_residues(name, residues);
        molecule.perturbable = true;
        molecule
    }

    pub fn number(&self) -> MolNum {
        self.number
    }

    pub fn is_perturbable(&self) -> bool {
        self.perturbable
    }

    pub fn is_decoupled(&self) -> bool {
        self.decoupled
    }

    /// Marks (or unmarks) this molecule as the alchemically decoupled one.
    pub fn set_decoupled(&mut self, decoupled: bool) {
        self.decoupled = decoupled;
    }

    /// Returns a copy of this molecule marked as decoupled.
    pub fn decouple(mut self) -> Self {
        self.decoupled = true;
        self
    }

    /// Whether the residue at `index` differs between end states.
    ///
    /// Every residue of a single-residue molecule counts as perturbed. Returns
    /// `None` if the index is out of range or end-state properties are missing.
    pub fn residue_is_perturbed(&self, index: usize) -> Option<bool> {
        let residue = self.residues.get(index)?;
        let perturbed = residue.is_perturbed()?;
        Some(perturbed || self.residues.len() == 1)
    }

    pub fn add_residue(&mut self, residue: Residue) {
        self.residues.push(residue);
    }

    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub fn residues_mut(&mut self) -> &mut [Residue] {
        &mut self.residues
    }

    pub fn num_residues(&self) -> usize {
        self.residues.len()
    }

    pub fn num_atoms(&self) -> usize {
        self.residues.iter().map(Residue::num_atoms).sum()
    }

    /// Iterates over all atoms in residue order.
    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.residues.iter().flat_map(|r| r.atoms.iter())
    }

    pub fn atoms_mut(&mut self) -> impl Iterator<Item = &mut Atom> {
        self.residues.iter_mut().flat_map(|r| r.atoms.iter_mut())
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms().nth(index)
    }

    pub fn atom_mut(&mut self, index: usize) -> Option<&mut Atom> {
        self.atoms_mut().nth(index)
    }

    /// Returns the first atom index lacking end-state properties, if any.
    pub(crate) fn check_end_states(&self) -> Result<(), MissingEndStateError> {
        match self.atoms().position(|atom| atom.perturbation.is_none()) {
            Some(atom_index) => Err(MissingEndStateError {
                molecule: self.name.clone(),
                atom_index,
            }),
            None => Ok(()),
        }
    }

    /// Extracts the pure single-state molecule for `state`.
    ///
    /// Atoms that are dummies in `state` are dropped, the remaining atoms adopt
    /// that state's element and force field type, and residues left without
    /// atoms are omitted. The result is neither perturbable nor decoupled and
    /// receives a new molecule number.
    pub fn to_end_state(&self, state: EndState) -> Result<Molecule, MissingEndStateError> {
        self.check_end_states()?;

        let residues = self
            .residues
            .iter()
            .filter_map(|residue| {
                let atoms: Vec<Atom> = residue
                    .atoms
                    .iter()
                    .filter_map(|atom| {
                        let props = atom.end_state(state)?;
                        if props.is_dummy() {
                            return None;
                        }
                        Some(Atom {
                            name: atom.name.clone(),
                            element: props.element.clone(),
                            force_field_type: props.force_field_type.clone(),
                            position: atom.position,
                            velocity: atom.velocity,
                            perturbation: None,
                        })
                    })
                    .collect();
                (!atoms.is_empty())
                    .then(|| Residue::with_atoms(&residue.name, residue.number, atoms))
            })
            .collect();

        Ok(Molecule::with_residues(&self.name, residues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::{EndStateProperties, PerturbedProperties};
    use nalgebra::{Point3, Vector3};

    fn pert(elem_a: &str, type_a: &str, elem_b: &str, type_b: &str) -> PerturbedProperties {
        PerturbedProperties::new(
            EndStateProperties::new(elem_a, type_a),
            EndStateProperties::new(elem_b, type_b),
        )
    }

    fn create_merged_ligand() -> Molecule {
        let atoms = vec![
            Atom::new("C1", "C", Point3::new(0.0, 0.0, 0.0))
                .with_velocity(Vector3::new(0.1, 0.0, 0.0))
                .with_perturbation(pert("C", "c3", "C", "c3")),
            Atom::new("H1", "H", Point3::new(1.0, 0.0, 0.0))
                .with_perturbation(pert("H", "hc", "Xx", "du")),
            Atom::new("O1", "Xx", Point3::new(0.0, 1.0, 0.0))
                .with_perturbation(pert("Xx", "du", "O", "oh")),
        ];
        Molecule::perturbable("LIG", vec![Residue::with_atoms("LIG", 1, atoms)])
    }

    #[test]
    fn new_molecules_receive_distinct_numbers() {
        let a = Molecule::new("A");
        let b = Molecule::new("B");
        assert_ne!(a.number(), b.number());
    }

    #[test]
    fn clone_preserves_molecule_number() {
        let molecule = create_merged_ligand();
        assert_eq!(molecule.clone().number(), molecule.number());
    }

    #[test]
    fn atom_indexing_flattens_residues() {
        let mut molecule = Molecule::new("PEP");
        molecule.add_residue(Residue::with_atoms(
            "ALA",
            1,
            vec![
                Atom::new("N", "N", Point3::origin()),
                Atom::new("CA", "C", Point3::origin()),
            ],
        ));
        molecule.add_residue(Residue::with_atoms(
            "GLY",
            2,
            vec![Atom::new("N", "N", Point3::new(3.0, 0.0, 0.0))],
        ));

        assert_eq!(molecule.num_residues(), 2);
        assert_eq!(molecule.num_atoms(), 3);
        assert_eq!(molecule.atom(2).unwrap().position, Point3::new(3.0, 0.0, 0.0));
        assert!(molecule.atom(3).is_none());
    }

    #[test]
    fn to_end_state_strips_dummies_for_state_a() {
        let molecule = create_merged_ligand();
        let state_a = molecule.to_end_state(EndState::A).unwrap();

        let names: Vec<_> = state_a.atoms().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["C1", "H1"]);
        assert!(!state_a.is_perturbable());
        assert!(state_a.atoms().all(|a| a.perturbation.is_none()));
        assert_eq!(state_a.atom(1).unwrap().force_field_type, "hc");
        assert_eq!(state_a.atom(0).unwrap().velocity, Some(Vector3::new(0.1, 0.0, 0.0)));
        assert_ne!(state_a.number(), molecule.number());
    }

    #[test]
    fn to_end_state_strips_dummies_for_state_b() {
        let molecule = create_merged_ligand();
        let state_b = molecule.to_end_state(EndState::B).unwrap();

        let names: Vec<_> = state_b.atoms().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["C1", "O1"]);
        assert_eq!(state_b.atom(1).unwrap().element, "O");
    }

    #[test]
    fn to_end_state_drops_residues_left_empty() {
        let mut molecule = create_merged_ligand();
        molecule.add_residue(Residue::with_atoms(
            "GHO",
            2,
            vec![Atom::new("D1", "Xx", Point3::origin()).with_perturbation(pert("Xx", "du", "C", "c3"))],
        ));
        assert_eq!(molecule.to_end_state(EndState::A).unwrap().num_residues(), 1);
        assert_eq!(molecule.to_end_state(EndState::B).unwrap().num_residues(), 2);
    }

    #[test]
    fn to_end_state_fails_without_end_state_properties() {
        let mut molecule = create_merged_ligand();
        molecule.residues_mut()[0].add_atom(Atom::new("X", "C", Point3::origin()));

        let err = molecule.to_end_state(EndState::A).unwrap_err();
        assert_eq!(err.atom_index, 3);
        assert_eq!(err.molecule, "LIG");
    }

    #[test]
    fn single_residue_molecules_are_always_perturbed() {
        let molecule = create_merged_ligand();
        assert_eq!(molecule.residue_is_perturbed(0), Some(true));
        assert_eq!(molecule.residue_is_perturbed(1), None);
        assert!(molecule.decouple().is_decoupled());
    }

    #[test]
    fn deserialized_molecules_receive_fresh_numbers() {
        let molecule = create_merged_ligand();
        let json = serde_json::to_string(&molecule).unwrap();
        let restored: Molecule = serde_json::from_str(&json).unwrap();

        assert_ne!(restored.number(), molecule.number());
        assert!(restored.is_perturbable());
        assert_eq!(restored.num_atoms(), 3);
    }
}
