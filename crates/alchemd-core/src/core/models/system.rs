use super::atom::Atom;
use super::molecule::{MolNum, Molecule};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Identifies an atom by the molecule that owns it and its index within that molecule.
///
/// Because molecule numbers survive cloning, a reference taken on one system
/// remains valid on any copy of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomRef {
    /// Number of the owning molecule.
    pub molecule: MolNum,
    /// Index of the atom within the molecule, in residue order.
    pub index: usize,
}

impl AtomRef {
    pub fn new(molecule: MolNum, index: usize) -> Self {
        Self { molecule, index }
    }
}

/// An ordered collection of molecules.
///
/// Molecule order is stable unless explicitly changed through
/// [`remove_molecules`](Self::remove_molecules), [`replace_molecule`](Self::replace_molecule)
/// or concatenation. Global atom indices run over molecules in this order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MolecularSystem {
    molecules: Vec<Molecule>,
}

impl MolecularSystem {
    /// Creates a new, empty molecular system.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_molecules(molecules: Vec<Molecule>) -> Self {
        Self { molecules }
    }

    pub fn molecules(&self) -> &[Molecule] {
        &self.molecules
    }

    pub fn into_molecules(self) -> Vec<Molecule> {
        self.molecules
    }

    /// Retrieves a molecule by its position in the system.
    pub fn molecule(&self, index: usize) -> Option<&Molecule> {
        self.molecules.get(index)
    }

    pub fn molecule_mut(&mut self, index: usize) -> Option<&mut Molecule> {
        self.molecules.get_mut(index)
    }

    pub fn num_molecules(&self) -> usize {
        self.molecules.len()
    }

    pub fn num_atoms(&self) -> usize {
        self.molecules.iter().map(Molecule::num_atoms).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    /// Iterates over all atoms in global index order.
    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.molecules.iter().flat_map(|m| m.atoms())
    }

    pub fn atoms_mut(&mut self) -> impl Iterator<Item = &mut Atom> {
        self.molecules.iter_mut().flat_map(|m| m.atoms_mut())
    }

    /// Returns the position of the molecule with the given number.
    pub fn index_of(&self, number: MolNum) -> Option<usize> {
        self.molecules.iter().position(|m| m.number() == number)
    }

    pub fn contains(&self, molecule: &Molecule) -> bool {
        self.index_of(molecule.number()).is_some()
    }

    pub fn contains_atom(&self, atom: &AtomRef) -> bool {
        self.atom(atom).is_some()
    }

    /// Appends a molecule at the end of the system.
    pub fn push(&mut self, molecule: Molecule) {
        self.molecules.push(molecule);
    }

    /// Appends every molecule of `other`, preserving its order.
    pub fn extend(&mut self, other: MolecularSystem) {
        self.molecules.extend(other.molecules);
    }

    /// Removes every molecule whose number is listed, preserving the order of the rest.
    ///
    /// Returns the removed molecules in their former order.
    pub fn remove_molecules(&mut self, numbers: &[MolNum]) -> Vec<Molecule> {
        let (removed, kept): (Vec<Molecule>, Vec<Molecule>) = std::mem::take(&mut self.molecules)
            .into_iter()
            .partition(|m| numbers.contains(&m.number()));
        self.molecules = kept;
        removed
    }

    /// Replaces the molecule at `index`, returning the previous one.
    ///
    /// Returns `None` and leaves the system untouched if `index` is out of range.
    pub fn replace_molecule(&mut self, index: usize, molecule: Molecule) -> Option<Molecule> {
        let slot = self.molecules.get_mut(index)?;
        Some(std::mem::replace(slot, molecule))
    }

    /// Global index of the first atom of each molecule.
    pub fn atom_offsets(&self) -> Vec<usize> {
        self.molecules
            .iter()
            .scan(0, |offset, m| {
                let start = *offset;
                *offset += m.num_atoms();
                Some(start)
            })
            .collect()
    }

    /// Resolves an atom reference to its global, 0-based atom index.
    pub fn atom_index(&self, atom: &AtomRef) -> Option<usize> {
        let mut offset = 0;
        for molecule in &self.molecules {
            if molecule.number() == atom.molecule {
                return (atom.index < molecule.num_atoms()).then_some(offset + atom.index);
            }
            offset += molecule.num_atoms();
        }
        None
    }

    /// Builds an atom reference from a global, 0-based atom index.
    pub fn atom_ref(&self, global_index: usize) -> Option<AtomRef> {
        let mut offset = 0;
        for molecule in &self.molecules {
            let n_atoms = molecule.num_atoms();
            if global_index < offset + n_atoms {
                return Some(AtomRef::new(molecule.number(), global_index - offset));
            }
            offset += n_atoms;
        }
        None
    }

    pub fn atom(&self, atom: &AtomRef) -> Option<&Atom> {
        self.molecules
            .iter()
            .find(|m| m.number() == atom.molecule)
            .and_then(|m| m.atom(atom.index))
    }

    pub fn atom_by_index(&self, global_index: usize) -> Option<&Atom> {
        self.atoms().nth(global_index)
    }

    /// Indices of all perturbable molecules, in system order.
    pub fn perturbable_indices(&self) -> Vec<usize> {
        self.molecules
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_perturbable())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn perturbable_molecules(&self) -> impl Iterator<Item = &Molecule> {
        self.molecules.iter().filter(|m| m.is_perturbable())
    }

    pub fn decoupled_molecules(&self) -> Vec<&Molecule> {
        self.molecules.iter().filter(|m| m.is_decoupled()).collect()
    }
}

impl From<Molecule> for MolecularSystem {
    fn from(molecule: Molecule) -> Self {
        Self::from_molecules(vec![molecule])
    }
}

impl Add for MolecularSystem {
    type Output = MolecularSystem;

    fn add(mut self, rhs: MolecularSystem) -> Self::Output {
        self.extend(rhs);
        self
    }
}

impl AddAssign for MolecularSystem {
    fn add_assign(&mut self, rhs: MolecularSystem) {
        self.extend(rhs);
    }
}
