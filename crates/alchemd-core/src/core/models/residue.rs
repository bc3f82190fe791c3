use super::atom::{Atom, EndState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Residue {
    pub name: String,          // Name of the residue (e.g., "ALA", "LIG")
    pub number: isize,         // Residue sequence number from the source topology
    pub(crate) atoms: Vec<Atom>, // Atoms in topology order
}

impl Residue {
    pub fn new(name: &str, number: isize) -> Self {
        Self {
            name: name.to_string(),
            number,
            atoms: Vec::new(),
        }
    }

    pub fn with_atoms(name: &str, number: isize, atoms: Vec<Atom>) -> Self {
        Self {
            name: name.to_string(),
            number,
            atoms,
        }
    }

    pub fn add_atom(&mut self, atom: Atom) {
        self.atoms.push(atom);
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut [Atom] {
        &mut self.atoms
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Ordered element symbols of the residue in `state`.
    ///
    /// Returns `None` if any atom lacks end-state properties.
    pub fn elements_in(&self, state: EndState) -> Option<Vec<&str>> {
        self.atoms
            .iter()
            .map(|atom| atom.end_state(state).map(|p| p.element.as_str()))
            .collect()
    }

    /// Returns whether the ordered element list differs between the two end states.
    ///
    /// Returns `None` if any atom lacks end-state properties.
    pub fn is_perturbed(&self) -> Option<bool> {
        Some(self.elements_in(EndState::A)? != self.elements_in(EndState::B)?)
    }
}
