//! Splicing of the two end states of a multi-residue molecule into one molecule.

use super::error::SquashError;
use super::mask::AtomMask;
use crate::core::io::gro::GroFile;
use crate::core::io::json::JsonTopologyFile;
use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::EndState;
use crate::core::models::molecule::Molecule;
use crate::core::models::residue::Residue;
use crate::core::models::system::MolecularSystem;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, trace};

/// Atom selections over the combined `[state A, state B]` system.
///
/// Indices are 0-based positions in the combined system, so every state B index
/// is offset by the atom count of the state A molecule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpliceMasks {
    /// Every atom of the state A molecule.
    pub molecule_a: AtomMask,
    /// Every atom of the state B molecule.
    pub molecule_b: AtomMask,
    /// Atoms of perturbed residues in the state A molecule.
    pub perturbed_a: AtomMask,
    /// Atoms of perturbed residues in the state B molecule.
    pub perturbed_b: AtomMask,
}

impl SpliceMasks {
    /// Builds the masks of a merged molecule from its per-residue perturbation flags.
    pub fn for_molecule(molecule: &Molecule, perturbed: &[bool]) -> Self {
        let mut n_a = 0;
        let mut n_b = 0;
        let mut perturbed_a = Vec::new();
        let mut perturbed_b = Vec::new();

        for (residue, &is_perturbed) in molecule.residues().iter().zip(perturbed) {
            for atom in residue.atoms() {
                if atom.is_dummy_in(EndState::A) == Some(false) {
                    if is_perturbed {
                        perturbed_a.push(n_a);
                    }
                    n_a += 1;
                }
                if atom.is_dummy_in(EndState::B) == Some(false) {
                    if is_perturbed {
                        perturbed_b.push(n_b);
                    }
                    n_b += 1;
                }
            }
        }

        Self {
            molecule_a: AtomMask::range(0, n_a),
            molecule_b: AtomMask::range(n_a, n_a + n_b),
            perturbed_a: AtomMask::new(perturbed_a),
            perturbed_b: perturbed_b.into_iter().map(|i| n_a + i).collect(),
        }
    }

    /// Number of atoms in the spliced molecule.
    pub fn spliced_atom_count(&self) -> usize {
        self.molecule_a.len() + self.perturbed_b.len()
    }

    fn highest_index(&self) -> Option<usize> {
        [
            &self.molecule_a,
            &self.molecule_b,
            &self.perturbed_a,
            &self.perturbed_b,
        ]
        .iter()
        .filter_map(|m| m.indices().last().copied())
        .max()
    }
}

/// Merges the two single-state copies of a molecule into one molecule.
///
/// The result contains the complete state A molecule followed by the state B
/// atoms of the perturbed residues.
pub trait TopologySplicer {
    fn splice(
        &self,
        combined: &MolecularSystem,
        masks: &SpliceMasks,
    ) -> Result<Molecule, SquashError>;
}

/// In-memory splicer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeSplicer;

impl TopologySplicer for NativeSplicer {
    fn splice(
        &self,
        combined: &MolecularSystem,
        masks: &SpliceMasks,
    ) -> Result<Molecule, SquashError> {
        let n_atoms = combined.num_atoms();
        if let Some(highest) = masks.highest_index() {
            if highest >= n_atoms {
                return Err(SquashError::Splice(format!(
                    "mask index {} exceeds the {} atoms of the combined system",
                    highest + 1,
                    n_atoms
                )));
            }
        }
        let name = combined
            .molecule(0)
            .map(|m| m.name.clone())
            .ok_or_else(|| SquashError::Splice("combined system is empty".into()))?;

        let mut residues = Vec::new();
        let mut global = 0;
        for molecule in combined.molecules() {
            for residue in molecule.residues() {
                let atoms: Vec<_> = residue
                    .atoms()
                    .iter()
                    .enumerate()
                    .filter(|(k, _)| {
                        let i = global + k;
                        masks.molecule_a.contains(i) || masks.perturbed_b.contains(i)
                    })
                    .map(|(_, atom)| atom.clone())
                    .collect();
                global += residue.num_atoms();
                if !atoms.is_empty() {
                    residues.push(Residue::with_atoms(&residue.name, residue.number, atoms));
                }
            }
        }

        trace!(residues = residues.len(), "Spliced end states in memory.");
        Ok(Molecule::with_residues(&name, residues))
    }
}

pub const SPLICE_INPUT_TOPOLOGY: &str = "input.json";
pub const SPLICE_INPUT_COORDINATES: &str = "input.gro";
pub const SPLICE_OUTPUT_TOPOLOGY: &str = "squashed.json";
pub const SPLICE_OUTPUT_COORDINATES: &str = "squashed.gro";

/// Delegates splicing to an external program through a scratch directory.
///
/// The combined system is written as `input.json` and `input.gro` into a fresh
/// temporary directory, and the program is invoked as
/// `<program> [args...] <dir> <molecule_a> <molecule_b> <perturbed_a> <perturbed_b>`
/// with the masks in `@1-23,34-47` syntax. It must leave the spliced molecule in
/// `squashed.json`; coordinates in `squashed.gro` override those of the JSON file
/// when present. The directory is removed when the call returns, whatever the
/// outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalSplicer {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalSplicer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Leading arguments passed before the working directory.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn read_output(dir: &Path) -> Result<MolecularSystem, SquashError> {
        let topology = dir.join(SPLICE_OUTPUT_TOPOLOGY);
        if !topology.exists() {
            return Err(SquashError::Splice(format!(
                "external splicer did not produce '{}'",
                SPLICE_OUTPUT_TOPOLOGY
            )));
        }
        let (mut system, ()) = JsonTopologyFile::read_from_path(&topology)?;

        let coordinates = dir.join(SPLICE_OUTPUT_COORDINATES);
        if coordinates.exists() {
            let mut reader = BufReader::new(File::open(&coordinates)?);
            GroFile::read_onto(&mut reader, &mut system)?;
        }
        Ok(system)
    }
}

impl TopologySplicer for ExternalSplicer {
    fn splice(
        &self,
        combined: &MolecularSystem,
        masks: &SpliceMasks,
    ) -> Result<Molecule, SquashError> {
        let workdir = tempfile::tempdir()?;
        let dir = workdir.path();

        JsonTopologyFile::write_system_to_path(combined, dir.join(SPLICE_INPUT_TOPOLOGY))?;
        GroFile::write_system_to_path(combined, dir.join(SPLICE_INPUT_COORDINATES))?;

        debug!(
            program = %self.program.display(),
            molecule_a = %masks.molecule_a,
            molecule_b = %masks.molecule_b,
            perturbed_a = %masks.perturbed_a,
            perturbed_b = %masks.perturbed_b,
            "Invoking external splicer."
        );
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(dir)
            .arg(masks.molecule_a.to_string())
            .arg(masks.molecule_b.to_string())
            .arg(masks.perturbed_a.to_string())
            .arg(masks.perturbed_b.to_string())
            .current_dir(dir)
            .output()?;

        if !output.status.success() {
            return Err(SquashError::Splice(format!(
                "'{}' exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut molecules = Self::read_output(dir)?.into_molecules();
        if molecules.len() != 1 {
            return Err(SquashError::Splice(format!(
                "expected one spliced molecule, found {}",
                molecules.len()
            )));
        }
        Ok(molecules.remove(0))
    }
}
