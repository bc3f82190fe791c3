use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::molecule::Molecule;
use crate::core::models::residue::Residue;
use crate::core::models::system::MolecularSystem;
use nalgebra::{Point3, Vector3};
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// GRO files store lengths in nanometres; the model uses Angstroms.
const ANGSTROM_PER_NM: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct GroMetadata {
    pub title: String,
    /// Box vector lengths in Angstroms (rectangular box).
    pub box_vectors: Vector3<f64>,
}

impl Default for GroMetadata {
    fn default() -> Self {
        Self {
            title: "Generated by alchemd".to_string(),
            box_vectors: Vector3::zeros(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GroError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: GroParseErrorKind,
    },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
    #[error("Atom count mismatch: expected {expected}, found {found}")]
    AtomCountMismatch { expected: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum GroParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Line is too short for an atom record (must be at least 44 chars)")]
    LineTooShort,
    #[error("Box line requires at least three values")]
    InvalidBox,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

fn parse_float(line: &str, line_num: usize, start: usize, end: usize) -> Result<f64, GroError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| GroError::Parse {
        line: line_num,
        kind: GroParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

/// One atom record of a GRO file, in Angstrom units.
#[derive(Debug, Clone, PartialEq)]
pub struct GroAtom {
    pub residue_number: isize,
    pub residue_name: String,
    pub atom_name: String,
    pub position: Point3<f64>,
    pub velocity: Option<Vector3<f64>>,
}

/// A single coordinate frame.
#[derive(Debug, Clone, PartialEq)]
pub struct GroFrame {
    pub metadata: GroMetadata,
    pub atoms: Vec<GroAtom>,
}

impl GroFrame {
    /// Whether every atom record carries a velocity.
    pub fn has_velocities(&self) -> bool {
        !self.atoms.is_empty() && self.atoms.iter().all(|a| a.velocity.is_some())
    }

    /// Overlays positions (and velocities, if present) onto `system` in global atom order.
    ///
    /// # Errors
    ///
    /// Returns [`GroError::AtomCountMismatch`] if the frame and the system differ
    /// in atom count; the system is left untouched in that case.
    pub fn apply_to(&self, system: &mut MolecularSystem) -> Result<(), GroError> {
        if self.atoms.len() != system.num_atoms() {
            return Err(GroError::AtomCountMismatch {
                expected: system.num_atoms(),
                found: self.atoms.len(),
            });
        }
        let with_velocities = self.has_velocities();
        for (atom, record) in system.atoms_mut().zip(&self.atoms) {
            atom.position = record.position;
            if with_velocities {
                atom.velocity = record.velocity;
            }
        }
        Ok(())
    }
}

/// Fixed-column GROMACS coordinate file.
pub struct GroFile;

impl GroFile {
    /// Reads a single frame without interpreting molecule boundaries.
    pub fn read_frame(reader: &mut impl BufRead) -> Result<GroFrame, GroError> {
        let mut lines = reader.lines();

        let title = lines
            .next()
            .transpose()?
            .ok_or_else(|| GroError::MissingRecord("title line".into()))?;
        let count_line = lines
            .next()
            .transpose()?
            .ok_or_else(|| GroError::MissingRecord("atom count line".into()))?;
        let count_str = count_line.trim();
        let n_atoms: usize = count_str.parse().map_err(|_| GroError::Parse {
            line: 2,
            kind: GroParseErrorKind::InvalidInt {
                columns: "1-".into(),
                value: count_str.into(),
            },
        })?;

        let mut atoms = Vec::with_capacity(n_atoms);
        for i in 0..n_atoms {
            let line_num = i + 3;
            let line = lines.next().transpose()?.ok_or_else(|| {
                GroError::MissingRecord(format!("atom record {} of {}", i + 1, n_atoms))
            })?;
            if line.len() < 44 {
                return Err(GroError::Parse {
                    line: line_num,
                    kind: GroParseErrorKind::LineTooShort,
                });
            }

            let res_num_str = slice_and_trim(&line, 0, 5);
            let residue_number: isize = res_num_str.parse().map_err(|_| GroError::Parse {
                line: line_num,
                kind: GroParseErrorKind::InvalidInt {
                    columns: "1-5".into(),
                    value: res_num_str.into(),
                },
            })?;
            let x = parse_float(&line, line_num, 20, 28)?;
            let y = parse_float(&line, line_num, 28, 36)?;
            let z = parse_float(&line, line_num, 36, 44)?;

            let velocity = if line.trim_end().len() >= 68 {
                let vx = parse_float(&line, line_num, 44, 52)?;
                let vy = parse_float(&line, line_num, 52, 60)?;
                let vz = parse_float(&line, line_num, 60, 68)?;
                Some(Vector3::new(vx, vy, vz) * ANGSTROM_PER_NM)
            } else {
                None
            };

            atoms.push(GroAtom {
                residue_number,
                residue_name: slice_and_trim(&line, 5, 10).to_string(),
                atom_name: slice_and_trim(&line, 10, 15).to_string(),
                position: Point3::new(x, y, z) * ANGSTROM_PER_NM,
                velocity,
            });
        }

        let box_line = lines
            .next()
            .transpose()?
            .ok_or_else(|| GroError::MissingRecord("box line".into()))?;
        let box_values: Vec<f64> = box_line
            .split_whitespace()
            .take(3)
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| GroError::Parse {
                line: n_atoms + 3,
                kind: GroParseErrorKind::InvalidBox,
            })?;
        if box_values.len() < 3 {
            return Err(GroError::Parse {
                line: n_atoms + 3,
                kind: GroParseErrorKind::InvalidBox,
            });
        }

        Ok(GroFrame {
            metadata: GroMetadata {
                title,
                box_vectors: Vector3::new(box_values[0], box_values[1], box_values[2])
                    * ANGSTROM_PER_NM,
            },
            atoms,
        })
    }

    /// Reads a frame and overlays it onto `system`.
    pub fn read_onto(
        reader: &mut impl BufRead,
        system: &mut MolecularSystem,
    ) -> Result<GroMetadata, GroError> {
        let frame = Self::read_frame(reader)?;
        frame.apply_to(system)?;
        Ok(frame.metadata)
    }
}

fn element_from_name(name: &str) -> String {
    name.chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_default()
}

impl MolecularFile for GroFile {
    type Metadata = GroMetadata;
    type Error = GroError;

    /// GRO files carry no molecule boundaries: every residue becomes its own molecule.
    fn read_from(
        reader: &mut impl BufRead,
    ) -> Result<(MolecularSystem, Self::Metadata), Self::Error> {
        let frame = Self::read_frame(reader)?;

        let mut system = MolecularSystem::new();
        let mut current: Option<Residue> = None;
        for record in frame.atoms {
            let starts_new = current.as_ref().is_none_or(|r| {
                r.number != record.residue_number || r.name != record.residue_name
            });
            if starts_new {
                if let Some(residue) = current.take() {
                    system.push(Molecule::with_residues(&residue.name.clone(), vec![residue]));
                }
                current = Some(Residue::new(&record.residue_name, record.residue_number));
            }
            let mut atom = Atom::new(
                &record.atom_name,
                &element_from_name(&record.atom_name),
                record.position,
            );
            atom.velocity = record.velocity;
            if let Some(residue) = current.as_mut() {
                residue.add_atom(atom);
            }
        }
        if let Some(residue) = current.take() {
            system.push(Molecule::with_residues(&residue.name.clone(), vec![residue]));
        }

        Ok((system, frame.metadata))
    }

    fn write_to(
        system: &MolecularSystem,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        writeln!(writer, "{}", metadata.title)?;
        writeln!(writer, "{:>5}", system.num_atoms())?;

        let with_velocities =
            system.num_atoms() > 0 && system.atoms().all(|a| a.velocity.is_some());
        let mut serial = 0usize;
        for molecule in system.molecules() {
            for residue in molecule.residues() {
                let res_name: String = residue.name.chars().take(5).collect();
                for atom in residue.atoms() {
                    serial += 1;
                    let atom_name: String = atom.name.chars().take(5).collect();
                    let p = atom.position / ANGSTROM_PER_NM;
                    write!(
                        writer,
                        "{:>5}{:<5}{:>5}{:>5}{:>8.3}{:>8.3}{:>8.3}",
                        residue.number.rem_euclid(100_000),
                        res_name,
                        atom_name,
                        serial % 100_000,
                        p.x,
                        p.y,
                        p.z
                    )?;
                    if let (true, Some(v)) = (with_velocities, atom.velocity) {
                        let v = v / ANGSTROM_PER_NM;
                        write!(writer, "{:>8.4}{:>8.4}{:>8.4}", v.x, v.y, v.z)?;
                    }
                    writeln!(writer)?;
                }
            }
        }

        let b = metadata.box_vectors / ANGSTROM_PER_NM;
        writeln!(writer, "{:>10.5}{:>10.5}{:>10.5}", b.x, b.y, b.z)?;
        Ok(())
    }

    fn write_system_to(
        system: &MolecularSystem,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let mut min = Vector3::repeat(f64::INFINITY);
        let mut max = Vector3::repeat(f64::NEG_INFINITY);
        for atom in system.atoms() {
            min = min.inf(&atom.position.coords);
            max = max.sup(&atom.position.coords);
        }
        let box_vectors = if system.num_atoms() > 0 {
            max - min
        } else {
            Vector3::zeros()
        };
        let metadata = GroMetadata {
            box_vectors,
            ..Default::default()
        };
        Self::write_to(system, &metadata, writer)
    }
}
