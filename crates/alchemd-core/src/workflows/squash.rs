use super::WorkflowError;
use crate::core::io::gro::GroFile;
use crate::core::io::json::JsonTopologyFile;
use crate::core::io::traits::MolecularFile;
use crate::core::models::system::MolecularSystem;
use crate::engine::squash::{self, SquashMapping, TopologySplicer};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// A JSON topology, optionally overlaid with the coordinates of a GRO file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemFiles {
    pub topology: PathBuf,
    pub coordinates: Option<PathBuf>,
}

impl SystemFiles {
    pub fn new(topology: impl Into<PathBuf>) -> Self {
        Self {
            topology: topology.into(),
            coordinates: None,
        }
    }

    pub fn with_coordinates(mut self, coordinates: impl Into<PathBuf>) -> Self {
        self.coordinates = Some(coordinates.into());
        self
    }

    pub fn load(&self) -> Result<MolecularSystem, WorkflowError> {
        debug!("Loading topology from {:?}", self.topology);
        let (mut system, ()) = JsonTopologyFile::read_from_path(&self.topology)?;
        if let Some(coordinates) = &self.coordinates {
            debug!("Overlaying coordinates from {:?}", coordinates);
            let mut reader = BufReader::new(File::open(coordinates)?);
            GroFile::read_onto(&mut reader, &mut system)?;
        }
        Ok(system)
    }
}

/// Destination of a written system: a JSON topology and a GRO coordinate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFiles {
    pub topology: PathBuf,
    pub coordinates: PathBuf,
}

impl OutputFiles {
    /// `<dir>/<stem>.json` and `<dir>/<stem>.gro`.
    pub fn in_dir(dir: impl AsRef<Path>, stem: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            topology: dir.join(format!("{stem}.json")),
            coordinates: dir.join(format!("{stem}.gro")),
        }
    }

    pub fn write(&self, system: &MolecularSystem) -> Result<(), WorkflowError> {
        JsonTopologyFile::write_system_to_path(system, &self.topology)?;
        GroFile::write_system_to_path(system, &self.coordinates)?;
        Ok(())
    }
}

pub fn write_mapping(mapping: &SquashMapping, path: impl AsRef<Path>) -> Result<(), WorkflowError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, mapping)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

pub fn read_mapping(path: impl AsRef<Path>) -> Result<SquashMapping, WorkflowError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquashSummary {
    pub merged_molecules: usize,
    pub perturbable_molecules: usize,
    pub squashed_molecules: usize,
    pub squashed_atoms: usize,
}

/// Squashes the system in `input` and writes the squashed system plus the
/// index mapping needed to undo it.
#[instrument(skip_all, name = "squash_workflow")]
pub fn run(
    input: &SystemFiles,
    output: &OutputFiles,
    mapping_path: &Path,
    splicer: &impl TopologySplicer,
) -> Result<SquashSummary, WorkflowError> {
    let system = input.load()?;
    let (squashed, mapping) = squash::squash(&system, splicer)?;

    output.write(&squashed)?;
    write_mapping(&mapping, mapping_path)?;

    let summary = SquashSummary {
        merged_molecules: system.num_molecules(),
        perturbable_molecules: mapping.perturbed_molecules().len(),
        squashed_molecules: squashed.num_molecules(),
        squashed_atoms: squashed.num_atoms(),
    };
    info!(
        topology = %output.topology.display(),
        mapping = %mapping_path.display(),
        squashed_molecules = summary.squashed_molecules,
        "Squashed system written."
    );
    Ok(summary)
}

/// Copies coordinates and velocities from engine output over the squashed
/// layout back onto the merged system and writes the result.
#[instrument(skip_all, name = "unsquash_workflow")]
pub fn run_unsquash(
    merged: &SystemFiles,
    squashed: &SystemFiles,
    mapping_path: &Path,
    output: &OutputFiles,
) -> Result<MolecularSystem, WorkflowError> {
    let system = merged.load()?;
    let engine_output = squashed.load()?;
    let mapping = read_mapping(mapping_path)?;

    let updated = squash::unsquash(&system, &engine_output, &mapping)?;
    output.write(&updated)?;
    info!(
        topology = %output.topology.display(),
        atoms = updated.num_atoms(),
        "Unsquashed system written."
    );
    Ok(updated)
}
