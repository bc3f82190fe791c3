use crate::core::io::traits::MolecularFile;
use crate::core::models::system::MolecularSystem;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JsonFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Complete topology in JSON, including end-state properties and molecule flags.
///
/// Molecule numbers are process-local and are not stored; every molecule read
/// back receives a fresh number.
pub struct JsonTopologyFile;

impl MolecularFile for JsonTopologyFile {
    type Metadata = ();
    type Error = JsonFileError;

    fn read_from(
        reader: &mut impl BufRead,
    ) -> Result<(MolecularSystem, Self::Metadata), Self::Error> {
        let system = serde_json::from_reader(reader)?;
        Ok((system, ()))
    }

    fn write_to(
        system: &MolecularSystem,
        _metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        serde_json::to_writer_pretty(&mut *writer, system)?;
        writeln!(writer)?;
        Ok(())
    }

    fn write_system_to(
        system: &MolecularSystem,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        Self::write_to(system, &(), writer)
    }
}
