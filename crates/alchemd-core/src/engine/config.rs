use super::squash::{ExternalSplicer, NativeSplicer, SpliceMasks, SquashError, TopologySplicer};
use crate::core::models::molecule::Molecule;
use crate::core::models::system::MolecularSystem;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

/// Selects how multi-residue perturbable molecules are spliced during squashing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SplicerConfig {
    /// Splice in memory.
    #[default]
    Native,
    /// Hand the end states to an external program.
    External { program: PathBuf, args: Vec<String> },
}

impl SplicerConfig {
    pub fn external(program: impl Into<PathBuf>) -> Self {
        SplicerConfig::External {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, SplicerConfig::Native)
    }
}

impl TopologySplicer for SplicerConfig {
    fn splice(
        &self,
        combined: &MolecularSystem,
        masks: &SpliceMasks,
    ) -> Result<Molecule, SquashError> {
        match self {
            SplicerConfig::Native => NativeSplicer.splice(combined, masks),
            SplicerConfig::External { program, args } => ExternalSplicer::new(program)
                .with_args(args.iter().cloned())
                .splice(combined, masks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_splicer_is_native() {
        assert!(SplicerConfig::default().is_native());
        assert!(!SplicerConfig::external("splice-tool").is_native());
    }

    #[test]
    fn config_error_messages_name_the_parameter() {
        let err = ConfigError::MissingParameter("temperature");
        assert_eq!(err.to_string(), "Missing required parameter: temperature");
        let err = ConfigError::InvalidValue {
            parameter: "anchors",
            reason: "duplicate atom".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value for parameter 'anchors': duplicate atom"
        );
    }
}
