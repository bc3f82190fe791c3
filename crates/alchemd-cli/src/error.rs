use alchemd::engine::restraint::{RestraintError, RestraintFileError};
use alchemd::workflows::WorkflowError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] WorkflowError),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<RestraintError> for CliError {
    fn from(e: RestraintError) -> Self {
        CliError::Core(e.into())
    }
}

impl CliError {
    pub fn file_parsing(path: impl Into<PathBuf>, source: RestraintFileError) -> Self {
        CliError::FileParsing {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Process exit code: 2 for features that are not implemented, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Core(WorkflowError::Restraint(e)) if e.is_not_implemented() => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_implemented_restraints_exit_with_two() {
        let err: CliError = RestraintError::UnsupportedEngine("amber".to_string()).into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("amber"));

        let err: CliError = RestraintError::ZeroBondForceConstant.into();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn file_parsing_names_the_path() {
        let source = RestraintFileError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = CliError::file_parsing("restraint.toml", source);
        assert!(err.to_string().starts_with("Failed to parse file 'restraint.toml'"));
        assert_eq!(err.exit_code(), 1);
    }
}
