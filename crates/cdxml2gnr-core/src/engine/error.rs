use thiserror::Error;

use super::config::ConfigError;
use crate::core::io::cdxml::CdxmlError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No CDXML file among the uploaded files: {file_names:?}")]
    UnsupportedFormat { file_names: Vec<String> },

    #[error("Document contains no molecular fragments")]
    NoFragmentsFound,

    #[error("Failed to parse fragment {index}: {source}")]
    ParseFailure {
        index: usize,
        #[source]
        source: CdxmlError,
    },

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Selection {index} is out of range ({available} molecules available)")]
    InvalidSelection { index: usize, available: usize },

    #[error("No molecule is selected")]
    NoSelection,

    #[error("Atom index {index} is out of range for a structure of {len} atoms")]
    AtomIndexOutOfRange { index: usize, len: usize },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
