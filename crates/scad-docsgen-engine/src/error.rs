use std::path::PathBuf;

use scad_docsgen_config::ConfigError;

use crate::model::Origin;
use crate::report::Severity;

/// Every recoverable or fatal condition the engine can report.
#[derive(Debug, thiserror::Error)]
pub enum DocsGenError {
    /// A malformed or misplaced block.
    #[error("{message} \"{block}\"")]
    Structural { block: String, message: String },

    /// A link or See Also name that resolves to no declared item.
    #[error("Invalid Link {link}")]
    Reference { link: String },

    /// A second declaration of an already registered item name.
    #[error("Previous declaration of `{name}` at {previous}, Redeclared: \"{block}\"")]
    DuplicateDeclaration {
        block: String,
        name: String,
        previous: Origin,
    },

    /// The external renderer failed, timed out or complained.
    #[error("{0}")]
    Render(String),

    #[error("Corrupt hashes file {path}: {detail}. Ignoring.")]
    CacheCorruption { path: PathBuf, detail: String },

    #[error("Unknown target profile \"{0}\"")]
    UnknownTarget(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DocsGenError {
    pub fn structural(block: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Structural {
            block: block.into(),
            message: message.into(),
        }
    }

    /// The severity this error is recorded with in the error log.
    pub fn severity(&self) -> Severity {
        match self {
            Self::CacheCorruption { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

pub type Result<T, E = DocsGenError> = std::result::Result<T, E>;
