//! Error type shared by every stage of the solution → compile database
//! pipeline.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The path could not be made absolute, usually because it does not exist.
    #[error("invalid path '{}': {source}", path.display())]
    InvalidPath {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "unsupported file format '{extension}' for '{}', only .sln and .vcxproj are supported",
        path.display()
    )]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("no .vcxproj references found in solution '{}'", path.display())]
    NoProjectsFound { path: PathBuf },

    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse '{}': {source}", path.display())]
    ParseError {
        path: PathBuf,
        source: roxmltree::Error,
    },

    #[error("{}: no <ProjectConfiguration> entries declared", project.display())]
    NoConfigurationsDeclared { project: PathBuf },

    #[error(
        "{}: configuration '{requested}' not found, declared configurations: [{}]",
        project.display(),
        declared.join(", ")
    )]
    ConfigurationNotFound {
        project: PathBuf,
        requested: String,
        declared: Vec<String>,
    },

    #[error("failed to serialize compile commands: {0}")]
    SerializationError(#[from] serde_json::Error),
}
