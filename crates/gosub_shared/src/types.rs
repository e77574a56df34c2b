//! Error results that can be returned from the harness

use std::path::PathBuf;
use thiserror::Error;

/// Serious errors and errors from third-party libraries
#[derive(Debug, Error)]
pub enum Error {
    /// The fixture corpus itself is broken. This is never attributable to a single test.
    #[error("fixture integrity error in {}:{line}: {message}", path.display())]
    FixtureIntegrity {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    IO(#[from] std::io::Error),

    #[error("json parsing error: {0}")]
    JsonSerde(#[from] serde_json::Error),

    #[error("unknown tree backend: {0}")]
    UnknownBackend(String),

    #[error("test error: {0}")]
    Test(String),
}

impl Error {
    /// Returns true when this error means the fixture corpus could not be trusted
    #[must_use]
    pub fn is_fixture_integrity(&self) -> bool {
        matches!(self, Self::FixtureIntegrity { .. })
    }
}

/// Result that can be returned which holds either T or an Error
pub type Result<T> = std::result::Result<T, anyhow::Error>;
