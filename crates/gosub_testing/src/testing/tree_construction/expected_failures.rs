//! Inputs that are known to currently fail
//!
//! The registry uses the fixture format, but only the `#data` section of every record is used.
//! Every test whose input equals one of these strings is expected to fail, for every backend
//! and namespace mode.
use crate::testing::tree_construction::parser::parse_fixture;
use anyhow::Context;
use gosub_shared::types::Result;
use log::info;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpectedFailures {
    inputs: HashSet<String>,
}

impl ExpectedFailures {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the registry text. `path` is only used for error reporting.
    pub fn parse(path: impl AsRef<Path>, input: &str) -> Result<Self> {
        let records = parse_fixture(path.as_ref(), input)?;

        Ok(records.iter().map(|r| r.data().to_string()).collect())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = fs::read_to_string(path)
            .with_context(|| format!("failed to read expected failures {}", path.display()))?;

        let expected = Self::parse(path, &input)?;
        info!(
            "loaded {} expected failures from {}",
            expected.len(),
            path.display()
        );

        Ok(expected)
    }

    /// Like [`ExpectedFailures::load`], but a missing file results in an empty registry
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("no expected failures found at {}", path.display());
            return Ok(Self::default());
        }

        Self::load(path)
    }

    pub fn contains(&self, data: &str) -> bool {
        self.inputs.contains(data)
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

impl FromIterator<String> for ExpectedFailures {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self {
            inputs: iter.into_iter().collect(),
        }
    }
}
