use crate::testing::tree_construction::compare::ComparatorConfig;
use crate::testing::tree_construction::fixture::fixture_root_path;
use crate::testing::tree_construction::matrix::DEFAULT_EXCLUDED_FIXTURES;
use crate::testing::EXPECTED_FAILURES_PATH;
use anyhow::Context;
use gosub_shared::types::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration of a conformance run. Every field is optional in the json file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Directory with the tree-construction fixtures (*.dat)
    pub fixture_root: PathBuf,
    /// Fixture file listing inputs that are expected to fail. A missing file is ignored.
    pub expected_failures: Option<PathBuf>,
    /// Fixture names (without .dat) that are never tested
    pub excluded_fixtures: Vec<String>,
    /// Also compare the number of parse errors
    pub check_parse_errors: bool,
    /// Number of worker threads
    pub threads: usize,
    /// Names of the backends to test. Empty means all registered backends.
    pub backends: Vec<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            fixture_root: fixture_root_path(),
            expected_failures: Some(PathBuf::from(EXPECTED_FAILURES_PATH)),
            excluded_fixtures: DEFAULT_EXCLUDED_FIXTURES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            check_parse_errors: false,
            threads: 1,
            backends: vec![],
        }
    }
}

impl HarnessConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: HarnessConfig = serde_json::from_str(json).map_err(Error::JsonSerde)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;

        Self::from_json_str(&json).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(Error::Config("threads must be at least 1".into()).into());
        }

        Ok(())
    }

    pub fn comparator_config(&self) -> ComparatorConfig {
        ComparatorConfig {
            check_parse_errors: self.check_parse_errors,
        }
    }
}
