use crate::testing::tree_construction::parser::{parse_fixture, TestRecord};
use crate::testing::{FIXTURE_ROOT, TREE_CONSTRUCTION_PATH};
use anyhow::Context;
use gosub_shared::types::Result;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Holds all tests as found in the given fixture file
#[derive(Debug, PartialEq)]
pub struct FixtureFile {
    /// All the tests extracted from this fixture file
    pub records: Vec<TestRecord>,
    /// Path to the fixture file
    pub path: PathBuf,
    /// Name of the fixture without extension ("tests1" for tests1.dat)
    pub name: String,
}

impl FixtureFile {
    /// Parses the fixture text. `path` is only used for naming and error reporting.
    pub fn parse(path: impl AsRef<Path>, input: &str) -> Result<Self> {
        let path = path.as_ref();

        let records = parse_fixture(path, input)?
            .into_iter()
            .map(|raw| TestRecord::from_raw(raw, path))
            .collect::<Result<Vec<_>>>()?;

        Ok(FixtureFile {
            records,
            name: fixture_name(path),
            path: path.to_path_buf(),
        })
    }

    /// File name as shown in reports ("tests1.dat")
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }
}

fn fixture_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Reads a given test file and extract all test data
pub fn read_fixture_from_path(path: impl AsRef<Path>) -> Result<FixtureFile> {
    let path = path.as_ref();
    let input = fs::read_to_string(path)
        .with_context(|| format!("failed to read fixture {}", path.display()))?;

    FixtureFile::parse(path, &input)
}

/// Returns true when the fixture at 'path' is a correct fixture file and is allowed to be used
/// according to the list of given filenames. If no filenames are given, all fixtures are used.
fn use_fixture(filenames: &[&str], path: &Path) -> bool {
    if !path.is_file() || path.extension().map_or(true, |ext| ext != "dat") {
        return false;
    }

    filenames.is_empty() || filenames.iter().any(|filename| path.ends_with(filename))
}

/// Returns the root path for the fixtures
#[must_use]
pub fn fixture_root_path() -> PathBuf {
    PathBuf::from(FIXTURE_ROOT).join(TREE_CONSTRUCTION_PATH)
}

/// Read tree construction fixtures from the given root. If no filenames are given, all
/// fixtures are read, otherwise only the fixtures with the given filenames are read. Fixtures
/// are returned sorted by file name, which is the order they are tested in. Subdirectories of
/// the root (like `scripted/`) are not read.
pub fn read_fixtures(root: impl AsRef<Path>, filenames: Option<&[&str]>) -> Result<Vec<FixtureFile>> {
    let root = root.as_ref();
    let filenames = filenames.unwrap_or_default();

    let mut paths = vec![];
    let walker = WalkDir::new(root)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.with_context(|| format!("failed to read fixtures in {}", root.display()))?;

        // Check if the fixture is a correct fixture file and if it's allowed to be used
        if use_fixture(filenames, entry.path()) {
            paths.push(entry.into_path());
        }
    }

    let mut files = vec![];
    for path in paths {
        let file = read_fixture_from_path(&path)?;
        info!("read {} tests from {}", file.records.len(), path.display());
        files.push(file);
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TESTS1: &str = r#"#data
Test
#errors
(1,0): expected-doctype-but-got-chars
#document
| <html>
|   <head>
|   <body>
|     "Test"

#data
<p>One<p>Two
#errors
(1,3): expected-doctype-but-got-start-tag
#document
| <html>
|   <head>
|   <body>
|     <p>
|       "One"
|     <p>
|       "Two"
"#;

    #[test]
    fn parse_fixture_file() {
        let file = FixtureFile::parse("data/tree-construction/tests1.dat", TESTS1).unwrap();

        assert_eq!(file.name, "tests1");
        assert_eq!(file.file_name(), "tests1.dat");
        assert_eq!(file.records.len(), 2);
        assert_eq!(file.records[1].data, "<p>One<p>Two");
        assert_eq!(file.records[1].line, 11);
    }

    #[test]
    fn broken_record_aborts_file() {
        let input = format!("{TESTS1}\n#data\nx\n#errors\n#script-on\n#script-off\n#document\n| <html>\n");

        let err = FixtureFile::parse("webkit02.dat", &input).unwrap_err();
        assert!(err.to_string().starts_with("fixture integrity error in webkit02.dat:"));
    }

    #[test]
    fn missing_fixture_file() {
        let err = read_fixture_from_path("does/not/exist.dat").unwrap_err();
        assert!(err.to_string().contains("failed to read fixture"));
    }
}
