//! Expansion of fixture records into the test matrix
//!
//! Every record is tested once per backend and namespace mode. Cells are produced lazily in a
//! fixed order: fixture files (in discovery order), records (in file order), backends (in
//! registration order) and finally namespace mode, namespaced before plain.
use crate::testing::tree_construction::backend::{BackendRegistry, RegisteredBackend};
use crate::testing::tree_construction::expected_failures::ExpectedFailures;
use crate::testing::tree_construction::fixture::FixtureFile;
use crate::testing::tree_construction::parser::TestRecord;
use std::fmt;

/// Namespace modes in the order they are expanded
pub const NAMESPACE_MODES: [bool; 2] = [true, false];

/// Fixtures that are never expanded. The template fixture needs support for template contents
/// in the tree dumps.
pub const DEFAULT_EXCLUDED_FIXTURES: &[&str] = &["template"];

/// A single invocation of a test: one record, parsed by one backend in one namespace mode
#[derive(Clone, Copy, Debug)]
pub struct MatrixCell<'a> {
    pub file: &'a FixtureFile,
    pub record: &'a TestRecord,
    pub backend: &'a RegisteredBackend,
    pub namespace_mode: bool,
    /// The record's input is registered as an expected failure
    pub expected_to_fail: bool,
    /// The record is marked #script-off, which can't be tested
    pub scripting_disabled: bool,
}

impl<'a> MatrixCell<'a> {
    pub fn id(&self) -> CellId {
        CellId {
            file: self.file.file_name(),
            line: self.record.line,
            backend: self.backend.name().to_string(),
            namespace_mode: self.namespace_mode,
        }
    }
}

/// Identifies a cell in reports
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellId {
    pub file: String,
    pub line: usize,
    pub backend: String,
    pub namespace_mode: bool,
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} [{}, {}]",
            self.file,
            self.line,
            self.backend,
            if self.namespace_mode {
                "namespaced"
            } else {
                "plain"
            }
        )
    }
}

/// The read-only inputs of the matrix. Cells can be enumerated any number of times.
#[derive(Clone, Copy, Debug)]
pub struct MatrixPlan<'a> {
    files: &'a [FixtureFile],
    backends: &'a BackendRegistry,
    expected_failures: &'a ExpectedFailures,
    excluded: &'a [String],
}

impl<'a> MatrixPlan<'a> {
    pub fn new(
        files: &'a [FixtureFile],
        backends: &'a BackendRegistry,
        expected_failures: &'a ExpectedFailures,
        excluded: &'a [String],
    ) -> Self {
        Self {
            files,
            backends,
            expected_failures,
            excluded,
        }
    }

    pub fn backends(&self) -> &'a BackendRegistry {
        self.backends
    }

    pub fn is_excluded(&self, file: &FixtureFile) -> bool {
        self.excluded.iter().any(|name| *name == file.name)
    }

    /// Fixture files that take part in the matrix
    pub fn files(&self) -> impl Iterator<Item = &'a FixtureFile> + '_ {
        self.files.iter().filter(|file| !self.is_excluded(file))
    }

    /// Returns a fresh iterator over all cells
    pub fn cells(&self) -> Cells<'a> {
        Cells {
            plan: *self,
            file: 0,
            record: 0,
            backend: 0,
            mode: 0,
        }
    }

    /// Number of cells, computed without enumerating them
    pub fn len(&self) -> usize {
        let records: usize = self.files().map(|file| file.records.len()).sum();
        records * self.backends.len() * NAMESPACE_MODES.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lazy iterator over the cells of a [`MatrixPlan`]
#[derive(Clone, Debug)]
pub struct Cells<'a> {
    plan: MatrixPlan<'a>,
    file: usize,
    record: usize,
    backend: usize,
    mode: usize,
}

impl<'a> Cells<'a> {
    fn next_file(&mut self) {
        self.file += 1;
        self.record = 0;
        self.backend = 0;
        self.mode = 0;
    }

    fn next_record(&mut self) {
        self.record += 1;
        self.backend = 0;
        self.mode = 0;
    }
}

impl<'a> Iterator for Cells<'a> {
    type Item = MatrixCell<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let file = self.plan.files.get(self.file)?;
            if self.plan.is_excluded(file) {
                self.next_file();
                continue;
            }

            let Some(record) = file.records.get(self.record) else {
                self.next_file();
                continue;
            };

            let Some(backend) = self.plan.backends.get_index(self.backend) else {
                self.next_record();
                continue;
            };

            let Some(&namespace_mode) = NAMESPACE_MODES.get(self.mode) else {
                self.backend += 1;
                self.mode = 0;
                continue;
            };
            self.mode += 1;

            return Some(MatrixCell {
                file,
                record,
                backend,
                namespace_mode,
                expected_to_fail: self.plan.expected_failures.contains(&record.data),
                scripting_disabled: record.scripting_disabled(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::tree_construction::backend::{ParserOptions, TreeBackend, TreeParser};

    struct UnusedBackend;

    impl TreeBackend for UnusedBackend {
        fn create_parser(&self, _options: ParserOptions) -> Box<dyn TreeParser> {
            unreachable!("expansion never creates parsers")
        }
    }

    fn fixture(name: &str, inputs: &[(&str, &str)]) -> FixtureFile {
        let text = inputs
            .iter()
            .map(|(data, flags)| format!("#data\n{data}\n#errors\n{flags}#document\n| <html>\n"))
            .collect::<Vec<_>>()
            .join("\n");

        FixtureFile::parse(format!("{name}.dat"), &text).unwrap()
    }

    fn backends(names: &[&str]) -> BackendRegistry {
        let mut registry = BackendRegistry::new();
        for name in names {
            registry.register(name, UnusedBackend).unwrap();
        }
        registry
    }

    fn excluded() -> Vec<String> {
        DEFAULT_EXCLUDED_FIXTURES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn every_record_is_tested_per_backend_and_mode() {
        let files = vec![
            fixture("tests1", &[("<p>One<b>Two", ""), ("Test", "")]),
            fixture("tests2", &[("<table>", "")]),
        ];
        let backends = backends(&["etree", "dom", "lxml"]);
        let expected = ExpectedFailures::new();
        let excluded = excluded();
        let plan = MatrixPlan::new(&files, &backends, &expected, &excluded);

        let cells = plan.cells().collect::<Vec<_>>();
        assert_eq!(cells.len(), 3 * 3 * 2);
        assert_eq!(plan.len(), cells.len());

        for record in files.iter().flat_map(|f| f.records.iter()) {
            let count = cells
                .iter()
                .filter(|c| std::ptr::eq(c.record, record))
                .count();
            assert_eq!(count, backends.len() * 2);
        }
    }

    #[test]
    fn order_is_deterministic() {
        let files = vec![fixture("tests1", &[("a", ""), ("b", "")])];
        let backends = backends(&["etree", "dom"]);
        let expected = ExpectedFailures::new();
        let excluded = excluded();
        let plan = MatrixPlan::new(&files, &backends, &expected, &excluded);

        let order = plan
            .cells()
            .map(|c| (c.record.data.clone(), c.backend.name().to_string(), c.namespace_mode))
            .collect::<Vec<_>>();

        let expected_order = [
            ("a", "etree", true),
            ("a", "etree", false),
            ("a", "dom", true),
            ("a", "dom", false),
            ("b", "etree", true),
            ("b", "etree", false),
            ("b", "dom", true),
            ("b", "dom", false),
        ]
        .map(|(d, b, n)| (d.to_string(), b.to_string(), n));

        assert_eq!(order, expected_order);

        // A fresh iterator yields the same sequence again
        let again = plan
            .cells()
            .map(|c| (c.record.data.clone(), c.backend.name().to_string(), c.namespace_mode))
            .collect::<Vec<_>>();
        assert_eq!(order, again);
    }

    #[test]
    fn template_fixture_is_excluded() {
        let files = vec![
            fixture("template", &[("<template>", "")]),
            fixture("tests1", &[("Test", "")]),
        ];
        let backends = backends(&["etree"]);
        let expected = ExpectedFailures::new();
        let excluded = excluded();
        let plan = MatrixPlan::new(&files, &backends, &expected, &excluded);

        assert!(plan.cells().all(|c| c.file.name == "tests1"));
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.files().count(), 1);
    }

    #[test]
    fn exclusion_list_is_extensible() {
        let files = vec![
            fixture("tests1", &[("Test", "")]),
            fixture("webkit01", &[("<p>", "")]),
        ];
        let backends = backends(&["etree"]);
        let expected = ExpectedFailures::new();
        let excluded = vec!["template".to_string(), "webkit01".to_string()];
        let plan = MatrixPlan::new(&files, &backends, &expected, &excluded);

        assert_eq!(plan.cells().count(), 2);
    }

    #[test]
    fn script_off_records_are_marked() {
        let files = vec![fixture(
            "webkit02",
            &[("<noscript>", "#script-off\n"), ("<noscript>x", "#script-on\n")],
        )];
        let backends = backends(&["etree"]);
        let expected = ExpectedFailures::new();
        let excluded = excluded();
        let plan = MatrixPlan::new(&files, &backends, &expected, &excluded);

        let cells = plan.cells().collect::<Vec<_>>();
        assert_eq!(cells.len(), 4);
        assert!(cells[..2].iter().all(|c| c.scripting_disabled));
        assert!(cells[2..].iter().all(|c| !c.scripting_disabled));
    }

    #[test]
    fn expected_failures_apply_to_all_backends_and_modes() {
        let files = vec![fixture("tests1", &[("<svg><b>", ""), ("Test", "")])];
        let backends = backends(&["etree", "dom"]);
        let expected: ExpectedFailures = ["<svg><b>".to_string()].into_iter().collect();
        let excluded = excluded();
        let plan = MatrixPlan::new(&files, &backends, &expected, &excluded);

        for cell in plan.cells() {
            assert_eq!(cell.expected_to_fail, cell.record.data == "<svg><b>");
        }
    }

    #[test]
    fn no_backends_means_no_cells() {
        let files = vec![fixture("tests1", &[("Test", "")])];
        let backends = BackendRegistry::new();
        let expected = ExpectedFailures::new();
        let excluded = excluded();
        let plan = MatrixPlan::new(&files, &backends, &expected, &excluded);

        assert_eq!(plan.cells().count(), 0);
        assert!(plan.is_empty());
    }

    #[test]
    fn cell_id_display() {
        let files = vec![fixture("tests1", &[("Test", "")])];
        let backends = backends(&["etree"]);
        let expected = ExpectedFailures::new();
        let excluded = excluded();
        let plan = MatrixPlan::new(&files, &backends, &expected, &excluded);

        let ids = plan.cells().map(|c| c.id().to_string()).collect::<Vec<_>>();
        assert_eq!(
            ids,
            ["tests1.dat:1 [etree, namespaced]", "tests1.dat:1 [etree, plain]"]
        );
    }
}
