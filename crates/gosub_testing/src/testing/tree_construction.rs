pub mod backend;
pub mod compare;
pub mod diagnostics;
pub mod expected_failures;
pub mod fixture;
pub mod matrix;
pub(crate) mod parser;
pub mod result;
pub mod runner;

use crate::testing::config::HarnessConfig;
use backend::BackendRegistry;
use compare::{Comparator, ComparatorConfig};
use diagnostics::ErrorMessages;
use expected_failures::ExpectedFailures;
use fixture::{read_fixtures, FixtureFile};
use gosub_shared::types::Result;
use log::{debug, info, warn};
use matrix::{MatrixCell, MatrixPlan};
use parking_lot::Mutex;
use result::{CellResult, Failure, FailureKind, Outcome, RunSummary, SkipReason};
use std::panic;
use std::sync::Arc;
use std::thread;

pub use parser::{ScriptMode, TestRecord};

/// Harness runs the cells of the tree-construction matrix and classifies their outcome
pub struct Harness {
    comparator: Comparator,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(ComparatorConfig::default())
    }
}

impl Harness {
    #[must_use]
    pub fn new(config: ComparatorConfig) -> Self {
        Self {
            comparator: Comparator::new(config),
        }
    }

    #[must_use]
    pub fn with_error_messages(mut self, messages: Arc<dyn ErrorMessages>) -> Self {
        self.comparator = self.comparator.with_error_messages(messages);
        self
    }

    /// Runs a single cell and returns its outcome. Never panics on backend failures.
    pub fn run_cell(&self, cell: &MatrixCell) -> Outcome {
        if cell.scripting_disabled {
            return Outcome::Skip(SkipReason::ScriptingDisabled);
        }

        match (self.check(cell), cell.expected_to_fail) {
            (Ok(Some(reason)), _) => Outcome::Skip(reason),
            (Ok(None), false) => Outcome::Pass,
            (Ok(None), true) => Outcome::UnexpectedPass,
            (Err(failure), false) => Outcome::Fail(failure),
            (Err(failure), true) => Outcome::ExpectedFail(failure),
        }
    }

    /// Parses and compares the cell. Returns a skip reason when the output can't be compared.
    fn check(&self, cell: &MatrixCell) -> std::result::Result<Option<SkipReason>, Failure> {
        let invocation = runner::invoke(cell)?;

        let unexpected = invocation
            .warnings
            .iter()
            .filter(|w| !w.is_data_loss())
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        if !unexpected.is_empty() {
            return Err(Failure::new(
                FailureKind::UnexpectedWarning,
                format!(
                    "Input:\n{}\n\nWarnings:\n{}",
                    cell.record.data,
                    unexpected.join("\n")
                ),
            ));
        }

        // Data loss warnings mean the tree can't represent the input, so there is nothing to compare
        if !invocation.warnings.is_empty() {
            return Ok(Some(SkipReason::DiagnosticEmitted));
        }

        self.comparator
            .compare(cell.record, cell.namespace_mode, &invocation)?;

        Ok(None)
    }

    fn run_result(&self, cell: &MatrixCell) -> CellResult {
        let result = CellResult {
            id: cell.id(),
            outcome: self.run_cell(cell),
        };

        match &result.outcome {
            Outcome::Fail(failure) => warn!("{}: {}", result.id, failure),
            Outcome::UnexpectedPass => warn!("{}: expected to fail, but passed", result.id),
            outcome => debug!("{}: {}", result.id, outcome),
        }

        result
    }

    /// Runs all cells of the plan, one after another
    pub fn run_matrix(&self, plan: &MatrixPlan) -> RunSummary {
        let mut summary = RunSummary::default();
        for cell in plan.cells() {
            summary.record(self.run_result(&cell));
        }

        summary
    }

    /// Runs all cells of the plan on `threads` worker threads. Results are reported in the same
    /// order as [`Harness::run_matrix`] would report them.
    pub fn run_matrix_parallel(&self, plan: &MatrixPlan, threads: usize) -> RunSummary {
        if threads <= 1 {
            return self.run_matrix(plan);
        }

        let cells = Mutex::new(plan.cells().enumerate());
        let cells = &cells;
        let mut results = thread::scope(|s| {
            let workers = (0..threads)
                .map(|_| {
                    s.spawn(move || {
                        let mut done = vec![];
                        loop {
                            let Some((idx, cell)) = cells.lock().next() else {
                                break;
                            };
                            done.push((idx, self.run_result(&cell)));
                        }
                        done
                    })
                })
                .collect::<Vec<_>>();

            workers
                .into_iter()
                .flat_map(|worker| {
                    worker
                        .join()
                        .unwrap_or_else(|payload| panic::resume_unwind(payload))
                })
                .collect::<Vec<_>>()
        });

        results.sort_by_key(|(idx, _)| *idx);

        let mut summary = RunSummary::default();
        for (_, result) in results {
            summary.record(result);
        }

        summary
    }
}

/// The fixtures and expected failures a run is based on
#[derive(Debug)]
pub struct Corpus {
    pub files: Vec<FixtureFile>,
    pub expected_failures: ExpectedFailures,
}

impl Corpus {
    /// Loads all fixtures and the expected failures as configured. A broken fixture aborts
    /// loading altogether.
    pub fn load(config: &HarnessConfig) -> Result<Self> {
        let files = read_fixtures(&config.fixture_root, None)?;

        let expected_failures = match &config.expected_failures {
            Some(path) => ExpectedFailures::load_optional(path)?,
            None => ExpectedFailures::new(),
        };

        Ok(Self {
            files,
            expected_failures,
        })
    }

    pub fn plan<'a>(&'a self, backends: &'a BackendRegistry, config: &'a HarnessConfig) -> MatrixPlan<'a> {
        MatrixPlan::new(
            &self.files,
            backends,
            &self.expected_failures,
            &config.excluded_fixtures,
        )
    }
}

/// Loads the corpus and runs it against the configured backends
pub fn run_conformance(config: &HarnessConfig, mut backends: BackendRegistry) -> Result<RunSummary> {
    config.validate()?;
    backends.retain_selected(&config.backends)?;

    let corpus = Corpus::load(config)?;
    let plan = corpus.plan(&backends, config);

    info!(
        "Testing tree builders {}",
        backends.names().collect::<Vec<_>>().join(" ")
    );
    info!(
        "{} fixture files, {} cells",
        plan.files().count(),
        plan.len()
    );

    let harness = Harness::new(config.comparator_config());
    let summary = harness.run_matrix_parallel(&plan, config.threads);
    info!("{summary}");

    Ok(summary)
}
