use crate::testing::tree_construction::matrix::CellId;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The backend returned an error or panicked while parsing
    BackendError,
    /// A warning other than a data loss warning was emitted
    UnexpectedWarning,
    /// The serialized tree does not match the expected document
    OutputMismatch,
    /// The number of parse errors differs from the expected errors
    ErrorCountMismatch,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::BackendError => "backend error",
            FailureKind::UnexpectedWarning => "unexpected warning",
            FailureKind::OutputMismatch => "output mismatch",
            FailureKind::ErrorCountMismatch => "parse error count mismatch",
        };
        write!(f, "{s}")
    }
}

/// Why a cell failed, with everything needed to reproduce it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Parsing with scripting disabled is not supported
    ScriptingDisabled,
    /// The backend emitted a diagnostic, so its output is not compared
    DiagnosticEmitted,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ScriptingDisabled => write!(f, "scripting disabled unsupported"),
            SkipReason::DiagnosticEmitted => write!(f, "diagnostic emitted"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail(Failure),
    Skip(SkipReason),
    /// The cell failed, as registered in the expected failures
    ExpectedFail(Failure),
    /// The cell was expected to fail but passed; its expected failure entry is stale
    UnexpectedPass,
}

impl Outcome {
    /// Returns true when this outcome fails the run
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Fail(_) | Outcome::UnexpectedPass)
    }

    /// Single character used in progress output
    pub fn marker(&self) -> char {
        match self {
            Outcome::Pass => '.',
            Outcome::Fail(_) => 'X',
            Outcome::Skip(_) => 's',
            Outcome::ExpectedFail(_) => 'x',
            Outcome::UnexpectedPass => 'U',
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => write!(f, "pass"),
            Outcome::Fail(failure) => write!(f, "fail ({failure})"),
            Outcome::Skip(reason) => write!(f, "skip ({reason})"),
            Outcome::ExpectedFail(failure) => write!(f, "expected fail ({})", failure.kind),
            Outcome::UnexpectedPass => write!(f, "unexpected pass"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellResult {
    pub id: CellId,
    pub outcome: Outcome,
}

/// Outcomes of a complete run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub expected_failures: usize,
    pub unexpected_passes: usize,
    /// All results in enumeration order
    pub results: Vec<CellResult>,
}

impl RunSummary {
    pub fn record(&mut self, result: CellResult) {
        match result.outcome {
            Outcome::Pass => self.passed += 1,
            Outcome::Fail(_) => self.failed += 1,
            Outcome::Skip(_) => self.skipped += 1,
            Outcome::ExpectedFail(_) => self.expected_failures += 1,
            Outcome::UnexpectedPass => self.unexpected_passes += 1,
        }
        self.results.push(result);
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// A run succeeds when nothing failed and no expected failure passed
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.unexpected_passes == 0
    }

    /// Results that fail the run
    pub fn failures(&self) -> impl Iterator<Item = &CellResult> {
        self.results.iter().filter(|r| r.outcome.is_failure())
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total();
        let pct = if total == 0 {
            100_f32
        } else {
            self.passed as f32 / total as f32 * 100_f32
        };

        write!(
            f,
            "{}/{} ({:.2}%) passed, {} failed, {} skipped, {} expected failures, {} unexpected passes",
            self.passed,
            total,
            pct,
            self.failed,
            self.skipped,
            self.expected_failures,
            self.unexpected_passes
        )
    }
}
