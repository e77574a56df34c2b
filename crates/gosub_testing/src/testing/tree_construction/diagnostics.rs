//! Diagnostics emitted by a tree backend while parsing
//!
//! Backends report two kinds of diagnostics. Parse errors are recorded by the parser itself and
//! returned with the document. Warnings are emitted through [`warn`] and end up in the capture
//! scope of the invocation that is currently running on this thread. Warnings emitted outside
//! of any scope are logged.
use lazy_static::lazy_static;
use log::warn as log_warn;
use regex::{Captures, Regex};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::marker::PhantomData;

/// Category of a warning. Only data loss warnings are expected while parsing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum WarningCategory {
    /// Information from the input could not be represented in the tree (e.g. an attribute
    /// name that is not a valid XML name)
    DataLoss,
    Other(String),
}

impl fmt::Display for WarningCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningCategory::DataLoss => write!(f, "DataLossWarning"),
            WarningCategory::Other(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Warning {
    pub category: WarningCategory,
    pub message: String,
}

impl Warning {
    pub fn data_loss(message: impl Into<String>) -> Self {
        Self {
            category: WarningCategory::DataLoss,
            message: message.into(),
        }
    }

    pub fn other(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category: WarningCategory::Other(category.into()),
            message: message.into(),
        }
    }

    pub fn is_data_loss(&self) -> bool {
        self.category == WarningCategory::DataLoss
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

thread_local! {
    static SINK: RefCell<Option<Vec<Warning>>> = const { RefCell::new(None) };
}

/// Emits a warning into the capture scope of the current thread
pub fn warn(warning: Warning) {
    SINK.with(|sink| match sink.borrow_mut().as_mut() {
        Some(warnings) => warnings.push(warning),
        None => log_warn!("warning outside capture scope: {warning}"),
    });
}

/// Captures all warnings emitted on this thread until it is finished or dropped. Scopes nest:
/// the sink that was active when the scope was entered is restored when it ends, on every exit
/// path including unwinding.
#[must_use = "warnings are only captured while the scope is alive"]
pub struct CaptureScope {
    previous: Option<Option<Vec<Warning>>>,
    // The sink is thread local, so the scope must end on the thread it started on
    _not_send: PhantomData<*const ()>,
}

impl CaptureScope {
    pub fn enter() -> Self {
        let previous = SINK.with(|sink| sink.replace(Some(Vec::new())));

        Self {
            previous: Some(previous),
            _not_send: PhantomData,
        }
    }

    /// Ends the scope and returns the captured warnings in the order they were emitted
    pub fn finish(mut self) -> Vec<Warning> {
        self.restore()
    }

    fn restore(&mut self) -> Vec<Warning> {
        match self.previous.take() {
            Some(previous) => SINK
                .with(|sink| sink.replace(previous))
                .unwrap_or_default(),
            None => vec![],
        }
    }
}

impl Drop for CaptureScope {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Runs `f` inside a new capture scope
pub fn capture<T>(f: impl FnOnce() -> T) -> (T, Vec<Warning>) {
    let scope = CaptureScope::enter();
    let value = f();
    (value, scope.finish())
}

/// A parse error as recorded by the backend's parser
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParseErrorRecord {
    pub line: usize,
    pub col: usize,
    /// Error code, resolvable to a message through an [`ErrorMessages`] table
    pub code: String,
    /// Values for the placeholders in the message template
    pub template_args: BTreeMap<String, String>,
}

impl ParseErrorRecord {
    pub fn new(line: usize, col: usize, code: impl Into<String>) -> Self {
        Self {
            line,
            col,
            code: code.into(),
            template_args: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.template_args.insert(name.into(), value.into());
        self
    }
}

/// Maps error codes to human-readable message templates. Templates use `%(name)s` placeholders.
pub trait ErrorMessages: Send + Sync {
    fn template(&self, code: &str) -> Option<&str>;
}

impl ErrorMessages for HashMap<String, String> {
    fn template(&self, code: &str) -> Option<&str> {
        self.get(code).map(String::as_str)
    }
}

impl ErrorMessages for BTreeMap<String, String> {
    fn template(&self, code: &str) -> Option<&str> {
        self.get(code).map(String::as_str)
    }
}

/// Table without any templates; every error is rendered by its code
#[derive(Clone, Copy, Debug, Default)]
pub struct NoErrorMessages;

impl ErrorMessages for NoErrorMessages {
    fn template(&self, _code: &str) -> Option<&str> {
        None
    }
}

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"%\((\w+)\)s").expect("placeholder regex");
}

/// Formats a parse error the same way the fixtures list them: `Line: <l> Col: <c> <message>`
pub fn format_parse_error(error: &ParseErrorRecord, messages: &dyn ErrorMessages) -> String {
    let message = match messages.template(&error.code) {
        Some(template) => PLACEHOLDER
            .replace_all(template, |caps: &Captures| {
                error
                    .template_args
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned(),
        None => error.code.clone(),
    };

    format!("Line: {} Col: {} {}", error.line, error.col, message)
}
