//! Tree backends are the parsers under test. The harness never looks into the trees they build;
//! it only asks for the test serialization of a document.
use crate::testing::tree_construction::diagnostics::ParseErrorRecord;
use gosub_shared::types::{Error, Result};
use std::fmt;

/// Options a parser is created with for a single invocation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParserOptions {
    /// When set, HTML elements carry an explicit namespace in the tree and in its serialization
    pub namespace_html_elements: bool,
}

/// A document (or document fragment) built by a tree backend
pub trait Document {
    /// Serializes the tree into the test dump format. The first line is the document node
    /// itself (e.g. `#document`), every following line is prefixed with `|` and indented by two
    /// spaces per level.
    fn serialize(&self) -> String;
}

/// A single-use parser created by a tree backend
pub trait TreeParser {
    fn parse(&mut self, input: &str) -> Result<Box<dyn Document>>;

    /// Parses `input` as the contents of a `context` element. The context may carry a
    /// namespace prefix (`svg path`, `math ms`).
    fn parse_fragment(&mut self, input: &str, context: &str) -> Result<Box<dyn Document>>;

    /// Parse errors recorded by the last parse, in the order they were found
    fn errors(&self) -> &[ParseErrorRecord];
}

/// An implementation of tree construction and serialization that can be tested
pub trait TreeBackend: Send + Sync {
    /// Creates a fresh parser. Every invocation gets its own parser.
    fn create_parser(&self, options: ParserOptions) -> Box<dyn TreeParser>;
}

/// A backend together with the name it was registered under
pub struct RegisteredBackend {
    name: String,
    backend: Box<dyn TreeBackend>,
}

impl RegisteredBackend {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn create_parser(&self, options: ParserOptions) -> Box<dyn TreeParser> {
        self.backend.create_parser(options)
    }
}

impl fmt::Debug for RegisteredBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredBackend")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// All backends under test, in registration order
#[derive(Debug, Default)]
pub struct BackendRegistry {
    backends: Vec<RegisteredBackend>,
}

impl BackendRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a backend under a stable name. Names must be unique.
    pub fn register(&mut self, name: &str, backend: impl TreeBackend + 'static) -> Result<()> {
        if self.contains(name) {
            return Err(Error::Config(format!("tree backend '{name}' is already registered")).into());
        }

        self.backends.push(RegisteredBackend {
            name: name.to_string(),
            backend: Box::new(backend),
        });

        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.backends.iter().any(|b| b.name == name)
    }

    pub fn get(&self, name: &str) -> Result<&RegisteredBackend> {
        self.backends
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| Error::UnknownBackend(name.to_string()).into())
    }

    /// Keeps only the backends with the given names. An empty selection keeps everything.
    pub fn retain_selected(&mut self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }

        if let Some(unknown) = names.iter().find(|name| !self.contains(name)) {
            return Err(Error::UnknownBackend(unknown.clone()).into());
        }

        self.backends.retain(|b| names.contains(&b.name));
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.backends.iter().map(RegisteredBackend::name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredBackend> {
        self.backends.iter()
    }

    pub(crate) fn get_index(&self, index: usize) -> Option<&RegisteredBackend> {
        self.backends.get(index)
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
