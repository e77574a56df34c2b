//! Conformance harness for html5lib tree-construction tests
//!
//! The harness loads the html5lib fixtures, expands them into a matrix over all registered tree
//! backends and both namespace modes, runs every cell in isolation and classifies the outcome.
//!
pub mod testing;
