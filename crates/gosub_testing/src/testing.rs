//! Testing harness and utilities for testing tree backends
pub mod config;
pub mod tree_construction;

pub const FIXTURE_ROOT: &str = "./tests/data/html5lib-tests";
pub const TREE_CONSTRUCTION_PATH: &str = "tree-construction";
pub const EXPECTED_FAILURES_PATH: &str = "./tests/data/expected-failures/tree-construction.dat";
