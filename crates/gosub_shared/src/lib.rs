//! Shared functionality
//!
//! This crate supplies the error types that are shared between the conformance harness crates.
//!

pub mod types;
