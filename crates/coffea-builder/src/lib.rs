//! Dependency model builder
//!
//! Drives class-file discovery over one or more roots, turns every class
//! into a node with the configured factory and merges it into one model.

pub mod builder;

pub use builder::{BuildError, Builder};
