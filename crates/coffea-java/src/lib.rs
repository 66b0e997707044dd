//! JVM class-file reading and discovery
//!
//! This crate handles:
//! - Parsing compiled `.class` files into [`coffea_core::ClassArtifact`]s
//! - Extracting class names from JVM type descriptors
//! - Walking directory trees for class files

pub mod class_file;
pub mod descriptor;
pub mod scanner;

pub use class_file::{ClassFile, ClassFileError};
pub use scanner::{is_class_file, ClassScanner, ScanError};
