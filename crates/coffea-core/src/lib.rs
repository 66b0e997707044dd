//! Coffea Core
//!
//! Dependency model for compiled class artifacts: graph nodes, the merging
//! model that owns them, and the factories that turn one parsed class into
//! one node at class or package granularity.

pub mod artifact;
pub mod config;
pub mod factory;
pub mod model;
pub mod report;

pub use artifact::{package_of, ClassArtifact};
pub use config::{Config, ConfigError, Granularity, SizeMetric};
pub use factory::{ClassNodeFactory, NodeFactory, PackageNodeFactory};
pub use model::{Model, Node};
pub use report::{GraphReport, GraphSummary, ReportMetadata, ReportVersion};
