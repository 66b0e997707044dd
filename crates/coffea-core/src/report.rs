//! Graph report schema (stable v1)
//!
//! JSON snapshot of a model for downstream tools.
//! Breaking changes require a new major version.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::config::{Granularity, SizeMetric};
use crate::model::{Model, Node};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Summary statistics for a graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    /// Number of nodes
    pub nodes: usize,

    /// Number of dependency edges
    pub edges: usize,

    /// Number of distinct dependency keys without a node
    pub dangling: usize,

    /// Sum of node sizes
    pub total_size: u64,
}

impl GraphSummary {
    pub fn from_model(model: &Model) -> Self {
        Self {
            nodes: model.len(),
            edges: model.edge_count(),
            dangling: model.dangling_dependencies().len(),
            total_size: model.total_size(),
        }
    }
}

/// How the reported graph was built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub granularity: Granularity,
    pub size: SizeMetric,

    /// Scanned roots, in scan order
    #[serde(default)]
    pub roots: Vec<PathBuf>,
}

/// Graph report (graph.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Summary statistics
    pub summary: GraphSummary,

    /// All nodes, ordered by key
    pub nodes: Vec<Node>,

    /// Metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ReportMetadata>,
}

impl GraphReport {
    /// Snapshot a model
    pub fn from_model(model: &Model) -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: GraphSummary::from_model(model),
            nodes: model.nodes().cloned().collect(),
            metadata: None,
        }
    }

    /// Attach metadata
    pub fn with_metadata(mut self, metadata: ReportMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Rebuild a model from the reported nodes
    pub fn into_model(self) -> Model {
        self.nodes.into_iter().collect()
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }

    /// Load from file
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_model() -> Model {
        vec![
            Node::new("a", ["b", "java.util"], 120),
            Node::new("b", ["java.util"], 80),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn empty_report() {
        let report = GraphReport::from_model(&Model::new());
        assert_eq!(report.version, ReportVersion::CURRENT);
        assert_eq!(report.summary, GraphSummary::default());
        assert!(report.nodes.is_empty());
    }

    #[test]
    fn summary_counts() {
        let report = GraphReport::from_model(&sample_model());
        assert_eq!(
            report.summary,
            GraphSummary {
                nodes: 2,
                edges: 3,
                dangling: 1,
                total_size: 200,
            }
        );
    }

    #[test]
    fn report_serialization() {
        let report = GraphReport::from_model(&sample_model())
            .with_metadata(ReportMetadata {
                granularity: Granularity::Package,
                size: SizeMetric::Class,
                roots: vec![PathBuf::from("build/classes")],
            });
        let json = report.to_json().unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"nodes\""));
        assert!(json.contains("\"granularity\": \"package\""));
    }

    #[test]
    fn file_roundtrip_rebuilds_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");

        GraphReport::from_model(&sample_model()).save_to_file(&path).unwrap();
        let loaded = GraphReport::from_file(&path).unwrap();

        assert_eq!(loaded.into_model(), sample_model());
    }
}
