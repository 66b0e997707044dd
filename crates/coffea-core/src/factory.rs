//! Node factories: one parsed class in, one graph node out

use crate::artifact::ClassArtifact;
use crate::config::{Granularity, SizeMetric};
use crate::model::Node;

/// Converts a parsed class into a node at a fixed granularity.
///
/// Implementations are pure: the same artifact always yields the same node.
/// Combining nodes that share a key is left to [`crate::Model::merge`].
pub trait NodeFactory: std::fmt::Debug {
    /// Convert one artifact into one node
    fn get_node(&self, artifact: &ClassArtifact) -> Node;

    /// Size metric this factory attaches to nodes
    fn size_metric(&self) -> SizeMetric;
}

impl SizeMetric {
    /// Pick the configured size out of an artifact
    pub fn measure(self, artifact: &ClassArtifact) -> u64 {
        match self {
            SizeMetric::None => 0,
            SizeMetric::Class => artifact.size,
            SizeMetric::Code => artifact.code_size,
        }
    }
}

impl Granularity {
    /// Factory producing nodes at this granularity
    pub fn node_factory(self, size_metric: SizeMetric) -> Box<dyn NodeFactory> {
        match self {
            Granularity::Class => Box::new(ClassNodeFactory::new(size_metric)),
            Granularity::Package => Box::new(PackageNodeFactory::new(size_metric)),
        }
    }
}

/// Class-level nodes: key is the qualified class name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassNodeFactory {
    size_metric: SizeMetric,
}

impl ClassNodeFactory {
    pub fn new(size_metric: SizeMetric) -> Self {
        Self { size_metric }
    }
}

impl NodeFactory for ClassNodeFactory {
    fn get_node(&self, artifact: &ClassArtifact) -> Node {
        Node {
            key: artifact.name.clone(),
            dependencies: artifact.class_dependencies.clone(),
            size: self.size_metric.measure(artifact),
        }
    }

    fn size_metric(&self) -> SizeMetric {
        self.size_metric
    }
}

/// Package-level nodes: key is the package name.
///
/// Each class yields its own package node; the model sums the sizes of all
/// classes sharing a package when they are merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackageNodeFactory {
    size_metric: SizeMetric,
}

impl PackageNodeFactory {
    pub fn new(size_metric: SizeMetric) -> Self {
        Self { size_metric }
    }
}

impl NodeFactory for PackageNodeFactory {
    fn get_node(&self, artifact: &ClassArtifact) -> Node {
        Node {
            key: artifact.package.clone(),
            dependencies: artifact.package_dependencies.clone(),
            size: self.size_metric.measure(artifact),
        }
    }

    fn size_metric(&self) -> SizeMetric {
        self.size_metric
    }
}
