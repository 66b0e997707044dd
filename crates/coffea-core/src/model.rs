//! Dependency model: nodes keyed by class or package name
//!
//! Edges are plain keys. A dependency may name a key that has no node of its
//! own (library types that were never scanned); such edges are kept as-is.

use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

/// Node key (qualified class name or package name)
pub type NodeKey = String;

/// A vertex in the dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique key within a model
    pub key: NodeKey,

    /// Keys this node depends on
    #[serde(default)]
    pub dependencies: BTreeSet<NodeKey>,

    /// Size metric (0 when no metric is configured)
    #[serde(default)]
    pub size: u64,
}

impl Node {
    pub fn new<I, S>(key: impl Into<String>, dependencies: I, size: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            size,
        }
    }

    /// Fold another node with the same key into this one.
    ///
    /// Dependencies are unioned and sizes summed, so folding is commutative
    /// and associative.
    pub fn absorb(&mut self, other: Node) {
        debug_assert_eq!(self.key, other.key);
        self.dependencies.extend(other.dependencies);
        self.size = self.size.saturating_add(other.size);
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (size={}, dependencies={})",
            self.key,
            self.size,
            self.dependencies.len()
        )
    }
}

/// Accumulated dependency graph
///
/// The only mutation is [`Model::merge`]; nodes are never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    nodes: BTreeMap<NodeKey, Node>,
}

impl Model {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a node into the model.
    ///
    /// A new key is inserted as-is. An existing key is combined with the
    /// incoming node (dependency union, size sum).
    pub fn merge(&mut self, node: Node) {
        match self.nodes.entry(node.key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(node);
            }
            Entry::Occupied(mut slot) => slot.get_mut().absorb(node),
        }
    }

    /// Look up a node by key
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Check whether a node exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    /// All nodes, ordered by key
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All node keys, in order
    pub fn keys(&self) -> impl Iterator<Item = &NodeKey> {
        self.nodes.keys()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of dependency edges across all nodes
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|node| node.dependencies.len()).sum()
    }

    /// Dependency keys that have no node in this model.
    ///
    /// Informational only: dangling edges are expected for unscanned libraries.
    pub fn dangling_dependencies(&self) -> BTreeSet<&str> {
        self.nodes
            .values()
            .flat_map(|node| node.dependencies.iter())
            .filter(|dep| !self.nodes.contains_key(dep.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Sum of all node sizes
    pub fn total_size(&self) -> u64 {
        self.nodes
            .values()
            .fold(0u64, |total, node| total.saturating_add(node.size))
    }
}

impl Extend<Node> for Model {
    fn extend<T: IntoIterator<Item = Node>>(&mut self, iter: T) {
        for node in iter {
            self.merge(node);
        }
    }
}

impl FromIterator<Node> for Model {
    fn from_iter<T: IntoIterator<Item = Node>>(iter: T) -> Self {
        let mut model = Model::new();
        model.extend(iter);
        model
    }
}
