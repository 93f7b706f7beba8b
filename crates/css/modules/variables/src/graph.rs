//! Per-theme dependency graph of custom properties.
//!
//! Nodes live in an arena indexed by [`NodeId`]; `depends_on` and `dependents` are index
//! lists into it. Resolution is a depth-first walk with an explicit stack, so deeply
//! chained properties do not grow the call stack. A reference to a property that is still
//! on the walk path closes a cycle: it is reported, gets no edge and keeps its `var()` text.
//!
//! See <https://www.w3.org/TR/css-variables-1/#cycles>

use crate::annotations::Annotations;
use crate::references::{referenced_names, substitute};
use log::warn;
use std::collections::HashMap;

/// One custom property declaration as written in a theme's rule blocks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyMetadata {
    /// Property name including the leading `--`.
    pub name: String,
    /// Declared value text.
    pub value: String,
    pub description: Option<String>,
    pub deprecated: bool,
    pub deprecated_description: Option<String>,
}

impl PropertyMetadata {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            description: None,
            deprecated: false,
            deprecated_description: None,
        }
    }

    #[must_use]
    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.description = annotations.description;
        self.deprecated = annotations.deprecated;
        self.deprecated_description = annotations.deprecated_description;
        self
    }
}

/// Index of a node in its graph's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A property plus its edges and resolved value.
#[derive(Clone, Debug)]
pub struct GraphNode {
    metadata: PropertyMetadata,
    /// Nodes this node's value references, in reference order.
    depends_on: Vec<NodeId>,
    /// Nodes whose values reference this node.
    dependents: Vec<NodeId>,
    resolved: String,
}

impl GraphNode {
    fn new(metadata: PropertyMetadata) -> Self {
        let resolved = metadata.value.clone();
        Self {
            metadata,
            depends_on: Vec::new(),
            dependents: Vec::new(),
            resolved,
        }
    }

    #[inline]
    pub fn metadata(&self) -> &PropertyMetadata {
        &self.metadata
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Value as declared.
    #[inline]
    pub fn raw_value(&self) -> &str {
        &self.metadata.value
    }

    /// Value with every resolvable `var()` reference substituted.
    #[inline]
    pub fn resolved_value(&self) -> &str {
        &self.resolved
    }

    /// Whether substitution changed the declared value.
    #[inline]
    pub fn is_substituted(&self) -> bool {
        self.resolved != self.metadata.value
    }
}

/// A reference from `from` to `to` that would have closed a cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CircularDependency {
    pub from: String,
    pub to: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Pending,
    InProgress,
    Finalized,
}

/// A node on the resolution path with the references it still has to visit.
struct Frame {
    id: NodeId,
    references: Vec<NodeId>,
    next: usize,
}

/// All custom properties of one theme, resolved against each other.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<GraphNode>,
    index: HashMap<String, NodeId>,
    cycles: Vec<CircularDependency>,
}

impl DependencyGraph {
    /// Build and resolve the graph for properties given in declaration order.
    ///
    /// A property declared twice keeps the position of its first declaration and the
    /// metadata of its last one.
    pub fn new(properties: impl IntoIterator<Item = PropertyMetadata>) -> Self {
        let mut graph = Self::default();
        for metadata in properties {
            if let Some(&id) = graph.index.get(&metadata.name) {
                graph.nodes[id.0] = GraphNode::new(metadata);
            } else {
                let id = NodeId(graph.nodes.len());
                graph.index.insert(metadata.name.clone(), id);
                graph.nodes.push(GraphNode::new(metadata));
            }
        }
        graph.resolve();
        graph
    }

    pub fn get(&self, name: &str) -> Option<&GraphNode> {
        self.index.get(name).map(|id| &self.nodes[id.0])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Nodes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Names of the properties `name` depends on, in edge insertion order.
    pub fn dependencies(&self, name: &str) -> Vec<&str> {
        self.get(name)
            .map(|node| self.names_of(&node.depends_on))
            .unwrap_or_default()
    }

    /// Names of the properties depending on `name`.
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.get(name)
            .map(|node| self.names_of(&node.dependents))
            .unwrap_or_default()
    }

    /// Cycles detected while resolving, in detection order.
    pub fn circular_dependencies(&self) -> &[CircularDependency] {
        &self.cycles
    }

    fn names_of(&self, ids: &[NodeId]) -> Vec<&str> {
        ids.iter().map(|id| self.nodes[id.0].name()).collect()
    }

    fn frame(&self, id: NodeId) -> Frame {
        let references = referenced_names(self.nodes[id.0].raw_value())
            .into_iter()
            .filter_map(|name| self.index.get(name).copied())
            .collect();
        Frame {
            id,
            references,
            next: 0,
        }
    }

    fn resolve(&mut self) {
        let mut visits = vec![Visit::Pending; self.nodes.len()];
        for root in (0..self.nodes.len()).map(NodeId) {
            if visits[root.0] != Visit::Pending {
                continue;
            }
            visits[root.0] = Visit::InProgress;
            let mut stack = vec![self.frame(root)];

            while let Some(frame) = stack.last_mut() {
                if let Some(&dependency) = frame.references.get(frame.next) {
                    frame.next += 1;
                    let current = frame.id;
                    match visits[dependency.0] {
                        Visit::InProgress => self.record_cycle(current, dependency),
                        Visit::Finalized => self.add_edge(current, dependency),
                        Visit::Pending => {
                            visits[dependency.0] = Visit::InProgress;
                            stack.push(self.frame(dependency));
                        }
                    }
                    continue;
                }

                let finished = frame.id;
                stack.pop();
                self.finalize(finished);
                visits[finished.0] = Visit::Finalized;
                if let Some(parent) = stack.last() {
                    self.add_edge(parent.id, finished);
                }
            }
        }
    }

    fn record_cycle(&mut self, from: NodeId, to: NodeId) {
        let from = self.nodes[from.0].name().to_owned();
        let to = self.nodes[to.0].name().to_owned();
        warn!("Circular dependency between \"{from}\" and \"{to}\", leaving var({to}) unresolved");
        self.cycles.push(CircularDependency { from, to });
    }

    fn add_edge(&mut self, from: NodeId, to: NodeId) {
        if !self.nodes[from.0].depends_on.contains(&to) {
            self.nodes[from.0].depends_on.push(to);
            self.nodes[to.0].dependents.push(from);
        }
    }

    /// Substitute the resolved values of `id`'s dependencies into its declared value.
    fn finalize(&mut self, id: NodeId) {
        let node = &self.nodes[id.0];
        let resolved = substitute(node.raw_value(), &|name: &str| {
            node.depends_on
                .iter()
                .map(|dep| &self.nodes[dep.0])
                .find(|dep| dep.name() == name)
                .map(GraphNode::resolved_value)
        });
        self.nodes[id.0].resolved = resolved;
    }
}
