//! The typed dependency graph persisted between runs.
//!
//! Nodes are persisted entity references (items, layouts, the
//! configuration) plus one null node that absorbs edges whose destination
//! no longer exists. An edge from X to Y with mask M says "X used the
//! M-aspects of Y"; querying X's predecessors yields what can make X
//! outdated. Destinations that have vanished from the current universe
//! resolve to `None`, which callers must treat as "changed".

use crate::error::StoreError;
use crate::persist;
use crate::props::DepProps;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use stanza_common::EntityRef;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

const DEPENDENCY_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct EdgeRecord {
    from: EntityRef,
    to: Option<EntityRef>,
    props: DepProps,
}

/// The dependency graph of the previous and current run.
///
/// Loaded against a fixed universe of entity references. Nodes for
/// entities outside the universe are kept in the graph (their edges may
/// still be queried) but resolve to `None`; edges whose source is outside
/// the universe are not written back, so stale state decays after one
/// run.
#[derive(Debug)]
pub struct DependencyStore {
    graph: StableDiGraph<Option<EntityRef>, DepProps>,
    nodes: HashMap<EntityRef, NodeIndex>,
    null: NodeIndex,
    universe: HashSet<EntityRef>,
    path: PathBuf,
}

impl DependencyStore {
    fn empty(path: &Path, universe: HashSet<EntityRef>) -> Self {
        let mut graph = StableDiGraph::new();
        let null = graph.add_node(None);
        DependencyStore {
            graph,
            nodes: HashMap::new(),
            null,
            universe,
            path: path.to_path_buf(),
        }
    }

    /// Loads the graph from `path` against the given universe, or creates
    /// an empty one if the file is missing or unusable.
    pub fn load_or_create(path: &Path, universe: &HashSet<EntityRef>) -> Self {
        let mut store = DependencyStore::empty(path, universe.clone());
        if let Some(records) =
            persist::load_json::<Vec<EdgeRecord>>(path, DEPENDENCY_FORMAT_VERSION)
        {
            for record in records {
                store.record_dependency(&record.from, record.to.as_ref(), record.props);
            }
        }
        store
    }

    fn node_for(&mut self, entity: &EntityRef) -> NodeIndex {
        if let Some(&node) = self.nodes.get(entity) {
            return node;
        }
        let node = self.graph.add_node(Some(entity.clone()));
        self.nodes.insert(entity.clone(), node);
        node
    }

    /// Records that `from` used the `props`-aspects of `to`.
    ///
    /// A destination of `None` is an explicit tombstone. Self-edges are
    /// dropped. Recording over an existing edge merges the masks.
    pub fn record_dependency(&mut self, from: &EntityRef, to: Option<&EntityRef>, props: DepProps) {
        if to == Some(from) {
            return;
        }
        let from_node = self.node_for(from);
        let to_node = match to {
            Some(entity) => self.node_for(entity),
            None => self.null,
        };
        match self.graph.find_edge(from_node, to_node) {
            Some(edge) => {
                if let Some(weight) = self.graph.edge_weight_mut(edge) {
                    *weight = *weight | props;
                }
            }
            None => {
                self.graph.add_edge(from_node, to_node, props);
            }
        }
    }

    /// Everything `of` directly depends on, with the aspect mask of each
    /// edge. Destinations outside the current universe come back as
    /// `None`.
    pub fn predecessors_with_props(&self, of: &EntityRef) -> Vec<(Option<EntityRef>, DepProps)> {
        let Some(&node) = self.nodes.get(of) else {
            return Vec::new();
        };
        self.graph
            .edges(node)
            .map(|edge| {
                let resolved = self.graph[edge.target()]
                    .as_ref()
                    .filter(|entity| self.universe.contains(*entity))
                    .cloned();
                (resolved, *edge.weight())
            })
            .collect()
    }

    /// Removes every outgoing edge of `of`. Incoming edges (other
    /// entities depending on `of`) are untouched.
    pub fn forget_dependencies_for(&mut self, of: &EntityRef) {
        let Some(&node) = self.nodes.get(of) else {
            return;
        };
        let outgoing: Vec<_> = self.graph.edges(node).map(|edge| edge.id()).collect();
        for edge in outgoing {
            self.graph.remove_edge(edge);
        }
    }

    /// The mask on the edge from `from` to `to`, if such an edge exists.
    pub fn props_between(&self, from: &EntityRef, to: &EntityRef) -> Option<DepProps> {
        let from_node = *self.nodes.get(from)?;
        let to_node = *self.nodes.get(to)?;
        let edge = self.graph.find_edge(from_node, to_node)?;
        self.graph.edge_weight(edge).copied()
    }

    /// The number of edges currently in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Writes the graph to disk as a sorted edge list.
    ///
    /// Edges whose source is outside the current universe are dropped
    /// here; their destinations have already seen a full run as `None`.
    pub fn save(&self) -> Result<(), StoreError> {
        let mut records: Vec<EdgeRecord> = Vec::new();
        for node in self.graph.node_indices() {
            let Some(from) = self.graph[node].clone() else {
                continue;
            };
            if !self.universe.contains(&from) {
                continue;
            }
            for edge in self.graph.edges(node) {
                records.push(EdgeRecord {
                    from: from.clone(),
                    to: self.graph[edge.target()].clone(),
                    props: *edge.weight(),
                });
            }
        }
        records.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
        persist::save_json(&self.path, DEPENDENCY_FORMAT_VERSION, &records)
    }
}
