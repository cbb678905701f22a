//! Relationship graph around a twin.
//!
//! A [`TwinGraph`] is what the twin system hands back for a twin: the twin,
//! its neighbours and the typed relationships between them. Nodes are
//! de-duplicated by twin id on insert; edges are kept as given, duplicates
//! included, so consumers de-duplicate by node.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use tx_ir::TwinRef;

/// Relationship names the binder gives meaning to.
pub mod relation {
    pub const FEEDS: &str = "feeds";
    pub const IS_CAPABILITY_OF: &str = "isCapabilityOf";
    pub const LOCATED_IN: &str = "locatedIn";
}

/// A directed, named edge between two nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relation {
    pub start: usize,
    pub end: usize,
    pub name: String,
}

/// Twins connected by typed relationships.
#[derive(Clone, Debug, Default)]
pub struct TwinGraph {
    nodes: Vec<TwinRef>,
    index: FxHashMap<String, usize>,
    edges: Vec<Relation>,
}

impl TwinGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a twin, returning its node. A twin already present keeps its node.
    pub fn add_twin(&mut self, twin: TwinRef) -> usize {
        if let Some(&node) = self.index.get(&twin.id) {
            return node;
        }
        let node = self.nodes.len();
        self.index.insert(twin.id.clone(), node);
        self.nodes.push(twin);
        node
    }

    /// Add `start -[name]-> end`. Both twins must already be in the graph.
    pub fn relate(&mut self, start: &str, name: &str, end: &str) -> bool {
        let (Some(start), Some(end)) = (self.find(start), self.find(end)) else {
            return false;
        };
        self.edges.push(Relation {
            start,
            end,
            name: name.to_owned(),
        });
        true
    }

    /// Node of a twin id. Exact first, then case-insensitive, since ids
    /// in cached twins and in the graph do not always agree on casing.
    pub fn find(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied().or_else(|| {
            self.nodes
                .iter()
                .position(|twin| twin.id.eq_ignore_ascii_case(id))
        })
    }

    pub fn twin(&self, node: usize) -> &TwinRef {
        &self.nodes[node]
    }

    pub fn nodes(&self) -> &[TwinRef] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Relation] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes pointing back at `node`: its capabilities, parts and anything
    /// it feeds. Each node appears once however many edges connect it.
    pub fn backward_neighbours(&self, node: usize) -> Vec<usize> {
        let mut seen = FxHashSet::default();
        self.edges
            .iter()
            .filter_map(|edge| {
                let feeds = edge.name == relation::FEEDS;
                if edge.end == node && !feeds {
                    Some(edge.start)
                } else if edge.start == node && feeds {
                    Some(edge.end)
                } else {
                    None
                }
            })
            .filter(|&other| other != node && seen.insert(other))
            .collect()
    }

    /// First node reached from `node` over an edge called `name`.
    pub fn follow(&self, node: usize, name: &str) -> Option<usize> {
        self.edges
            .iter()
            .find(|edge| edge.start == node && edge.name == name)
            .map(|edge| edge.end)
    }

    /// Every other reachable node grouped by hop count, nearest first.
    /// Edges are walked in both directions.
    pub fn layers(&self, start: usize) -> Vec<Vec<usize>> {
        let mut adjacent: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            adjacent[edge.start].push(edge.end);
            adjacent[edge.end].push(edge.start);
        }

        let mut distance = vec![usize::MAX; self.nodes.len()];
        let mut queue = VecDeque::from([start]);
        distance[start] = 0;
        let mut layers: Vec<Vec<usize>> = Vec::new();

        while let Some(node) = queue.pop_front() {
            for &next in &adjacent[node] {
                if distance[next] != usize::MAX {
                    continue;
                }
                distance[next] = distance[node] + 1;
                let depth = distance[next] - 1;
                if layers.len() <= depth {
                    layers.push(Vec::new());
                }
                layers[depth].push(next);
                queue.push_back(next);
            }
        }
        layers
    }
}
