//! In-memory services for tests and tools.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tx_ir::TwinRef;

use crate::graph::TwinGraph;
use crate::services::{BindServices, MemoryCache, ModelService, TwinLookup, TwinSystem};

/// A whole building in one graph. Every twin's relationship graph is the
/// building graph.
#[derive(Default)]
pub struct InMemoryTwins {
    graph: TwinGraph,
    twin_loads: AtomicUsize,
    graph_loads: AtomicUsize,
}

impl InMemoryTwins {
    pub fn new(graph: TwinGraph) -> Self {
        InMemoryTwins {
            graph,
            ..Self::default()
        }
    }

    pub fn building(&self) -> &TwinGraph {
        &self.graph
    }

    /// Calls to [`TwinLookup::twin`] so far.
    pub fn twin_loads(&self) -> usize {
        self.twin_loads.load(Ordering::Relaxed)
    }

    /// Calls to [`TwinSystem::graph`] so far.
    pub fn graph_loads(&self) -> usize {
        self.graph_loads.load(Ordering::Relaxed)
    }
}

impl TwinLookup for InMemoryTwins {
    fn twin(&self, id: &str) -> Option<TwinRef> {
        self.twin_loads.fetch_add(1, Ordering::Relaxed);
        let node = self.graph.find(id)?;
        Some(Arc::clone(self.graph.twin(node)))
    }
}

impl TwinSystem for InMemoryTwins {
    fn graph(&self, twin_id: &str) -> Option<TwinGraph> {
        self.graph_loads.fetch_add(1, Ordering::Relaxed);
        self.graph.find(twin_id).map(|_| self.graph.clone())
    }
}

/// Model inheritance from an explicit `extends` table.
#[derive(Clone, Debug, Default)]
pub struct InMemoryModels {
    extends: FxHashMap<String, Vec<String>>,
    text_based: FxHashSet<String>,
}

impl InMemoryModels {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_extends(mut self, model: &str, parent: &str) -> Self {
        self.extends
            .entry(model.to_owned())
            .or_default()
            .push(parent.to_owned());
        self
    }

    #[must_use]
    pub fn with_text_based(mut self, model: &str) -> Self {
        self.text_based.insert(model.to_owned());
        self
    }
}

impl ModelService for InMemoryModels {
    fn inherits_from(&self, model_id: &str, ancestor: &str) -> bool {
        let mut seen = FxHashSet::default();
        let mut pending: Vec<&str> = vec![model_id];
        while let Some(model) = pending.pop() {
            for parent in self.extends.get(model).into_iter().flatten() {
                if parent == ancestor {
                    return true;
                }
                if seen.insert(parent.as_str()) {
                    pending.push(parent);
                }
            }
        }
        false
    }

    fn is_text_based_telemetry(&self, model_id: &str) -> bool {
        self.text_based.contains(model_id)
    }
}

/// Services over `twins` and `models` with a fresh [`MemoryCache`].
pub fn services(twins: &Arc<InMemoryTwins>, models: InMemoryModels) -> BindServices {
    BindServices::new(
        Arc::clone(twins) as Arc<dyn TwinLookup>,
        Arc::clone(twins) as Arc<dyn TwinSystem>,
        Arc::new(models),
        Arc::new(MemoryCache::new()),
    )
}
