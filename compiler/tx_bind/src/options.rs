use std::sync::Arc;

use crate::graph::TwinGraph;

/// Binding options.
#[derive(Clone, Debug)]
pub struct BindOptions {
    /// Array elements one binder may fold before giving up.
    pub max_array_count: usize,
    /// Names left unbound, such as a rule's own outputs.
    pub ignored: Vec<String>,
    /// Twin ids never returned by model-id or tag matches.
    pub ignored_twins: Vec<String>,
    /// Graph to resolve model ids in, instead of asking the twin system.
    pub root_graph: Option<Arc<TwinGraph>>,
}

impl BindOptions {
    pub const DEFAULT_MAX_ARRAY_COUNT: usize = 10;

    #[must_use]
    pub fn with_ignored<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_ignored_twins<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_twins.extend(ids.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_root_graph(mut self, graph: TwinGraph) -> Self {
        self.root_graph = Some(Arc::new(graph));
        self
    }
}

impl Default for BindOptions {
    fn default() -> Self {
        BindOptions {
            max_array_count: Self::DEFAULT_MAX_ARRAY_COUNT,
            ignored: Vec::new(),
            ignored_twins: Vec::new(),
            root_graph: None,
        }
    }
}
