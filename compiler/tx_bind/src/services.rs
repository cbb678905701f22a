//! Collaborators the binder reads from.
//!
//! Every service is a `Send + Sync` trait object so one [`BindServices`]
//! bundle can be shared across threads binding different rules. Services
//! answer "not found" with `None`; I/O errors are theirs to handle.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tx_eval::MlModels;
use tx_ir::TwinRef;

use crate::graph::TwinGraph;

/// Twin-by-id lookup.
pub trait TwinLookup: Send + Sync {
    fn twin(&self, id: &str) -> Option<TwinRef>;
}

/// Relationship graph around a twin.
pub trait TwinSystem: Send + Sync {
    fn graph(&self, twin_id: &str) -> Option<TwinGraph>;
}

/// Model metadata: inheritance between model ids.
pub trait ModelService: Send + Sync {
    /// Whether `model_id` extends `ancestor`, directly or not.
    /// A model does not inherit from itself.
    fn inherits_from(&self, model_id: &str, ancestor: &str) -> bool;

    fn inherits_from_or_equal(&self, model_id: &str, ancestor: &str) -> bool {
        model_id == ancestor || self.inherits_from(model_id, ancestor)
    }

    /// Twins of this model carry event or JSON telemetry whose properties
    /// are only known at run time.
    fn is_text_based_telemetry(&self, _model_id: &str) -> bool {
        false
    }
}

/// Something worth remembering between binds.
#[derive(Clone, Debug)]
pub enum Cached {
    Graph(Arc<TwinGraph>),
    Twin(TwinRef),
}

/// Read-through cache keyed by environment id and key.
pub trait BindCache: Send + Sync {
    fn get(&self, scope: u64, key: &str) -> Option<Cached>;

    fn insert(&self, scope: u64, key: &str, value: Cached);

    /// Return the cached entry, loading and storing it on a miss.
    /// Misses that load nothing are not remembered.
    fn get_or_load(
        &self,
        scope: u64,
        key: &str,
        load: &mut dyn FnMut() -> Option<Cached>,
    ) -> Option<Cached> {
        if let Some(hit) = self.get(scope, key) {
            return Some(hit);
        }
        let loaded = load()?;
        self.insert(scope, key, loaded.clone());
        Some(loaded)
    }
}

/// Unbounded in-process [`BindCache`].
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<FxHashMap<(u64, String), Cached>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl BindCache for MemoryCache {
    fn get(&self, scope: u64, key: &str) -> Option<Cached> {
        self.entries.read().get(&(scope, key.to_owned())).cloned()
    }

    fn insert(&self, scope: u64, key: &str, value: Cached) {
        self.entries.write().insert((scope, key.to_owned()), value);
    }
}

/// Ids recently looked up without success, oldest evicted first.
pub(crate) struct KnownBadIds {
    ids: Mutex<VecDeque<String>>,
}

impl KnownBadIds {
    pub(crate) const CAPACITY: usize = 100;

    fn new() -> Self {
        KnownBadIds {
            ids: Mutex::new(VecDeque::with_capacity(Self::CAPACITY + 1)),
        }
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.ids.lock().iter().any(|known| known == id)
    }

    pub(crate) fn remember(&self, id: &str) {
        let mut ids = self.ids.lock();
        if ids.iter().any(|known| known == id) {
            return;
        }
        ids.push_back(id.to_owned());
        if ids.len() > Self::CAPACITY {
            ids.pop_front();
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.ids.lock().len()
    }
}

/// The services a binder needs, cheap to clone.
#[derive(Clone)]
pub struct BindServices {
    pub twins: Arc<dyn TwinLookup>,
    pub twin_system: Arc<dyn TwinSystem>,
    pub models: Arc<dyn ModelService>,
    pub cache: Arc<dyn BindCache>,
    pub ml_models: Option<Arc<dyn MlModels>>,
    pub(crate) known_bad: Arc<KnownBadIds>,
}

impl BindServices {
    pub fn new(
        twins: Arc<dyn TwinLookup>,
        twin_system: Arc<dyn TwinSystem>,
        models: Arc<dyn ModelService>,
        cache: Arc<dyn BindCache>,
    ) -> Self {
        BindServices {
            twins,
            twin_system,
            models,
            cache,
            ml_models: None,
            known_bad: Arc::new(KnownBadIds::new()),
        }
    }

    #[must_use]
    pub fn with_ml_models(mut self, ml_models: Arc<dyn MlModels>) -> Self {
        self.ml_models = Some(ml_models);
        self
    }

    /// Whether `name` is served by a machine-learning model.
    pub fn is_ml_model(&self, name: &str) -> bool {
        self.ml_models
            .as_ref()
            .is_some_and(|models| models.model(name).is_some())
    }
}
