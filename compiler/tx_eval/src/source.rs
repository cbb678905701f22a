//! Where evaluation reads names from.
//!
//! A [`Source`] resolves variables, JSON-backed objects and macros. Point
//! history and machine-learning models are optional capabilities layered on
//! top with [`WithServices`].

use std::sync::Arc;

use tx_ir::{PropertyBag, PropertyValue, TemporalFn, Value};

use crate::env::{Binding, Env, RegisteredFunction};

/// Name resolution for evaluation.
pub trait Source {
    /// Value of a variable, `None` when unknown.
    fn variable(&self, name: &str) -> Option<Value>;

    /// Object-shaped value of a variable, for `name.prop` lookups.
    fn object(&self, _name: &str) -> Option<PropertyValue> {
        None
    }

    /// A macro registered under `name`.
    fn function(&self, _name: &str) -> Option<RegisteredFunction> {
        None
    }

    fn temporal(&self) -> Option<&dyn TemporalSource> {
        None
    }

    fn ml_models(&self) -> Option<&dyn MlModels> {
        None
    }
}

impl<T: PropertyBag + ?Sized> Source for T {
    fn variable(&self, name: &str) -> Option<Value> {
        self.property(name).map(|p| Value::from(&p))
    }

    fn object(&self, name: &str) -> Option<PropertyValue> {
        self.property(name)
            .filter(|p| matches!(p, PropertyValue::Object(_)))
    }
}

impl Source for Env {
    fn variable(&self, name: &str) -> Option<Value> {
        self.get(name)?.to_value()
    }

    fn object(&self, name: &str) -> Option<PropertyValue> {
        match self.get(name)? {
            Binding::EnvValue(value) => value
                .object()
                .map(|map| PropertyValue::Object(map.into())),
            Binding::Expr(expr) => match expr.kind() {
                tx_ir::ExprKind::Object(map) => Some(PropertyValue::Object(map.clone())),
                _ => None,
            },
            _ => None,
        }
    }

    fn function(&self, name: &str) -> Option<RegisteredFunction> {
        self.try_get(name)
    }
}

/// History of points, for `AVERAGE(x, 1h)` and friends.
pub trait TemporalSource {
    /// Apply `func` to the history of `name` over the window that starts
    /// `period` seconds before `until` seconds ago. `None` when `name` has no
    /// history.
    fn window(&self, func: TemporalFn, name: &str, period: f64, until: f64) -> Option<Value>;
}

/// A runnable model.
pub trait MlModel: Send + Sync {
    fn run(&self, inputs: &[Value]) -> Value;
}

/// Lookup of models by function name.
pub trait MlModels: Send + Sync {
    fn model(&self, name: &str) -> Option<Arc<dyn MlModel>>;
}

/// A source with history and models attached.
pub struct WithServices<'a> {
    inner: &'a dyn Source,
    temporal: Option<&'a dyn TemporalSource>,
    ml_models: Option<&'a dyn MlModels>,
}

impl<'a> WithServices<'a> {
    pub fn new(inner: &'a dyn Source) -> Self {
        WithServices {
            inner,
            temporal: None,
            ml_models: None,
        }
    }

    #[must_use]
    pub fn with_temporal(mut self, temporal: &'a dyn TemporalSource) -> Self {
        self.temporal = Some(temporal);
        self
    }

    #[must_use]
    pub fn with_ml_models(mut self, models: &'a dyn MlModels) -> Self {
        self.ml_models = Some(models);
        self
    }
}

impl Source for WithServices<'_> {
    fn variable(&self, name: &str) -> Option<Value> {
        self.inner.variable(name)
    }

    fn object(&self, name: &str) -> Option<PropertyValue> {
        self.inner.object(name)
    }

    fn function(&self, name: &str) -> Option<RegisteredFunction> {
        self.inner.function(name)
    }

    fn temporal(&self) -> Option<&dyn TemporalSource> {
        self.temporal.or_else(|| self.inner.temporal())
    }

    fn ml_models(&self) -> Option<&dyn MlModels> {
        self.ml_models.or_else(|| self.inner.ml_models())
    }
}
