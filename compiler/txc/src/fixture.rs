//! JSON fixtures: a building to bind against and an environment to evaluate in.
//!
//! A building file lists twins, relationships and model inheritance:
//!
//! ```json
//! {
//!   "twins": [{ "id": "AHU-01", "modelId": "dtmi:acme:AHU;1" }],
//!   "relationships": [{ "source": "SAT-01", "name": "isCapabilityOf", "target": "AHU-01" }],
//!   "models": { "dtmi:acme:SAT;1": ["dtmi:acme:AirTemperature;1"] },
//!   "textBased": []
//! }
//! ```
//!
//! An environment file holds variables and macros:
//!
//! ```json
//! {
//!   "variables": { "setpoint": 21.5, "mode": { "name": "cool" } },
//!   "units": { "setpoint": "degC" },
//!   "functions": [{ "name": "DOUBLE", "params": ["v"], "body": "v * 2" }]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use tx_bind::testing::{services, InMemoryModels, InMemoryTwins};
use tx_bind::{BindServices, TwinGraph};
use tx_eval::{Binding, Env, EnvError, EnvValue, RegisteredFunction};
use tx_ir::{Twin, TwinRef, Value};

/// Errors loading a fixture.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("error reading '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid fixture '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("relationship {source_id} -{name}-> {target} names an unknown twin")]
    UnknownRelationshipEnd {
        source_id: String,
        name: String,
        target: String,
    },

    #[error("function '{name}' does not parse: {message}")]
    FunctionBody { name: String, message: String },

    #[error(transparent)]
    Env(#[from] EnvError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildingFixture {
    pub twins: Vec<Twin>,
    pub relationships: Vec<RelationshipFixture>,
    pub models: FxHashMap<String, Vec<String>>,
    pub text_based: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RelationshipFixture {
    pub source: String,
    pub name: String,
    pub target: String,
}

/// A loaded building: its twins and the services a binder needs.
pub struct Building {
    pub twins: Arc<InMemoryTwins>,
    pub services: BindServices,
}

impl Building {
    pub fn twin(&self, id: &str) -> Option<TwinRef> {
        let graph = self.twins.building();
        graph.find(id).map(|node| Arc::clone(graph.twin(node)))
    }
}

impl BuildingFixture {
    pub fn from_json(path: &str, text: &str) -> Result<Self, FixtureError> {
        serde_json::from_str(text).map_err(|source| FixtureError::Json {
            path: path.to_owned(),
            source,
        })
    }

    pub fn into_building(self) -> Result<Building, FixtureError> {
        let mut graph = TwinGraph::new();
        for twin in self.twins {
            graph.add_twin(twin.into_ref());
        }
        for rel in self.relationships {
            if !graph.relate(&rel.source, &rel.name, &rel.target) {
                return Err(FixtureError::UnknownRelationshipEnd {
                    source_id: rel.source,
                    name: rel.name,
                    target: rel.target,
                });
            }
        }

        let mut models = InMemoryModels::new();
        for (model, parents) in &self.models {
            for parent in parents {
                models = models.with_extends(model, parent);
            }
        }
        for model in &self.text_based {
            models = models.with_text_based(model);
        }

        tracing::debug!(twins = graph.len(), edges = graph.edges().len(), "loaded building");
        let twins = Arc::new(InMemoryTwins::new(graph));
        let services = services(&twins, models);
        Ok(Building { twins, services })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EnvFixture {
    pub variables: serde_json::Map<String, serde_json::Value>,
    pub units: FxHashMap<String, String>,
    pub functions: Vec<FunctionFixture>,
}

#[derive(Debug, Deserialize)]
pub struct FunctionFixture {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    pub body: String,
}

impl EnvFixture {
    pub fn from_json(path: &str, text: &str) -> Result<Self, FixtureError> {
        serde_json::from_str(text).map_err(|source| FixtureError::Json {
            path: path.to_owned(),
            source,
        })
    }

    /// One pushed frame holding every variable and function.
    pub fn into_env(self) -> Result<Env, FixtureError> {
        let mut env = Env::empty().push();
        for (name, json) in self.variables {
            let unit = self.units.get(&name).map(String::as_str);
            env = env.assign_with_units(&name, binding_of(json), unit)?;
        }
        for function in self.functions {
            let body = tx_parse::parse(&function.body).map_err(|e| FixtureError::FunctionBody {
                name: function.name.clone(),
                message: e.to_string(),
            })?;
            let name = function.name.clone();
            env = env.assign(&name, RegisteredFunction::new(function.name, function.params, body))?;
        }
        Ok(env)
    }
}

/// Scalars become values; objects keep their JSON text for `name.prop`.
fn binding_of(json: serde_json::Value) -> Binding {
    match json {
        serde_json::Value::Null => Binding::Value(Value::Null),
        serde_json::Value::Bool(b) => Binding::Value(Value::Bool(b)),
        serde_json::Value::Number(n) => Binding::Value(n.as_f64().map_or(Value::Undefined, Value::Double)),
        serde_json::Value::String(s) => Binding::Value(Value::String(s)),
        serde_json::Value::Array(items) => Binding::Value(Value::Array(
            items
                .into_iter()
                .filter_map(|item| binding_of(item).to_value())
                .collect(),
        )),
        object @ serde_json::Value::Object(_) => {
            Binding::EnvValue(EnvValue::new(Value::Undefined).with_text(object.to_string()))
        }
    }
}

/// Read a fixture file.
pub fn read(path: impl AsRef<Path>) -> Result<String, FixtureError> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
        path: path.display().to_string(),
        source,
    })
}
