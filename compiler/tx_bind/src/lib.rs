//! Binding twin expressions to the twin graph.
//!
//! [`BindToTwins`] rewrites a parsed rule expression, centred on one twin,
//! into a tree that can be evaluated: variables become environment values
//! or [`Twin`](tx_ir::Twin) nodes, `[dtmi:...]` model ids become the related
//! twins of that model, unit coercions become arithmetic, and array operands
//! fold the surrounding operator over their elements.
//!
//! What the binder needs from the outside world is behind the traits in
//! [`BindServices`]: twin lookup, relationship graphs, model inheritance and
//! a read-through cache. [`testing`] has in-memory versions.

mod binder;
mod errors;
pub mod graph;
mod options;
mod services;
pub mod testing;

pub use binder::BindToTwins;
pub use errors::BindError;
pub use graph::{Relation, TwinGraph};
pub use options::BindOptions;
pub use services::{BindCache, BindServices, Cached, MemoryCache, ModelService, TwinLookup, TwinSystem};
