//! Identifier resolution.
//!
//! Order: `this` and the current twin's id, ignored names, environment
//! expressions and globals, reserved rule outputs, model ids, GUIDs (which
//! never resolve), other environment values, twin ids, graph nodes carrying
//! every tag in the name, and finally graph nodes whose id ends with the
//! name.

use std::sync::Arc;

use tx_eval::{Binding, RegisteredFunction};
use tx_ir::Expr;

use super::{keep_unit, BindToTwins};
use crate::services::Cached;

/// Outputs a rule computes about itself, left for the rule runtime.
const RESERVED: &[&str] = &[
    "TIME",
    "TIME_PERCENTAGE",
    "TOTAL",
    "COUNT",
    "CYCLES",
    "OVER",
    "LAST_TRIGGER_TIME",
    "NOW",
    "IS_FAULTY",
    "DELTA_TIME_S",
    "AREA_OUTSIDE",
];

pub(super) fn is_model_id(name: &str) -> bool {
    name.starts_with("dtmi:")
}

/// `8-4-4-4-12` hex digits, optionally braced, or 32 bare hex digits.
fn is_guid(name: &str) -> bool {
    let name = name
        .strip_prefix('{')
        .and_then(|inner| inner.strip_suffix('}'))
        .unwrap_or(name);
    let hex = |part: &str, len: usize| {
        part.len() == len && part.bytes().all(|b| b.is_ascii_hexdigit())
    };
    if hex(name, 32) {
        return true;
    }
    let parts: Vec<&str> = name.split('-').collect();
    parts.len() == 5
        && parts
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(part, len)| hex(part, len))
}

impl BindToTwins {
    pub(super) fn variable(&mut self, expr: &Expr, name: &str) -> Expr {
        if name == "this" || name == self.twin.id {
            return Expr::twin(Arc::clone(&self.twin));
        }

        if self.ignored.iter().any(|ignored| ignored == name) {
            return expr.clone();
        }

        let bound = self.env.bound_value(name);
        let units = bound.as_ref().and_then(|b| b.units.clone());
        match bound.map(|b| b.value) {
            Some(Binding::Expr(value)) => {
                return keep_unit(self.from_env(value), units.as_deref().or(expr.unit()));
            }
            Some(Binding::Function(function)) => return self.global(expr, function),
            Some(other) => {
                if RESERVED.contains(&name) {
                    return expr.clone();
                }
                if let Some(value) = other.to_expr() {
                    return keep_unit(value, units.as_deref().or(expr.unit()));
                }
            }
            None => {}
        }

        if RESERVED.contains(&name) {
            return expr.clone();
        }

        if is_model_id(name) {
            return self.model_id(expr, name);
        }

        if is_guid(name) {
            tracing::debug!(name, "guid cannot be bound");
            self.success = false;
            return expr.clone();
        }

        if let Some(twin) = self.twin_by_id(name) {
            return Expr::twin(twin);
        }

        if let Some(twin) = self
            .twin_by_tags(name)
            .or_else(|| self.twin_by_id_suffix(name))
        {
            let bound = Expr::twin(twin);
            // Later references to the same name skip the graph scan.
            if let Ok(env) = self.env.assign(name, bound.clone()) {
                self.env = env;
            }
            return bound;
        }

        self.fail(expr.clone(), "Could not resolve variable")
    }

    /// An expression bound earlier, by the caller or by another rule.
    fn from_env(&mut self, value: Expr) -> Expr {
        if value.is_failed() {
            self.success = false;
            return value;
        }
        if let Some(failed) = value
            .as_array()
            .and_then(|items| items.iter().find(|item| item.is_failed()))
        {
            self.success = false;
            return failed.clone();
        }
        value
    }

    /// A macro used without arguments.
    fn global(&mut self, expr: &Expr, function: RegisteredFunction) -> Expr {
        if function.body.is_failed() {
            self.success = false;
        }
        if !function.params.is_empty() {
            return self.fail(
                expr.clone(),
                format!("{} parameters expected for global", function.params.len()),
            );
        }
        let (bound, ok) = self.bind_in_root(&function.body);
        self.success &= ok;
        bound
    }

    /// Twins related to the current one whose model is `model`.
    ///
    /// Direct neighbours are tried first, then the rest of the graph in
    /// rings of increasing distance. Exact model matches beat inherited
    /// ones. Each twin is counted once however many relationships lead to
    /// it.
    fn model_id(&mut self, expr: &Expr, model: &str) -> Expr {
        let Some((graph, start)) = self
            .graph()
            .and_then(|graph| graph.find(&self.twin.id).map(|start| (graph, start)))
        else {
            return self.fail(
                expr.clone(),
                format!("Could not find twin id in graph '{}'", self.twin.id),
            );
        };

        let models = Arc::clone(&self.services.models);
        let mut exact = Vec::new();
        let mut inherited = Vec::new();
        let classify = |node: usize, exact: &mut Vec<usize>, inherited: &mut Vec<usize>| {
            let model_id = &graph.twin(node).model_id;
            if model_id == model {
                exact.push(node);
            } else if models.inherits_from(model_id, model) {
                inherited.push(node);
            }
        };

        for node in graph.backward_neighbours(start) {
            classify(node, &mut exact, &mut inherited);
        }

        if exact.is_empty() && inherited.is_empty() {
            let anywhere = graph.nodes().iter().enumerate().any(|(node, twin)| {
                node != start && models.inherits_from_or_equal(&twin.model_id, model)
            });
            if anywhere {
                for layer in self.layers(&graph, start).iter() {
                    for &node in layer {
                        classify(node, &mut exact, &mut inherited);
                    }
                    if !exact.is_empty() || !inherited.is_empty() {
                        break;
                    }
                }
            }
        }

        let ignored = |node: &usize| self.is_ignored_twin(&graph.twin(*node).id);
        exact.retain(|node| !ignored(node));
        inherited.retain(|node| !ignored(node));
        let matches = if exact.is_empty() { inherited } else { exact };
        tracing::debug!(model, matches = matches.len(), twin = %self.twin.id, "model id lookup");
        match matches.as_slice() {
            [] => self.fail(expr.clone(), "No twin matches found"),
            [node] => Expr::twin(Arc::clone(graph.twin(*node))),
            nodes => Expr::array(
                nodes
                    .iter()
                    .map(|&node| Expr::twin(Arc::clone(graph.twin(node))))
                    .collect(),
            ),
        }
    }

    /// Look a name up as a twin id. Names that cannot be ids are skipped and
    /// recent misses are not retried.
    pub(super) fn twin_by_id(&self, id: &str) -> Option<tx_ir::TwinRef> {
        if id.starts_with("dtmi:com:") || id.contains(' ') || id.len() < 6 {
            return None;
        }
        if id == self.twin.id {
            return Some(Arc::clone(&self.twin));
        }
        if self.services.known_bad.contains(id) {
            return None;
        }

        let twins = &self.services.twins;
        let key = format!("twin:{id}");
        let found = self
            .services
            .cache
            .get_or_load(self.scope, &key, &mut || twins.twin(id).map(Cached::Twin));
        match found {
            Some(Cached::Twin(twin)) => Some(twin),
            _ => {
                tracing::debug!(id, "twin lookup missed");
                self.services.known_bad.remember(id);
                None
            }
        }
    }

    fn is_ignored_twin(&self, id: &str) -> bool {
        self.ignored_twins.iter().any(|ignored| ignored == id)
    }

    /// The first graph node tagged with every word of `name`.
    fn twin_by_tags(&mut self, name: &str) -> Option<tx_ir::TwinRef> {
        let graph = self.graph()?;
        let found = graph
            .nodes()
            .iter()
            .find(|twin| twin.has_tags(name) && !self.is_ignored_twin(&twin.id))
            .cloned();
        if let Some(twin) = &found {
            tracing::debug!(name, twin = %twin.id, "matched by tags");
        }
        found
    }

    /// A graph node whose id ends with `name`, ignoring case.
    fn twin_by_id_suffix(&mut self, name: &str) -> Option<tx_ir::TwinRef> {
        let graph = self.graph()?;
        let suffix = name.to_ascii_lowercase();
        graph
            .nodes()
            .iter()
            .find(|twin| twin.id.to_ascii_lowercase().ends_with(&suffix))
            .cloned()
    }
}
