//! `target.name` once the target is bound.

use std::sync::Arc;

use tx_ir::{Expr, ExprKind, PropertyMap, PropertyValue, TwinRef};

use super::variables::is_model_id;
use super::{keep_unit, BindToTwins};
use crate::graph::relation;

/// Failures kept inside an array property failure.
const MAX_REPORTED_FAILURES: usize = 10;

/// `name` in `contents`, or a dotted path into nested objects.
fn content<'a>(contents: &'a PropertyMap, name: &str) -> Option<&'a PropertyValue> {
    if let Some(value) = contents.get(name) {
        return Some(value);
    }
    let (head, rest) = name.split_once('.')?;
    match contents.get(head)? {
        PropertyValue::Object(inner) => content(inner, rest),
        _ => None,
    }
}

impl BindToTwins {
    pub(super) fn property(&mut self, expr: &Expr, target: &Expr, name: &str) -> Expr {
        let bound = self.visit(target);
        match bound.kind() {
            ExprKind::Twin(twin) => {
                let twin = Arc::clone(twin);
                self.twin_property(expr, bound, &twin, name)
            }
            ExprKind::Object(map) => self.object_property(expr, map, name),
            ExprKind::Array(items) => {
                let items = items.clone();
                self.array_property(expr, &items, name)
            }
            ExprKind::Failed { .. } => {
                self.success = false;
                bound
            }
            _ => Expr::property(bound, name).with_unit_opt(expr.unit()),
        }
    }

    fn twin_property(&mut self, expr: &Expr, bound: Expr, twin: &TwinRef, name: &str) -> Expr {
        if let Some(value) = content(&twin.contents, name) {
            return match Expr::from_property_value(value) {
                Some(value) => keep_unit(value, expr.unit()),
                None => self.fail(
                    expr.clone(),
                    format!("Invalid object null for {name}. Wrapped twin {}", twin.id),
                ),
            };
        }

        if is_model_id(name) {
            let mut child = self.recurse_into(Arc::clone(twin), &self.env);
            let found = child.visit(&Expr::variable(name));
            self.success &= child.success;
            if !child.success {
                return self.fail(
                    found,
                    format!("Subvisitor failed for property {expr}. Wrapped twin {}", twin.id),
                );
            }
            return found;
        }

        if name == "parent" {
            return match self.parent_of(twin) {
                Some(parent) => Expr::twin(parent),
                None => self.fail(expr.clone(), "Could not resolve property"),
            };
        }

        if name.eq_ignore_ascii_case("contents") {
            return self.fail(expr.clone(), "Cannot evaluate the Contents property");
        }

        if let Some(value) = twin.field(name).as_ref().and_then(Expr::from_property_value) {
            return value;
        }

        if self.services.models.is_text_based_telemetry(&twin.model_id) {
            // Event and JSON points expose their fields only at run time.
            return Expr::property(bound, name).with_unit_opt(expr.unit());
        }

        tracing::debug!(property = name, twin = %twin.id, "missing property");
        self.fail(expr.clone(), format!("Missing property for twin {}", twin.id))
    }

    /// The twin that `twin` is a capability of, else the space it is located in.
    fn parent_of(&self, twin: &TwinRef) -> Option<TwinRef> {
        let graph = if twin.id == self.twin.id {
            self.graph.clone().or_else(|| self.load_graph(&twin.id))
        } else {
            self.load_graph(&twin.id)
        }?;
        let node = graph.find(&twin.id)?;
        graph
            .follow(node, relation::IS_CAPABILITY_OF)
            .or_else(|| graph.follow(node, relation::LOCATED_IN))
            .map(|parent| Arc::clone(graph.twin(parent)))
    }

    fn object_property(&mut self, expr: &Expr, map: &PropertyMap, name: &str) -> Expr {
        match map.get(name) {
            Some(PropertyValue::Null) => Expr::null(),
            Some(value) => Expr::from_property_value(value)
                .map_or_else(Expr::null, |value| keep_unit(value, expr.unit())),
            None => self.fail(expr.clone(), "Could not resolve property"),
        }
    }

    /// `{a,b}.name` reads `name` from every element that has it. Elements
    /// without it are dropped.
    fn array_property(&mut self, expr: &Expr, items: &[Expr], name: &str) -> Expr {
        let mut results = Vec::new();
        let mut failures = Vec::new();
        for item in items {
            let access = Expr::property(item.clone(), name).with_unit_opt(expr.unit());
            let (bound, ok) = self.bind_in_root(&access);
            if !ok {
                failures.push(bound);
                continue;
            }
            match bound.as_array() {
                Some(inner) => results.extend(inner.iter().cloned()),
                None => results.push(bound),
            }
        }

        if results.len() == 1 {
            return results.remove(0);
        }

        self.success &= !results.is_empty();
        if self.success {
            return Expr::array(results);
        }
        if results.is_empty() && !failures.is_empty() {
            let count = failures.len();
            failures.truncate(MAX_REPORTED_FAILURES);
            return self.fail(
                Expr::array(failures),
                format!("Property access as Array no valid children (out of {count})"),
            );
        }
        self.fail(Expr::array(results), "Property access as Array failed")
    }
}
