//! The binding visitor.
//!
//! [`BindToTwins`] walks an expression centred on one twin and replaces
//! every name it can resolve: environment bindings, `this`, model ids in
//! the twin's relationship graph, twin properties. Anything it cannot
//! resolve becomes a `FAILED(reason, expr)` node and clears
//! [`success`](BindToTwins::success). Binding never returns an error.
//!
//! # Sub-binders
//!
//! Arguments, branches and fold elements are bound by short-lived child
//! binders over a pushed environment. A child inherits the parent's array
//! count, so nested folds share one budget, but its count and success flag
//! only flow back where the parent asks for them. That is how `OPTION` and
//! `TOLERANTOPTION` absorb failures.

mod calls;
mod operators;
mod properties;
mod variables;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tx_eval::Env;
use tx_ir::stack::ensure_sufficient_stack;
use tx_ir::{Expr, ExprKind, TwinRef};

use crate::errors::BindError;
use crate::graph::TwinGraph;
use crate::options::BindOptions;
use crate::services::{BindServices, Cached};

/// Per-call memo shared by a binder and all of its children.
#[derive(Default)]
struct Lookups {
    /// Graph nodes grouped by distance, per start twin.
    layers: FxHashMap<String, Rc<Vec<Vec<usize>>>>,
}

/// Binds expressions to twins. See the module docs.
pub struct BindToTwins {
    env: Env,
    twin: TwinRef,
    services: BindServices,
    ignored: Rc<[String]>,
    ignored_twins: Rc<[String]>,
    graph: Option<Arc<TwinGraph>>,
    lookups: Rc<RefCell<Lookups>>,
    /// Cache scope: the id of the environment the caller handed in.
    scope: u64,
    array_count: usize,
    max_array_count: usize,
    configured_max: usize,
    success: bool,
}

impl BindToTwins {
    pub fn new(env: &Env, twin: TwinRef, services: BindServices) -> Self {
        Self::with_options(env, twin, services, BindOptions::default())
    }

    pub fn with_options(
        env: &Env,
        twin: TwinRef,
        services: BindServices,
        options: BindOptions,
    ) -> Self {
        BindToTwins {
            scope: env.id(),
            env: env.push(),
            twin,
            services,
            ignored: options.ignored.into(),
            ignored_twins: options.ignored_twins.into(),
            graph: options.root_graph,
            lookups: Rc::default(),
            array_count: 0,
            max_array_count: options.max_array_count,
            configured_max: options.max_array_count,
            success: true,
        }
    }

    /// Whether everything bound so far resolved.
    pub fn success(&self) -> bool {
        self.success
    }

    /// The binder's environment, including names it memoised while binding.
    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn twin(&self) -> &TwinRef {
        &self.twin
    }

    /// Bind one expression.
    #[tracing::instrument(level = "debug", skip_all, fields(twin = %self.twin.id))]
    pub fn bind(&mut self, expr: &Expr) -> Expr {
        let bound = self.visit(expr);
        tracing::debug!(success = self.success, "bound expression");
        bound
    }

    /// Bind expressions in order, checking `cancel` before each one.
    pub fn bind_all(
        &mut self,
        exprs: &[Expr],
        cancel: Option<&AtomicBool>,
    ) -> Result<Vec<Expr>, BindError> {
        let mut bound = Vec::with_capacity(exprs.len());
        for expr in exprs {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                tracing::debug!(completed = bound.len(), "binding cancelled");
                return Err(BindError::Cancelled {
                    completed: bound.len(),
                });
            }
            bound.push(self.bind(expr));
        }
        Ok(bound)
    }

    fn visit(&mut self, expr: &Expr) -> Expr {
        ensure_sufficient_stack(|| self.visit_inner(expr))
    }

    fn visit_inner(&mut self, expr: &Expr) -> Expr {
        match expr.kind() {
            ExprKind::Null
            | ExprKind::Bool(_)
            | ExprKind::Double(_)
            | ExprKind::Str(_)
            | ExprKind::DateTime(_)
            | ExprKind::Twin(_)
            | ExprKind::Object(_) => expr.clone(),
            ExprKind::Variable(name) => self.variable(expr, name),
            ExprKind::Property { target, name } => self.property(expr, target, name),
            ExprKind::Array(_) => expr.map_children(|item| self.visit(item)),
            ExprKind::Unary { op, operand } => self.unary(expr, *op, operand),
            ExprKind::Binary { op, left, right } => self.binary(expr, *op, left, right),
            ExprKind::Nary { op, children } => self.nary(expr, *op, children),
            ExprKind::If {
                cond,
                then,
                otherwise,
            } => self.if_(expr, [&**cond, &**then, &**otherwise]),
            ExprKind::Call { name, args } => self.call(expr, name, args),
            ExprKind::Aggregate { func, arg } => self.aggregate(expr, *func, arg),
            ExprKind::Temporal { .. } => self.temporal(expr),
            ExprKind::Each { list, var, body } => self.each(expr, list, var, body),
            ExprKind::Failed { .. } => {
                self.success = false;
                expr.clone()
            }
        }
    }

    fn child(&self, twin: TwinRef, env: Env, graph: Option<Arc<TwinGraph>>, max: usize) -> Self {
        BindToTwins {
            env,
            twin,
            services: self.services.clone(),
            ignored: Rc::clone(&self.ignored),
            ignored_twins: Rc::clone(&self.ignored_twins),
            graph,
            lookups: Rc::clone(&self.lookups),
            scope: self.scope,
            array_count: self.array_count,
            max_array_count: max,
            configured_max: self.configured_max,
            success: true,
        }
    }

    /// A child centred on the same twin.
    fn recurse_into_root(&self) -> Self {
        self.child(
            Arc::clone(&self.twin),
            self.env.push(),
            self.graph.clone(),
            self.configured_max,
        )
    }

    /// A child centred on the same twin that may fold without limit.
    fn recurse_into_root_unlimited(&self) -> Self {
        self.child(
            Arc::clone(&self.twin),
            self.env.push(),
            self.graph.clone(),
            usize::MAX,
        )
    }

    /// A child centred on another twin, over `env`.
    fn recurse_into(&self, twin: TwinRef, env: &Env) -> Self {
        let graph = if twin.id == self.twin.id {
            self.graph.clone()
        } else {
            None
        };
        self.child(twin, env.push(), graph, self.configured_max)
    }

    /// Bind `expr` in a child and report whether it resolved, leaving this
    /// binder's success flag alone.
    fn bind_in_root(&self, expr: &Expr) -> (Expr, bool) {
        let mut child = self.recurse_into_root();
        let bound = child.visit(expr);
        (bound, child.success)
    }

    fn fail(&mut self, expr: Expr, reason: impl Into<String>) -> Expr {
        self.success = false;
        Expr::failed(reason, expr)
    }

    /// Apply `generator` to every element and bind the resulting array.
    ///
    /// Each element counts against the array budget; past it the fold stops
    /// with a failure holding the first element.
    fn fold(&mut self, items: &[Expr], mut generator: impl FnMut(Expr) -> Expr) -> Expr {
        let mut folded = Vec::with_capacity(items.len());
        for item in items {
            self.array_count += 1;
            if self.array_count > self.max_array_count {
                tracing::warn!(twin = %self.twin.id, max = self.max_array_count, "array limit reached");
                let first = items.iter().take(1).cloned().collect();
                return self.fail(
                    Expr::array(first),
                    format!("Max array count of {} reached", self.max_array_count),
                );
            }
            let (_, ok) = self.bind_in_root(item);
            self.success &= ok;
            folded.push(generator(item.clone()));
        }
        self.visit(&Expr::array(folded))
    }

    /// Relationship graph around `twin_id`, through the cache.
    fn load_graph(&self, twin_id: &str) -> Option<Arc<TwinGraph>> {
        let system = &self.services.twin_system;
        let key = format!("graph:{twin_id}");
        let loaded = self.services.cache.get_or_load(self.scope, &key, &mut || {
            system
                .graph(twin_id)
                .map(|graph| Cached::Graph(Arc::new(graph)))
        });
        match loaded {
            Some(Cached::Graph(graph)) => Some(graph),
            _ => {
                tracing::warn!(twin = twin_id, "no relationship graph");
                None
            }
        }
    }

    /// Graph around the current twin.
    fn graph(&mut self) -> Option<Arc<TwinGraph>> {
        if self.graph.is_none() {
            self.graph = self.load_graph(&self.twin.id);
        }
        self.graph.clone()
    }

    /// Nodes of `graph` by distance from `start`, memoised per twin.
    fn layers(&self, graph: &TwinGraph, start: usize) -> Rc<Vec<Vec<usize>>> {
        let mut lookups = self.lookups.borrow_mut();
        let layers = lookups
            .layers
            .entry(self.twin.id.clone())
            .or_insert_with(|| Rc::new(graph.layers(start)));
        Rc::clone(layers)
    }
}

/// `rebuilt` with the unit and source text of `original`.
fn like(original: &Expr, rebuilt: Expr) -> Expr {
    let rebuilt = rebuilt.with_unit_opt(original.unit());
    match original.text() {
        Some(text) => rebuilt.with_text(text),
        None => rebuilt,
    }
}

/// `bound` carrying `unit` unless it already has one.
fn keep_unit(bound: Expr, unit: Option<&str>) -> Expr {
    if bound.unit().is_some() {
        bound
    } else {
        bound.with_unit_opt(unit)
    }
}
