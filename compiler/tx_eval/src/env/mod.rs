//! Binding environment.
//!
//! An [`Env`] is a persistent chain of frames. Frames are shared through
//! `Rc`; `assign` copies only the innermost frame and returns a new `Env`,
//! so an environment handed to a visitor can never change underneath it.
//!
//! Names are case-insensitive. The root frame is never written to: callers
//! must `push()` before they `assign()`.

use std::fmt::{self, Write as _};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;
use tx_ir::{Expr, Value};

/// Error returned by [`Env::assign`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EnvError {
    /// The environment has no frame of its own yet.
    #[error("cannot assign to the root environment, push a frame first")]
    AssignToRoot,
}

/// A named expression with parameters, callable from other expressions.
#[derive(Clone, Debug, PartialEq)]
pub struct RegisteredFunction {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
}

impl RegisteredFunction {
    pub fn new(name: impl Into<String>, params: Vec<String>, body: Expr) -> Self {
        RegisteredFunction {
            name: name.into(),
            params,
            body,
        }
    }
}

/// A scalar with an optional raw JSON rendering of the same value.
///
/// `var.prop` on an `EnvValue` reads `prop` out of the JSON text.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvValue {
    pub value: Value,
    pub text: Option<String>,
}

impl EnvValue {
    pub fn new(value: impl Into<Value>) -> Self {
        EnvValue {
            value: value.into(),
            text: None,
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// The text parsed as a JSON object, if it is one.
    pub fn object(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        match serde_json::from_str(self.text.as_deref()?) {
            Ok(serde_json::Value::Object(map)) => Some(map),
            _ => None,
        }
    }
}

/// What a name can be bound to.
#[derive(Clone, Debug, PartialEq)]
pub enum Binding {
    Expr(Expr),
    Value(Value),
    EnvValue(EnvValue),
    Function(RegisteredFunction),
}

impl Binding {
    /// The binding as an expression, when it has one.
    pub fn to_expr(&self) -> Option<Expr> {
        match self {
            Binding::Expr(expr) => Some(expr.clone()),
            Binding::Value(value) | Binding::EnvValue(EnvValue { value, .. }) => {
                Expr::from_value(value)
            }
            Binding::Function(_) => None,
        }
    }

    /// The binding as a value, when it is constant.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Binding::Value(value) | Binding::EnvValue(EnvValue { value, .. }) => Some(value.clone()),
            Binding::Expr(expr) => constant_of(expr),
            Binding::Function(_) => None,
        }
    }
}

fn constant_of(expr: &Expr) -> Option<Value> {
    if let Some(value) = expr.constant_value() {
        return Some(value);
    }
    if let Some(twin) = expr.as_twin() {
        return Some(Value::Twin(twin.clone()));
    }
    let items = expr.as_array()?;
    items
        .iter()
        .map(constant_of)
        .collect::<Option<Vec<_>>>()
        .map(Value::Array)
}

impl From<Expr> for Binding {
    fn from(expr: Expr) -> Self {
        Binding::Expr(expr)
    }
}

impl From<Value> for Binding {
    fn from(value: Value) -> Self {
        Binding::Value(value)
    }
}

impl From<EnvValue> for Binding {
    fn from(value: EnvValue) -> Self {
        Binding::EnvValue(value)
    }
}

impl From<RegisteredFunction> for Binding {
    fn from(function: RegisteredFunction) -> Self {
        Binding::Function(function)
    }
}

impl From<f64> for Binding {
    fn from(value: f64) -> Self {
        Binding::Value(Value::Double(value))
    }
}

impl From<bool> for Binding {
    fn from(value: bool) -> Self {
        Binding::Value(Value::Bool(value))
    }
}

impl From<&str> for Binding {
    fn from(value: &str) -> Self {
        Binding::Value(Value::String(value.to_owned()))
    }
}

/// A visible binding together with its unit of measure.
///
/// Equality compares name and value only. Two bindings of the same reading
/// in different units are the same binding.
#[derive(Clone, Debug)]
pub struct BoundValue {
    pub name: String,
    pub value: Binding,
    pub units: Option<String>,
}

impl PartialEq for BoundValue {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value
    }
}

/// Typed extraction for [`Env::try_get`].
pub trait FromBinding: Sized {
    fn from_binding(binding: &Binding) -> Option<Self>;
}

impl FromBinding for Binding {
    fn from_binding(binding: &Binding) -> Option<Self> {
        Some(binding.clone())
    }
}

impl FromBinding for Expr {
    fn from_binding(binding: &Binding) -> Option<Self> {
        binding.to_expr()
    }
}

impl FromBinding for Value {
    fn from_binding(binding: &Binding) -> Option<Self> {
        binding.to_value()
    }
}

impl FromBinding for EnvValue {
    fn from_binding(binding: &Binding) -> Option<Self> {
        match binding {
            Binding::EnvValue(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl FromBinding for RegisteredFunction {
    fn from_binding(binding: &Binding) -> Option<Self> {
        match binding {
            Binding::Function(function) => Some(function.clone()),
            _ => None,
        }
    }
}

impl FromBinding for f64 {
    fn from_binding(binding: &Binding) -> Option<Self> {
        match binding.to_value()? {
            Value::Double(d) => Some(d),
            _ => None,
        }
    }
}

impl FromBinding for bool {
    fn from_binding(binding: &Binding) -> Option<Self> {
        match binding.to_value()? {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl FromBinding for String {
    fn from_binding(binding: &Binding) -> Option<Self> {
        match binding.to_value()? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
struct Entry {
    name: String,
    binding: Binding,
    units: Option<String>,
}

impl Entry {
    fn to_bound_value(&self) -> BoundValue {
        BoundValue {
            name: self.name.clone(),
            value: self.binding.clone(),
            units: self.units.clone(),
        }
    }
}

#[derive(Debug)]
struct Frame {
    id: u64,
    bindings: FxHashMap<String, Entry>,
    parent: Option<Rc<Frame>>,
}

static NEXT_FRAME_ID: AtomicU64 = AtomicU64::new(0);

impl Frame {
    fn new(bindings: FxHashMap<String, Entry>, parent: Option<Rc<Frame>>) -> Rc<Self> {
        Rc::new(Frame {
            id: NEXT_FRAME_ID.fetch_add(1, Ordering::Relaxed),
            bindings,
            parent,
        })
    }

    fn ancestors(self: &Rc<Self>) -> impl Iterator<Item = &Frame> {
        std::iter::successors(Some(&**self), |frame| frame.parent.as_deref())
    }
}

fn key(name: &str) -> String {
    name.to_lowercase()
}

/// A persistent scope chain.
#[derive(Clone, Debug)]
pub struct Env {
    top: Rc<Frame>,
}

impl Env {
    /// A root environment with no bindings.
    pub fn empty() -> Self {
        Env {
            top: Frame::new(FxHashMap::default(), None),
        }
    }

    /// Identity of the innermost frame. Changes on every `push` and `assign`.
    pub fn id(&self) -> u64 {
        self.top.id
    }

    /// A new environment with an empty frame on top of this one.
    #[must_use]
    pub fn push(&self) -> Env {
        Env {
            top: Frame::new(FxHashMap::default(), Some(Rc::clone(&self.top))),
        }
    }

    /// The enclosing environment, `None` at the root.
    pub fn pop(&self) -> Option<Env> {
        self.top.parent.as_ref().map(|parent| Env {
            top: Rc::clone(parent),
        })
    }

    pub fn is_root(&self) -> bool {
        self.top.parent.is_none()
    }

    /// Bind `name` in the innermost frame.
    pub fn assign(&self, name: &str, value: impl Into<Binding>) -> Result<Env, EnvError> {
        self.assign_with_units(name, value, None)
    }

    /// Bind `name` in the innermost frame, recording its unit of measure.
    pub fn assign_with_units(
        &self,
        name: &str,
        value: impl Into<Binding>,
        units: Option<&str>,
    ) -> Result<Env, EnvError> {
        let Some(parent) = &self.top.parent else {
            return Err(EnvError::AssignToRoot);
        };
        let mut bindings = self.top.bindings.clone();
        bindings.insert(
            key(name),
            Entry {
                name: name.to_owned(),
                binding: value.into(),
                units: units.map(str::to_owned),
            },
        );
        Ok(Env {
            top: Frame::new(bindings, Some(Rc::clone(parent))),
        })
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        let key = key(name);
        self.top
            .ancestors()
            .find_map(|frame| frame.bindings.get(&key))
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// The nearest binding of `name`.
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.entry(name).map(|entry| &entry.binding)
    }

    /// The nearest binding of `name` with its units.
    pub fn bound_value(&self, name: &str) -> Option<BoundValue> {
        self.entry(name).map(Entry::to_bound_value)
    }

    /// The nearest binding of `name` converted to `T`.
    ///
    /// `None` when the name is unbound or holds something else.
    pub fn try_get<T: FromBinding>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(T::from_binding)
    }

    /// Every visible name, innermost frame first.
    pub fn variables(&self) -> Vec<String> {
        self.bound_values().into_iter().map(|bv| bv.name).collect()
    }

    /// Every visible binding, innermost frame first. Shadowed bindings are
    /// omitted.
    pub fn bound_values(&self) -> Vec<BoundValue> {
        let mut seen = rustc_hash::FxHashSet::default();
        let mut result = Vec::new();
        for frame in self.top.ancestors() {
            let mut entries: Vec<_> = frame.bindings.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (key, entry) in entries {
                if seen.insert(key.clone()) {
                    result.push(entry.to_bound_value());
                }
            }
        }
        result
    }

    /// A single new frame on top of `self` holding everything visible in
    /// `other`. Bindings from `other` win.
    #[must_use]
    pub fn merge(&self, other: &Env) -> Env {
        let bindings = other
            .bound_values()
            .into_iter()
            .map(|bv| {
                (
                    key(&bv.name),
                    Entry {
                        name: bv.name,
                        binding: bv.value,
                        units: bv.units,
                    },
                )
            })
            .collect();
        Env {
            top: Frame::new(bindings, Some(Rc::clone(&self.top))),
        }
    }

    pub fn depth(&self) -> usize {
        self.top.ancestors().count()
    }

    /// Multi-line listing of every frame, innermost first.
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        for (depth, frame) in self.top.ancestors().enumerate() {
            let _ = writeln!(out, "frame {depth}:");
            let mut entries: Vec<_> = frame.bindings.values().collect();
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            for entry in entries {
                let _ = write!(out, "  {} = {}", entry.name, DisplayBinding(&entry.binding));
                if let Some(units) = &entry.units {
                    let _ = write!(out, " [{units}]");
                }
                out.push('\n');
            }
        }
        out
    }
}

impl Default for Env {
    fn default() -> Self {
        Env::empty()
    }
}

impl PartialEq for Env {
    /// Frame by frame; units are not compared.
    fn eq(&self, other: &Self) -> bool {
        let mut left = self.top.ancestors();
        let mut right = other.top.ancestors();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some(a), Some(b)) => {
                    let same = a.bindings.len() == b.bindings.len()
                        && a.bindings.iter().all(|(key, entry)| {
                            b.bindings
                                .get(key)
                                .is_some_and(|other| other.binding == entry.binding)
                        });
                    if !same {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }
}

struct DisplayBinding<'a>(&'a Binding);

impl fmt::Display for DisplayBinding<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Binding::Expr(expr) => write!(f, "{expr}"),
            Binding::Value(value) => write!(f, "{value}"),
            Binding::EnvValue(value) => match &value.text {
                Some(text) => write!(f, "{} {text}", value.value),
                None => write!(f, "{}", value.value),
            },
            Binding::Function(function) => {
                write!(f, "{}({}) => {}", function.name, function.params.join(", "), function.body)
            }
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
