//! Helper registry and type-based dispatch.
//!
//! A helper is either *raw*, receiving its argument expressions unevaluated,
//! or *typed*, receiving evaluated values and choosing an implementation by
//! the runtime type of its first argument:
//!
//! 1. evaluate the arguments left to right
//! 2. demote exact decimals to native numbers, unless the helper handles them
//! 3. look up the implementation for the first argument's [`TypeTag`]
//! 4. on a miss, coerce the first argument to the first type in the helper's
//!    coercion list that has an implementation, and retry once
//! 5. otherwise fail with [`Error::NoOverload`]

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::ast::Expr;
use crate::error::{Error, Result};
use crate::evaluator::EvalContext;
use crate::number::Number;
use crate::value::{Map, TypeTag, Value};

/// A typed implementation: evaluated arguments in, value out.
pub type ValueFn = Arc<dyn Fn(&EvalContext<'_>, Vec<Value>) -> Result<Value> + Send + Sync>;

/// A raw implementation: it evaluates whichever argument expressions it needs.
pub type RawFn = Arc<dyn Fn(&EvalContext<'_>, &[Expr]) -> Result<Value> + Send + Sync>;

/// Documentation for a helper, used by introspection and the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HelperMeta {
    pub syntax: String,
    pub returns: String,
    pub description: String,
}

#[derive(Clone)]
pub enum HelperKind {
    Raw(RawFn),
    Typed(HashMap<TypeTag, ValueFn>),
}

/// A registered helper. Aliases and links share one record.
pub struct HelperRecord {
    pub name: String,
    pub kind: HelperKind,
    pub coerce: Vec<TypeTag>,
    pub handles_decimals: bool,
    pub meta: Option<HelperMeta>,
}

impl HelperRecord {
    fn implementation(&self, tag: TypeTag) -> Option<&ValueFn> {
        match &self.kind {
            HelperKind::Typed(overloads) => overloads.get(&tag),
            HelperKind::Raw(_) => None,
        }
    }
}

impl fmt::Debug for HelperRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            HelperKind::Raw(_) => "raw".to_string(),
            HelperKind::Typed(overloads) => {
                let mut tags: Vec<_> = overloads.keys().map(TypeTag::name).collect();
                tags.sort_unstable();
                tags.join(",")
            }
        };
        f.debug_struct("HelperRecord")
            .field("name", &self.name)
            .field("kind", &kind)
            .field("coerce", &self.coerce)
            .field("handles_decimals", &self.handles_decimals)
            .finish()
    }
}

/// Builder for a helper registration.
///
/// # Examples
///
/// ```
/// use sprig_lang::helpers::HelperDef;
/// use sprig_lang::{Engine, TypeTag, Value};
///
/// let mut engine = Engine::new();
/// engine.register_helper(
///     HelperDef::new("count")
///         .on(TypeTag::Array, |_, args| Ok(Value::from(args[0].as_array().map_or(0, |a| a.len()))))
///         .coerce(&[TypeTag::Array])
///         .meta("count( $list )", "Number of items", "Counts the items in a list."),
/// );
/// let result = engine.evaluate("count(undefined)", &Value::Null).unwrap();
/// assert_eq!(result, Value::from(0));
/// ```
pub struct HelperDef {
    name: String,
    raw: Option<RawFn>,
    overloads: HashMap<TypeTag, ValueFn>,
    wildcard: Option<ValueFn>,
    coerce: Vec<TypeTag>,
    handles_decimals: bool,
    meta: Option<HelperMeta>,
    aliases: Vec<String>,
}

impl HelperDef {
    /// A typed helper with no implementations yet.
    pub fn new(name: impl Into<String>) -> Self {
        HelperDef {
            name: name.into(),
            raw: None,
            overloads: HashMap::new(),
            wildcard: None,
            coerce: Vec::new(),
            handles_decimals: false,
            meta: None,
            aliases: Vec::new(),
        }
    }

    /// A helper that receives its arguments unevaluated.
    pub fn raw<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&EvalContext<'_>, &[Expr]) -> Result<Value> + Send + Sync + 'static,
    {
        let mut def = HelperDef::new(name);
        def.raw = Some(Arc::new(f));
        def
    }

    /// Implementation for a first argument of type `tag`.
    pub fn on<F>(mut self, tag: TypeTag, f: F) -> Self
    where
        F: Fn(&EvalContext<'_>, Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        self.overloads.insert(tag, Arc::new(f));
        self
    }

    /// One implementation shared by several types.
    pub fn on_each<F>(mut self, tags: &[TypeTag], f: F) -> Self
    where
        F: Fn(&EvalContext<'_>, Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        let f: ValueFn = Arc::new(f);
        for tag in tags {
            self.overloads.insert(*tag, Arc::clone(&f));
        }
        self
    }

    /// Implementation for every type without a specific one.
    pub fn any<F>(mut self, f: F) -> Self
    where
        F: Fn(&EvalContext<'_>, Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        self.wildcard = Some(Arc::new(f));
        self
    }

    /// Types to try converting the first argument to when no implementation
    /// matches it.
    pub fn coerce(mut self, order: &[TypeTag]) -> Self {
        self.coerce = order.to_vec();
        self
    }

    /// Receive exact decimals as they are instead of native numbers.
    pub fn handles_decimals(mut self) -> Self {
        self.handles_decimals = true;
        self
    }

    pub fn meta(mut self, syntax: &str, returns: &str, description: &str) -> Self {
        self.meta = Some(HelperMeta {
            syntax: syntax.to_string(),
            returns: returns.to_string(),
            description: description.to_string(),
        });
        self
    }

    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.aliases.push(name.into());
        self
    }

    fn build(self) -> (HelperRecord, Vec<String>) {
        let kind = match self.raw {
            Some(raw) => HelperKind::Raw(raw),
            None => {
                let mut overloads = self.overloads;
                if let Some(wildcard) = self.wildcard {
                    // Specific implementations win over the wildcard
                    for tag in TypeTag::ALL {
                        overloads.entry(tag).or_insert_with(|| Arc::clone(&wildcard));
                    }
                }
                HelperKind::Typed(overloads)
            }
        };
        let record = HelperRecord {
            name: self.name,
            kind,
            coerce: self.coerce,
            handles_decimals: self.handles_decimals,
            meta: self.meta,
        };
        (record, self.aliases)
    }
}

/// Named helpers available to expressions.
///
/// Registration is expected at setup time. Mutating a registry while
/// evaluations that use it are running requires external synchronization,
/// which `&mut` access through [`Engine`](crate::Engine) enforces.
#[derive(Debug, Default)]
pub struct HelperRegistry {
    helpers: HashMap<String, Arc<HelperRecord>>,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a helper under its name and aliases, replacing any helper
    /// already registered under those names.
    pub fn register(&mut self, def: HelperDef) {
        let (record, aliases) = def.build();
        if record.meta.is_none() {
            warn!("helper '{}' registered without metadata", record.name);
        }
        debug!("registering helper '{}'", record.name);
        let record = Arc::new(record);
        for alias in aliases {
            self.helpers.insert(alias, Arc::clone(&record));
        }
        self.helpers.insert(record.name.clone(), record);
    }

    /// Makes `name` call the helper registered as `target`. Returns false when
    /// there is no such helper.
    pub fn link(&mut self, name: &str, target: &str) -> bool {
        match self.helpers.get(target) {
            Some(record) => {
                let record = Arc::clone(record);
                self.helpers.insert(name.to_string(), record);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<HelperRecord>> {
        self.helpers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    /// Every invocable name, aliases included, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.helpers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Documentation for every invocable name that has some.
    pub fn metadata(&self) -> BTreeMap<String, HelperMeta> {
        self.helpers
            .iter()
            .filter_map(|(name, record)| record.meta.clone().map(|meta| (name.clone(), meta)))
            .collect()
    }

    /// Resolves and runs a helper call.
    pub fn call(&self, ctx: &EvalContext<'_>, name: &str, args: &[Expr]) -> Result<Value> {
        let record = self.helpers.get(name).ok_or_else(|| Error::UnknownHelper {
            name: name.to_string(),
        })?;

        if let HelperKind::Raw(raw) = &record.kind {
            return raw(ctx, args);
        }

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let value = ctx.eval(arg)?;
            values.push(if record.handles_decimals {
                value
            } else {
                value.demoted()
            });
        }

        let found = values.first().map_or(TypeTag::Undefined, Value::type_tag);
        if let Some(implementation) = record.implementation(found) {
            return implementation(ctx, values);
        }

        for target in &record.coerce {
            let Some(implementation) = record.implementation(*target) else {
                continue;
            };
            let first = values.first().cloned().unwrap_or_default();
            if let Some(coerced) = coerce(&first, *target) {
                if values.is_empty() {
                    values.push(coerced);
                } else {
                    values[0] = coerced;
                }
                return implementation(ctx, values);
            }
        }

        Err(Error::NoOverload {
            helper: name.to_string(),
            found,
        })
    }
}

/// Converts a first argument to `target` for a coerced retry.
pub fn coerce(value: &Value, target: TypeTag) -> Option<Value> {
    match (target, value) {
        (TypeTag::Array, v) if v.is_nullish() => Some(Value::Array(Vec::new())),
        (TypeTag::Array, v) => Some(Value::Array(vec![v.clone()])),
        (TypeTag::Object, v) if v.is_nullish() => Some(Value::Object(Map::new())),
        (TypeTag::String, v) if v.is_nullish() => Some(Value::String(String::new())),
        (TypeTag::String, Value::Number(_) | Value::Boolean(_)) => Some(Value::String(value.as_string())),
        (TypeTag::Number, Value::Number(n)) => Some(Value::Number(n.to_native())),
        (TypeTag::Number, Value::String(s)) => Some(Value::Number(
            Number::parse_prefix(s).unwrap_or(Number::Float(f64::NAN)),
        )),
        (TypeTag::Number, Value::Boolean(b)) => Some(Value::from(i64::from(*b))),
        (TypeTag::Number, v) if v.is_nullish() => Some(Value::Number(Number::Float(f64::NAN))),
        _ => None,
    }
}
