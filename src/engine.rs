//! The engine: configuration, helpers, expression cache and parser in one
//! explicit object, created once by the host and shared by reference.
//!
//! # Examples
//!
//! ```
//! use sprig_lang::{ApplyOptions, Engine, Value};
//! use serde_json::json;
//!
//! let engine = Engine::new();
//! let input: Value = json!({ "first": "Ada", "last": "Lovelace", "price": 0.1 }).into();
//! let transforms: Value = json!({
//!     "out": {
//!         "name": "(: $first & ' ' & $last :)",
//!         "total": "(: $price + 0.2 :)"
//!     }
//! })
//! .into();
//!
//! let result = engine.apply(&input, &transforms, None, &ApplyOptions::default()).unwrap();
//! assert_eq!(
//!     serde_json::Value::from(result),
//!     json!({ "name": "Ada Lovelace", "total": 0.3 })
//! );
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::ast::Expr;
use crate::cache::ExpressionCache;
use crate::error::{Error, Result};
use crate::evaluator::EvalContext;
use crate::helpers::{self, HelperDef, HelperMeta, HelperRegistry};
use crate::number::NumericMode;
use crate::parser::{DefaultParser, ExpressionParser};
use crate::transform::{DefaultDelimiters, Delimiters, find_entry, walk};
use crate::value::Value;

/// Rewrites a variable's key path before lookup. Receives the evaluated keys
/// and the data they will be looked up in.
pub type KeyFilter = Arc<dyn Fn(Vec<Value>, &Value) -> Vec<Value> + Send + Sync>;

fn default_delimiters() -> Arc<dyn Delimiters> {
    Arc::new(DefaultDelimiters)
}

fn default_max_depth() -> usize {
    50
}

/// Engine-wide settings. Every field has a default, so a partial JSON
/// document deserializes into a complete configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Exact decimal arithmetic for literals and operators
    pub use_exact_decimal: bool,
    /// Leave exact decimals in results instead of converting them
    pub return_exact_decimal: bool,
    /// Convert exact decimals in results to strings rather than numbers
    pub decimals_as_strings: bool,
    pub use_expression_cache: bool,
    /// Depth budget for nested transforms, counting the top-level call
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(skip)]
    pub key_filter: Option<KeyFilter>,
    #[serde(skip, default = "default_delimiters")]
    pub delimiters: Arc<dyn Delimiters>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            use_exact_decimal: true,
            return_exact_decimal: false,
            decimals_as_strings: false,
            use_expression_cache: true,
            max_depth: default_max_depth(),
            key_filter: None,
            delimiters: default_delimiters(),
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("use_exact_decimal", &self.use_exact_decimal)
            .field("return_exact_decimal", &self.return_exact_decimal)
            .field("decimals_as_strings", &self.decimals_as_strings)
            .field("use_expression_cache", &self.use_expression_cache)
            .field("max_depth", &self.max_depth)
            .field("key_filter", &self.key_filter.is_some())
            .finish_non_exhaustive()
    }
}

/// Per-call overrides of [`EngineConfig`].
#[derive(Clone, Default)]
pub struct ApplyOptions {
    pub max_depth: Option<usize>,
    pub return_exact_decimal: Option<bool>,
    pub decimals_as_strings: Option<bool>,
    pub key_filter: Option<KeyFilter>,
    pub delimiters: Option<Arc<dyn Delimiters>>,
}

impl ApplyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn return_exact_decimal(mut self, enabled: bool) -> Self {
        self.return_exact_decimal = Some(enabled);
        self
    }

    pub fn decimals_as_strings(mut self, enabled: bool) -> Self {
        self.decimals_as_strings = Some(enabled);
        self
    }

    pub fn key_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(Vec<Value>, &Value) -> Vec<Value> + Send + Sync + 'static,
    {
        self.key_filter = Some(Arc::new(filter));
        self
    }

    pub fn delimiters(mut self, delimiters: impl Delimiters + 'static) -> Self {
        self.delimiters = Some(Arc::new(delimiters));
        self
    }
}

/// Options of one `apply` call, resolved from the engine config and the
/// call's overrides.
pub struct Settings {
    pub(crate) numeric_mode: NumericMode,
    pub(crate) max_depth: usize,
    pub(crate) return_exact: bool,
    pub(crate) decimals_as_strings: bool,
    pub(crate) key_filter: Option<KeyFilter>,
    pub(crate) delimiters: Arc<dyn Delimiters>,
}

pub struct Engine {
    config: EngineConfig,
    helpers: HelperRegistry,
    cache: ExpressionCache,
    parser: Box<dyn ExpressionParser>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// An engine with the built-in helpers and the default parser.
    pub fn with_config(config: EngineConfig) -> Self {
        let mut registry = HelperRegistry::new();
        helpers::register_builtins(&mut registry);
        Engine {
            parser: Box::new(DefaultParser::with_exact_numbers(config.use_exact_decimal)),
            cache: ExpressionCache::new(config.use_expression_cache),
            helpers: registry,
            config,
        }
    }

    /// Replaces the expression parser. Cached expressions are dropped.
    pub fn with_parser(mut self, parser: impl ExpressionParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self.cache.clear();
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn helpers(&self) -> &HelperRegistry {
        &self.helpers
    }

    /// Mutable access to the helper registry.
    ///
    /// Registration is not meant to be interleaved with running evaluations;
    /// an engine shared between threads must be synchronized by the host while
    /// its helpers change.
    pub fn helpers_mut(&mut self) -> &mut HelperRegistry {
        &mut self.helpers
    }

    pub fn register_helper(&mut self, def: HelperDef) {
        self.helpers.register(def);
    }

    /// Documentation for every helper, keyed by invocable name.
    pub fn helper_metadata(&self) -> BTreeMap<String, HelperMeta> {
        self.helpers.metadata()
    }

    pub fn cache(&self) -> &ExpressionCache {
        &self.cache
    }

    pub fn parser(&self) -> &dyn ExpressionParser {
        self.parser.as_ref()
    }

    pub fn set_expression_cache(&self, enabled: bool) {
        self.cache.set_enabled(enabled);
    }

    pub fn clear_expression_cache(&self) {
        self.cache.clear();
    }

    /// Drops cached expressions unused for longer than `max_age`, yielding to
    /// the runtime between batches. Returns how many were dropped.
    pub async fn discard_expressions_older_than(&self, max_age: Duration) -> usize {
        self.cache.discard_older_than(max_age).await
    }

    /// Parses expression source (without delimiters) through the cache.
    pub fn parse(&self, source: &str) -> Result<Arc<Expr>> {
        self.cache.find_or_parse(source, self.parser())
    }

    /// Evaluates a single expression (without delimiters) against `input`.
    pub fn evaluate(&self, source: &str, input: &Value) -> Result<Value> {
        let settings = self.settings(&ApplyOptions::default());
        let expr = self.parse(source)?;
        let dictionary = Value::Undefined;
        let ctx = EvalContext::new(self, &settings, &dictionary, input, settings.max_depth);
        let result = ctx.eval(&expr)?;
        Ok(Self::finish(&settings, result))
    }

    /// Applies a transform to `input`.
    ///
    /// `transforms` is either a dictionary of named templates or a single
    /// expression leaf. With `entry` set, that entry is run (a leading `$` is
    /// ignored, and an expression leaf is run as is). Without it, the `out`
    /// entry is run, or the whole value is treated as a one-off template when
    /// it has no `out` entry.
    pub fn apply(
        &self,
        input: &Value,
        transforms: &Value,
        entry: Option<&str>,
        options: &ApplyOptions,
    ) -> Result<Value> {
        let settings = self.settings(options);
        let depth = settings.max_depth;
        Self::check_depth(&settings, depth)?;
        let ctx = EvalContext::new(self, &settings, transforms, input, depth);

        let result = match (entry, transforms) {
            (Some(name), _) => Self::resolve(&ctx, &Value::from(name))?,
            (None, Value::Object(map)) => match map.get("out") {
                Some(out) => walk(&ctx, out)?,
                None => walk(&ctx, transforms)?,
            },
            (None, other) => walk(&ctx, other)?,
        };
        Ok(Self::finish(&settings, result))
    }

    /// Runs a template for a helper, one level deeper. Results keep their
    /// exact decimals; only the outermost call converts them.
    pub(crate) fn run_nested(
        &self,
        settings: &Settings,
        input: &Value,
        transforms: &Value,
        template: &Value,
        depth: usize,
    ) -> Result<Value> {
        Self::check_depth(settings, depth)?;
        debug!("nested transform, remaining depth {}", depth);
        let ctx = EvalContext::new(self, settings, transforms, input, depth);
        Self::resolve(&ctx, template)
    }

    fn check_depth(settings: &Settings, depth: usize) -> Result<()> {
        if depth == 0 {
            return Err(Error::DepthExceeded {
                max_depth: settings.max_depth,
            });
        }
        Ok(())
    }

    /// A string that is not an expression leaf names a dictionary entry;
    /// anything else is walked as a template.
    fn resolve(ctx: &EvalContext<'_>, template: &Value) -> Result<Value> {
        match template {
            Value::String(text) if ctx.extract(text).is_none() => {
                let name = text.strip_prefix('$').unwrap_or(text);
                match find_entry(ctx.transforms(), name) {
                    Some(entry) => walk(ctx, entry),
                    None => Ok(Value::Undefined),
                }
            }
            other => walk(ctx, other),
        }
    }

    fn settings(&self, options: &ApplyOptions) -> Settings {
        Settings {
            numeric_mode: if self.config.use_exact_decimal {
                NumericMode::Exact
            } else {
                NumericMode::Native
            },
            max_depth: options.max_depth.unwrap_or(self.config.max_depth),
            return_exact: options
                .return_exact_decimal
                .unwrap_or(self.config.return_exact_decimal),
            decimals_as_strings: options
                .decimals_as_strings
                .unwrap_or(self.config.decimals_as_strings),
            key_filter: options
                .key_filter
                .clone()
                .or_else(|| self.config.key_filter.clone()),
            delimiters: options
                .delimiters
                .clone()
                .unwrap_or_else(|| Arc::clone(&self.config.delimiters)),
        }
    }

    fn finish(settings: &Settings, result: Value) -> Value {
        if settings.return_exact {
            result
        } else {
            result.normalized(settings.decimals_as_strings)
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
