//! Expression parse cache.
//!
//! Templates tend to repeat the same few expressions many times, so parsed
//! ASTs are kept by source text. Entries remember when they were last used;
//! an age sweep drops the stale ones in bounded batches, yielding to the
//! async runtime between batches.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::ast::Expr;
use crate::error::Result;
use crate::parser::ExpressionParser;

/// Entries examined per sweep step.
pub const SWEEP_BATCH_SIZE: usize = 500;

struct CacheEntry {
    parsed: Arc<Expr>,
    accessed: Instant,
}

/// Parsed expressions keyed by source text. Safe to share between threads.
pub struct ExpressionCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    enabled: AtomicBool,
}

/// An age sweep in progress: the keys still to examine, and the instant the
/// sweep started.
pub struct Sweep {
    pending: Vec<String>,
    started: Instant,
    max_age: Duration,
    removed: usize,
}

impl Sweep {
    pub fn is_done(&self) -> bool {
        self.pending.is_empty()
    }

    /// Entries dropped so far.
    pub fn removed(&self) -> usize {
        self.removed
    }
}

impl ExpressionCache {
    pub fn new(enabled: bool) -> Self {
        ExpressionCache {
            entries: Mutex::new(HashMap::new()),
            enabled: AtomicBool::new(enabled),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Turns caching on or off. Turning it off also forgets every entry.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
        if !enabled {
            self.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries().contains_key(source)
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Returns the cached AST for `source`, parsing (and caching) it on a miss.
    ///
    /// Parse failures are returned with the offending source line attached
    /// and are never cached.
    pub fn find_or_parse(&self, source: &str, parser: &dyn ExpressionParser) -> Result<Arc<Expr>> {
        let now = Instant::now();
        if !self.is_enabled() {
            return Ok(Arc::new(Self::parse(source, parser)?));
        }

        if let Some(entry) = self.entries().get_mut(source) {
            trace!("expression cache hit: {}", source);
            entry.accessed = now;
            return Ok(Arc::clone(&entry.parsed));
        }

        trace!("expression cache miss: {}", source);
        // Parse outside the lock so slow parses do not block other lookups
        let parsed = Arc::new(Self::parse(source, parser)?);
        self.entries().insert(
            source.to_string(),
            CacheEntry {
                parsed: Arc::clone(&parsed),
                accessed: now,
            },
        );
        Ok(parsed)
    }

    fn parse(source: &str, parser: &dyn ExpressionParser) -> Result<Expr> {
        parser
            .parse(source)
            .map_err(|e| e.with_source(source).into())
    }

    /// Starts a sweep over the entries present now, dropping those unused
    /// for longer than `max_age`.
    pub fn begin_sweep(&self, max_age: Duration) -> Sweep {
        Sweep {
            pending: self.entries().keys().cloned().collect(),
            started: Instant::now(),
            max_age,
            removed: 0,
        }
    }

    /// Examines the next batch of a sweep. Returns true while work remains.
    pub fn sweep_batch(&self, sweep: &mut Sweep) -> bool {
        let take = sweep.pending.len().min(SWEEP_BATCH_SIZE);
        let batch = sweep.pending.split_off(sweep.pending.len() - take);

        let mut entries = self.entries();
        for key in batch {
            let expired = entries
                .get(&key)
                .is_some_and(|entry| sweep.started.duration_since(entry.accessed) > sweep.max_age);
            if expired {
                entries.remove(&key);
                sweep.removed += 1;
            }
        }
        debug!(
            "expression cache sweep: {} removed, {} left to examine",
            sweep.removed,
            sweep.pending.len()
        );
        !sweep.is_done()
    }

    /// Drops every entry unused for longer than `max_age`, one batch per
    /// scheduling turn. Returns how many entries were dropped.
    pub async fn discard_older_than(&self, max_age: Duration) -> usize {
        if !self.is_enabled() {
            return 0;
        }
        let mut sweep = self.begin_sweep(max_age);
        while self.sweep_batch(&mut sweep) {
            tokio::task::yield_now().await;
        }
        sweep.removed()
    }
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::DefaultParser;

    #[test]
    fn test_hit_returns_same_ast() {
        let cache = ExpressionCache::new(true);
        let parser = DefaultParser::new();
        let first = cache.find_or_parse("1 + 2", &parser).unwrap();
        let second = cache.find_or_parse("1 + 2", &parser).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = ExpressionCache::new(false);
        cache.find_or_parse("$a", &DefaultParser::new()).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_parse_errors_are_not_cached() {
        let cache = ExpressionCache::new(true);
        assert!(cache.find_or_parse("(1 +", &DefaultParser::new()).is_err());
        assert!(!cache.contains("(1 +"));
    }

    #[test]
    fn test_sweep_batches() {
        let cache = ExpressionCache::new(true);
        let parser = DefaultParser::new();
        for i in 0..(SWEEP_BATCH_SIZE + 20) {
            cache.find_or_parse(&i.to_string(), &parser).unwrap();
        }
        std::thread::sleep(Duration::from_millis(5));

        let mut sweep = cache.begin_sweep(Duration::ZERO);
        assert!(cache.sweep_batch(&mut sweep));
        assert_eq!(sweep.removed(), SWEEP_BATCH_SIZE);
        assert!(!cache.sweep_batch(&mut sweep));
        assert!(cache.is_empty());
    }
}
