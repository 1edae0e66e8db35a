//! Expression cache keyed by exact source text.
//!
//! One cache belongs to one simulation: it is created with it, filled
//! lazily as abilities reference expressions, never evicted, and dropped
//! with it. Entries are immutable, so handing out shared [`Arc`]s is safe.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::compiler::{CompiledExpr, Strategy};

/// Counters describing cache use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub constant: usize,
    pub fast_path: usize,
    pub compiled: usize,
    pub interpreted: usize,
    pub invalid: usize,
}

/// Compiled expressions, one per distinct source text.
#[derive(Debug, Default)]
pub struct ExpressionCache {
    entries: HashMap<String, Arc<CompiledExpr>>,
    stats: CacheStats,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The compiled form of `source`, compiling it on first use.
    pub fn get(&mut self, source: &str) -> Arc<CompiledExpr> {
        if let Some(hit) = self.entries.get(source) {
            self.stats.hits += 1;
            return Arc::clone(hit);
        }
        self.stats.misses += 1;
        let compiled = Arc::new(CompiledExpr::compile(source));
        match compiled.strategy() {
            Strategy::Constant => self.stats.constant += 1,
            Strategy::FastPath => self.stats.fast_path += 1,
            Strategy::Compiled => self.stats.compiled += 1,
            Strategy::Interpreted => self.stats.interpreted += 1,
            Strategy::Invalid => self.stats.invalid += 1,
        }
        self.entries.insert(source.to_owned(), Arc::clone(&compiled));
        compiled
    }

    /// Compile every expression in `sources` ahead of time.
    pub fn warm<'s>(&mut self, sources: impl IntoIterator<Item = &'s str>) {
        for src in sources {
            self.get(src);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lookup_is_a_hit() {
        let mut cache = ExpressionCache::new();
        let a = cache.get("self.hp > 1");
        let b = cache.get("self.hp > 1");
        assert_eq!(a.source(), b.source());
        assert_eq!(cache.len(), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.compiled), (1, 1, 1));
    }

    #[test]
    fn keys_are_exact_text() {
        let mut cache = ExpressionCache::new();
        cache.warm(["tick > 1", "tick >  1", "min(1, 2)", "((", "3"]);
        assert_eq!(cache.len(), 5);
        let stats = cache.stats();
        assert_eq!(stats.compiled, 2);
        assert_eq!(stats.interpreted, 1);
        assert_eq!(stats.invalid, 1);
        assert_eq!(stats.constant, 1);
    }
}
