//! Diagnostics counters exposed under `/stats`.

use crate::store::CatalogueCounts;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct Stats {
    resolved_queries: AtomicU64,
    reasoner_hits: AtomicU64,
    reasoner_misses: AtomicU64,
    and_set_hits: AtomicU64,
    and_set_misses: AtomicU64,
    dedup_passes: AtomicU64,
    merged_objects: AtomicU64,
    dedup_queue_depth: AtomicUsize,
}

impl Stats {
    pub fn record_resolve(&self) {
        self.resolved_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reasoner_lookup(&self, hit: bool) {
        let counter = if hit {
            &self.reasoner_hits
        } else {
            &self.reasoner_misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_and_set_lookup(&self, hit: bool) {
        let counter = if hit {
            &self.and_set_hits
        } else {
            &self.and_set_misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dedup_pass(&self, merged: u64) {
        self.dedup_passes.fetch_add(1, Ordering::Relaxed);
        self.merged_objects.fetch_add(merged, Ordering::Relaxed);
    }

    pub fn queue_push(&self) {
        self.dedup_queue_depth.fetch_add(1, Ordering::Relaxed);
    }

    pub fn queue_pop(&self) {
        // saturating: a pop never runs ahead of its push
        let _ = self
            .dedup_queue_depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| {
                Some(d.saturating_sub(1))
            });
    }

    pub fn snapshot(&self, catalogue: CatalogueCounts) -> StatsSnapshot {
        StatsSnapshot {
            resolved_queries: self.resolved_queries.load(Ordering::Relaxed),
            reasoner_cache_hits: self.reasoner_hits.load(Ordering::Relaxed),
            reasoner_cache_misses: self.reasoner_misses.load(Ordering::Relaxed),
            and_set_cache_hits: self.and_set_hits.load(Ordering::Relaxed),
            and_set_cache_misses: self.and_set_misses.load(Ordering::Relaxed),
            dedup_passes: self.dedup_passes.load(Ordering::Relaxed),
            merged_objects: self.merged_objects.load(Ordering::Relaxed),
            dedup_queue_depth: self.dedup_queue_depth.load(Ordering::Relaxed),
            tags: catalogue.tags,
            objects: catalogue.objects,
            taggings: catalogue.taggings,
            relations: catalogue.relations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub resolved_queries: u64,
    pub reasoner_cache_hits: u64,
    pub reasoner_cache_misses: u64,
    pub and_set_cache_hits: u64,
    pub and_set_cache_misses: u64,
    pub dedup_passes: u64,
    pub merged_objects: u64,
    pub dedup_queue_depth: usize,
    pub tags: i64,
    pub objects: i64,
    pub taggings: i64,
    pub relations: i64,
}

impl StatsSnapshot {
    pub const COUNTER_NAMES: [&'static str; 12] = [
        "resolved_queries",
        "reasoner_cache_hits",
        "reasoner_cache_misses",
        "and_set_cache_hits",
        "and_set_cache_misses",
        "dedup_passes",
        "merged_objects",
        "dedup_queue_depth",
        "tags",
        "objects",
        "taggings",
        "relations",
    ];

    /// Counter value by its `/stats/<name>` name.
    pub fn get(&self, name: &str) -> Option<String> {
        let value = match name {
            "resolved_queries" => self.resolved_queries.to_string(),
            "reasoner_cache_hits" => self.reasoner_cache_hits.to_string(),
            "reasoner_cache_misses" => self.reasoner_cache_misses.to_string(),
            "and_set_cache_hits" => self.and_set_cache_hits.to_string(),
            "and_set_cache_misses" => self.and_set_cache_misses.to_string(),
            "dedup_passes" => self.dedup_passes.to_string(),
            "merged_objects" => self.merged_objects.to_string(),
            "dedup_queue_depth" => self.dedup_queue_depth.to_string(),
            "tags" => self.tags.to_string(),
            "objects" => self.objects.to_string(),
            "taggings" => self.taggings.to_string(),
            "relations" => self.relations.to_string(),
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = Stats::default();
        stats.record_resolve();
        stats.record_reasoner_lookup(true);
        stats.record_reasoner_lookup(false);
        stats.record_reasoner_lookup(false);
        stats.record_dedup_pass(2);
        stats.queue_push();
        stats.queue_pop();
        stats.queue_pop();

        let snap = stats.snapshot(CatalogueCounts::default());
        assert_eq!(snap.resolved_queries, 1);
        assert_eq!(snap.reasoner_cache_hits, 1);
        assert_eq!(snap.reasoner_cache_misses, 2);
        assert_eq!(snap.merged_objects, 2);
        assert_eq!(snap.dedup_queue_depth, 0);
    }

    #[test]
    fn every_counter_name_is_readable() {
        let snap = Stats::default().snapshot(CatalogueCounts::default());
        for name in StatsSnapshot::COUNTER_NAMES {
            assert_eq!(snap.get(name).as_deref(), Some("0"), "{}", name);
        }
        assert!(snap.get("bogus").is_none());
    }
}
