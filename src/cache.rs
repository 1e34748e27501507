//! Two-tier cache of resolved paths.
//!
//! The cycle tier lives for one emission. The persistent tier outlives cycles
//! because hosts in watch mode sometimes leave unchanged assets out of a
//! rebuild's manifest. Persistent entries are only ever merged, never
//! invalidated, so a stale entry can hide a genuine resolution failure.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Cache key: the directory a token was found in and the token itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  context: PathBuf,
  src_path: String,
}

impl CacheKey {
  /// Key for `src_path` as seen from `context`.
  pub fn new(context: &Path, src_path: &str) -> Self {
    Self {
      context: context.to_path_buf(),
      src_path: src_path.to_string(),
    }
  }
}

#[derive(Debug, Clone)]
struct PersistentEntry {
  rw_path: String,
  cycle: u64,
}

/// Cycle-scoped and cross-cycle resolution caches.
#[derive(Debug, Default)]
pub struct RewriteCache {
  cycle_paths: HashMap<CacheKey, String>,
  persistent: HashMap<CacheKey, PersistentEntry>,
  max_age: Option<u32>,
  cycle: u64,
}

impl RewriteCache {
  /// Unbounded cache.
  pub fn new() -> Self {
    Self::default()
  }

  /// Cache whose persistent entries expire after `max_age` cycles without a refresh.
  pub fn with_max_age(max_age: Option<u32>) -> Self {
    Self {
      max_age,
      ..Self::default()
    }
  }

  /// Start a new build cycle with an empty cycle tier.
  pub fn begin_cycle(&mut self) -> u64 {
    self.cycle += 1;
    self.cycle_paths.clear();
    self.cycle
  }

  /// Number of cycles started so far.
  pub fn cycle(&self) -> u64 {
    self.cycle
  }

  /// Resolution recorded during the current cycle.
  pub fn cycle_get(&self, key: &CacheKey) -> Option<&str> {
    self.cycle_paths.get(key).map(String::as_str)
  }

  /// Record a resolution for the current cycle.
  pub fn cycle_insert(&mut self, key: CacheKey, rw_path: String) {
    self.cycle_paths.insert(key, rw_path);
  }

  /// Resolution remembered from any earlier cycle.
  pub fn persistent_get(&self, key: &CacheKey) -> Option<&str> {
    self.persistent.get(key).map(|entry| entry.rw_path.as_str())
  }

  /// Number of persistent entries.
  pub fn persistent_len(&self) -> usize {
    self.persistent.len()
  }

  /// Merge the cycle tier into the persistent tier, then apply the age bound if any.
  pub fn merge_cycle(&mut self) {
    let cycle = self.cycle;
    for (key, rw_path) in &self.cycle_paths {
      self.persistent.insert(key.clone(), PersistentEntry {
        rw_path: rw_path.clone(),
        cycle,
      });
    }

    if let Some(max_age) = self.max_age {
      let max_age = u64::from(max_age);
      self
        .persistent
        .retain(|_, entry| cycle.saturating_sub(entry.cycle) < max_age);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(src: &str) -> CacheKey {
    CacheKey::new(Path::new("/src"), src)
  }

  #[test]
  fn cycle_tier_is_cleared_each_cycle() {
    let mut cache = RewriteCache::new();
    cache.begin_cycle();
    cache.cycle_insert(key("a.png"), "a-1.png".into());
    assert_eq!(cache.cycle_get(&key("a.png")), Some("a-1.png"));

    cache.begin_cycle();
    assert_eq!(cache.cycle_get(&key("a.png")), None);
  }

  #[test]
  fn keys_are_scoped_by_context() {
    let mut cache = RewriteCache::new();
    cache.begin_cycle();
    cache.cycle_insert(key("a.png"), "a-1.png".into());
    assert_eq!(cache.cycle_get(&CacheKey::new(Path::new("/other"), "a.png")), None);
  }

  #[test]
  fn unbounded_persistent_tier_keeps_entries_forever() {
    let mut cache = RewriteCache::new();
    cache.begin_cycle();
    cache.cycle_insert(key("a.png"), "a-1.png".into());
    cache.merge_cycle();

    for _ in 0..10 {
      cache.begin_cycle();
      cache.merge_cycle();
    }
    assert_eq!(cache.persistent_get(&key("a.png")), Some("a-1.png"));
  }

  #[test]
  fn merge_overwrites_older_resolutions() {
    let mut cache = RewriteCache::new();
    cache.begin_cycle();
    cache.cycle_insert(key("a.png"), "a-1.png".into());
    cache.merge_cycle();
    cache.begin_cycle();
    cache.cycle_insert(key("a.png"), "a-2.png".into());
    cache.merge_cycle();
    assert_eq!(cache.persistent_get(&key("a.png")), Some("a-2.png"));
    assert_eq!(cache.persistent_len(), 1);
  }

  #[test]
  fn bounded_persistent_tier_evicts_stale_entries() {
    let mut cache = RewriteCache::with_max_age(Some(2));
    cache.begin_cycle();
    cache.cycle_insert(key("a.png"), "a-1.png".into());
    cache.cycle_insert(key("b.png"), "b-1.png".into());
    cache.merge_cycle();

    cache.begin_cycle();
    cache.cycle_insert(key("b.png"), "b-1.png".into());
    cache.merge_cycle();
    assert_eq!(cache.persistent_get(&key("a.png")), Some("a-1.png"));

    cache.begin_cycle();
    cache.merge_cycle();
    assert_eq!(cache.persistent_get(&key("a.png")), None);
    assert_eq!(cache.persistent_get(&key("b.png")), Some("b-1.png"));
  }
}
