//! In-memory request cache with TTL expiry.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Clock abstraction so tests can control time.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// System clock used outside of tests.
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// A cached value plus the time it was stored.
#[derive(Debug, Clone)]
struct CachedEntry {
  data: Value,
  cached_at: DateTime<Utc>,
}

/// Snapshot of the cache contents for introspection.
#[derive(Debug, Clone)]
pub struct CacheStats {
  pub size: usize,
  pub entries: Vec<String>,
}

/// Process-wide in-memory cache for upstream request results.
///
/// Entries are valid for `ttl` after being set and are evicted lazily on
/// the next read past their expiry. Values are stored as JSON snapshots so
/// one cache instance can hold responses of different types.
///
/// The map is unbounded. That is acceptable for a short-lived process;
/// a size bound would be needed before hosting this in a long-running
/// service.
pub struct RequestCache {
  entries: Arc<Mutex<HashMap<String, CachedEntry>>>,
  ttl: Duration,
  clock: Arc<dyn Clock>,
}

impl RequestCache {
  /// Create a cache with the default 5 minute TTL.
  pub fn new() -> Self {
    Self {
      entries: Arc::new(Mutex::new(HashMap::new())),
      ttl: Duration::minutes(5),
      clock: Arc::new(SystemClock),
    }
  }

  /// Set the TTL for cached entries.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Substitute the clock. Tests use this to make expiry deterministic.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Look up a cached value. Returns `None` on a miss, on an expired
  /// entry (which is evicted), or when the stored snapshot no longer
  /// deserializes as `T`.
  pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let mut entries = self.entries.lock().expect("cache lock poisoned");

    let (expired, snapshot) = match entries.get(key) {
      None => return None,
      Some(entry) => (
        self.clock.now() - entry.cached_at >= self.ttl,
        entry.data.clone(),
      ),
    };

    if expired {
      entries.remove(key);
      tracing::debug!(key, "cache entry expired");
      return None;
    }

    match serde_json::from_value(snapshot) {
      Ok(data) => Some(data),
      Err(e) => {
        // A snapshot that stopped matching its type is as good as gone.
        tracing::warn!(key, error = %e, "evicting undecodable cache entry");
        entries.remove(key);
        None
      }
    }
  }

  /// Store a value under `key`, replacing any previous entry.
  pub fn set<T: Serialize>(&self, key: &str, data: &T) {
    let value = match serde_json::to_value(data) {
      Ok(v) => v,
      Err(e) => {
        tracing::warn!(key, error = %e, "value not serializable, skipping cache");
        return;
      }
    };

    let mut entries = self.entries.lock().expect("cache lock poisoned");
    entries.insert(
      key.to_string(),
      CachedEntry {
        data: value,
        cached_at: self.clock.now(),
      },
    );
  }

  /// Remove entries whose key contains `pattern`, or everything when no
  /// pattern is given.
  pub fn clear(&self, pattern: Option<&str>) {
    let mut entries = self.entries.lock().expect("cache lock poisoned");
    match pattern {
      Some(p) => entries.retain(|key, _| !key.contains(p)),
      None => entries.clear(),
    }
  }

  /// Current size and keys, for diagnostics.
  pub fn stats(&self) -> CacheStats {
    let entries = self.entries.lock().expect("cache lock poisoned");
    let mut keys: Vec<String> = entries.keys().cloned().collect();
    keys.sort();
    CacheStats {
      size: entries.len(),
      entries: keys,
    }
  }
}

impl Default for RequestCache {
  fn default() -> Self {
    Self::new()
  }
}

impl Clone for RequestCache {
  fn clone(&self) -> Self {
    Self {
      entries: Arc::clone(&self.entries),
      ttl: self.ttl,
      clock: Arc::clone(&self.clock),
    }
  }
}
