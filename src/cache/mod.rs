//! Bounded-lifetime cache for slow-changing Bitbucket resources
//!
//! Keys are a structured enum (resource kind plus identifiers) so that
//! invalidation happens by resource kind and id, never by scanning
//! serialized key strings. Values are cached as `serde_json::Value` and
//! deserialized on read.
//!
//! Expiry is enforced twice: lazily on `get`, and by a periodic sweep task
//! that bounds memory for keys written once and never re-read. The two paths
//! race benignly; a redundant delete of an already-expired key is harmless.
//!
//! Diff text and diff statistics are deliberately never cached: diff
//! correctness is judged by freshness, and the diff-fetch path purges any
//! entries for the target pull request before retrieval.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::types::{PullRequestRef, RepositoryLocation};

/// Interval between background sweeps
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// TTLs per cacheable resource kind
pub mod ttl {
    use std::time::Duration;

    pub const REPOSITORY: Duration = Duration::from_secs(300);
    pub const REPOSITORY_LIST: Duration = Duration::from_secs(300);
    pub const PULL_REQUEST: Duration = Duration::from_secs(60);
    pub const PULL_REQUEST_LIST: Duration = Duration::from_secs(60);
    pub const BRANCH_LIST: Duration = Duration::from_secs(300);
    pub const COMMIT_LIST: Duration = Duration::from_secs(300);
    pub const TOKEN_CHECK: Duration = Duration::from_secs(3600);
}

/// Structured cache key: resource kind plus identifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Repository {
        workspace: String,
        repo_slug: String,
    },
    RepositoryList {
        workspace: String,
    },
    PullRequest {
        workspace: String,
        repo_slug: String,
        id: u64,
    },
    PullRequestList {
        workspace: String,
        repo_slug: String,
    },
    BranchList {
        workspace: String,
        repo_slug: String,
    },
    CommitList {
        workspace: String,
        repo_slug: String,
        revision: Option<String>,
    },
    TokenCheck,
}

impl CacheKey {
    pub fn repository(location: &RepositoryLocation) -> Self {
        Self::Repository {
            workspace: location.workspace.clone(),
            repo_slug: location.repo_slug.clone(),
        }
    }

    pub fn repository_list(workspace: &str) -> Self {
        Self::RepositoryList {
            workspace: workspace.to_string(),
        }
    }

    pub fn pull_request(pr: &PullRequestRef) -> Self {
        Self::PullRequest {
            workspace: pr.location.workspace.clone(),
            repo_slug: pr.location.repo_slug.clone(),
            id: pr.id.value(),
        }
    }

    pub fn pull_request_list(location: &RepositoryLocation) -> Self {
        Self::PullRequestList {
            workspace: location.workspace.clone(),
            repo_slug: location.repo_slug.clone(),
        }
    }

    pub fn branch_list(location: &RepositoryLocation) -> Self {
        Self::BranchList {
            workspace: location.workspace.clone(),
            repo_slug: location.repo_slug.clone(),
        }
    }

    pub fn commit_list(location: &RepositoryLocation, revision: Option<&str>) -> Self {
        Self::CommitList {
            workspace: location.workspace.clone(),
            repo_slug: location.repo_slug.clone(),
            revision: revision.map(str::to_string),
        }
    }
}

struct CacheEntry {
    value: Value,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) > self.ttl
    }
}

/// Key/value store with per-entry TTL and a periodic sweep.
///
/// No eviction policy beyond expiry; entries live until their TTL passes or
/// a mutation invalidates them explicitly.
pub struct TtlCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TtlCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            sweeper: Mutex::new(None),
        }
    }

    /// Stores a value, overwriting any existing entry unconditionally
    pub fn set(&self, key: CacheKey, value: Value, ttl: Duration) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Serializes and stores a typed value; serialization failures are
    /// logged and treated as a cache miss on the write side
    pub fn set_typed<T: Serialize>(&self, key: CacheKey, value: &T, ttl: Duration) {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value, ttl),
            Err(e) => debug!("Skipping cache write, value not serializable: {}", e),
        }
    }

    /// Returns the value if present and younger than its TTL; an expired
    /// entry is deleted as a side effect and reported as absent
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Reads and deserializes a typed value; entries that no longer decode
    /// are dropped and reported as absent
    pub fn get_typed<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                debug!("Dropping cache entry that no longer decodes: {}", e);
                self.delete(key);
                None
            }
        }
    }

    pub fn delete(&self, key: &CacheKey) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
    }

    pub fn clear(&self) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        entries.clear();
    }

    /// Number of live entries, counting not-yet-swept expired ones
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Purges the cached metadata for one pull request and its repository's
    /// pull request list. Called by the diff path before retrieval so stale
    /// metadata can never steer a diff fetch.
    pub fn invalidate_pull_request(&self, pr: &PullRequestRef) {
        self.delete(&CacheKey::pull_request(pr));
        self.delete(&CacheKey::pull_request_list(&pr.location));
    }

    /// Invalidates the cached pull request list of a repository; called when
    /// a pull request is created
    pub fn invalidate_pull_request_list(&self, location: &RepositoryLocation) {
        self.delete(&CacheKey::pull_request_list(location));
    }

    /// Removes every expired entry regardless of access pattern
    pub fn sweep(&self) {
        let now = Instant::now();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Cache sweep removed {} expired entries", removed);
        }
    }

    /// Spawns the periodic sweep task. The task holds only a weak reference,
    /// so dropping the cache stops it even without an explicit shutdown.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) {
        let weak: Weak<TtlCache> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                match weak.upgrade() {
                    Some(cache) => cache.sweep(),
                    None => break,
                }
            }
        });
        let mut sweeper = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = sweeper.replace(handle) {
            previous.abort();
        }
    }

    /// Aborts the sweep task; part of explicit shutdown
    pub fn shutdown(&self) {
        let mut sweeper = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = sweeper.take() {
            handle.abort();
        }
    }
}

impl Drop for TtlCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn location() -> RepositoryLocation {
        RepositoryLocation::new("acme", "widget-service")
    }

    #[tokio::test]
    async fn test_get_returns_value_before_expiry() {
        let cache = TtlCache::new();
        let key = CacheKey::repository(&location());
        cache.set(key.clone(), json!({"name": "widget-service"}), Duration::from_secs(60));
        assert_eq!(cache.get(&key), Some(json!({"name": "widget-service"})));
    }

    #[tokio::test]
    async fn test_get_after_ttl_returns_absent() {
        let cache = TtlCache::new();
        let key = CacheKey::repository(&location());
        cache.set(key.clone(), json!(1), Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.get(&key), None);
        // Lazy expiry deletes the entry as a side effect
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_set_overwrites_unconditionally() {
        let cache = TtlCache::new();
        let key = CacheKey::TokenCheck;
        cache.set(key.clone(), json!("first"), Duration::from_secs(60));
        cache.set(key.clone(), json!("second"), Duration::from_secs(60));
        assert_eq!(cache.get(&key), Some(json!("second")));
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_entries_without_access() {
        let cache = TtlCache::new();
        cache.set(
            CacheKey::repository(&location()),
            json!(1),
            Duration::from_millis(50),
        );
        cache.set(CacheKey::TokenCheck, json!(2), Duration::from_secs(60));
        tokio::time::sleep(Duration::from_millis(80)).await;
        cache.sweep();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&CacheKey::TokenCheck), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_background_sweeper_runs() {
        let cache = Arc::new(TtlCache::new());
        cache.set(
            CacheKey::repository(&location()),
            json!(1),
            Duration::from_millis(30),
        );
        cache.start_sweeper(Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.is_empty());
        cache.shutdown();
    }

    #[tokio::test]
    async fn test_invalidate_pull_request_purges_entry_and_list() {
        let cache = TtlCache::new();
        let pr = PullRequestRef::new(location(), crate::types::PullRequestId::new(7));
        cache.set(CacheKey::pull_request(&pr), json!(1), Duration::from_secs(60));
        cache.set(
            CacheKey::pull_request_list(&location()),
            json!([1, 2]),
            Duration::from_secs(60),
        );
        cache.set(CacheKey::branch_list(&location()), json!([]), Duration::from_secs(60));

        cache.invalidate_pull_request(&pr);

        assert_eq!(cache.get(&CacheKey::pull_request(&pr)), None);
        assert_eq!(cache.get(&CacheKey::pull_request_list(&location())), None);
        // Unrelated keys survive
        assert!(cache.get(&CacheKey::branch_list(&location())).is_some());
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let cache = TtlCache::new();
        let key = CacheKey::commit_list(&location(), Some("main"));
        cache.set_typed(key.clone(), &vec!["abc".to_string()], Duration::from_secs(60));
        let read: Option<Vec<String>> = cache.get_typed(&key);
        assert_eq!(read, Some(vec!["abc".to_string()]));
    }
}
