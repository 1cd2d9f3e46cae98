//! Cached Jira client that wraps JiraClient with transparent caching.

use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use std::future::Future;

use crate::cache::{derive_key, CacheStats, RequestCache};
use crate::config::Config;
use crate::limit;

use super::client::JiraClient;
use super::types::{Board, CurrentUser, Issue, Project, Sprint};

/// How many board fetches run in parallel during a multi-project fan-out.
const MAX_CONCURRENT_FETCHES: usize = 4;

/// Jira client with transparent caching support.
///
/// This wraps the underlying JiraClient and provides the same API, but
/// remembers responses for the cache TTL so repeated reads within one
/// pipeline run skip the network.
#[derive(Clone)]
pub struct CachedJiraClient {
  inner: JiraClient,
  cache: RequestCache,
}

impl CachedJiraClient {
  /// Create a new cached Jira client with a fresh cache.
  pub fn new(config: &Config) -> Result<Self> {
    let cache = RequestCache::new()
      .with_ttl(chrono::Duration::minutes(config.jira.cache_ttl_minutes.unwrap_or(5)));
    Ok(Self::with_cache(JiraClient::new(config)?, cache))
  }

  /// Wrap an existing client around an injected cache instance.
  pub fn with_cache(inner: JiraClient, cache: RequestCache) -> Self {
    Self { inner, cache }
  }

  /// Serve from cache when fresh, otherwise fetch and remember.
  async fn cached<T, F, Fut>(&self, key: &str, fetch: F) -> Result<T>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    if let Some(hit) = self.cache.get::<T>(key) {
      tracing::debug!(key, "cache hit");
      return Ok(hit);
    }

    tracing::debug!(key, "cache miss");
    let data = fetch().await?;
    self.cache.set(key, &data);
    Ok(data)
  }

  /// List all projects with caching.
  pub async fn get_projects(&self) -> Result<Vec<Project>> {
    let key = derive_key("projects", &json!({}));
    self.cached(&key, || self.inner.get_projects()).await
  }

  /// Get the authenticated user with caching.
  pub async fn get_myself(&self) -> Result<CurrentUser> {
    let key = derive_key("myself", &json!({}));
    self.cached(&key, || self.inner.get_myself()).await
  }

  /// Get all boards with caching, optionally filtered by project.
  pub async fn get_boards(&self, project: Option<&str>) -> Result<Vec<Board>> {
    let key = derive_key("boards", &json!({ "project": project }));
    self
      .cached(&key, || self.inner.get_boards(project))
      .await
  }

  /// Fetch boards for several projects at once, bounded to a handful of
  /// in-flight requests. The flattened result carries no per-project
  /// ordering.
  pub async fn get_boards_for_projects(&self, projects: &[String]) -> Result<Vec<Board>> {
    let tasks: Vec<_> = projects
      .iter()
      .map(|project| {
        let client = self.clone();
        let project = project.clone();
        move || async move { client.get_boards(Some(&project)).await }
      })
      .collect();

    let batches = limit::run_all(tasks, MAX_CONCURRENT_FETCHES).await?;
    Ok(batches.into_iter().flatten().collect())
  }

  /// Get all sprints for a board with caching.
  pub async fn get_board_sprints(&self, board_id: u64) -> Result<Vec<Sprint>> {
    let key = derive_key("sprints", &json!({ "board_id": board_id }));
    self
      .cached(&key, || self.inner.get_board_sprints(board_id))
      .await
  }

  /// Sprint-support probe (not cached - a cheap single-item request).
  pub async fn board_supports_sprints(&self, board_id: u64) -> bool {
    self.inner.board_supports_sprints(board_id).await
  }

  /// Search for issues using JQL with caching.
  pub async fn search_issues(&self, jql: &str) -> Result<Vec<Issue>> {
    let key = derive_key("search", &json!({ "jql": jql.trim() }));
    self.cached(&key, || self.inner.search_issues(jql)).await
  }

  /// Cache introspection for diagnostics.
  pub fn cache_stats(&self) -> CacheStats {
    self.cache.stats()
  }

  /// Drop cached responses, scoped to keys containing `pattern` when
  /// given.
  pub fn clear_cache(&self, pattern: Option<&str>) {
    self.cache.clear(pattern);
  }
}
