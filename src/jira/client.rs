use crate::config::Config;
use crate::jira::api_types::{
  ApiBoardsResponse, ApiMyself, ApiProject, ApiSearchResponse, ApiSprintsResponse, IssueFieldMap,
};
use crate::jira::types::{Board, CurrentUser, Issue, Project, Sprint};
use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use std::time::Duration;

/// Upstream requests are abandoned after this long.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const PAGE_SIZE: u64 = 50;

/// Jira API client wrapper
#[derive(Clone)]
pub struct JiraClient {
  client: gouqi::r#async::Jira,
  fields: IssueFieldMap,
}

impl JiraClient {
  pub fn new(config: &Config) -> Result<Self> {
    let token = Config::get_api_token()?;

    let credentials = gouqi::Credentials::Basic(config.jira.email.clone(), token);

    let client = gouqi::r#async::Jira::new(&config.jira.url, credentials)
      .map_err(|e| eyre!("Failed to create Jira client: {}", e))?;

    Ok(Self {
      client,
      fields: config.issue_field_map(),
    })
  }

  /// Bound an upstream call to the fixed request timeout.
  async fn bounded<T, Fut>(&self, what: &str, fut: Fut) -> Result<T>
  where
    Fut: Future<Output = Result<T>>,
  {
    match tokio::time::timeout(REQUEST_TIMEOUT, fut).await {
      Ok(result) => result,
      Err(_) => Err(eyre!(
        "Request timed out after {}s: {}",
        REQUEST_TIMEOUT.as_secs(),
        what
      )),
    }
  }

  /// List all projects visible to the authenticated user
  pub async fn get_projects(&self) -> Result<Vec<Project>> {
    let projects: Vec<ApiProject> = self
      .bounded("list projects", async {
        self
          .client
          .get("api", "/project")
          .await
          .map_err(|e| eyre!("Failed to list projects: {}", e))
      })
      .await?;

    Ok(projects.into_iter().map(Project::from).collect())
  }

  /// Get the authenticated user
  pub async fn get_myself(&self) -> Result<CurrentUser> {
    let myself: ApiMyself = self
      .bounded("get current user", async {
        self
          .client
          .get("api", "/myself")
          .await
          .map_err(|e| eyre!("Failed to get current user: {}", e))
      })
      .await?;

    Ok(myself.into())
  }

  /// Get all boards, optionally filtered by project
  pub async fn get_boards(&self, project: Option<&str>) -> Result<Vec<Board>> {
    let mut all_boards = Vec::new();
    let mut start_at = 0u64;

    loop {
      let mut endpoint = format!("/board?startAt={}&maxResults={}", start_at, PAGE_SIZE);
      if let Some(p) = project {
        endpoint.push_str(&format!("&projectKeyOrId={}", p));
      }

      let response: ApiBoardsResponse = self
        .bounded("list boards", async {
          self
            .client
            .get("agile", &endpoint)
            .await
            .map_err(|e| eyre!("Failed to get boards: {}", e))
        })
        .await?;

      let count = response.values.len() as u64;
      all_boards.extend(response.values.into_iter().map(Board::from));

      if response.is_last || count == 0 {
        break;
      }
      start_at += count;
    }

    Ok(all_boards)
  }

  /// Get all sprints for a board, oldest first
  pub async fn get_board_sprints(&self, board_id: u64) -> Result<Vec<Sprint>> {
    let mut all_sprints = Vec::new();
    let mut start_at = 0u64;

    loop {
      let endpoint = format!(
        "/board/{}/sprint?startAt={}&maxResults={}",
        board_id, start_at, PAGE_SIZE
      );

      let response: ApiSprintsResponse = self
        .bounded("list sprints", async {
          self
            .client
            .get("agile", &endpoint)
            .await
            .map_err(|e| eyre!("Failed to get sprints for board {}: {}", board_id, e))
        })
        .await?;

      let count = response.values.len() as u64;
      all_sprints.extend(response.values.into_iter().map(Sprint::from));

      if response.is_last || count == 0 {
        break;
      }
      start_at += count;
    }

    Ok(all_sprints)
  }

  /// Probe whether a board serves the sprint endpoint.
  ///
  /// Some Jira deployments answer this probe with a 400 even for scrum
  /// boards that do serve sprints, so a 400 counts as support rather than
  /// absence. Unverified against every Jira version; revisit if a real
  /// deployment disagrees.
  pub async fn board_supports_sprints(&self, board_id: u64) -> bool {
    let endpoint = format!("/board/{}/sprint?startAt=0&maxResults=1", board_id);

    let probe = tokio::time::timeout(
      REQUEST_TIMEOUT,
      self.client.get::<ApiSprintsResponse>("agile", &endpoint),
    )
    .await;

    match probe {
      Ok(Ok(_)) => true,
      Ok(Err(e)) => {
        let supported = e.to_string().contains("400");
        tracing::debug!(board_id, supported, error = %e, "sprint probe failed");
        supported
      }
      Err(_) => {
        tracing::debug!(board_id, "sprint probe timed out");
        false
      }
    }
  }

  /// Search for issues using JQL, requesting only the fields the deck
  /// pipeline consumes
  pub async fn search_issues(&self, jql: &str) -> Result<Vec<Issue>> {
    let mut all_issues = Vec::new();
    let mut start_at = 0u64;
    let max_results = 100u64;

    loop {
      let body = serde_json::json!({
        "jql": jql,
        "startAt": start_at,
        "maxResults": max_results,
        "fields": self.fields.search_fields(),
      });

      let response: ApiSearchResponse = self
        .bounded("search issues", async {
          self
            .client
            .post("api", "/search", body)
            .await
            .map_err(|e| eyre!("Failed to search issues: {}", e))
        })
        .await?;

      let count = response.issues.len() as u64;
      all_issues.extend(
        response
          .issues
          .into_iter()
          .map(|issue| issue.into_issue(&self.fields)),
      );

      if count == 0 || start_at + count >= response.total {
        break;
      }
      start_at += count;
    }

    Ok(all_issues)
  }
}
