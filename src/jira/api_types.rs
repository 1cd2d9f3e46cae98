//! Serde-deserializable types matching Jira API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;
use serde_json::Value;

use super::types::{Board, CurrentUser, Issue, Project, RichText, Sprint};

/// Where issue-level custom fields live for this Jira instance.
///
/// Epic link and story points are custom fields whose ids vary by
/// deployment; the defaults match a stock Jira Cloud site.
#[derive(Debug, Clone)]
pub struct IssueFieldMap {
  pub epic: String,
  pub story_points: String,
  pub release_notes: Option<String>,
}

impl Default for IssueFieldMap {
  fn default() -> Self {
    Self {
      epic: "customfield_10014".to_string(),
      story_points: "customfield_10016".to_string(),
      release_notes: None,
    }
  }
}

impl IssueFieldMap {
  /// The field list requested from the search endpoint.
  pub fn search_fields(&self) -> Vec<String> {
    let mut fields = vec![
      "summary".to_string(),
      "description".to_string(),
      "status".to_string(),
      "assignee".to_string(),
      "issuetype".to_string(),
      self.epic.clone(),
      self.story_points.clone(),
    ];
    if let Some(notes) = &self.release_notes {
      fields.push(notes.clone());
    }
    fields
  }
}

// ============================================================================
// Common nested field types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiStatus {
  pub name: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiIssueType {
  pub name: String,
  #[serde(default)]
  pub subtask: bool,
}

#[derive(Debug, Deserialize)]
pub struct ApiUser {
  #[serde(rename = "displayName")]
  pub display_name: String,
}

// ============================================================================
// Project / myself endpoints
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiProject {
  pub id: String,
  pub key: String,
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiMyself {
  #[serde(rename = "accountId", default)]
  pub account_id: String,
  #[serde(rename = "displayName", default)]
  pub display_name: String,
  #[serde(rename = "emailAddress")]
  pub email_address: Option<String>,
}

// ============================================================================
// Agile board / sprint endpoints
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiBoard {
  pub id: u64,
  pub name: String,
  #[serde(rename = "type", default)]
  pub board_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiBoardsResponse {
  #[serde(default)]
  pub values: Vec<ApiBoard>,
  #[serde(rename = "isLast", default)]
  pub is_last: bool,
}

#[derive(Debug, Deserialize)]
pub struct ApiSprint {
  pub id: u64,
  pub name: String,
  #[serde(default)]
  pub state: String,
  #[serde(rename = "startDate")]
  pub start_date: Option<String>,
  #[serde(rename = "endDate")]
  pub end_date: Option<String>,
  pub goal: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiSprintsResponse {
  #[serde(default)]
  pub values: Vec<ApiSprint>,
  #[serde(rename = "isLast", default)]
  pub is_last: bool,
}

// ============================================================================
// Search endpoint
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct ApiIssueFields {
  #[serde(default)]
  pub summary: String,
  pub status: Option<ApiStatus>,
  #[serde(rename = "issuetype")]
  pub issue_type: Option<ApiIssueType>,
  pub assignee: Option<ApiUser>,
  // Description can be a string or an ADF document, handled separately
  pub description: Option<Value>,
  // Catch-all for custom fields (epic link, story points, release notes)
  #[serde(flatten)]
  pub extra: std::collections::HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ApiIssue {
  #[serde(default)]
  pub id: String,
  pub key: String,
  #[serde(default)]
  pub fields: ApiIssueFields,
}

#[derive(Debug, Deserialize)]
pub struct ApiSearchResponse {
  #[serde(default)]
  pub issues: Vec<ApiIssue>,
  #[serde(rename = "startAt", default)]
  pub start_at: u64,
  #[serde(rename = "maxResults", default)]
  pub max_results: u64,
  #[serde(default)]
  pub total: u64,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl From<ApiProject> for Project {
  fn from(p: ApiProject) -> Self {
    Project {
      id: p.id,
      key: p.key,
      name: p.name,
    }
  }
}

impl From<ApiMyself> for CurrentUser {
  fn from(m: ApiMyself) -> Self {
    CurrentUser {
      account_id: m.account_id,
      display_name: m.display_name,
      email: m.email_address,
    }
  }
}

impl From<ApiBoard> for Board {
  fn from(b: ApiBoard) -> Self {
    Board {
      id: b.id,
      name: b.name,
      board_type: b.board_type,
    }
  }
}

impl From<ApiSprint> for Sprint {
  fn from(s: ApiSprint) -> Self {
    Sprint {
      id: s.id,
      name: s.name,
      state: s.state,
      start_date: s.start_date,
      end_date: s.end_date,
      goal: s.goal,
    }
  }
}

impl ApiIssue {
  pub fn into_issue(self, fields: &IssueFieldMap) -> Issue {
    let f = self.fields;
    let (epic_key, epic_name, epic_color) = extract_epic(f.extra.get(&fields.epic));
    let story_points = extract_points(f.extra.get(&fields.story_points));
    let release_notes = fields
      .release_notes
      .as_ref()
      .and_then(|field| f.extra.get(field))
      .and_then(|v| rich_text_from(v.clone()).plain_text());
    let issue_type = f.issue_type.unwrap_or_default();

    Issue {
      id: self.id,
      key: self.key,
      summary: f.summary,
      description: f.description.map(rich_text_from),
      status: f.status.map(|s| s.name).unwrap_or_default(),
      assignee: f.assignee.map(|u| u.display_name),
      story_points,
      is_subtask: issue_type.subtask,
      issue_type: issue_type.name,
      epic_key,
      epic_name,
      epic_color,
      release_notes,
    }
  }
}

// ============================================================================
// Helpers
// ============================================================================

/// Classify a description value without flattening it.
pub fn rich_text_from(value: Value) -> RichText {
  if let Some(s) = value.as_str() {
    return RichText::Plain(s.to_string());
  }
  let is_doc = value.get("type").and_then(|t| t.as_str()) == Some("doc");
  if is_doc && value.get("content").is_some() {
    RichText::Document(value)
  } else {
    RichText::Opaque(value)
  }
}

/// Extract epic linkage from a custom field.
/// Epic fields can be:
/// - A string (epic key like "PROJ-123")
/// - An object with "key"/"name"/"summary" and an optional color
/// - null
fn extract_epic(value: Option<&Value>) -> (Option<String>, Option<String>, Option<String>) {
  let Some(value) = value else {
    return (None, None, None);
  };

  if let Some(s) = value.as_str() {
    if s.is_empty() {
      return (None, None, None);
    }
    return (Some(s.to_string()), None, None);
  }

  if let Some(obj) = value.as_object() {
    let key = obj
      .get("key")
      .and_then(|v| v.as_str())
      .map(String::from);
    let name = obj
      .get("name")
      .or_else(|| obj.get("summary"))
      .and_then(|v| v.as_str())
      .map(String::from);
    let color = match obj.get("color") {
      Some(Value::String(s)) => Some(s.clone()),
      Some(Value::Object(c)) => c.get("key").and_then(|v| v.as_str()).map(String::from),
      _ => None,
    };
    return (key, name, color);
  }

  (None, None, None)
}

/// Story points arrive as a JSON number, or occasionally as a numeric
/// string on older instances.
fn extract_points(value: Option<&Value>) -> Option<f64> {
  let value = value?;
  if let Some(n) = value.as_f64() {
    return Some(n);
  }
  value.as_str().and_then(|s| s.trim().parse().ok())
}
