//! Domain types for Jira data, kept separate from the wire shapes in
//! `api_types`.

use serde::{Deserialize, Serialize};

/// Jira project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
  pub id: String,
  pub key: String,
  pub name: String,
}

/// The authenticated user, from `/myself`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
  pub account_id: String,
  pub display_name: String,
  pub email: Option<String>,
}

/// Board summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
  pub id: u64,
  pub name: String,
  pub board_type: String, // "scrum" or "kanban"
}

/// Sprint summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sprint {
  pub id: u64,
  pub name: String,
  pub state: String, // "active", "closed" or "future"
  pub start_date: Option<String>,
  pub end_date: Option<String>,
  pub goal: Option<String>,
}

impl Sprint {
  pub fn is_active(&self) -> bool {
    self.state.eq_ignore_ascii_case("active")
  }

  pub fn is_future(&self) -> bool {
    self.state.eq_ignore_ascii_case("future")
  }
}

/// Rich-text issue body.
///
/// Jira returns descriptions either as plain strings (API v2) or as ADF
/// documents (API v3). Anything else is kept opaque rather than guessed
/// at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RichText {
  Plain(String),
  Document(serde_json::Value),
  Opaque(serde_json::Value),
}

impl RichText {
  /// Extract readable text. `Opaque` bodies yield nothing.
  pub fn plain_text(&self) -> Option<String> {
    match self {
      RichText::Plain(s) => Some(s.clone()),
      RichText::Document(doc) => {
        let content = doc.get("content")?.as_array()?;
        let mut text = String::new();
        collect_adf_text(content, &mut text);
        let text = text.trim_end().to_string();
        if text.is_empty() {
          None
        } else {
          Some(text)
        }
      }
      RichText::Opaque(_) => None,
    }
  }
}

/// Recursively extract text from ADF content nodes.
fn collect_adf_text(content: &[serde_json::Value], output: &mut String) {
  for node in content {
    let Some(node_type) = node.get("type").and_then(|v| v.as_str()) else {
      continue;
    };
    match node_type {
      "text" => {
        if let Some(text) = node.get("text").and_then(|v| v.as_str()) {
          output.push_str(text);
        }
      }
      "paragraph" | "heading" | "bulletList" | "orderedList" | "listItem" => {
        if let Some(children) = node.get("content").and_then(|v| v.as_array()) {
          collect_adf_text(children, output);
        }
        if node_type == "paragraph" || node_type == "heading" {
          output.push('\n');
        }
      }
      "hardBreak" => {
        output.push('\n');
      }
      _ => {
        // Try to extract from children anyway
        if let Some(children) = node.get("content").and_then(|v| v.as_array()) {
          collect_adf_text(children, output);
        }
      }
    }
  }
}

/// An issue as consumed by aggregation and export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
  pub id: String,
  pub key: String,
  pub summary: String,
  pub description: Option<RichText>,
  pub status: String,
  pub assignee: Option<String>,
  pub story_points: Option<f64>,
  pub issue_type: String,
  pub is_subtask: bool,
  pub epic_key: Option<String>,
  pub epic_name: Option<String>,
  pub epic_color: Option<String>,
  pub release_notes: Option<String>,
}

/// Status names that count as completed. Jira workflows label their done
/// states inconsistently, so this is a containment check, not an equality
/// check.
const DONE_STATES: &[&str] = &["done", "closed", "resolved", "complete"];

impl Issue {
  /// Whether this issue counts as completed for statistics.
  pub fn is_completed(&self) -> bool {
    let status = self.status.to_lowercase();
    DONE_STATES.iter().any(|s| status.contains(s))
  }

  /// Story points, with unestimated issues counting as zero.
  pub fn points(&self) -> f64 {
    self.story_points.unwrap_or(0.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn issue_with_status(status: &str) -> Issue {
    Issue {
      id: "1".into(),
      key: "PROJ-1".into(),
      summary: "test".into(),
      description: None,
      status: status.into(),
      assignee: None,
      story_points: None,
      issue_type: "Story".into(),
      is_subtask: false,
      epic_key: None,
      epic_name: None,
      epic_color: None,
      release_notes: None,
    }
  }

  #[test]
  fn test_completed_matches_varied_done_labels() {
    for status in ["Done", "DONE", "Closed", "Resolved", "Completed", "complete"] {
      assert!(issue_with_status(status).is_completed(), "{status}");
    }
  }

  #[test]
  fn test_in_progress_is_not_completed() {
    for status in ["To Do", "In Progress", "In Review", "Blocked"] {
      assert!(!issue_with_status(status).is_completed(), "{status}");
    }
  }

  #[test]
  fn test_plain_text_from_plain() {
    let text = RichText::Plain("hello".into());
    assert_eq!(text.plain_text(), Some("hello".into()));
  }

  #[test]
  fn test_plain_text_from_adf_document() {
    let doc = RichText::Document(json!({
      "type": "doc",
      "version": 1,
      "content": [
        { "type": "paragraph", "content": [{ "type": "text", "text": "first" }] },
        { "type": "bulletList", "content": [
          { "type": "listItem", "content": [
            { "type": "paragraph", "content": [{ "type": "text", "text": "second" }] }
          ]}
        ]}
      ]
    }));
    assert_eq!(doc.plain_text(), Some("first\nsecond".into()));
  }

  #[test]
  fn test_plain_text_from_opaque_is_none() {
    let body = RichText::Opaque(json!({ "unexpected": true }));
    assert_eq!(body.plain_text(), None);
  }
}
