//! Epic grouping and sprint-wide completion statistics.

use std::collections::BTreeMap;

use crate::jira::types::Issue;

/// Key and display name for issues with no epic linkage at all.
pub const NO_EPIC_KEY: &str = "no-epic";
pub const NO_EPIC_NAME: &str = "No Epic";

/// Issues rolled up under one epic.
#[derive(Debug, Clone)]
pub struct EpicGroup {
  pub epic_key: String,
  pub epic_name: String,
  pub epic_color: Option<String>,
  pub issues: Vec<Issue>,
  pub total_story_points: f64,
  pub completed_story_points: f64,
  pub completion_rate: u8,
}

/// Sprint-wide totals across every grouped issue.
#[derive(Debug, Clone, Default)]
pub struct SprintRollup {
  pub total_issues: usize,
  pub completed_issues: usize,
  pub total_story_points: f64,
  pub completed_story_points: f64,
  pub completion_rate: u8,
}

/// A malformed issue that was dropped during grouping.
#[derive(Debug, Clone)]
pub struct AggregationWarning {
  /// May be empty when the key itself was the missing field.
  pub issue_key: String,
  pub reason: String,
}

/// Result of grouping a sprint's issues by epic.
#[derive(Debug, Clone)]
pub struct Aggregation {
  /// Sorted by completion rate descending, then epic name ascending.
  pub groups: Vec<EpicGroup>,
  pub summary: SprintRollup,
  pub warnings: Vec<AggregationWarning>,
}

impl Aggregation {
  /// False means "nothing to report", which callers render as an empty
  /// state rather than an error.
  pub fn has_data(&self) -> bool {
    self.summary.total_issues > 0
  }
}

/// Group issues into epics, tolerating missing or partial epic metadata.
///
/// Structurally broken issues are dropped and reported as warnings
/// instead of failing the whole aggregation.
pub fn group_by_epic(issues: &[Issue]) -> Aggregation {
  let mut warnings = Vec::new();
  let mut buckets: BTreeMap<String, EpicGroup> = BTreeMap::new();

  for issue in issues {
    if let Some(reason) = structural_defect(issue) {
      tracing::warn!(issue_key = %issue.key, reason, "dropping malformed issue");
      warnings.push(AggregationWarning {
        issue_key: issue.key.clone(),
        reason: reason.to_string(),
      });
      continue;
    }

    let (group_key, name, color) = epic_identity(issue);
    let group = buckets.entry(group_key.clone()).or_insert_with(|| EpicGroup {
      epic_key: group_key,
      epic_name: name,
      epic_color: color,
      issues: Vec::new(),
      total_story_points: 0.0,
      completed_story_points: 0.0,
      completion_rate: 0,
    });

    // First issue to carry a color names the epic's color.
    if group.epic_color.is_none() {
      group.epic_color = issue.epic_color.clone();
    }

    group.total_story_points += issue.points();
    if issue.is_completed() {
      group.completed_story_points += issue.points();
    }
    group.issues.push(issue.clone());
  }

  let mut groups: Vec<EpicGroup> = buckets.into_values().collect();
  for group in &mut groups {
    group.completion_rate = rate(group.completed_story_points, group.total_story_points);
  }
  groups.sort_by(|a, b| {
    b.completion_rate
      .cmp(&a.completion_rate)
      .then_with(|| a.epic_name.cmp(&b.epic_name))
  });

  let summary = rollup(&groups);

  Aggregation {
    groups,
    summary,
    warnings,
  }
}

fn rollup(groups: &[EpicGroup]) -> SprintRollup {
  let mut summary = SprintRollup::default();
  for group in groups {
    for issue in &group.issues {
      summary.total_issues += 1;
      summary.total_story_points += issue.points();
      if issue.is_completed() {
        summary.completed_issues += 1;
        summary.completed_story_points += issue.points();
      }
    }
  }
  summary.completion_rate = rate(summary.completed_story_points, summary.total_story_points);
  summary
}

/// Percent completion, rounded; zero when nothing was estimated.
fn rate(completed: f64, total: f64) -> u8 {
  if total > 0.0 {
    (completed / total * 100.0).round() as u8
  } else {
    0
  }
}

fn structural_defect(issue: &Issue) -> Option<&'static str> {
  if issue.id.is_empty() {
    Some("missing id")
  } else if issue.key.is_empty() {
    Some("missing key")
  } else if issue.summary.is_empty() {
    Some("missing summary")
  } else if issue.issue_type.is_empty() {
    Some("missing issue type")
  } else {
    None
  }
}

/// Resolve an issue's epic identity: (group key, display name, color).
///
/// Precedence: explicit epic key, then an epic name that is itself an
/// issue key, then a name-derived composite key. The composite keeps
/// name-only epics from colliding with key-linked ones.
fn epic_identity(issue: &Issue) -> (String, String, Option<String>) {
  let epic_key = issue.epic_key.as_deref().filter(|k| !k.is_empty());
  let epic_name = issue.epic_name.as_deref().filter(|n| !n.is_empty());

  match (epic_key, epic_name) {
    (Some(key), name) => (
      key.to_string(),
      name.unwrap_or(key).to_string(),
      issue.epic_color.clone(),
    ),
    (None, Some(name)) if looks_like_issue_key(name) => {
      (name.to_string(), name.to_string(), issue.epic_color.clone())
    }
    (None, Some(name)) => (
      format!("name-{}", name),
      name.to_string(),
      issue.epic_color.clone(),
    ),
    (None, None) => (NO_EPIC_KEY.to_string(), NO_EPIC_NAME.to_string(), None),
  }
}

/// "PROJ-123" style: uppercase-led alphanumeric prefix, dash, digits.
fn looks_like_issue_key(s: &str) -> bool {
  let Some((prefix, number)) = s.split_once('-') else {
    return false;
  };
  let prefix_ok = prefix
    .chars()
    .next()
    .is_some_and(|c| c.is_ascii_uppercase())
    && prefix
      .chars()
      .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
  prefix_ok && !number.is_empty() && number.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn issue(key: &str, status: &str, points: Option<f64>) -> Issue {
    Issue {
      id: format!("id-{}", key),
      key: key.to_string(),
      summary: format!("Summary for {}", key),
      description: None,
      status: status.to_string(),
      assignee: None,
      story_points: points,
      issue_type: "Story".to_string(),
      is_subtask: false,
      epic_key: None,
      epic_name: None,
      epic_color: None,
      release_notes: None,
    }
  }

  fn issue_in_epic(key: &str, status: &str, points: Option<f64>, epic_key: &str) -> Issue {
    Issue {
      epic_key: Some(epic_key.to_string()),
      ..issue(key, status, points)
    }
  }

  #[test]
  fn test_grouping_is_deterministic() {
    let issues = vec![
      issue_in_epic("P-1", "Done", Some(5.0), "E1"),
      issue_in_epic("P-2", "To Do", Some(3.0), "E1"),
    ];

    let agg = group_by_epic(&issues);
    assert_eq!(agg.groups.len(), 1);

    let group = &agg.groups[0];
    assert_eq!(group.epic_key, "E1");
    assert_eq!(group.total_story_points, 8.0);
    assert_eq!(group.completed_story_points, 5.0);
    assert_eq!(group.completion_rate, 63); // round(5/8 * 100)
  }

  #[test]
  fn test_no_epic_issues_share_one_bucket() {
    let issues = vec![
      issue("P-1", "Done", Some(1.0)),
      issue("P-2", "To Do", Some(2.0)),
      issue("P-3", "To Do", None),
    ];

    let agg = group_by_epic(&issues);
    assert_eq!(agg.groups.len(), 1);
    assert_eq!(agg.groups[0].epic_key, NO_EPIC_KEY);
    assert_eq!(agg.groups[0].epic_name, NO_EPIC_NAME);
    assert_eq!(agg.groups[0].issues.len(), 3);
  }

  #[test]
  fn test_epic_name_that_is_an_issue_key_becomes_the_key() {
    let mut a = issue("P-1", "Done", Some(1.0));
    a.epic_name = Some("PROJ-99".to_string());
    let mut b = issue("P-2", "To Do", None);
    b.epic_key = Some("PROJ-99".to_string());

    let agg = group_by_epic(&[a, b]);
    // Same identity resolved two different ways must not split the epic.
    assert_eq!(agg.groups.len(), 1);
    assert_eq!(agg.groups[0].epic_key, "PROJ-99");
  }

  #[test]
  fn test_name_only_epic_gets_composite_key() {
    let mut a = issue("P-1", "Done", Some(1.0));
    a.epic_name = Some("Platform Work".to_string());

    let agg = group_by_epic(&[a]);
    assert_eq!(agg.groups[0].epic_key, "name-Platform Work");
    assert_eq!(agg.groups[0].epic_name, "Platform Work");
  }

  #[test]
  fn test_malformed_issues_are_dropped_with_warnings() {
    let mut broken = issue("P-1", "Done", Some(5.0));
    broken.summary = String::new();

    let issues = vec![broken, issue("P-2", "Done", Some(2.0))];
    let agg = group_by_epic(&issues);

    assert_eq!(agg.summary.total_issues, 1);
    assert_eq!(agg.warnings.len(), 1);
    assert_eq!(agg.warnings[0].issue_key, "P-1");
    assert_eq!(agg.warnings[0].reason, "missing summary");
  }

  #[test]
  fn test_empty_input_is_no_data_not_an_error() {
    let agg = group_by_epic(&[]);
    assert!(agg.groups.is_empty());
    assert!(!agg.has_data());
    assert_eq!(agg.summary.completion_rate, 0);
  }

  #[test]
  fn test_unestimated_issues_count_in_issue_totals_only() {
    let issues = vec![
      issue_in_epic("P-1", "Done", Some(4.0), "E1"),
      issue_in_epic("P-2", "Done", None, "E1"),
    ];

    let agg = group_by_epic(&issues);
    assert_eq!(agg.summary.total_issues, 2);
    assert_eq!(agg.summary.completed_issues, 2);
    assert_eq!(agg.summary.total_story_points, 4.0);
    assert_eq!(agg.groups[0].completion_rate, 100);
  }

  #[test]
  fn test_groups_sorted_by_rate_then_name() {
    let mut done_a = issue("P-1", "Done", Some(2.0));
    done_a.epic_name = Some("Alpha".to_string());
    let mut done_b = issue("P-2", "Done", Some(2.0));
    done_b.epic_name = Some("Beta".to_string());
    let mut open_c = issue("P-3", "To Do", Some(2.0));
    open_c.epic_name = Some("Gamma".to_string());

    let agg = group_by_epic(&[open_c, done_b, done_a]);
    let names: Vec<&str> = agg.groups.iter().map(|g| g.epic_name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);
  }

  #[test]
  fn test_zero_points_epic_has_zero_rate() {
    let issues = vec![issue_in_epic("P-1", "Done", None, "E1")];
    let agg = group_by_epic(&issues);
    assert_eq!(agg.groups[0].completion_rate, 0);
  }

  #[test]
  fn test_issue_key_pattern() {
    assert!(looks_like_issue_key("PROJ-123"));
    assert!(looks_like_issue_key("AB2-1"));
    assert!(!looks_like_issue_key("Platform Work"));
    assert!(!looks_like_issue_key("proj-123"));
    assert!(!looks_like_issue_key("PROJ-"));
    assert!(!looks_like_issue_key("PROJ"));
  }
}
