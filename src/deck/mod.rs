//! Presentation model: slides, sprint metrics, and normalization rules.

pub mod build;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What a slide renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlideKind {
  Title,
  Summary,
  Metrics,
  EpicOverview,
  DemoStory,
  Corporate,
  Upcoming,
}

/// Slide body: free text, or the structured demo-story triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlideContent {
  Plain(String),
  Story {
    accomplishments: String,
    business_value: String,
    user_impact: String,
  },
}

impl SlideContent {
  pub fn is_empty(&self) -> bool {
    match self {
      SlideContent::Plain(text) => text.trim().is_empty(),
      SlideContent::Story {
        accomplishments,
        business_value,
        user_impact,
      } => {
        accomplishments.trim().is_empty()
          && business_value.trim().is_empty()
          && user_impact.trim().is_empty()
      }
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
  pub id: String,
  pub title: String,
  pub content: SlideContent,
  pub kind: SlideKind,
  /// Render position; unique within a normalized presentation.
  pub order: u32,
  pub corporate_slide_url: Option<String>,
  /// Issue key backing a demo-story slide.
  pub story_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresentationMeta {
  pub project: Option<String>,
  pub sprint_name: Option<String>,
  pub board_id: Option<u64>,
}

/// An ordered slide deck ready for export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presentation {
  pub id: String,
  pub title: String,
  pub slides: Vec<Slide>,
  pub created_at: DateTime<Utc>,
  pub meta: PresentationMeta,
}

impl Presentation {
  /// Enforce the slide-list invariants every consumer relies on:
  /// duplicate ids keep their first occurrence, and survivors are sorted
  /// by `order`.
  pub fn normalized(mut self) -> Self {
    let mut seen = BTreeSet::new();
    self.slides.retain(|slide| seen.insert(slide.id.clone()));
    self.slides.sort_by_key(|slide| slide.order);
    self
  }
}

/// One answer on the sprint quality checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecklistAnswer {
  Yes,
  Partial,
  No,
  Na,
}

impl ChecklistAnswer {
  /// Score contribution; `None` means excluded from the mean.
  fn score(self) -> Option<f64> {
    match self {
      ChecklistAnswer::Yes => Some(1.0),
      ChecklistAnswer::Partial => Some(0.5),
      ChecklistAnswer::No => Some(0.0),
      ChecklistAnswer::Na => None,
    }
  }
}

/// Sprint-level figures curated alongside the fetched issues.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SprintMetrics {
  pub sprint_number: u32,
  pub planned_items: u32,
  pub estimated_points: f64,
  pub carry_forward_points: f64,
  pub committed_buffer_points: f64,
  pub completed_buffer_points: f64,
  pub completed_total_points: f64,
  pub completed_adjusted_points: f64,
  /// Percent, 0-100.
  pub test_coverage: f64,
  pub quality_checklist: BTreeMap<String, ChecklistAnswer>,
}

impl SprintMetrics {
  /// Mean of the answered checklist items as a percent. Items marked
  /// not-applicable are excluded; a checklist with nothing applicable
  /// scores 0.
  pub fn quality_score(&self) -> u8 {
    let scores: Vec<f64> = self
      .quality_checklist
      .values()
      .filter_map(|answer| answer.score())
      .collect();
    if scores.is_empty() {
      return 0;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    (mean * 100.0).round() as u8
  }
}
