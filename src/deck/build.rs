//! Assembles a presentation from sprint data, aggregated epics, and
//! curated metrics.

use chrono::Utc;

use crate::config::DeckConfig;
use crate::epics::Aggregation;
use crate::jira::types::{Issue, Sprint};

use super::{Presentation, PresentationMeta, Slide, SlideContent, SlideKind, SprintMetrics};

/// Collects slides with sequential ids and render order.
struct SlideList {
  slides: Vec<Slide>,
}

impl SlideList {
  fn new() -> Self {
    Self { slides: Vec::new() }
  }

  fn push(&mut self, title: String, content: SlideContent, kind: SlideKind) -> &mut Slide {
    let order = self.slides.len() as u32 + 1;
    self.slides.push(Slide {
      id: format!("slide-{}", order),
      title,
      content,
      kind,
      order,
      corporate_slide_url: None,
      story_key: None,
    });
    self.slides.last_mut().expect("just pushed")
  }
}

/// Build a review deck for one sprint.
///
/// Slide order: title, sprint summary, metrics, epic overview (when there
/// is data), one slide per demo story, corporate slides from config, and
/// an upcoming-work slide when the next sprint has content.
pub fn build_presentation(
  sprint: &Sprint,
  issues: &[Issue],
  upcoming: &[Issue],
  metrics: &SprintMetrics,
  aggregation: &Aggregation,
  deck: &DeckConfig,
) -> Presentation {
  let mut list = SlideList::new();

  list.push(
    format!("Sprint Review: {}", sprint.name),
    SlideContent::Plain(sprint.goal.clone().unwrap_or_default()),
    SlideKind::Title,
  );

  list.push(
    "Sprint Summary".to_string(),
    SlideContent::Plain(summary_text(aggregation)),
    SlideKind::Summary,
  );

  list.push(
    "Sprint Metrics".to_string(),
    SlideContent::Plain(metrics_text(metrics)),
    SlideKind::Metrics,
  );

  if aggregation.has_data() {
    list.push(
      "Epic Progress".to_string(),
      SlideContent::Plain(epic_text(aggregation)),
      SlideKind::EpicOverview,
    );
  }

  for story in pick_demo_stories(issues, deck.max_demo_stories) {
    let slide = list.push(
      story.summary.clone(),
      SlideContent::Story {
        accomplishments: story
          .release_notes
          .clone()
          .unwrap_or_else(|| story.summary.clone()),
        business_value: story
          .description
          .as_ref()
          .and_then(|d| d.plain_text())
          .unwrap_or_default(),
        user_impact: String::new(),
      },
      SlideKind::DemoStory,
    );
    slide.story_key = Some(story.key.clone());
  }

  for corporate in &deck.corporate_slides {
    let slide = list.push(
      corporate.title.clone(),
      SlideContent::Plain(String::new()),
      SlideKind::Corporate,
    );
    slide.corporate_slide_url = Some(corporate.url.clone());
  }

  if !upcoming.is_empty() {
    list.push(
      "Up Next".to_string(),
      SlideContent::Plain(upcoming_text(upcoming)),
      SlideKind::Upcoming,
    );
  }

  Presentation {
    id: format!("deck-sprint-{}", sprint.id),
    title: format!("Sprint Review: {}", sprint.name),
    slides: list.slides,
    created_at: Utc::now(),
    meta: PresentationMeta {
      project: None,
      sprint_name: Some(sprint.name.clone()),
      board_id: None,
    },
  }
  .normalized()
}

/// Demo candidates: curated release notes first, then completed stories,
/// capped.
fn pick_demo_stories(issues: &[Issue], cap: usize) -> Vec<&Issue> {
  let mut picked: Vec<&Issue> = issues
    .iter()
    .filter(|i| !i.is_subtask && i.release_notes.is_some())
    .collect();

  for issue in issues {
    if picked.len() >= cap {
      break;
    }
    if !issue.is_subtask
      && issue.release_notes.is_none()
      && issue.is_completed()
      && !picked.iter().any(|p| p.key == issue.key)
    {
      picked.push(issue);
    }
  }

  picked.truncate(cap);
  picked
}

fn summary_text(aggregation: &Aggregation) -> String {
  let s = &aggregation.summary;
  format!(
    "{} of {} issues completed\n{:.0} of {:.0} story points delivered\nCompletion rate {}%",
    s.completed_issues, s.total_issues, s.completed_story_points, s.total_story_points, s.completion_rate
  )
}

fn metrics_text(metrics: &SprintMetrics) -> String {
  format!(
    "Planned items: {}\nEstimated points: {:.0}\nCarry-forward points: {:.0}\nTest coverage: {:.1}%\nQuality score: {}%",
    metrics.planned_items,
    metrics.estimated_points,
    metrics.carry_forward_points,
    metrics.test_coverage,
    metrics.quality_score()
  )
}

fn epic_text(aggregation: &Aggregation) -> String {
  aggregation
    .groups
    .iter()
    .map(|g| {
      format!(
        "{}: {}% ({:.0}/{:.0} pts, {} issues)",
        g.epic_name,
        g.completion_rate,
        g.completed_story_points,
        g.total_story_points,
        g.issues.len()
      )
    })
    .collect::<Vec<_>>()
    .join("\n")
}

fn upcoming_text(upcoming: &[Issue]) -> String {
  const MAX_LISTED: usize = 10;
  let mut lines: Vec<String> = upcoming
    .iter()
    .take(MAX_LISTED)
    .map(|i| format!("{} {}", i.key, i.summary))
    .collect();
  if upcoming.len() > MAX_LISTED {
    lines.push(format!("and {} more", upcoming.len() - MAX_LISTED));
  }
  lines.join("\n")
}
