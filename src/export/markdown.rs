//! Markdown generator.

use super::error::ExportError;
use super::{Quality, RenderInput};
use crate::deck::{Slide, SlideContent, SlideKind};
use crate::jira::types::Issue;

pub(crate) fn render(input: &RenderInput) -> Result<Vec<u8>, ExportError> {
  let mut out = String::new();
  let quality = input.options.quality;

  out.push_str(&format!("# {}\n\n", input.presentation.title));
  out.push_str(&format!(
    "_Generated {}_\n\n",
    input.presentation.created_at.format("%Y-%m-%d")
  ));
  let meta = &input.presentation.meta;
  if let Some(project) = &meta.project {
    out.push_str(&format!("_Project: {}_\n\n", project));
  }
  if let Some(board_id) = meta.board_id {
    out.push_str(&format!("_Board: {}_\n\n", board_id));
  }

  for slide in &input.presentation.slides {
    render_slide(&mut out, input, slide, quality);
  }

  Ok(out.into_bytes())
}

fn render_slide(out: &mut String, input: &RenderInput, slide: &Slide, quality: Quality) {
  out.push_str(&format!("## {}\n\n", slide.title));

  if quality == Quality::Low {
    return;
  }

  match slide.kind {
    SlideKind::Metrics => {
      metrics_table(out, input);
    }
    SlideKind::EpicOverview => {
      epic_table(out, input, quality);
    }
    SlideKind::DemoStory => {
      story_section(out, input, slide, quality);
    }
    SlideKind::Corporate => {
      if let Some(url) = &slide.corporate_slide_url {
        if input.options.include_images {
          out.push_str(&format!("![{}]({})\n\n", slide.title, url));
        } else {
          out.push_str(&format!("[{}]({})\n\n", slide.title, url));
        }
      }
    }
    SlideKind::Upcoming if quality == Quality::High && !input.upcoming.is_empty() => {
      out.push_str("| Key | Summary | Points |\n|---|---|---|\n");
      for issue in input.upcoming {
        out.push_str(&format!(
          "| `{}` | {} | {:.0} |\n",
          issue.key,
          issue.summary,
          issue.points()
        ));
      }
      out.push('\n');
    }
    _ => {
      if let SlideContent::Plain(text) = &slide.content {
        if !text.trim().is_empty() {
          out.push_str(text.trim_end());
          out.push_str("\n\n");
        }
      }
    }
  }
}

fn metrics_table(out: &mut String, input: &RenderInput) {
  let m = input.metrics;
  out.push_str("| Metric | Value |\n|---|---|\n");
  out.push_str(&format!("| Sprint | {} |\n", m.sprint_number));
  out.push_str(&format!("| Planned items | {} |\n", m.planned_items));
  out.push_str(&format!("| Estimated points | {:.0} |\n", m.estimated_points));
  out.push_str(&format!(
    "| Carry-forward points | {:.0} |\n",
    m.carry_forward_points
  ));
  out.push_str(&format!(
    "| Completed points | {:.0} |\n",
    m.completed_total_points
  ));
  out.push_str(&format!("| Test coverage | {:.1}% |\n", m.test_coverage));
  out.push_str(&format!("| Quality score | {}% |\n", m.quality_score()));
  out.push('\n');
}

fn epic_table(out: &mut String, input: &RenderInput, quality: Quality) {
  out.push_str("| Epic | Issues | Points | Done | Rate |\n|---|---|---|---|---|\n");
  for group in &input.aggregation.groups {
    out.push_str(&format!(
      "| {} | {} | {:.0} | {:.0} | {}% |\n",
      group.epic_name,
      group.issues.len(),
      group.total_story_points,
      group.completed_story_points,
      group.completion_rate
    ));
  }
  out.push('\n');

  if quality == Quality::High {
    for group in &input.aggregation.groups {
      out.push_str(&format!("### {}\n\n", group.epic_name));
      for issue in &group.issues {
        out.push_str(&format!(
          "- `{}` {} ({})\n",
          issue.key, issue.summary, issue.status
        ));
      }
      out.push('\n');
    }
  }
}

fn story_section(out: &mut String, input: &RenderInput, slide: &Slide, quality: Quality) {
  if let SlideContent::Story {
    accomplishments,
    business_value,
    user_impact,
  } = &slide.content
  {
    for (label, text) in [
      ("What we did", accomplishments),
      ("Business value", business_value),
      ("User impact", user_impact),
    ] {
      if !text.trim().is_empty() {
        out.push_str(&format!("**{}:** {}\n\n", label, text.trim()));
      }
    }
  }

  if quality == Quality::High {
    if let Some(issue) = find_story(input, slide) {
      out.push_str(&format!(
        "- Status: {}\n- Points: {:.0}\n",
        issue.status,
        issue.points()
      ));
      if let Some(assignee) = &issue.assignee {
        out.push_str(&format!("- Owner: {}\n", assignee));
      }
      if let Some(text) = issue.description.as_ref().and_then(|d| d.plain_text()) {
        out.push_str(&format!("\n{}\n", text.trim_end()));
      }
      out.push('\n');
    }
  }
}

fn find_story<'a>(input: &'a RenderInput, slide: &Slide) -> Option<&'a Issue> {
  let key = slide.story_key.as_deref()?;
  input.issues.iter().find(|i| i.key == key)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::deck::{Presentation, PresentationMeta, SprintMetrics};
  use crate::epics;
  use crate::export::{ExportFormat, ExportOptions};
  use chrono::Utc;

  fn presentation(slides: Vec<Slide>) -> Presentation {
    Presentation {
      id: "deck-1".into(),
      title: "Sprint Review: Sprint 42".into(),
      slides,
      created_at: Utc::now(),
      meta: PresentationMeta::default(),
    }
  }

  fn slide(kind: SlideKind, content: SlideContent) -> Slide {
    Slide {
      id: "s1".into(),
      title: "A Slide".into(),
      content,
      kind,
      order: 1,
      corporate_slide_url: None,
      story_key: None,
    }
  }

  fn render_to_string(
    presentation: &Presentation,
    issues: &[Issue],
    options: &ExportOptions,
  ) -> String {
    let metrics = SprintMetrics::default();
    let aggregation = epics::group_by_epic(issues);
    let input = RenderInput {
      presentation,
      issues,
      upcoming: &[],
      metrics: &metrics,
      aggregation: &aggregation,
      options,
    };
    String::from_utf8(render(&input).unwrap()).unwrap()
  }

  #[test]
  fn test_title_and_slide_headings() {
    let p = presentation(vec![slide(
      SlideKind::Summary,
      SlideContent::Plain("3 of 5 issues completed".into()),
    )]);
    let md = render_to_string(&p, &[], &ExportOptions::new(ExportFormat::Markdown));

    assert!(md.starts_with("# Sprint Review: Sprint 42\n"));
    assert!(md.contains("## A Slide"));
    assert!(md.contains("3 of 5 issues completed"));
  }

  #[test]
  fn test_low_quality_omits_content() {
    let p = presentation(vec![slide(
      SlideKind::Summary,
      SlideContent::Plain("details that low quality drops".into()),
    )]);
    let options = ExportOptions {
      quality: Quality::Low,
      ..ExportOptions::new(ExportFormat::Markdown)
    };
    let md = render_to_string(&p, &[], &options);

    assert!(md.contains("## A Slide"));
    assert!(!md.contains("details that low quality drops"));
  }

  #[test]
  fn test_corporate_slide_image_toggle() {
    let mut s = slide(SlideKind::Corporate, SlideContent::Plain(String::new()));
    s.corporate_slide_url = Some("https://example.com/brand.png".into());
    let p = presentation(vec![s]);

    let with_images = render_to_string(&p, &[], &ExportOptions::new(ExportFormat::Markdown));
    assert!(with_images.contains("![A Slide](https://example.com/brand.png)"));

    let options = ExportOptions {
      include_images: false,
      ..ExportOptions::new(ExportFormat::Markdown)
    };
    let without = render_to_string(&p, &[], &options);
    assert!(without.contains("[A Slide](https://example.com/brand.png)"));
    assert!(!without.contains("!["));
  }

  #[test]
  fn test_upcoming_slide_tabulates_issues_at_high_quality() {
    let p = presentation(vec![slide(
      SlideKind::Upcoming,
      SlideContent::Plain("P-9 Story P-9".into()),
    )]);
    let upcoming = vec![Issue {
      id: "id-9".into(),
      key: "P-9".into(),
      summary: "Story P-9".into(),
      description: None,
      status: "To Do".into(),
      assignee: None,
      story_points: Some(3.0),
      issue_type: "Story".into(),
      is_subtask: false,
      epic_key: None,
      epic_name: None,
      epic_color: None,
      release_notes: None,
    }];
    let metrics = SprintMetrics::default();
    let aggregation = epics::group_by_epic(&[]);
    let options = ExportOptions {
      quality: Quality::High,
      ..ExportOptions::new(ExportFormat::Markdown)
    };
    let input = RenderInput {
      presentation: &p,
      issues: &[],
      upcoming: &upcoming,
      metrics: &metrics,
      aggregation: &aggregation,
      options: &options,
    };
    let md = String::from_utf8(render(&input).unwrap()).unwrap();

    assert!(md.contains("| Key | Summary | Points |"));
    assert!(md.contains("| `P-9` | Story P-9 | 3 |"));
  }

  #[test]
  fn test_story_slide_sections() {
    let s = Slide {
      story_key: Some("P-1".into()),
      ..slide(
        SlideKind::DemoStory,
        SlideContent::Story {
          accomplishments: "Shipped it".into(),
          business_value: "Fewer tickets".into(),
          user_impact: String::new(),
        },
      )
    };
    let md = render_to_string(
      &presentation(vec![s]),
      &[],
      &ExportOptions::new(ExportFormat::Markdown),
    );

    assert!(md.contains("**What we did:** Shipped it"));
    assert!(md.contains("**Business value:** Fewer tickets"));
    assert!(!md.contains("**User impact:**"));
  }
}
