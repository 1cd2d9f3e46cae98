//! HTML generators: the full slide deck and the condensed executive
//! summary.

use super::error::ExportError;
use super::{Quality, RenderInput};
use crate::deck::{Slide, SlideContent, SlideKind};

pub(crate) enum Variant {
  Full,
  Executive,
}

pub(crate) fn render(input: &RenderInput, variant: Variant) -> Result<Vec<u8>, ExportError> {
  let body = match variant {
    Variant::Full => full_body(input),
    Variant::Executive => executive_body(input),
  };

  let mut out = String::new();
  out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
  out.push_str("<meta charset=\"utf-8\">\n");
  out.push_str(&format!("<title>{}</title>\n", esc(&input.presentation.title)));
  out.push_str("<style>\n");
  out.push_str(STYLE);
  out.push_str("</style>\n</head>\n<body>\n");
  out.push_str(&body);
  if matches!(variant, Variant::Full) && input.options.interactive {
    out.push_str("<script>\n");
    out.push_str(NAV_SCRIPT);
    out.push_str("</script>\n");
  }
  out.push_str("</body>\n</html>\n");

  Ok(out.into_bytes())
}

const STYLE: &str = "\
body { font-family: sans-serif; margin: 2rem auto; max-width: 52rem; color: #222; }\n\
section.slide { border-bottom: 1px solid #ddd; padding: 1.5rem 0; }\n\
h1 { font-size: 1.8rem; } h2 { font-size: 1.3rem; }\n\
table { border-collapse: collapse; } td, th { border: 1px solid #ccc; padding: 0.3rem 0.6rem; }\n\
img { max-width: 100%; }\n\
.stat { display: inline-block; margin-right: 2rem; font-size: 1.1rem; }\n";

const NAV_SCRIPT: &str = "\
document.addEventListener('keydown', (e) => {\n\
  const slides = Array.from(document.querySelectorAll('section.slide'));\n\
  const y = window.scrollY + 10;\n\
  const idx = slides.findIndex(s => s.offsetTop > y);\n\
  if (e.key === 'ArrowRight' && idx >= 0) slides[idx].scrollIntoView();\n\
  if (e.key === 'ArrowLeft') {\n\
    const prev = slides.filter(s => s.offsetTop < y - 20).pop();\n\
    if (prev) prev.scrollIntoView();\n\
  }\n\
});\n";

fn full_body(input: &RenderInput) -> String {
  let mut out = String::new();
  out.push_str(&format!("<h1>{}</h1>\n", esc(&input.presentation.title)));

  for slide in &input.presentation.slides {
    out.push_str(&format!("<section class=\"slide\" id=\"{}\">\n", esc(&slide.id)));
    out.push_str(&format!("<h2>{}</h2>\n", esc(&slide.title)));
    if input.options.quality != Quality::Low {
      slide_body(&mut out, input, slide);
    }
    out.push_str("</section>\n");
  }
  out
}

fn slide_body(out: &mut String, input: &RenderInput, slide: &Slide) {
  match slide.kind {
    SlideKind::Metrics => {
      let m = input.metrics;
      out.push_str("<table>\n");
      for (label, value) in [
        ("Sprint", m.sprint_number.to_string()),
        ("Planned items", m.planned_items.to_string()),
        ("Estimated points", format!("{:.0}", m.estimated_points)),
        ("Completed points", format!("{:.0}", m.completed_total_points)),
        ("Test coverage", format!("{:.1}%", m.test_coverage)),
        ("Quality score", format!("{}%", m.quality_score())),
      ] {
        out.push_str(&format!(
          "<tr><th>{}</th><td>{}</td></tr>\n",
          label,
          esc(&value)
        ));
      }
      out.push_str("</table>\n");
    }
    SlideKind::EpicOverview => {
      epic_table(out, input);
    }
    SlideKind::Corporate => {
      if let Some(url) = &slide.corporate_slide_url {
        if input.options.include_images {
          out.push_str(&format!(
            "<img src=\"{}\" alt=\"{}\">\n",
            esc(url),
            esc(&slide.title)
          ));
        } else {
          out.push_str(&format!(
            "<p><a href=\"{}\">{}</a></p>\n",
            esc(url),
            esc(&slide.title)
          ));
        }
      }
    }
    SlideKind::Upcoming
      if input.options.quality == Quality::High && !input.upcoming.is_empty() =>
    {
      out.push_str("<ul>\n");
      for issue in input.upcoming {
        out.push_str(&format!(
          "<li><code>{}</code> {} ({:.0} pts)</li>\n",
          esc(&issue.key),
          esc(&issue.summary),
          issue.points()
        ));
      }
      out.push_str("</ul>\n");
    }
    _ => match &slide.content {
      SlideContent::Plain(text) => {
        for paragraph in text.split("\n\n") {
          if !paragraph.trim().is_empty() {
            out.push_str(&format!(
              "<p>{}</p>\n",
              esc(paragraph.trim()).replace('\n', "<br>\n")
            ));
          }
        }
      }
      SlideContent::Story {
        accomplishments,
        business_value,
        user_impact,
      } => {
        out.push_str("<dl>\n");
        for (label, text) in [
          ("What we did", accomplishments),
          ("Business value", business_value),
          ("User impact", user_impact),
        ] {
          if !text.trim().is_empty() {
            out.push_str(&format!(
              "<dt>{}</dt><dd>{}</dd>\n",
              label,
              esc(text.trim())
            ));
          }
        }
        out.push_str("</dl>\n");
        if input.options.quality == Quality::High {
          if let Some(issue) = slide
            .story_key
            .as_deref()
            .and_then(|key| input.issues.iter().find(|i| i.key == key))
          {
            out.push_str(&format!(
              "<p><code>{}</code> {} ({:.0} pts)</p>\n",
              esc(&issue.key),
              esc(&issue.status),
              issue.points()
            ));
          }
        }
      }
    },
  }
}

fn epic_table(out: &mut String, input: &RenderInput) {
  out.push_str("<table>\n<tr><th>Epic</th><th>Issues</th><th>Points done</th><th>Rate</th></tr>\n");
  for group in &input.aggregation.groups {
    out.push_str(&format!(
      "<tr><td>{}</td><td>{}</td><td>{:.0} / {:.0}</td><td>{}%</td></tr>\n",
      esc(&group.epic_name),
      group.issues.len(),
      group.completed_story_points,
      group.total_story_points,
      group.completion_rate
    ));
  }
  out.push_str("</table>\n");
}

/// One condensed page: headline numbers, epic table, leading stories.
fn executive_body(input: &RenderInput) -> String {
  let mut out = String::new();
  let summary = &input.aggregation.summary;

  out.push_str(&format!("<h1>{}</h1>\n", esc(&input.presentation.title)));
  if let Some(sprint_name) = &input.presentation.meta.sprint_name {
    out.push_str(&format!("<p>{}</p>\n", esc(sprint_name)));
  }
  out.push_str("<p>\n");
  for (label, value) in [
    (
      "Issues completed",
      format!("{} / {}", summary.completed_issues, summary.total_issues),
    ),
    (
      "Points delivered",
      format!(
        "{:.0} / {:.0}",
        summary.completed_story_points, summary.total_story_points
      ),
    ),
    ("Completion", format!("{}%", summary.completion_rate)),
    (
      "Quality score",
      format!("{}%", input.metrics.quality_score()),
    ),
  ] {
    out.push_str(&format!(
      "<span class=\"stat\"><strong>{}</strong> {}</span>\n",
      label,
      esc(&value)
    ));
  }
  out.push_str("</p>\n");

  if input.aggregation.has_data() {
    out.push_str("<h2>Epics</h2>\n");
    epic_table(&mut out, input);
  }

  let stories: Vec<&Slide> = input
    .presentation
    .slides
    .iter()
    .filter(|s| s.kind == SlideKind::DemoStory)
    .collect();
  if !stories.is_empty() {
    out.push_str("<h2>Highlights</h2>\n<ul>\n");
    for story in stories {
      let headline = match &story.content {
        SlideContent::Story { accomplishments, .. } if !accomplishments.trim().is_empty() => {
          accomplishments.trim()
        }
        _ => story.title.as_str(),
      };
      out.push_str(&format!("<li>{}</li>\n", esc(headline)));
    }
    out.push_str("</ul>\n");
  }

  out
}

fn esc(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      _ => out.push(c),
    }
  }
  out
}
