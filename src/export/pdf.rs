//! Self-contained PDF writer for the deck formats.
//!
//! Emits PDF 1.4 with Type1 Helvetica text: one page per slide in the
//! standard layout, continuous high-density flow in the digest layout.
//! Content streams are deflated when compression is on.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write as _;

use super::error::{ExportError, ExportErrorCode};
use super::{Quality, RenderInput};
use crate::deck::{Slide, SlideContent, SlideKind};

pub(crate) enum Layout {
  Standard,
  Digest,
}

// US Letter, points.
const PAGE_WIDTH: f64 = 612.0;
const PAGE_HEIGHT: f64 = 792.0;
const MARGIN: f64 = 54.0;

#[derive(Debug, Clone)]
struct TextLine {
  x: f64,
  y: f64,
  size: f64,
  bold: bool,
  text: String,
}

/// Flows text down the page, breaking to a new page when the bottom
/// margin is reached.
struct Typesetter {
  pages: Vec<Vec<TextLine>>,
  body_size: f64,
  y: f64,
}

impl Typesetter {
  fn new(body_size: f64) -> Self {
    Self {
      pages: vec![Vec::new()],
      body_size,
      y: PAGE_HEIGHT - MARGIN,
    }
  }

  fn page_break(&mut self) {
    if self.pages.last().is_some_and(|p| !p.is_empty()) {
      self.pages.push(Vec::new());
    }
    self.y = PAGE_HEIGHT - MARGIN;
  }

  fn text(&mut self, text: &str, size: f64, bold: bool) {
    for wrapped in wrap(text, max_chars(size)) {
      if self.y - size * 1.3 < MARGIN {
        self.page_break();
      }
      self.y -= size * 1.3;
      self.pages.last_mut().expect("page exists").push(TextLine {
        x: MARGIN,
        y: self.y,
        size,
        bold,
        text: wrapped,
      });
    }
  }

  fn heading(&mut self, text: &str, size: f64) {
    self.gap(size * 0.4);
    self.text(text, size, true);
    self.gap(size * 0.25);
  }

  fn body(&mut self, text: &str) {
    let size = self.body_size;
    self.text(text, size, false);
  }

  fn gap(&mut self, amount: f64) {
    self.y -= amount;
  }
}

/// Rough per-line character budget for the usable width. Helvetica
/// averages about half an em per glyph, which is plenty accurate for a
/// text report.
fn max_chars(size: f64) -> usize {
  let usable = PAGE_WIDTH - 2.0 * MARGIN;
  ((usable / (size * 0.5)) as usize).max(8)
}

fn wrap(text: &str, max: usize) -> Vec<String> {
  let mut lines = Vec::new();
  for raw in text.lines() {
    if raw.trim().is_empty() {
      lines.push(String::new());
      continue;
    }
    let mut current = String::new();
    for word in raw.split_whitespace() {
      if !current.is_empty() && current.len() + 1 + word.len() > max {
        lines.push(std::mem::take(&mut current));
      }
      if !current.is_empty() {
        current.push(' ');
      }
      current.push_str(word);
    }
    if !current.is_empty() {
      lines.push(current);
    }
  }
  if lines.is_empty() {
    lines.push(String::new());
  }
  lines
}

pub(crate) fn render(input: &RenderInput, layout: Layout) -> Result<Vec<u8>, ExportError> {
  let pages = match layout {
    Layout::Standard => layout_standard(input),
    Layout::Digest => layout_digest(input),
  };
  write_pdf(&pages, input.options.compression)
}

/// One slide per page, presentation-style sizes.
fn layout_standard(input: &RenderInput) -> Vec<Vec<TextLine>> {
  let mut ts = Typesetter::new(12.0);
  let mut first = true;

  for slide in &input.presentation.slides {
    if !first {
      ts.page_break();
    }
    first = false;
    ts.text(&slide.title, 22.0, true);
    ts.gap(12.0);
    slide_body(&mut ts, input, slide);
  }

  ts.pages
}

/// Continuous dense flow: smaller type, shared pages, a leading banner.
fn layout_digest(input: &RenderInput) -> Vec<Vec<TextLine>> {
  let mut ts = Typesetter::new(9.0);

  ts.text(&input.presentation.title, 16.0, true);
  ts.text(
    &format!(
      "Generated {}",
      input.presentation.created_at.format("%Y-%m-%d")
    ),
    9.0,
    false,
  );
  ts.gap(8.0);

  for slide in &input.presentation.slides {
    ts.heading(&slide.title, 12.0);
    slide_body(&mut ts, input, slide);
  }

  ts.pages
}

fn slide_body(ts: &mut Typesetter, input: &RenderInput, slide: &Slide) {
  let quality = input.options.quality;
  if quality == Quality::Low {
    return;
  }

  match slide.kind {
    SlideKind::Metrics => {
      let m = input.metrics;
      ts.body(&format!("Sprint {}", m.sprint_number));
      ts.body(&format!("Planned items: {}", m.planned_items));
      ts.body(&format!("Estimated points: {:.0}", m.estimated_points));
      ts.body(&format!("Completed points: {:.0}", m.completed_total_points));
      ts.body(&format!("Test coverage: {:.1}%", m.test_coverage));
      ts.body(&format!("Quality score: {}%", m.quality_score()));
    }
    SlideKind::EpicOverview => {
      for group in &input.aggregation.groups {
        ts.body(&format!(
          "{}  {}%  ({:.0}/{:.0} pts, {} issues)",
          group.epic_name,
          group.completion_rate,
          group.completed_story_points,
          group.total_story_points,
          group.issues.len()
        ));
        if quality == Quality::High {
          for issue in &group.issues {
            ts.body(&format!("   {} {} [{}]", issue.key, issue.summary, issue.status));
          }
        }
      }
    }
    SlideKind::DemoStory => {
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
            ts.body(&format!("{}: {}", label, text.trim()));
          }
        }
      }
      if quality == Quality::High {
        if let Some(issue) = slide
          .story_key
          .as_deref()
          .and_then(|key| input.issues.iter().find(|i| i.key == key))
        {
          ts.body(&format!(
            "{}  {}  {:.0} pts",
            issue.key,
            issue.status,
            issue.points()
          ));
          if let Some(text) = issue.description.as_ref().and_then(|d| d.plain_text()) {
            ts.body(&text);
          }
        }
      }
    }
    SlideKind::Corporate => {
      // Remote images are referenced, not embedded.
      if let Some(url) = &slide.corporate_slide_url {
        if input.options.include_images {
          ts.body(&format!("Image: {}", url));
        }
      }
    }
    _ => {
      if let SlideContent::Plain(text) = &slide.content {
        if !text.trim().is_empty() {
          ts.body(text.trim_end());
        }
      }
    }
  }
}

fn write_pdf(pages: &[Vec<TextLine>], compress: bool) -> Result<Vec<u8>, ExportError> {
  let page_count = pages.len().max(1);

  // Object layout: 1 catalog, 2 page tree, 3/4 fonts, then one
  // (page, content) pair per page.
  let mut objects: Vec<Vec<u8>> = Vec::with_capacity(4 + 2 * page_count);

  let kids: Vec<String> = (0..page_count)
    .map(|i| format!("{} 0 R", 5 + 2 * i))
    .collect();
  objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
  objects.push(
    format!(
      "<< /Type /Pages /Kids [{}] /Count {} >>",
      kids.join(" "),
      page_count
    )
    .into_bytes(),
  );
  objects.push(b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec());
  objects.push(b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold >>".to_vec());

  for i in 0..page_count {
    objects.push(
      format!(
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
         /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
        PAGE_WIDTH as u32,
        PAGE_HEIGHT as u32,
        6 + 2 * i
      )
      .into_bytes(),
    );

    let lines = pages.get(i).map(|p| p.as_slice()).unwrap_or(&[]);
    let stream = content_stream(lines);
    let (stream, filter) = if compress {
      (deflate(&stream)?, " /Filter /FlateDecode")
    } else {
      (stream, "")
    };

    let mut obj = format!("<< /Length {}{} >>\nstream\n", stream.len(), filter).into_bytes();
    obj.extend_from_slice(&stream);
    obj.extend_from_slice(b"\nendstream");
    objects.push(obj);
  }

  let mut out = b"%PDF-1.4\n".to_vec();
  let mut offsets = Vec::with_capacity(objects.len());
  for (idx, body) in objects.iter().enumerate() {
    offsets.push(out.len());
    out.extend_from_slice(format!("{} 0 obj\n", idx + 1).as_bytes());
    out.extend_from_slice(body);
    out.extend_from_slice(b"\nendobj\n");
  }

  let xref_offset = out.len();
  out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
  out.extend_from_slice(b"0000000000 65535 f \n");
  for offset in offsets {
    out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
  }
  out.extend_from_slice(
    format!(
      "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
      objects.len() + 1,
      xref_offset
    )
    .as_bytes(),
  );

  Ok(out)
}

fn content_stream(lines: &[TextLine]) -> Vec<u8> {
  let mut s = String::new();
  for line in lines {
    if line.text.is_empty() {
      continue;
    }
    s.push_str(&format!(
      "BT\n/{} {:.1} Tf\n1 0 0 1 {:.1} {:.1} Tm\n({}) Tj\nET\n",
      if line.bold { "F2" } else { "F1" },
      line.size,
      line.x,
      line.y,
      escape_text(&line.text)
    ));
  }
  s.into_bytes()
}

/// Escape for a PDF literal string. The standard fonts only cover so
/// much, so anything outside printable ASCII becomes '?'.
fn escape_text(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '(' => out.push_str("\\("),
      ')' => out.push_str("\\)"),
      '\\' => out.push_str("\\\\"),
      c if c.is_ascii_graphic() || c == ' ' => out.push(c),
      _ => out.push('?'),
    }
  }
  out
}

fn deflate(bytes: &[u8]) -> Result<Vec<u8>, ExportError> {
  let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
  encoder
    .write_all(bytes)
    .map_err(|e| ExportError::from_io(ExportErrorCode::CompressionFailed, e))?;
  encoder
    .finish()
    .map_err(|e| ExportError::from_io(ExportErrorCode::CompressionFailed, e))
}
