//! Multi-format export of sprint-review presentations.
//!
//! The service normalizes the deck, dispatches to a format generator,
//! applies format-appropriate compaction, and reports staged progress
//! through a per-call callback. Concurrent exports share nothing.

pub mod error;
mod html;
mod markdown;
mod pdf;
pub mod qa;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::deck::{Presentation, SprintMetrics};
use crate::epics::{self, Aggregation};
use crate::jira::types::Issue;

use error::{ExportError, ExportErrorCode};

/// Output format for an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
  Pdf,
  /// Denser PDF variant with heavier formatting.
  Digest,
  Html,
  /// Condensed executive-summary HTML.
  Summary,
  Markdown,
}

impl ExportFormat {
  pub fn extension(&self) -> &'static str {
    match self {
      ExportFormat::Pdf | ExportFormat::Digest => "pdf",
      ExportFormat::Html | ExportFormat::Summary => "html",
      ExportFormat::Markdown => "md",
    }
  }

  pub fn content_type(&self) -> &'static str {
    match self {
      ExportFormat::Pdf | ExportFormat::Digest => "application/pdf",
      ExportFormat::Html | ExportFormat::Summary => "text/html",
      ExportFormat::Markdown => "text/markdown",
    }
  }

  fn is_text(&self) -> bool {
    !matches!(self, ExportFormat::Pdf | ExportFormat::Digest)
  }
}

/// How much detail the generators include.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
  /// Titles and headlines only.
  Low,
  /// Plus slide content.
  #[default]
  Medium,
  /// Plus per-issue detail.
  High,
}

/// Export configuration. Formats ignore options that do not apply to
/// them (Markdown ignores `interactive`, PDF ignores `include_images`
/// for remote assets it cannot fetch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
  pub format: ExportFormat,
  #[serde(default)]
  pub quality: Quality,
  #[serde(default = "default_true")]
  pub include_images: bool,
  #[serde(default = "default_true")]
  pub compression: bool,
  #[serde(default)]
  pub interactive: bool,
}

fn default_true() -> bool {
  true
}

impl ExportOptions {
  pub fn new(format: ExportFormat) -> Self {
    Self {
      format,
      quality: Quality::default(),
      include_images: true,
      compression: true,
      interactive: false,
    }
  }
}

/// One export call's pipeline position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
  Preparing,
  Rendering,
  Processing,
  Finalizing,
}

impl ExportStage {
  pub fn label(&self) -> &'static str {
    match self {
      ExportStage::Preparing => "preparing",
      ExportStage::Rendering => "rendering",
      ExportStage::Processing => "processing",
      ExportStage::Finalizing => "finalizing",
    }
  }

  fn index(&self) -> usize {
    match self {
      ExportStage::Preparing => 0,
      ExportStage::Rendering => 1,
      ExportStage::Processing => 2,
      ExportStage::Finalizing => 3,
    }
  }
}

const STAGE_COUNT: usize = 4;

/// Progress snapshot delivered to the caller's callback.
#[derive(Debug, Clone)]
pub struct ExportProgress {
  pub current: usize,
  pub total: usize,
  pub stage: ExportStage,
  pub message: String,
  pub percentage: u8,
}

#[derive(Debug, Clone)]
pub struct ExportMeta {
  pub slide_count: usize,
  pub processing_ms: u128,
  pub quality: Quality,
}

/// A finished export: the artifact bytes plus everything a caller needs
/// to store or grade it.
#[derive(Debug, Clone)]
pub struct ExportResult {
  pub bytes: Vec<u8>,
  pub file_name: String,
  pub file_size: usize,
  pub format: ExportFormat,
  pub meta: ExportMeta,
}

/// Everything a format generator reads. Borrowed per call so concurrent
/// exports cannot observe each other.
pub(crate) struct RenderInput<'a> {
  pub presentation: &'a Presentation,
  pub issues: &'a [Issue],
  pub upcoming: &'a [Issue],
  pub metrics: &'a SprintMetrics,
  pub aggregation: &'a Aggregation,
  pub options: &'a ExportOptions,
}

/// Stateless export orchestrator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportService;

impl ExportService {
  pub fn new() -> Self {
    Self
  }

  /// Export `presentation` in the requested format.
  ///
  /// `on_progress` observes the stage transitions preparing, rendering,
  /// processing, finalizing, in that order. Progress arrives at stage
  /// boundaries, not on a timer.
  pub async fn export<F>(
    &self,
    presentation: &Presentation,
    issues: &[Issue],
    upcoming: &[Issue],
    metrics: &SprintMetrics,
    options: &ExportOptions,
    mut on_progress: F,
  ) -> Result<ExportResult, ExportError>
  where
    F: FnMut(&ExportProgress),
  {
    let started = Instant::now();

    emit(&mut on_progress, ExportStage::Preparing, "Normalizing slides");
    let presentation = presentation.clone().normalized();
    if presentation.slides.is_empty() {
      return Err(ExportError::fatal(
        ExportErrorCode::EmptyPresentation,
        "presentation has no slides",
      ));
    }
    let aggregation = epics::group_by_epic(issues);
    tokio::task::yield_now().await;

    emit(&mut on_progress, ExportStage::Rendering, "Rendering slides");
    let input = RenderInput {
      presentation: &presentation,
      issues,
      upcoming,
      metrics,
      aggregation: &aggregation,
      options,
    };
    let bytes = match options.format {
      ExportFormat::Pdf => pdf::render(&input, pdf::Layout::Standard)?,
      ExportFormat::Digest => pdf::render(&input, pdf::Layout::Digest)?,
      ExportFormat::Html => html::render(&input, html::Variant::Full)?,
      ExportFormat::Summary => html::render(&input, html::Variant::Executive)?,
      ExportFormat::Markdown => markdown::render(&input)?,
    };
    tokio::task::yield_now().await;

    emit(&mut on_progress, ExportStage::Processing, "Packaging output");
    let bytes = if options.compression && options.format.is_text() {
      compact_text(bytes)
    } else {
      // PDF streams are deflated inside the writer as they are built.
      bytes
    };
    tokio::task::yield_now().await;

    emit(&mut on_progress, ExportStage::Finalizing, "Deriving file name");
    let file_name = build_file_name(&presentation.title, options.format);
    let file_size = bytes.len();
    tracing::debug!(
      file_name,
      file_size,
      content_type = options.format.content_type(),
      "export finished"
    );

    Ok(ExportResult {
      bytes,
      file_name,
      file_size,
      format: options.format,
      meta: ExportMeta {
        slide_count: presentation.slides.len(),
        processing_ms: started.elapsed().as_millis(),
        quality: options.quality,
      },
    })
  }
}

fn emit<F: FnMut(&ExportProgress)>(on_progress: &mut F, stage: ExportStage, message: &str) {
  let current = stage.index() + 1;
  on_progress(&ExportProgress {
    current,
    total: STAGE_COUNT,
    stage,
    message: message.to_string(),
    percentage: (current * 100 / STAGE_COUNT) as u8,
  });
}

/// `<sanitized title>-<date>.<ext>`, safe for any filesystem.
fn build_file_name(title: &str, format: ExportFormat) -> String {
  format!(
    "{}-{}.{}",
    sanitize_file_name(title),
    Utc::now().format("%Y-%m-%d"),
    format.extension()
  )
}

fn sanitize_file_name(title: &str) -> String {
  let mut out = String::with_capacity(title.len());
  let mut last_dash = true; // suppress a leading dash
  for c in title.chars() {
    if c.is_ascii_alphanumeric() {
      out.push(c.to_ascii_lowercase());
      last_dash = false;
    } else if !last_dash {
      out.push('-');
      last_dash = true;
    }
  }
  while out.ends_with('-') {
    out.pop();
  }
  if out.is_empty() {
    "presentation".to_string()
  } else {
    out
  }
}

/// Compact a text artifact: strip trailing spaces and collapse blank-line
/// runs. Keeps the file valid in its own format, unlike byte-level
/// compression would.
fn compact_text(bytes: Vec<u8>) -> Vec<u8> {
  let text = match String::from_utf8(bytes) {
    Ok(text) => text,
    // Not ours to rewrite.
    Err(e) => return e.into_bytes(),
  };

  let mut out = String::with_capacity(text.len());
  let mut blank_run = 0;
  for line in text.lines() {
    let line = line.trim_end();
    if line.is_empty() {
      blank_run += 1;
      if blank_run > 1 {
        continue;
      }
    } else {
      blank_run = 0;
    }
    out.push_str(line);
    out.push('\n');
  }
  out.into_bytes()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::deck::{PresentationMeta, Slide, SlideContent, SlideKind};

  fn slide(id: &str, order: u32, kind: SlideKind) -> Slide {
    Slide {
      id: id.to_string(),
      title: format!("Slide {}", id),
      content: SlideContent::Plain("Some content".to_string()),
      kind,
      order,
      corporate_slide_url: None,
      story_key: None,
    }
  }

  fn five_slide_presentation() -> Presentation {
    Presentation {
      id: "deck-1".to_string(),
      title: "Sprint Review: Sprint 42".to_string(),
      slides: vec![
        slide("s1", 1, SlideKind::Title),
        slide("s2", 2, SlideKind::Summary),
        Slide {
          content: SlideContent::Story {
            accomplishments: "Shipped the widget".to_string(),
            business_value: "Less churn".to_string(),
            user_impact: "Faster flows".to_string(),
          },
          story_key: Some("P-1".to_string()),
          ..slide("s3", 3, SlideKind::DemoStory)
        },
        Slide {
          content: SlideContent::Story {
            accomplishments: "Fixed the gadget".to_string(),
            business_value: String::new(),
            user_impact: String::new(),
          },
          story_key: Some("P-2".to_string()),
          ..slide("s4", 4, SlideKind::DemoStory)
        },
        Slide {
          corporate_slide_url: Some("https://example.com/brand.png".to_string()),
          ..slide("s5", 5, SlideKind::Corporate)
        },
      ],
      created_at: Utc::now(),
      meta: PresentationMeta::default(),
    }
  }

  fn empty_metrics() -> SprintMetrics {
    SprintMetrics::default()
  }

  #[tokio::test]
  async fn test_pdf_export_end_to_end() {
    let service = ExportService::new();
    let presentation = five_slide_presentation();
    let options = ExportOptions {
      quality: Quality::High,
      compression: false,
      ..ExportOptions::new(ExportFormat::Pdf)
    };

    let mut stages = Vec::new();
    let result = service
      .export(&presentation, &[], &[], &empty_metrics(), &options, |p| {
        stages.push(p.stage)
      })
      .await
      .unwrap();

    assert_eq!(
      stages,
      vec![
        ExportStage::Preparing,
        ExportStage::Rendering,
        ExportStage::Processing,
        ExportStage::Finalizing,
      ]
    );
    assert_eq!(result.format, ExportFormat::Pdf);
    assert_eq!(result.meta.slide_count, 5);
    assert!(result.file_size > 0);
    assert_eq!(result.file_size, result.bytes.len());
    assert!(result.file_name.ends_with(".pdf"));
    assert!(result.file_name.starts_with("sprint-review-sprint-42-"));
  }

  #[tokio::test]
  async fn test_markdown_defaults_to_medium_quality() {
    let service = ExportService::new();
    let result = service
      .export(
        &five_slide_presentation(),
        &[],
        &[],
        &empty_metrics(),
        &ExportOptions::new(ExportFormat::Markdown),
        |_| {},
      )
      .await
      .unwrap();

    assert_eq!(result.meta.quality, Quality::Medium);
    assert!(result.file_name.ends_with(".md"));
  }

  #[tokio::test]
  async fn test_empty_presentation_is_fatal() {
    let service = ExportService::new();
    let presentation = Presentation {
      slides: Vec::new(),
      ..five_slide_presentation()
    };

    let err = service
      .export(
        &presentation,
        &[],
        &[],
        &empty_metrics(),
        &ExportOptions::new(ExportFormat::Html),
        |_| {},
      )
      .await
      .unwrap_err();

    assert_eq!(err.code, ExportErrorCode::EmptyPresentation);
    assert!(!err.recoverable);
  }

  #[tokio::test]
  async fn test_duplicate_slide_ids_counted_once() {
    let service = ExportService::new();
    let mut presentation = five_slide_presentation();
    presentation.slides.push(slide("s1", 9, SlideKind::Summary));

    let result = service
      .export(
        &presentation,
        &[],
        &[],
        &empty_metrics(),
        &ExportOptions::new(ExportFormat::Markdown),
        |_| {},
      )
      .await
      .unwrap();

    assert_eq!(result.meta.slide_count, 5);
  }

  #[tokio::test]
  async fn test_concurrent_exports_keep_progress_separate() {
    let service = ExportService::new();
    let presentation = five_slide_presentation();
    let metrics = empty_metrics();

    let mut stages_a = Vec::new();
    let mut stages_b = Vec::new();
    let opts_a = ExportOptions::new(ExportFormat::Html);
    let opts_b = ExportOptions::new(ExportFormat::Markdown);
    let (a, b) = tokio::join!(
      service.export(
        &presentation,
        &[],
        &[],
        &metrics,
        &opts_a,
        |p| stages_a.push(p.stage),
      ),
      service.export(
        &presentation,
        &[],
        &[],
        &metrics,
        &opts_b,
        |p| stages_b.push(p.stage),
      ),
    );

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(stages_a.len(), 4);
    assert_eq!(stages_b.len(), 4);
  }

  #[test]
  fn test_sanitize_file_name() {
    assert_eq!(
      sanitize_file_name("Sprint Review: Sprint 42"),
      "sprint-review-sprint-42"
    );
    assert_eq!(sanitize_file_name("a//b\\c"), "a-b-c");
    assert_eq!(sanitize_file_name("???"), "presentation");
  }

  #[test]
  fn test_compact_text_collapses_blank_runs() {
    let input = "line one  \n\n\n\nline two\n".as_bytes().to_vec();
    let out = String::from_utf8(compact_text(input)).unwrap();
    assert_eq!(out, "line one\n\nline two\n");
  }
}
