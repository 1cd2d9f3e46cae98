//! Post-export quality scoring.
//!
//! Grading never fails: degenerate artifacts earn a low score and
//! warnings instead of an error.

use crate::deck::Presentation;

use super::{ExportFormat, ExportOptions, ExportResult, Quality};

/// Score bands shared by every consumer that classifies a report.
pub const EXCELLENT_SCORE: u8 = 90;
pub const GOOD_SCORE: u8 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
  Excellent,
  Good,
  NeedsImprovement,
}

pub fn score_band(score: u8) -> ScoreBand {
  if score >= EXCELLENT_SCORE {
    ScoreBand::Excellent
  } else if score >= GOOD_SCORE {
    ScoreBand::Good
  } else {
    ScoreBand::NeedsImprovement
  }
}

impl ScoreBand {
  pub fn label(&self) -> &'static str {
    match self {
      ScoreBand::Excellent => "excellent",
      ScoreBand::Good => "good",
      ScoreBand::NeedsImprovement => "needs improvement",
    }
  }
}

#[derive(Debug, Clone)]
pub struct QualityMetrics {
  /// Estimated rendering fidelity for the chosen format and quality.
  pub visual_fidelity: u8,
  pub file_size_ok: bool,
  pub processing_time_ok: bool,
  pub error_count: u32,
  pub warnings: Vec<String>,
  /// Environments expected to open the artifact.
  pub compatibility: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct QualityReport {
  pub overall_score: u8,
  pub metrics: QualityMetrics,
  pub recommendations: Vec<String>,
}

/// Large artifacts are worth a compression nudge.
const LARGE_FILE_BYTES: usize = 10 * 1024 * 1024;
/// Exports slower than this suggest the deck is oversized.
const SLOW_EXPORT_MS: u128 = 30_000;

/// Grade a finished export against its inputs.
pub fn validate_export(
  result: &ExportResult,
  presentation: &Presentation,
  options: &ExportOptions,
) -> QualityReport {
  let mut warnings = Vec::new();
  let mut recommendations = Vec::new();
  let mut error_count = 0u32;

  if result.bytes.is_empty() {
    error_count += 1;
    warnings.push("artifact is empty (0 bytes)".to_string());
  }

  if presentation.slides.is_empty() {
    error_count += 1;
    warnings.push("presentation has no slides".to_string());
  }

  let hollow_slides = presentation
    .slides
    .iter()
    .filter(|s| s.content.is_empty() && s.corporate_slide_url.is_none())
    .count();
  if hollow_slides > 0 {
    warnings.push(format!("{} slide(s) have no content", hollow_slides));
    recommendations.push("fill in or remove empty slides".to_string());
  }

  let file_size_ok = !result.bytes.is_empty() && result.file_size < LARGE_FILE_BYTES;
  if result.file_size >= LARGE_FILE_BYTES {
    warnings.push(format!(
      "artifact is large ({} bytes)",
      result.file_size
    ));
    if !options.compression {
      recommendations.push("enable compression to shrink the artifact".to_string());
    }
  }

  let processing_time_ok = result.meta.processing_ms < SLOW_EXPORT_MS;
  if !processing_time_ok {
    warnings.push(format!(
      "export took {} ms",
      result.meta.processing_ms
    ));
    recommendations.push("reduce slide count or lower the quality setting".to_string());
  }

  if options.quality == Quality::Low {
    recommendations.push("raise quality to include slide content".to_string());
  }

  let visual_fidelity = visual_fidelity(result.format, options.quality);

  let mut score: i32 = 100;
  score -= error_count as i32 * 30;
  score -= warnings.len() as i32 * 5;
  score -= (100 - visual_fidelity as i32) / 4;
  let overall_score = score.clamp(0, 100) as u8;

  QualityReport {
    overall_score,
    metrics: QualityMetrics {
      visual_fidelity,
      file_size_ok,
      processing_time_ok,
      error_count,
      warnings,
      compatibility: compatibility(result.format),
    },
    recommendations,
  }
}

fn visual_fidelity(format: ExportFormat, quality: Quality) -> u8 {
  let base: u8 = match quality {
    Quality::Low => 70,
    Quality::Medium => 85,
    Quality::High => 95,
  };
  match format {
    // Markdown has no layout to be faithful to.
    ExportFormat::Markdown => base.min(75),
    _ => base,
  }
}

fn compatibility(format: ExportFormat) -> Vec<String> {
  match format {
    ExportFormat::Pdf | ExportFormat::Digest => vec![
      "PDF 1.4 readers".to_string(),
      "print".to_string(),
    ],
    ExportFormat::Html | ExportFormat::Summary => vec![
      "modern browsers".to_string(),
      "email clients (degraded)".to_string(),
    ],
    ExportFormat::Markdown => vec![
      "text editors".to_string(),
      "wikis and issue trackers".to_string(),
    ],
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::deck::{PresentationMeta, Slide, SlideContent, SlideKind};
  use crate::export::ExportMeta;
  use chrono::Utc;

  fn presentation(slides: Vec<Slide>) -> Presentation {
    Presentation {
      id: "deck-1".into(),
      title: "Sprint Review".into(),
      slides,
      created_at: Utc::now(),
      meta: PresentationMeta::default(),
    }
  }

  fn content_slide() -> Slide {
    Slide {
      id: "s1".into(),
      title: "Summary".into(),
      content: SlideContent::Plain("All good".into()),
      kind: SlideKind::Summary,
      order: 1,
      corporate_slide_url: None,
      story_key: None,
    }
  }

  fn result(bytes: Vec<u8>, quality: Quality) -> ExportResult {
    let file_size = bytes.len();
    ExportResult {
      bytes,
      file_name: "sprint-review.pdf".into(),
      file_size,
      format: ExportFormat::Pdf,
      meta: ExportMeta {
        slide_count: 1,
        processing_ms: 120,
        quality,
      },
    }
  }

  #[test]
  fn test_healthy_export_scores_high() {
    let report = validate_export(
      &result(vec![1; 4096], Quality::High),
      &presentation(vec![content_slide()]),
      &ExportOptions::new(ExportFormat::Pdf),
    );

    assert!(report.overall_score >= EXCELLENT_SCORE);
    assert_eq!(report.metrics.error_count, 0);
    assert!(report.metrics.warnings.is_empty());
  }

  #[test]
  fn test_zero_byte_artifact_scores_low_without_panicking() {
    let report = validate_export(
      &result(Vec::new(), Quality::Medium),
      &presentation(Vec::new()),
      &ExportOptions::new(ExportFormat::Pdf),
    );

    assert!(report.overall_score < GOOD_SCORE);
    assert_eq!(report.metrics.error_count, 2);
    assert!(!report.metrics.warnings.is_empty());
    assert!(!report.metrics.file_size_ok);
  }

  #[test]
  fn test_empty_slides_warn_and_recommend() {
    let hollow = Slide {
      content: SlideContent::Plain(String::new()),
      ..content_slide()
    };
    let report = validate_export(
      &result(vec![1; 64], Quality::Medium),
      &presentation(vec![hollow]),
      &ExportOptions::new(ExportFormat::Pdf),
    );

    assert!(report
      .metrics
      .warnings
      .iter()
      .any(|w| w.contains("no content")));
    assert!(!report.recommendations.is_empty());
  }

  #[test]
  fn test_corporate_image_slide_is_not_hollow() {
    let corporate = Slide {
      content: SlideContent::Plain(String::new()),
      corporate_slide_url: Some("https://example.com/brand.png".into()),
      kind: SlideKind::Corporate,
      ..content_slide()
    };
    let report = validate_export(
      &result(vec![1; 64], Quality::Medium),
      &presentation(vec![corporate]),
      &ExportOptions::new(ExportFormat::Pdf),
    );

    assert!(report.metrics.warnings.is_empty());
  }

  #[test]
  fn test_score_bands() {
    assert_eq!(score_band(95), ScoreBand::Excellent);
    assert_eq!(score_band(EXCELLENT_SCORE), ScoreBand::Excellent);
    assert_eq!(score_band(80), ScoreBand::Good);
    assert_eq!(score_band(GOOD_SCORE), ScoreBand::Good);
    assert_eq!(score_band(60), ScoreBand::NeedsImprovement);
  }

  #[test]
  fn test_markdown_fidelity_is_capped() {
    assert_eq!(visual_fidelity(ExportFormat::Markdown, Quality::High), 75);
    assert_eq!(visual_fidelity(ExportFormat::Pdf, Quality::High), 95);
  }
}
