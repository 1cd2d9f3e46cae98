//! Export failure taxonomy.
//!
//! Callers branch on `recoverable`: transient failures earn a retry
//! offer, structural ones do not.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Machine-readable failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportErrorCode {
  EmptyPresentation,
  InvalidSlide,
  UnsupportedFormat,
  RenderFailed,
  CompressionFailed,
  Timeout,
  ResourceExhausted,
  Io,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ExportError {
  pub code: ExportErrorCode,
  pub message: String,
  pub details: Option<String>,
  pub recoverable: bool,
  pub retry_count: u32,
  pub timestamp: DateTime<Utc>,
}

impl ExportError {
  fn new(code: ExportErrorCode, message: impl Into<String>, recoverable: bool) -> Self {
    Self {
      code,
      message: message.into(),
      details: None,
      recoverable,
      retry_count: 0,
      timestamp: Utc::now(),
    }
  }

  /// A structural failure retrying cannot fix.
  pub fn fatal(code: ExportErrorCode, message: impl Into<String>) -> Self {
    Self::new(code, message, false)
  }

  /// A transient failure worth offering a retry for.
  pub fn transient(code: ExportErrorCode, message: impl Into<String>) -> Self {
    Self::new(code, message, true)
  }

  pub fn with_details(mut self, details: impl Into<String>) -> Self {
    self.details = Some(details.into());
    self
  }

  /// Stamp the error for the next retry attempt.
  pub fn for_retry(mut self) -> Self {
    self.retry_count += 1;
    self
  }

  /// Classify an I/O failure: interruptions and timeouts are worth a
  /// retry, everything else is treated as structural.
  pub fn from_io(code: ExportErrorCode, err: std::io::Error) -> Self {
    use std::io::ErrorKind;
    let recoverable = matches!(
      err.kind(),
      ErrorKind::TimedOut | ErrorKind::Interrupted | ErrorKind::WouldBlock
    );
    Self::new(code, err.to_string(), recoverable)
  }
}
