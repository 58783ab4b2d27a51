//! Error kinds for every stage of the pipeline (§7), rendered through
//! [`harel_diag`]'s snippet-based reporting when a source and span are
//! available.

use diag::{Report, Source};
use span::Span;
use thiserror::Error;

/// A compile-time failure: lexer/parser or semantic-resolution error, fatal
/// to the pipeline, carrying the host-file location that caused it.
#[derive(Debug, Error, Clone)]
#[error("{message}")]
pub struct CompileError {
  pub message: String,
  pub span: Span,
}

impl CompileError {
  pub fn new(message: impl Into<String>, span: impl Into<Span>) -> Self {
    Self {
      message: message.into(),
      span: span.into(),
    }
  }

  /// Render this error as a source snippet, citing the original host-file
  /// line (since the extractor preserves line numbers across blanking).
  pub fn render(&self, source: &str) -> String {
    Report::error()
      .source(Source::string(source))
      .message(self.message.clone())
      .span(self.span)
      .build()
      .emit_to_string()
      .unwrap_or_else(|_| self.message.clone())
  }
}

/// A usage error raised to the caller of an emitted machine at runtime
/// (§4.E, §5).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UsageError {
  #[error("event `{event}` submitted before the machine was started")]
  NotStarted { event: String },
  #[error("start() called on a machine that is already running")]
  AlreadyRunning,
  #[error("event `{event}` submitted recursively from inside another event's handler")]
  RecursiveEvent { event: String },
}

/// Top-level error type returned by the pipeline and by emitted machines.
#[derive(Debug, Error)]
pub enum Error {
  #[error("syntax error: {0}")]
  Syntax(#[source] CompileError),
  #[error("semantic error: {0}")]
  Semantic(#[source] CompileError),
  #[error(transparent)]
  Usage(#[from] UsageError),
  /// An immediate-transition cycle with no timer boundary, detected via
  /// stack-depth exhaustion rather than static analysis (§7, §9).
  #[error("recursion overflow in machine `{machine}`")]
  RecursionOverflow { machine: String },
  /// Reading a host file failed before extraction ever ran. Not one of the
  /// four kinds §7 names -- those are compile/runtime outcomes of a host
  /// file the pipeline could already read -- but `Pipeline::load` reads from
  /// disk and that failure has to surface through the same `Result`.
  #[error("failed to read `{path}`: {source}")]
  Io {
    path: std::path::PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl Error {
  pub fn syntax(message: impl Into<String>, span: impl Into<Span>) -> Self {
    Error::Syntax(CompileError::new(message, span))
  }

  pub fn semantic(message: impl Into<String>, span: impl Into<Span>) -> Self {
    Error::Semantic(CompileError::new(message, span))
  }

  /// Render the error, citing `source` when the error carries a span.
  pub fn render(&self, source: &str) -> String {
    match self {
      Error::Syntax(e) | Error::Semantic(e) => e.render(source),
      other => other.to_string(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
