//! The seam between this crate and the host language a machine's opaque
//! code blocks are written in (§9 "Opaque host-language code blocks").
//!
//! Entry/exit/transition code and guard expressions are kept as unparsed
//! text (see [`model::Code`]) -- this crate never interprets them. Instead
//! an embedder implements [`ActionSink`] to actually run them, the same way
//! the reference implementation pastes the text verbatim into a generated
//! method body for the target language's own compiler to validate.

use std::collections::HashMap;

use crate::model::{Code, TimeScale};

/// Where a `code` block or `guard` expression came from, for an embedder
/// that wants to report which clause it's running (logging, testing stubs).
#[derive(Debug, Clone, Copy)]
pub enum ActionSite<'a> {
  Enter { state: &'a str },
  Exit { state: &'a str },
  Transition { owner: &'a str, ordinal: usize },
  Timeout { owner: &'a str, ordinal: usize },
}

/// Executes a machine's opaque host-language clauses.
///
/// A no-op implementation (ignore every `run`, every guard true) is enough
/// to exercise pure statechart topology; [`NoopHost`] below does exactly
/// that and is what most unit tests in this crate use.
pub trait ActionSink {
  /// Evaluate a guard expression, returning whether the clause it gates may
  /// fire. Guard text is host-language-specific; this crate has already
  /// validated nothing about it beyond "it parsed as a bracketed clause".
  /// `args` are the triggering event's bound argument expressions (empty
  /// for default transitions and timeouts, which have none).
  fn eval_guard(&mut self, expr: &str, args: &[String], site: ActionSite<'_>) -> bool;

  /// Run an entry/exit/transition/timeout code block. Called after guard
  /// evaluation (if any) has already passed.
  fn run(&mut self, code: &Code, args: &[String], site: ActionSite<'_>);

  /// Evaluate a timeout's `value_expr` to a duration in the clause's declared
  /// units. The default handles the common case -- a literal number, e.g.
  /// `ms(250)` -- by parsing it directly; an embedder whose host language
  /// allows non-literal timeout expressions (`ms(self.retry_delay)`)
  /// overrides this to actually evaluate them.
  fn eval_timeout(&mut self, expr: &str, _scale: TimeScale) -> f64 {
    expr.trim().parse().unwrap_or(0.0)
  }
}

/// An [`ActionSink`] that treats every guard as true and every code block as
/// a no-op. Useful for testing pure statechart topology (entry/exit order,
/// dispatch, timers) independent of what a host language would actually do.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHost;

impl ActionSink for NoopHost {
  fn eval_guard(&mut self, _expr: &str, _args: &[String], _site: ActionSite<'_>) -> bool {
    true
  }

  fn run(&mut self, _code: &Code, _args: &[String], _site: ActionSite<'_>) {}
}

/// An [`ActionSink`] that records every guard evaluation and code block run,
/// in order, as a flat trace -- the shape the S1-S6 scenario tests in §8
/// assert against. Guards default to `true`; scripting a specific guard
/// expression to fail is done by inserting into `guards` before running.
#[derive(Debug, Default, Clone)]
pub struct TracingHost {
  pub trace: Vec<String>,
  pub guards: HashMap<String, bool>,
}

impl TracingHost {
  pub fn new() -> Self {
    Self::default()
  }

  /// Script `expr` to evaluate to `result` whenever it's checked as a guard.
  pub fn set_guard(&mut self, expr: impl Into<String>, result: bool) {
    self.guards.insert(expr.into(), result);
  }
}

impl ActionSink for TracingHost {
  fn eval_guard(&mut self, expr: &str, _args: &[String], site: ActionSite<'_>) -> bool {
    let result = self.guards.get(expr).copied().unwrap_or(true);
    self.trace.push(format!("guard({expr}) -> {result} @ {site:?}"));
    result
  }

  fn run(&mut self, code: &Code, _args: &[String], site: ActionSite<'_>) {
    let text = match code {
      Code::Inline(s) => s.clone(),
      Code::Block(lines) => lines.join("; "),
    };
    self.trace.push(format!("run({text}) @ {site:?}"));
  }
}
