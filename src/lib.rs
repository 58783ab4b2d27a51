//! A Harel-style hierarchical statechart DSL and code generator.
//!
//! The pipeline runs strictly forward: [`extract`] pulls DSL text out of a
//! host file, [`syntax`] lexes and parses it into a raw AST, [`resolve`]
//! turns that into a fully cross-referenced [`model::Specification`],
//! [`emit`] compiles a resolved [`model::Machine`] into a runnable artifact,
//! and [`runtime`] supplies the scheduler contract that artifact depends on
//! to actually run. [`pipeline`] wires all of that together with caching.

pub mod emit;
mod error;
pub mod extract;
pub mod host;
pub mod model;
pub mod pipeline;
pub mod resolve;
pub mod runtime;

pub use error::{CompileError, Error, Result, UsageError};
pub use extract::{extract, ExtractConfig};
pub use host::ActionSink;
pub use pipeline::{Pipeline, PipelineConfig};
pub use runtime::{Reactor, SyncReactor, TimerId};

/// Run the full extract → parse → resolve step on DSL text that has already
/// been pulled out of its host file (i.e. `host` is already DSL-only text,
/// not a host file to scan for delimiters). Most callers want
/// [`pipeline::Pipeline::load`] instead, which also extracts and caches.
pub fn compile_source(src: &str) -> Result<model::Specification> {
  let spec = syntax::parser::parse(src).map_err(|errors| {
    errors
      .into_iter()
      .next()
      .map(|e| Error::syntax(e.message.to_string(), e.span))
      .expect("parser reported failure with no errors")
  })?;
  resolve::resolve(&spec)
}

#[cfg(test)]
mod tests;
