//! Pipeline Orchestrator (§4.G): `load -> extract -> parse -> resolve ->
//! emit -> compile`, cached per input path -- the single façade an
//! embedder actually calls day to day, playing the same role the teacher's
//! `isolate::import::load` + `ModuleRegistry` play for its own module
//! system (parse once, cache the result, hand back the same artifact on
//! every later request for the same path).

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::emit::{self, CompiledMachine};
use crate::error::{Error, Result};
use crate::extract::{self, ExtractConfig};
use crate::model::Machine;

/// Delimiters plus an optional debug sink (§0.4). There is no on-disk
/// config file format in scope -- a constructible struct with `Default` is
/// all the "configuration" this crate needs.
pub struct PipelineConfig {
  pub extract: ExtractConfig,
  /// Invoked with each newly compiled machine's resolved model, keyed by
  /// the host path it came from. §4.G describes a sink that "receives the
  /// emitted source text for debugging"; this crate's code emitter never
  /// produces text (§1 -- emission constructs a Rust value directly from
  /// the model), so the closest equivalent is handing back the model
  /// itself, the thing actually compiled.
  pub debug_sink: Option<Box<dyn Fn(&Path, &Machine)>>,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      extract: ExtractConfig::default(),
      debug_sink: None,
    }
  }
}

impl fmt::Debug for PipelineConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PipelineConfig")
      .field("extract", &self.extract)
      .field("debug_sink", &self.debug_sink.as_ref().map(|_| "<fn>"))
      .finish()
  }
}

struct CacheEntry {
  machines: Vec<CompiledMachine>,
}

/// Caches one compiled result per input path (§4.G "G memoizes per input
/// file"). An embedding program typically builds one `Pipeline` and keeps
/// it alive for its own lifetime.
pub struct Pipeline {
  config: PipelineConfig,
  cache: RefCell<HashMap<PathBuf, CacheEntry>>,
}

impl Pipeline {
  pub fn new(config: PipelineConfig) -> Self {
    Self {
      config,
      cache: RefCell::new(HashMap::new()),
    }
  }

  /// The primary (first-declared) machine compiled from `path`'s DSL
  /// regions. Runs the full pipeline on the first call for a given path;
  /// every later call returns the cached artifact. Most host files declare
  /// exactly one machine -- `machines` is there for the rarer case of more
  /// than one in the same file.
  pub fn load(&self, path: impl AsRef<Path>) -> Result<CompiledMachine> {
    let path = path.as_ref();
    self
      .machines(path)?
      .into_iter()
      .next()
      .ok_or_else(|| Error::semantic(format!("no machine declared in `{}`", path.display()), 0..0))
  }

  /// The resolved semantic model behind `load(path)`'s artifact. Since
  /// emission here constructs the runnable value directly from the model
  /// rather than generating an intermediate text artifact, this returns the
  /// same cached handle as `load`; call `.model()` on it for the `Machine`
  /// itself.
  pub fn spec(&self, path: impl AsRef<Path>) -> Result<CompiledMachine> {
    self.load(path)
  }

  /// Every machine declared in `path`'s DSL regions, in declaration order.
  pub fn machines(&self, path: impl AsRef<Path>) -> Result<Vec<CompiledMachine>> {
    let path = path.as_ref();
    if let Some(entry) = self.cache.borrow().get(path) {
      return Ok(entry.machines.clone());
    }

    let host = fs::read_to_string(path).map_err(|source| Error::Io {
      path: path.to_path_buf(),
      source,
    })?;
    let dsl = extract::extract(&host, &self.config.extract);
    let spec = crate::compile_source(&dsl)?;

    let machines: Vec<CompiledMachine> = spec
      .machines
      .into_iter()
      .map(|m| {
        if let Some(sink) = &self.config.debug_sink {
          sink(path, &m);
        }
        emit::compile(m)
      })
      .collect();

    self.cache.borrow_mut().insert(
      path.to_path_buf(),
      CacheEntry {
        machines: machines.clone(),
      },
    );

    Ok(machines)
  }

  /// Drops every cached artifact, forcing the next `load`/`spec`/`machines`
  /// call for any path to recompile from disk.
  pub fn invalidate_all(&self) {
    self.cache.borrow_mut().clear();
  }
}
