//! Adapter between the host's build lifecycle and the rewrite engine.
//!
//! A build cycle calls [`BuildLifecycle::transform_resource`] for every marked
//! resource, then [`BuildLifecycle::after_compile`] once the module graph is
//! final, then [`BuildLifecycle::emit`]. Every hook takes `&mut self`, so hooks
//! of one lifecycle never interleave. Watch-mode rebuilds repeat the sequence
//! on the same lifecycle and share its persistent cache.

use tracing::debug;

use crate::engine::{PathRewriter, RewriteReport};
use crate::error::{BuildError, UsageError};
use crate::host::{Compilation, CompiledModule, HostOptions, ResourceContext};
use crate::loader::{self, TransformOutput};
use crate::stats::BuildStats;

/// What one emit hook did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitReport {
  /// Cycle number of this emission.
  pub cycle: u64,
  /// Per-resource outcome.
  pub modules: Vec<RewriteReport>,
  /// Name of the statistics artifact, when one was emitted.
  pub stats_file: Option<String>,
}

/// One build session with at most one attached engine.
#[derive(Debug)]
pub struct BuildLifecycle {
  host: HostOptions,
  engine: Option<PathRewriter>,
}

impl BuildLifecycle {
  /// Lifecycle for a host build without an engine yet.
  pub fn new(host: HostOptions) -> Self {
    Self { host, engine: None }
  }

  /// Attach the engine. A build carries a single engine.
  pub fn attach(&mut self, engine: PathRewriter) -> Result<(), UsageError> {
    if self.engine.is_some() {
      return Err(UsageError::DuplicateEngine);
    }
    self.engine = Some(engine);
    Ok(())
  }

  /// The attached engine.
  pub fn engine(&self) -> Option<&PathRewriter> {
    self.engine.as_ref()
  }

  /// Host settings.
  pub fn host(&self) -> &HostOptions {
    &self.host
  }

  fn engine_mut(&mut self) -> Result<&mut PathRewriter, UsageError> {
    self.engine.as_mut().ok_or(UsageError::MissingEngine)
  }

  /// Loader hook for one marked resource.
  pub fn transform_resource(
    &mut self,
    resource: &ResourceContext,
    content: &str,
  ) -> Result<TransformOutput, UsageError> {
    let Self { host, engine } = self;
    let engine = engine.as_mut().ok_or(UsageError::MissingEngine)?;
    loader::transform_resource(engine, host, resource, content)
  }

  /// After-compile hook with the host's final module graph.
  pub fn after_compile(&mut self, modules: &[CompiledModule]) -> Result<usize, UsageError> {
    Ok(self.engine_mut()?.correlate(modules))
  }

  /// Emit hook: rewrite recorded resources and attach the statistics artifact.
  pub fn emit<C: Compilation + ?Sized>(
    &mut self,
    compilation: &mut C,
  ) -> Result<EmitReport, UsageError> {
    let engine = self.engine_mut()?;
    let modules = engine.rewrite_modules(compilation);
    let cycle = engine.cache().cycle();

    let mut stats_file = None;
    if let Some(file) = engine.config().emit_stats.file_name() {
      let stats = BuildStats::collect(&*compilation, cycle, &modules);
      match stats.to_json() {
        Ok(json) => {
          compilation.emit_asset(file, json.into_bytes());
          stats_file = Some(file.to_string());
        }
        Err(err) => engine.report(BuildError::Other(err), compilation),
      }
    }

    debug!(cycle, modules = modules.len(), "emitted rewritten resources");
    Ok(EmitReport {
      cycle,
      modules,
      stats_file,
    })
  }
}
