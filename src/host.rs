//! The seam between the rewriter and the host bundler.
//!
//! The host's module graph and emission pipeline stay outside this crate. The
//! after-compile hook receives plain [`CompiledModule`] records; the emit hook
//! talks to the host through the [`Compilation`] trait.

use std::path::PathBuf;

use crate::error::BuildError;

/// Build-wide settings the host exposes to the loader entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostOptions {
  /// Top-level context directory of the build.
  pub context: PathBuf,
  /// Public path prefix of emitted files.
  pub public_path: String,
}

/// One resource handed to the loader entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceContext {
  /// Unique build request identifier of the resource.
  pub request: String,
  /// Absolute path of the resource file.
  pub resource_path: PathBuf,
  /// Raw loader query, e.g. `?name=[name].html`.
  pub query: String,
}

/// A dependency of a compiled module as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDependency {
  /// Request string the dependency was created from.
  pub request: String,
  /// Files emitted by the module the dependency resolved to, `None` when it
  /// did not resolve to a module.
  pub emitted_assets: Option<Vec<String>>,
}

impl ModuleDependency {
  /// Dependency on a module that emitted `assets`.
  pub fn emitted(request: impl Into<String>, assets: &[&str]) -> Self {
    Self {
      request: request.into(),
      emitted_assets: Some(assets.iter().map(|asset| asset.to_string()).collect()),
    }
  }
}

/// A module from the host's final module graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledModule {
  /// Unique build request identifier.
  pub request: String,
  /// Dependencies in declaration order.
  pub dependencies: Vec<ModuleDependency>,
}

/// Access to the host's output while it is being emitted.
pub trait Compilation {
  /// Every emitted file name, in the host's manifest order.
  fn asset_names(&self) -> Vec<String>;

  /// Content of an emitted file.
  fn asset_bytes(&self, name: &str) -> Option<&[u8]>;

  /// Add or replace an output file.
  fn emit_asset(&mut self, name: &str, content: Vec<u8>);

  /// Record a non-fatal build error.
  fn push_error(&mut self, error: BuildError);

  /// Build hash reported in the statistics artifact, if the host has one.
  fn hash(&self) -> Option<String> {
    None
  }
}

/// Ordered in-memory [`Compilation`].
#[derive(Debug, Default)]
pub struct MemoryCompilation {
  assets: Vec<(String, Vec<u8>)>,
  errors: Vec<BuildError>,
  hash: Option<String>,
}

impl MemoryCompilation {
  /// Empty compilation.
  pub fn new() -> Self {
    Self::default()
  }

  /// Append an asset, builder style.
  pub fn with_asset(mut self, name: &str, content: impl Into<Vec<u8>>) -> Self {
    self.emit_asset(name, content.into());
    self
  }

  /// Set the build hash, builder style.
  pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
    self.hash = Some(hash.into());
    self
  }

  /// UTF-8 content of an emitted file.
  pub fn asset_text(&self, name: &str) -> Option<&str> {
    self
      .asset_bytes(name)
      .and_then(|bytes| std::str::from_utf8(bytes).ok())
  }

  /// Errors recorded so far.
  pub fn errors(&self) -> &[BuildError] {
    &self.errors
  }
}

impl Compilation for MemoryCompilation {
  fn asset_names(&self) -> Vec<String> {
    self.assets.iter().map(|(name, _)| name.clone()).collect()
  }

  fn asset_bytes(&self, name: &str) -> Option<&[u8]> {
    self
      .assets
      .iter()
      .find(|(candidate, _)| candidate == name)
      .map(|(_, content)| content.as_slice())
  }

  fn emit_asset(&mut self, name: &str, content: Vec<u8>) {
    match self.assets.iter_mut().find(|(candidate, _)| candidate == name) {
      Some((_, existing)) => *existing = content,
      None => self.assets.push((name.to_string(), content)),
    }
  }

  fn push_error(&mut self, error: BuildError) {
    self.errors.push(error);
  }

  fn hash(&self) -> Option<String> {
    self.hash.clone()
  }
}
