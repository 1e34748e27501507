//! Engine configuration, usually supplied by the host's build configuration.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::pattern::PatternDescriptor;

const DEFAULT_CONFIG_FILE: &str = "path-rewriter.config.json";

/// File name of the statistics artifact when `emitStats` is `true`.
pub const DEFAULT_STATS_FILE: &str = "stats.json";

/// Whether and where to emit the build statistics artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmitStats {
  /// `true` emits `stats.json`, `false` disables the artifact.
  Enabled(bool),
  /// Emit under the given file name. An empty name disables the artifact.
  File(String),
}

impl Default for EmitStats {
  fn default() -> Self {
    Self::Enabled(true)
  }
}

impl EmitStats {
  /// Artifact name, or `None` when disabled.
  pub fn file_name(&self) -> Option<&str> {
    match self {
      Self::Enabled(true) => Some(DEFAULT_STATS_FILE),
      Self::Enabled(false) => None,
      Self::File(name) if name.is_empty() => None,
      Self::File(name) => Some(name),
    }
  }
}

/// Construction-time options for [`crate::PathRewriter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RewriterConfig {
  /// Suppress rewrite diagnostics and error log lines.
  pub silent: bool,
  /// Statistics artifact switch.
  pub emit_stats: EmitStats,
  /// Append a content-hash comment to each resource's generated module so the
  /// host's build hash follows resource content.
  pub include_hash: bool,
  /// Engine-wide path-token pattern.
  pub path_reg_exp: Option<PatternDescriptor>,
  /// Capture group of `path_reg_exp` holding the path.
  pub path_match_index: Option<usize>,
  /// Replacement template for path tokens.
  pub path_replacer: Option<String>,
  /// Engine-wide inline-token pattern.
  pub inline_reg_exp: Option<PatternDescriptor>,
  /// Evict persistent cache entries not refreshed for this many build cycles.
  /// Unset keeps every entry for the lifetime of the engine.
  pub persistent_cache_cycles: Option<u32>,
}

impl Default for RewriterConfig {
  fn default() -> Self {
    Self {
      silent: false,
      emit_stats: EmitStats::default(),
      include_hash: false,
      path_reg_exp: None,
      path_match_index: None,
      path_replacer: None,
      inline_reg_exp: None,
      persistent_cache_cycles: None,
    }
  }
}

impl RewriterConfig {
  /// Attempt to load configuration from the provided directory.
  ///
  /// A missing or unparsable file yields the defaults.
  pub fn discover(dir: &Path) -> Self {
    Self::from_path(&dir.join(DEFAULT_CONFIG_FILE)).unwrap_or_default()
  }

  /// Read configuration from a specific JSON file, ignoring failures.
  pub fn from_path(path: &Path) -> Option<Self> {
    Self::load(path).ok()
  }

  /// Read configuration from a specific JSON file.
  pub fn load(path: &Path) -> Result<Self> {
    let content = fs::read_to_string(path)
      .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
  }
}
