//! Build statistics artifact.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::engine::RewriteReport;
use crate::host::Compilation;

/// One emitted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetStat {
  /// Output file name.
  pub name: String,
  /// Size in bytes.
  pub size: usize,
}

/// Summary of one emission, written as pretty JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStats {
  /// Build cycle number, starting at 1.
  pub cycle: u64,
  /// Host build hash, when available.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hash: Option<String>,
  /// Every emitted file in manifest order.
  pub assets: Vec<AssetStat>,
  /// Rewritten resources.
  pub modules: Vec<RewriteReport>,
  /// Messages of every token failure in this cycle.
  pub errors: Vec<String>,
}

impl BuildStats {
  /// Gather statistics from the host's output after rewriting.
  pub fn collect<C: Compilation + ?Sized>(
    compilation: &C,
    cycle: u64,
    modules: &[RewriteReport],
  ) -> Self {
    let assets = compilation
      .asset_names()
      .into_iter()
      .map(|name| {
        let size = compilation.asset_bytes(&name).map_or(0, <[u8]>::len);
        AssetStat { name, size }
      })
      .collect();

    Self {
      cycle,
      hash: compilation.hash(),
      assets,
      modules: modules.to_vec(),
      errors: modules
        .iter()
        .flat_map(|module| module.errors.iter().cloned())
        .collect(),
    }
  }

  /// Pretty printed JSON.
  pub fn to_json(&self) -> Result<String> {
    serde_json::to_string_pretty(self).context("failed to serialise build statistics")
  }
}
