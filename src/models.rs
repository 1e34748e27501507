//! Data structures tracked for every resource between transform and emission.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::PathRewriteError;
use crate::pattern::CompiledPattern;

/// Matching and replacement rules applied to one resource.
#[derive(Debug, Clone)]
pub struct RewriteRules {
  /// Pattern locating path tokens.
  pub path_pattern: CompiledPattern,
  /// Capture group of `path_pattern` holding the path.
  pub path_match_index: usize,
  /// Replacement template, see [`crate::pattern::apply_replacer`].
  pub path_replacer: String,
  /// Pattern locating inline tokens; group 1 holds the asset url.
  pub inline_pattern: CompiledPattern,
}

/// Progress of a module through the two rewrite phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
  /// Tokens scanned, dependency outputs still unknown.
  Extracted,
  /// Every literal dependency has an emitted path or an error.
  Correlated,
  /// Final content handed to the host.
  Rewritten,
}

/// One distinct literal asset reference found in a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetData {
  /// Token as written in the source.
  pub path: String,
  /// Resolver-friendly form of `path`.
  pub request: String,
  /// Emitted file name once correlation succeeded.
  pub rw_path: Option<String>,
  /// Recorded when the dependency emitted zero or several files.
  pub error: Option<PathRewriteError>,
}

impl AssetData {
  /// Whether correlation has produced an outcome for this asset.
  pub fn is_settled(&self) -> bool {
    self.rw_path.is_some() || self.error.is_some()
  }
}

/// Everything the loader entry point knows about a resource.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
  /// Unique build request identifier of the resource.
  pub request: String,
  /// Output path of the resource after name interpolation.
  pub url: String,
  /// Resource text at transform time.
  pub content: String,
  /// Prefix for rewritten relative urls; empty or ending with `/`.
  pub public_path: String,
  /// Directory containing the resource.
  pub context: PathBuf,
  /// Directory `rel_path` and wildcard lookups are relative to.
  pub top_level_context: PathBuf,
  /// Resource path relative to `top_level_context`, for diagnostics.
  pub rel_path: String,
  /// Effective rules for this resource.
  pub rules: RewriteRules,
}

/// Registry entry for a resource processed in the current build cycle.
#[derive(Debug, Clone)]
pub struct ModuleData {
  /// Unique build request identifier of the resource.
  pub request: String,
  /// Output path of the resource after name interpolation.
  pub url: String,
  /// Resource text at transform time.
  pub content: String,
  /// Prefix for rewritten relative urls; empty or ending with `/`.
  pub public_path: String,
  /// Directory containing the resource.
  pub context: PathBuf,
  /// Directory `rel_path` and wildcard lookups are relative to.
  pub top_level_context: PathBuf,
  /// Resource path relative to `top_level_context`, for diagnostics.
  pub rel_path: String,
  /// Effective rules for this resource.
  pub rules: RewriteRules,
  /// Current phase.
  pub state: ModuleState,
  assets: Vec<AssetData>,
  by_path: HashMap<String, usize>,
  by_request: HashMap<String, Vec<usize>>,
  pending: usize,
}

impl ModuleData {
  /// Build an entry from its descriptor and the literal paths found in its content.
  ///
  /// Duplicate paths collapse into a single [`AssetData`].
  pub fn new(
    descriptor: ModuleDescriptor,
    asset_paths: impl IntoIterator<Item = (String, String)>,
  ) -> Self {
    let mut assets = Vec::new();
    let mut by_path = HashMap::new();
    let mut by_request: HashMap<String, Vec<usize>> = HashMap::new();

    for (path, request) in asset_paths {
      if by_path.contains_key(&path) {
        continue;
      }
      let index = assets.len();
      by_path.insert(path.clone(), index);
      by_request.entry(request.clone()).or_default().push(index);
      assets.push(AssetData {
        path,
        request,
        rw_path: None,
        error: None,
      });
    }

    let pending = assets.len();
    let ModuleDescriptor {
      request,
      url,
      content,
      public_path,
      context,
      top_level_context,
      rel_path,
      rules,
    } = descriptor;

    Self {
      request,
      url,
      content,
      public_path,
      context,
      top_level_context,
      rel_path,
      rules,
      state: if pending == 0 {
        ModuleState::Correlated
      } else {
        ModuleState::Extracted
      },
      assets,
      by_path,
      by_request,
      pending,
    }
  }

  /// Literal assets in discovery order.
  pub fn assets(&self) -> &[AssetData] {
    &self.assets
  }

  /// Asset registered for the token `path`.
  pub fn asset_by_path(&self, path: &str) -> Option<&AssetData> {
    self.by_path.get(path).map(|&index| &self.assets[index])
  }

  /// Assets whose tokens map onto `request`.
  pub fn assets_by_request(&self, request: &str) -> impl Iterator<Item = &AssetData> {
    self
      .by_request
      .get(request)
      .into_iter()
      .flatten()
      .map(|&index| &self.assets[index])
  }

  /// Distinct dependency requests in discovery order.
  pub fn dependency_requests(&self) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    self
      .assets
      .iter()
      .filter(|asset| seen.insert(asset.request.as_str()))
      .map(|asset| asset.request.clone())
      .collect()
  }

  /// Literal assets still waiting for correlation.
  pub fn pending(&self) -> usize {
    self.pending
  }

  /// Record the correlation outcome for every asset requested as `request`.
  ///
  /// Returns `false` when no asset of this module uses that request. The module
  /// moves to [`ModuleState::Correlated`] once nothing is pending.
  pub fn settle(&mut self, request: &str, outcome: Result<String, PathRewriteError>) -> bool {
    let Some(indices) = self.by_request.get(request) else {
      return false;
    };

    for &index in indices {
      let asset = &mut self.assets[index];
      if !asset.is_settled() {
        self.pending -= 1;
      }
      match &outcome {
        Ok(rw_path) => {
          asset.rw_path = Some(rw_path.clone());
          asset.error = None;
        }
        Err(err) => {
          asset.rw_path = None;
          asset.error = Some(err.clone());
        }
      }
    }

    if self.pending == 0 && self.state == ModuleState::Extracted {
      self.state = ModuleState::Correlated;
    }
    true
  }
}
