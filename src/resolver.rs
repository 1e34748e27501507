//! Maps a path token found in a resource onto the file the host emitted for it.
//!
//! Literal tokens are answered from correlation results recorded on the module,
//! wildcard tokens by scanning the manifest. Both consult the cycle cache first
//! and fall back to the persistent cache.

use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::asset_paths::{is_absolute_url, join_normalised, relative_path};
use crate::cache::{CacheKey, RewriteCache};
use crate::error::{PathErrorKind, PathRewriteError};
use crate::models::ModuleData;
use crate::pattern::{is_pre_anchored, wildcard_search_pattern};

/// Whether a token must be resolved by manifest search.
pub fn is_wildcard(src_path: &str) -> bool {
  src_path.contains('*')
}

/// Resolver bound to one cycle's manifest and the engine's caches.
pub struct AssetResolver<'a> {
  manifest: &'a [String],
  cache: &'a mut RewriteCache,
}

impl<'a> AssetResolver<'a> {
  /// Resolver searching `manifest`, caching into `cache`.
  pub fn new(manifest: &'a [String], cache: &'a mut RewriteCache) -> Self {
    Self { manifest, cache }
  }

  /// Resolve any token, dispatching on the presence of `*`.
  ///
  /// A successful result is never empty and is remembered in the cycle cache.
  pub fn resolve(
    &mut self,
    src_path: &str,
    module: &ModuleData,
  ) -> Result<String, PathRewriteError> {
    if is_wildcard(src_path) {
      self.resolve_wildcard_cached(src_path, module)
    } else {
      self.resolve_literal(src_path, module)
    }
  }

  /// Resolve a literal token.
  ///
  /// Order: cycle cache, the module's correlated [`crate::models::AssetData`]
  /// (its recorded error wins), the persistent cache.
  pub fn resolve_literal(
    &mut self,
    src_path: &str,
    module: &ModuleData,
  ) -> Result<String, PathRewriteError> {
    let key = CacheKey::new(&module.context, src_path);
    if let Some(rw_path) = self.cache.cycle_get(&key) {
      return Ok(rw_path.to_string());
    }

    let found = match module.asset_by_path(src_path) {
      Some(asset) => {
        if let Some(err) = &asset.error {
          return Err(err.clone());
        }
        asset.rw_path.clone()
      }
      None => None,
    };

    self.finish(key, src_path, module, found)
  }

  fn resolve_wildcard_cached(
    &mut self,
    src_path: &str,
    module: &ModuleData,
  ) -> Result<String, PathRewriteError> {
    let key = CacheKey::new(&module.context, src_path);
    if let Some(rw_path) = self.cache.cycle_get(&key) {
      return Ok(rw_path.to_string());
    }

    let found = self.resolve_wildcard(src_path, module)?;
    self.finish(key, src_path, module, found)
  }

  /// Search the manifest for a wildcard token.
  ///
  /// Absolute urls come back unchanged. A `^...$` token is used as the search
  /// pattern verbatim. Otherwise every run of `*` in the token matches a
  /// content hash; a token made only of `*` is rejected. The token is searched
  /// as written first, then relative to the module's top-level context. The
  /// first manifest entry that matches wins.
  pub fn resolve_wildcard(
    &self,
    src_path: &str,
    module: &ModuleData,
  ) -> Result<Option<String>, PathRewriteError> {
    if is_absolute_url(src_path) {
      return Ok(Some(src_path.to_string()));
    }

    if is_pre_anchored(src_path) {
      return self.search(src_path, src_path, module);
    }

    let search = wildcard_search_pattern(src_path).ok_or_else(|| {
      PathRewriteError::new(&module.rel_path, PathErrorKind::InvalidWildcard {
        path: src_path.to_string(),
      })
    })?;
    if let Some(found) = self.search(&search, src_path, module)? {
      return Ok(Some(found));
    }

    let rel_path = wildcard_relative_path(&module.context, &module.top_level_context, src_path);
    if rel_path == src_path {
      return Ok(None);
    }
    match wildcard_search_pattern(&rel_path) {
      Some(relative) => self.search(&relative, src_path, module),
      None => Ok(None),
    }
  }

  fn search(
    &self,
    search: &str,
    src_path: &str,
    module: &ModuleData,
  ) -> Result<Option<String>, PathRewriteError> {
    let regex = Regex::new(search).map_err(|err| {
      PathRewriteError::new(&module.rel_path, PathErrorKind::InvalidSearchPattern {
        path: src_path.to_string(),
        reason: err.to_string(),
      })
    })?;

    let found = self
      .manifest
      .iter()
      .find(|candidate| regex.is_match(candidate))
      .cloned();
    debug!(pattern = %search, found = ?found, "wildcard search");
    Ok(found)
  }

  fn finish(
    &mut self,
    key: CacheKey,
    src_path: &str,
    module: &ModuleData,
    found: Option<String>,
  ) -> Result<String, PathRewriteError> {
    let rw_path = found.or_else(|| self.cache.persistent_get(&key).map(str::to_string));

    match rw_path {
      Some(rw_path) if !rw_path.is_empty() => {
        self.cache.cycle_insert(key, rw_path.clone());
        Ok(rw_path)
      }
      _ => Err(PathRewriteError::new(&module.rel_path, PathErrorKind::Unresolved {
        path: src_path.to_string(),
      })),
    }
  }
}

fn wildcard_relative_path(context: &Path, top_level_context: &Path, src_path: &str) -> String {
  let absolute = join_normalised(context, src_path);
  relative_path(top_level_context, &absolute)
}
