//! The rewrite engine.
//!
//! One [`PathRewriter`] lives for the whole build session. Each cycle it
//! records resources as they are transformed ([`extract`]), learns which files
//! their dependencies emitted ([`correlate`]) and finally substitutes the
//! tokens and emits the resources ([`rewrite`]).

mod correlate;
mod extract;
mod rewrite;

pub use extract::{find_asset_paths, find_wildcard_paths};
pub use rewrite::RewriteReport;

use tracing::{error, warn};

use crate::cache::RewriteCache;
use crate::config::RewriterConfig;
use crate::directive::LoaderQuery;
use crate::error::{BuildError, UsageError};
use crate::host::Compilation;
use crate::models::RewriteRules;
use crate::pattern::{
  CompiledPattern, DEFAULT_INLINE_PATTERN, DEFAULT_PATH_MATCH_INDEX, DEFAULT_PATH_PATTERN,
  DEFAULT_PATH_REPLACER, compile_pattern,
};
use crate::registry::ModuleRegistry;

/// Prefix of every diagnostic line about a resource.
pub const LOG_LABEL: &str = "PathRewriter";

/// Build-session state: configuration, per-cycle registry and path caches.
#[derive(Debug)]
pub struct PathRewriter {
  config: RewriterConfig,
  rules: RewriteRules,
  registry: ModuleRegistry,
  cache: RewriteCache,
}

impl PathRewriter {
  /// Engine for `config`. Fails when a configured pattern does not compile.
  pub fn new(config: RewriterConfig) -> Result<Self, UsageError> {
    let path_pattern = match compile_pattern(config.path_reg_exp.as_ref())? {
      Some(pattern) => pattern,
      None => CompiledPattern::new(DEFAULT_PATH_PATTERN, "")?,
    };
    let inline_pattern = match compile_pattern(config.inline_reg_exp.as_ref())? {
      Some(pattern) => pattern,
      None => CompiledPattern::new(DEFAULT_INLINE_PATTERN, "")?,
    };

    let rules = RewriteRules {
      path_pattern,
      path_match_index: config.path_match_index.unwrap_or(DEFAULT_PATH_MATCH_INDEX),
      path_replacer: config
        .path_replacer
        .clone()
        .unwrap_or_else(|| DEFAULT_PATH_REPLACER.to_string()),
      inline_pattern,
    };
    let cache = RewriteCache::with_max_age(config.persistent_cache_cycles);

    Ok(Self {
      config,
      rules,
      registry: ModuleRegistry::new(),
      cache,
    })
  }

  /// Construction-time options.
  pub fn config(&self) -> &RewriterConfig {
    &self.config
  }

  /// Engine-wide rules.
  pub fn rules(&self) -> &RewriteRules {
    &self.rules
  }

  /// Resources recorded during the current cycle.
  pub fn registry(&self) -> &ModuleRegistry {
    &self.registry
  }

  /// Path caches.
  pub fn cache(&self) -> &RewriteCache {
    &self.cache
  }

  /// Engine rules with the per-resource overrides of `query` applied.
  pub fn rules_for(&self, query: &LoaderQuery) -> Result<RewriteRules, UsageError> {
    let mut rules = self.rules.clone();
    if let Some(pattern) = compile_pattern(query.path_reg_exp.as_ref())? {
      rules.path_pattern = pattern;
    }
    if let Some(index) = query.path_match_index {
      rules.path_match_index = index;
    }
    if let Some(replacer) = &query.path_replacer {
      rules.path_replacer = replacer.clone();
    }
    if let Some(pattern) = compile_pattern(query.inline_reg_exp.as_ref())? {
      rules.inline_pattern = pattern;
    }
    Ok(rules)
  }

  /// Log `error` unless silent, then hand it to the host.
  pub(crate) fn report<C: Compilation + ?Sized>(&self, error: BuildError, compilation: &mut C) {
    if !self.config.silent {
      match &error {
        BuildError::Rewrite(err) => warn!("{err}"),
        BuildError::Other(err) => error!("{err:?}"),
      }
    }
    compilation.push_error(error);
  }
}

/// Create a rewriter engine for one build session.
pub fn create_engine(config: RewriterConfig) -> Result<PathRewriter, UsageError> {
  PathRewriter::new(config)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::host::MemoryCompilation;
  use crate::pattern::PatternDescriptor;

  #[test]
  fn defaults_fill_missing_rules() {
    let engine = create_engine(RewriterConfig::default()).unwrap();
    let rules = engine.rules();
    assert_eq!(rules.path_pattern.source(), DEFAULT_PATH_PATTERN);
    assert_eq!(rules.path_match_index, 1);
    assert_eq!(rules.path_replacer, DEFAULT_PATH_REPLACER);
    assert_eq!(rules.inline_pattern.source(), DEFAULT_INLINE_PATTERN);
  }

  #[test]
  fn invalid_configured_patterns_are_usage_errors() {
    let config = RewriterConfig {
      path_reg_exp: Some(PatternDescriptor::from("(unclosed")),
      ..RewriterConfig::default()
    };
    assert!(matches!(
      create_engine(config),
      Err(UsageError::InvalidPattern { .. })
    ));
  }

  #[test]
  fn query_overrides_take_precedence() {
    let engine = create_engine(RewriterConfig {
      path_replacer: Some("url([path])".into()),
      ..RewriterConfig::default()
    })
    .unwrap();

    let rules = engine
      .rules_for(&LoaderQuery {
        path_reg_exp: Some(PatternDescriptor::from(r"(src)=\[\[(.*?)\]\]")),
        path_match_index: Some(2),
        ..LoaderQuery::default()
      })
      .unwrap();
    assert_eq!(rules.path_pattern.source(), r"(src)=\[\[(.*?)\]\]");
    assert_eq!(rules.path_match_index, 2);
    assert_eq!(rules.path_replacer, "url([path])");
  }

  #[test]
  fn reported_errors_reach_the_host_even_when_silent() {
    let engine = create_engine(RewriterConfig {
      silent: true,
      ..RewriterConfig::default()
    })
    .unwrap();
    let mut compilation = MemoryCompilation::new();
    engine.report(BuildError::from(anyhow::anyhow!("boom")), &mut compilation);
    assert_eq!(compilation.errors().len(), 1);
  }
}
