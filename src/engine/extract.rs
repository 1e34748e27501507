use std::collections::HashSet;

use tracing::debug;

use super::PathRewriter;
use crate::asset_paths::{is_url_request, url_to_request};
use crate::models::{ModuleData, ModuleDescriptor, RewriteRules};
use crate::resolver::is_wildcard;

fn captured_tokens<'a>(content: &'a str, rules: &'a RewriteRules) -> impl Iterator<Item = &'a str> {
  rules
    .path_pattern
    .regex()
    .captures_iter(content)
    .filter_map(move |caps| caps.get(rules.path_match_index))
    .map(|group| group.as_str().trim())
    .filter(|token| !token.is_empty())
}

/// Literal tokens the host has to resolve as dependencies, in discovery order.
///
/// Wildcard tokens and tokens that are not url requests are skipped.
pub fn find_asset_paths(content: &str, rules: &RewriteRules) -> Vec<String> {
  let mut seen = HashSet::new();
  captured_tokens(content, rules)
    .filter(|token| !is_wildcard(token) && is_url_request(token))
    .filter(|token| seen.insert(*token))
    .map(str::to_string)
    .collect()
}

/// Wildcard tokens, resolved later by searching the manifest.
pub fn find_wildcard_paths(content: &str, rules: &RewriteRules) -> Vec<String> {
  let mut seen = HashSet::new();
  captured_tokens(content, rules)
    .filter(|token| is_wildcard(token))
    .filter(|token| seen.insert(*token))
    .map(str::to_string)
    .collect()
}

impl PathRewriter {
  /// Record a transformed resource for this cycle.
  ///
  /// Returns the dependency requests the host must add to the resource so the
  /// referenced files get built and emitted.
  pub fn add_module(&mut self, descriptor: ModuleDescriptor) -> Vec<String> {
    let paths = find_asset_paths(&descriptor.content, &descriptor.rules);
    let wildcards = find_wildcard_paths(&descriptor.content, &descriptor.rules);

    let module = ModuleData::new(
      descriptor,
      paths.into_iter().map(|path| {
        let request = url_to_request(&path);
        (path, request)
      }),
    );
    let requests = module.dependency_requests();

    debug!(
      module = %module.rel_path,
      literals = module.assets().len(),
      wildcards = wildcards.len(),
      "recorded resource"
    );
    self.registry.register(module);
    requests
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::RewriterConfig;
  use crate::models::tests::{default_rules, descriptor};

  #[test]
  fn finds_distinct_literal_tokens_in_order() {
    let content = r#"<img src="[[ ./b.png ]]"><img src="[[./a.png]]"><img src="[[./b.png]]">"#;
    assert_eq!(find_asset_paths(content, &default_rules()), vec!["./b.png", "./a.png"]);
  }

  #[test]
  fn skips_wildcards_external_and_empty_tokens() {
    let content = r#""[[app-*.js]]" "[[http://x.com/a.png]]" "[[/abs.png]]" "[[  ]]" "[[data:x]]""#;
    assert!(find_asset_paths(content, &default_rules()).is_empty());
    assert_eq!(find_wildcard_paths(content, &default_rules()), vec!["app-*.js"]);
  }

  #[test]
  fn registers_module_and_returns_requests() {
    let mut engine = PathRewriter::new(RewriterConfig::default()).unwrap();
    let requests = engine.add_module(descriptor(
      "index.html",
      r#""[[logo.png]]" "[[./logo.png]]" "[[~pkg/icon.svg]]""#,
    ));

    assert_eq!(requests, vec!["./logo.png", "pkg/icon.svg"]);
    let module = engine.registry().get("index.html").unwrap();
    assert_eq!(module.assets().len(), 3);
    assert_eq!(module.pending(), 3);
  }

  #[test]
  fn re_adding_a_resource_replaces_it() {
    let mut engine = PathRewriter::new(RewriterConfig::default()).unwrap();
    engine.add_module(descriptor("index.html", r#""[[a.png]]""#));
    engine.add_module(descriptor("index.html", r#""[[b.png]]""#));

    assert_eq!(engine.registry().len(), 1);
    let module = engine.registry().get("index.html").unwrap();
    assert!(module.asset_by_path("b.png").is_some());
    assert!(module.asset_by_path("a.png").is_none());
  }
}
