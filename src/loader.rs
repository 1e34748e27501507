//! Loader entry point: turns a marked resource into a small generated module.
//!
//! The generated module requires every literal asset the resource references,
//! so the host builds and emits them, and exports the resource's public url.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::asset_paths::{normalise_public_path, relative_path};
use crate::directive::LoaderQuery;
use crate::engine::PathRewriter;
use crate::error::UsageError;
use crate::host::{HostOptions, ResourceContext};
use crate::interpolate::{DEFAULT_NAME_TEMPLATE, NameContext, content_hash, interpolate_name};
use crate::models::ModuleDescriptor;

/// Generated module for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
  /// Output path of the resource, relative to the output directory.
  pub url: String,
  /// Dependency requests the host must add to the resource.
  pub dependencies: Vec<String>,
  /// Generated module source.
  pub source: String,
}

/// Transform one resource and record it on `engine`.
pub fn transform_resource(
  engine: &mut PathRewriter,
  host: &HostOptions,
  resource: &ResourceContext,
  content: &str,
) -> Result<TransformOutput, UsageError> {
  let query = LoaderQuery::parse(&resource.query)?;

  let top_level_context = query
    .context
    .as_deref()
    .map_or_else(|| host.context.clone(), PathBuf::from);
  let public_path =
    normalise_public_path(query.public_path.as_deref().unwrap_or(&host.public_path));
  let context = resource
    .resource_path
    .parent()
    .map_or_else(|| top_level_context.clone(), Path::to_path_buf);

  let name_pattern = query
    .name_reg_exp
    .as_deref()
    .map(|source| {
      Regex::new(source).map_err(|err| UsageError::InvalidPattern {
        source_text: source.to_string(),
        reason: err.to_string(),
      })
    })
    .transpose()?;

  let url = interpolate_name(
    query.name.as_deref().unwrap_or(DEFAULT_NAME_TEMPLATE),
    &NameContext {
      resource_path: &resource.resource_path,
      context: &top_level_context,
      content: content.as_bytes(),
      name_pattern: name_pattern.as_ref(),
    },
  )?;

  let rules = engine.rules_for(&query)?;
  let rel_path = relative_path(&top_level_context, &resource.resource_path);
  debug!(resource = %rel_path, url = %url, "transforming resource");

  let dependencies = engine.add_module(ModuleDescriptor {
    request: resource.request.clone(),
    url: url.clone(),
    content: content.to_string(),
    public_path: public_path.clone(),
    context,
    top_level_context,
    rel_path,
    rules,
  });

  let source = generated_source(
    &dependencies,
    &format!("{public_path}{url}"),
    engine.config().include_hash.then(|| content_hash(content.as_bytes())),
  );

  Ok(TransformOutput {
    url,
    dependencies,
    source,
  })
}

fn js_string(value: &str) -> String {
  Value::String(value.to_string()).to_string()
}

fn generated_source(dependencies: &[String], public_url: &str, hash: Option<String>) -> String {
  let requires: Vec<String> = dependencies
    .iter()
    .map(|request| format!("require({})", js_string(request)))
    .collect();

  let mut export = format!("module.exports = {}", js_string(public_url));
  if let Some(hash) = hash {
    export.push_str(&format!(" // content hash: {hash}"));
  }

  format!("{}\n{export}", requires.join("\n"))
}
