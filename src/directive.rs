//! Marking resources for rewriting.
//!
//! [`rewrite_and_emit`] produces the loader-chain string a host configuration
//! attaches to matching resources; [`LoaderQuery::parse`] decodes the query the
//! loader entry point receives back.

use percent_encoding::percent_decode_str;
use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::UsageError;
use crate::pattern::PatternDescriptor;

/// Identifier of the loader entry point inside a loader chain.
pub const LOADER_ID: &str = "bundle-path-rewriter";

/// `!` separates loaders in a chain, so it is escaped inside the JSON query.
const BANG_PLACEHOLDER: &str = ":BANG:";

/// Per-resource options carried in the loader query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoaderQuery {
  /// Output name template, see [`crate::interpolate`].
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  /// Pattern supplying `[N]` tokens of `name`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name_reg_exp: Option<String>,
  /// Treat the resource as located in this directory.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub context: Option<String>,
  /// Overrides the host's public path.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub public_path: Option<String>,
  /// Overrides the engine's path-token pattern.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub path_reg_exp: Option<PatternDescriptor>,
  /// Overrides the engine's path capture group.
  #[serde(
    skip_serializing_if = "Option::is_none",
    deserialize_with = "deserialize_index"
  )]
  pub path_match_index: Option<usize>,
  /// Overrides the engine's replacement template.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub path_replacer: Option<String>,
  /// Overrides the engine's inline-token pattern.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub inline_reg_exp: Option<PatternDescriptor>,
}

impl LoaderQuery {
  /// Decode a loader query.
  ///
  /// Accepts `?{json}` as produced by [`rewrite_and_emit`] as well as
  /// `?key=value&flag` pairs. A bare `key` or `+key` means `true`, `-key` means
  /// `false`.
  pub fn parse(query: &str) -> Result<Self, UsageError> {
    let decoded = query.replace(BANG_PLACEHOLDER, "!");
    let body = decoded.strip_prefix('?').unwrap_or(&decoded).trim();
    if body.is_empty() {
      return Ok(Self::default());
    }

    let invalid = |reason: String| UsageError::InvalidQuery {
      query: decoded.clone(),
      reason,
    };

    if body.starts_with('{') {
      return serde_json::from_str(body).map_err(|err| invalid(err.to_string()));
    }

    let decode = |text: &str| {
      percent_decode_str(text)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|err| invalid(err.to_string()))
    };

    let mut fields = Map::new();
    for pair in body.split(['&', ',']).filter(|pair| !pair.is_empty()) {
      let (key, value) = match pair.split_once('=') {
        Some((key, value)) => (key, Value::String(decode(value)?)),
        None => match pair.strip_prefix('-') {
          Some(key) => (key, Value::Bool(false)),
          None => (pair.trim_start_matches('+'), Value::Bool(true)),
        },
      };
      fields.insert(decode(key)?, value);
    }
    serde_json::from_value(Value::Object(fields)).map_err(|err| invalid(err.to_string()))
  }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IndexValue {
  Number(usize),
  Text(String),
}

fn deserialize_index<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
  D: Deserializer<'de>,
{
  match Option::<IndexValue>::deserialize(deserializer)? {
    None => Ok(None),
    Some(IndexValue::Number(index)) => Ok(Some(index)),
    Some(IndexValue::Text(text)) => text
      .trim()
      .parse()
      .map(Some)
      .map_err(|_| D::Error::custom(format!("invalid pathMatchIndex \"{text}\""))),
  }
}

/// Structured form of the marking directive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DirectiveOptions {
  /// Loader chain applied before rewriting, e.g. a template compiler.
  pub loader: Option<String>,
  /// Same as `loader`, one entry per loader.
  pub loaders: Option<Vec<String>>,
  /// Options forwarded to the loader entry point.
  #[serde(flatten)]
  pub query: LoaderQuery,
}

/// Either a raw chain string or structured options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteDirective {
  /// Raw chain, e.g. `?name=[path][name].html` or `jade-html?pretty`.
  Chain(String),
  /// Structured options.
  Options(DirectiveOptions),
}

impl From<&str> for RewriteDirective {
  fn from(chain: &str) -> Self {
    Self::Chain(chain.to_string())
  }
}

impl From<String> for RewriteDirective {
  fn from(chain: String) -> Self {
    Self::Chain(chain)
  }
}

impl From<DirectiveOptions> for RewriteDirective {
  fn from(options: DirectiveOptions) -> Self {
    Self::Options(options)
  }
}

/// Build the loader-chain string marking a resource for rewriting and emission.
pub fn rewrite_and_emit(directive: impl Into<RewriteDirective>) -> Result<String, UsageError> {
  let options = match directive.into() {
    RewriteDirective::Chain(chain) => {
      return Ok(if chain.starts_with(['?', '!']) {
        format!("{LOADER_ID}{chain}")
      } else if chain.is_empty() {
        LOADER_ID.to_string()
      } else {
        format!("{LOADER_ID}!{chain}")
      });
    }
    RewriteDirective::Options(options) => options,
  };

  let loader = match (options.loader, options.loaders) {
    (Some(_), Some(_)) => return Err(UsageError::ConflictingLoaders),
    (Some(loader), None) => loader,
    (None, Some(loaders)) => loaders.join("!"),
    (None, None) => String::new(),
  };

  let query = serde_json::to_string(&options.query).map_err(|err| UsageError::InvalidQuery {
    query: String::new(),
    reason: err.to_string(),
  })?;
  let query = query.replace('!', BANG_PLACEHOLDER);

  let chain = if loader.is_empty() || loader.starts_with('!') {
    loader
  } else {
    format!("!{loader}")
  };

  Ok(format!("{LOADER_ID}?{query}{chain}"))
}
