//! Output file names for rewritten resources.
//!
//! Supported tokens: `[ext]`, `[name]`, `[path]`, `[hash]`,
//! `[<hashType>:hash:<digestType>:<length>]` and `[N]`, the N-th capture of the
//! name pattern matched against the resource path.

use std::path::Path;
use std::sync::OnceLock;

use base64::{Engine as _, engine::general_purpose};
use regex::{Captures, Regex};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::asset_paths::{relative_path, to_forward_slashes};
use crate::error::UsageError;

/// Template used when a resource does not specify `name`.
pub const DEFAULT_NAME_TEMPLATE: &str = "[path][name].[ext]";

const DEFAULT_HASH_TYPE: &str = "sha256";
const DEFAULT_DIGEST_TYPE: &str = "hex";
const DEFAULT_HASH_LENGTH: usize = 20;

fn hash_tokens() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"(?i)\[(?:([^:\]]+):)?(?:hash|contenthash)(?::([a-z]+\d*[a-z]*))?(?::(\d+))?\]")
      .expect("invalid hash token regex")
  })
}

fn path_tokens() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"\[(ext|name|path)\]").expect("invalid name token regex"))
}

fn group_tokens() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"\[(\d+)\]").expect("invalid group token regex"))
}

/// Inputs for [`interpolate_name`].
#[derive(Debug, Clone, Copy)]
pub struct NameContext<'a> {
  /// Absolute path of the resource.
  pub resource_path: &'a Path,
  /// Directory `[path]` is relative to.
  pub context: &'a Path,
  /// Resource content, hashed for `[hash]`.
  pub content: &'a [u8],
  /// Pattern providing `[N]` captures.
  pub name_pattern: Option<&'a Regex>,
}

/// Expand `template` for one resource.
pub fn interpolate_name(template: &str, ctx: &NameContext<'_>) -> Result<String, UsageError> {
  let hashed = expand_hashes(template, ctx.content)?;

  let ext = ctx
    .resource_path
    .extension()
    .map(|ext| ext.to_string_lossy().into_owned())
    .unwrap_or_else(|| "bin".to_string());
  let name = ctx
    .resource_path
    .file_stem()
    .map(|stem| stem.to_string_lossy().into_owned())
    .unwrap_or_else(|| "file".to_string());
  let directory = resource_directory(ctx.context, ctx.resource_path);

  let named = path_tokens()
    .replace_all(&hashed, |token: &Captures<'_>| match &token[1] {
      "ext" => ext.clone(),
      "name" => name.clone(),
      _ => directory.clone(),
    })
    .into_owned();

  let Some(pattern) = ctx.name_pattern else {
    return Ok(named);
  };
  let resource = to_forward_slashes(ctx.resource_path);
  let Some(groups) = pattern.captures(&resource) else {
    return Ok(named);
  };

  Ok(
    group_tokens()
      .replace_all(&named, |token: &Captures<'_>| {
        token[1]
          .parse::<usize>()
          .ok()
          .and_then(|index| groups.get(index))
          .map(|group| group.as_str().to_string())
          .unwrap_or_else(|| token[0].to_string())
      })
      .into_owned(),
  )
}

/// Content hash of `content` in the default `[hash]` form.
pub fn content_hash(content: &[u8]) -> String {
  // Defaults are always valid.
  encode_hash(content, DEFAULT_HASH_TYPE, DEFAULT_DIGEST_TYPE, DEFAULT_HASH_LENGTH)
    .unwrap_or_default()
}

fn expand_hashes(template: &str, content: &[u8]) -> Result<String, UsageError> {
  let mut output = String::with_capacity(template.len());
  let mut last = 0;

  for token in hash_tokens().captures_iter(template) {
    let Some(whole) = token.get(0) else {
      continue;
    };
    let hash_type = token.get(1).map_or(DEFAULT_HASH_TYPE, |m| m.as_str());
    let digest_type = token.get(2).map_or(DEFAULT_DIGEST_TYPE, |m| m.as_str());
    let length = token
      .get(3)
      .and_then(|m| m.as_str().parse::<usize>().ok())
      .unwrap_or(DEFAULT_HASH_LENGTH);

    let hash = encode_hash(content, hash_type, digest_type, length).map_err(|reason| {
      UsageError::InvalidNameTemplate {
        template: template.to_string(),
        reason,
      }
    })?;

    output.push_str(&template[last..whole.start()]);
    output.push_str(&hash);
    last = whole.end();
  }

  output.push_str(&template[last..]);
  Ok(output)
}

fn encode_hash(
  content: &[u8],
  hash_type: &str,
  digest_type: &str,
  length: usize,
) -> Result<String, String> {
  let digest = match hash_type.to_ascii_lowercase().as_str() {
    "sha1" => Sha1::digest(content).to_vec(),
    "sha256" => Sha256::digest(content).to_vec(),
    "sha512" => Sha512::digest(content).to_vec(),
    other => return Err(format!("unsupported hash type \"{other}\"")),
  };

  let mut encoded = match digest_type.to_ascii_lowercase().as_str() {
    "hex" => hex::encode(digest),
    "base64" => general_purpose::STANDARD.encode(digest),
    "base64url" => general_purpose::URL_SAFE_NO_PAD.encode(digest),
    other => return Err(format!("unsupported digest type \"{other}\"")),
  };
  encoded.truncate(length);
  Ok(encoded)
}

/// Directory of the resource relative to `context`, with a trailing `/`.
///
/// Segments climbing out of `context` are rendered as `_`.
fn resource_directory(context: &Path, resource_path: &Path) -> String {
  let Some(parent) = resource_path.parent() else {
    return String::new();
  };
  let relative = relative_path(context, parent);
  if relative.is_empty() {
    return String::new();
  }

  let segments: Vec<&str> = relative
    .split('/')
    .map(|segment| if segment == ".." { "_" } else { segment })
    .collect();
  format!("{}/", segments.join("/"))
}
