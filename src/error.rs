//! Error types shared by the rewrite engine and the lifecycle adapter.

use thiserror::Error;

/// Structural misuse of the plugin/loader pair. Always fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
  /// The loader ran in a build that has no rewriter engine attached.
  #[error(
    "path rewriter loader is used without the corresponding engine;\n  \
     attach an engine with `BuildLifecycle::attach` before transforming resources"
  )]
  MissingEngine,

  /// A second engine was attached to a build that already has one.
  #[error("only one path rewriter engine may be attached to a build")]
  DuplicateEngine,

  /// Both `loader` and `loaders` were supplied to the marking directive.
  #[error("cannot use both loader and loaders")]
  ConflictingLoaders,

  /// The loader query could not be decoded.
  #[error("invalid loader query {query:?}: {reason}")]
  InvalidQuery {
    /// Raw query string after `:BANG:` decoding.
    query: String,
    /// Human readable decoding failure.
    reason: String,
  },

  /// A user supplied regular expression failed to compile.
  #[error("invalid pattern {source_text:?}: {reason}")]
  InvalidPattern {
    /// Pattern source as provided by the caller.
    source_text: String,
    /// Compiler diagnostic.
    reason: String,
  },

  /// The output name template referenced an unsupported hash or digest.
  #[error("invalid name template {template:?}: {reason}")]
  InvalidNameTemplate {
    /// The template that failed to interpolate.
    template: String,
    /// Which part of the template is unsupported.
    reason: String,
  },
}

/// What went wrong while rewriting a single token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathErrorKind {
  /// A registered dependency produced zero or several emitted files.
  #[error("invalid number of assets for path \"{path}\", assets: [{}]", quoted_list(.assets))]
  AmbiguousAsset {
    /// Token as written in the source.
    path: String,
    /// Emitted files reported by the host for the dependency.
    assets: Vec<String>,
  },

  /// Nothing in the registry, the caches or the manifest matched the token.
  #[error("could not resolve path \"{path}\"")]
  Unresolved {
    /// Token as written in the source.
    path: String,
  },

  /// The wildcard token is made only of `*`.
  #[error("invalid wildcard path \"{path}\", must contain at least one non-wildcard symbol")]
  InvalidWildcard {
    /// Token as written in the source.
    path: String,
  },

  /// A pre-anchored `^...$` token is not a valid regular expression.
  #[error("invalid search pattern \"{path}\": {reason}")]
  InvalidSearchPattern {
    /// Token as written in the source.
    path: String,
    /// Compiler diagnostic.
    reason: String,
  },

  /// An inline token names an asset that is not part of the manifest.
  #[error("could not inline asset \"{url}\": not found among emitted assets")]
  InlineNotFound {
    /// Asset url captured from the inline token.
    url: String,
  },

  /// An inline token names an emitted asset whose content is not UTF-8 text.
  #[error("could not inline asset \"{url}\": content is not valid UTF-8")]
  InlineNotUtf8 {
    /// Asset url captured from the inline token.
    url: String,
  },
}

/// Token-level failure tagged with the resource it happened in.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{rel_path}: {kind}")]
pub struct PathRewriteError {
  /// Resource path relative to the top-level context.
  pub rel_path: String,
  /// Failure discriminant.
  pub kind: PathErrorKind,
}

impl PathRewriteError {
  /// Tag `kind` with the resource path it was raised for.
  pub fn new(rel_path: impl Into<String>, kind: PathErrorKind) -> Self {
    Self {
      rel_path: rel_path.into(),
      kind,
    }
  }
}

/// Non-fatal error collected into the host's error list.
#[derive(Error, Debug)]
pub enum BuildError {
  /// Structured token failure; only its message is logged.
  #[error(transparent)]
  Rewrite(#[from] PathRewriteError),

  /// Anything else; logged with its full cause chain.
  #[error(transparent)]
  Other(#[from] anyhow::Error),
}

impl BuildError {
  /// The structured rewrite error, when this is one.
  pub fn as_rewrite(&self) -> Option<&PathRewriteError> {
    match self {
      Self::Rewrite(err) => Some(err),
      Self::Other(_) => None,
    }
  }
}

fn quoted_list(values: &[String]) -> String {
  values
    .iter()
    .map(|value| format!("\"{value}\""))
    .collect::<Vec<_>>()
    .join(", ")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rewrite_errors_are_prefixed_with_the_resource_path() {
    let err = PathRewriteError::new("pages/index.html", PathErrorKind::Unresolved {
      path: "./missing.png".into(),
    });
    assert_eq!(
      err.to_string(),
      "pages/index.html: could not resolve path \"./missing.png\""
    );
  }

  #[test]
  fn ambiguous_assets_list_every_emitted_file() {
    let kind = PathErrorKind::AmbiguousAsset {
      path: "./a.png".into(),
      assets: vec!["a-1.png".into(), "a-2.png".into()],
    };
    assert_eq!(
      kind.to_string(),
      "invalid number of assets for path \"./a.png\", assets: [\"a-1.png\", \"a-2.png\"]"
    );
  }

  #[test]
  fn build_error_exposes_structured_variant() {
    let structured = BuildError::from(PathRewriteError::new("a.css", PathErrorKind::InlineNotFound {
      url: "b.css".into(),
    }));
    assert!(structured.as_rewrite().is_some());

    let other = BuildError::from(anyhow::anyhow!("boom"));
    assert!(other.as_rewrite().is_none());
  }
}
