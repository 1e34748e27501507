use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::UsageError;

/// Matches `"[[ <path> ]]"`, capturing the text between the brackets.
pub const DEFAULT_PATH_PATTERN: &str = r#""\[\[(.*?)\]\]""#;

/// Capture group of [`DEFAULT_PATH_PATTERN`] holding the path.
pub const DEFAULT_PATH_MATCH_INDEX: usize = 1;

/// Keeps the surrounding quotes and drops the brackets.
pub const DEFAULT_PATH_REPLACER: &str = r#""[path]""#;

/// Matches `[[ INLINE(<assetUrl>) ]]`, capturing the asset url.
pub const DEFAULT_INLINE_PATTERN: &str = r"\[\[\s*INLINE\((.*?)\)\s*\]\]";

/// Caller supplied description of a pattern.
///
/// Either a bare source string or a `{ source, flags }` pair using the
/// single-letter flag convention (`g`, `i`, `m`, `s`, `u`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternDescriptor {
    /// Pattern source without flags.
    Source(String),
    /// Pattern source with explicit flags.
    Parts {
        /// Pattern source.
        source: String,
        /// Flag letters.
        #[serde(default)]
        flags: String,
    },
}

impl PatternDescriptor {
    /// Pattern source text.
    pub fn source(&self) -> &str {
        match self {
            Self::Source(source) | Self::Parts { source, .. } => source,
        }
    }

    /// Flag letters, empty for [`PatternDescriptor::Source`].
    pub fn flags(&self) -> &str {
        match self {
            Self::Source(_) => "",
            Self::Parts { flags, .. } => flags,
        }
    }
}

impl From<&str> for PatternDescriptor {
    fn from(source: &str) -> Self {
        Self::Source(source.to_string())
    }
}

impl From<&Regex> for PatternDescriptor {
    fn from(regex: &Regex) -> Self {
        Self::Parts {
            source: regex.as_str().to_string(),
            flags: String::new(),
        }
    }
}

impl From<&CompiledPattern> for PatternDescriptor {
    /// Only the case and multi-line flags survive serialisation; global matching
    /// is implied on the receiving side.
    fn from(pattern: &CompiledPattern) -> Self {
        Self::Parts {
            source: pattern.source.clone(),
            flags: pattern
                .flags
                .chars()
                .filter(|flag| matches!(flag, 'i' | 'm'))
                .collect(),
        }
    }
}

/// A compiled pattern that always scans the whole input.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    source: String,
    flags: String,
}

impl CompiledPattern {
    /// Compile `source` with the given flag letters. `g` is always added.
    pub fn new(source: &str, flags: &str) -> Result<Self, UsageError> {
        let mut builder = RegexBuilder::new(source);
        for flag in flags.chars() {
            match flag {
                'g' | 'u' => {}
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                other => {
                    return Err(UsageError::InvalidPattern {
                        source_text: source.to_string(),
                        reason: format!("unsupported flag '{other}'"),
                    });
                }
            }
        }

        let regex = builder.build().map_err(|err| UsageError::InvalidPattern {
            source_text: source.to_string(),
            reason: err.to_string(),
        })?;

        let mut flags = flags.to_string();
        if !flags.contains('g') {
            flags.push('g');
        }

        Ok(Self {
            regex,
            source: source.to_string(),
            flags,
        })
    }

    /// Underlying regular expression.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Source text the pattern was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Normalised flag letters; always contains `g`.
    pub fn flags(&self) -> &str {
        &self.flags
    }
}

/// Compile an optional descriptor.
///
/// Returns `Ok(None)` when no descriptor is given so callers can fall back to a
/// built-in default.
pub fn compile_pattern(
    descriptor: Option<&PatternDescriptor>,
) -> Result<Option<CompiledPattern>, UsageError> {
    descriptor
        .map(|descriptor| CompiledPattern::new(descriptor.source(), descriptor.flags()))
        .transpose()
}
