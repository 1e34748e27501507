//! Regular expressions used to locate path tokens, inline tokens and wildcard assets.
//!
//! Compilation and flag normalisation live in `compile`, wildcard escaping in
//! `escape`, replacement templates in `replacer`.

mod compile;
mod escape;
mod replacer;

pub use compile::{
    CompiledPattern, DEFAULT_INLINE_PATTERN, DEFAULT_PATH_MATCH_INDEX, DEFAULT_PATH_PATTERN,
    DEFAULT_PATH_REPLACER, PatternDescriptor, compile_pattern,
};
pub use escape::{HASH_PLACEHOLDER, escape_literal, is_pre_anchored, wildcard_search_pattern};
pub use replacer::apply_replacer;
