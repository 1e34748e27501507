//! Helpers for classifying and normalising asset references.
//!
//! Filtering of url-ish tokens lives in `filters`, lexical path arithmetic in
//! `relative`. Both are shared by the loader entry point and the resolver.

mod filters;
mod relative;

pub use filters::{
    is_absolute_url, is_url_request, normalise_public_path, prepend_public_path, url_to_request,
};
pub use relative::{join_normalised, relative_path, to_forward_slashes};
