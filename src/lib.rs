#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod asset_paths;
pub mod cache;
pub mod config;
pub mod directive;
pub mod engine;
pub mod error;
pub mod host;
pub mod interpolate;
pub mod lifecycle;
pub mod loader;
pub mod models;
pub mod pattern;
pub mod registry;
pub mod resolver;
pub mod stats;

pub use config::{EmitStats, RewriterConfig};
pub use directive::{DirectiveOptions, LoaderQuery, RewriteDirective, rewrite_and_emit};
pub use engine::{PathRewriter, RewriteReport, create_engine};
pub use error::{BuildError, PathErrorKind, PathRewriteError, UsageError};
pub use host::{
  Compilation, CompiledModule, HostOptions, MemoryCompilation, ModuleDependency, ResourceContext,
};
pub use lifecycle::{BuildLifecycle, EmitReport};
pub use loader::{TransformOutput, transform_resource};
pub use stats::BuildStats;
