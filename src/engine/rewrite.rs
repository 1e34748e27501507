use serde::Serialize;
use tracing::{debug, info};

use super::{LOG_LABEL, PathRewriter};
use crate::asset_paths::{is_absolute_url, is_url_request, prepend_public_path};
use crate::error::{PathErrorKind, PathRewriteError};
use crate::host::Compilation;
use crate::models::{ModuleData, ModuleState};
use crate::pattern::apply_replacer;
use crate::resolver::{AssetResolver, is_wildcard};

/// Outcome of rewriting one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteReport {
  /// Output path the resource was emitted under.
  pub url: String,
  /// Resource path relative to the top-level context.
  pub rel_path: String,
  /// Path tokens substituted.
  pub rewritten: usize,
  /// Inline tokens substituted.
  pub inlined: usize,
  /// Messages of the token failures; those tokens were left unchanged.
  pub errors: Vec<String>,
}

#[derive(Default)]
struct Pass {
  content: String,
  substituted: usize,
  errors: Vec<PathRewriteError>,
}

impl PathRewriter {
  /// Emit hook: rewrite every recorded resource and emit it under its url.
  ///
  /// Starts a cache cycle against a snapshot of the host's manifest, merges
  /// the cycle's resolutions into the persistent cache and empties the
  /// registry afterwards. Token failures go to the host's error list and never
  /// abort the emission.
  pub fn rewrite_modules<C: Compilation + ?Sized>(
    &mut self,
    compilation: &mut C,
  ) -> Vec<RewriteReport> {
    let manifest = compilation.asset_names();
    let cycle = self.cache.begin_cycle();
    let modules = self.registry.take_all();
    let silent = self.config.silent;
    debug!(cycle, modules = modules.len(), assets = manifest.len(), "rewriting resources");

    let mut reports = Vec::with_capacity(modules.len());
    for mut module in modules {
      if module.state == ModuleState::Extracted {
        debug!(
          module = %module.rel_path,
          pending = module.pending(),
          "rewriting before every dependency was correlated"
        );
      }

      let paths = {
        let mut resolver = AssetResolver::new(&manifest, &mut self.cache);
        rewrite_paths(&module, &mut resolver, silent)
      };
      let inlined = inline_assets(&module, &paths.content, &*compilation, silent);

      let errors: Vec<PathRewriteError> = paths.errors.into_iter().chain(inlined.errors).collect();
      let messages = errors.iter().map(ToString::to_string).collect();
      for err in errors {
        self.report(err.into(), compilation);
      }

      compilation.emit_asset(&module.url, inlined.content.into_bytes());
      module.state = ModuleState::Rewritten;
      reports.push(RewriteReport {
        url: module.url,
        rel_path: module.rel_path,
        rewritten: paths.substituted,
        inlined: inlined.substituted,
        errors: messages,
      });
    }

    self.cache.merge_cycle();
    self.registry.clear();
    reports
  }
}

/// Substitute every path token of `module`'s content.
///
/// Failed tokens keep their original text.
fn rewrite_paths(module: &ModuleData, resolver: &mut AssetResolver<'_>, silent: bool) -> Pass {
  let rules = &module.rules;
  let content = module.content.as_str();
  let mut pass = Pass {
    content: String::with_capacity(content.len()),
    ..Pass::default()
  };
  let mut last = 0;

  for caps in rules.path_pattern.regex().captures_iter(content) {
    let Some(whole) = caps.get(0) else {
      continue;
    };
    pass.content.push_str(&content[last..whole.start()]);
    last = whole.end();

    let src_path = caps
      .get(rules.path_match_index)
      .map_or("", |group| group.as_str().trim());
    if src_path.is_empty() {
      pass.content.push_str(whole.as_str());
      continue;
    }

    let resolved = if is_wildcard(src_path) || is_url_request(src_path) {
      resolver.resolve(src_path, module)
    } else if is_absolute_url(src_path) {
      Ok(src_path.to_string())
    } else {
      Err(PathRewriteError::new(
        module.rel_path.clone(),
        PathErrorKind::Unresolved {
          path: src_path.to_string(),
        },
      ))
    };

    match resolved {
      Ok(rw_path) => {
        let rw_path = prepend_public_path(&module.public_path, &rw_path);
        if !silent && rw_path != src_path {
          info!("{LOG_LABEL}[ {} ]: \"{src_path}\" -> \"{rw_path}\"", module.rel_path);
        }
        pass.content.push_str(&apply_replacer(&rules.path_replacer, &rw_path, &caps));
        pass.substituted += 1;
      }
      Err(err) => {
        pass.content.push_str(whole.as_str());
        pass.errors.push(err);
      }
    }
  }

  pass.content.push_str(&content[last..]);
  pass
}

/// Replace every inline token with the content of the emitted file it names.
fn inline_assets<C: Compilation + ?Sized>(
  module: &ModuleData,
  content: &str,
  compilation: &C,
  silent: bool,
) -> Pass {
  let mut pass = Pass {
    content: String::with_capacity(content.len()),
    ..Pass::default()
  };
  let mut last = 0;

  for caps in module.rules.inline_pattern.regex().captures_iter(content) {
    let Some(whole) = caps.get(0) else {
      continue;
    };
    pass.content.push_str(&content[last..whole.start()]);
    last = whole.end();

    let url = caps.get(1).map_or("", |group| group.as_str().trim());
    if url.is_empty() {
      pass.content.push_str(whole.as_str());
      continue;
    }

    let inlined = match compilation.asset_bytes(url) {
      Some(bytes) => std::str::from_utf8(bytes).map_err(|_| PathErrorKind::InlineNotUtf8 {
        url: url.to_string(),
      }),
      None => Err(PathErrorKind::InlineNotFound {
        url: url.to_string(),
      }),
    };

    match inlined {
      Ok(text) => {
        pass.content.push_str(text);
        pass.substituted += 1;
        if !silent {
          info!("{LOG_LABEL}[ {} ]: inlined \"{url}\"", module.rel_path);
        }
      }
      Err(kind) => {
        pass.content.push_str(whole.as_str());
        pass.errors.push(PathRewriteError::new(module.rel_path.clone(), kind));
      }
    }
  }

  pass.content.push_str(&content[last..]);
  pass
}

#[cfg(test)]
mod tests {
  use std::io::{self, Write};
  use std::sync::{Arc, Mutex};

  use tracing_subscriber::fmt::MakeWriter;

  use super::*;
  use crate::config::RewriterConfig;
  use crate::host::{CompiledModule, MemoryCompilation, ModuleDependency};
  use crate::models::tests::descriptor;

  fn engine() -> PathRewriter {
    PathRewriter::new(RewriterConfig {
      silent: true,
      ..RewriterConfig::default()
    })
    .unwrap()
  }

  fn correlate(engine: &mut PathRewriter, dependencies: Vec<ModuleDependency>) {
    engine.correlate(&[CompiledModule {
      request: "index.html".into(),
      dependencies,
    }]);
  }

  #[test]
  fn rewrites_literal_tokens_with_public_path() {
    let mut engine = engine();
    engine.add_module(descriptor("index.html", r#"<img src="[[./a.png]]">"#));
    correlate(&mut engine, vec![ModuleDependency::emitted("./a.png", &["a-5f3c.png"])]);

    let mut compilation = MemoryCompilation::new().with_asset("a-5f3c.png", "png");
    let reports = engine.rewrite_modules(&mut compilation);

    assert_eq!(
      compilation.asset_text("index.html"),
      Some(r#"<img src="/static/a-5f3c.png">"#)
    );
    assert_eq!(reports[0].rewritten, 1);
    assert!(compilation.errors().is_empty());
    assert!(engine.registry().is_empty());
  }

  #[test]
  fn failed_tokens_are_left_untouched() {
    let mut engine = engine();
    let content = r#"<img src="[[./a.png]]"><img src="[[./b.png]]">"#;
    engine.add_module(descriptor("index.html", content));
    correlate(&mut engine, vec![
      ModuleDependency::emitted("./a.png", &["a-1.png", "a-2.png"]),
      ModuleDependency::emitted("./b.png", &["b-1.png"]),
    ]);

    let mut compilation = MemoryCompilation::new();
    let reports = engine.rewrite_modules(&mut compilation);

    assert_eq!(
      compilation.asset_text("index.html"),
      Some(r#"<img src="[[./a.png]]"><img src="/static/b-1.png">"#)
    );
    assert_eq!(compilation.errors().len(), 1);
    let err = compilation.errors()[0].as_rewrite().unwrap();
    assert!(matches!(err.kind, PathErrorKind::AmbiguousAsset { .. }));
    assert_eq!(reports[0].errors.len(), 1);
  }

  #[test]
  fn external_and_empty_tokens_are_passed_through() {
    let mut engine = engine();
    engine.add_module(descriptor(
      "index.html",
      r#"<a href="[[https://example.com/x]]"></a><i class="[[ ]]"></i>"#,
    ));

    let mut compilation = MemoryCompilation::new();
    engine.rewrite_modules(&mut compilation);

    assert_eq!(
      compilation.asset_text("index.html"),
      Some(r#"<a href="https://example.com/x"></a><i class="[[ ]]"></i>"#)
    );
    assert!(compilation.errors().is_empty());
  }

  #[test]
  fn wildcard_tokens_are_searched_in_the_manifest() {
    let mut engine = engine();
    engine.add_module(descriptor("index.html", r#"<script src="[[app-*.js]]"></script>"#));

    let mut compilation = MemoryCompilation::new()
      .with_asset("vendor-1.js", "")
      .with_asset("app-7a7a.js", "");
    engine.rewrite_modules(&mut compilation);

    assert_eq!(
      compilation.asset_text("index.html"),
      Some(r#"<script src="/static/app-7a7a.js"></script>"#)
    );
  }

  #[test]
  fn inline_tokens_splice_asset_content() {
    let mut engine = engine();
    engine.add_module(descriptor(
      "index.html",
      "<style>[[ INLINE(style-abc.css) ]]</style><style>[[INLINE(gone.css)]]</style>",
    ));

    let mut compilation = MemoryCompilation::new().with_asset("style-abc.css", "body{color:red}");
    let reports = engine.rewrite_modules(&mut compilation);

    assert_eq!(
      compilation.asset_text("index.html"),
      Some("<style>body{color:red}</style><style>[[INLINE(gone.css)]]</style>")
    );
    assert_eq!(reports[0].inlined, 1);
    assert_eq!(compilation.errors().len(), 1);
    assert_eq!(
      compilation.errors()[0].as_rewrite().unwrap().kind,
      PathErrorKind::InlineNotFound {
        url: "gone.css".into()
      }
    );
  }

  #[test]
  fn tokens_that_are_neither_requests_nor_absolute_are_errors() {
    let mut engine = engine();
    let content = r#"<a href="[[#top]]"></a><img src="[[data:x]]">"#;
    engine.add_module(descriptor("index.html", content));

    let mut compilation = MemoryCompilation::new();
    engine.rewrite_modules(&mut compilation);

    assert_eq!(compilation.asset_text("index.html"), Some(content));
    let kinds: Vec<_> = compilation
      .errors()
      .iter()
      .map(|err| err.as_rewrite().unwrap().kind.clone())
      .collect();
    assert_eq!(kinds, vec![
      PathErrorKind::Unresolved {
        path: "#top".into()
      },
      PathErrorKind::Unresolved {
        path: "data:x".into()
      },
    ]);
  }

  #[test]
  fn binary_assets_are_not_inlined() {
    let mut engine = engine();
    let content = "<style>[[INLINE(font.woff)]]</style>";
    engine.add_module(descriptor("index.html", content));

    let mut compilation = MemoryCompilation::new().with_asset("font.woff", vec![0xff, 0xfe, 0x00]);
    let reports = engine.rewrite_modules(&mut compilation);

    assert_eq!(compilation.asset_text("index.html"), Some(content));
    assert_eq!(reports[0].inlined, 0);
    assert_eq!(
      compilation.errors()[0].as_rewrite().unwrap().kind,
      PathErrorKind::InlineNotUtf8 {
        url: "font.woff".into()
      }
    );
  }

  #[derive(Clone, Default)]
  struct LogBuffer(Arc<Mutex<Vec<u8>>>);

  impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
      self.0.lock().unwrap().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
      Ok(())
    }
  }

  impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
      self.clone()
    }
  }

  fn rewrite_with_logs(silent: bool) -> String {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
      .with_writer(buffer.clone())
      .with_ansi(false)
      .with_max_level(tracing::Level::INFO)
      .finish();

    tracing::subscriber::with_default(subscriber, || {
      let mut engine = PathRewriter::new(RewriterConfig {
        silent,
        ..RewriterConfig::default()
      })
      .unwrap();
      engine.add_module(descriptor(
        "index.html",
        r#"<img src="[[./a.png]]"><script src="[[https://cdn.example.com/x.js]]"></script><style>[[INLINE(style.css)]]</style>"#,
      ));
      correlate(&mut engine, vec![ModuleDependency::emitted("./a.png", &["a-1.png"])]);
      let mut compilation = MemoryCompilation::new().with_asset("style.css", "b{}");
      engine.rewrite_modules(&mut compilation);
    });

    let bytes = buffer.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
  }

  #[test]
  fn logs_rewrites_and_inlines() {
    let logs = rewrite_with_logs(false);
    assert!(logs.contains(r#"PathRewriter[ index.html ]: "./a.png" -> "/static/a-1.png""#));
    assert!(logs.contains(r#"PathRewriter[ index.html ]: inlined "style.css""#));
    assert!(!logs.contains("cdn.example.com/x.js\" ->"));
    assert_eq!(logs.matches("PathRewriter[").count(), 2);
  }

  #[test]
  fn silent_engines_log_nothing_per_token() {
    let logs = rewrite_with_logs(true);
    assert!(!logs.contains("PathRewriter["));
  }

  #[test]
  fn custom_replacer_uses_capture_groups() {
    let mut engine = PathRewriter::new(RewriterConfig {
      silent: true,
      path_reg_exp: Some(r#"(src|href)="\[\[(.*?)\]\]""#.into()),
      path_match_index: Some(2),
      path_replacer: Some(r#"[1]="[path]""#.into()),
      ..RewriterConfig::default()
    })
    .unwrap();
    let mut module = descriptor("index.html", r#"<link href="[[./a.css]]">"#);
    module.rules = engine.rules().clone();
    engine.add_module(module);
    correlate(&mut engine, vec![ModuleDependency::emitted("./a.css", &["a-1.css"])]);

    let mut compilation = MemoryCompilation::new();
    engine.rewrite_modules(&mut compilation);
    assert_eq!(
      compilation.asset_text("index.html"),
      Some(r#"<link href="/static/a-1.css">"#)
    );
  }
}
