use tracing::debug;

use super::PathRewriter;
use crate::error::{PathErrorKind, PathRewriteError};
use crate::host::CompiledModule;
use crate::models::{ModuleData, ModuleState};

impl PathRewriter {
  /// After-compile hook: learn which file each recorded dependency emitted.
  ///
  /// Modules the engine did not record are ignored. Returns the number of
  /// recorded modules whose dependencies are now fully correlated.
  pub fn correlate(&mut self, modules: &[CompiledModule]) -> usize {
    let mut correlated = 0;
    for compiled in modules {
      let Some(module) = self.registry.get_mut(&compiled.request) else {
        continue;
      };
      correlate_module(module, compiled);
      if module.state == ModuleState::Correlated {
        correlated += 1;
      }
    }
    debug!(correlated, "correlated dependencies");
    correlated
  }
}

fn correlate_module(module: &mut ModuleData, compiled: &CompiledModule) {
  for dependency in &compiled.dependencies {
    if dependency.request.is_empty() {
      continue;
    }
    let Some(assets) = &dependency.emitted_assets else {
      continue;
    };

    let outcome = match assets.as_slice() {
      [single] => Ok(single.clone()),
      _ => {
        let Some(asset) = module.assets_by_request(&dependency.request).next() else {
          continue;
        };
        Err(PathRewriteError::new(
          module.rel_path.clone(),
          PathErrorKind::AmbiguousAsset {
            path: asset.path.clone(),
            assets: assets.clone(),
          },
        ))
      }
    };
    module.settle(&dependency.request, outcome);
  }
}
