//! Per-cycle store of the resources handled by the loader.

use std::collections::HashMap;

use crate::models::ModuleData;

/// Modules registered during the current build cycle, keyed by build request.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
  modules: Vec<ModuleData>,
  by_request: HashMap<String, usize>,
}

impl ModuleRegistry {
  /// Create an empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Store a module. Re-registering a request replaces the earlier entry in place.
  pub fn register(&mut self, module: ModuleData) {
    match self.by_request.get(&module.request) {
      Some(&index) => self.modules[index] = module,
      None => {
        self.by_request.insert(module.request.clone(), self.modules.len());
        self.modules.push(module);
      }
    }
  }

  /// Module registered for `request`.
  pub fn get(&self, request: &str) -> Option<&ModuleData> {
    self.by_request.get(request).map(|&index| &self.modules[index])
  }

  /// Mutable access to the module registered for `request`.
  pub fn get_mut(&mut self, request: &str) -> Option<&mut ModuleData> {
    let index = *self.by_request.get(request)?;
    self.modules.get_mut(index)
  }

  /// Modules in registration order.
  pub fn iter(&self) -> impl Iterator<Item = &ModuleData> {
    self.modules.iter()
  }

  /// Number of registered modules.
  pub fn len(&self) -> usize {
    self.modules.len()
  }

  /// Whether nothing is registered.
  pub fn is_empty(&self) -> bool {
    self.modules.is_empty()
  }

  /// Move every module out in registration order, leaving the registry empty.
  pub fn take_all(&mut self) -> Vec<ModuleData> {
    self.by_request.clear();
    std::mem::take(&mut self.modules)
  }

  /// Drop every entry. Called once per build cycle after emission.
  pub fn clear(&mut self) {
    self.modules.clear();
    self.by_request.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::tests::descriptor;

  fn module(request: &str, content: &str) -> ModuleData {
    ModuleData::new(descriptor(request, content), Vec::new())
  }

  #[test]
  fn looks_up_modules_by_request() {
    let mut registry = ModuleRegistry::new();
    registry.register(module("a.html", "a"));
    registry.register(module("b.html", "b"));

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.get("b.html").unwrap().content, "b");
    assert!(registry.get("c.html").is_none());

    registry.get_mut("a.html").unwrap().content = "changed".into();
    assert_eq!(registry.get("a.html").unwrap().content, "changed");
  }

  #[test]
  fn keeps_registration_order_and_replaces_duplicates() {
    let mut registry = ModuleRegistry::new();
    registry.register(module("a.html", "first"));
    registry.register(module("b.html", "b"));
    registry.register(module("a.html", "second"));

    let order: Vec<&str> = registry.iter().map(|m| m.request.as_str()).collect();
    assert_eq!(order, vec!["a.html", "b.html"]);
    assert_eq!(registry.get("a.html").unwrap().content, "second");
  }

  #[test]
  fn take_all_and_clear_empty_the_registry() {
    let mut registry = ModuleRegistry::new();
    registry.register(module("a.html", "a"));
    let taken = registry.take_all();
    assert_eq!(taken.len(), 1);
    assert!(registry.is_empty());
    assert!(registry.get("a.html").is_none());

    registry.register(module("b.html", "b"));
    registry.clear();
    assert!(registry.is_empty());
  }
}
