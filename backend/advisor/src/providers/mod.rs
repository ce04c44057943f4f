pub mod fixed;
pub mod ollama;
pub mod openrouter;

use std::collections::HashMap;
use std::sync::Arc;

use medsnap_core::LlmProvider;

/// Registry of LLM providers, looked up by name.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider by name.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get providers matching the given names (in order).
    /// Unknown names are silently skipped.
    pub fn get_providers(&self, names: &[String]) -> Vec<Arc<dyn LlmProvider>> {
        names
            .iter()
            .filter_map(|name| self.providers.get(name).cloned())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Get all registered provider names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixed::FixedProvider;

    #[test]
    fn test_registry_get_providers_keeps_order() {
        let mut registry = ProviderRegistry::new();
        registry.register("a", Arc::new(FixedProvider::new("a")));
        registry.register("b", Arc::new(FixedProvider::new("b")));

        let providers =
            registry.get_providers(&["b".into(), "missing".into(), "a".into()]);
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_registry_list_sorted() {
        let mut registry = ProviderRegistry::new();
        registry.register("ollama", Arc::new(FixedProvider::new("ollama")));
        registry.register("fixed", Arc::new(FixedProvider::new("fixed")));
        assert_eq!(registry.list(), vec!["fixed".to_string(), "ollama".to_string()]);
        assert!(registry.contains("ollama"));
        assert!(!registry.contains("openrouter"));
    }
}
