//! Skill registry.

use std::collections::HashMap;
use std::sync::Arc;

use lumen_llm::LlmToolDefinition;
use tracing::warn;

use crate::skill::Skill;

/// Registry of skills for lookup and LLM definition export.
///
/// Registration happens at startup; runs only read it.
#[derive(Clone, Default)]
pub struct SkillRegistry {
    skills: HashMap<String, Arc<dyn Skill>>,
}

impl SkillRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a skill, replacing any skill with the same name.
    pub fn register(&mut self, skill: Arc<dyn Skill>) {
        let name = skill.name().to_string();
        if self.skills.insert(name.clone(), skill).is_some() {
            warn!(skill = %name, "Replacing already registered skill");
        }
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with_skill(mut self, skill: Arc<dyn Skill>) -> Self {
        self.register(skill);
        self
    }

    /// Get a skill by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Skill>> {
        self.skills.get(name).cloned()
    }

    /// Whether a skill is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.skills.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.skills.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Export all skill definitions for the LLM, sorted by name.
    #[must_use]
    pub fn definitions(&self) -> Vec<LlmToolDefinition> {
        self.names()
            .into_iter()
            .filter_map(|name| self.skills.get(name))
            .map(|s| {
                LlmToolDefinition::new(s.name())
                    .with_description(s.description())
                    .with_schema(s.input_schema())
            })
            .collect()
    }

    /// Number of registered skills.
    #[must_use]
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Whether no skills are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

impl std::fmt::Debug for SkillRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillRegistry")
            .field("skills", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SkillResult;
    use crate::skill::{SkillContext, SkillOutput};
    use serde_json::Value;

    struct Named(&'static str);

    #[async_trait::async_trait]
    impl Skill for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test skill"
        }

        async fn execute(&self, _args: Value, _ctx: &SkillContext) -> SkillResult<SkillOutput> {
            Ok(SkillOutput::text(self.0))
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = SkillRegistry::new()
            .with_skill(Arc::new(Named("speak")))
            .with_skill(Arc::new(Named("get_time")));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("speak"));
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.names(), vec!["get_time", "speak"]);
    }

    #[test]
    fn test_definitions_are_sorted() {
        let registry = SkillRegistry::new()
            .with_skill(Arc::new(Named("b")))
            .with_skill(Arc::new(Named("a")));
        let defs = registry.definitions();
        assert_eq!(defs[0].name, "a");
        assert_eq!(defs[1].name, "b");
        assert_eq!(defs[0].description.as_deref(), Some("test skill"));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = SkillRegistry::new();
        registry.register(Arc::new(Named("speak")));
        registry.register(Arc::new(Named("speak")));
        assert_eq!(registry.len(), 1);
    }
}
