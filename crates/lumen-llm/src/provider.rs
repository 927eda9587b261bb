//! LLM provider trait and registry.
//!
//! Defines the interface that all LLM providers must implement.

use async_trait::async_trait;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

use crate::error::{LlmError, LlmResult};
use crate::types::{LlmToolDefinition, Message, StreamEvent};

/// Type alias for boxed streams.
pub type StreamBox = Pin<Box<dyn Stream<Item = LlmResult<StreamEvent>> + Send>>;

/// LLM provider trait.
///
/// Implementors provide access to language models with streaming support.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Get the model being used.
    fn model(&self) -> &str;

    /// Stream a completion.
    ///
    /// `tools` may be empty, in which case the provider must not offer
    /// structured tool calling. `max_tokens` bounds the generated output.
    async fn stream(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
        max_tokens: usize,
    ) -> LlmResult<StreamBox>;
}

/// Named set of providers with a default.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    default: Option<String>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding a single provider, which becomes the default.
    #[must_use]
    pub fn single(provider: Arc<dyn LlmProvider>) -> Self {
        let mut registry = Self::new();
        registry.register(provider);
        registry
    }

    /// Register a provider under its own name.
    ///
    /// The first registered provider becomes the default.
    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        let name = provider.name().to_string();
        debug!(provider = %name, model = %provider.model(), "Registering LLM provider");
        if self.default.is_none() {
            self.default = Some(name.clone());
        }
        self.providers.insert(name, provider);
    }

    /// Set the default provider name.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ProviderNotFound`] if no provider has that name.
    pub fn set_default(&mut self, name: &str) -> LlmResult<()> {
        if !self.providers.contains_key(name) {
            return Err(LlmError::ProviderNotFound {
                name: name.to_string(),
            });
        }
        self.default = Some(name.to_string());
        Ok(())
    }

    /// Resolve a provider by name, or the default when `name` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ProviderNotFound`] if the name is unknown or the
    /// registry is empty.
    pub fn resolve(&self, name: Option<&str>) -> LlmResult<Arc<dyn LlmProvider>> {
        let key = name.or(self.default.as_deref()).unwrap_or("");
        self.providers
            .get(key)
            .cloned()
            .ok_or_else(|| LlmError::ProviderNotFound {
                name: key.to_string(),
            })
    }

    /// Names of all registered providers.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .field("default", &self.default)
            .finish()
    }
}
