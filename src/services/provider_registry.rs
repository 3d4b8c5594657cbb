use std::sync::Arc;

use serde::Serialize;

use crate::{
    config::Config,
    errors::{AppError, AppResult},
    services::llm_client::{LlmClient, OpenAiCompatibleClient},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub chat_model: String,
    pub is_default: bool,
}

/// Named LLM providers; the first registered one is the default.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn LlmClient>>,
}

impl ProviderRegistry {
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let providers = config
            .providers
            .iter()
            .map(|p| {
                OpenAiCompatibleClient::new(p, config.llm_timeout_secs)
                    .map(|c| Arc::new(c) as Arc<dyn LlmClient>)
            })
            .collect::<AppResult<Vec<_>>>()?;

        log::info!("Registered {} AI provider(s)", providers.len());
        Ok(Self { providers })
    }

    pub fn from_clients(providers: Vec<Arc<dyn LlmClient>>) -> Self {
        Self { providers }
    }

    /// An explicitly requested provider must exist; a stale preference
    /// falls back to the default.
    pub fn resolve(
        &self,
        requested: Option<&str>,
        preferred: Option<&str>,
    ) -> AppResult<Arc<dyn LlmClient>> {
        if let Some(name) = requested.map(str::trim).filter(|n| !n.is_empty()) {
            return self
                .find(name)
                .ok_or_else(|| AppError::NotFound(format!("AI provider '{}' is not configured", name)));
        }

        if let Some(name) = preferred.map(str::trim).filter(|n| !n.is_empty()) {
            if let Some(provider) = self.find(name) {
                return Ok(provider);
            }
            log::warn!("Preferred provider '{}' is not configured, using default", name);
        }

        self.providers
            .first()
            .cloned()
            .ok_or_else(|| AppError::ProviderError("No AI providers configured".to_string()))
    }

    pub fn list(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .enumerate()
            .map(|(i, p)| ProviderInfo {
                name: p.provider_name(),
                chat_model: p.default_model(),
                is_default: i == 0,
            })
            .collect()
    }

    fn find(&self, name: &str) -> Option<Arc<dyn LlmClient>> {
        self.providers
            .iter()
            .find(|p| p.provider_name().eq_ignore_ascii_case(name))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm_client::MockLlmClient;

    fn named(name: &'static str, model: &'static str) -> Arc<dyn LlmClient> {
        let mut mock = MockLlmClient::new();
        mock.expect_provider_name().return_const(name.to_string());
        mock.expect_default_model().return_const(model.to_string());
        Arc::new(mock)
    }

    fn registry() -> ProviderRegistry {
        ProviderRegistry::from_clients(vec![
            named("openai", "gpt-4o-mini"),
            named("groq", "llama-3.1-70b"),
        ])
    }

    #[test]
    fn resolves_requested_provider_case_insensitively() {
        let provider = registry().resolve(Some("GROQ"), None).unwrap();
        assert_eq!(provider.provider_name(), "groq");
    }

    #[test]
    fn unknown_requested_provider_is_an_error() {
        let result = registry().resolve(Some("anthropic"), None);
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn stale_preference_falls_back_to_default() {
        let provider = registry().resolve(None, Some("retired")).unwrap();
        assert_eq!(provider.provider_name(), "openai");

        let provider = registry().resolve(None, Some("groq")).unwrap();
        assert_eq!(provider.provider_name(), "groq");
    }

    #[test]
    fn empty_registry_reports_provider_error() {
        let registry = ProviderRegistry::from_clients(vec![]);
        assert!(matches!(
            registry.resolve(None, None),
            Err(AppError::ProviderError(_))
        ));
    }

    #[test]
    fn list_marks_first_provider_as_default() {
        let listed = registry().list();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].is_default);
        assert!(!listed[1].is_default);
        assert_eq!(listed[1].chat_model, "llama-3.1-70b");
    }

    #[test]
    fn from_config_builds_one_client_per_provider() {
        let config = Config::test_config();
        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(registry.list()[0].name, "openai");
    }
}
