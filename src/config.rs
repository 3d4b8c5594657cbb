use std::env;
use secrecy::SecretString;

const DEFAULT_JWT_SECRET: &str = "dev_secret_key_change_in_production";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: String,
    pub api_key: SecretString,
    pub chat_model: String,
    pub image_model: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub jwt_secret: SecretString,
    pub jwt_expiration_hours: i64,
    pub providers: Vec<ProviderConfig>,
    pub llm_timeout_secs: u64,
    pub generation_max_attempts: u32,
    pub cors_allowed_origin: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            mongo_conn_string: env::var("MONGO_CONN_STRING")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME")
                .unwrap_or_else(|_| "studyforge-local".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: env::var("WEB_SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            jwt_secret: SecretString::from(
                env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string()),
            ),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or(24),
            providers: providers_from_env(),
            llm_timeout_secs: env::var("LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120),
            generation_max_attempts: env::var("GENERATION_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(3),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
        }
    }

    /// Validate that production-critical configuration is set
    /// Panics if required secrets are using default values
    pub fn validate_for_production(&self) {
        use secrecy::ExposeSecret;

        let jwt_secret = self.jwt_secret.expose_secret();

        if jwt_secret == DEFAULT_JWT_SECRET {
            panic!(
                "FATAL: JWT_SECRET is using default value! Set JWT_SECRET environment variable to a secure random string."
            );
        }

        if jwt_secret.len() < 32 {
            panic!(
                "FATAL: JWT_SECRET is too short ({}). Must be at least 32 characters for security.",
                jwt_secret.len()
            );
        }

        if self.providers.is_empty() {
            panic!("FATAL: No AI providers configured! Set AI_PROVIDERS, e.g. AI_PROVIDERS=openai.");
        }

        for provider in &self.providers {
            if provider.api_key.expose_secret().is_empty() {
                panic!(
                    "FATAL: Provider '{}' has no API key! Set {}_API_KEY.",
                    provider.name,
                    provider.name.to_uppercase()
                );
            }
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "studyforge-test".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            jwt_secret: SecretString::from("test_jwt_secret_key".to_string()),
            jwt_expiration_hours: 1,
            providers: vec![ProviderConfig {
                name: "openai".to_string(),
                base_url: "http://localhost:9999/v1".to_string(),
                api_key: SecretString::from("sk-test".to_string()),
                chat_model: "gpt-4o-mini".to_string(),
                image_model: "dall-e-3".to_string(),
            }],
            llm_timeout_secs: 5,
            generation_max_attempts: 3,
            cors_allowed_origin: "http://localhost:5173".to_string(),
        }
    }
}

/// Reads `AI_PROVIDERS=openai,groq` and, per provider, `<NAME>_BASE_URL`,
/// `<NAME>_API_KEY`, `<NAME>_MODEL` and `<NAME>_IMAGE_MODEL`.
fn providers_from_env() -> Vec<ProviderConfig> {
    let names = env::var("AI_PROVIDERS").unwrap_or_else(|_| "openai".to_string());

    parse_provider_names(&names)
        .into_iter()
        .map(|name| {
            let prefix = name.to_uppercase().replace('-', "_");
            let var = |suffix: &str| env::var(format!("{}_{}", prefix, suffix)).ok();

            ProviderConfig {
                base_url: var("BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                api_key: SecretString::from(var("API_KEY").unwrap_or_default()),
                chat_model: var("MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
                image_model: var("IMAGE_MODEL").unwrap_or_else(|| "dall-e-3".to_string()),
                name,
            }
        })
        .collect()
}

fn parse_provider_names(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(|n| n.trim().to_lowercase()) {
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}
