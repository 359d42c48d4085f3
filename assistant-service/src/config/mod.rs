pub mod credentials;

use crate::prompts::templates::DEFAULT_PERSONA;
use credentials::{default_local_config_path, ApiKeySource};
use service_core::config as core_config;
use std::env;

/// Remote model every flow runs against.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Model client settings, fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub api_key: ApiKeySource,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub common: core_config::Config,
    /// Persona instructions prepended to every chat query.
    pub persona: String,
    pub model: ModelSettings,
}

impl AssistantConfig {
    /// Finish loading once the base configuration is known.
    pub async fn from_common(common: core_config::Config) -> Self {
        let persona = env::var("ASSISTANT_PERSONA")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PERSONA.to_string());

        let local_config = default_local_config_path();
        let api_key = ApiKeySource::resolve(local_config.as_deref(), |name| env::var(name).ok()).await;

        tracing::info!(
            model = DEFAULT_MODEL,
            credentials = %api_key.describe(),
            "Resolved model client settings"
        );

        AssistantConfig {
            common,
            persona,
            model: ModelSettings {
                api_key,
                model: DEFAULT_MODEL.to_string(),
            },
        }
    }
}
