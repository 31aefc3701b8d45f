use crate::config::Config;
use crate::extract::GeminiConfig;

pub struct PipelineConfig {
    pub gemini: GeminiConfig,
    /// `apiKey` option, used when no key has been saved yet.
    pub default_api_key: Option<String>,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            gemini: GeminiConfig::from_config(config),
            default_api_key: config.api_key.clone(),
        }
    }
}
