use serde::{Deserialize, Serialize};

/// Plain configuration naming the completion provider behind an actor.
///
/// The engine never interprets these fields beyond `provider`, which selects
/// a factory in the [`ProviderRegistry`](crate::ProviderRegistry). The rest
/// is handed to the factory untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

impl ProviderConfig {
    /// Config for the given provider with default options.
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: None,
            system_prompt: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    /// Config for the built-in echo provider.
    pub fn echo() -> Self {
        Self::new("echo")
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}
