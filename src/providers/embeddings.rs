//! Embeddings provider selection.

use std::fmt;

use crate::config::{ConfigurationError, Credentials};

/// OpenAI embedding models
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiModel {
    Ada002,
    Embedding3Small,
}

impl OpenAiModel {
    pub const ALL: [OpenAiModel; 2] = [OpenAiModel::Ada002, OpenAiModel::Embedding3Small];

    pub fn name(&self) -> &'static str {
        match self {
            OpenAiModel::Ada002 => "text-embedding-ada-002",
            OpenAiModel::Embedding3Small => "text-embedding-3-small",
        }
    }

    pub fn dimension(&self) -> usize {
        1536
    }
}

/// Cohere embedding models
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CohereModel {
    EnglishV3,
    EnglishLightV3,
}

impl CohereModel {
    pub const ALL: [CohereModel; 2] = [CohereModel::EnglishV3, CohereModel::EnglishLightV3];

    pub fn name(&self) -> &'static str {
        match self {
            CohereModel::EnglishV3 => "embed-english-v3.0",
            CohereModel::EnglishLightV3 => "embed-english-light-v3.0",
        }
    }

    pub fn dimension(&self) -> usize {
        1024
    }
}

/// A supported provider together with its model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingsProvider {
    OpenAi(OpenAiModel),
    Cohere(CohereModel),
}

impl EmbeddingsProvider {
    /// Accepted values for `EMBEDDINGS_TYPE`
    pub const TYPES: [&'static str; 2] = ["openai", "cohere"];

    /// Resolve a provider/model name pair against the allow-list
    pub fn parse(provider: &str, model: &str) -> Result<Self, ConfigurationError> {
        let unknown_model = |allowed: Vec<&'static str>| ConfigurationError::UnknownModel {
            provider: provider.to_string(),
            model: model.to_string(),
            allowed,
        };

        match provider {
            "openai" => OpenAiModel::ALL
                .into_iter()
                .find(|m| m.name() == model)
                .map(EmbeddingsProvider::OpenAi)
                .ok_or_else(|| unknown_model(OpenAiModel::ALL.iter().map(|m| m.name()).collect())),
            "cohere" => CohereModel::ALL
                .into_iter()
                .find(|m| m.name() == model)
                .map(EmbeddingsProvider::Cohere)
                .ok_or_else(|| unknown_model(CohereModel::ALL.iter().map(|m| m.name()).collect())),
            other => Err(ConfigurationError::UnknownProvider {
                setting: "EMBEDDINGS_TYPE",
                value: other.to_string(),
                allowed: Self::TYPES.to_vec(),
            }),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            EmbeddingsProvider::OpenAi(_) => "openai",
            EmbeddingsProvider::Cohere(_) => "cohere",
        }
    }

    pub fn model_name(&self) -> &'static str {
        match self {
            EmbeddingsProvider::OpenAi(m) => m.name(),
            EmbeddingsProvider::Cohere(m) => m.name(),
        }
    }

    /// Output vector length of the model
    pub fn dimension(&self) -> usize {
        match self {
            EmbeddingsProvider::OpenAi(m) => m.dimension(),
            EmbeddingsProvider::Cohere(m) => m.dimension(),
        }
    }

    /// Environment variable holding the provider's API key
    pub fn credential_env(&self) -> &'static str {
        match self {
            EmbeddingsProvider::OpenAi(_) => "OPENAI_API_KEY",
            EmbeddingsProvider::Cohere(_) => "COHERE_API_KEY",
        }
    }
}

impl fmt::Display for EmbeddingsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_name(), self.model_name())
    }
}

/// A validated provider with its API key
#[derive(Clone)]
pub struct EmbeddingsSettings {
    provider: EmbeddingsProvider,
    api_key: String,
}

impl EmbeddingsSettings {
    /// Validate provider, model and credential before anything touches the network
    pub fn new(
        provider: &str,
        model: &str,
        credentials: &Credentials,
    ) -> Result<Self, ConfigurationError> {
        let provider = EmbeddingsProvider::parse(provider, model)?;
        let env_name = provider.credential_env();

        let api_key = credentials
            .get(env_name)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigurationError::MissingCredential(env_name.to_string()))?
            .to_string();

        Ok(Self { provider, api_key })
    }

    pub fn provider(&self) -> EmbeddingsProvider {
        self.provider
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for EmbeddingsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingsSettings")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
