use async_trait::async_trait;

/// A text completion backend.
///
/// The resolver only ever asks for one completion per request and treats any
/// error as "model unavailable".
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Stub model: always fails, so every request goes to the fallback matcher.
pub struct NoopModel;

#[async_trait]
impl LanguageModel for NoopModel {
    async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("language model not configured"))
    }
}

/// Returns the same completion for every prompt.
pub struct StaticModel {
    completion: String,
}

impl StaticModel {
    pub fn new(completion: impl Into<String>) -> Self {
        Self {
            completion: completion.into(),
        }
    }
}

#[async_trait]
impl LanguageModel for StaticModel {
    async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        Ok(self.completion.clone())
    }
}
