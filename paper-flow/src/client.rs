use async_trait::async_trait;

/// A single prompt/response exchange with a text model.
///
/// Both the generation and the scoring side of the workflow go through this
/// trait, so tests can script responses and the serving wrapper can pick
/// different models for each role.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

#[cfg(feature = "rig")]
pub use rig_client::OpenRouterCompletion;

#[cfg(feature = "rig")]
mod rig_client {
    use async_trait::async_trait;
    use rig::agent::Agent;
    use rig::client::CompletionClient;
    use rig::completion::Prompt;
    use rig::providers::openrouter;

    use super::CompletionService;

    /// Completion backend over OpenRouter. The agent is rebuilt per call,
    /// keeping the service stateless across requests.
    pub struct OpenRouterCompletion {
        model: String,
        preamble: String,
    }

    impl OpenRouterCompletion {
        pub fn new(model: impl Into<String>, preamble: impl Into<String>) -> Self {
            Self {
                model: model.into(),
                preamble: preamble.into(),
            }
        }

        fn agent(&self) -> anyhow::Result<Agent<openrouter::CompletionModel>> {
            let api_key = std::env::var("OPENROUTER_API_KEY")
                .map_err(|_| anyhow::anyhow!("OPENROUTER_API_KEY not set"))?;
            let client = openrouter::Client::new(&api_key);
            Ok(client.agent(&self.model).preamble(&self.preamble).build())
        }
    }

    #[async_trait]
    impl CompletionService for OpenRouterCompletion {
        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            let agent = self.agent()?;
            let response = agent.prompt(prompt).await?;
            Ok(response)
        }
    }
}
