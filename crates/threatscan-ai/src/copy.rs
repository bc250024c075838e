//! Advertisement copy generation for mental-health outreach.

use tracing::info;

use crate::client::{ChatError, LanguageModel};
use crate::prompts::AD_COPY_PROMPT;

/// Generate ad copy with `text` as the topic. Returns the model's reply verbatim.
pub async fn generate_ad_copy(model: &dyn LanguageModel, text: &str) -> Result<String, ChatError> {
    let copy = model.complete(AD_COPY_PROMPT, text).await?;
    info!(chars = copy.len(), "ad copy generated");
    Ok(copy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl LanguageModel for Echo {
        async fn complete(&self, system: &str, user: &str) -> Result<String, ChatError> {
            Ok(format!("{}|{user}", system.len()))
        }
    }

    struct Down;

    #[async_trait]
    impl LanguageModel for Down {
        async fn complete(&self, _: &str, _: &str) -> Result<String, ChatError> {
            Err(ChatError::EmptyReply)
        }
    }

    #[tokio::test]
    async fn uses_ad_copy_prompt() {
        let copy = generate_ad_copy(&Echo, "job loss").await.unwrap();
        assert_eq!(copy, format!("{}|job loss", AD_COPY_PROMPT.len()));
    }

    #[tokio::test]
    async fn propagates_model_errors() {
        assert!(generate_ad_copy(&Down, "x").await.is_err());
    }
}
