use std::sync::Mutex;

use futures::stream;
use hermes_core::{Error, Result};
use hermes_history::ChatMessage;

use crate::provider::{LlmProvider, LlmStream, StreamDelta};

/// Replays a fixed sequence of canned replies, one per call to `send`,
/// regardless of the prompt. Used by end-to-end scenario tests that need a
/// deterministic collaborator instead of a live API.
pub struct MockProvider {
    replies: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(replies: Vec<String>) -> Self {
        Self { replies: Mutex::new(replies) }
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, _prompt: &str, _transcript: &[ChatMessage]) -> Result<LlmStream> {
        let reply = {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Err(Error::llm("mock provider ran out of scripted replies"));
            }
            replies.remove(0)
        };
        let items = vec![Ok(StreamDelta::Text(reply)), Ok(StreamDelta::Done)];
        Ok(Box::pin(stream::iter(items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_are_consumed_in_order() {
        let provider = MockProvider::new(vec!["first".to_string(), "second".to_string()]);
        let mut stream = provider.send("prompt", &[]).await.unwrap();
        let mut collected = String::new();
        use futures::StreamExt;
        while let Some(item) = stream.next().await {
            if let StreamDelta::Text(t) = item.unwrap() {
                collected.push_str(&t);
            }
        }
        assert_eq!(collected, "first");

        let mut stream2 = provider.send("prompt", &[]).await.unwrap();
        let mut collected2 = String::new();
        while let Some(item) = stream2.next().await {
            if let StreamDelta::Text(t) = item.unwrap() {
                collected2.push_str(&t);
            }
        }
        assert_eq!(collected2, "second");
    }

    #[tokio::test]
    async fn exhausted_mock_returns_error() {
        let provider = MockProvider::new(vec![]);
        let result = provider.send("prompt", &[]).await;
        assert!(result.is_err());
    }
}
