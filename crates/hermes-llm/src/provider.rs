use std::pin::Pin;

use futures::Stream;
use hermes_core::Result;
use hermes_history::ChatMessage;

/// A single streamed piece of the collaborator's reply. Narrowed to text
/// only — the research engine never hands the model tool-call access; every
/// action it can take goes through the command language embedded in its
/// text, not a structured tool-call channel.
#[derive(Debug, Clone)]
pub enum StreamDelta {
    Text(String),
    Done,
}

pub type LlmStream = Pin<Box<dyn Stream<Item = Result<StreamDelta>> + Send>>;

/// One collaborator backend. `send` takes the rendered prompt for this turn
/// plus the node's accumulated transcript and returns a stream of text
/// deltas; the engine concatenates them into the full reply before handing
/// it to the command parser.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, prompt: &str, transcript: &[ChatMessage]) -> Result<LlmStream>;
}
