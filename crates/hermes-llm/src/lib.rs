pub mod anthropic;
pub mod mock;
pub mod provider;

pub use anthropic::AnthropicProvider;
pub use mock::MockProvider;
pub use provider::{LlmProvider, LlmStream, StreamDelta};
