use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::config::ModelConfig;
use crate::error::Result;
use crate::types::*;

/// Streaming chat-completion client.
pub trait LlmClient: Send + Sync + 'static {
    /// Send a chat request and receive a stream of deltas.
    fn chat_stream(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>>;
}

/// Remote math-solving agent.
pub trait MathSolver: Send + Sync + 'static {
    /// Run `query` on `thread_id`, or on a freshly created thread when `None`.
    fn solve(&self, query: String, thread_id: Option<ThreadId>) -> BoxFuture<'_, Result<Solution>>;
}

/// Follow-up question generator.
///
/// Implementations must only see `math_result`, never the conversation that
/// produced it.
pub trait QuestionGenerator: Send + Sync + 'static {
    fn generate(&self, math_result: String) -> BoxFuture<'_, Result<String>>;
}
