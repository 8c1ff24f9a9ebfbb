pub mod providers;
pub mod streaming;

use tandem_core::config::ModelConfig;
use tandem_core::traits::LlmClient;
use tracing::warn;

pub use providers::openai::OpenAiClient;
pub use streaming::{decode_frames, FrameDecoder, FrameStream};

/// Create an LLM client based on the provider name.
pub fn create_client(config: &ModelConfig) -> Box<dyn LlmClient> {
    match config.provider.as_str() {
        "openai" | "ollama" | "groq" | "openrouter" | "vllm" => {}
        other => warn!(provider = %other, "Unknown provider, assuming an OpenAI-compatible API"),
    }
    Box::new(OpenAiClient::new())
}
