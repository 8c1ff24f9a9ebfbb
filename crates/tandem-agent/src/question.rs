use std::sync::Arc;

use futures::future::BoxFuture;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tandem_core::config::ModelConfig;
use tandem_core::error::{Result, TandemError};
use tandem_core::traits::{LlmClient, QuestionGenerator};
use tandem_core::types::{ChatMessage, Message, StreamDelta};
use tandem_platform::extract::extract_last_assistant_text;

const SYSTEM_PROMPT: &str = "You are a critical thinking assistant that analyzes mathematical results.
Your role is to:
1. Review the mathematical result provided
2. Generate ONE specific follow-up mathematical question based on the result
3. Focus on expanding or exploring the result further through mathematical operations
4. Create questions that can be answered using mathematical calculations

Generate only mathematical questions that can be computed, not analytical or explanatory questions.
The question must be self-contained. Use only the numbers that appear in the result you are given;
never refer to numbers from earlier questions you have not been shown.";

/// State flowing through the question node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionState {
    pub first_agent_result: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl QuestionState {
    /// A state that carries nothing but the math result.
    pub fn fresh(first_agent_result: impl Into<String>) -> Self {
        Self {
            first_agent_result: first_agent_result.into(),
            messages: Vec::new(),
        }
    }
}

/// Local agent that turns a math result into one follow-up question.
pub struct QuestionAgent {
    llm: Arc<dyn LlmClient>,
    config: ModelConfig,
}

impl QuestionAgent {
    pub fn new(llm: Arc<dyn LlmClient>, config: ModelConfig) -> Self {
        Self { llm, config }
    }

    /// Run the single question node: prompt the model with the result and
    /// append its reply as an `ai` turn.
    pub async fn invoke(&self, mut state: QuestionState) -> Result<QuestionState> {
        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(analysis_prompt(&state.first_agent_result)),
        ];

        let mut stream = self
            .llm
            .chat_stream(&self.config, messages)
            .await
            .map_err(|e| TandemError::Reasoning(e.to_string()))?;

        let mut reply = String::new();
        while let Some(delta) = stream.next().await {
            match delta {
                Ok(StreamDelta::TextDelta(text)) => reply.push_str(&text),
                Ok(StreamDelta::Usage {
                    input_tokens,
                    output_tokens,
                }) => debug!(input_tokens, output_tokens, "Question model usage"),
                Ok(StreamDelta::Stop(reason)) => debug!(?reason, "Question model stopped"),
                Err(e) => return Err(TandemError::Reasoning(e.to_string())),
            }
        }

        state.messages.push(Message::ai(reply.trim()));
        Ok(state)
    }

    /// Generate a follow-up question from `math_result` alone.
    pub async fn generate_question(&self, math_result: &str) -> Result<String> {
        let state = self.invoke(QuestionState::fresh(math_result)).await?;
        let question = extract_last_assistant_text(&state.messages);

        if question.trim().is_empty() {
            warn!("Question model returned an empty reply");
            return Err(TandemError::Reasoning(
                "No question generated by question agent".to_string(),
            ));
        }
        Ok(question)
    }
}

impl QuestionGenerator for QuestionAgent {
    fn generate(&self, math_result: String) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move { self.generate_question(&math_result).await })
    }
}

fn analysis_prompt(math_result: &str) -> String {
    format!(
        r#"Math Result: {}

Please analyze this mathematical result and generate ONE specific follow-up mathematical question that can be asked to expand or explore this result further.

Output format: Return ONLY the question itself, without any additional text, explanation, or formatting.

Example: "What would be the result if we divided this by 2?""#,
        math_result
    )
}
