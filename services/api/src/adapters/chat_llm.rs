//! services/api/src/adapters/chat_llm.rs
//!
//! This module contains the adapter for the text-generation collaborator.
//! It implements the `TextGenerationService` port using an OpenAI-compatible
//! chat model: the port only needs "string in, string-or-failure out", so
//! nothing vendor-specific leaks past this file.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use habitchat_core::ports::{PortError, PortResult, TextGenerationService};

const SYSTEM_PROMPT: &str = "You are a friendly assistant inside a personal habit-tracking app. \
Answer the user's question directly and concisely, in a conversational tone.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TextGenerationService` using an
/// OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiChatAdapter {
    /// Creates a new `OpenAiChatAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String, max_tokens: u32, temperature: f32) -> Self {
        Self {
            client,
            model,
            max_tokens,
            temperature,
        }
    }
}

//=========================================================================================
// `TextGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextGenerationService for OpenAiChatAdapter {
    async fn generate(&self, prompt: &str) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_completion_tokens(self.max_tokens)
            .temperature(self.temperature)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error, which respects the orphan
        // rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Collaborator(e.to_string()))?;

        // Extract the text content from the first choice in the response.
        if let Some(choice) = response.choices.into_iter().next() {
            if let Some(content) = choice.message.content {
                Ok(content)
            } else {
                Err(PortError::Collaborator(
                    "chat model response contained no text content".to_string(),
                ))
            }
        } else {
            Err(PortError::Collaborator(
                "chat model returned no choices in its response".to_string(),
            ))
        }
    }
}

//=========================================================================================
// Disabled Fallback
//=========================================================================================

/// Stands in when no generation API key is configured. Every call reports
/// the capability as unavailable instead of crashing the interaction.
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerationService for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> PortResult<String> {
        Err(PortError::Unavailable)
    }
}
