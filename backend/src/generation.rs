use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestAssistantMessageContent,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use shared::models::{AppSettings, ChatTurn, Contact, ROLE_ASSISTANT, ROLE_USER};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Missing API key")]
    MissingApiKey,
    #[error("OpenAI error: {0}")]
    OpenAi(#[from] OpenAIError),
    #[error("Model returned no content")]
    EmptyResponse,
}

/// Remote text generation.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str, history: &[ChatTurn]) -> Result<String, GenerationError>;
}

pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    settings: AppSettings,
}

impl OpenAiGenerator {
    pub fn from_settings(settings: AppSettings) -> Result<Self, GenerationError> {
        if settings.api_key.is_empty() {
            return Err(GenerationError::MissingApiKey);
        }
        let config = OpenAIConfig::new()
            .with_api_key(settings.api_key.clone())
            .with_api_base(settings.api_base.clone());
        Ok(Self {
            client: Client::with_config(config),
            settings,
        })
    }
}

/// System prompt first, then the history. Turns with unknown roles are dropped.
fn build_conversation(
    prompt: &str,
    history: &[ChatTurn],
) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
    let mut conversation = Vec::with_capacity(history.len() + 1);
    conversation.push(ChatCompletionRequestMessage::System(
        ChatCompletionRequestSystemMessageArgs::default()
            .content(prompt)
            .build()?,
    ));

    for turn in history {
        let message = if turn.role == ROLE_USER {
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(turn.content.clone())
                    .build()?,
            )
        } else if turn.role == ROLE_ASSISTANT {
            ChatCompletionRequestMessage::Assistant(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(ChatCompletionRequestAssistantMessageContent::Text(
                        turn.content.clone(),
                    ))
                    .build()?,
            )
        } else {
            debug!("Dropping chat turn with role {:?}", turn.role);
            continue;
        };
        conversation.push(message);
    }

    Ok(conversation)
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, prompt: &str, history: &[ChatTurn]) -> Result<String, GenerationError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.settings.model.clone())
            .messages(build_conversation(prompt, history)?)
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_tokens)
            .build()?;

        let response = self.client.chat().create(request).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }
}

/// Persona prompt for chatting as `contact`. The model is asked for a JSON
/// array of short chat messages, see [`parse_reply`].
pub fn build_system_prompt(contact: &Contact) -> String {
    let mut prompt = format!("You are {}, chatting with the user on their phone.", contact.name);
    if !contact.description.is_empty() {
        prompt.push_str(&format!("\nPersona: {}", contact.description));
    }
    prompt.push_str(
        "\nStay in character. Reply with a JSON array of one to three short chat messages, \
         for example [\"hey!\", \"what's up?\"].",
    );
    prompt
}

/// Best-effort JSON extraction from model output: the whole text, then a
/// fenced code block, then the outermost object or array.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Option<T> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    if let Some(block) = fenced_block(trimmed)
        && let Ok(value) = serde_json::from_str(block)
    {
        return Some(value);
    }
    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close))
            && start < end
            && let Ok(value) = serde_json::from_str(&trimmed[start..=end])
        {
            return Some(value);
        }
    }
    None
}

fn fenced_block(text: &str) -> Option<&str> {
    let rest = &text[text.find("```")? + 3..];
    // Skip the language tag line
    let body = &rest[rest.find('\n')? + 1..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Chat bubbles from a raw model reply. Falls back to the whole text as a
/// single message when no usable array can be found.
pub fn parse_reply(text: &str) -> Vec<String> {
    let messages: Vec<String> = extract_json::<Vec<String>>(text)
        .unwrap_or_default()
        .into_iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    if messages.is_empty() {
        vec![text.trim().to_string()]
    } else {
        messages
    }
}
