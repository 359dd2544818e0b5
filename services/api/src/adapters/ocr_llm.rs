//! services/api/src/adapters/ocr_llm.rs
//!
//! This module contains the adapter for image text recognition.
//! It implements the `OcrService` port by sending the image to a vision-capable model.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrlArgs,
    },
    Client,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use lets_prep_core::ports::{OcrService, PortError, PortResult};
use tracing::debug;

const OCR_INSTRUCTIONS: &str = "You transcribe study material from photos and scans. Return ONLY the text visible in the image, preserving paragraph breaks. Do not summarise, translate or comment. If the image contains no readable text, respond with EXACTLY: NO_TEXT";

/// Marker the model answers with when an image has nothing to transcribe.
const NO_TEXT_MARKER: &str = "NO_TEXT";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `OcrService` using an OpenAI-compatible vision model.
#[derive(Clone)]
pub struct OpenAiOcrAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiOcrAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Normalises the model's reply; the no-text marker becomes an empty transcription.
fn transcription_from_reply(reply: &str) -> String {
    let trimmed = reply.trim();
    if trimmed == NO_TEXT_MARKER {
        String::new()
    } else {
        trimmed.to_string()
    }
}

//=========================================================================================
// `OcrService` Trait Implementation
//=========================================================================================

#[async_trait]
impl OcrService for OpenAiOcrAdapter {
    async fn recognize_text(&self, png_bytes: &[u8]) -> PortResult<String> {
        let data_url = format!("data:image/png;base64,{}", STANDARD.encode(png_bytes));

        let parts: Vec<ChatCompletionRequestUserMessageContentPart> = vec![
            ChatCompletionRequestMessageContentPartTextArgs::default()
                .text("Transcribe the text in this image.")
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestMessageContentPartImageArgs::default()
                .image_url(
                    ImageUrlArgs::default()
                        .url(data_url)
                        .detail(ImageDetail::High)
                        .build()
                        .map_err(|e| PortError::Unexpected(e.to_string()))?,
                )
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(OCR_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(parts)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let reply = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("OCR model returned no text content.".to_string())
            })?;

        let text = transcription_from_reply(&reply);
        debug!("OCR transcribed {} characters", text.chars().count());
        Ok(text)
    }
}
