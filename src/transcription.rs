use crate::audio::extension_for;
use crate::session::Artifact;
use anyhow::{Context, Result};
use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;

/// Turns a finished recording into plain text.
#[async_trait]
pub trait Transcriber {
    async fn transcribe(&self, artifact: &Artifact) -> Result<String>;
}

/// OpenAI-compatible speech-to-text endpoint.
pub struct OpenAiTranscriber {
    client: Client<OpenAIConfig>,
    model: String,
    prompt: Option<String>,
    language: Option<String>,
}

impl OpenAiTranscriber {
    pub fn new(
        api_url: &str,
        api_key: &str,
        model: String,
        prompt: Option<String>,
        language: Option<String>,
    ) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_base(api_url.to_string())
            .with_api_key(api_key.to_string());

        Self {
            client: Client::with_config(openai_config),
            model,
            prompt,
            // "auto" means let the endpoint detect the language
            language: language.filter(|l| l != "auto"),
        }
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(&self, artifact: &Artifact) -> Result<String> {
        // The endpoint derives the container from the file name, so the
        // extension has to follow the artifact's media type.
        let temp_file = tempfile::Builder::new()
            .prefix("murmur-")
            .suffix(&format!(".{}", extension_for(&artifact.media_type)))
            .tempfile()
            .context("Failed to create temp file for upload")?;

        tokio::fs::write(temp_file.path(), &artifact.bytes)
            .await
            .context("Failed to write recording to temp file")?;

        tracing::info!(
            "Transcribing {} bytes ({})",
            artifact.bytes.len(),
            artifact.media_type
        );

        let mut builder = CreateTranscriptionRequestArgs::default();
        builder
            .file(temp_file.path().to_str().context("Invalid temp file path")?)
            .model(&self.model)
            .response_format(AudioResponseFormat::Json);
        if let Some(prompt) = &self.prompt {
            builder.prompt(prompt);
        }
        if let Some(language) = &self.language {
            builder.language(language);
        }
        let request = builder
            .build()
            .context("Failed to build transcription request")?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .context("Transcription API call failed")?;

        tracing::info!("Transcription complete: {} chars", response.text.len());
        Ok(response.text)
    }
}
