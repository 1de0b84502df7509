use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart;

use super::Transcriber;
use crate::transcript::RawTranscript;

/// OpenAI Whisper API provider. Requests word-level timestamps; the raw
/// word shapes (records or triples, possibly without timing) are left for
/// the normalizer to canonicalize.
pub struct WhisperApi {
    api_key: String,
    model: String,
}

impl WhisperApi {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl Transcriber for WhisperApi {
    async fn transcribe(&self, audio: &Path, language: Option<&str>) -> Result<RawTranscript> {
        let file_bytes = std::fs::read(audio).context("Failed to read audio file")?;

        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let file_part = multipart::Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")?;

        let mut form = multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word");

        if let Some(language) = language {
            form = form.text("language", language.to_string());
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()?;
        let response = client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .context("Failed to send request to OpenAI Whisper API")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI Whisper API error ({}): {}", status, error_body);
        }

        let transcript: RawTranscript = response
            .json()
            .await
            .context("Failed to parse OpenAI Whisper API response")?;

        eprintln!(
            "Whisper: {} words, {} segments",
            transcript.words.len(),
            transcript.segments.len()
        );

        Ok(transcript)
    }
}
