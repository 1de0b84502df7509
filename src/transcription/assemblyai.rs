use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::Transcriber;
use crate::transcript::{RawTranscript, RawWord};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    id: String,
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    words: Option<Vec<AssemblyAiWord>>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    language_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssemblyAiWord {
    text: String,
    start: u64, // milliseconds
    end: u64,   // milliseconds
}

/// Max poll time: 20 minutes (long videos can take a while)
const MAX_POLL_DURATION_SECS: u64 = 1200;
/// Poll interval: 5 seconds
const POLL_INTERVAL_SECS: u64 = 5;

/// AssemblyAI provider: upload, queue a transcript, poll until done.
pub struct AssemblyAi {
    api_key: String,
}

impl AssemblyAi {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl Transcriber for AssemblyAi {
    async fn transcribe(&self, audio: &Path, language: Option<&str>) -> Result<RawTranscript> {
        let file_size = std::fs::metadata(audio)
            .context("Failed to read audio file metadata")?
            .len();
        eprintln!(
            "AssemblyAI: uploading audio ({:.1}MB)...",
            file_size as f64 / (1024.0 * 1024.0)
        );

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(600))
            .build()?;

        let file_bytes = std::fs::read(audio).context("Failed to read audio file")?;

        let upload_response = client
            .post("https://api.assemblyai.com/v2/upload")
            .header("authorization", &self.api_key)
            .header("content-type", "application/octet-stream")
            .body(file_bytes)
            .send()
            .await
            .context("Failed to upload audio to AssemblyAI")?;

        let upload_status = upload_response.status();
        if !upload_status.is_success() {
            let error_body = upload_response.text().await.unwrap_or_default();
            anyhow::bail!("AssemblyAI upload error ({}): {}", upload_status, error_body);
        }

        let upload: UploadResponse = upload_response
            .json()
            .await
            .context("Failed to parse AssemblyAI upload response")?;

        let mut transcript_request = serde_json::json!({
            "audio_url": upload.upload_url,
            "punctuate": true,
            "format_text": true
        });
        if let Some(language) = language {
            transcript_request["language_code"] = serde_json::json!(language);
        }

        let create_response = client
            .post("https://api.assemblyai.com/v2/transcript")
            .header("authorization", &self.api_key)
            .header("content-type", "application/json")
            .json(&transcript_request)
            .send()
            .await
            .context("Failed to create AssemblyAI transcription")?;

        let create_status = create_response.status();
        if !create_status.is_success() {
            let error_body = create_response.text().await.unwrap_or_default();
            anyhow::bail!(
                "AssemblyAI transcription request error ({}): {}",
                create_status,
                error_body
            );
        }

        let transcript: TranscriptResponse = create_response
            .json()
            .await
            .context("Failed to parse AssemblyAI transcription response")?;

        let transcript_id = transcript.id;
        eprintln!(
            "AssemblyAI: transcription queued (id: {}), polling...",
            transcript_id
        );

        let poll_start = std::time::Instant::now();
        let result = loop {
            if poll_start.elapsed().as_secs() > MAX_POLL_DURATION_SECS {
                anyhow::bail!(
                    "AssemblyAI transcription timed out after {}s",
                    MAX_POLL_DURATION_SECS
                );
            }

            tokio::time::sleep(std::time::Duration::from_secs(POLL_INTERVAL_SECS)).await;

            let poll_response = client
                .get(format!(
                    "https://api.assemblyai.com/v2/transcript/{}",
                    transcript_id
                ))
                .header("authorization", &self.api_key)
                .send()
                .await
                .context("Failed to poll AssemblyAI transcription")?;

            let poll_status = poll_response.status();
            if !poll_status.is_success() {
                let error_body = poll_response.text().await.unwrap_or_default();
                anyhow::bail!("AssemblyAI poll error ({}): {}", poll_status, error_body);
            }

            let result: TranscriptResponse = poll_response
                .json()
                .await
                .context("Failed to parse AssemblyAI poll response")?;

            match result.status.as_str() {
                "completed" => break result,
                "error" => {
                    let error_msg = result.error.unwrap_or_else(|| "Unknown error".to_string());
                    anyhow::bail!("AssemblyAI transcription failed: {}", error_msg);
                }
                status => {
                    eprintln!(
                        "  AssemblyAI status: {} ({:.0}s elapsed)",
                        status,
                        poll_start.elapsed().as_secs_f64()
                    );
                }
            }
        };

        // Timestamps arrive in milliseconds, occasionally out of order
        let mut raw_words: Vec<(f64, f64, String)> = result
            .words
            .unwrap_or_default()
            .into_iter()
            .map(|w| (w.start as f64 / 1000.0, w.end as f64 / 1000.0, w.text))
            .collect();
        raw_words.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let words: Vec<RawWord> = raw_words
            .into_iter()
            .map(|(start, end, text)| RawWord::Record {
                text,
                start: Some(start),
                end: Some(end),
            })
            .collect();

        eprintln!("AssemblyAI: {} words transcribed", words.len());

        Ok(RawTranscript {
            text: result.text.unwrap_or_default(),
            language: result.language_code,
            words,
            segments: Vec::new(),
        })
    }
}
