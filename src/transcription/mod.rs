mod assemblyai;
mod whisper;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use crate::transcript::RawTranscript;

pub use assemblyai::AssemblyAi;
pub use whisper::WhisperApi;

/// Transcription provider boundary: audio in, raw timed units out.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path, language: Option<&str>) -> Result<RawTranscript>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptionBackend {
    Whisper,
    AssemblyAi,
}

impl TranscriptionBackend {
    pub fn from_str(s: &str) -> Self {
        match s {
            "assemblyai" => TranscriptionBackend::AssemblyAi,
            _ => TranscriptionBackend::Whisper,
        }
    }

    pub fn api_key_name(&self) -> &'static str {
        match self {
            TranscriptionBackend::Whisper => "OPENAI_API_KEY",
            TranscriptionBackend::AssemblyAi => "ASSEMBLYAI_API_KEY",
        }
    }

    pub fn build(&self, api_key: &str, model: &str) -> Box<dyn Transcriber> {
        match self {
            TranscriptionBackend::Whisper => Box::new(WhisperApi::new(api_key, model)),
            TranscriptionBackend::AssemblyAi => Box::new(AssemblyAi::new(api_key)),
        }
    }
}
