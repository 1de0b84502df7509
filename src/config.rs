use std::path::PathBuf;

use crate::transcription::TranscriptionBackend;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "dolphin3";
pub const DEFAULT_WHISPER_MODEL: &str = "whisper-1";
pub const DEFAULT_VOICE: &str = "aidar";
pub const DEFAULT_FONT: &str = "/System/Library/Fonts/Supplemental/Arial.ttf";

/// Everything a pipeline run needs to know up front. Built once by the CLI
/// and passed into the orchestrator; no process-wide mutable state.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Still image shown during reaction clips.
    pub image: PathBuf,
    /// TTS voice alias (see `tts::VOICES`).
    pub voice: String,
    /// Ollama model used for the rephrasings.
    pub generation_model: String,
    pub ollama_url: String,
    pub transcription: TranscriptionBackend,
    pub transcription_model: String,
    /// API key for the selected transcription backend, from the environment.
    pub transcription_api_key: Option<String>,
    pub font_path: String,
    /// Parent directory for the per-run working directory.
    pub temp_root: PathBuf,
    /// Retain the working directory after the run (success or failure).
    pub keep_temp: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image: PathBuf::from("image.png"),
            voice: DEFAULT_VOICE.to_string(),
            generation_model: DEFAULT_OLLAMA_MODEL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            transcription: TranscriptionBackend::Whisper,
            transcription_model: DEFAULT_WHISPER_MODEL.to_string(),
            transcription_api_key: None,
            font_path: DEFAULT_FONT.to_string(),
            temp_root: std::env::temp_dir(),
            keep_temp: false,
        }
    }
}
