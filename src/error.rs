use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Terminal and recoverable failure kinds of the pipeline.
///
/// Only `MalformedGenerationResponse` is recoverable: it is reported as a
/// warning while the remaining chunks proceed. Every other kind aborts the
/// run after cleanup.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("generation provider unreachable at {0}")]
    ProviderUnavailable(String),

    #[error("transcription failed: {0}")]
    TranscriptionFailure(String),

    #[error("chunk {chunk}: unparsable generation response: {reason}")]
    MalformedGenerationResponse { chunk: usize, reason: String },

    #[error("no usable rephrasings recovered from any chunk")]
    NoUsableRephrases,

    #[error("ffmpeg {stage} failed ({status})")]
    MediaToolFailure {
        stage: &'static str,
        status: ExitStatus,
    },

    #[error("could not determine audio duration of {}", .0.display())]
    MissingAudioDuration(PathBuf),
}
