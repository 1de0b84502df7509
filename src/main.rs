use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use riposte::config::{
    PipelineConfig, DEFAULT_OLLAMA_MODEL, DEFAULT_VOICE, DEFAULT_WHISPER_MODEL,
};
use riposte::ffmpeg::check_ffmpeg_installed;
use riposte::pipeline::Pipeline;
use riposte::transcription::TranscriptionBackend;
use riposte::tts::VOICES;

/// Turn a video into a reaction video: transcribe the speech, invert its
/// meaning with an LLM, dub the inversions and interleave them with the
/// original footage.
#[derive(Parser, Debug)]
#[command(name = "riposte", version, about, long_about = None)]
struct Cli {
    /// Input video (optional when listing voices)
    video: Option<PathBuf>,

    /// Output video path (default: <video>_reaction.mp4)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Still image shown during reaction clips
    #[arg(short, long, default_value = "image.png")]
    image: PathBuf,

    /// TTS voice alias (see --voices)
    #[arg(short, long, default_value = DEFAULT_VOICE)]
    voice: String,

    /// Ollama model for the rephrasings
    #[arg(short, long, default_value = DEFAULT_OLLAMA_MODEL)]
    model: String,

    /// Transcription provider: whisper or assemblyai
    #[arg(long, default_value = "whisper")]
    transcriber: String,

    /// Transcription model (whisper backend only)
    #[arg(long, default_value = DEFAULT_WHISPER_MODEL)]
    whisper_model: String,

    /// Language hint (ru, en, ...); auto-detected when omitted
    #[arg(short, long)]
    lang: Option<String>,

    /// Show the transcript and rephrase preview without rendering
    #[arg(long)]
    dry_run: bool,

    /// Keep the temporary working directory
    #[arg(long)]
    keep_temp: bool,

    /// List available voices and exit
    #[arg(long)]
    voices: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.voices {
        println!("{}", "Available voices:".bold());
        for (alias, description) in VOICES.iter() {
            println!("  {:<12} -> {}", alias, description);
        }
        return ExitCode::SUCCESS;
    }

    let Some(video) = cli.video.clone() else {
        eprintln!("{} no input video given (see --help)", "Error:".red());
        return ExitCode::from(1);
    };
    if !video.exists() {
        eprintln!("{} file not found: {}", "Error:".red(), video.display());
        return ExitCode::from(1);
    }
    if !cli.dry_run && !cli.image.exists() {
        eprintln!(
            "{} reaction image not found: {}",
            "Error:".red(),
            cli.image.display()
        );
        return ExitCode::from(1);
    }
    if !check_ffmpeg_installed() {
        eprintln!("{} ffmpeg not found on PATH", "Error:".red());
        return ExitCode::from(1);
    }

    let backend = TranscriptionBackend::from_str(&cli.transcriber);
    let config = PipelineConfig {
        image: cli.image.clone(),
        voice: cli.voice.clone(),
        generation_model: cli.model.clone(),
        transcription: backend,
        transcription_model: cli.whisper_model.clone(),
        transcription_api_key: std::env::var(backend.api_key_name()).ok(),
        keep_temp: cli.keep_temp,
        ..PipelineConfig::default()
    };

    let pipeline = match Pipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            return ExitCode::from(1);
        }
    };

    tokio::select! {
        result = pipeline.run(&video, cli.output.clone(), cli.lang.as_deref(), cli.dry_run) => {
            match result {
                Ok(Some(output)) => {
                    println!("{} {}", "Done:".green().bold(), output.display());
                    ExitCode::SUCCESS
                }
                Ok(None) => {
                    // Dry run: the preview is the deliverable.
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{} {:#}", "Error:".red(), e);
                    ExitCode::from(1)
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            // Dropping the run future drops the workspace guard, so the
            // temporary directory is already gone by the time we exit.
            eprintln!("\n{}", "Interrupted".yellow());
            ExitCode::from(130)
        }
    }
}
