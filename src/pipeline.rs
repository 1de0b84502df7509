use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::ffmpeg::{Ffmpeg, MediaTool};
use crate::geometry::composite_spec;
use crate::ollama::{Generator, OllamaClient};
use crate::plan::{build_plan, ClipInstruction};
use crate::rephrase::{self, RephraseRecord};
use crate::transcript;
use crate::transcription::Transcriber;
use crate::tts::{Synthesizer, TtsEngine};

/// Per-run working directory. Dropped at run end on every exit path
/// (success, error, interrupt), which removes the directory unless the
/// caller asked to keep it.
struct Workspace {
    dir: PathBuf,
    keep: bool,
}

impl Workspace {
    fn create(root: &Path, keep: bool) -> Result<Self> {
        let dir = root.join(format!("riposte_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).context("Failed to create working directory")?;
        Ok(Self { dir, keep })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.keep {
            eprintln!("Keeping temp files: {}", self.dir.display());
        } else {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }
}

/// Sequences the stages: health check, inspect, extract, transcribe,
/// rephrase, (dry-run exit), synthesize, plan, render, concatenate.
/// Every stage is gated on the previous one; the first error aborts the
/// run and the workspace cleans itself up.
pub struct Pipeline {
    config: PipelineConfig,
    media: Box<dyn MediaTool>,
    transcriber: Box<dyn Transcriber>,
    generator: Box<dyn Generator>,
    synthesizer: Box<dyn Synthesizer>,
}

impl Pipeline {
    /// Wire up the reference providers from the configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let api_key = config
            .transcription_api_key
            .clone()
            .with_context(|| {
                format!(
                    "{} not set (required by the transcription provider)",
                    config.transcription.api_key_name()
                )
            })?;

        let transcriber = config
            .transcription
            .build(&api_key, &config.transcription_model);
        let generator = Box::new(OllamaClient::new(
            &config.ollama_url,
            &config.generation_model,
        )?);
        let synthesizer = Box::new(TtsEngine::for_voice(&config.voice));

        Ok(Self {
            config,
            media: Box::new(Ffmpeg),
            transcriber,
            generator,
            synthesizer,
        })
    }

    /// Provider-injecting constructor, used by tests and alternative
    /// deployments.
    pub fn with_providers(
        config: PipelineConfig,
        media: Box<dyn MediaTool>,
        transcriber: Box<dyn Transcriber>,
        generator: Box<dyn Generator>,
        synthesizer: Box<dyn Synthesizer>,
    ) -> Self {
        Self {
            config,
            media,
            transcriber,
            generator,
            synthesizer,
        }
    }

    /// Run the full pipeline. Returns the output path, or `None` for a
    /// dry run (which is a success, not a failure).
    pub async fn run(
        &self,
        video: &Path,
        output: Option<PathBuf>,
        language: Option<&str>,
        dry_run: bool,
    ) -> Result<Option<PathBuf>> {
        // Health check comes first, before any temporary file exists.
        if !self.generator.healthy().await {
            return Err(PipelineError::ProviderUnavailable(self.generator.endpoint()).into());
        }

        println!("{}", "1. Inspecting video".bold());
        let geometry = self.media.probe(video)?;
        println!(
            "   {}x{}, {:.1}s @ {:.2} fps",
            geometry.width, geometry.height, geometry.duration, geometry.fps
        );

        let workspace = Workspace::create(&self.config.temp_root, self.config.keep_temp)?;

        println!("{}", "2. Extracting audio".bold());
        let audio_path = workspace.path("audio.mp3");
        self.media.extract_audio(video, &audio_path)?;

        println!("{}", "3. Transcribing".bold());
        let raw = self
            .transcriber
            .transcribe(&audio_path, language)
            .await
            .map_err(|e| PipelineError::TranscriptionFailure(format!("{:#}", e)))?;
        if let Some(lang) = &raw.language {
            println!("   language: {}", lang);
        }
        let units = transcript::normalize(&raw);
        println!("   {} transcript units", units.len());
        let words = transcript::words_for_extraction(&units);

        println!("{}", "4. Generating rephrasings".bold());
        let records = rephrase::extract(&words, self.generator.as_ref()).await?;
        print_preview(&records);

        if dry_run {
            println!("{}", "Dry run - stopping".yellow());
            return Ok(None);
        }

        println!("{}", "5. Synthesizing voice".bold());
        let bar = progress_bar(records.len() as u64, "TTS");
        let mut audio_refs = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let base = workspace.path(&format!("tts_{:03}", i));
            let path = self
                .synthesizer
                .synthesize(&record.antonym, &base)
                .await
                .with_context(|| format!("Speech synthesis failed for record {}", i))?;
            audio_refs.push(path);
            bar.inc(1);
        }
        bar.finish_and_clear();
        println!("   {} audio files", audio_refs.len());

        println!("{}", "6. Rendering clips".bold());
        let plan = build_plan(&records, &geometry, &audio_refs);
        let bar = progress_bar(plan.len() as u64, "render");
        let mut clips = Vec::with_capacity(plan.len());
        for (position, instruction) in plan.into_iter().enumerate() {
            let clip = workspace.path(&format!("clip_{:03}.mp4", position));
            match instruction {
                ClipInstruction::CutOriginal { start, end } => {
                    self.media.trim(video, start, end, &clip)?;
                }
                ClipInstruction::RenderReaction {
                    text,
                    audio,
                    geometry,
                } => {
                    let duration = self.media.audio_duration(&audio)?;
                    let spec = composite_spec(
                        &self.config.image,
                        &audio,
                        duration,
                        &text,
                        &self.config.font_path,
                        &geometry,
                    );
                    self.media.composite(&spec, &clip)?;
                }
            }
            clips.push(clip);
            bar.inc(1);
        }
        bar.finish_and_clear();
        println!("   {} clips", clips.len());

        println!("{}", "7. Concatenating".bold());
        let output_path = output.unwrap_or_else(|| default_output_path(video));
        self.media
            .concat(&clips, &workspace.path("concat_list.txt"), &output_path)?;

        Ok(Some(output_path))
    }
}

fn default_output_path(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("video");
    video.with_file_name(format!("{}_reaction.mp4", stem))
}

fn print_preview(records: &[RephraseRecord]) {
    println!("   {} records", records.len());
    for (i, record) in records.iter().take(5).enumerate() {
        println!(
            "   {}. \"{}\" {} \"{}\"",
            i + 1,
            record.original,
            "->".dimmed(),
            record.antonym
        );
    }
    if records.len() > 5 {
        println!("   ... and {} more", records.len() - 5);
    }
}

fn progress_bar(len: u64, message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template("   {msg} [{bar:30}] {pos}/{len}")
            .unwrap()
            .progress_chars("=> "),
    );
    bar.set_message(message);
    bar
}
