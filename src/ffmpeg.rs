use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};

use crate::error::PipelineError;
use crate::geometry::{CompositeSpec, VideoGeometry};

/// Media-transcoding collaborator boundary. The reference implementation
/// shells out to ffmpeg/ffprobe; a non-zero exit is fatal for the stage
/// that issued the instruction.
pub trait MediaTool: Send + Sync {
    fn probe(&self, video: &Path) -> Result<VideoGeometry>;
    fn extract_audio(&self, video: &Path, output: &Path) -> Result<()>;
    fn audio_duration(&self, audio: &Path) -> Result<f64>;
    fn trim(&self, video: &Path, start: f64, end: f64, output: &Path) -> Result<()>;
    fn composite(&self, spec: &CompositeSpec, output: &Path) -> Result<()>;
    fn concat(&self, clips: &[PathBuf], list_file: &Path, output: &Path) -> Result<()>;
}

pub struct Ffmpeg;

pub fn check_ffmpeg_installed() -> bool {
    Command::new("ffmpeg").arg("-version").output().is_ok()
}

fn run_ffmpeg(stage: &'static str, args: &[&str]) -> Result<()> {
    let output = Command::new("ffmpeg")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run ffmpeg for {}", stage))?;

    if !output.status.success() {
        return Err(PipelineError::MediaToolFailure {
            stage,
            status: output.status,
        }
        .into());
    }
    Ok(())
}

impl MediaTool for Ffmpeg {
    fn probe(&self, video: &Path) -> Result<VideoGeometry> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,r_frame_rate:format=duration",
                "-of",
                "json",
            ])
            .arg(video)
            .output()
            .context("Failed to run ffprobe")?;

        let stdout = String::from_utf8_lossy(&output.stdout);

        let json: serde_json::Value =
            serde_json::from_str(&stdout).context("Failed to parse ffprobe output")?;

        let stream = json["streams"][0]
            .as_object()
            .context("No video stream found")?;

        let width = stream
            .get("width")
            .and_then(|v| v.as_u64())
            .context("No width found")? as u32;

        let height = stream
            .get("height")
            .and_then(|v| v.as_u64())
            .context("No height found")? as u32;

        let duration = json["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);

        // Frame rate arrives as a fraction ("60000/1001" or "30/1")
        let fps = stream
            .get("r_frame_rate")
            .and_then(|v| v.as_str())
            .and_then(parse_frame_rate)
            .unwrap_or(30.0);

        Ok(VideoGeometry {
            width,
            height,
            duration,
            fps,
        })
    }

    fn extract_audio(&self, video: &Path, output: &Path) -> Result<()> {
        // Mono 64kbps mp3: whisper-friendly and small enough for API upload
        run_ffmpeg(
            "audio extraction",
            &[
                "-y",
                "-i",
                path_str(video)?,
                "-vn",
                "-ac",
                "1",
                "-ar",
                "16000",
                "-b:a",
                "64k",
                path_str(output)?,
            ],
        )
    }

    fn audio_duration(&self, audio: &Path) -> Result<f64> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "csv=p=0",
            ])
            .arg(audio)
            .output()
            .context("Failed to run ffprobe for audio duration")?;

        duration_from_probe(&String::from_utf8_lossy(&output.stdout), audio)
    }

    fn trim(&self, video: &Path, start: f64, end: f64, output: &Path) -> Result<()> {
        let duration = end - start;
        run_ffmpeg(
            "trim",
            &[
                "-y",
                "-ss",
                &format!("{}", start),
                "-i",
                path_str(video)?,
                "-t",
                &format!("{}", duration),
                "-c:v",
                "libx264",
                "-c:a",
                "aac",
                "-avoid_negative_ts",
                "make_zero",
                path_str(output)?,
            ],
        )
    }

    fn composite(&self, spec: &CompositeSpec, output: &Path) -> Result<()> {
        run_ffmpeg(
            "reaction composite",
            &[
                "-y",
                "-loop",
                "1",
                "-i",
                path_str(&spec.image)?,
                "-i",
                path_str(&spec.audio)?,
                "-filter_complex",
                &spec.filter_complex,
                "-map",
                "[v]",
                "-map",
                "1:a",
                "-t",
                &format!("{}", spec.duration),
                "-r",
                &format!("{}", spec.fps as u32),
                "-c:v",
                "libx264",
                "-c:a",
                "aac",
                "-ar",
                "44100",
                "-ac",
                "2",
                "-pix_fmt",
                "yuv420p",
                "-shortest",
                path_str(output)?,
            ],
        )
    }

    fn concat(&self, clips: &[PathBuf], list_file: &Path, output: &Path) -> Result<()> {
        let mut listing = String::new();
        for clip in clips {
            listing.push_str(&format!("file '{}'\n", clip.display()));
        }
        std::fs::write(list_file, listing).context("Failed to write concat list")?;

        run_ffmpeg(
            "concatenation",
            &[
                "-y",
                "-f",
                "concat",
                "-safe",
                "0",
                "-i",
                path_str(list_file)?,
                "-c:v",
                "libx264",
                "-c:a",
                "aac",
                "-ar",
                "44100",
                path_str(output)?,
            ],
        )
    }
}

/// An empty or unparsable probe result is fatal for the owning clip; there
/// is deliberately no fallback duration.
fn duration_from_probe(probe_output: &str, audio: &Path) -> Result<f64> {
    probe_output
        .trim()
        .parse::<f64>()
        .map_err(|_| PipelineError::MissingAudioDuration(audio.to_path_buf()).into())
}

fn parse_frame_rate(s: &str) -> Option<f64> {
    let parts: Vec<&str> = s.split('/').collect();
    if parts.len() == 2 {
        let num = parts[0].parse::<f64>().ok()?;
        let den = parts[1].parse::<f64>().ok()?;
        if den > 0.0 {
            Some(num / den)
        } else {
            None
        }
    } else {
        s.parse::<f64>().ok()
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .with_context(|| format!("Non-UTF8 path: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rate_parses_fractions_and_plain_numbers() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        let ntsc = parse_frame_rate("60000/1001").unwrap();
        assert!((ntsc - 59.94).abs() < 0.01);
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("30/0"), None);
    }

    #[test]
    fn missing_audio_duration_is_a_typed_error() {
        let err = duration_from_probe("", Path::new("audio.mp3")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingAudioDuration(_))
        ));
        assert_eq!(
            duration_from_probe("3.25\n", Path::new("audio.mp3")).unwrap(),
            3.25
        );
    }
}
