use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;

/// Speech-synthesis boundary: text in, audio file out. A failed synthesis
/// is fatal for the owning record's clip.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Writes audio for `text` next to `output_base`; the returned path
    /// carries the engine's own extension (mp3 or wav).
    async fn synthesize(&self, text: &str, output_base: &Path) -> Result<PathBuf>;
}

/// Edge-TTS voice aliases.
static EDGE_VOICES: &[(&str, &str)] = &[
    ("dmitry", "ru-RU-DmitryNeural"),
    ("svetlana", "ru-RU-SvetlanaNeural"),
    ("jessie", "en-US-JennyNeural"),
    ("brian", "en-GB-RyanNeural"),
    ("aria", "en-US-AriaNeural"),
    ("emma", "en-US-EmmaNeural"),
];

/// Piper voice aliases (local models).
static PIPER_VOICES: &[&str] = &["aidar", "baya", "kseniya", "xenia", "eugene"];

/// Alias -> description table for the `--voices` listing.
pub static VOICES: Lazy<Vec<(String, String)>> = Lazy::new(|| {
    let mut voices: Vec<(String, String)> = EDGE_VOICES
        .iter()
        .map(|(alias, full)| (alias.to_string(), full.to_string()))
        .collect();
    for alias in PIPER_VOICES {
        voices.push((alias.to_string(), format!("piper ({}.onnx)", alias)));
    }
    voices
});

pub enum TtsEngine {
    Edge { voice: String },
    Piper { voice: String },
}

impl TtsEngine {
    /// Piper aliases get the local engine; anything else goes to edge-tts,
    /// with unknown aliases passed through as full voice names.
    pub fn for_voice(alias: &str) -> Self {
        let alias = alias.to_lowercase();
        if PIPER_VOICES.contains(&alias.as_str()) {
            TtsEngine::Piper { voice: alias }
        } else {
            let voice = EDGE_VOICES
                .iter()
                .find(|(a, _)| *a == alias)
                .map(|(_, full)| full.to_string())
                .unwrap_or(alias);
            TtsEngine::Edge { voice }
        }
    }
}

#[async_trait]
impl Synthesizer for TtsEngine {
    async fn synthesize(&self, text: &str, output_base: &Path) -> Result<PathBuf> {
        match self {
            TtsEngine::Edge { voice } => {
                let output = output_base.with_extension("mp3");
                let status = Command::new("edge-tts")
                    .args(["--voice", voice.as_str(), "--text", text, "--write-media"])
                    .arg(&output)
                    .output()
                    .context("Failed to run edge-tts (is it installed?)")?;
                if !status.status.success() {
                    anyhow::bail!(
                        "edge-tts failed ({}): {}",
                        status.status,
                        String::from_utf8_lossy(&status.stderr)
                    );
                }
                Ok(output)
            }
            TtsEngine::Piper { voice } => {
                let output = output_base.with_extension("wav");
                let model = format!("{}.onnx", voice);
                let mut child = Command::new("piper")
                    .args(["--model", model.as_str(), "--output_file"])
                    .arg(&output)
                    .stdin(Stdio::piped())
                    .stdout(Stdio::null())
                    .stderr(Stdio::piped())
                    .spawn()
                    .context("Failed to run piper (is it installed?)")?;
                child
                    .stdin
                    .take()
                    .context("Failed to open piper stdin")?
                    .write_all(text.as_bytes())
                    .context("Failed to write text to piper")?;
                let result = child.wait_with_output().context("piper did not exit")?;
                if !result.status.success() {
                    anyhow::bail!(
                        "piper failed ({}): {}",
                        result.status,
                        String::from_utf8_lossy(&result.stderr)
                    );
                }
                Ok(output)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piper_aliases_route_to_piper() {
        assert!(matches!(
            TtsEngine::for_voice("aidar"),
            TtsEngine::Piper { voice } if voice == "aidar"
        ));
    }

    #[test]
    fn known_edge_aliases_expand_to_full_names() {
        assert!(matches!(
            TtsEngine::for_voice("Jessie"),
            TtsEngine::Edge { voice } if voice == "en-US-JennyNeural"
        ));
    }

    #[test]
    fn unknown_aliases_pass_through_to_edge() {
        assert!(matches!(
            TtsEngine::for_voice("de-DE-KatjaNeural"),
            TtsEngine::Edge { voice } if voice == "de-de-katjaneural"
        ));
    }

    #[test]
    fn voice_table_lists_both_engines() {
        assert!(VOICES.iter().any(|(alias, _)| alias == "dmitry"));
        assert!(VOICES.iter().any(|(alias, _)| alias == "aidar"));
    }
}
