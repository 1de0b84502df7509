use std::path::PathBuf;

use crate::geometry::VideoGeometry;
use crate::rephrase::RephraseRecord;

/// One render step. The ordered sequence alternates original footage and
/// reaction overlays and is consumed exactly once by the render stage.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipInstruction {
    CutOriginal {
        start: f64,
        end: f64,
    },
    RenderReaction {
        text: String,
        audio: PathBuf,
        geometry: VideoGeometry,
    },
}

/// Pair each record with its synthesized audio and emit cut + reaction
/// instructions. Pairs with invalid timing are skipped entirely, so the
/// plan holds exactly two instructions per valid record, in input order.
pub fn build_plan(
    records: &[RephraseRecord],
    geometry: &VideoGeometry,
    audio_refs: &[PathBuf],
) -> Vec<ClipInstruction> {
    let mut plan = Vec::new();

    for (record, audio) in records.iter().zip(audio_refs) {
        if !record.has_valid_timing() {
            continue;
        }
        plan.push(ClipInstruction::CutOriginal {
            start: record.start,
            end: record.end,
        });
        plan.push(ClipInstruction::RenderReaction {
            text: record.antonym.clone(),
            audio: audio.clone(),
            geometry: geometry.clone(),
        });
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> VideoGeometry {
        VideoGeometry {
            width: 1920,
            height: 1080,
            duration: 60.0,
            fps: 30.0,
        }
    }

    fn record(start: f64, end: f64, antonym: &str) -> RephraseRecord {
        RephraseRecord {
            original: "original".to_string(),
            antonym: antonym.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn invalid_timing_produces_no_instructions() {
        let plan = build_plan(
            &[record(0.0, 0.0, "nope")],
            &geometry(),
            &[PathBuf::from("tts_000.mp3")],
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn valid_record_produces_cut_then_reaction() {
        let plan = build_plan(
            &[record(0.0, 1.0, "quite the opposite")],
            &geometry(),
            &[PathBuf::from("tts_000.mp3")],
        );
        assert_eq!(plan.len(), 2);
        assert_eq!(
            plan[0],
            ClipInstruction::CutOriginal {
                start: 0.0,
                end: 1.0
            }
        );
        match &plan[1] {
            ClipInstruction::RenderReaction { text, audio, .. } => {
                assert_eq!(text, "quite the opposite");
                assert_eq!(audio, &PathBuf::from("tts_000.mp3"));
            }
            other => panic!("expected reaction, got {:?}", other),
        }
    }

    #[test]
    fn plan_is_two_instructions_per_valid_record_in_order() {
        let records = vec![
            record(0.0, 1.0, "first"),
            record(0.0, 0.0, "skipped"),
            record(2.0, 3.0, "second"),
        ];
        let audio: Vec<PathBuf> = (0..3)
            .map(|i| PathBuf::from(format!("tts_{:03}.mp3", i)))
            .collect();

        let plan = build_plan(&records, &geometry(), &audio);
        assert_eq!(plan.len(), 4);

        // The skipped record's audio must not leak into a neighbor's pair.
        match &plan[3] {
            ClipInstruction::RenderReaction { text, audio, .. } => {
                assert_eq!(text, "second");
                assert_eq!(audio, &PathBuf::from("tts_002.mp3"));
            }
            other => panic!("expected reaction, got {:?}", other),
        }
    }
}
