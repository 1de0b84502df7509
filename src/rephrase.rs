use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::ollama::Generator;
use crate::transcript::TimedWord;

/// One reaction unit derived from the LLM reply.
/// Records with `start <= 0 && end <= 0` are kept for the preview but
/// excluded from rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RephraseRecord {
    pub original: String,
    pub antonym: String,
    pub start: f64,
    pub end: f64,
}

impl RephraseRecord {
    pub fn has_valid_timing(&self) -> bool {
        self.start > 0.0 || self.end > 0.0
    }
}

/// Transcripts longer than this are split into consecutive chunks of this
/// many words, one generation request per chunk. Keeps the reply length
/// bounded and isolates a malformed chunk from the rest.
pub const CHUNK_WORDS: usize = 50;

fn build_prompt(words: &[TimedWord]) -> String {
    let words_json: Vec<serde_json::Value> = words
        .iter()
        .map(|w| serde_json::json!({"word": w.text, "start": w.start, "end": w.end}))
        .collect();
    let transcription =
        serde_json::to_string_pretty(&words_json).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"Task: split the transcription into phrases and invent an ironic opposite for each.

Rules:
1. Split into semantic phrases of 2-5 words
2. For each phrase invent a short, funny, opposite-meaning phrase
3. start = start time of the phrase's first word
4. end = end time of the phrase's last word

CRITICAL: reply with ONLY a JSON array. No text before or after it, no code fences.

Example reply:
[{{"original":"hello friends","antonym":"goodbye enemies","start":0.0,"end":0.8}},{{"original":"today","antonym":"yesterday","start":0.9,"end":1.2}}]

Transcription:
{transcription}

JSON:"#
    )
}

static FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```[a-zA-Z0-9]*\s*").unwrap());
static FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```$").unwrap());

/// Recover the structured array from a raw model reply.
///
/// Models emit fences and commentary despite instructions, so: trim, strip
/// a wrapping code fence, then parse only the first-`[`-to-last-`]` slice.
/// Elements missing usable `start`/`end` (absent or empty string) are
/// skipped rather than zeroed. Returned order is exactly the reply order.
pub fn parse_reply(reply: &str) -> Result<Vec<RephraseRecord>, String> {
    let mut body = reply.trim();
    if body.starts_with("```") {
        body = FENCE_OPEN.find(body).map_or(body, |m| &body[m.end()..]);
        body = FENCE_CLOSE
            .find(body)
            .map_or(body, |m| &body[..m.start()]);
    }

    let open = body.find('[').ok_or("no '[' in response")?;
    let close = body.rfind(']').ok_or("no ']' in response")?;
    if close < open {
        return Err("']' precedes '['".to_string());
    }

    let array: Vec<serde_json::Value> = serde_json::from_str(&body[open..=close])
        .map_err(|e| format!("invalid JSON array: {}", e))?;

    Ok(array.iter().filter_map(project_record).collect())
}

fn project_record(value: &serde_json::Value) -> Option<RephraseRecord> {
    let original = value.get("original")?.as_str()?.trim().to_string();
    let antonym = value.get("antonym")?.as_str()?.trim().to_string();
    let start = timing_value(value.get("start")?)?;
    let end = timing_value(value.get("end")?)?;
    Some(RephraseRecord {
        original,
        antonym,
        start,
        end,
    })
}

/// Timing fields arrive as numbers or numeric strings; empty strings mean
/// the model dropped the value and the element is unusable.
fn timing_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                s.parse().ok()
            }
        }
        _ => None,
    }
}

/// Drive the generation provider over the chunked transcript and fold the
/// per-chunk results: Ok payloads concatenate in chunk order, failures are
/// reported and skipped. Fails only when nothing at all was recovered.
pub async fn extract(
    words: &[TimedWord],
    provider: &dyn Generator,
) -> Result<Vec<RephraseRecord>, PipelineError> {
    let mut records = Vec::new();

    let chunk_count = words.chunks(CHUNK_WORDS).count();
    for (index, chunk) in words.chunks(CHUNK_WORDS).enumerate() {
        let prompt = build_prompt(chunk);

        let chunk_result = match provider.generate(&prompt).await {
            Ok(reply) => parse_reply(&reply),
            Err(e) => Err(e.to_string()),
        };

        match chunk_result {
            Ok(mut chunk_records) => records.append(&mut chunk_records),
            Err(reason) => {
                let warning = PipelineError::MalformedGenerationResponse {
                    chunk: index,
                    reason,
                };
                eprintln!("Warning: {} ({} chunks total)", warning, chunk_count);
            }
        }
    }

    if records.is_empty() {
        return Err(PipelineError::NoUsableRephrases);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays a scripted reply per call, in order.
    struct ScriptedGenerator {
        replies: Mutex<Vec<Result<String, String>>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<Result<String, String>>) -> Self {
            Self {
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn healthy(&self) -> bool {
            true
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            let mut replies = self.replies.lock().unwrap();
            match replies.remove(0) {
                Ok(reply) => Ok(reply),
                Err(e) => Err(anyhow::anyhow!(e)),
            }
        }

        fn endpoint(&self) -> String {
            "scripted".to_string()
        }
    }

    fn words(n: usize) -> Vec<TimedWord> {
        (0..n)
            .map(|i| TimedWord {
                text: format!("w{}", i),
                start: i as f64,
                end: i as f64 + 0.5,
            })
            .collect()
    }

    fn record(original: &str) -> String {
        format!(
            r#"[{{"original":"{}","antonym":"x","start":0,"end":1}}]"#,
            original
        )
    }

    #[test]
    fn parse_recovers_fenced_reply() {
        let reply = "```json\n[{\"original\":\"a\",\"antonym\":\"b\",\"start\":0,\"end\":1}]\n```";
        let records = parse_reply(reply).unwrap();
        assert_eq!(
            records,
            vec![RephraseRecord {
                original: "a".to_string(),
                antonym: "b".to_string(),
                start: 0.0,
                end: 1.0,
            }]
        );
    }

    #[test]
    fn parse_recovers_reply_with_commentary() {
        let reply = r#"Here you go: [{"original":"a","antonym":"b","start":0,"end":1}] Hope that helps!"#;
        let records = parse_reply(reply).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].original, "a");
        assert_eq!(records[0].antonym, "b");
    }

    #[test]
    fn fenced_and_noisy_replies_parse_identically() {
        let fenced = "```json\n[{\"original\":\"a\",\"antonym\":\"b\",\"start\":0,\"end\":1}]\n```";
        let noisy = r#"Here you go: [{"original":"a","antonym":"b","start":0,"end":1}] Hope that helps!"#;
        assert_eq!(parse_reply(fenced).unwrap(), parse_reply(noisy).unwrap());
    }

    #[test]
    fn parse_skips_elements_without_timing() {
        let reply = r#"[
            {"original":"a","antonym":"b","start":"","end":1},
            {"original":"c","antonym":"d","start":0.5,"end":"2.5"},
            {"original":"e","antonym":"f"}
        ]"#;
        let records = parse_reply(reply).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].original, "c");
        assert_eq!(records[0].end, 2.5);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_reply("total nonsense").is_err());
        assert!(parse_reply("] backwards [").is_err());
        assert!(parse_reply("[{not json}]").is_err());
    }

    #[test]
    fn parse_preserves_out_of_order_records() {
        let reply = r#"[
            {"original":"later","antonym":"x","start":5,"end":6},
            {"original":"earlier","antonym":"y","start":1,"end":2}
        ]"#;
        let records = parse_reply(reply).unwrap();
        assert_eq!(records[0].original, "later");
        assert_eq!(records[1].original, "earlier");
    }

    #[tokio::test]
    async fn extract_isolates_a_failed_chunk() {
        // 120 words -> 3 chunks of 50/50/20; the middle reply is garbage.
        let provider = ScriptedGenerator::new(vec![
            Ok(record("chunk one")),
            Ok("not json at all".to_string()),
            Ok(record("chunk three")),
        ]);
        let records = extract(&words(120), &provider).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].original, "chunk one");
        assert_eq!(records[1].original, "chunk three");
    }

    #[tokio::test]
    async fn extract_survives_a_failed_request() {
        let provider = ScriptedGenerator::new(vec![
            Err("connection reset".to_string()),
            Ok(record("chunk two")),
        ]);
        let records = extract(&words(60), &provider).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].original, "chunk two");
    }

    #[tokio::test]
    async fn extract_fails_when_every_chunk_fails() {
        let provider = ScriptedGenerator::new(vec![
            Ok("garbage".to_string()),
            Ok("more garbage".to_string()),
            Ok("still garbage".to_string()),
        ]);
        let err = extract(&words(120), &provider).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoUsableRephrases));
    }

    #[tokio::test]
    async fn extract_sends_one_request_for_short_transcripts() {
        let provider = ScriptedGenerator::new(vec![Ok(record("only"))]);
        let records = extract(&words(10), &provider).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn prompt_embeds_word_timing_and_example() {
        let prompt = build_prompt(&words(2));
        assert!(prompt.contains("\"word\": \"w0\""));
        assert!(prompt.contains("ONLY a JSON array"));
        assert!(prompt.contains(r#"[{"original":"hello friends""#));
    }

    #[test]
    fn validity_requires_some_positive_timing() {
        let invalid = RephraseRecord {
            original: "a".into(),
            antonym: "b".into(),
            start: 0.0,
            end: 0.0,
        };
        let valid = RephraseRecord { end: 1.0, ..invalid.clone() };
        assert!(!invalid.has_valid_timing());
        assert!(valid.has_valid_timing());
    }
}
