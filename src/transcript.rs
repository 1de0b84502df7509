use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimedWord {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimedSegment {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// One word as a transcription provider emits it. Providers disagree on the
/// encoding: most send a record, some send a bare `(start, end, text)`
/// triple, and timing fields may be missing entirely.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawWord {
    Triple(f64, f64, String),
    Record {
        #[serde(rename = "word", alias = "text")]
        text: String,
        #[serde(default)]
        start: Option<f64>,
        #[serde(default)]
        end: Option<f64>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSegment {
    pub text: String,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
}

/// Provider output before normalization: word-level timing when the
/// provider supports it, segment-level otherwise.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTranscript {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub words: Vec<RawWord>,
    #[serde(default)]
    pub segments: Vec<RawSegment>,
}

/// Canonical normalizer output: one granularity per run, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptUnits {
    Words(Vec<TimedWord>),
    Segments(Vec<TimedSegment>),
}

impl TranscriptUnits {
    pub fn len(&self) -> usize {
        match self {
            TranscriptUnits::Words(w) => w.len(),
            TranscriptUnits::Segments(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Convert raw provider output into the canonical unit sequence.
///
/// Word-level timing wins when present. Units whose text trims to empty are
/// dropped; missing timing becomes 0. Input order is preserved as-is.
pub fn normalize(raw: &RawTranscript) -> TranscriptUnits {
    if !raw.words.is_empty() {
        let words = raw
            .words
            .iter()
            .map(|w| match w {
                RawWord::Triple(start, end, text) => TimedWord {
                    text: text.trim().to_string(),
                    start: *start,
                    end: *end,
                },
                RawWord::Record { text, start, end } => TimedWord {
                    text: text.trim().to_string(),
                    start: start.unwrap_or(0.0),
                    end: end.unwrap_or(0.0),
                },
            })
            .filter(|w| !w.text.is_empty())
            .collect();
        return TranscriptUnits::Words(words);
    }

    let segments = raw
        .segments
        .iter()
        .map(|s| TimedSegment {
            text: s.text.trim().to_string(),
            start: s.start.unwrap_or(0.0),
            end: s.end.unwrap_or(0.0),
        })
        .filter(|s| !s.text.is_empty())
        .collect();
    TranscriptUnits::Segments(segments)
}

/// Word-granularity view for the rephrase extractor.
///
/// Segment-only transcripts are expanded by uniform interpolation: a
/// segment of N whitespace tokens over [start, end] assigns token i the
/// span [start + i*d/N, start + (i+1)*d/N]. This is an approximation of
/// the real word timing, not a transcription-accurate one.
pub fn words_for_extraction(units: &TranscriptUnits) -> Vec<TimedWord> {
    match units {
        TranscriptUnits::Words(words) => words.clone(),
        TranscriptUnits::Segments(segments) => {
            segments.iter().flat_map(interpolate_words).collect()
        }
    }
}

fn interpolate_words(segment: &TimedSegment) -> Vec<TimedWord> {
    let tokens: Vec<&str> = segment.text.split_whitespace().collect();
    if tokens.is_empty() {
        return Vec::new();
    }
    let step = (segment.end - segment.start) / tokens.len() as f64;
    tokens
        .iter()
        .enumerate()
        .map(|(i, token)| TimedWord {
            text: token.to_string(),
            start: segment.start + i as f64 * step,
            end: segment.start + (i + 1) as f64 * step,
        })
        .collect()
}
