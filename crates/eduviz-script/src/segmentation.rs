//! Stage D — Narration segmentation (spec §4.4): split `tts_narration`
//! into TTS-sized segments at sentence boundaries, honoring `[PAUSE]`
//! markers and merging segments under the minimum duration.

use eduviz_models::NarrationSegment;

const CHARS_PER_SECOND: f64 = 12.5;
const TARGET_SEGMENT_SECONDS: f64 = 12.0;
const MAX_SEGMENT_MULTIPLIER: f64 = 1.5;
const MIN_SEGMENT_SECONDS: f64 = 3.0;
const PAUSE_MARKER: &str = "[PAUSE]";

/// Splits narration at sentence boundaries and explicit `[PAUSE]` markers,
/// targeting `TARGET_SEGMENT_SECONDS` with a hard cap at 1.5x, then merges
/// any segment under `MIN_SEGMENT_SECONDS` into its predecessor. Indices
/// are reassigned contiguously after merging.
pub fn segment_narration(text: &str) -> Vec<NarrationSegment> {
    let sentences = split_sentences(text);
    let chunks = pack_sentences(sentences);
    let merged = merge_short_chunks(chunks);
    assign_timeline(merged)
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    for pause_chunk in text.split(PAUSE_MARKER) {
        let mut current = String::new();
        for ch in pause_chunk.chars() {
            current.push(ch);
            if matches!(ch, '.' | '!' | '?') {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    sentences.push(trimmed.to_string());
                }
                current.clear();
            }
        }
        let trimmed = current.trim();
        if !trimmed.is_empty() {
            sentences.push(trimmed.to_string());
        }
    }
    sentences
}

fn estimated_duration(text: &str) -> f64 {
    text.chars().count() as f64 / CHARS_PER_SECOND
}

fn pack_sentences(sentences: Vec<String>) -> Vec<String> {
    let max_seconds = TARGET_SEGMENT_SECONDS * MAX_SEGMENT_MULTIPLIER;
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_seconds = 0.0;

    for sentence in sentences {
        let sentence_seconds = estimated_duration(&sentence);

        if !current.is_empty() && current_seconds + sentence_seconds > max_seconds {
            chunks.push(std::mem::take(&mut current));
            current_seconds = 0.0;
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&sentence);
        current_seconds += sentence_seconds;

        if current_seconds >= TARGET_SEGMENT_SECONDS {
            chunks.push(std::mem::take(&mut current));
            current_seconds = 0.0;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn merge_short_chunks(chunks: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for chunk in chunks {
        let seconds = estimated_duration(&chunk);
        if seconds < MIN_SEGMENT_SECONDS && !merged.is_empty() {
            let prev = merged.last_mut().unwrap();
            prev.push(' ');
            prev.push_str(&chunk);
        } else {
            merged.push(chunk);
        }
    }
    merged
}

fn assign_timeline(chunks: Vec<String>) -> Vec<NarrationSegment> {
    let mut segments = Vec::with_capacity(chunks.len());
    let mut cursor = 0.0;
    for (index, text) in chunks.into_iter().enumerate() {
        let duration = estimated_duration(&text);
        segments.push(NarrationSegment {
            text,
            estimated_duration: duration,
            start_time: cursor,
            end_time: cursor + duration,
            segment_index: index,
        });
        cursor += duration;
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_form_contiguous_timeline() {
        let text = "This is sentence one. This is sentence two! Is this sentence three? Yes it is.";
        let segments = segment_narration(text);
        assert!(!segments.is_empty());
        for window in segments.windows(2) {
            assert_eq!(window[0].end_time, window[1].start_time);
        }
        for (i, seg) in segments.iter().enumerate() {
            assert_eq!(seg.segment_index, i);
        }
    }

    #[test]
    fn pause_marker_forces_a_split() {
        let text = "Short intro.[PAUSE]Short outro.";
        let segments = segment_narration(text);
        assert!(segments.len() >= 1);
        assert!(segments.iter().all(|s| !s.text.contains("[PAUSE]")));
    }

    #[test]
    fn tiny_trailing_segment_merges_into_previous() {
        let text = "A reasonably long first sentence that should take a good number of seconds to narrate aloud. Ok.";
        let segments = segment_narration(text);
        assert!(segments.iter().all(|s| s.estimated_duration >= MIN_SEGMENT_SECONDS || segments.len() == 1));
    }
}
