//! Visual reordering of recognition records for bidirectional text.
//!
//! Backends emit characters in training (logical) order regardless of
//! script, so right-to-left and mixed-direction lines need reordering
//! before display. The Unicode bidirectional algorithm itself is delegated
//! to `unicode-bidi`; this module's job is to apply the resulting visual
//! permutation to all three record sequences jointly so every character
//! keeps its own box and confidence.

use unicode_bidi::{BidiInfo, Level};
use unicode_bidi_mirroring::get_mirrored;

use crate::pipeline::record::RecognitionRecord;

/// Reorders a record from logical into visual character order.
///
/// Embedding levels are resolved per paragraph with an auto-detected base
/// level, the visual permutation is applied to characters, boxes and
/// confidences together, and paired punctuation at right-to-left levels is
/// mirrored. Box values are permuted, never recomputed.
///
/// This is a pure function producing a new record. It is not idempotent in
/// general: reapplying it to an already-reordered record scrambles the
/// result, so the pipeline applies it exactly once.
pub fn bidi_reorder(record: &RecognitionRecord) -> RecognitionRecord {
    if record.is_empty() {
        return record.clone();
    }
    let text = record.text();
    let info = BidiInfo::new(&text, None);
    let char_bytes: Vec<usize> = text.char_indices().map(|(byte, _)| byte).collect();

    let mut glyphs = Vec::with_capacity(record.len());
    let mut boxes = Vec::with_capacity(record.len());
    let mut confidences = Vec::with_capacity(record.len());

    for paragraph in &info.paragraphs {
        let para_chars: Vec<usize> = char_bytes
            .iter()
            .enumerate()
            .filter(|(_, &byte)| paragraph.range.contains(&byte))
            .map(|(char_idx, _)| char_idx)
            .collect();
        let levels: Vec<Level> = para_chars
            .iter()
            .map(|&char_idx| info.levels[char_bytes[char_idx]])
            .collect();

        for logical in BidiInfo::reorder_visual(&levels) {
            let Some((glyph, bbox, confidence)) = record.get(para_chars[logical]) else {
                continue;
            };
            let glyph = if levels[logical].is_rtl() {
                get_mirrored(glyph).unwrap_or(glyph)
            } else {
                glyph
            };
            glyphs.push(glyph);
            boxes.push(bbox);
            confidences.push(confidence);
        }
    }

    RecognitionRecord::from_parts(glyphs, boxes, confidences)
}
