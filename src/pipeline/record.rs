//! The per-line recognition result type.
//!
//! A [`RecognitionRecord`] binds three parallel sequences of equal length:
//! recognized characters, absolute page-coordinate boxes, and confidences.
//! Index `i` in each sequence refers to the same character; the sequences
//! are never permuted independently.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use itertools::Itertools;

use crate::core::RecognitionError;
use crate::processors::{max_bbox, BoundingBox};

/// The recognition result of a single line.
///
/// Created once per line by the pipeline and owned by the caller
/// afterwards. The bidi reorder step produces a new record rather than
/// mutating in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionRecord {
    glyphs: Vec<char>,
    boxes: Vec<BoundingBox>,
    confidences: Vec<f32>,
}

impl RecognitionRecord {
    /// Creates a record from its three parallel sequences.
    ///
    /// # Errors
    ///
    /// Fails with [`RecognitionError::LengthMismatch`] when the sequences
    /// do not have identical lengths.
    pub fn new(
        glyphs: Vec<char>,
        boxes: Vec<BoundingBox>,
        confidences: Vec<f32>,
    ) -> Result<Self, RecognitionError> {
        if glyphs.len() != boxes.len() || glyphs.len() != confidences.len() {
            return Err(RecognitionError::LengthMismatch {
                glyphs: glyphs.len(),
                boxes: boxes.len(),
                confidences: confidences.len(),
            });
        }
        Ok(Self {
            glyphs,
            boxes,
            confidences,
        })
    }

    /// Builds a record from sequences already known to be parallel.
    ///
    /// Invariant: the three sequences have identical lengths.
    pub(crate) fn from_parts(
        glyphs: Vec<char>,
        boxes: Vec<BoundingBox>,
        confidences: Vec<f32>,
    ) -> Self {
        debug_assert!(glyphs.len() == boxes.len() && glyphs.len() == confidences.len());
        Self {
            glyphs,
            boxes,
            confidences,
        }
    }

    /// The degenerate record substituted for unrecognizable lines.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of recognized characters.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Whether the record holds no characters.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// The character, box and confidence at index `i`.
    pub fn get(&self, i: usize) -> Option<(char, BoundingBox, f32)> {
        Some((
            *self.glyphs.get(i)?,
            *self.boxes.get(i)?,
            *self.confidences.get(i)?,
        ))
    }

    /// Iterates over `(character, box, confidence)` triples in order.
    pub fn iter(&self) -> impl Iterator<Item = (char, BoundingBox, f32)> + '_ {
        self.glyphs
            .iter()
            .zip(&self.boxes)
            .zip(&self.confidences)
            .map(|((&glyph, &bbox), &confidence)| (glyph, bbox, confidence))
    }

    /// Returns the sub-record covering `range`, clamped to the record
    /// length.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let start = range.start.min(self.len());
        let end = range.end.clamp(start, self.len());
        Self {
            glyphs: self.glyphs[start..end].to_vec(),
            boxes: self.boxes[start..end].to_vec(),
            confidences: self.confidences[start..end].to_vec(),
        }
    }

    /// The recognized characters.
    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }

    /// The per-character boxes, in absolute page coordinates.
    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    /// The per-character confidences.
    pub fn confidences(&self) -> &[f32] {
        &self.confidences
    }

    /// The recognized text as a string.
    pub fn text(&self) -> String {
        self.glyphs.iter().collect()
    }

    /// The minimal box covering every character of the record.
    ///
    /// # Errors
    ///
    /// Fails with [`RecognitionError::EmptyInput`] on an empty record.
    pub fn bbox(&self) -> Result<BoundingBox, RecognitionError> {
        max_bbox(&self.boxes)
    }

    /// Splits the record on whitespace runs.
    ///
    /// Segments alternate between word and whitespace content, cover the
    /// record exactly in order, and each carries the sub-sequences of boxes
    /// and confidences of its characters. The segment index is stable
    /// within the record; document formatters offset it per page.
    pub fn segments(&self) -> Vec<RecordSegment> {
        let mut segments = Vec::new();
        let mut offset = 0;
        for (is_whitespace, chunk) in &self.glyphs.iter().chunk_by(|c| c.is_whitespace()) {
            let text: String = chunk.collect();
            let len = text.chars().count();
            let boxes = self.boxes[offset..offset + len].to_vec();
            // segments are never empty, so the covering box always exists
            let bbox = max_bbox(&boxes).unwrap_or_default();
            segments.push(RecordSegment {
                index: segments.len(),
                text,
                bbox,
                boxes,
                confidences: self.confidences[offset..offset + len].to_vec(),
                is_whitespace,
            });
            offset += len;
        }
        segments
    }
}

impl fmt::Display for RecognitionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for glyph in &self.glyphs {
            write!(f, "{glyph}")?;
        }
        Ok(())
    }
}

/// One whitespace-delimited segment of a record.
///
/// This is the shape document formatters consume: the segment text, its
/// covering box, and the per-character sub-sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSegment {
    /// Position of the segment within its record.
    pub index: usize,
    /// The segment text.
    pub text: String,
    /// Minimal box covering the segment's characters.
    pub bbox: BoundingBox,
    /// Per-character boxes of the segment.
    pub boxes: Vec<BoundingBox>,
    /// Per-character confidences of the segment.
    pub confidences: Vec<f32>,
    /// Whether the segment is a whitespace run.
    pub is_whitespace: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> RecognitionRecord {
        let glyphs = vec!['t', 'o', ' ', 'g', 'o'];
        let boxes = (0..5)
            .map(|i| BoundingBox::new(10 * i, 0, 10 * i + 8, 20))
            .collect();
        let confidences = vec![0.9, 0.8, 1.0, 0.7, 0.6];
        RecognitionRecord::new(glyphs, boxes, confidences).unwrap()
    }

    #[test]
    fn test_new_rejects_diverging_lengths() {
        let err = RecognitionRecord::new(
            vec!['a', 'b'],
            vec![BoundingBox::new(0, 0, 1, 1)],
            vec![0.5, 0.5],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RecognitionError::LengthMismatch {
                glyphs: 2,
                boxes: 1,
                confidences: 2
            }
        ));
    }

    #[test]
    fn test_parallel_sequences_share_length() {
        let record = sample_record();
        assert_eq!(record.len(), record.boxes().len());
        assert_eq!(record.len(), record.confidences().len());
    }

    #[test]
    fn test_get_returns_bound_triple() {
        let record = sample_record();
        let (glyph, bbox, confidence) = record.get(1).unwrap();
        assert_eq!(glyph, 'o');
        assert_eq!(bbox, BoundingBox::new(10, 0, 18, 20));
        assert!((confidence - 0.8).abs() < 1e-6);
        assert!(record.get(5).is_none());
    }

    #[test]
    fn test_iter_yields_triples_in_order() {
        let record = sample_record();
        let text: String = record.iter().map(|(g, _, _)| g).collect();
        assert_eq!(text, "to go");
    }

    #[test]
    fn test_slice_is_functional_and_clamped() {
        let record = sample_record();
        let tail = record.slice(3..5);
        assert_eq!(tail.text(), "go");
        assert_eq!(tail.boxes()[0], record.boxes()[3]);
        // the original is untouched
        assert_eq!(record.len(), 5);
        // out-of-range ends clamp instead of panicking
        assert_eq!(record.slice(3..99).len(), 2);
        assert_eq!(record.slice(7..9).len(), 0);
    }

    #[test]
    fn test_bbox_covers_all_characters() {
        let record = sample_record();
        assert_eq!(record.bbox().unwrap(), BoundingBox::new(0, 0, 48, 20));
        assert!(matches!(
            RecognitionRecord::empty().bbox(),
            Err(RecognitionError::EmptyInput)
        ));
    }

    #[test]
    fn test_segments_cover_record_in_order() {
        let record = sample_record();
        let segments = record.segments();
        assert_eq!(segments.len(), 3);

        assert_eq!(segments[0].text, "to");
        assert!(!segments[0].is_whitespace);
        assert_eq!(segments[0].bbox, BoundingBox::new(0, 0, 18, 20));
        assert_eq!(segments[0].confidences, vec![0.9, 0.8]);

        assert_eq!(segments[1].text, " ");
        assert!(segments[1].is_whitespace);

        assert_eq!(segments[2].text, "go");
        assert_eq!(segments[2].index, 2);
        assert_eq!(segments[2].boxes.len(), 2);

        let total: usize = segments.iter().map(|s| s.text.chars().count()).sum();
        assert_eq!(total, record.len());
    }

    #[test]
    fn test_empty_record_has_no_segments() {
        assert!(RecognitionRecord::empty().segments().is_empty());
    }

    #[test]
    fn test_display_is_prediction_text() {
        assert_eq!(sample_record().to_string(), "to go");
    }

    #[test]
    fn test_record_serde_round_trip() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let back: RecognitionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
