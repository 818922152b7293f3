//! Core error types for the line recognition pipeline.
//!
//! This module defines the error types used throughout the recognition
//! system: the main [`RecognitionError`] enum surfaced to callers, and the
//! internal [`DegenerateLineError`] which is always absorbed at the pipeline
//! level and replaced by an empty recognition record.

use thiserror::Error;

use crate::processors::BoundingBox;

/// Errors surfaced by the recognition pipeline and its components.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// A geometry operation was given an empty box sequence.
    #[error("no bounding boxes supplied")]
    EmptyInput,

    /// A line boundary exceeds the page image extents.
    ///
    /// This signals a segmentation inconsistent with the supplied image and
    /// is fatal for the whole pipeline invocation, not a per-line condition.
    #[error("line boundary {boundary} outside of image bounds ({width}x{height})")]
    OutOfBounds {
        /// The offending boundary, as supplied by the caller.
        boundary: BoundingBox,
        /// Width of the page image.
        width: u32,
        /// Height of the page image.
        height: u32,
    },

    /// A recognition record was constructed from sequences of diverging length.
    #[error(
        "record sequences diverge: {glyphs} glyphs, {boxes} boxes, {confidences} confidences"
    )]
    LengthMismatch {
        /// Number of predicted glyphs.
        glyphs: usize,
        /// Number of character boxes.
        boxes: usize,
        /// Number of confidence values.
        confidences: usize,
    },

    /// The recognition backend failed.
    ///
    /// Backend failures indicate a model problem rather than a bad line and
    /// always propagate to the caller.
    #[error("backend recognition failed: {context}")]
    Backend {
        /// Description of the failing operation.
        context: String,
        /// The underlying error, when the backend supplied one.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl RecognitionError {
    /// Creates a backend error wrapping an underlying source error.
    pub fn backend(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a backend error carrying only a description.
    pub fn backend_context(context: impl Into<String>) -> Self {
        Self::Backend {
            context: context.into(),
            source: None,
        }
    }
}

/// Per-line conditions that make a line unrecognizable.
///
/// These never cross the pipeline boundary: the per-line contract is that a
/// degenerate line yields an empty [`RecognitionRecord`] and processing
/// continues with the next line.
///
/// [`RecognitionRecord`]: crate::pipeline::RecognitionRecord
#[derive(Debug, Error)]
pub enum DegenerateLineError {
    /// The line region has zero width or height.
    #[error("line region has no pixels")]
    EmptyLine,

    /// Every pixel in the line region has the same value.
    #[error("line region is perfectly uniform")]
    UniformLine,

    /// The center-of-mass measurement found no ink to follow.
    #[error("no ink found during line measurement")]
    NoInk,

    /// A line was normalized against calibration state measured on
    /// different dimensions.
    #[error("line shape {actual:?} does not match measured shape {expected:?}")]
    ShapeMismatch {
        /// Dimensions the normalizer was calibrated on, `(height, width)`.
        expected: (usize, usize),
        /// Dimensions of the line being normalized.
        actual: (usize, usize),
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_message_names_boundary_and_extents() {
        let err = RecognitionError::OutOfBounds {
            boundary: BoundingBox::new(10, 20, 300, 40),
            width: 200,
            height: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("(10, 20, 300, 40)"), "message: {msg}");
        assert!(msg.contains("200x100"), "message: {msg}");
    }

    #[test]
    fn test_backend_error_preserves_source() {
        let io = std::io::Error::other("weights truncated");
        let err = RecognitionError::backend("forward pass", io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("forward pass"));
    }

    #[test]
    fn test_backend_context_has_no_source() {
        let err = RecognitionError::backend_context("empty output lattice");
        assert!(std::error::Error::source(&err).is_none());
    }
}
