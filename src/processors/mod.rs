//! Image and geometry processing for line recognition.
//!
//! Processors are the pure building blocks the pipeline composes: bounding
//! box arithmetic, line region extraction, and line normalization
//! (dewarping).

pub mod extract;
pub mod geometry;
pub mod normalization;

pub use extract::{extract_lines, ExtractedLines};
pub use geometry::{delta, delta_decode, max_bbox, BoundingBox, Delta, LineBoundary};
pub use normalization::{CenterNormalizer, DEFAULT_TARGET_HEIGHT};
