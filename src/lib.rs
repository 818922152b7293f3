//! # recline-ocr
//!
//! A text line recognition pipeline for document images. Given a page
//! image and the boundaries of its text lines, the pipeline crops each
//! line, dewarps it to the canonical geometry a trained
//! sequence-recognition backend expects, runs the backend, maps the
//! backend's character positions back to absolute page coordinates and
//! reorders the character stream for bidirectional display.
//!
//! The result of every line is a [`RecognitionRecord`]: the recognized
//! text with one bounding box and one confidence per character, exact
//! correspondence between the three sequences guaranteed. Records are
//! produced lazily, one line at a time, so callers can stop consuming at
//! any point.
//!
//! Recognition models themselves stay external: anything satisfying the
//! [`RecognitionBackend`] capability interface plugs in, and the
//! [`backends`] module provides adapters for the two common model shapes
//! (output-lattice networks and models that locate glyphs themselves).
//!
//! ```no_run
//! use recline_ocr::{recognize_page, BoundingBox, RecognitionOptions};
//! use recline_ocr::backends::{Codec, LatticeBackend};
//!
//! # use ndarray::Array2;
//! # use recline_ocr::core::{RecognitionError, SequenceNetwork};
//! # struct Net;
//! # impl SequenceNetwork for Net {
//! #     fn input_height(&self) -> u32 { 48 }
//! #     fn forward(&mut self, line: &Array2<f32>) -> Result<Array2<f32>, RecognitionError> {
//! #         Ok(Array2::zeros((line.nrows(), 4)))
//! #     }
//! # }
//! # fn load_network() -> Net { Net }
//! # fn main() -> Result<(), recline_ocr::RecognitionError> {
//! let page = image::open("page.png").expect("readable image").to_luma8();
//! let lines = vec![BoundingBox::new(120, 80, 1800, 160)];
//!
//! let mut backend = LatticeBackend::new(load_network(), Codec::from_lines("a\nb\nc"));
//! for record in recognize_page(&mut backend, &page, &lines, RecognitionOptions::new())? {
//!     let record = record?;
//!     println!("{} ({} characters)", record.text(), record.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod core;
pub mod pipeline;
pub mod processors;

pub use crate::core::{RecognitionBackend, RecognitionError};
pub use crate::pipeline::{
    bidi_reorder, recognize_page, LineRecognition, PageResult, RecognitionOptions,
    RecognitionRecord, RecordSegment,
};
pub use crate::processors::{
    delta, delta_decode, extract_lines, max_bbox, BoundingBox, CenterNormalizer, LineBoundary,
};
