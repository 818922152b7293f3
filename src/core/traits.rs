//! Capability traits for recognition backends.
//!
//! The pipeline is written once against [`RecognitionBackend`] and never
//! branches on a concrete backend type. Backends differ in whether their
//! input needs dewarping, how much blank margin they assume around a line,
//! and whether they report character positions directly in pixel offsets or
//! in internal output-lattice timesteps requiring back-projection.

use image::GrayImage;
use ndarray::Array2;

use crate::core::RecognitionError;
use crate::processors::CenterNormalizer;

/// One recognized character with its backend-local position.
///
/// For lattice backends `start..end` is the timestep span inside the output
/// lattice; for backends reporting positions directly it is the character's
/// x offset inside the padded line image, with `end == start`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharPrediction {
    /// The recognized character.
    pub glyph: char,
    /// First backend-local unit covered by the character.
    pub start: usize,
    /// One past the last backend-local unit covered by the character.
    pub end: usize,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f32,
}

/// Raw output of one backend invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendOutput {
    /// Recognized characters in emission order, with backend-local
    /// positions.
    pub chars: Vec<CharPrediction>,
    /// Length of the backend-local coordinate space the positions live in:
    /// the number of output-lattice timesteps, or the padded image width
    /// for backends reporting pixel offsets.
    pub frames: usize,
}

impl BackendOutput {
    /// The recognized character stream as a string.
    pub fn text(&self) -> String {
        self.chars.iter().map(|c| c.glyph).collect()
    }
}

/// Capability interface a recognition backend must satisfy.
///
/// Backends always emit characters in training (logical) order regardless
/// of script; visual reordering is the pipeline's job.
pub trait RecognitionBackend {
    /// Whether the pipeline should dewarp lines before recognition.
    fn needs_dewarp(&self) -> bool;

    /// Blank margin, in backend-local units, assumed around a line.
    fn padding(&self) -> u32;

    /// Whether positions in [`BackendOutput`] are already pixel offsets.
    ///
    /// When `false`, positions are output-lattice timesteps and the
    /// pipeline back-projects them into page coordinates.
    fn reports_positions_directly(&self) -> bool;

    /// The line normalizer matching this backend's training geometry.
    ///
    /// Backends that carry no calibrated normalizer fall back to the
    /// default one.
    fn line_normalizer(&self) -> CenterNormalizer {
        CenterNormalizer::default()
    }

    /// Recognizes one line image.
    ///
    /// For backends reporting positions directly the image already includes
    /// `pad` columns of blank margin on either side; lattice backends
    /// receive the bare (possibly dewarped) line and add `pad` blank frames
    /// of context themselves.
    fn recognize(&mut self, line: &GrayImage, pad: u32) -> Result<BackendOutput, RecognitionError>;
}

/// An opaque sequence network producing a posterior lattice.
///
/// The forward-pass mathematics live behind this trait; the crate only
/// consumes the `(frames, classes)` posterior matrix, with class `0`
/// reserved for the blank label.
pub trait SequenceNetwork {
    /// Line height, in pixels, the network was trained on.
    fn input_height(&self) -> u32;

    /// Runs the network over a prepared line of shape `(frames, height)`
    /// and returns the posterior lattice of shape `(frames, classes)`.
    fn forward(&mut self, line: &Array2<f32>) -> Result<Array2<f32>, RecognitionError>;
}

/// One glyph reported by a backend that locates characters itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphHit {
    /// The recognized character.
    pub glyph: char,
    /// X offset of the glyph inside the (padded) input image.
    pub x: usize,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f32,
}

/// An opaque model that recognizes a line and reports per-glyph pixel
/// offsets directly.
pub trait GlyphRecognizer {
    /// Recognizes all glyphs on a line image, in emission order.
    fn recognize_glyphs(&mut self, line: &GrayImage) -> Result<Vec<GlyphHit>, RecognitionError>;
}
