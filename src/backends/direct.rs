//! Adapter for backends that locate characters themselves.
//!
//! Wraps an opaque [`GlyphRecognizer`] into the pipeline's backend
//! capability interface. These models consume the raw (padded, never
//! dewarped) line image and report per-glyph pixel offsets inside it, so
//! position handling reduces to an additive pad correction rather than a
//! scale correction.

use image::GrayImage;

use crate::core::{BackendOutput, CharPrediction, GlyphRecognizer, RecognitionBackend, RecognitionError};

/// Default blank margin expected around the input image, in pixels.
pub const DEFAULT_PADDING: u32 = 16;

/// Backend adapter over a model reporting per-glyph positions directly.
#[derive(Debug)]
pub struct DirectBackend<G> {
    model: G,
    padding: u32,
}

impl<G: GlyphRecognizer> DirectBackend<G> {
    /// Creates an adapter over `model`.
    pub fn new(model: G) -> Self {
        Self {
            model,
            padding: DEFAULT_PADDING,
        }
    }

    /// Sets the blank margin the model expects around a line.
    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }
}

impl<G: GlyphRecognizer> RecognitionBackend for DirectBackend<G> {
    fn needs_dewarp(&self) -> bool {
        false
    }

    fn padding(&self) -> u32 {
        self.padding
    }

    fn reports_positions_directly(&self) -> bool {
        true
    }

    fn recognize(&mut self, line: &GrayImage, _pad: u32) -> Result<BackendOutput, RecognitionError> {
        let hits = self.model.recognize_glyphs(line)?;
        let chars = hits
            .into_iter()
            .map(|hit| CharPrediction {
                glyph: hit.glyph,
                start: hit.x,
                end: hit.x,
                confidence: hit.confidence,
            })
            .collect();
        Ok(BackendOutput {
            chars,
            frames: line.width() as usize,
        })
    }
}
