//! Adapter for backends with an internal fixed-size output lattice.
//!
//! Wraps an opaque [`SequenceNetwork`] into the pipeline's backend
//! capability interface. Lines are dewarped by the pipeline, prepared here
//! (inverted, transposed to frame order and padded with blank frames), and
//! the posterior lattice the network emits is decoded into characters with
//! timestep spans. Those spans are in lattice units and require
//! back-projection into page coordinates.

use image::GrayImage;
use ndarray::Array2;

use crate::backends::Codec;
use crate::core::{BackendOutput, CharPrediction, RecognitionBackend, RecognitionError, SequenceNetwork};
use crate::processors::normalization::image_to_array;
use crate::processors::CenterNormalizer;

/// Default blank margin added around a prepared line, in frames.
pub const DEFAULT_PADDING: u32 = 16;

/// Posterior threshold below which a frame counts as part of a character.
const BLANK_THRESHOLD: f32 = 0.7;

/// Turns a line image into the `(frames, height)` input a sequence network
/// consumes.
///
/// Intensities are rescaled to unit range and inverted so ink is positive,
/// the array is transposed into frame-major order, and `pad` frames of
/// blank context are added on either side.
pub fn prepare_line(line: &GrayImage, pad: u32) -> Array2<f32> {
    let arr = image_to_array(line);
    let (h, w) = arr.dim();
    let max = arr.iter().copied().fold(0.0f32, f32::max).max(1.0);
    let pad = pad as usize;

    let mut prepared = Array2::zeros((w + 2 * pad, h));
    for x in 0..w {
        for y in 0..h {
            prepared[[pad + x, y]] = 1.0 - arr[[y, x]] / max;
        }
    }
    prepared
}

/// Backend adapter over a sequence network with an output lattice.
#[derive(Debug)]
pub struct LatticeBackend<N> {
    network: N,
    codec: Codec,
    blank_threshold: f32,
    padding: u32,
}

impl<N: SequenceNetwork> LatticeBackend<N> {
    /// Creates an adapter over `network` decoding classes through `codec`.
    pub fn new(network: N, codec: Codec) -> Self {
        Self {
            network,
            codec,
            blank_threshold: BLANK_THRESHOLD,
            padding: DEFAULT_PADDING,
        }
    }

    /// Sets the blank posterior threshold used when splitting the lattice
    /// into characters.
    pub fn with_blank_threshold(mut self, threshold: f32) -> Self {
        self.blank_threshold = threshold;
        self
    }

    /// Sets the blank margin assumed around prepared lines.
    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    /// Splits the posterior lattice into characters.
    ///
    /// A character is a maximal run of frames whose blank posterior falls
    /// below the threshold; its glyph and confidence come from the maximal
    /// non-blank posterior inside the run.
    fn decode_lattice(&self, lattice: &Array2<f32>) -> Vec<CharPrediction> {
        let (frames, classes) = lattice.dim();
        let mut chars = Vec::new();
        let mut t = 0;
        while t < frames {
            if lattice[[t, 0]] >= self.blank_threshold {
                t += 1;
                continue;
            }
            let start = t;
            let mut best_class = 0;
            let mut best_posterior = f32::MIN;
            while t < frames && lattice[[t, 0]] < self.blank_threshold {
                for class in 1..classes {
                    if lattice[[t, class]] > best_posterior {
                        best_posterior = lattice[[t, class]];
                        best_class = class;
                    }
                }
                t += 1;
            }
            match self.codec.decode(best_class) {
                Some(glyph) => chars.push(CharPrediction {
                    glyph,
                    start,
                    end: t,
                    confidence: best_posterior,
                }),
                None => tracing::warn!(
                    start,
                    end = t,
                    "dropping character run with no decodable class"
                ),
            }
        }
        chars
    }
}

impl<N: SequenceNetwork> RecognitionBackend for LatticeBackend<N> {
    fn needs_dewarp(&self) -> bool {
        true
    }

    fn padding(&self) -> u32 {
        self.padding
    }

    fn reports_positions_directly(&self) -> bool {
        false
    }

    fn line_normalizer(&self) -> CenterNormalizer {
        CenterNormalizer::new(self.network.input_height())
    }

    fn recognize(&mut self, line: &GrayImage, pad: u32) -> Result<BackendOutput, RecognitionError> {
        let prepared = prepare_line(line, pad);
        let lattice = self.network.forward(&prepared)?;
        if lattice.ncols() != self.codec.classes() {
            return Err(RecognitionError::backend_context(format!(
                "output lattice has {} classes, codec expects {}",
                lattice.ncols(),
                self.codec.classes()
            )));
        }
        let chars = self.decode_lattice(&lattice);
        Ok(BackendOutput {
            chars,
            frames: lattice.nrows(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Network stub replaying a fixed per-frame class assignment.
    struct ScriptedNetwork {
        classes: usize,
        script: Vec<(usize, usize, usize, f32)>, // (start, end, class, posterior)
    }

    impl SequenceNetwork for ScriptedNetwork {
        fn input_height(&self) -> u32 {
            48
        }

        fn forward(&mut self, line: &Array2<f32>) -> Result<Array2<f32>, RecognitionError> {
            let frames = line.nrows();
            let mut lattice = Array2::zeros((frames, self.classes));
            for t in 0..frames {
                lattice[[t, 0]] = 1.0;
            }
            for &(start, end, class, posterior) in &self.script {
                for t in start..end {
                    lattice[[t, 0]] = 0.0;
                    lattice[[t, class]] = posterior;
                }
            }
            Ok(lattice)
        }
    }

    fn test_line(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            if y == height / 2 && x % 3 == 0 {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    #[test]
    fn test_prepare_line_pads_and_inverts() {
        let line = test_line(20, 8);
        let prepared = prepare_line(&line, 4);
        assert_eq!(prepared.dim(), (28, 8));
        // padding frames are blank
        for t in 0..4 {
            assert!(prepared.row(t).iter().all(|&v| v == 0.0));
        }
        // dark input pixel becomes positive ink
        assert!((prepared[[4, 4]] - 1.0).abs() < 1e-6);
        // white input pixel becomes zero
        assert_eq!(prepared[[5, 0]], 0.0);
    }

    #[test]
    fn test_recognize_decodes_runs_in_order() {
        let network = ScriptedNetwork {
            classes: 3,
            script: vec![(6, 9, 1, 0.9), (12, 14, 2, 0.8)],
        };
        let mut backend = LatticeBackend::new(network, Codec::new("ab".chars()));

        let output = backend.recognize(&test_line(20, 8), 4).unwrap();
        assert_eq!(output.frames, 28);
        assert_eq!(output.text(), "ab");
        assert_eq!(output.chars[0].start, 6);
        assert_eq!(output.chars[0].end, 9);
        assert!((output.chars[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(output.chars[1].start, 12);
        assert_eq!(output.chars[1].end, 14);
    }

    #[test]
    fn test_recognize_rejects_class_count_mismatch() {
        let network = ScriptedNetwork {
            classes: 5,
            script: vec![],
        };
        let mut backend = LatticeBackend::new(network, Codec::new("ab".chars()));

        let err = backend.recognize(&test_line(20, 8), 0).unwrap_err();
        assert!(matches!(err, RecognitionError::Backend { .. }));
    }

    #[test]
    fn test_lattice_backend_capabilities() {
        let network = ScriptedNetwork {
            classes: 2,
            script: vec![],
        };
        let backend = LatticeBackend::new(network, Codec::new("a".chars())).with_padding(7);
        assert!(backend.needs_dewarp());
        assert!(!backend.reports_positions_directly());
        assert_eq!(backend.padding(), 7);
        assert_eq!(backend.line_normalizer().target_height(), 48);
    }
}
