//! The line recognition pipeline.
//!
//! Drives a recognition backend over the text lines of a page image:
//! extract the line region, dewarp it when the backend wants normalized
//! input, recognize, back-project the backend's character positions into
//! absolute page coordinates and optionally reorder the result for
//! bidirectional display.
//!
//! Results are produced lazily, one fully-processed line at a time, in the
//! order the boundaries were supplied. Unrecognizable lines yield an empty
//! [`RecognitionRecord`] without aborting the page; geometry violations and
//! backend failures terminate iteration early.

pub mod backmap;
pub mod bidi;
pub mod record;

pub use backmap::{project_direct_positions, project_lattice_positions};
pub use bidi::bidi_reorder;
pub use record::{RecognitionRecord, RecordSegment};

use image::{imageops, GrayImage, Luma};

use crate::core::{RecognitionBackend, RecognitionError};
use crate::processors::extract::{crop_line, validate_boundary};
use crate::processors::{CenterNormalizer, LineBoundary};

/// All records of one page, in input boundary order.
pub type PageResult = Vec<RecognitionRecord>;

/// Per-invocation knobs of the recognition pipeline.
#[derive(Debug, Clone)]
pub struct RecognitionOptions {
    /// Blank margin around each line, in backend-local units. `None` uses
    /// the backend's own padding.
    pub padding: Option<u32>,
    /// Whether lines are dewarped before recognition (only consulted for
    /// backends that want normalized input).
    pub line_normalization: bool,
    /// Whether completed records are reordered into visual character order.
    pub bidi_reordering: bool,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            padding: None,
            line_normalization: true,
            bidi_reordering: true,
        }
    }
}

impl RecognitionOptions {
    /// Options with all defaults: backend padding, normalization and bidi
    /// reordering enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the backend's blank margin.
    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = Some(padding);
        self
    }

    /// Enables or disables line dewarping.
    pub fn line_normalization(mut self, enabled: bool) -> Self {
        self.line_normalization = enabled;
        self
    }

    /// Enables or disables bidi reordering of completed records.
    pub fn bidi_reordering(mut self, enabled: bool) -> Self {
        self.bidi_reordering = enabled;
        self
    }
}

/// Recognizes the text lines of a page.
///
/// Validates every boundary against the page extents up front, then returns
/// a lazy iterator producing one [`RecognitionRecord`] per boundary in
/// input order. Lines with no usable content (zero area, uniform pixels,
/// failed normalization) yield the empty record; a backend failure ends
/// iteration early with the error while already-yielded records remain
/// valid.
///
/// The backend's line normalizer is instantiated once per invocation and
/// recalibrated on every line, so a single invocation must not be driven
/// from multiple threads.
///
/// # Errors
///
/// Fails with [`RecognitionError::OutOfBounds`] before any line is
/// processed when a boundary exceeds the page image, since that indicates
/// an upstream segmentation bug rather than a bad line.
pub fn recognize_page<'a, B>(
    backend: &'a mut B,
    image: &'a GrayImage,
    boundaries: &'a [LineBoundary],
    options: RecognitionOptions,
) -> Result<LineRecognition<'a, B>, RecognitionError>
where
    B: RecognitionBackend + ?Sized,
{
    for boundary in boundaries {
        validate_boundary(boundary, image)?;
    }
    let normalizer = backend.line_normalizer();
    Ok(LineRecognition {
        backend,
        image,
        boundaries: boundaries.iter(),
        normalizer,
        options,
        failed: false,
    })
}

/// Lazy, single-pass iterator over the recognized lines of a page.
///
/// Produced by [`recognize_page`]. Dropping the iterator cancels the
/// remaining work; no resources outlive it.
pub struct LineRecognition<'a, B: ?Sized> {
    backend: &'a mut B,
    image: &'a GrayImage,
    boundaries: std::slice::Iter<'a, LineBoundary>,
    normalizer: CenterNormalizer,
    options: RecognitionOptions,
    failed: bool,
}

impl<B> LineRecognition<'_, B>
where
    B: RecognitionBackend + ?Sized,
{
    fn recognize_line(
        &mut self,
        boundary: &LineBoundary,
    ) -> Result<RecognitionRecord, RecognitionError> {
        let bounds = boundary.normalized();
        let crop = crop_line(self.image, boundary);
        let line_width = crop.width();

        if crop.width() == 0 || crop.height() == 0 {
            tracing::debug!(%boundary, "skipping zero-area line");
            return Ok(RecognitionRecord::empty());
        }
        let (lo, hi) = intensity_extrema(&crop);
        if lo == hi {
            tracing::debug!(%boundary, "skipping uniform line");
            return Ok(RecognitionRecord::empty());
        }

        let pad = self
            .options
            .padding
            .unwrap_or_else(|| self.backend.padding());

        let mut line = crop;
        if self.backend.needs_dewarp() && self.options.line_normalization {
            match self.normalizer.dewarp(&line) {
                Ok(dewarped) => line = dewarped,
                Err(err) => {
                    tracing::debug!(
                        %boundary,
                        error = %err,
                        "line normalization failed, substituting empty record"
                    );
                    return Ok(RecognitionRecord::empty());
                }
            }
        }

        let (glyphs, boxes, confidences) = if self.backend.reports_positions_directly() {
            let padded = expand_with_margin(&line, pad);
            let output = self.backend.recognize(&padded, pad)?;
            project_direct_positions(&output, &bounds, pad)
        } else {
            let output = self.backend.recognize(&line, pad)?;
            project_lattice_positions(&output, &bounds, line_width, pad)?
        };

        let record = RecognitionRecord::new(glyphs, boxes, confidences)?;
        Ok(if self.options.bidi_reordering {
            bidi_reorder(&record)
        } else {
            record
        })
    }
}

impl<B> Iterator for LineRecognition<'_, B>
where
    B: RecognitionBackend + ?Sized,
{
    type Item = Result<RecognitionRecord, RecognitionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let boundary = *self.boundaries.next()?;
        match self.recognize_line(&boundary) {
            Ok(record) => Some(Ok(record)),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            self.boundaries.size_hint()
        }
    }
}

/// Adds `pad` columns of margin on either side of a line, filled with its
/// dominant intensity so the margin blends into the background.
fn expand_with_margin(line: &GrayImage, pad: u32) -> GrayImage {
    if pad == 0 {
        return line.clone();
    }
    let mut histogram = [0usize; 256];
    for pixel in line.pixels() {
        histogram[pixel[0] as usize] += 1;
    }
    let fill = histogram
        .iter()
        .enumerate()
        .max_by_key(|&(_, count)| *count)
        .map(|(value, _)| value as u8)
        .unwrap_or(0);

    let mut padded = GrayImage::from_pixel(line.width() + 2 * pad, line.height(), Luma([fill]));
    imageops::replace(&mut padded, line, pad as i64, 0);
    padded
}

fn intensity_extrema(line: &GrayImage) -> (u8, u8) {
    line.pixels().fold((u8::MAX, u8::MIN), |(lo, hi), pixel| {
        (lo.min(pixel[0]), hi.max(pixel[0]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BackendOutput, CharPrediction};
    use crate::processors::BoundingBox;
    use imageproc::drawing::draw_line_segment_mut;

    /// Backend double emitting its configured glyphs spread evenly across
    /// the input line.
    struct StubBackend {
        glyphs: Vec<char>,
        direct: bool,
        dewarp: bool,
        pad: u32,
        fail_on_call: Option<usize>,
        calls: usize,
        last_input: Option<(u32, u32)>,
        last_pad: Option<u32>,
    }

    impl StubBackend {
        fn lattice(glyphs: &str) -> Self {
            Self {
                glyphs: glyphs.chars().collect(),
                direct: false,
                dewarp: false,
                pad: 0,
                fail_on_call: None,
                calls: 0,
                last_input: None,
                last_pad: None,
            }
        }

        fn direct(glyphs: &str) -> Self {
            Self {
                direct: true,
                ..Self::lattice(glyphs)
            }
        }
    }

    impl RecognitionBackend for StubBackend {
        fn needs_dewarp(&self) -> bool {
            self.dewarp
        }

        fn padding(&self) -> u32 {
            self.pad
        }

        fn reports_positions_directly(&self) -> bool {
            self.direct
        }

        fn recognize(
            &mut self,
            line: &GrayImage,
            pad: u32,
        ) -> Result<BackendOutput, RecognitionError> {
            self.calls += 1;
            if self.fail_on_call == Some(self.calls) {
                return Err(RecognitionError::backend_context("injected failure"));
            }
            self.last_input = Some(line.dimensions());
            self.last_pad = Some(pad);

            let width = line.width() as usize;
            let frames = if self.direct {
                width
            } else {
                width + 2 * pad as usize
            };
            let span = (width / self.glyphs.len().max(1)).max(1);
            let chars = self
                .glyphs
                .iter()
                .enumerate()
                .map(|(i, &glyph)| {
                    let start = pad as usize + i * span;
                    CharPrediction {
                        glyph,
                        start,
                        end: if self.direct { start } else { start + span },
                        confidence: 0.9,
                    }
                })
                .collect();
            Ok(BackendOutput { chars, frames })
        }
    }

    fn textured_page(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([((x + y) % 7 * 30) as u8]))
    }

    #[test]
    fn test_pipeline_yields_one_record_per_boundary() {
        let page = textured_page(200, 100);
        let boundaries = [
            BoundingBox::new(10, 5, 70, 25),
            BoundingBox::new(10, 30, 190, 50),
        ];
        let mut backend = StubBackend::lattice("abc");

        let records: Vec<_> = recognize_page(
            &mut backend,
            &page,
            &boundaries,
            RecognitionOptions::new().bidi_reordering(false),
        )
        .unwrap()
        .map(|r| r.unwrap())
        .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text(), "abc");
        assert_eq!(records[1].text(), "abc");
    }

    #[test]
    fn test_pipeline_produces_absolute_boxes() {
        let page = textured_page(200, 100);
        let boundaries = [BoundingBox::new(10, 5, 70, 25)];
        let mut backend = StubBackend::lattice("abc");

        let records: Vec<_> = recognize_page(
            &mut backend,
            &page,
            &boundaries,
            RecognitionOptions::new().bidi_reordering(false),
        )
        .unwrap()
        .map(|r| r.unwrap())
        .collect();

        // 60 px line split into thirds, offset by the boundary origin
        assert_eq!(
            records[0].boxes(),
            &[
                BoundingBox::new(10, 5, 30, 25),
                BoundingBox::new(30, 5, 50, 25),
                BoundingBox::new(50, 5, 70, 25),
            ]
        );
        // parallel sequences always share a length
        assert_eq!(records[0].len(), records[0].confidences().len());
    }

    #[test]
    fn test_zero_width_boundary_yields_empty_record() {
        let page = textured_page(200, 100);
        let boundaries = [
            BoundingBox::new(40, 5, 40, 25),
            BoundingBox::new(10, 30, 190, 50),
        ];
        let mut backend = StubBackend::lattice("abc");

        let records: Vec<_> =
            recognize_page(&mut backend, &page, &boundaries, RecognitionOptions::new())
                .unwrap()
                .map(|r| r.unwrap())
                .collect();

        assert_eq!(records.len(), 2);
        assert!(records[0].is_empty());
        assert!(!records[1].is_empty());
    }

    #[test]
    fn test_uniform_line_yields_empty_record_without_backend_call() {
        let page = GrayImage::from_pixel(200, 100, Luma([255]));
        let boundaries = [BoundingBox::new(10, 5, 70, 25)];
        let mut backend = StubBackend::lattice("abc");

        let records: Vec<_> =
            recognize_page(&mut backend, &page, &boundaries, RecognitionOptions::new())
                .unwrap()
                .map(|r| r.unwrap())
                .collect();

        assert_eq!(records.len(), 1);
        assert!(records[0].is_empty());
        assert_eq!(backend.calls, 0);
    }

    #[test]
    fn test_out_of_bounds_boundary_fails_before_any_record() {
        let page = textured_page(200, 100);
        let boundaries = [
            BoundingBox::new(10, 5, 70, 25),
            BoundingBox::new(10, 30, 201, 50), // past the right edge
        ];
        let mut backend = StubBackend::lattice("abc");

        let result = recognize_page(&mut backend, &page, &boundaries, RecognitionOptions::new());
        assert!(matches!(
            result.err(),
            Some(RecognitionError::OutOfBounds { width: 200, .. })
        ));
        assert_eq!(backend.calls, 0);
    }

    #[test]
    fn test_backend_error_propagates_and_fuses() {
        let page = textured_page(200, 100);
        let boundaries = [
            BoundingBox::new(10, 5, 70, 25),
            BoundingBox::new(10, 30, 190, 50),
            BoundingBox::new(10, 55, 190, 75),
        ];
        let mut backend = StubBackend::lattice("abc");
        backend.fail_on_call = Some(2);

        let mut lines =
            recognize_page(&mut backend, &page, &boundaries, RecognitionOptions::new()).unwrap();

        assert!(lines.next().unwrap().is_ok());
        assert!(matches!(
            lines.next(),
            Some(Err(RecognitionError::Backend { .. }))
        ));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_no_boundaries_means_no_records() {
        let page = textured_page(50, 50);
        let mut backend = StubBackend::lattice("abc");
        let count = recognize_page(&mut backend, &page, &[], RecognitionOptions::new())
            .unwrap()
            .count();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_bidi_reordering_reverses_rtl_lines() {
        let page = textured_page(200, 100);
        let boundaries = [BoundingBox::new(10, 5, 70, 25)];

        let mut backend = StubBackend::lattice("\u{5d0}\u{5d1}\u{5d2}");
        let logical: Vec<_> = recognize_page(
            &mut backend,
            &page,
            &boundaries,
            RecognitionOptions::new().bidi_reordering(false),
        )
        .unwrap()
        .map(|r| r.unwrap())
        .collect();

        let mut backend = StubBackend::lattice("\u{5d0}\u{5d1}\u{5d2}");
        let visual: Vec<_> =
            recognize_page(&mut backend, &page, &boundaries, RecognitionOptions::new())
                .unwrap()
                .map(|r| r.unwrap())
                .collect();

        assert_eq!(visual[0].text(), "\u{5d2}\u{5d1}\u{5d0}");
        // boxes are permuted together with their characters, not recomputed
        assert_eq!(visual[0].boxes()[0], logical[0].boxes()[2]);
        assert_eq!(visual[0].boxes()[2], logical[0].boxes()[0]);
    }

    #[test]
    fn test_direct_backend_receives_expanded_line() {
        let page = textured_page(200, 100);
        let boundaries = [BoundingBox::new(10, 5, 70, 25)];
        let mut backend = StubBackend::direct("ab");
        backend.pad = 8;

        let records: Vec<_> =
            recognize_page(&mut backend, &page, &boundaries, RecognitionOptions::new())
                .unwrap()
                .map(|r| r.unwrap())
                .collect();

        // the 60 px crop was widened by the margin on both sides
        assert_eq!(backend.last_input, Some((76, 20)));
        assert_eq!(records[0].len(), 2);
        // the final character extends to the line's right edge
        assert_eq!(records[0].boxes()[1].x1, 70);
    }

    #[test]
    fn test_padding_override_reaches_backend() {
        let page = textured_page(200, 100);
        let boundaries = [BoundingBox::new(10, 5, 70, 25)];
        let mut backend = StubBackend::lattice("a");
        backend.pad = 16;

        recognize_page(
            &mut backend,
            &page,
            &boundaries,
            RecognitionOptions::new().with_padding(5),
        )
        .unwrap()
        .for_each(|r| {
            r.unwrap();
        });

        assert_eq!(backend.last_pad, Some(5));
    }

    #[test]
    fn test_dewarping_backend_receives_normalized_height() {
        let mut page = GrayImage::from_pixel(200, 100, Luma([255]));
        draw_line_segment_mut(&mut page, (10.0, 12.0), (190.0, 18.0), Luma([0]));

        let boundaries = [BoundingBox::new(5, 0, 195, 30)];
        let mut backend = StubBackend::lattice("a");
        backend.dewarp = true;

        let records: Vec<_> =
            recognize_page(&mut backend, &page, &boundaries, RecognitionOptions::new())
                .unwrap()
                .map(|r| r.unwrap())
                .collect();

        let (_, height) = backend.last_input.unwrap();
        assert_eq!(height, 48);
        assert_eq!(records[0].text(), "a");
    }

    #[test]
    fn test_line_normalization_can_be_disabled() {
        let mut page = GrayImage::from_pixel(200, 100, Luma([255]));
        draw_line_segment_mut(&mut page, (10.0, 12.0), (190.0, 18.0), Luma([0]));

        let boundaries = [BoundingBox::new(5, 0, 195, 30)];
        let mut backend = StubBackend::lattice("a");
        backend.dewarp = true;

        recognize_page(
            &mut backend,
            &page,
            &boundaries,
            RecognitionOptions::new().line_normalization(false),
        )
        .unwrap()
        .for_each(|r| {
            r.unwrap();
        });

        // the crop reaches the backend untouched
        assert_eq!(backend.last_input, Some((190, 30)));
    }
}
