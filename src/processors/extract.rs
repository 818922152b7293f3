//! Line extraction from page images.
//!
//! Crops rectangular line regions out of a page image while validating that
//! every boundary actually lies inside the page. An out-of-bounds boundary
//! indicates a segmentation inconsistent with the image and is fatal for the
//! whole invocation rather than a per-line condition.

use image::{imageops, GrayImage};

use crate::core::RecognitionError;
use crate::processors::geometry::{BoundingBox, LineBoundary};

/// Checks a single boundary against the page extents.
pub(crate) fn validate_boundary(
    boundary: &LineBoundary,
    image: &GrayImage,
) -> Result<(), RecognitionError> {
    let b = boundary.normalized();
    if b.x0 < 0 || b.y0 < 0 || b.x1 > image.width() as i32 || b.y1 > image.height() as i32 {
        return Err(RecognitionError::OutOfBounds {
            boundary: *boundary,
            width: image.width(),
            height: image.height(),
        });
    }
    Ok(())
}

/// Crops a pre-validated boundary out of the page image.
pub(crate) fn crop_line(image: &GrayImage, boundary: &LineBoundary) -> GrayImage {
    let b = boundary.normalized();
    imageops::crop_imm(image, b.x0 as u32, b.y0 as u32, b.width(), b.height()).to_image()
}

/// Lazily yields the subimages of `image` defined by `boundaries`,
/// preserving order.
///
/// Each item is the cropped pixel region together with the original
/// boundary, which is needed later to reconstruct absolute character
/// coordinates. The iterator is finite and single-pass; after the first
/// error it yields nothing further.
///
/// # Errors
///
/// A boundary with a negative origin or an extent past the page edge yields
/// [`RecognitionError::OutOfBounds`] in its place.
pub fn extract_lines<'a>(
    image: &'a GrayImage,
    boundaries: &'a [LineBoundary],
) -> ExtractedLines<'a> {
    ExtractedLines {
        image,
        boundaries: boundaries.iter(),
        failed: false,
    }
}

/// Iterator produced by [`extract_lines`].
pub struct ExtractedLines<'a> {
    image: &'a GrayImage,
    boundaries: std::slice::Iter<'a, LineBoundary>,
    failed: bool,
}

impl Iterator for ExtractedLines<'_> {
    type Item = Result<(GrayImage, BoundingBox), RecognitionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let boundary = self.boundaries.next()?;
        if let Err(err) = validate_boundary(boundary, self.image) {
            self.failed = true;
            return Some(Err(err));
        }
        Some(Ok((crop_line(self.image, boundary), *boundary)))
    }
}
