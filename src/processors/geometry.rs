//! Geometric primitives for line recognition.
//!
//! This module provides the axis-aligned bounding box used throughout the
//! pipeline, the covering-box computation consumed by document formatters,
//! and the running-delta encoding of box sequences used for compact
//! serialization.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::RecognitionError;

/// An axis-aligned rectangle in absolute page pixel coordinates.
///
/// Raw input may arrive with the corners in diagonal order; consumers call
/// [`BoundingBox::normalized`] to obtain the `x0 <= x1, y0 <= y1` form
/// before measuring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X-coordinate of the first corner.
    pub x0: i32,
    /// Y-coordinate of the first corner.
    pub y0: i32,
    /// X-coordinate of the opposite corner.
    pub x1: i32,
    /// Y-coordinate of the opposite corner.
    pub y1: i32,
}

/// A caller-supplied rectangle identifying one text line on the page.
pub type LineBoundary = BoundingBox;

impl BoundingBox {
    /// Creates a new bounding box from corner coordinates.
    #[inline]
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Returns the box with corners reordered so that `x0 <= x1` and
    /// `y0 <= y1`.
    #[inline]
    pub fn normalized(&self) -> Self {
        Self {
            x0: self.x0.min(self.x1),
            y0: self.y0.min(self.y1),
            x1: self.x0.max(self.x1),
            y1: self.y0.max(self.y1),
        }
    }

    /// Width of the normalized box.
    #[inline]
    pub fn width(&self) -> u32 {
        self.x0.abs_diff(self.x1)
    }

    /// Height of the normalized box.
    #[inline]
    pub fn height(&self) -> u32 {
        self.y0.abs_diff(self.y1)
    }

    /// Computes the minimal box enclosing both this box and `other`.
    pub fn union(&self, other: &Self) -> Self {
        let a = self.normalized();
        let b = other.normalized();
        Self {
            x0: a.x0.min(b.x0),
            y0: a.y0.min(b.y0),
            x1: a.x1.max(b.x1),
            y1: a.y1.max(b.y1),
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x0, self.y0, self.x1, self.y1)
    }
}

/// Calculates the minimal bounding box covering all boxes in `boxes`.
///
/// Each input box is normalized independently, so diagonal-order corners are
/// accepted.
///
/// # Errors
///
/// Returns [`RecognitionError::EmptyInput`] when given zero boxes; there is
/// no meaningful default covering box.
pub fn max_bbox(boxes: &[BoundingBox]) -> Result<BoundingBox, RecognitionError> {
    let (first, rest) = boxes.split_first().ok_or(RecognitionError::EmptyInput)?;
    let mut covering = first.normalized();
    for b in rest {
        covering = covering.union(b);
    }
    Ok(covering)
}

/// Lazy running-delta encoding of a box sequence relative to a root box.
///
/// Produced by [`delta`]; single-pass and not restartable, since the root
/// advances to the previous box after every element.
pub struct Delta<'a> {
    root: BoundingBox,
    boxes: std::slice::Iter<'a, BoundingBox>,
}

impl Iterator for Delta<'_> {
    type Item = (i32, i32, i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        let b = *self.boxes.next()?;
        let root = self.root;
        // dy1 is measured against the root's max-y corner while the other
        // three components use min corners; this matches the encoding
        // consumed by existing hOCR tooling and must not be "fixed".
        let d = (
            b.x0.min(b.x1) - root.x0.min(root.x1),
            b.y0.min(b.y1) - root.y0.min(root.y1),
            b.x0.max(b.x1) - root.x0.min(root.x1),
            b.y0.max(b.y1) - root.y0.max(root.y1),
        );
        self.root = b;
        Some(d)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.boxes.size_hint()
    }
}

impl ExactSizeIterator for Delta<'_> {}

/// Encodes `boxes` as running deltas from `root`.
///
/// Each element is the offset of the next box from the previous one in the
/// sequence, starting from the supplied root. Used for serialization into a
/// compact coordinate format; [`delta_decode`] is the inverse.
pub fn delta(root: BoundingBox, boxes: &[BoundingBox]) -> Delta<'_> {
    Delta {
        root,
        boxes: boxes.iter(),
    }
}

/// Reconstructs a box sequence from its running-delta encoding.
///
/// Inverse of [`delta`]: re-adds the running root to every element. The
/// reconstructed boxes come out in normalized corner order.
pub fn delta_decode(root: BoundingBox, deltas: &[(i32, i32, i32, i32)]) -> Vec<BoundingBox> {
    let mut root = root;
    let mut boxes = Vec::with_capacity(deltas.len());
    for &(dx0, dy0, dx1, dy1) in deltas {
        let rx = root.x0.min(root.x1);
        let b = BoundingBox {
            x0: rx + dx0,
            y0: root.y0.min(root.y1) + dy0,
            x1: rx + dx1,
            y1: root.y0.max(root.y1) + dy1,
        };
        boxes.push(b);
        root = b;
    }
    boxes
}
