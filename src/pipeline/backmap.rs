//! Back-projection of backend-local character positions.
//!
//! Lattice backends report positions as timesteps inside their padded,
//! rescaled output lattice; backends that locate characters themselves
//! report pixel offsets inside the padded line image. Both get converted
//! here into absolute page-coordinate boxes spanning the full line height.

use crate::core::{BackendOutput, RecognitionError};
use crate::processors::BoundingBox;

/// Converts lattice timestep spans into absolute character boxes.
///
/// `line_width` is the width of the original cropped line, before any
/// dewarping changed its geometry. The start correction subtracts the full
/// padding while the end correction subtracts half of it; the asymmetry is
/// load-bearing for downstream consumers of the produced coordinates and
/// is kept as a compatibility constant.
///
/// Characters whose span is empty (`start == end`) produce a zero-width box
/// rather than being dropped; they represent very narrow or merged glyphs.
///
/// # Errors
///
/// Fails when the output lattice is not longer than twice the padding, as
/// no usable scale exists then.
pub fn project_lattice_positions(
    output: &BackendOutput,
    line: &BoundingBox,
    line_width: u32,
    pad: u32,
) -> Result<(Vec<char>, Vec<BoundingBox>, Vec<f32>), RecognitionError> {
    let line = line.normalized();
    if output.frames <= 2 * pad as usize {
        return Err(RecognitionError::backend_context(format!(
            "output lattice of {} frames is not longer than twice the padding ({pad})",
            output.frames
        )));
    }
    let scale = line_width as f64 / (output.frames - 2 * pad as usize) as f64;
    let pad = pad as f64;

    let mut glyphs = Vec::with_capacity(output.chars.len());
    let mut boxes = Vec::with_capacity(output.chars.len());
    let mut confidences = Vec::with_capacity(output.chars.len());
    for c in &output.chars {
        glyphs.push(c.glyph);
        boxes.push(BoundingBox {
            x0: line.x0 + ((c.start as f64 - pad) * scale) as i32,
            y0: line.y0,
            x1: line.x0 + ((c.end as f64 - pad / 2.0) * scale) as i32,
            y1: line.y1,
        });
        confidences.push(c.confidence);
    }
    Ok((glyphs, boxes, confidences))
}

/// Converts directly-reported pixel offsets into absolute character boxes.
///
/// Each character starts at its reported offset (pad-corrected) and extends
/// to one pixel before the next character's start; the final character
/// extends to the line's right edge. The produced boxes tile the line
/// without gaps or overlaps.
pub fn project_direct_positions(
    output: &BackendOutput,
    line: &BoundingBox,
    pad: u32,
) -> (Vec<char>, Vec<BoundingBox>, Vec<f32>) {
    let line = line.normalized();
    let pad = pad as i32;

    let mut glyphs = Vec::with_capacity(output.chars.len());
    let mut boxes = Vec::with_capacity(output.chars.len());
    let mut confidences = Vec::with_capacity(output.chars.len());
    for (i, c) in output.chars.iter().enumerate() {
        let x1 = match output.chars.get(i + 1) {
            Some(next) => line.x0 + next.start as i32 - 1 - pad,
            None => line.x1,
        };
        glyphs.push(c.glyph);
        boxes.push(BoundingBox {
            x0: line.x0 + c.start as i32 - pad,
            y0: line.y0,
            x1,
            y1: line.y1,
        });
        confidences.push(c.confidence);
    }
    (glyphs, boxes, confidences)
}
