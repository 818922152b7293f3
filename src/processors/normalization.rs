//! Line normalization (dewarping) for recognition input.
//!
//! Sequence-recognition backends are trained on lines of a fixed height with
//! a straight baseline. [`CenterNormalizer`] measures the vertical
//! center-of-mass curve of a line image and resamples the line to the
//! canonical height while following that curve, removing baseline curvature
//! and skew.
//!
//! The calibration state produced by [`CenterNormalizer::measure`] is
//! recomputed per line and mutated in place; a normalizer instance must not
//! be shared across concurrently-processing lines.

use image::{GrayImage, Luma};
use ndarray::Array2;

use crate::core::DegenerateLineError;

/// Canonical line height backends are trained on by default.
pub const DEFAULT_TARGET_HEIGHT: u32 = 48;

/// Boundary handling for the separable filters below.
#[derive(Clone, Copy)]
enum Boundary {
    /// Pad with zeros.
    Constant,
    /// Mirror the signal at its ends.
    Reflect,
}

/// Measures and dewarps line images to a canonical height.
#[derive(Debug, Clone)]
pub struct CenterNormalizer {
    target_height: u32,
    range: f32,
    smoothness: f32,
    extra: f32,
    center: Vec<f32>,
    radius: usize,
    shape: (usize, usize),
}

impl Default for CenterNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_HEIGHT)
    }
}

impl CenterNormalizer {
    /// Creates a normalizer producing lines of `target_height` pixels.
    pub fn new(target_height: u32) -> Self {
        Self::with_params(target_height, 4.0, 1.0, 0.3)
    }

    /// Creates a normalizer with explicit calibration parameters.
    ///
    /// `range` scales the extraction radius around the measured center
    /// curve, `smoothness` the horizontal smoothing of the measurement, and
    /// `extra` the smoothing of the center curve itself.
    pub fn with_params(target_height: u32, range: f32, smoothness: f32, extra: f32) -> Self {
        Self {
            target_height,
            range,
            smoothness,
            extra,
            center: Vec::new(),
            radius: 0,
            shape: (0, 0),
        }
    }

    /// The canonical output height.
    pub fn target_height(&self) -> u32 {
        self.target_height
    }

    /// Estimates the vertical center-of-mass curve of a line.
    ///
    /// `line` must be an ink-positive intensity array (text bright,
    /// background zero) in unit range. The measured curve and extraction
    /// radius are stored as calibration state for [`normalize`].
    ///
    /// [`normalize`]: CenterNormalizer::normalize
    ///
    /// # Errors
    ///
    /// Fails with [`DegenerateLineError::EmptyLine`] on a zero-area array
    /// and [`DegenerateLineError::NoInk`] when no nonzero pixel exists to
    /// measure.
    pub fn measure(&mut self, line: &Array2<f32>) -> Result<(), DegenerateLineError> {
        let (h, w) = line.dim();
        if h == 0 || w == 0 {
            return Err(DegenerateLineError::EmptyLine);
        }
        let hf = h as f32;

        let mut smoothed = filter_axis0(line, &gaussian_kernel(hf * 0.5), Boundary::Constant);
        smoothed = filter_axis1(&smoothed, &gaussian_kernel(hf * self.smoothness), Boundary::Constant);
        // small full-extent average to break ties in flat columns
        let mut tie = filter_axis0(&smoothed, &box_kernel(((h + 1) / 2).max(1)), Boundary::Constant);
        tie = filter_axis1(&tie, &box_kernel(w), Boundary::Constant);
        smoothed.zip_mut_with(&tie, |s, &t| *s += 0.001 * t);

        let mut centers: Vec<f32> = (0..w)
            .map(|x| {
                let mut best = 0usize;
                for y in 1..h {
                    if smoothed[[y, x]] > smoothed[[best, x]] {
                        best = y;
                    }
                }
                best as f32
            })
            .collect();
        centers = convolve(&centers, &gaussian_kernel(hf * self.extra), Boundary::Reflect);

        let mut deviation = 0.0f32;
        let mut ink = 0usize;
        for ((y, x), &v) in line.indexed_iter() {
            if v != 0.0 {
                deviation += (y as f32 - centers[x]).abs();
                ink += 1;
            }
        }
        if ink == 0 {
            return Err(DegenerateLineError::NoInk);
        }
        let mad = deviation / ink as f32;

        self.radius = (1.0 + self.range * mad) as usize;
        self.center = centers;
        self.shape = (h, w);
        Ok(())
    }

    /// Resamples a measured line to the canonical height.
    ///
    /// Extracts a vertical window of twice the measured radius around the
    /// center curve in every column, padding with `cval` where the window
    /// leaves the line, then rescales the window to `target_height` with
    /// the same factor on both axes.
    ///
    /// # Errors
    ///
    /// Fails with [`DegenerateLineError::ShapeMismatch`] when `line` does
    /// not have the dimensions [`measure`] was called with.
    ///
    /// [`measure`]: CenterNormalizer::measure
    pub fn normalize(
        &self,
        line: &Array2<f32>,
        cval: f32,
    ) -> Result<Array2<f32>, DegenerateLineError> {
        let (h, w) = line.dim();
        if (h, w) != self.shape {
            return Err(DegenerateLineError::ShapeMismatch {
                expected: self.shape,
                actual: (h, w),
            });
        }
        let r = self.radius.max(1) as isize;

        let mut dewarped = Array2::from_elem((2 * r as usize, w), cval);
        for x in 0..w {
            let c = self.center[x].round() as isize;
            for (j, y) in ((c - r)..(c + r)).enumerate() {
                if (0..h as isize).contains(&y) {
                    dewarped[[j, x]] = line[[y as usize, x]];
                }
            }
        }

        let scale = self.target_height as f32 / (2 * r) as f32;
        let out_w = ((w as f32 * scale).round() as usize).max(1);
        Ok(bilinear_resize(
            &dewarped,
            self.target_height as usize,
            out_w,
        ))
    }

    /// Dewarps a cropped line image.
    ///
    /// Inverts intensities, rescales to unit range, measures the center
    /// curve from the line's own pixels and resamples to the canonical
    /// height. The background value of the input is preserved where the
    /// extraction window leaves the line.
    ///
    /// # Errors
    ///
    /// Degenerate pixel statistics (zero area, perfectly uniform content,
    /// nothing to measure) fail with the corresponding
    /// [`DegenerateLineError`]; callers substitute an empty record for the
    /// line and continue.
    pub fn dewarp(&mut self, im: &GrayImage) -> Result<GrayImage, DegenerateLineError> {
        if im.width() == 0 || im.height() == 0 {
            return Err(DegenerateLineError::EmptyLine);
        }
        let line = image_to_array(im);
        let max = line.iter().copied().fold(f32::MIN, f32::max);
        let min = line.iter().copied().fold(f32::MAX, f32::min);
        if max == min {
            return Err(DegenerateLineError::UniformLine);
        }
        let inverted = line.mapv(|v| (max - v) / (max - min));
        self.measure(&inverted)?;
        let normalized = self.normalize(&line, max)?;
        Ok(array_to_image(&normalized))
    }
}

/// Converts a grayscale image into a `(height, width)` intensity array.
pub(crate) fn image_to_array(im: &GrayImage) -> Array2<f32> {
    Array2::from_shape_fn(
        (im.height() as usize, im.width() as usize),
        |(y, x)| im.get_pixel(x as u32, y as u32)[0] as f32,
    )
}

/// Converts an intensity array back into a grayscale image, clamping to the
/// byte range.
pub(crate) fn array_to_image(a: &Array2<f32>) -> GrayImage {
    let (h, w) = a.dim();
    GrayImage::from_fn(w as u32, h as u32, |x, y| {
        Luma([a[[y as usize, x as usize]].round().clamp(0.0, 255.0) as u8])
    })
}

fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 {
        return vec![1.0];
    }
    let radius = (4.0 * sigma).ceil() as i64;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-(i as f32).powi(2) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

fn box_kernel(size: usize) -> Vec<f32> {
    let size = size.max(1);
    vec![1.0 / size as f32; size]
}

/// Convolves `data` with `kernel` centered on each element.
fn convolve(data: &[f32], kernel: &[f32], boundary: Boundary) -> Vec<f32> {
    let n = data.len() as i64;
    let half = (kernel.len() / 2) as i64;
    (0..n)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, &kv)| kv * sample(data, i + k as i64 - half, boundary))
                .sum()
        })
        .collect()
}

fn sample(data: &[f32], i: i64, boundary: Boundary) -> f32 {
    let n = data.len() as i64;
    match boundary {
        Boundary::Constant => {
            if (0..n).contains(&i) {
                data[i as usize]
            } else {
                0.0
            }
        }
        Boundary::Reflect => {
            // (d c b a | a b c d | d c b a) indexing, stable for any offset
            let period = 2 * n;
            let mut idx = ((i % period) + period) % period;
            if idx >= n {
                idx = period - 1 - idx;
            }
            data[idx as usize]
        }
    }
}

/// Convolves every column (along the vertical axis).
fn filter_axis0(a: &Array2<f32>, kernel: &[f32], boundary: Boundary) -> Array2<f32> {
    let (h, w) = a.dim();
    let mut out = Array2::zeros((h, w));
    let mut column = vec![0.0f32; h];
    for x in 0..w {
        for y in 0..h {
            column[y] = a[[y, x]];
        }
        for (y, v) in convolve(&column, kernel, boundary).into_iter().enumerate() {
            out[[y, x]] = v;
        }
    }
    out
}

/// Convolves every row (along the horizontal axis).
fn filter_axis1(a: &Array2<f32>, kernel: &[f32], boundary: Boundary) -> Array2<f32> {
    let (h, w) = a.dim();
    let mut out = Array2::zeros((h, w));
    let mut row = vec![0.0f32; w];
    for y in 0..h {
        for x in 0..w {
            row[x] = a[[y, x]];
        }
        for (x, v) in convolve(&row, kernel, boundary).into_iter().enumerate() {
            out[[y, x]] = v;
        }
    }
    out
}

fn bilinear_resize(a: &Array2<f32>, out_h: usize, out_w: usize) -> Array2<f32> {
    let (h, w) = a.dim();
    let sy = if out_h > 1 {
        (h - 1) as f32 / (out_h - 1) as f32
    } else {
        0.0
    };
    let sx = if out_w > 1 {
        (w - 1) as f32 / (out_w - 1) as f32
    } else {
        0.0
    };
    Array2::from_shape_fn((out_h, out_w), |(i, j)| {
        let y = i as f32 * sy;
        let x = j as f32 * sx;
        let y0 = y.floor() as usize;
        let x0 = x.floor() as usize;
        let y1 = (y0 + 1).min(h - 1);
        let x1 = (x0 + 1).min(w - 1);
        let fy = y - y0 as f32;
        let fx = x - x0 as f32;
        let top = a[[y0, x0]] * (1.0 - fx) + a[[y0, x1]] * fx;
        let bottom = a[[y1, x0]] * (1.0 - fx) + a[[y1, x1]] * fx;
        top * (1.0 - fy) + bottom * fy
    })
}
