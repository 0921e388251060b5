use mosaic_image::{Image, ImageError};
use rayon::prelude::*;

use super::FeatureError;
use crate::filter::{gaussian_blur, sobel_gradients, window_sum};

/// Weighting applied to the gradient products around each pixel.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub enum WindowKind {
    /// Every sample in the window has unit weight.
    #[default]
    Box,
    /// Samples are weighted by a normalized gaussian.
    Gaussian {
        /// Standard deviation of the gaussian in pixels.
        sigma: f32,
    },
}

/// Parameters of the Harris corner response.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HarrisParams {
    /// Side of the square window, odd.
    pub window_size: usize,
    /// Sensitivity of the response to edges.
    pub k: f32,
    /// Window weighting.
    pub window: WindowKind,
}

impl Default for HarrisParams {
    fn default() -> Self {
        Self {
            window_size: 3,
            k: 0.04,
            window: WindowKind::Box,
        }
    }
}

fn apply_window(
    src: &Image<f32, 1>,
    dst: &mut Image<f32, 1>,
    params: &HarrisParams,
) -> Result<(), ImageError> {
    let w = params.window_size;
    match params.window {
        WindowKind::Box => window_sum(src, dst, w),
        WindowKind::Gaussian { sigma } => gaussian_blur(src, dst, (w, w), (sigma, sigma)),
    }
}

/// Computes the Harris corner response.
///
/// For every pixel the second-moment matrix `M` of the Sobel gradients is accumulated over
/// the window and the response `R = det(M) - k * trace(M)^2` is written to `dst`. Corners
/// give large positive values, edges negative values and flat regions values close to zero.
///
/// # Arguments
///
/// * `src` - The source grayscale image with shape (H, W), intensities in `[0, 1]`.
/// * `dst` - The destination response image with shape (H, W).
/// * `params` - The window and sensitivity parameters.
///
/// # Errors
///
/// Returns [`FeatureError::InvalidWindowSize`] for a zero or even window and
/// [`FeatureError::Image`] when `src` and `dst` differ in size.
pub fn harris_response(
    src: &Image<f32, 1>,
    dst: &mut Image<f32, 1>,
    params: &HarrisParams,
) -> Result<(), FeatureError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        )
        .into());
    }

    if params.window_size == 0 || params.window_size % 2 == 0 {
        return Err(FeatureError::InvalidWindowSize(params.window_size));
    }

    let size = src.size();
    let mut gx = Image::from_size_val(size, 0.0f32)?;
    let mut gy = Image::from_size_val(size, 0.0f32)?;
    sobel_gradients(src, &mut gx, &mut gy)?;

    let mut dx2 = Image::from_size_val(size, 0.0f32)?;
    let mut dy2 = Image::from_size_val(size, 0.0f32)?;
    let mut dxy = Image::from_size_val(size, 0.0f32)?;

    dx2.as_slice_mut()
        .par_iter_mut()
        .zip(dy2.as_slice_mut().par_iter_mut())
        .zip(dxy.as_slice_mut().par_iter_mut())
        .zip(gx.as_slice().par_iter().zip(gy.as_slice().par_iter()))
        .for_each(|(((xx, yy), xy), (&dx, &dy))| {
            *xx = dx * dx;
            *yy = dy * dy;
            *xy = dx * dy;
        });

    // the gradient buffers are reused for the windowed sums
    let (sxx, syy) = (&mut gx, &mut gy);
    let mut sxy = Image::from_size_val(size, 0.0f32)?;
    apply_window(&dx2, sxx, params)?;
    apply_window(&dy2, syy, params)?;
    apply_window(&dxy, &mut sxy, params)?;

    let k = params.k;
    dst.as_slice_mut()
        .par_iter_mut()
        .zip(sxx.as_slice().par_iter())
        .zip(syy.as_slice().par_iter())
        .zip(sxy.as_slice().par_iter())
        .for_each(|(((r, &a), &c), &b)| {
            let det = a * c - b * b;
            let trace = a + c;
            *r = det - k * trace * trace;
        });

    Ok(())
}
