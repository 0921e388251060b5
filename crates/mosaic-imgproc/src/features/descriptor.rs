use std::f32::consts::PI;

use mosaic_image::{Image, ImageSize};
use rayon::prelude::*;

use super::{FeatureError, Keypoint};
use crate::{crop::crop_image, filter::sobel_gradients};

const GRID_CELLS: usize = 4;
const ORIENTATION_BINS: usize = 8;

/// Length of a gradient histogram descriptor.
pub const GRADIENT_HISTOGRAM_LEN: usize = GRID_CELLS * GRID_CELLS * ORIENTATION_BINS;

/// The kind of descriptor computed from the patch around each keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum DescriptorKind {
    /// The patch intensities standardized to zero mean and unit variance.
    #[default]
    NormalizedPatch,
    /// A 4x4 grid of 8-bin gradient orientation histograms.
    GradientHistogram,
}

impl DescriptorKind {
    /// Length of the descriptors produced for a given patch size.
    pub fn descriptor_len(&self, patch_size: usize) -> usize {
        match self {
            DescriptorKind::NormalizedPatch => patch_size * patch_size,
            DescriptorKind::GradientHistogram => GRADIENT_HISTOGRAM_LEN,
        }
    }
}

// rows [r - s/2, r + (s+1)/2), same for the columns
fn patch_origin(
    keypoint: &Keypoint,
    patch_size: usize,
    size: ImageSize,
) -> Result<(usize, usize), FeatureError> {
    let out_of_bounds = || FeatureError::OutOfBounds {
        row: keypoint.row,
        col: keypoint.col,
        patch_size,
    };

    let half = patch_size / 2;
    let end = (patch_size + 1) / 2;

    let y0 = keypoint.row.checked_sub(half).ok_or_else(out_of_bounds)?;
    let x0 = keypoint.col.checked_sub(half).ok_or_else(out_of_bounds)?;
    if keypoint.row + end > size.height || keypoint.col + end > size.width {
        return Err(out_of_bounds());
    }

    Ok((x0, y0))
}

fn normalized_patch(patch: &Image<f32, 1>) -> Vec<f32> {
    let values = patch.as_slice();
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    let std = var.sqrt();
    let scale = if std > 0.0 { std } else { 1.0 };

    values.iter().map(|v| (v - mean) / scale).collect()
}

fn orientation_bin(theta: f32) -> usize {
    let bin = ((theta + PI) / (2.0 * PI) * ORIENTATION_BINS as f32).floor() as usize;
    bin.min(ORIENTATION_BINS - 1)
}

fn gradient_histogram(patch: &Image<f32, 1>) -> Result<Vec<f32>, FeatureError> {
    let size = patch.size();
    let mut gx = Image::from_size_val(size, 0.0f32)?;
    let mut gy = Image::from_size_val(size, 0.0f32)?;
    sobel_gradients(patch, &mut gx, &mut gy)?;

    let mut histogram = vec![0.0f32; GRADIENT_HISTOGRAM_LEN];
    for r in 0..size.height {
        for c in 0..size.width {
            let idx = r * size.width + c;
            let (dx, dy) = (gx.as_slice()[idx], gy.as_slice()[idx]);
            let magnitude = (dx * dx + dy * dy).sqrt();
            let cell = (r * GRID_CELLS / size.height) * GRID_CELLS + c * GRID_CELLS / size.width;
            histogram[cell * ORIENTATION_BINS + orientation_bin(dy.atan2(dx))] += magnitude;
        }
    }

    for cell in histogram.chunks_exact_mut(ORIENTATION_BINS) {
        let total = cell.iter().sum::<f32>();
        if total > 0.0 {
            cell.iter_mut().for_each(|v| *v /= total);
        }
    }

    Ok(histogram)
}

/// Describe the square patch around every keypoint.
///
/// The patch of side `patch_size` spans rows `[row - s/2, row + (s+1)/2)` and the same
/// range of columns. Descriptors are computed in parallel and returned in keypoint order.
///
/// # Arguments
///
/// * `image` - The grayscale image with shape (H, W).
/// * `keypoints` - The keypoints to describe.
/// * `kind` - The descriptor to compute.
/// * `patch_size` - Side of the square patch.
///
/// # Errors
///
/// Returns [`FeatureError::InvalidPatchSize`] for a zero patch size and
/// [`FeatureError::OutOfBounds`] for the first keypoint whose patch leaves the image.
pub fn describe_keypoints(
    image: &Image<f32, 1>,
    keypoints: &[Keypoint],
    kind: DescriptorKind,
    patch_size: usize,
) -> Result<Vec<Vec<f32>>, FeatureError> {
    if patch_size == 0 {
        return Err(FeatureError::InvalidPatchSize);
    }

    let origins = keypoints
        .iter()
        .map(|kp| patch_origin(kp, patch_size, image.size()))
        .collect::<Result<Vec<_>, _>>()?;

    let patch_shape = ImageSize {
        width: patch_size,
        height: patch_size,
    };

    origins
        .par_iter()
        .map(|&(x0, y0)| -> Result<Vec<f32>, FeatureError> {
            let mut patch = Image::from_size_val(patch_shape, 0.0f32)?;
            crop_image(image, &mut patch, x0, y0)?;
            match kind {
                DescriptorKind::NormalizedPatch => Ok(normalized_patch(&patch)),
                DescriptorKind::GradientHistogram => gradient_histogram(&patch),
            }
        })
        .collect()
}
