use crate::{
    interpolation::{interpolate_pixel, InterpolationMode},
    parallel,
};

use mosaic_image::{Image, ImageError};

#[rustfmt::skip]
fn determinant3x3(m: &[f64; 9]) -> f64 {
    m[0] * (m[4] * m[8] - m[5] * m[7]) -
    m[1] * (m[3] * m[8] - m[5] * m[6]) +
    m[2] * (m[3] * m[7] - m[4] * m[6])
}

#[rustfmt::skip]
fn adjugate3x3(m: &[f64; 9]) -> [f64; 9] {
    [
        m[4] * m[8] - m[5] * m[7],  // [0, 0]
        m[2] * m[7] - m[1] * m[8],  // [0, 1]
        m[1] * m[5] - m[2] * m[4],  // [0, 2]
        m[5] * m[6] - m[3] * m[8],  // [1, 0]
        m[0] * m[8] - m[2] * m[6],  // [1, 1]
        m[2] * m[3] - m[0] * m[5],  // [1, 2]
        m[3] * m[7] - m[4] * m[6],  // [2, 0]
        m[1] * m[6] - m[0] * m[7],  // [2, 1]
        m[0] * m[4] - m[1] * m[3],  // [2, 2]
    ]
}

// the inverse is computed in double precision to keep far away pixels aligned
fn inverse_perspective_matrix(m: &[f32; 9]) -> Result<[f64; 9], ImageError> {
    let m = m.map(f64::from);
    let det = determinant3x3(&m);

    if det == 0.0 || !det.is_finite() {
        return Err(ImageError::CannotComputeDeterminant);
    }

    let inv_det = 1.0 / det;
    Ok(adjugate3x3(&m).map(|a| a * inv_det))
}

/// Maps a point through a homogeneous 3x3 matrix.
///
/// Returns `None` for points sent to infinity.
fn transform_point(x: f64, y: f64, m: &[f64; 9]) -> Option<(f64, f64)> {
    let w = m[6] * x + m[7] * y + m[8];
    if w == 0.0 {
        return None;
    }
    let xt = (m[0] * x + m[1] * y + m[2]) / w;
    let yt = (m[3] * x + m[4] * y + m[5]) / w;
    Some((xt, yt))
}

/// Applies a perspective transformation to an image.
///
/// Every destination pixel is mapped back into `src` through the inverse of `m`. Pixels
/// whose source position falls outside `[-0.5, size - 0.5)` on either axis are set to zero.
///
/// * `src` - The input image with shape (height, width, channels).
/// * `dst` - The output image with shape (height, width, channels).
/// * `m` - The 3x3 perspective transformation matrix src -> dst, row-major.
/// * `interpolation` - The interpolation mode to use.
///
/// # Errors
///
/// Returns [`ImageError::CannotComputeDeterminant`] when `m` is singular.
///
/// # Example
///
/// ```
/// use mosaic_image::{Image, ImageSize};
/// use mosaic_imgproc::interpolation::InterpolationMode;
/// use mosaic_imgproc::warp::warp_perspective;
///
/// let src = Image::<f32, 1>::new(
///   ImageSize {
///     width: 4,
///     height: 5,
///   },
///   vec![0.0f32; 4 * 5]
/// ).unwrap();
///
/// let m = [1.0, 0.0, -1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0];
///
/// let mut dst = Image::<f32, 1>::from_size_val(
///   ImageSize {
///     width: 2,
///     height: 3,
///   },
///   0.0
/// ).unwrap();
///
/// warp_perspective(&src, &mut dst, &m, InterpolationMode::Bilinear).unwrap();
///
/// assert_eq!(dst.size().width, 2);
/// assert_eq!(dst.size().height, 3);
/// ```
pub fn warp_perspective<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    m: &[f32; 9],
    interpolation: InterpolationMode,
) -> Result<(), ImageError> {
    let inv_m = inverse_perspective_matrix(m)?;

    let (src_cols, src_rows) = (src.cols() as f64, src.rows() as f64);

    parallel::par_iter_rows_resample(dst, |x, y, dst_pixel| {
        let inside = transform_point(x as f64, y as f64, &inv_m).filter(|&(u, v)| {
            u >= -0.5 && u < src_cols - 0.5 && v >= -0.5 && v < src_rows - 0.5
        });

        match inside {
            Some((u, v)) => {
                let pixel = interpolate_pixel(src, u as f32, v as f32, interpolation);
                dst_pixel.copy_from_slice(&pixel);
            }
            None => dst_pixel.fill(0.0),
        }
    });

    Ok(())
}
