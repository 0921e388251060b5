use super::bilinear::bilinear_interpolation;
use super::nearest::nearest_neighbor_interpolation;
use mosaic_image::Image;

/// Interpolation mode for the resampling operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum InterpolationMode {
    /// Bilinear interpolation
    #[default]
    Bilinear,
    /// Nearest neighbor interpolation
    Nearest,
}

/// Kernel for interpolating a pixel value
///
/// # Arguments
///
/// * `image` - The input image container with shape (height, width, C).
/// * `u` - The x coordinate of the pixel to interpolate.
/// * `v` - The y coordinate of the pixel to interpolate.
/// * `interpolation` - The interpolation mode to use.
///
/// # Returns
///
/// The interpolated pixel values, one per channel. Coordinates are clamped to the image.
/// An empty image yields zeros.
pub fn interpolate_pixel<const C: usize>(
    image: &Image<f32, C>,
    u: f32,
    v: f32,
    interpolation: InterpolationMode,
) -> [f32; C] {
    if image.cols() == 0 || image.rows() == 0 {
        return [0.0; C];
    }

    let u = u.clamp(0.0, (image.cols() - 1) as f32);
    let v = v.clamp(0.0, (image.rows() - 1) as f32);

    match interpolation {
        InterpolationMode::Bilinear => bilinear_interpolation(image, u, v),
        InterpolationMode::Nearest => nearest_neighbor_interpolation(image, u, v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mosaic_image::ImageError;

    #[test]
    fn test_interpolate_bilinear() -> Result<(), ImageError> {
        let image = Image::<f32, 1>::new([2, 2].into(), vec![0.0, 1.0, 2.0, 3.0])?;
        let p = interpolate_pixel(&image, 0.5, 0.5, InterpolationMode::Bilinear);
        assert_relative_eq!(p[0], 1.5, epsilon = 1e-6);
        let p = interpolate_pixel(&image, 1.0, 0.25, InterpolationMode::Bilinear);
        assert_relative_eq!(p[0], 1.5, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_interpolate_nearest() -> Result<(), ImageError> {
        let image = Image::<f32, 2>::new([2, 1].into(), vec![1.0, 2.0, 3.0, 4.0])?;
        assert_eq!(
            interpolate_pixel(&image, 0.7, 0.0, InterpolationMode::Nearest),
            [3.0, 4.0]
        );
        assert_eq!(
            interpolate_pixel(&image, 0.2, 0.0, InterpolationMode::Nearest),
            [1.0, 2.0]
        );
        Ok(())
    }

    #[test]
    fn test_interpolate_clamps() -> Result<(), ImageError> {
        let image = Image::<f32, 1>::new([2, 1].into(), vec![5.0, 7.0])?;
        let p = interpolate_pixel(&image, -0.4, 0.0, InterpolationMode::Bilinear);
        assert_eq!(p, [5.0]);
        let p = interpolate_pixel(&image, 1.4, 0.3, InterpolationMode::Bilinear);
        assert_eq!(p, [7.0]);
        Ok(())
    }
}
