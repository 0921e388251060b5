use mosaic_image::{Image, ImageError};
use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

use super::{kernels, separable_filter};

/// Sum the samples under a square window centered at every pixel.
///
/// Samples falling outside the image count as zero.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn window_sum<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    window_size: usize,
) -> Result<(), ImageError> {
    let kernel = kernels::box_sum_kernel_1d(window_size);
    separable_filter(src, dst, &kernel, &kernel)
}

/// Blur an image using a gaussian blur filter
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_size` - The size of the kernel (kernel_x, kernel_y).
/// * `sigma` - The sigma of the gaussian kernel.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn gaussian_blur<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_size: (usize, usize),
    sigma: (f32, f32),
) -> Result<(), ImageError> {
    let kernel_x = kernels::gaussian_kernel_1d(kernel_size.0, sigma.0);
    let kernel_y = kernels::gaussian_kernel_1d(kernel_size.1, sigma.1);
    separable_filter(src, dst, &kernel_x, &kernel_y)?;
    Ok(())
}

/// Compute the horizontal and vertical image derivatives with a normalized 3x3 Sobel operator.
///
/// The border is replicated and the kernels are scaled by 1/8, so a unit ramp along an
/// axis yields a unit derivative.
///
/// # Arguments
///
/// * `src` - The source grayscale image with shape (H, W, 1).
/// * `gx` - The derivative along the columns with shape (H, W, 1).
/// * `gy` - The derivative along the rows with shape (H, W, 1).
///
/// PRECONDITION: `src`, `gx` and `gy` must have the same shape.
pub fn sobel_gradients(
    src: &Image<f32, 1>,
    gx: &mut Image<f32, 1>,
    gy: &mut Image<f32, 1>,
) -> Result<(), ImageError> {
    for out in [&*gx, &*gy] {
        if src.size() != out.size() {
            return Err(ImageError::InvalidImageSize(
                src.cols(),
                src.rows(),
                out.cols(),
                out.rows(),
            ));
        }
    }

    let rows = src.rows();
    let cols = src.cols();
    if rows == 0 || cols == 0 {
        return Ok(());
    }

    let src_data = src.as_slice();
    let at = |r: isize, c: isize| -> f32 {
        let r = r.clamp(0, rows as isize - 1) as usize;
        let c = c.clamp(0, cols as isize - 1) as usize;
        src_data[r * cols + c]
    };

    gx.as_slice_mut()
        .par_chunks_mut(cols)
        .zip(gy.as_slice_mut().par_chunks_mut(cols))
        .enumerate()
        .for_each(|(r, (gx_row, gy_row))| {
            let r = r as isize;
            for (c, (dx, dy)) in gx_row.iter_mut().zip(gy_row.iter_mut()).enumerate() {
                let c = c as isize;
                let (tl, tc, tr) = (at(r - 1, c - 1), at(r - 1, c), at(r - 1, c + 1));
                let (ml, mr) = (at(r, c - 1), at(r, c + 1));
                let (bl, bc, br) = (at(r + 1, c - 1), at(r + 1, c), at(r + 1, c + 1));

                *dx = ((tr + 2.0 * mr + br) - (tl + 2.0 * ml + bl)) / 8.0;
                *dy = ((bl + 2.0 * bc + br) - (tl + 2.0 * tc + tr)) / 8.0;
            }
        });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mosaic_image::ImageSize;

    #[test]
    fn test_window_sum() -> Result<(), ImageError> {
        let img = Image::<f32, 1>::from_size_val([4, 4].into(), 1.0)?;
        let mut dst = Image::<f32, 1>::from_size_val(img.size(), 0.0)?;
        window_sum(&img, &mut dst, 3)?;

        assert_eq!(*dst.get_pixel(0, 0, 0)?, 4.0);
        assert_eq!(*dst.get_pixel(1, 0, 0)?, 6.0);
        assert_eq!(*dst.get_pixel(1, 1, 0)?, 9.0);

        Ok(())
    }

    #[test]
    fn test_gaussian_blur_preserves_constant() -> Result<(), ImageError> {
        let img = Image::<f32, 1>::from_size_val([9, 9].into(), 2.0)?;
        let mut dst = Image::<f32, 1>::from_size_val(img.size(), 0.0)?;
        gaussian_blur(&img, &mut dst, (3, 3), (1.0, 1.0))?;
        assert_relative_eq!(*dst.get_pixel(4, 4, 0)?, 2.0, epsilon = 1e-5);
        Ok(())
    }

    #[test]
    fn test_sobel_gradients_ramp() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 5,
            height: 4,
        };
        // value = 2 * col + 3 * row
        let data = (0..size.height)
            .flat_map(|r| (0..size.width).map(move |c| (2 * c + 3 * r) as f32))
            .collect();
        let img = Image::<f32, 1>::new(size, data)?;

        let mut gx = Image::<f32, 1>::from_size_val(size, 0.0)?;
        let mut gy = Image::<f32, 1>::from_size_val(size, 0.0)?;
        sobel_gradients(&img, &mut gx, &mut gy)?;

        assert_relative_eq!(*gx.get_pixel(2, 1, 0)?, 2.0, epsilon = 1e-6);
        assert_relative_eq!(*gy.get_pixel(2, 1, 0)?, 3.0, epsilon = 1e-6);

        // replicated border halves the central difference
        assert_relative_eq!(*gx.get_pixel(0, 1, 0)?, 1.0, epsilon = 1e-6);
        assert_relative_eq!(*gy.get_pixel(2, 0, 0)?, 1.5, epsilon = 1e-6);

        Ok(())
    }

    #[test]
    fn test_sobel_gradients_size_mismatch() -> Result<(), ImageError> {
        let img = Image::<f32, 1>::from_size_val([3, 3].into(), 0.0)?;
        let mut gx = Image::<f32, 1>::from_size_val([3, 3].into(), 0.0)?;
        let mut gy = Image::<f32, 1>::from_size_val([2, 3].into(), 0.0)?;
        assert_eq!(
            sobel_gradients(&img, &mut gx, &mut gy),
            Err(ImageError::InvalidImageSize(3, 3, 2, 3))
        );
        Ok(())
    }
}
