use mosaic_image::{Image, ImageError, ImageSize};
use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

/// Crop an image to a specified region.
///
/// # Arguments
///
/// * `src` - The source image to crop.
/// * `dst` - The destination image to store the cropped image.
/// * `x` - The x-coordinate of the top-left corner of the region to crop.
/// * `y` - The y-coordinate of the top-left corner of the region to crop.
///
/// # Errors
///
/// Returns [`ImageError::InvalidImageSize`] when the region does not fit in `src`.
///
/// # Examples
///
/// ```rust
/// use mosaic_image::{Image, ImageSize};
/// use mosaic_imgproc::crop::crop_image;
///
/// let image = Image::<_, 1>::new(ImageSize { width: 4, height: 4 }, vec![
///     0u8, 1, 2, 3,
///     4u8, 5, 6, 7,
///     8u8, 9, 10, 11,
///     12u8, 13, 14, 15
/// ]).unwrap();
///
/// let mut cropped = Image::<_, 1>::from_size_val(ImageSize { width: 2, height: 2 }, 0u8).unwrap();
///
/// crop_image(&image, &mut cropped, 1, 1).unwrap();
///
/// assert_eq!(cropped.as_slice(), &[5u8, 6, 9, 10]);
/// ```
pub fn crop_image<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    x: usize,
    y: usize,
) -> Result<(), ImageError>
where
    T: Copy + Send + Sync,
{
    if x + dst.cols() > src.cols() || y + dst.rows() > src.rows() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            x + dst.cols(),
            y + dst.rows(),
        ));
    }

    let dst_cols = dst.cols();
    if dst_cols == 0 {
        return Ok(());
    }

    dst.as_slice_mut()
        .par_chunks_exact_mut(dst_cols * C)
        .enumerate()
        .for_each(|(i, dst_row)| {
            // get the slice at the top left corner
            let offset = (y + i) * src.cols() * C + x * C;
            let src_slice = &src.as_slice()[offset..offset + dst_cols * C];

            // copy the slice to the destination
            dst_row.copy_from_slice(src_slice);
        });

    Ok(())
}

/// Remove the leading and trailing rows and columns whose samples are all zero.
///
/// An image without any non-zero sample collapses to an empty image.
pub fn trim_zero_borders<T, const C: usize>(src: &Image<T, C>) -> Result<Image<T, C>, ImageError>
where
    T: Copy + Default + PartialEq + Send + Sync,
{
    let zero = T::default();
    let cols = src.cols();

    let mut bounds: Option<[usize; 4]> = None;
    for (r, row) in src.as_slice().chunks_exact((cols * C).max(1)).enumerate() {
        for (c, pixel) in row.chunks_exact(C).enumerate() {
            if pixel.iter().all(|v| *v == zero) {
                continue;
            }
            bounds = Some(match bounds {
                None => [c, r, c, r],
                Some([x0, y0, x1, y1]) => [x0.min(c), y0.min(r), x1.max(c), y1.max(r)],
            });
        }
    }

    let Some([x0, y0, x1, y1]) = bounds else {
        return Image::new(ImageSize::from([0, 0]), Vec::new());
    };

    let size = ImageSize {
        width: x1 - x0 + 1,
        height: y1 - y0 + 1,
    };
    let mut dst = Image::from_size_val(size, zero)?;
    crop_image(src, &mut dst, x0, y0)?;

    Ok(dst)
}
