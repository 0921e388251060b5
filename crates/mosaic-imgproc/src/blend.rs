use mosaic_image::{Image, ImageError};

use crate::parallel;

fn is_occupied(pixel: &[f32]) -> bool {
    pixel.iter().any(|&v| v != 0.0)
}

/// Columns `[left, right]` where the two images are cross-faded.
///
/// Measured on the middle row: `left` is the first column covered by `img2` and `right`
/// the last column covered by `img1`.
fn blend_margins<const C: usize>(
    img1: &Image<f32, C>,
    img2: &Image<f32, C>,
) -> Option<(usize, usize)> {
    let cols = img1.cols();
    let mid = img1.rows() / 2;
    let row1 = &img1.as_slice()[mid * cols * C..(mid + 1) * cols * C];
    let row2 = &img2.as_slice()[mid * cols * C..(mid + 1) * cols * C];

    let right = row1.chunks_exact(C).rposition(is_occupied)?;
    let left = row2.chunks_exact(C).position(is_occupied)?;

    Some((left, right))
}

/// Composite two images living on the same canvas with a linear cross-fade.
///
/// A pixel is occupied when any of its channels is non-zero. Inside the overlap band
/// `[left, right]` (see the margins below) pixels covered by both images are weighted with a
/// ramp going from 1 to 0 for `img1` and its complement for `img2`. Everywhere else the
/// pixel of `img1` is taken when occupied, then the one of `img2`, and zero otherwise.
///
/// The margins are read on the middle row: `left` is the first column covered by `img2`
/// and `right` the last column covered by `img1`. When `right < left` the images do not
/// overlap and the result is a plain composite.
///
/// # Arguments
///
/// * `img1` - The reference image warped into the canvas.
/// * `img2` - The image to add, warped into the same canvas.
///
/// # Errors
///
/// Returns [`ImageError::InvalidImageSize`] when the images differ in size.
pub fn linear_blend<const C: usize>(
    img1: &Image<f32, C>,
    img2: &Image<f32, C>,
) -> Result<Image<f32, C>, ImageError> {
    if img1.size() != img2.size() {
        return Err(ImageError::InvalidImageSize(
            img1.cols(),
            img1.rows(),
            img2.cols(),
            img2.rows(),
        ));
    }

    let mut dst = Image::from_size_val(img1.size(), 0.0f32)?;
    if img1.rows() == 0 || img1.cols() == 0 {
        return Ok(dst);
    }

    let band = blend_margins(img1, img2).filter(|(left, right)| left <= right);
    log::trace!("linear blend band {band:?}");

    parallel::par_iter_rows_two(img1, img2, &mut dst, |col, p1, p2, out| {
        let (occ1, occ2) = (is_occupied(p1), is_occupied(p2));

        match band {
            Some((left, right)) if occ1 && occ2 && (left..=right).contains(&col) => {
                let w1 = if right > left {
                    1.0 - (col - left) as f32 / (right - left) as f32
                } else {
                    1.0
                };
                let w2 = 1.0 - w1;
                for ((o, &a), &b) in out.iter_mut().zip(p1.iter()).zip(p2.iter()) {
                    *o = w1 * a + w2 * b;
                }
            }
            _ if occ1 => out.copy_from_slice(p1),
            _ if occ2 => out.copy_from_slice(p2),
            _ => {}
        }
    });

    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mosaic_image::ImageSize;

    fn strip(cols: usize, range: std::ops::Range<usize>, value: f32) -> Image<f32, 1> {
        let size = ImageSize {
            width: cols,
            height: 3,
        };
        let data = (0..size.area())
            .map(|i| {
                if range.contains(&(i % cols)) {
                    value
                } else {
                    0.0
                }
            })
            .collect();
        Image::new(size, data).unwrap()
    }

    #[test]
    fn linear_blend_ramp() -> Result<(), ImageError> {
        let img1 = strip(7, 0..5, 10.0);
        let img2 = strip(7, 1..7, 20.0);

        let merged = linear_blend(&img1, &img2)?;

        // band is [1, 4]
        let expected = [10.0, 10.0, 13.333333, 16.666666, 20.0, 20.0, 20.0];
        for (col, e) in expected.iter().enumerate() {
            assert_relative_eq!(*merged.get_pixel(col, 1, 0)?, *e, epsilon = 1e-4);
        }

        Ok(())
    }

    #[test]
    fn linear_blend_midpoint_is_average() -> Result<(), ImageError> {
        let img1 = strip(11, 0..8, 40.0);
        let img2 = strip(11, 2..11, 100.0);
        let merged = linear_blend(&img1, &img2)?;
        // band [2, 7], midpoint 4.5 falls between columns, check the symmetric pair
        let a = *merged.get_pixel(4, 0, 0)?;
        let b = *merged.get_pixel(5, 0, 0)?;
        assert_relative_eq!(a + b, 140.0, epsilon = 1e-4);
        Ok(())
    }

    #[test]
    fn linear_blend_disjoint() -> Result<(), ImageError> {
        let img1 = strip(6, 0..2, 1.0);
        let img2 = strip(6, 4..6, 2.0);
        let merged = linear_blend(&img1, &img2)?;
        assert_eq!(
            &merged.as_slice()[6..12],
            &[1.0, 1.0, 0.0, 0.0, 2.0, 2.0]
        );
        Ok(())
    }

    #[test]
    fn linear_blend_any_channel_occupies() -> Result<(), ImageError> {
        let img1 = Image::<f32, 2>::new([2, 1].into(), vec![0.0, 3.0, 0.0, 0.0])?;
        let img2 = Image::<f32, 2>::new([2, 1].into(), vec![0.0, 0.0, 5.0, 0.0])?;
        let merged = linear_blend(&img1, &img2)?;
        assert_eq!(merged.as_slice(), &[0.0, 3.0, 5.0, 0.0]);
        Ok(())
    }

    #[test]
    fn linear_blend_size_mismatch() -> Result<(), ImageError> {
        let img1 = Image::<f32, 1>::from_size_val([2, 2].into(), 1.0)?;
        let img2 = Image::<f32, 1>::from_size_val([3, 2].into(), 1.0)?;
        assert_eq!(
            linear_blend(&img1, &img2),
            Err(ImageError::InvalidImageSize(2, 2, 3, 2))
        );
        Ok(())
    }
}
