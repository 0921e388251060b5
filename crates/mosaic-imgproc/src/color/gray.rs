use crate::parallel;
use mosaic_image::{Image, ImageError};

/// Define the RGB weights for the grayscale conversion.
const RW: f64 = 0.299;
const GW: f64 = 0.587;
const BW: f64 = 0.114;

/// Convert an 8-bit image with any number of channels to a grayscale intensity in `[0, 1]`.
///
/// Three channel images are weighted as RGB, `Y = 0.299 * R + 0.587 * G + 0.114 * B`;
/// any other channel count uses the mean of the channels.
///
/// Precondition: the input and output images must have the same size.
pub fn gray_from_channels<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<f32, 1>,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let weights: [f32; C] = if C == 3 {
        std::array::from_fn(|i| [RW, GW, BW][i] as f32)
    } else {
        [1.0 / C as f32; C]
    };

    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        let y = src_pixel
            .iter()
            .zip(weights.iter())
            .map(|(&v, &w)| v as f32 * w)
            .sum::<f32>();
        dst_pixel[0] = y / 255.0;
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mosaic_image::ImageSize;

    #[test]
    fn test_gray_from_channels() -> Result<(), ImageError> {
        let rgb = Image::<u8, 3>::new([2, 1].into(), vec![255, 255, 255, 0, 255, 0])?;
        let mut gray = Image::<f32, 1>::from_size_val(rgb.size(), 0.0)?;
        gray_from_channels(&rgb, &mut gray)?;
        assert_relative_eq!(gray.as_slice()[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(gray.as_slice()[1], 0.587, epsilon = 1e-6);

        let mono = Image::<u8, 1>::new([2, 1].into(), vec![0, 51])?;
        gray_from_channels(&mono, &mut gray)?;
        assert_relative_eq!(gray.as_slice()[1], 0.2, epsilon = 1e-6);

        let two = Image::<u8, 2>::new([1, 1].into(), vec![100, 200])?;
        let mut gray_one = Image::<f32, 1>::from_size_val(two.size(), 0.0)?;
        gray_from_channels(&two, &mut gray_one)?;
        assert_relative_eq!(gray_one.as_slice()[0], 150.0 / 255.0, epsilon = 1e-6);

        Ok(())
    }
}
