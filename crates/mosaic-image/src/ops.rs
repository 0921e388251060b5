use crate::{Image, ImageError};

/// Convert a floating point image into 8-bit samples, rounding and saturating.
pub fn quantize_u8<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<u8, C>,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.width(),
            src.height(),
            dst.width(),
            dst.height(),
        ));
    }

    dst.as_slice_mut()
        .iter_mut()
        .zip(src.as_slice().iter())
        .for_each(|(out, &inp)| *out = inp.round().clamp(0.0, 255.0) as u8);

    Ok(())
}
