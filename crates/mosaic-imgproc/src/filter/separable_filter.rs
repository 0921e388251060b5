use mosaic_image::{Image, ImageError};
use rayon::prelude::*;

/// A separable 2D filter that applies horizontal and vertical 1D convolutions sequentially.
///
/// Samples falling outside the image contribute zero.
struct SeparableFilter<'a> {
    kernel_x: &'a [f32],
    kernel_y: &'a [f32],
    offsets_x: Vec<isize>,
    offsets_y: Vec<isize>,
}

impl<'a> SeparableFilter<'a> {
    fn new(kernel_x: &'a [f32], kernel_y: &'a [f32]) -> Self {
        let half_x = (kernel_x.len() / 2) as isize;
        let half_y = (kernel_y.len() / 2) as isize;

        Self {
            kernel_x,
            kernel_y,
            offsets_x: (0..kernel_x.len()).map(|i| i as isize - half_x).collect(),
            offsets_y: (0..kernel_y.len()).map(|i| i as isize - half_y).collect(),
        }
    }

    fn apply<const C: usize>(&self, src: &Image<f32, C>, dst: &mut Image<f32, C>) {
        let rows = src.rows();
        let cols = src.cols();
        if rows == 0 || cols == 0 {
            return;
        }

        let src_data = src.as_slice();
        let mut temp = vec![0.0f32; src_data.len()];

        // Horizontal
        temp.par_chunks_mut(cols * C)
            .enumerate()
            .for_each(|(r, row_temp)| {
                let row_offset = r * cols * C;
                for c in 0..cols {
                    let mut acc = [0.0f32; C];
                    for (&k, &off) in self.kernel_x.iter().zip(self.offsets_x.iter()) {
                        let x = c as isize + off;
                        if x >= 0 && x < cols as isize {
                            let idx = row_offset + x as usize * C;
                            for (ch, acc_val) in acc.iter_mut().enumerate() {
                                *acc_val += src_data[idx + ch] * k;
                            }
                        }
                    }
                    row_temp[c * C..(c + 1) * C].copy_from_slice(&acc);
                }
            });

        // Vertical
        dst.as_slice_mut()
            .par_chunks_mut(cols * C)
            .enumerate()
            .for_each(|(r, row_dst)| {
                for c in 0..cols {
                    let mut acc = [0.0f32; C];
                    for (&k, &off) in self.kernel_y.iter().zip(self.offsets_y.iter()) {
                        let y = r as isize + off;
                        if y >= 0 && y < rows as isize {
                            let idx = y as usize * cols * C + c * C;
                            for (ch, acc_val) in acc.iter_mut().enumerate() {
                                *acc_val += temp[idx + ch] * k;
                            }
                        }
                    }
                    row_dst[c * C..(c + 1) * C].copy_from_slice(&acc);
                }
            });
    }
}

/// Apply a separable filter to an image.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_x` - The horizontal kernel.
/// * `kernel_y` - The vertical kernel.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn separable_filter<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_x: &[f32],
    kernel_y: &[f32],
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    SeparableFilter::new(kernel_x, kernel_y).apply(src, dst);

    Ok(())
}
