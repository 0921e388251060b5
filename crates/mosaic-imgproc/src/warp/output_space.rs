use mosaic_image::{ImageError, ImageSize};

// absorbs round-off so that an exactly integer corner is not widened by one pixel
const EXTENT_EPS: f64 = 1e-6;

/// The canvas holding a set of images warped into a common reference frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputSpace {
    /// Size of the canvas in pixels.
    pub size: ImageSize,
    /// Translation `[tx, ty]` moving reference coordinates onto the canvas.
    pub offset: [f64; 2],
}

/// Compute the smallest canvas covering every image once warped into the reference frame.
///
/// Each image contributes the pixel centres of its four corners, mapped through its
/// row-major 3x3 transform. The canvas spans the integer bounds of the union of those
/// points and the returned offset moves the top-left bound to the canvas origin.
///
/// # Arguments
///
/// * `frames` - Pairs of image size and transform into the reference frame.
///
/// # Errors
///
/// Returns [`ImageError::InvalidOutputSpace`] when no image has pixels or a corner is sent
/// to infinity.
pub fn output_space<'a>(
    frames: impl IntoIterator<Item = (ImageSize, &'a [f64; 9])>,
) -> Result<OutputSpace, ImageError> {
    let mut min = [f64::INFINITY; 2];
    let mut max = [f64::NEG_INFINITY; 2];

    for (size, m) in frames {
        if size.width == 0 || size.height == 0 {
            continue;
        }

        let (w, h) = ((size.width - 1) as f64, (size.height - 1) as f64);
        for [x, y] in [[0.0, 0.0], [w, 0.0], [0.0, h], [w, h]] {
            let z = m[6] * x + m[7] * y + m[8];
            let xt = (m[0] * x + m[1] * y + m[2]) / z;
            let yt = (m[3] * x + m[4] * y + m[5]) / z;
            if !xt.is_finite() || !yt.is_finite() {
                return Err(ImageError::InvalidOutputSpace(format!(
                    "corner ({x}, {y}) is mapped to infinity"
                )));
            }
            min = [min[0].min(xt), min[1].min(yt)];
            max = [max[0].max(xt), max[1].max(yt)];
        }
    }

    if !min[0].is_finite() {
        return Err(ImageError::InvalidOutputSpace("no image pixels".into()));
    }

    let x_min = (min[0] + EXTENT_EPS).floor();
    let y_min = (min[1] + EXTENT_EPS).floor();
    let x_max = (max[0] - EXTENT_EPS).ceil();
    let y_max = (max[1] - EXTENT_EPS).ceil();

    let size = ImageSize {
        width: (x_max - x_min) as usize + 1,
        height: (y_max - y_min) as usize + 1,
    };

    log::debug!("output space {size} with offset ({}, {})", -x_min, -y_min);

    Ok(OutputSpace {
        size,
        offset: [-x_min, -y_min],
    })
}
