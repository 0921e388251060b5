use mosaic_image::Image;
use rayon::prelude::*;

/// An integer pixel location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Keypoint {
    /// Row of the pixel.
    pub row: usize,
    /// Column of the pixel.
    pub col: usize,
}

impl Keypoint {
    /// Create a keypoint from its row and column.
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// The keypoint as an `[x, y]` point, x being the column.
    pub fn xy(&self) -> [f64; 2] {
        [self.col as f64, self.row as f64]
    }
}

/// Find the local maxima of a response map.
///
/// A pixel is kept when its value strictly exceeds `threshold_rel * max(response)` and it is
/// the maximum of its 3x3 neighbourhood. On plateaus the first pixel in row-major order
/// wins. Pixels closer than `border_margin` to any border are never reported.
///
/// # Arguments
///
/// * `response` - The response map, e.g. from [`super::harris_response`].
/// * `threshold_rel` - Minimum value relative to the strongest response.
/// * `border_margin` - Width of the excluded band along every border.
///
/// # Returns
///
/// The keypoints in row-major order. Empty when the map is empty or its maximum is not
/// positive.
pub fn corner_peaks(
    response: &Image<f32, 1>,
    threshold_rel: f32,
    border_margin: usize,
) -> Vec<Keypoint> {
    let (rows, cols) = (response.rows(), response.cols());
    let data = response.as_slice();

    let max = data.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !(max > 0.0) || !max.is_finite() {
        return vec![];
    }
    let threshold = threshold_rel * max;

    if rows <= 2 * border_margin || cols <= 2 * border_margin {
        return vec![];
    }

    let is_peak = |r: usize, c: usize| -> bool {
        let v = data[r * cols + c];
        if !(v > threshold) {
            return false;
        }
        for nr in r.saturating_sub(1)..=(r + 1).min(rows - 1) {
            for nc in c.saturating_sub(1)..=(c + 1).min(cols - 1) {
                let n = data[nr * cols + nc];
                let before = (nr, nc) < (r, c);
                if (before && n >= v) || (!before && n > v) {
                    return false;
                }
            }
        }
        true
    };

    let keypoints: Vec<Keypoint> = (border_margin..rows - border_margin)
        .into_par_iter()
        .flat_map_iter(|r| {
            (border_margin..cols - border_margin)
                .filter(move |&c| is_peak(r, c))
                .map(move |c| Keypoint::new(r, c))
        })
        .collect();

    log::debug!(
        "{} peaks above {threshold} in a {cols}x{rows} response",
        keypoints.len()
    );

    keypoints
}
