use rayon::prelude::*;

use super::FeatureError;

/// A correspondence between descriptor `i` of the first set and `j` of the second set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureMatch {
    /// Index into the first descriptor set.
    pub i: usize,
    /// Index into the second descriptor set.
    pub j: usize,
    /// Euclidean distance between the two descriptors.
    pub distance: f32,
}

#[inline]
fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

fn check_lengths<D: AsRef<[f32]>>(
    expected: usize,
    descriptors: &[D],
) -> Result<(), FeatureError> {
    match descriptors
        .iter()
        .map(|d| d.as_ref().len())
        .find(|&len| len != expected)
    {
        Some(found) => Err(FeatureError::DimensionMismatch { expected, found }),
        None => Ok(()),
    }
}

/// Match descriptors by nearest neighbour with Lowe's ratio test.
///
/// For each descriptor `a[i]` the closest descriptor `b[j]` (first index on ties) at distance
/// `d1` is compared with the second closest distance `d2` over the remaining descriptors,
/// `+inf` when `b` has a single element. The match is kept when `d1 / d2 < ratio`.
///
/// # Arguments
///
/// * `a` - First set of descriptors.
/// * `b` - Second set of descriptors.
/// * `ratio` - Ratio test threshold in `(0, 1]`. Smaller values keep fewer matches.
///
/// # Returns
///
/// At most one match per descriptor of `a`, ordered by `i`.
///
/// # Errors
///
/// Returns [`FeatureError::InvalidRatio`] for a ratio outside `(0, 1]` and
/// [`FeatureError::DimensionMismatch`] when the descriptors differ in length.
pub fn match_descriptors<D>(
    a: &[D],
    b: &[D],
    ratio: f32,
) -> Result<Vec<FeatureMatch>, FeatureError>
where
    D: AsRef<[f32]> + Sync,
{
    if !(ratio > 0.0 && ratio <= 1.0) {
        return Err(FeatureError::InvalidRatio(ratio));
    }

    let Some(first) = a.first().or_else(|| b.first()) else {
        return Ok(vec![]);
    };
    let dim = first.as_ref().len();
    check_lengths(dim, a)?;
    check_lengths(dim, b)?;

    if a.is_empty() || b.is_empty() {
        return Ok(vec![]);
    }

    let matches: Vec<FeatureMatch> = a
        .par_iter()
        .enumerate()
        .filter_map(|(i, da)| {
            let da = da.as_ref();

            let mut best = (0, f32::INFINITY);
            let mut second = f32::INFINITY;
            for (j, db) in b.iter().enumerate() {
                let dist = euclidean_distance(da, db.as_ref());
                if dist < best.1 {
                    second = best.1;
                    best = (j, dist);
                } else if dist < second {
                    second = dist;
                }
            }

            // 0 / 0 is NaN and never passes
            (best.1 / second < ratio).then_some(FeatureMatch {
                i,
                j: best.0,
                distance: best.1,
            })
        })
        .collect();

    log::debug!(
        "{} of {} descriptors matched with ratio {ratio}",
        matches.len(),
        a.len()
    );

    Ok(matches)
}
