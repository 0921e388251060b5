//! Robust homography estimation with random sample consensus.

use mosaic_imgproc::features::{FeatureMatch, Keypoint};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;

use crate::{estimate_homography, Homography, HomographyError};

const MIN_CORRESPONDENCES: usize = 4;

/// Parameters of the RANSAC homography estimator.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RansacParams {
    /// Fraction of the matches drawn for every trial.
    ///
    /// A trial draws `max(4, round(sample_fraction * N))` of the `N` matches, so a fraction
    /// of zero draws minimal samples.
    pub sample_fraction: f64,
    /// Number of trials.
    pub max_iterations: usize,
    /// Squared reprojection error in pixels below which a match is an inlier.
    pub inlier_threshold: f64,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            sample_fraction: 0.5,
            max_iterations: 500,
            inlier_threshold: 20.0,
        }
    }
}

impl RansacParams {
    fn validate(&self) -> Result<(), HomographyError> {
        if !(self.sample_fraction >= 0.0) || !self.sample_fraction.is_finite() {
            return Err(HomographyError::InvalidParams(format!(
                "sample_fraction must be a non-negative number, got {}",
                self.sample_fraction
            )));
        }
        if self.max_iterations == 0 {
            return Err(HomographyError::InvalidParams(
                "max_iterations must be greater than zero".into(),
            ));
        }
        if !(self.inlier_threshold > 0.0) {
            return Err(HomographyError::InvalidParams(format!(
                "inlier_threshold must be positive, got {}",
                self.inlier_threshold
            )));
        }
        Ok(())
    }

    /// Number of matches drawn per trial out of `n`.
    pub fn sample_size(&self, n: usize) -> usize {
        ((self.sample_fraction * n as f64).round() as usize).max(MIN_CORRESPONDENCES)
    }
}

/// Outcome of a RANSAC run.
#[derive(Debug, Clone, PartialEq)]
pub struct RansacResult {
    /// The homography refitted on all the inliers, mapping the second keypoint set into
    /// the frame of the first one.
    pub homography: Homography,
    /// The matches consistent with the winning trial, in input order.
    pub inliers: Vec<FeatureMatch>,
    /// Index of the winning trial.
    pub best_trial: usize,
}

fn is_inlier(h: &Homography, src: &[f64; 2], dst: &[f64; 2], threshold: f64) -> bool {
    match h.transform_point(src) {
        Some(p) => (p[0] - dst[0]).powi(2) + (p[1] - dst[1]).powi(2) < threshold,
        None => false,
    }
}

fn gather(keypoints: &[Keypoint], index: usize) -> Result<[f64; 2], HomographyError> {
    keypoints
        .get(index)
        .map(Keypoint::xy)
        .ok_or(HomographyError::IndexOutOfBounds {
            index,
            len: keypoints.len(),
        })
}

/// Robustly estimate the homography mapping `keypoints2` into the frame of `keypoints1`.
///
/// Every match `m` pairs `keypoints1[m.i]` with `keypoints2[m.j]`; keypoints are used as
/// `[x, y] = [col, row]`. Each trial fits [`estimate_homography`] on
/// `max(4, round(sample_fraction * N))` matches drawn uniformly with replacement and counts
/// the matches whose squared reprojection error is below the threshold. The trial with the
/// most inliers wins, the earliest one on ties, and the model is refitted on its inliers.
///
/// All the samples are drawn from `rng` up front and the trials are then evaluated in
/// parallel, so the result only depends on the state of `rng`.
///
/// # Errors
///
/// * [`HomographyError::InsufficientFeatures`] with fewer than 4 matches or 4 inliers.
/// * [`HomographyError::NoInliersFound`] when no trial explains any match.
/// * [`HomographyError::DegenerateGeometry`] when the refitted model is singular.
/// * [`HomographyError::IndexOutOfBounds`] for a match referring to a missing keypoint.
/// * [`HomographyError::InvalidParams`] for invalid parameters.
pub fn ransac<R: Rng + ?Sized>(
    keypoints1: &[Keypoint],
    keypoints2: &[Keypoint],
    matches: &[FeatureMatch],
    params: &RansacParams,
    rng: &mut R,
) -> Result<RansacResult, HomographyError> {
    params.validate()?;

    let n = matches.len();
    if n < MIN_CORRESPONDENCES {
        return Err(HomographyError::InsufficientFeatures {
            required: MIN_CORRESPONDENCES,
            actual: n,
        });
    }

    let mut src = Vec::with_capacity(n);
    let mut dst = Vec::with_capacity(n);
    for m in matches {
        dst.push(gather(keypoints1, m.i)?);
        src.push(gather(keypoints2, m.j)?);
    }

    // draw every trial sample before scoring so that the outcome is scheduling independent
    let sample_size = params.sample_size(n);
    let samples: Vec<Vec<usize>> = (0..params.max_iterations)
        .map(|_| (0..sample_size).map(|_| rng.random_range(0..n)).collect())
        .collect();

    let trials: Vec<Option<(usize, Homography)>> = samples
        .par_iter()
        .enumerate()
        .map(|(trial, sample)| {
            let s: Vec<[f64; 2]> = sample.iter().map(|&k| src[k]).collect();
            let d: Vec<[f64; 2]> = sample.iter().map(|&k| dst[k]).collect();
            match estimate_homography(&s, &d) {
                Ok(h) => {
                    let count = src
                        .iter()
                        .zip(dst.iter())
                        .filter(|(ps, pd)| is_inlier(&h, ps, pd, params.inlier_threshold))
                        .count();
                    Some((count, h))
                }
                Err(err) => {
                    log::trace!("ransac trial {trial} skipped: {err}");
                    None
                }
            }
        })
        .collect();

    let skipped = trials.iter().filter(|t| t.is_none()).count();
    if skipped > 0 {
        log::warn!(
            "{skipped} of {} ransac trials skipped on degenerate samples",
            trials.len()
        );
    }

    let mut best: Option<(usize, usize, Homography)> = None;
    for (trial, (count, h)) in trials
        .into_iter()
        .enumerate()
        .filter_map(|(t, r)| r.map(|r| (t, r)))
    {
        if count > best.as_ref().map_or(0, |b| b.1) {
            best = Some((trial, count, h));
        }
    }

    let Some((best_trial, best_count, best_h)) = best else {
        return Err(HomographyError::NoInliersFound(params.max_iterations));
    };

    let inlier_idx: Vec<usize> = (0..n)
        .filter(|&k| is_inlier(&best_h, &src[k], &dst[k], params.inlier_threshold))
        .collect();

    if inlier_idx.len() < MIN_CORRESPONDENCES {
        return Err(HomographyError::InsufficientFeatures {
            required: MIN_CORRESPONDENCES,
            actual: inlier_idx.len(),
        });
    }

    let s: Vec<[f64; 2]> = inlier_idx.iter().map(|&k| src[k]).collect();
    let d: Vec<[f64; 2]> = inlier_idx.iter().map(|&k| dst[k]).collect();
    let homography = estimate_homography(&s, &d)?;
    if homography.is_singular() {
        return Err(HomographyError::DegenerateGeometry(
            "the refitted homography is singular".into(),
        ));
    }

    log::debug!(
        "ransac: trial {best_trial} won with {best_count} of {n} inliers (sample size {sample_size})"
    );

    Ok(RansacResult {
        homography,
        inliers: inlier_idx.iter().map(|&k| matches[k]).collect(),
        best_trial,
    })
}

/// Run [`ransac`] with a random generator seeded from `seed`.
pub fn ransac_seeded(
    keypoints1: &[Keypoint],
    keypoints2: &[Keypoint],
    matches: &[FeatureMatch],
    params: &RansacParams,
    seed: u64,
) -> Result<RansacResult, HomographyError> {
    let mut rng = StdRng::seed_from_u64(seed);
    ransac(keypoints1, keypoints2, matches, params, &mut rng)
}
