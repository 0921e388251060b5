use mosaic_geometry::RansacParams;
use mosaic_imgproc::{
    features::{DescriptorKind, HarrisParams},
    interpolation::InterpolationMode,
};

use crate::StitchError;

/// Parameters of the stitching pipeline.
///
/// Every field has a default, so a partial JSON document is enough to override a few of
/// them:
///
/// ```
/// use mosaic_stitch::StitchConfig;
///
/// let config: StitchConfig = serde_json::from_str(r#"{ "ratio": 0.8, "seed": 3 }"#).unwrap();
/// assert_eq!(config.ratio, 0.8);
/// assert_eq!(config.patch_size, 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    /// Harris corner response parameters.
    pub harris: HarrisParams,
    /// Minimum peak value relative to the strongest response of the image.
    pub threshold_rel: f32,
    /// Width of the band along the borders where no keypoint is reported.
    pub border_margin: usize,
    /// Descriptor computed around each keypoint.
    pub descriptor: DescriptorKind,
    /// Side of the descriptor patch.
    pub patch_size: usize,
    /// Ratio test threshold of the matcher.
    pub ratio: f32,
    /// Robust estimator parameters.
    pub ransac: RansacParams,
    /// Seed of the random generator; pair `k` uses `seed + k`.
    pub seed: u64,
    /// Resampling used when warping the images onto the panorama.
    pub interpolation: InterpolationMode,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            harris: HarrisParams::default(),
            threshold_rel: 0.05,
            border_margin: 8,
            descriptor: DescriptorKind::NormalizedPatch,
            patch_size: 5,
            ratio: 0.7,
            ransac: RansacParams::default(),
            seed: 0,
            interpolation: InterpolationMode::Bilinear,
        }
    }
}

impl StitchConfig {
    /// Check the parameters that the stages cannot check on their own.
    ///
    /// Keypoints are only reported `border_margin` pixels away from the borders, which must
    /// leave room for half a descriptor patch.
    pub fn validate(&self) -> Result<(), StitchError> {
        if self.patch_size == 0 {
            return Err(StitchError::InvalidConfig(
                "patch_size must be greater than zero".into(),
            ));
        }
        if self.border_margin < self.patch_size / 2 {
            return Err(StitchError::InvalidConfig(format!(
                "border_margin {} is smaller than half the patch size {}",
                self.border_margin, self.patch_size
            )));
        }
        if !(self.threshold_rel >= 0.0) || !self.threshold_rel.is_finite() {
            return Err(StitchError::InvalidConfig(format!(
                "threshold_rel must be a non-negative number, got {}",
                self.threshold_rel
            )));
        }
        if !(self.ratio > 0.0 && self.ratio <= 1.0) {
            return Err(StitchError::InvalidConfig(format!(
                "ratio must be in (0, 1], got {}",
                self.ratio
            )));
        }
        Ok(())
    }
}
