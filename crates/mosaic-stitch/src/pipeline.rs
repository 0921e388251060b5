use std::time::Instant;

use mosaic_geometry::{ransac_seeded, Homography};
use mosaic_image::{ops::quantize_u8, Image, ImageSize};
use mosaic_imgproc::{
    blend::linear_blend,
    color::gray_from_channels,
    features::{
        corner_peaks, describe_keypoints, harris_response, match_descriptors, FeatureError,
        FeatureMatch, Keypoint,
    },
    warp::{output_space, warp_perspective},
};
use rayon::prelude::*;

use crate::{RegistrationError, Stage, StageEvent, StageObserver, StitchConfig, StitchError};

/// Keypoints of one image and their descriptors, `descriptors[k]` describing `keypoints[k]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFeatures {
    /// The detected keypoints in row-major order.
    pub keypoints: Vec<Keypoint>,
    /// One descriptor per keypoint.
    pub descriptors: Vec<Vec<f32>>,
}

/// The registration of two adjacent images of a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct PairRegistration {
    /// Maps the pixels of the second image into the frame of the first one.
    pub homography: Homography,
    /// The matches that passed the ratio test.
    pub matches: Vec<FeatureMatch>,
    /// The matches consistent with the homography.
    pub inliers: Vec<FeatureMatch>,
}

/// Runs the stages and reports them to the optional observer.
struct Runner<'a> {
    config: &'a StitchConfig,
    observer: Option<&'a dyn StageObserver>,
}

impl Runner<'_> {
    fn timed<T>(
        &self,
        stage: Stage,
        image: Option<usize>,
        pair: Option<usize>,
        f: impl FnOnce() -> T,
    ) -> T {
        let start = Instant::now();
        let out = f();
        if let Some(observer) = self.observer {
            observer.on_stage(&StageEvent {
                stage,
                image,
                pair,
                elapsed: start.elapsed(),
            });
        }
        out
    }

    fn features<const C: usize>(
        &self,
        image: &Image<u8, C>,
        index: usize,
    ) -> Result<ImageFeatures, StitchError> {
        let failed = |stage: Stage| {
            move |source: FeatureError| StitchError::Features {
                stage,
                image: index,
                source,
            }
        };

        let (gray, keypoints) = self
            .timed(Stage::Detect, Some(index), None, || detect(image, self.config))
            .map_err(failed(Stage::Detect))?;

        let descriptors = self
            .timed(Stage::Describe, Some(index), None, || {
                describe_keypoints(
                    &gray,
                    &keypoints,
                    self.config.descriptor,
                    self.config.patch_size,
                )
            })
            .map_err(failed(Stage::Describe))?;

        log::debug!("image {index}: {} keypoints", keypoints.len());

        Ok(ImageFeatures {
            keypoints,
            descriptors,
        })
    }

    fn register(
        &self,
        features1: &ImageFeatures,
        features2: &ImageFeatures,
        pair: usize,
    ) -> Result<PairRegistration, StitchError> {
        let failed = |stage: Stage| {
            move |source: RegistrationError| StitchError::Registration {
                stage,
                pair,
                source,
            }
        };

        let matches = self
            .timed(Stage::Match, None, Some(pair), || {
                match_descriptors(
                    &features1.descriptors,
                    &features2.descriptors,
                    self.config.ratio,
                )
            })
            .map_err(|e| failed(Stage::Match)(e.into()))?;

        let result = self
            .timed(Stage::Ransac, None, Some(pair), || {
                ransac_seeded(
                    &features1.keypoints,
                    &features2.keypoints,
                    &matches,
                    &self.config.ransac,
                    self.config.seed.wrapping_add(pair as u64),
                )
            })
            .map_err(|e| failed(Stage::Ransac)(e.into()))?;

        log::info!(
            "pair {pair}: {} matches, {} inliers",
            matches.len(),
            result.inliers.len()
        );

        Ok(PairRegistration {
            homography: result.homography,
            matches,
            inliers: result.inliers,
        })
    }

    fn stitch<const C: usize>(
        &self,
        images: &[Image<u8, C>],
    ) -> Result<Image<u8, C>, StitchError> {
        self.config.validate()?;

        let Some(first) = images.first() else {
            return Err(StitchError::EmptyChain);
        };
        if images.len() == 1 {
            return Ok(first.clone());
        }

        // results are gathered in chain order so the first failing image or link is reported
        let features = images
            .par_iter()
            .enumerate()
            .map(|(index, image)| self.features(image, index))
            .collect::<Vec<_>>()
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        let registrations = features
            .par_windows(2)
            .enumerate()
            .map(|(pair, w)| self.register(&w[0], &w[1], pair))
            .collect::<Vec<_>>()
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        // G_0 = I, G_{k+1} = G_k * H_k takes image k + 1 into the frame of image 0
        let to_reference = self.timed(Stage::Compose, None, None, || {
            let mut chain = Vec::with_capacity(images.len());
            chain.push(Homography::identity());
            for (pair, registration) in registrations.iter().enumerate() {
                let previous = chain[pair];
                let next = previous
                    .compose(&registration.homography)
                    .map_err(|e| StitchError::Registration {
                        stage: Stage::Compose,
                        pair,
                        source: e.into(),
                    })?;
                chain.push(next);
            }
            Ok::<_, StitchError>(chain)
        })?;

        let matrices: Vec<[f64; 9]> = to_reference
            .iter()
            .map(Homography::to_row_major)
            .collect();
        let space = output_space(images.iter().map(|img| img.size()).zip(matrices.iter()))?;
        let shift = Homography::translation(space.offset[0], space.offset[1]);

        log::info!(
            "stitching {} images into a {} canvas",
            images.len(),
            space.size
        );

        let mut panorama: Option<Image<f32, C>> = None;
        for (index, (image, g)) in images.iter().zip(to_reference.iter()).enumerate() {
            let m = shift
                .compose(g)
                .map_err(|e| StitchError::Registration {
                    stage: Stage::Warp,
                    pair: index.saturating_sub(1),
                    source: e.into(),
                })?
                .to_row_major_f32();

            let warped = self.timed(Stage::Warp, Some(index), None, || {
                warp_onto(image, space.size, &m, self.config)
            })?;

            panorama = Some(match panorama {
                None => warped,
                Some(acc) => {
                    self.timed(Stage::Blend, Some(index), None, || linear_blend(&acc, &warped))?
                }
            });
        }

        // the chain holds at least two images here
        let panorama = panorama.ok_or(StitchError::EmptyChain)?;
        let mut out = Image::from_size_val(panorama.size(), 0u8)?;
        quantize_u8(&panorama, &mut out)?;

        Ok(out)
    }
}

fn detect<const C: usize>(
    image: &Image<u8, C>,
    config: &StitchConfig,
) -> Result<(Image<f32, 1>, Vec<Keypoint>), FeatureError> {
    let mut gray = Image::from_size_val(image.size(), 0.0f32)?;
    gray_from_channels(image, &mut gray)?;

    let mut response = Image::from_size_val(image.size(), 0.0f32)?;
    harris_response(&gray, &mut response, &config.harris)?;

    let keypoints = corner_peaks(&response, config.threshold_rel, config.border_margin);

    Ok((gray, keypoints))
}

fn warp_onto<const C: usize>(
    image: &Image<u8, C>,
    size: ImageSize,
    m: &[f32; 9],
    config: &StitchConfig,
) -> Result<Image<f32, C>, StitchError> {
    let src = image.cast::<f32>()?;
    let mut dst = Image::from_size_val(size, 0.0f32)?;
    warp_perspective(&src, &mut dst, m, config.interpolation)?;
    Ok(dst)
}

/// Detect and describe the keypoints of one image.
///
/// The image is converted to a grayscale image in `[0, 1]`, then keypoints are the peaks of
/// its Harris response and each one is described from the patch around it.
pub fn extract_features<const C: usize>(
    image: &Image<u8, C>,
    config: &StitchConfig,
) -> Result<ImageFeatures, FeatureError> {
    let (gray, keypoints) = detect(image, config)?;
    let descriptors = describe_keypoints(&gray, &keypoints, config.descriptor, config.patch_size)?;
    Ok(ImageFeatures {
        keypoints,
        descriptors,
    })
}

/// Register two adjacent images of a chain from their features.
///
/// The descriptors are matched with the ratio test and the homography taking `features2`
/// into the frame of `features1` is estimated with RANSAC, seeded with `config.seed + pair`.
///
/// # Errors
///
/// Returns [`StitchError::Registration`] when matching or the robust estimation fails, for
/// instance with fewer than 4 matches.
pub fn register_pair(
    features1: &ImageFeatures,
    features2: &ImageFeatures,
    config: &StitchConfig,
    pair: usize,
) -> Result<PairRegistration, StitchError> {
    Runner {
        config,
        observer: None,
    }
    .register(features1, features2, pair)
}

/// Stitch a chain of overlapping images into a panorama.
///
/// Image `k + 1` must overlap image `k`. Every image is registered against its predecessor,
/// the pairwise homographies are chained into the frame of the first image and the images
/// are warped onto a canvas covering all of them, then blended one at a time in chain
/// order. A single image is returned unchanged.
///
/// # Arguments
///
/// * `images` - The images, ordered along the chain.
/// * `config` - The pipeline parameters.
///
/// # Errors
///
/// * [`StitchError::EmptyChain`] when no image is given.
/// * [`StitchError::Features`] when an image cannot be described.
/// * [`StitchError::Registration`] when a pair cannot be registered, which aborts the
///   whole chain.
/// * [`StitchError::InvalidConfig`] for inconsistent parameters.
pub fn stitch<const C: usize>(
    images: &[Image<u8, C>],
    config: &StitchConfig,
) -> Result<Image<u8, C>, StitchError> {
    Stitcher::new(*config).stitch(images)
}

/// A configured stitching pipeline with an optional stage observer.
///
/// # Example
///
/// ```no_run
/// use mosaic_image::Image;
/// use mosaic_stitch::{LogObserver, StitchConfig, Stitcher};
///
/// # fn run(images: Vec<Image<u8, 3>>) -> Result<(), mosaic_stitch::StitchError> {
/// let stitcher = Stitcher::new(StitchConfig::default())
///     .with_seed(42)
///     .with_observer(LogObserver);
/// let panorama = stitcher.stitch(&images)?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Stitcher {
    config: StitchConfig,
    observer: Option<Box<dyn StageObserver>>,
}

impl Stitcher {
    /// Create a stitcher from its configuration.
    pub fn new(config: StitchConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    /// Set the seed of the robust estimation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Report every completed stage to `observer`.
    pub fn with_observer(mut self, observer: impl StageObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// The configuration of the pipeline.
    pub fn config(&self) -> &StitchConfig {
        &self.config
    }

    /// Stitch a chain of images, see [`stitch`].
    pub fn stitch<const C: usize>(
        &self,
        images: &[Image<u8, C>],
    ) -> Result<Image<u8, C>, StitchError> {
        Runner {
            config: &self.config,
            observer: self.observer.as_deref(),
        }
        .stitch(images)
    }
}

impl std::fmt::Debug for Stitcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stitcher")
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
