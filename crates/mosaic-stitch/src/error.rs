use mosaic_geometry::HomographyError;
use mosaic_image::ImageError;
use mosaic_imgproc::features::FeatureError;

use crate::Stage;

/// The cause of a failed registration between two adjacent images.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RegistrationError {
    /// The descriptors could not be matched.
    #[error(transparent)]
    Features(#[from] FeatureError),

    /// No usable homography could be estimated.
    #[error(transparent)]
    Homography(#[from] HomographyError),
}

/// An error type for the stitching pipeline.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum StitchError {
    /// No image was given.
    #[error("Cannot stitch an empty chain of images")]
    EmptyChain,

    /// Feature extraction failed on one image.
    #[error("Stage {stage} failed on image {image}")]
    Features {
        /// The failing stage.
        stage: Stage,
        /// Index of the image in the chain.
        image: usize,
        /// The underlying error.
        #[source]
        source: FeatureError,
    },

    /// Images `pair` and `pair + 1` could not be registered.
    #[error("Stage {stage} failed on pair {pair}")]
    Registration {
        /// The failing stage.
        stage: Stage,
        /// Index of the first image of the pair.
        pair: usize,
        /// The underlying error.
        #[source]
        source: RegistrationError,
    },

    /// Error from the image operations.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The pipeline configuration is inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
