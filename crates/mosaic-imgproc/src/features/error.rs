use mosaic_image::ImageError;

/// An error type for the feature detection, description and matching operations.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FeatureError {
    /// The patch around a keypoint does not fit inside the image.
    #[error("Patch of size {patch_size} around keypoint ({row}, {col}) is out of the image bounds")]
    OutOfBounds {
        /// Row of the keypoint.
        row: usize,
        /// Column of the keypoint.
        col: usize,
        /// Side of the square patch.
        patch_size: usize,
    },

    /// Two descriptors have different lengths.
    #[error("Descriptor length mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Length of the first descriptor.
        expected: usize,
        /// Length of the offending descriptor.
        found: usize,
    },

    /// The patch size is zero.
    #[error("The patch size must be greater than zero")]
    InvalidPatchSize,

    /// The ratio test threshold is outside `(0, 1]`.
    #[error("The ratio test threshold must be in (0, 1], got {0}")]
    InvalidRatio(f32),

    /// The window size is zero or even.
    #[error("The window size must be odd and non-zero, got {0}")]
    InvalidWindowSize(usize),

    /// Error from the underlying image operations.
    #[error(transparent)]
    Image(#[from] ImageError),
}
