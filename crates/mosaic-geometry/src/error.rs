/// An error type for the homography estimation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum HomographyError {
    /// Not enough correspondences to constrain a homography.
    #[error("At least {required} correspondences are required, got {actual}")]
    InsufficientFeatures {
        /// Minimum number of correspondences.
        required: usize,
        /// Number of correspondences available.
        actual: usize,
    },

    /// The point configuration does not determine a usable homography.
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// No trial model explained any correspondence.
    #[error("No inliers found after {0} trials")]
    NoInliersFound(usize),

    /// The source and destination point sets differ in length.
    #[error("Mismatched lengths: {src} source points and {dst} destination points")]
    MismatchedLengths {
        /// Number of source points.
        src: usize,
        /// Number of destination points.
        dst: usize,
    },

    /// A match refers to a keypoint that does not exist.
    #[error("Keypoint index {index} is out of bounds ({len} keypoints)")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// Number of keypoints.
        len: usize,
    },

    /// The estimator parameters are invalid.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
}
