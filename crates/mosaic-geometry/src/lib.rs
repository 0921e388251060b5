#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod error;
pub use error::HomographyError;

/// Homography type and normalized DLT estimation.
pub mod homography;

/// Small fixed-size linear algebra helpers on 3x3 matrices.
pub mod linalg;

/// Random sample consensus over homographies.
pub mod ransac;

pub use homography::{estimate_homography, Homography};
pub use ransac::{ransac, ransac_seeded, RansacParams, RansacResult};
