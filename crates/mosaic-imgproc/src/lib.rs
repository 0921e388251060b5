#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// compositing of warped images.
pub mod blend;

/// color transformations module.
pub mod color;

/// image cropping module.
pub mod crop;

/// feature detection, description and matching module.
pub mod features;

/// image filtering module.
pub mod filter;

/// utilities for interpolation.
pub mod interpolation;

/// module containing parallization utilities.
pub mod parallel;

/// image geometric transformations module.
pub mod warp;
