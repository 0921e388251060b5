//! Geometric image transformations using perspective warps.
//!
//! - Perspective transformations (homographies) with inverse mapping
//! - Extent of a set of warped images sharing one reference frame

mod output_space;
mod perspective;

pub use output_space::{output_space, OutputSpace};
pub use perspective::warp_perspective;
