#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod config;
pub use config::StitchConfig;

mod error;
pub use error::{RegistrationError, StitchError};

/// observation of the pipeline stages.
pub mod observer;
pub use observer::{LogObserver, Stage, StageEvent, StageObserver};

mod pipeline;
pub use pipeline::{
    extract_features, register_pair, stitch, ImageFeatures, PairRegistration, Stitcher,
};
