use std::{fmt, time::Duration};

/// A step of the stitching pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Grayscale conversion, corner response and peak extraction.
    Detect,
    /// Descriptor extraction.
    Describe,
    /// Descriptor matching between two images.
    Match,
    /// Robust homography estimation between two images.
    Ransac,
    /// Chaining of the pairwise homographies into the reference frame.
    Compose,
    /// Resampling of one image onto the panorama canvas.
    Warp,
    /// Blending of one warped image into the panorama.
    Blend,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Detect => "detect",
            Stage::Describe => "describe",
            Stage::Match => "match",
            Stage::Ransac => "ransac",
            Stage::Compose => "compose",
            Stage::Warp => "warp",
            Stage::Blend => "blend",
        };
        f.write_str(name)
    }
}

/// A completed stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageEvent {
    /// The stage that ran.
    pub stage: Stage,
    /// Index of the image the stage ran on, if any.
    pub image: Option<usize>,
    /// Index of the first image of the pair the stage ran on, if any.
    pub pair: Option<usize>,
    /// Wall time spent in the stage.
    pub elapsed: Duration,
}

/// Receives an event after every completed stage.
///
/// Per image stages run on the rayon pool, so events may arrive from several threads and
/// out of chain order.
pub trait StageObserver: Send + Sync {
    /// Called once a stage completes.
    fn on_stage(&self, event: &StageEvent);
}

/// Forwards the stage events to the `log` facade at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl StageObserver for LogObserver {
    fn on_stage(&self, event: &StageEvent) {
        match (event.image, event.pair) {
            (Some(image), _) => log::debug!(
                "{} on image {image} took {:?}",
                event.stage,
                event.elapsed
            ),
            (None, Some(pair)) => log::debug!(
                "{} on pair {pair} took {:?}",
                event.stage,
                event.elapsed
            ),
            (None, None) => log::debug!("{} took {:?}", event.stage, event.elapsed),
        }
    }
}
