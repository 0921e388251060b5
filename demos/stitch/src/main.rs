use argh::FromArgs;
use std::path::PathBuf;

use mosaic::{
    image::{Image, ImageSize},
    imgproc::{crop::trim_zero_borders, features::DescriptorKind},
    stitch::{LogObserver, StitchConfig, Stitcher},
};

/// Stitch an ordered chain of overlapping images into a panorama.
#[derive(FromArgs)]
struct Args {
    /// path to the output image
    #[argh(option, short = 'o')]
    output: PathBuf,

    /// optional JSON file with the pipeline configuration
    #[argh(option)]
    config: Option<PathBuf>,

    /// descriptor kind, `patch` or `histogram`
    #[argh(option)]
    descriptor: Option<String>,

    /// side of the descriptor patch
    #[argh(option)]
    patch_size: Option<usize>,

    /// seed of the robust estimation
    #[argh(option)]
    seed: Option<u64>,

    /// crop the empty borders of the panorama
    #[argh(switch)]
    trim: bool,

    /// the images, each one overlapping the previous one
    #[argh(positional)]
    images: Vec<PathBuf>,
}

fn read_rgb8(path: &PathBuf) -> Result<Image<u8, 3>, Box<dyn std::error::Error>> {
    let img = image::open(path)?.into_rgb8();
    let size = ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    };
    Ok(Image::new(size, img.into_raw())?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Args = argh::from_env();

    let mut config = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => StitchConfig::default(),
    };

    match args.descriptor.as_deref() {
        None => {}
        Some("patch") => config.descriptor = DescriptorKind::NormalizedPatch,
        Some("histogram") => {
            config.descriptor = DescriptorKind::GradientHistogram;
            // the histogram needs a larger patch than the default one
            if args.patch_size.is_none() && config.patch_size < 16 {
                config.patch_size = 16;
                config.border_margin = config.border_margin.max(8);
            }
        }
        Some(other) => return Err(format!("unknown descriptor kind: {other}").into()),
    }
    if let Some(patch_size) = args.patch_size {
        config.patch_size = patch_size;
        config.border_margin = config.border_margin.max(patch_size / 2);
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let images = args
        .images
        .iter()
        .map(read_rgb8)
        .collect::<Result<Vec<_>, _>>()?;

    log::info!("stitching {} images", images.len());

    let stitcher = Stitcher::new(config).with_observer(LogObserver);
    let mut panorama = stitcher.stitch(&images)?;

    if args.trim {
        panorama = trim_zero_borders(&panorama)?;
    }

    let out = image::RgbImage::from_raw(
        panorama.width() as u32,
        panorama.height() as u32,
        panorama.into_vec(),
    )
    .ok_or("the panorama buffer does not match its size")?;
    out.save(&args.output)?;

    println!(
        "Panorama of {} images written to {}",
        images.len(),
        args.output.display()
    );

    Ok(())
}
