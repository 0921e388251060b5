use approx::assert_relative_eq;
use rand::{rngs::StdRng, Rng, SeedableRng};

use mosaic_image::{Image, ImageSize};
use mosaic_stitch::{
    extract_features, register_pair, stitch, LogObserver, StitchConfig, StitchError, Stitcher,
};

const HEIGHT: usize = 60;
const WIDTH: usize = 80;
const SHIFT: usize = 31;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A random texture with values in `[1, 200]`, so that no pixel reads as empty.
fn texture(width: usize, height: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..width * height)
        .map(|_| rng.random_range(1..=200u8))
        .collect()
}

/// Columns `[x0, x0 + WIDTH)` of the texture, brightened by `offset`.
fn view(base: &[u8], base_width: usize, x0: usize, offset: u8) -> Image<u8, 1> {
    let data = (0..HEIGHT)
        .flat_map(|r| base[r * base_width + x0..r * base_width + x0 + WIDTH].iter())
        .map(|&v| v + offset)
        .collect();
    Image::new(
        ImageSize {
            width: WIDTH,
            height: HEIGHT,
        },
        data,
    )
    .unwrap()
}

fn pixel(image: &Image<u8, 1>, x: usize, y: usize) -> f32 {
    *image.get_pixel(x, y, 0).unwrap() as f32
}

#[test]
fn stitch_shifted_pair() -> Result<(), StitchError> {
    init_logger();

    let base_width = WIDTH + SHIFT;
    let base = texture(base_width, HEIGHT, 0);
    let img1 = view(&base, base_width, 0, 0);
    let img2 = view(&base, base_width, SHIFT, 20);

    let config = StitchConfig::default();
    let panorama = Stitcher::new(config)
        .with_observer(LogObserver)
        .stitch(&[img1.clone(), img2.clone()])?;

    assert_eq!(panorama.width(), WIDTH + SHIFT);
    assert_eq!(panorama.height(), HEIGHT);

    // the overlap spans panorama columns [SHIFT, WIDTH - 1], the middle weighs both halves
    let mid = (SHIFT + WIDTH - 1) / 2;
    for y in [5, HEIGHT / 2, HEIGHT - 5] {
        let a = pixel(&img1, mid, y);
        let b = pixel(&img2, mid - SHIFT, y);
        assert_relative_eq!(pixel(&panorama, mid, y), (a + b) / 2.0, epsilon = 1.0);
    }

    // outside the overlap every pixel comes from a single image
    for y in 0..HEIGHT {
        assert_eq!(pixel(&panorama, 3, y), pixel(&img1, 3, y));
        assert_eq!(pixel(&panorama, WIDTH + SHIFT - 2, y), pixel(&img2, WIDTH - 2, y));
    }

    Ok(())
}

#[test]
fn stitch_three_image_chain() -> Result<(), StitchError> {
    init_logger();

    let step = 25;
    let base_width = WIDTH + 2 * step;
    let base = texture(base_width, HEIGHT, 6);
    let images = [
        view(&base, base_width, 0, 0),
        view(&base, base_width, step, 0),
        view(&base, base_width, 2 * step, 0),
    ];

    let panorama = stitch(&images, &StitchConfig::default())?;
    assert_eq!(panorama.width(), base_width);
    assert_eq!(panorama.height(), HEIGHT);

    for y in 0..HEIGHT {
        for x in 0..base_width {
            let expected = base[y * base_width + x] as f32;
            let value = pixel(&panorama, x, y);
            if x < step || x > WIDTH - 1 + step {
                // covered by the first or the last view only
                assert_eq!(value, expected, "pixel ({x}, {y})");
            } else {
                assert_relative_eq!(value, expected, epsilon = 1.0);
            }
        }
    }

    Ok(())
}

#[test]
fn register_shifted_pair() -> Result<(), StitchError> {
    init_logger();

    let base_width = WIDTH + SHIFT;
    let base = texture(base_width, HEIGHT, 1);
    let img1 = view(&base, base_width, 0, 0);
    let img2 = view(&base, base_width, SHIFT, 20);

    let config = StitchConfig::default();
    let f1 = extract_features(&img1, &config).unwrap();
    let f2 = extract_features(&img2, &config).unwrap();
    let registration = register_pair(&f1, &f2, &config, 0)?;

    let m = registration.homography.matrix();
    let expected = [[1.0, 0.0, SHIFT as f64], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    for i in 0..3 {
        for j in 0..3 {
            assert_relative_eq!(m[i][j], expected[i][j], epsilon = 1e-3);
        }
    }
    assert!(registration.inliers.len() <= registration.matches.len());
    let exact = registration
        .inliers
        .iter()
        .filter(|m| {
            let (k1, k2) = (f1.keypoints[m.i], f2.keypoints[m.j]);
            (k1.row, k1.col) == (k2.row, k2.col + SHIFT)
        })
        .count();
    assert!(exact >= 10);
    assert!(exact * 10 >= registration.inliers.len() * 9);

    Ok(())
}

#[test]
fn stitch_identical_pair() -> Result<(), StitchError> {
    init_logger();

    let base = texture(WIDTH, HEIGHT, 2);
    let image = view(&base, WIDTH, 0, 0);

    let config = StitchConfig::default();
    let features = extract_features(&image, &config).unwrap();
    let registration = register_pair(&features, &features, &config, 0)?;
    assert_eq!(registration.inliers.len(), registration.matches.len());
    assert_eq!(registration.matches.len(), features.keypoints.len());

    let m = registration.homography.matrix();
    for i in 0..3 {
        for j in 0..3 {
            let e = if i == j { 1.0 } else { 0.0 };
            assert_relative_eq!(m[i][j], e, epsilon = 1e-3);
        }
    }

    let panorama = stitch(&[image.clone(), image.clone()], &config)?;
    assert_eq!(panorama.size(), image.size());
    for (p, q) in panorama.as_slice().iter().zip(image.as_slice()) {
        assert!((*p as i32 - *q as i32).abs() <= 1);
    }

    Ok(())
}

#[test]
fn stitch_is_deterministic() -> Result<(), StitchError> {
    init_logger();

    let base_width = WIDTH + SHIFT;
    let base = texture(base_width, HEIGHT, 3);
    let images = [
        view(&base, base_width, 0, 0),
        view(&base, base_width, SHIFT, 10),
    ];

    let config = StitchConfig {
        seed: 11,
        ..Default::default()
    };
    assert_eq!(stitch(&images, &config)?, stitch(&images, &config)?);

    Ok(())
}

#[test]
fn stitch_unrelated_images_fails() {
    init_logger();

    let a = view(&texture(WIDTH, HEIGHT, 4), WIDTH, 0, 0);
    let flat = Image::<u8, 1>::from_size_val(a.size(), 128).unwrap();

    let err = stitch(&[a, flat], &StitchConfig::default()).unwrap_err();
    assert!(matches!(err, StitchError::Registration { pair: 0, .. }));
}

#[test]
fn stitch_reports_first_failing_link() {
    init_logger();

    let a = view(&texture(WIDTH, HEIGHT, 5), WIDTH, 0, 0);
    let flat = Image::<u8, 1>::from_size_val(a.size(), 128).unwrap();

    // every link from pair 1 onwards fails, the earliest one is reported
    let mut images = vec![a.clone(), a];
    images.extend(vec![flat; 8]);

    for _ in 0..4 {
        let err = stitch(&images, &StitchConfig::default()).unwrap_err();
        assert!(matches!(err, StitchError::Registration { pair: 1, .. }));
    }
}
