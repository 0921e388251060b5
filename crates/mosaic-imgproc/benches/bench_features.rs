use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use mosaic_image::{Image, ImageSize};
use mosaic_imgproc::features::{
    corner_peaks, describe_keypoints, harris_response, match_descriptors, DescriptorKind,
    HarrisParams,
};

fn random_image(size: ImageSize, seed: u64) -> Image<f32, 1> {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..size.area()).map(|_| rng.random_range(0.0..1.0)).collect();
    Image::new(size, data).unwrap()
}

fn bench_harris_response(c: &mut Criterion) {
    let mut group = c.benchmark_group("HarrisResponse");

    for (width, height) in [(256, 224), (512, 448), (1024, 896)].iter() {
        let size = ImageSize {
            width: *width,
            height: *height,
        };
        let image = random_image(size, 0);
        let parameter_string = format!("{width}x{height}");

        group.bench_with_input(
            BenchmarkId::new("harris_box", &parameter_string),
            &image,
            |b, src| {
                let mut dst = Image::from_size_val(size, 0.0f32).unwrap();
                let params = HarrisParams::default();
                b.iter(|| black_box(harris_response(src, &mut dst, &params)).unwrap())
            },
        );
    }

    group.finish();
}

fn bench_describe_and_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("DescribeAndMatch");

    let size = ImageSize {
        width: 512,
        height: 448,
    };
    let image = random_image(size, 1);
    let mut response = Image::from_size_val(size, 0.0f32).unwrap();
    harris_response(&image, &mut response, &HarrisParams::default()).unwrap();
    let keypoints = corner_peaks(&response, 0.05, 8);

    for kind in [DescriptorKind::NormalizedPatch, DescriptorKind::GradientHistogram] {
        let patch_size = match kind {
            DescriptorKind::NormalizedPatch => 5,
            DescriptorKind::GradientHistogram => 16,
        };
        let descriptors = describe_keypoints(&image, &keypoints, kind, patch_size).unwrap();
        let parameter_string = format!("{kind:?}/{}", keypoints.len());

        group.bench_with_input(
            BenchmarkId::new("describe", &parameter_string),
            &keypoints,
            |b, kps| {
                b.iter(|| black_box(describe_keypoints(&image, kps, kind, patch_size)).unwrap())
            },
        );

        group.bench_with_input(
            BenchmarkId::new("match", &parameter_string),
            &descriptors,
            |b, desc| b.iter(|| black_box(match_descriptors(desc, desc, 0.7)).unwrap()),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_harris_response, bench_describe_and_match);
criterion_main!(benches);
