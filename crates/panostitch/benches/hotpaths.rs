use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use panostitch::{
    BlendMode, Blender, CanvasOptions, CanvasRect, ImageListSource, ImageMapper, Orientation,
    PixelFormat, Projection, RemapConfig, RemappedRegion, SeamConfig, SourceImageGeometry,
};

fn noise_image(rng: &mut StdRng, w: u32, h: u32) -> image::DynamicImage {
    let mut img = image::Rgba32FImage::new(w, h);
    for px in img.pixels_mut() {
        *px = image::Rgba([rng.gen(), rng.gen(), rng.gen(), 1.0]);
    }
    image::DynamicImage::ImageRgba32F(img)
}

fn bench_remap(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let mut geo = SourceImageGeometry::new(640, 480, Projection::Rectilinear, 70.0);
    geo.orientation = Orientation::new(15.0, -5.0, 2.0);
    geo.distortion.b = -0.02;
    let mut options = CanvasOptions::new(Projection::Equirectangular, 1024, 512, 180.0);
    options.format = PixelFormat::Rgba32f;
    let mapper = ImageMapper::new(&geo, &options).unwrap();
    let source = ImageListSource::new(vec![noise_image(&mut rng, 640, 480)]);
    let config = RemapConfig::default();

    c.bench_function("remap_640x480_to_equirect", |b| {
        b.iter(|| {
            panostitch::remap::remap_image(0, &geo, &mapper, &options, &config, &source)
                .unwrap()
                .unwrap()
        })
    });
}

fn bench_seam_accumulate(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let rect = CanvasRect::new(64, 32, 512, 384);
    let len = rect.area() as usize;
    let region = RemappedRegion {
        image_index: 0,
        rect,
        rgb: (0..len).map(|_| [rng.gen(), rng.gen(), rng.gen()]).collect(),
        weight: (0..len).map(|_| rng.gen::<f32>()).collect(),
    };
    let mut options = CanvasOptions::new(Projection::Equirectangular, 1024, 512, 180.0);
    options.format = PixelFormat::Rgba32f;
    options.blend = BlendMode::Seam(SeamConfig::default());

    c.bench_function("seam_accumulate_512x384", |b| {
        b.iter(|| {
            let mut blender = Blender::new(&options);
            blender.accumulate(&region).unwrap();
        })
    });
}

criterion_group!(benches, bench_remap, bench_seam_accumulate);
criterion_main!(benches);
