//! Shared helpers for image-based unit tests.

use image::{DynamicImage, Rgba, Rgba32FImage};

/// Uniform-color RGB image with opaque alpha.
pub(crate) fn constant_image(w: u32, h: u32, rgb: [f32; 3]) -> DynamicImage {
    let mut img = Rgba32FImage::new(w, h);
    for px in img.pixels_mut() {
        *px = Rgba([rgb[0], rgb[1], rgb[2], 1.0]);
    }
    DynamicImage::ImageRgba32F(img)
}

/// Reproducible smooth grayscale test image: seeded noise, Gaussian-blurred
/// so bilinear sampling stays close to the underlying signal.
pub(crate) fn smooth_noise_image(w: u32, h: u32, seed: u64) -> DynamicImage {
    use rand::{Rng, SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut noise = image::ImageBuffer::<image::Luma<f32>, Vec<f32>>::new(w, h);
    for px in noise.pixels_mut() {
        px.0[0] = rng.gen();
    }
    let blurred = imageproc::filter::gaussian_blur_f32(&noise, 3.0);
    let mut img = Rgba32FImage::new(w, h);
    for (x, y, px) in img.enumerate_pixels_mut() {
        let v = blurred.get_pixel(x, y).0[0];
        *px = Rgba([v, v, v, 1.0]);
    }
    DynamicImage::ImageRgba32F(img)
}

/// Horizontal gradient from `left` to `right` across the image width.
pub(crate) fn gradient_image(w: u32, h: u32, left: f32, right: f32) -> DynamicImage {
    let mut img = Rgba32FImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let t = if w > 1 { x as f32 / (w - 1) as f32 } else { 0.0 };
            let v = left + (right - left) * t;
            img.put_pixel(x, y, Rgba([v, v, v, 1.0]));
        }
    }
    DynamicImage::ImageRgba32F(img)
}
