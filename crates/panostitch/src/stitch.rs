//! Stitch orchestration: validate, remap in parallel, blend in order.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::blend::{estimate_order, Blender, OverlapGraph};
use crate::canvas::{Canvas, CanvasOptions};
use crate::error::{Result, StitchError};
use crate::geometry::ImageMapper;
use crate::remap::{estimate_roi, remap_image, RemapConfig, RemappedRegion};
use crate::source::{PixelSource, SourceImageGeometry};

/// Receives stitch progress. Called from worker threads.
pub trait ProgressSink: Sync {
    /// `fraction` grows monotonically to 1.0; `image_index` is the source
    /// image whose remap just finished (or the last one, at completion).
    fn on_progress(&self, fraction: f64, image_index: usize);
}

/// Sink that discards all progress.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_progress(&self, _fraction: f64, _image_index: usize) {}
}

/// Cooperative cancellation. Polled once per remap task.
pub trait CancelToken: Sync {
    fn is_cancelled(&self) -> bool;
}

/// Token that never cancels.
pub struct NeverCancel;

impl CancelToken for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl CancelToken for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// The whole pipeline behind one call: per-image remapping (parallel),
/// blend-order estimation and accumulation into the output canvas.
#[derive(Debug, Clone)]
pub struct Stitcher {
    options: CanvasOptions,
    remap: RemapConfig,
}

impl Stitcher {
    /// Validates the canvas options up front; nothing heavy happens here.
    pub fn new(options: CanvasOptions, remap: RemapConfig) -> Result<Self> {
        options.validate()?;
        Ok(Self { options, remap })
    }

    pub fn options(&self) -> &CanvasOptions {
        &self.options
    }

    /// Stitch the images selected by `used` (indices into `geometries`,
    /// also the indices handed to `source`).
    ///
    /// Fails fast on configuration problems, fails whole on any per-image
    /// error, and returns [`StitchError::Cancelled`] without a partial
    /// canvas when the token fires.
    pub fn stitch(
        &self,
        geometries: &[SourceImageGeometry],
        used: &[usize],
        source: &dyn PixelSource,
        progress: &dyn ProgressSink,
        cancel: &dyn CancelToken,
    ) -> Result<Canvas> {
        if used.is_empty() {
            return Err(StitchError::Config("no images selected for stitching".into()));
        }
        for &i in used {
            if i >= geometries.len() {
                return Err(StitchError::Config(format!(
                    "image index {i} out of range ({} images)",
                    geometries.len()
                )));
            }
        }

        let mappers = used
            .iter()
            .map(|&i| ImageMapper::new(&geometries[i], &self.options))
            .collect::<Result<Vec<_>>>()?;

        let rois: Vec<_> = used
            .iter()
            .zip(&mappers)
            .map(|(&i, m)| estimate_roi(m, &geometries[i], &self.options))
            .collect();
        let graph = OverlapGraph::from_rois(&rois);
        let blend_order = estimate_order(&graph);
        info!(
            images = used.len(),
            components = blend_order.components.len(),
            "estimated blend order"
        );

        let total_steps = used.len() + 1;
        let done = AtomicUsize::new(0);
        let results: Vec<Result<Option<RemappedRegion>>> = used
            .par_iter()
            .enumerate()
            .map(|(pos, &image_index)| {
                if cancel.is_cancelled() {
                    return Err(StitchError::Cancelled);
                }
                let region = remap_image(
                    image_index,
                    &geometries[image_index],
                    &mappers[pos],
                    &self.options,
                    &self.remap,
                    source,
                )?;
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                progress.on_progress(n as f64 / total_steps as f64, image_index);
                Ok(region)
            })
            .collect();

        if cancel.is_cancelled() {
            return Err(StitchError::Cancelled);
        }
        let mut regions = Vec::with_capacity(used.len());
        for (pos, result) in results.into_iter().enumerate() {
            let image_index = used[pos];
            match result? {
                Some(region) => {
                    debug!(image = image_index, rect = ?region.rect, "remapped");
                    regions.push(region);
                }
                None => {
                    return Err(StitchError::Geometry {
                        image_index,
                        reason: "image covers no canvas pixel".into(),
                    })
                }
            }
        }

        let mut blender = Blender::new(&self.options);
        for &pos in &blend_order.order {
            blender.accumulate(&regions[pos])?;
        }
        let canvas = blender.finish()?;
        let canvas = match &self.options.crop {
            Some(rect) => canvas.cropped(rect),
            None => canvas,
        };
        progress.on_progress(1.0, *used.last().unwrap_or(&0));
        info!(
            width = canvas.width,
            height = canvas.height,
            "stitch finished"
        );
        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::blend::{BlendMode, SeamConfig};
    use crate::canvas::{CanvasRect, PixelFormat};
    use crate::geometry::{Orientation, Projection};
    use crate::source::ImageListSource;
    use crate::test_utils::{constant_image, gradient_image};

    /// Two equirectangular views, one degree per pixel on both sides, with
    /// yaws chosen so they overlap on canvas columns 50..100.
    fn two_view_setup(blend: BlendMode) -> (Vec<SourceImageGeometry>, ImageListSource, Stitcher) {
        let mut left = SourceImageGeometry::new(100, 100, Projection::Equirectangular, 100.0);
        left.orientation = Orientation::new(-25.0, 0.0, 0.0);
        let mut right = left.clone();
        right.orientation = Orientation::new(25.0, 0.0, 0.0);

        let source = ImageListSource::new(vec![
            constant_image(100, 100, [0.8; 3]),
            constant_image(100, 100, [0.4; 3]),
        ]);

        let mut options = CanvasOptions::new(Projection::Equirectangular, 150, 100, 150.0);
        options.format = PixelFormat::Rgba32f;
        options.blend = blend;
        let stitcher = Stitcher::new(options, RemapConfig::default()).unwrap();
        (vec![left, right], source, stitcher)
    }

    #[test]
    fn two_overlapping_views_blend_smoothly() {
        let (geos, source, stitcher) =
            two_view_setup(BlendMode::Seam(SeamConfig::default()));
        let canvas = stitcher
            .stitch(&geos, &[0, 1], &source, &NullProgress, &NeverCancel)
            .unwrap();

        // Left-only zone keeps the left color, right-only the right color.
        let p = canvas.pixels[canvas.index(10, 50)];
        assert!((p[0] - 0.8).abs() < 1e-2, "left zone {p:?}");
        let p = canvas.pixels[canvas.index(140, 50)];
        assert!((p[0] - 0.4).abs() < 1e-2, "right zone {p:?}");

        // Blended values stay inside the convex hull of the inputs.
        for x in 5..145u32 {
            let p = canvas.pixels[canvas.index(x, 50)];
            assert!(
                (0.4 - 1e-2..=0.8 + 1e-2).contains(&p[0]),
                "x={x} value {} left hull",
                p[0]
            );
            assert_eq!(p[3], 1.0, "x={x} not covered");
        }
    }

    #[test]
    fn stacked_gradients_keep_their_source_values() {
        let (geos, _, stitcher) = two_view_setup(BlendMode::Stacking);
        let source = ImageListSource::new(vec![
            gradient_image(100, 100, 0.0, 1.0),
            gradient_image(100, 100, 0.0, 1.0),
        ]);
        let canvas = stitcher
            .stitch(&geos, &[0, 1], &source, &NullProgress, &NeverCancel)
            .unwrap();

        // One degree per pixel on both sides: canvas column c reads the
        // left source at column c, and the right source at column c - 50.
        let p = canvas.pixels[canvas.index(20, 50)];
        assert!((p[0] - 20.0 / 99.0).abs() < 2e-2, "left zone {p:?}");
        // The overlap is overwritten by the later-placed right image.
        let p = canvas.pixels[canvas.index(80, 50)];
        assert!((p[0] - 30.0 / 99.0).abs() < 2e-2, "overlap {p:?}");
    }

    #[test]
    fn stacking_is_deterministic_across_runs() {
        let run = || {
            let (geos, source, stitcher) = two_view_setup(BlendMode::Stacking);
            stitcher
                .stitch(&geos, &[0, 1], &source, &NullProgress, &NeverCancel)
                .unwrap()
        };
        let a = run();
        let b = run();
        for (pa, pb) in a.pixels.iter().zip(&b.pixels) {
            assert_eq!(pa.map(f32::to_bits), pb.map(f32::to_bits));
        }
    }

    #[test]
    fn difference_of_identical_views_is_black_in_overlap() {
        let mut geos = {
            let (geos, _, _) = two_view_setup(BlendMode::Difference);
            geos
        };
        // Same orientation, same pixels: residual must vanish everywhere.
        geos[1].orientation = geos[0].orientation;
        let source = ImageListSource::new(vec![
            constant_image(100, 100, [0.5; 3]),
            constant_image(100, 100, [0.5; 3]),
        ]);
        let mut options = CanvasOptions::new(Projection::Equirectangular, 150, 100, 150.0);
        options.format = PixelFormat::Rgba32f;
        options.blend = BlendMode::Difference;
        let stitcher = Stitcher::new(options, RemapConfig::default()).unwrap();
        let canvas = stitcher
            .stitch(&geos, &[0, 1], &source, &NullProgress, &NeverCancel)
            .unwrap();
        let p = canvas.pixels[canvas.index(40, 50)];
        assert!(p[0].abs() < 1e-3 && p[3] == 1.0, "{p:?}");
    }

    #[test]
    fn disjoint_views_leave_the_gap_uncovered() {
        let mut left = SourceImageGeometry::new(64, 64, Projection::Equirectangular, 40.0);
        left.orientation = Orientation::new(-70.0, 0.0, 0.0);
        let mut right = left.clone();
        right.orientation = Orientation::new(70.0, 0.0, 0.0);
        let source = ImageListSource::new(vec![
            constant_image(64, 64, [1.0, 0.0, 0.0]),
            constant_image(64, 64, [0.0, 1.0, 0.0]),
        ]);
        let mut options = CanvasOptions::new(Projection::Equirectangular, 180, 64, 180.0);
        options.format = PixelFormat::Rgba32f;
        let stitcher = Stitcher::new(options, RemapConfig::default()).unwrap();
        let canvas = stitcher
            .stitch(&[left, right], &[0, 1], &source, &NullProgress, &NeverCancel)
            .unwrap();

        // Each component keeps its own color and nothing bleeds across.
        let p = canvas.pixels[canvas.index(20, 32)];
        assert!(p[0] > 0.9 && p[1] < 1e-3, "left component {p:?}");
        let p = canvas.pixels[canvas.index(160, 32)];
        assert!(p[1] > 0.9 && p[0] < 1e-3, "right component {p:?}");
        assert_eq!(canvas.pixels[canvas.index(90, 32)][3], 0.0);
    }

    #[test]
    fn empty_selection_and_bad_indices_fail_fast() {
        let (geos, source, stitcher) = two_view_setup(BlendMode::Stacking);
        let err = stitcher
            .stitch(&geos, &[], &source, &NullProgress, &NeverCancel)
            .unwrap_err();
        assert!(matches!(err, StitchError::Config(_)));

        let err = stitcher
            .stitch(&geos, &[0, 7], &source, &NullProgress, &NeverCancel)
            .unwrap_err();
        assert!(matches!(err, StitchError::Config(_)));
    }

    #[test]
    fn cancellation_yields_no_canvas() {
        let (geos, source, stitcher) = two_view_setup(BlendMode::Stacking);
        let cancel = AtomicBool::new(true);
        let err = stitcher
            .stitch(&geos, &[0, 1], &source, &NullProgress, &cancel)
            .unwrap_err();
        assert!(matches!(err, StitchError::Cancelled));
    }

    #[test]
    fn image_without_coverage_is_a_geometry_error() {
        let mut away = SourceImageGeometry::new(64, 64, Projection::Rectilinear, 40.0);
        away.orientation = Orientation::new(180.0, 0.0, 0.0);
        let source = ImageListSource::new(vec![constant_image(64, 64, [0.5; 3])]);
        let options = CanvasOptions::new(Projection::Rectilinear, 64, 64, 40.0);
        let stitcher = Stitcher::new(options, RemapConfig::default()).unwrap();
        let err = stitcher
            .stitch(&[away], &[0], &source, &NullProgress, &NeverCancel)
            .unwrap_err();
        assert!(matches!(err, StitchError::Geometry { image_index: 0, .. }));
    }

    struct RecordingSink(Mutex<Vec<f64>>);

    impl ProgressSink for RecordingSink {
        fn on_progress(&self, fraction: f64, _image_index: usize) {
            self.0.lock().unwrap().push(fraction);
        }
    }

    #[test]
    fn progress_reaches_one() {
        let (geos, source, stitcher) = two_view_setup(BlendMode::Stacking);
        let sink = RecordingSink(Mutex::new(Vec::new()));
        stitcher
            .stitch(&geos, &[0, 1], &source, &sink, &NeverCancel)
            .unwrap();
        let fractions = sink.0.into_inner().unwrap();
        assert_eq!(fractions.len(), 3);
        assert_eq!(*fractions.last().unwrap(), 1.0);
        for f in &fractions {
            assert!((0.0..=1.0).contains(f));
        }
    }

    #[test]
    fn output_crop_is_applied() {
        let (geos, source, _) = two_view_setup(BlendMode::Stacking);
        let mut options = CanvasOptions::new(Projection::Equirectangular, 150, 100, 150.0);
        options.format = PixelFormat::Rgba32f;
        options.blend = BlendMode::Stacking;
        options.crop = Some(CanvasRect::new(10, 10, 50, 40));
        let stitcher = Stitcher::new(options, RemapConfig::default()).unwrap();
        let canvas = stitcher
            .stitch(&geos, &[0, 1], &source, &NullProgress, &NeverCancel)
            .unwrap();
        assert_eq!((canvas.width, canvas.height), (50, 40));
        let p = canvas.pixels[canvas.index(10, 20)];
        assert!((p[0] - 0.8).abs() < 1e-3, "{p:?}");
    }
}
