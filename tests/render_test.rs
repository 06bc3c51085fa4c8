//! Raster production: hue mapping, per-site color raster, quiver stride
//! tiers and mode-switch reallocation.

use xymc::lattice::XyModel;
use xymc::render::{
    colorbar, hsv_to_rgb, quiver_stride, RenderPipeline, VizMode, QUIVER_RESOLUTION,
};

use rand::rngs::SmallRng;
use rand::SeedableRng;

fn model(n: usize) -> XyModel {
    XyModel::with_rng(SmallRng::seed_from_u64(8), n, 2.0, 1.0, 0.0)
}

#[test]
fn hsv_primary_anchors() {
    assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), [255, 0, 0]);
    assert_eq!(hsv_to_rgb(120.0, 1.0, 1.0), [0, 255, 0]);
    assert_eq!(hsv_to_rgb(240.0, 1.0, 1.0), [0, 0, 255]);
    assert_eq!(hsv_to_rgb(60.0, 1.0, 1.0), [255, 255, 0]);
    // Zero value is black regardless of hue.
    assert_eq!(hsv_to_rgb(200.0, 1.0, 0.0), [0, 0, 0]);
}

#[test]
fn color_mode_produces_one_pixel_per_site() {
    let m = model(16);
    let mut pipeline = RenderPipeline::new(VizMode::Color, 16);
    let raster = pipeline.render(&m);
    assert_eq!(raster.width(), 16);
    assert_eq!(raster.height(), 16);
    assert_eq!(raster.as_rgba().len(), 16 * 16 * 4);

    // Every site paints a fully saturated, fully opaque HSV color: at
    // least one channel maxed, alpha 255.
    for px in raster.as_rgba().chunks_exact(4) {
        assert_eq!(px[3], 0xff);
        assert!(px.iter().take(3).any(|&c| c == 0xff));
    }
}

#[test]
fn quiver_mode_is_presentation_sized() {
    for n in [16usize, 64, 128, 256] {
        let m = model(n);
        let mut pipeline = RenderPipeline::new(VizMode::Quiver, n);
        let raster = pipeline.render(&m);
        assert_eq!(raster.width(), QUIVER_RESOLUTION);
        assert_eq!(raster.height(), QUIVER_RESOLUTION);
    }
}

#[test]
fn quiver_stride_tiers() {
    assert_eq!(quiver_stride(16), 1);
    assert_eq!(quiver_stride(64), 1);
    assert_eq!(quiver_stride(65), 2);
    assert_eq!(quiver_stride(128), 2);
    assert_eq!(quiver_stride(129), 4);
    assert_eq!(quiver_stride(256), 4);
}

#[test]
fn quiver_draws_arrows_over_the_background() {
    let m = model(16);
    let mut pipeline = RenderPipeline::new(VizMode::Quiver, 16);
    let raster = pipeline.render(&m);
    let background = raster.as_rgba().chunks_exact(4).filter(|px| px[0] == 0x11).count();
    let total = QUIVER_RESOLUTION * QUIVER_RESOLUTION;
    assert!(background < total, "arrows must overwrite some pixels");
    assert!(
        background > total / 2,
        "arrows should not flood the background"
    );
}

#[test]
fn mode_switch_reallocates_the_raster() {
    let m = model(32);
    let mut pipeline = RenderPipeline::new(VizMode::Color, 32);
    assert_eq!(pipeline.render(&m).width(), 32);

    pipeline.set_mode(VizMode::Quiver, 32);
    assert_eq!(pipeline.raster().width(), QUIVER_RESOLUTION);
    assert_eq!(pipeline.render(&m).width(), QUIVER_RESOLUTION);

    pipeline.set_mode(VizMode::Color, 32);
    assert_eq!(pipeline.raster().width(), 32);
}

#[test]
fn color_raster_follows_a_lattice_resize() {
    let mut pipeline = RenderPipeline::new(VizMode::Color, 64);
    let big = model(64);
    assert_eq!(pipeline.render(&big).width(), 64);

    let small = model(32);
    let raster = pipeline.render(&small);
    assert_eq!(raster.width(), 32);
    assert_eq!(raster.as_rgba().len(), 32 * 32 * 4);
}

#[test]
fn colorbar_spans_the_hue_wheel() {
    let bar = colorbar(360, 20);
    assert_eq!(bar.width(), 360);
    // Angle 0 -> red; angle just short of 2 pi wraps back toward red.
    assert_eq!(bar.get(0, 0), [255, 0, 0, 255]);
    let left = bar.get(1, 10);
    let right = bar.get(359, 10);
    assert_eq!(left[0], 255, "start of the wheel is red-dominant");
    assert_eq!(right[0], 255, "end of the wheel returns to red-dominant");
    // A third of the way around the wheel is green-dominant.
    let third = bar.get(120, 10);
    assert_eq!(third[1], 255);
}
