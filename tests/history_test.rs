//! Rolling history buffer and live plot scaling.

use xymc::history::{HistoryBuffer, LiveHistoryPlot, PlotKind, HISTORY_CAPACITY};

#[test]
fn buffer_evicts_oldest_beyond_capacity() {
    let mut buf = HistoryBuffer::new(HISTORY_CAPACITY);
    for i in 0..HISTORY_CAPACITY + 25 {
        buf.push(i as f64);
    }
    assert_eq!(buf.len(), HISTORY_CAPACITY);
    assert_eq!(buf.iter().next(), Some(25.0), "oldest entries evicted first");
    assert_eq!(buf.iter().last(), Some((HISTORY_CAPACITY + 24) as f64));
}

#[test]
fn plot_capacity_is_four_hundred() {
    let mut plot = LiveHistoryPlot::new(PlotKind::Magnetization, 200, 100);
    for _ in 0..1000 {
        plot.push(0.0);
    }
    assert_eq!(plot.buffer().len(), 400);
}

#[test]
fn energy_scale_tracks_coupling_and_field() {
    let plot = LiveHistoryPlot::new(PlotKind::Energy, 200, 100);
    assert_eq!(plot.y_range(1.0, 0.0), (-2.0, 2.0));
    assert_eq!(plot.y_range(-1.5, 0.5), (-3.5, 3.5));
    assert_eq!(plot.y_range(0.0, 0.0), (0.0, 0.0));
}

#[test]
fn normalized_scales_are_fixed() {
    let m = LiveHistoryPlot::new(PlotKind::Magnetization, 200, 100);
    assert_eq!(m.y_range(2.0, 2.0), (-1.0, 1.0));
    let a = LiveHistoryPlot::new(PlotKind::AcceptanceRatio, 200, 100);
    assert_eq!(a.y_range(0.3, 0.1), (-1.0, 1.0));
}

#[test]
fn changing_kind_clears_history() {
    let mut plot = LiveHistoryPlot::new(PlotKind::Energy, 200, 100);
    plot.push(-1.0);
    plot.push(-1.1);
    plot.set_kind(PlotKind::Magnetization);
    assert!(plot.buffer().is_empty());

    // Re-selecting the current kind keeps the data.
    plot.push(0.5);
    plot.set_kind(PlotKind::Magnetization);
    assert_eq!(plot.buffer().len(), 1);
}

#[test]
fn render_draws_axes_and_polyline() {
    let mut plot = LiveHistoryPlot::new(PlotKind::Magnetization, 200, 100);
    let empty = plot.render(1.0, 0.0);
    let axis_pixels = empty
        .as_rgba()
        .chunks_exact(4)
        .filter(|px| px[0] == 0xaa)
        .count();
    assert!(axis_pixels > 0, "axes drawn even with no data");

    for i in 0..100 {
        plot.push((i as f64 / 50.0) - 1.0);
    }
    let drawn = plot.render(1.0, 0.0);
    let line_pixels = drawn
        .as_rgba()
        .chunks_exact(4)
        .filter(|px| px[1] == 0xff && px[0] == 0x00)
        .count();
    assert!(line_pixels > 50, "polyline missing (got {line_pixels} pixels)");
}

#[test]
fn out_of_range_values_are_clamped_into_the_plot() {
    let mut plot = LiveHistoryPlot::new(PlotKind::Magnetization, 200, 100);
    plot.push(5.0);
    plot.push(-5.0);
    // Must not panic or write outside the raster.
    let raster = plot.render(1.0, 0.0);
    assert_eq!(raster.width(), 200);
}
