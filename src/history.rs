// history.rs - rolling scalar history and the live time-series plot

use crate::render::Raster;
use std::collections::VecDeque;

/// Number of frames the live plot remembers.
pub const HISTORY_CAPACITY: usize = 400;

const AXIS_COLOR: [u8; 4] = [0xaa, 0xaa, 0xaa, 0xff];
const LINE_COLOR: [u8; 4] = [0x00, 0xff, 0x00, 0xff];

/// Fixed-capacity rolling sequence of a single scalar, oldest evicted.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    values: VecDeque<f64>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }
}

/// Scalar shown on the live plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    Energy,
    Magnetization,
    AcceptanceRatio,
}

impl PlotKind {
    pub fn label(&self) -> &'static str {
        match self {
            PlotKind::Energy => "Energy",
            PlotKind::Magnetization => "Magnetization",
            PlotKind::AcceptanceRatio => "Acceptance Ratio",
        }
    }
}

/// Rolling time-series renderer. The y-scale is fixed per kind: [-1, 1]
/// for the normalized observables and [-2|J|-|h|, 2|J|+|h|] for energy, so
/// the displayed range tracks the current coupling and field magnitudes.
#[derive(Debug, Clone)]
pub struct LiveHistoryPlot {
    buffer: HistoryBuffer,
    kind: PlotKind,
    width: usize,
    height: usize,
}

impl LiveHistoryPlot {
    pub fn new(kind: PlotKind, width: usize, height: usize) -> Self {
        Self {
            buffer: HistoryBuffer::new(HISTORY_CAPACITY),
            kind,
            width,
            height,
        }
    }

    pub fn kind(&self) -> PlotKind {
        self.kind
    }

    /// Change the plotted scalar; the accumulated history belongs to the
    /// old scalar and is dropped.
    pub fn set_kind(&mut self, kind: PlotKind) {
        if self.kind != kind {
            self.kind = kind;
            self.buffer.clear();
        }
    }

    pub fn push(&mut self, value: f64) {
        self.buffer.push(value);
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn buffer(&self) -> &HistoryBuffer {
        &self.buffer
    }

    /// Y-axis range for the current kind at the given coupling and field.
    pub fn y_range(&self, coupling: f64, field: f64) -> (f64, f64) {
        match self.kind {
            PlotKind::Energy => {
                let top = 2.0 * coupling.abs() + field.abs();
                (-top, top)
            }
            _ => (-1.0, 1.0),
        }
    }

    /// Draw axes and the history polyline. Index maps uniformly onto the
    /// window width (a partially filled buffer occupies the left part of
    /// the plot), value maps onto the fixed y-range.
    pub fn render(&self, coupling: f64, field: f64) -> Raster {
        let (w, h) = (self.width as f64, self.height as f64);
        let mut raster = Raster::new(self.width, self.height);

        let left = w * 0.1;
        let right = w - w * 0.025;
        let top = h * 0.05;
        let bottom = h - h * 0.05;

        raster.draw_segment(left, top, left, bottom, AXIS_COLOR);
        raster.draw_segment(left, bottom, right, bottom, AXIS_COLOR);

        if self.buffer.is_empty() {
            return raster;
        }

        let (y_min, y_max) = self.y_range(coupling, field);
        let span = y_max - y_min;
        let mut prev: Option<(f64, f64)> = None;
        for (i, value) in self.buffer.iter().enumerate() {
            let x = left + (right - left) * i as f64 / self.buffer.capacity() as f64;
            let frac = if span == 0.0 {
                0.5
            } else {
                ((value - y_min) / span).clamp(0.0, 1.0)
            };
            let y = bottom - frac * (bottom - top);
            if let Some((px, py)) = prev {
                raster.draw_segment(px, py, x, y, LINE_COLOR);
            }
            prev = Some((x, y));
        }
        raster
    }
}
