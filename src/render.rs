// render.rs - per-site color raster and subsampled quiver raster

use crate::lattice::{SpinView, XyModel};
use std::f64::consts::PI;

/// Presentation resolution of the quiver raster, independent of lattice
/// size.
pub const QUIVER_RESOLUTION: usize = 400;

const QUIVER_BACKGROUND: [u8; 4] = [0x11, 0x11, 0x11, 0xff];

/// Convert HSV (hue in degrees, s and v in [0, 1]) to RGB bytes.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [u8; 3] {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    ]
}

/// Hue in degrees for a spin angle: (θ mod 2π) / 2π · 360.
pub fn angle_hue(theta: f64) -> f64 {
    theta.rem_euclid(2.0 * PI) / (2.0 * PI) * 360.0
}

fn angle_color(theta: f64) -> [u8; 4] {
    let [r, g, b] = hsv_to_rgb(angle_hue(theta), 1.0, 1.0);
    [r, g, b, 0xff]
}

/// RGBA pixel surface. Out-of-bounds writes are clipped, which keeps arrow
/// strokes near the raster edge safe.
#[derive(Debug, Clone)]
pub struct Raster {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Raster {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height * 4],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_rgba(&self) -> &[u8] {
        &self.pixels
    }

    pub fn fill(&mut self, color: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }

    pub fn put(&mut self, x: usize, y: usize, color: [u8; 4]) {
        if x < self.width && y < self.height {
            let off = (y * self.width + x) * 4;
            self.pixels[off..off + 4].copy_from_slice(&color);
        }
    }

    pub fn get(&self, x: usize, y: usize) -> [u8; 4] {
        let off = (y * self.width + x) * 4;
        [
            self.pixels[off],
            self.pixels[off + 1],
            self.pixels[off + 2],
            self.pixels[off + 3],
        ]
    }

    /// Draw a line segment with float endpoints by uniform stepping along
    /// the longer axis.
    pub fn draw_segment(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, color: [u8; 4]) {
        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil() as usize;
        if steps == 0 {
            if x0 >= 0.0 && y0 >= 0.0 {
                self.put(x0.round() as usize, y0.round() as usize, color);
            }
            return;
        }
        for k in 0..=steps {
            let t = k as f64 / steps as f64;
            let x = x0 + (x1 - x0) * t;
            let y = y0 + (y1 - y0) * t;
            if x >= 0.0 && y >= 0.0 {
                self.put(x.round() as usize, y.round() as usize, color);
            }
        }
    }
}

/// Visualization mode. Switching reallocates the backing raster at the new
/// mode's resolution; the previous raster is never rescaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VizMode {
    Color,
    Quiver,
}

/// Arrow subsampling stride for a lattice side length.
pub fn quiver_stride(n: usize) -> usize {
    if n <= 64 {
        1
    } else if n <= 128 {
        2
    } else {
        4
    }
}

/// Turns the lattice's angle buffer into a raster each tick: either one
/// hue pixel per site or a subsampled arrow field at fixed presentation
/// resolution.
#[derive(Debug)]
pub struct RenderPipeline {
    mode: VizMode,
    raster: Raster,
    view: SpinView,
}

impl RenderPipeline {
    pub fn new(mode: VizMode, lattice_size: usize) -> Self {
        Self {
            mode,
            raster: Self::allocate(mode, lattice_size),
            view: SpinView::new(),
        }
    }

    fn allocate(mode: VizMode, lattice_size: usize) -> Raster {
        match mode {
            VizMode::Color => Raster::new(lattice_size, lattice_size),
            VizMode::Quiver => Raster::new(QUIVER_RESOLUTION, QUIVER_RESOLUTION),
        }
    }

    pub fn mode(&self) -> VizMode {
        self.mode
    }

    /// Switch modes, reallocating the raster at the new mode's resolution.
    pub fn set_mode(&mut self, mode: VizMode, lattice_size: usize) {
        self.mode = mode;
        self.raster = Self::allocate(mode, lattice_size);
    }

    /// Render the current lattice state. The spin view is revalidated here,
    /// at the pipeline's single read site, so a lattice replacement can
    /// never be observed through a stale descriptor.
    pub fn render(&mut self, model: &XyModel) -> &Raster {
        let n = model.size();
        match self.mode {
            VizMode::Color => {
                if self.raster.width() != n || self.raster.height() != n {
                    self.raster = Raster::new(n, n);
                }
                let spins = self.view.refresh(model);
                for (idx, &theta) in spins.iter().enumerate() {
                    self.raster.put(idx % n, idx / n, angle_color(theta));
                }
            }
            VizMode::Quiver => {
                if self.raster.width() != QUIVER_RESOLUTION {
                    self.raster = Raster::new(QUIVER_RESOLUTION, QUIVER_RESOLUTION);
                }
                let spins = self.view.refresh(model);
                draw_quiver(&mut self.raster, spins, n);
            }
        }
        &self.raster
    }

    /// The most recently rendered frame.
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    /// View diagnostics (rebuild count, validated length).
    pub fn view(&self) -> &SpinView {
        &self.view
    }
}

/// Draw the subsampled arrow field onto `raster`. Each sampled site gets a
/// shaft of length 0.6·cell centered in its cell plus two head strokes at
/// ±30° from the direction, hue-colored like the color mode.
fn draw_quiver(raster: &mut Raster, spins: &[f64], n: usize) {
    raster.fill(QUIVER_BACKGROUND);

    let stride = quiver_stride(n);
    let grid = n.div_ceil(stride);
    let cell = raster.width() as f64 / grid as f64;
    let arrow_len = cell * 0.6;
    let head_len = arrow_len * 0.3;
    let head_angle = PI / 6.0;

    let mut i = 0;
    while i < n {
        let mut j = 0;
        while j < n {
            let theta = spins[i * n + j];
            let color = angle_color(theta);

            let cx = (j / stride) as f64 * cell + cell / 2.0;
            let cy = (i / stride) as f64 * cell + cell / 2.0;
            let (dx, dy) = (theta.cos(), theta.sin());

            let x1 = cx - dx * arrow_len / 2.0;
            let y1 = cy - dy * arrow_len / 2.0;
            let x2 = cx + dx * arrow_len / 2.0;
            let y2 = cy + dy * arrow_len / 2.0;
            raster.draw_segment(x1, y1, x2, y2, color);

            for side in [-1.0, 1.0] {
                let a = theta + side * head_angle;
                raster.draw_segment(
                    x2,
                    y2,
                    x2 - head_len * a.cos(),
                    y2 - head_len * a.sin(),
                    color,
                );
            }
            j += stride;
        }
        i += stride;
    }
}

/// Static hue legend: x ∈ [0, width) maps to angle ∈ [0, 2π).
pub fn colorbar(width: usize, height: usize) -> Raster {
    let mut raster = Raster::new(width, height);
    for x in 0..width {
        let theta = x as f64 / width as f64 * 2.0 * PI;
        let color = angle_color(theta);
        for y in 0..height {
            raster.put(x, y, color);
        }
    }
    raster
}
