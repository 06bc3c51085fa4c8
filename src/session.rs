// session.rs - one owned context for the interactive simulation lifecycle

use crate::algorithm::Algorithm;
use crate::history::{LiveHistoryPlot, PlotKind};
use crate::lattice::XyModel;
use crate::render::{Raster, RenderPipeline, VizMode};
use crate::sweep::{InvalidRangeError, MeasurementResult, SweepController, SweepSpec};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::io;
use thiserror::Error;

/// Lattice side lengths the size selector offers.
pub const LATTICE_SIZES: [usize; 5] = [16, 32, 64, 128, 256];

pub const TEMP_BOUNDS: (f64, f64) = (0.1, 5.0);
pub const COUPLING_BOUNDS: (f64, f64) = (-2.0, 2.0);
pub const FIELD_BOUNDS: (f64, f64) = (-2.0, 2.0);
pub const PACING_BOUNDS: (usize, usize) = (1, 100);

/// Coupling value a cluster-constraint violation is coerced to.
const SAFE_COUPLING: f64 = 1.0;

const PLOT_WIDTH: usize = 400;
const PLOT_HEIGHT: usize = 300;

/// A numeric edit outside its allowed bound. The edit is rejected with no
/// state mutated; the caller reverts its input display to the last valid
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("value {value} outside allowed range [{min}, {max}]")]
pub struct InvalidInputError {
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

/// A cluster update rule was combined with a nonzero field or negative
/// coupling. The session recovers by coercing field to 0 and coupling to
/// 1.0; the value reports what was violated so the user can be notified.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("{algorithm} requires h = 0 and J >= 0 (had h = {field}, J = {coupling})")]
pub struct AlgorithmConstraintError {
    pub algorithm: Algorithm,
    pub field: f64,
    pub coupling: f64,
}

fn check_bounds(value: f64, (min, max): (f64, f64)) -> Result<(), InvalidInputError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(InvalidInputError { value, min, max })
    }
}

/// Boot configuration; the defaults mirror the interactive surface's
/// initial state.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub size: usize,
    pub temp: f64,
    pub coupling: f64,
    pub field: f64,
    pub algorithm: Algorithm,
    pub sweeps_per_tick: usize,
    pub plot_kind: PlotKind,
    pub viz_mode: VizMode,
    /// Fixed RNG seed for reproducible runs; entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            size: 64,
            temp: 2.27,
            coupling: 1.0,
            field: 0.0,
            algorithm: Algorithm::Metropolis,
            sweeps_per_tick: 1,
            plot_kind: PlotKind::Energy,
            viz_mode: VizMode::Color,
            seed: None,
        }
    }
}

/// What one scheduler tick did.
#[derive(Debug, Clone, Copy)]
pub struct TickOutcome {
    /// Engine steps executed this tick.
    pub steps: usize,
    /// Whether a sweep is still driving the session after this tick.
    pub sweep_active: bool,
}

/// Owns the simulation handle, pacing, visualization pipeline, live plot
/// and sweep state, with an explicit construct/reset lifecycle. All
/// mutation happens on the thread driving `tick`.
pub struct Session {
    model: XyModel,
    algorithm: Algorithm,
    sweeps_per_tick: usize,
    pipeline: RenderPipeline,
    plot: LiveHistoryPlot,
    sweep: Option<SweepController>,
    seed: Option<u64>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let model = Self::build_model(&config, config.size);
        let pipeline = RenderPipeline::new(config.viz_mode, config.size);
        let plot = LiveHistoryPlot::new(config.plot_kind, PLOT_WIDTH, PLOT_HEIGHT);
        Self {
            model,
            algorithm: config.algorithm,
            sweeps_per_tick: config.sweeps_per_tick,
            pipeline,
            plot,
            sweep: None,
            seed: config.seed,
        }
    }

    fn build_model(config: &SessionConfig, size: usize) -> XyModel {
        match config.seed {
            Some(seed) => XyModel::with_rng(
                SmallRng::seed_from_u64(seed),
                size,
                config.temp,
                config.coupling,
                config.field,
            ),
            None => XyModel::new(size, config.temp, config.coupling, config.field),
        }
    }

    pub fn model(&self) -> &XyModel {
        &self.model
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn sweeps_per_tick(&self) -> usize {
        self.sweeps_per_tick
    }

    pub fn plot(&self) -> &LiveHistoryPlot {
        &self.plot
    }

    pub fn sweep(&self) -> Option<&SweepController> {
        self.sweep.as_ref()
    }

    /// Results of the current or most recently run sweep.
    pub fn results(&self) -> &[MeasurementResult] {
        self.sweep.as_ref().map(|s| s.results()).unwrap_or(&[])
    }

    // ----- bounded parameter edits -------------------------------------

    pub fn set_temperature(&mut self, temp: f64) -> Result<(), InvalidInputError> {
        check_bounds(temp, TEMP_BOUNDS)?;
        self.model.set_temp(temp);
        Ok(())
    }

    /// Set J. Valid edits may still violate an active cluster algorithm's
    /// constraint, in which case the session coerces and reports it.
    pub fn set_coupling(
        &mut self,
        coupling: f64,
    ) -> Result<Option<AlgorithmConstraintError>, InvalidInputError> {
        check_bounds(coupling, COUPLING_BOUNDS)?;
        self.model.set_coupling(coupling);
        Ok(self.enforce_cluster_constraint())
    }

    /// Set h, with the same coercion rule as `set_coupling`.
    pub fn set_field(
        &mut self,
        field: f64,
    ) -> Result<Option<AlgorithmConstraintError>, InvalidInputError> {
        check_bounds(field, FIELD_BOUNDS)?;
        self.model.set_field(field);
        Ok(self.enforce_cluster_constraint())
    }

    pub fn set_sweeps_per_tick(&mut self, sweeps: usize) -> Result<(), InvalidInputError> {
        if !(PACING_BOUNDS.0..=PACING_BOUNDS.1).contains(&sweeps) {
            return Err(InvalidInputError {
                value: sweeps as f64,
                min: PACING_BOUNDS.0 as f64,
                max: PACING_BOUNDS.1 as f64,
            });
        }
        self.sweeps_per_tick = sweeps;
        if let Some(sweep) = &mut self.sweep {
            sweep.set_batch_size(sweeps);
        }
        Ok(())
    }

    /// Select the update rule. Choosing a cluster rule under a nonzero
    /// field or negative coupling coerces the parameters and reports it.
    pub fn set_algorithm(&mut self, algorithm: Algorithm) -> Option<AlgorithmConstraintError> {
        self.algorithm = algorithm;
        self.enforce_cluster_constraint()
    }

    fn enforce_cluster_constraint(&mut self) -> Option<AlgorithmConstraintError> {
        if !self.algorithm.is_cluster() {
            return None;
        }
        let (field, coupling) = (self.model.field(), self.model.coupling());
        if field == 0.0 && coupling >= 0.0 {
            return None;
        }
        if field != 0.0 {
            self.model.set_field(0.0);
        }
        if coupling < 0.0 {
            self.model.set_coupling(SAFE_COUPLING);
        }
        Some(AlgorithmConstraintError {
            algorithm: self.algorithm,
            field,
            coupling,
        })
    }

    // ----- lifecycle ----------------------------------------------------

    /// Replace the lattice wholesale at a new side length. Any view built
    /// against the old handle is invalidated; plot history dies with the
    /// old lattice.
    pub fn resize_lattice(&mut self, size: usize) -> Result<(), InvalidInputError> {
        if !LATTICE_SIZES.contains(&size) {
            return Err(InvalidInputError {
                value: size as f64,
                min: LATTICE_SIZES[0] as f64,
                max: LATTICE_SIZES[LATTICE_SIZES.len() - 1] as f64,
            });
        }
        let config = self.current_config(size);
        self.model = Self::build_model(&config, size);
        self.plot.clear();
        Ok(())
    }

    /// Rebuild the lattice at the current parameters (fresh random spins).
    pub fn reset(&mut self) {
        let config = self.current_config(self.model.size());
        self.model = Self::build_model(&config, self.model.size());
        self.plot.clear();
    }

    /// Clear counters and history without touching the configuration.
    pub fn reset_data(&mut self) {
        self.model.reset_data();
        self.plot.clear();
    }

    fn current_config(&self, size: usize) -> SessionConfig {
        SessionConfig {
            size,
            temp: self.model.temp(),
            coupling: self.model.coupling(),
            field: self.model.field(),
            algorithm: self.algorithm,
            sweeps_per_tick: self.sweeps_per_tick,
            plot_kind: self.plot.kind(),
            viz_mode: self.pipeline.mode(),
            seed: self.seed,
        }
    }

    // ----- sweep control -------------------------------------------------

    /// Validate and start a temperature sweep. On failure nothing is
    /// mutated and any previous sweep's results remain readable.
    pub fn start_sweep(&mut self, spec: SweepSpec) -> Result<(), InvalidRangeError> {
        let controller = SweepController::start(spec)?;
        self.sweep = Some(controller);
        Ok(())
    }

    /// Cooperative cancel; takes effect at the next tick boundary.
    pub fn cancel_sweep(&mut self) {
        if let Some(sweep) = &mut self.sweep {
            sweep.cancel();
        }
    }

    // ----- scheduling ----------------------------------------------------

    /// One cooperative scheduler tick: a sweep-driven batch when a sweep is
    /// active, otherwise a free-running batch at the configured pacing.
    /// Afterwards the selected scalar is pushed into the live history.
    pub fn tick(&mut self) -> TickOutcome {
        let steps = match &mut self.sweep {
            Some(sweep) if sweep.is_active() => sweep.tick(&mut self.model, self.algorithm),
            _ => {
                for _ in 0..self.sweeps_per_tick {
                    self.algorithm.step(&mut self.model);
                }
                self.sweeps_per_tick
            }
        };

        let value = match self.plot.kind() {
            PlotKind::Energy => self.model.energy(),
            PlotKind::Magnetization => self.model.magnetization(),
            PlotKind::AcceptanceRatio => self.model.acceptance_ratio(),
        };
        self.plot.push(value);

        TickOutcome {
            steps,
            sweep_active: self.sweep.as_ref().is_some_and(|s| s.is_active()),
        }
    }

    // ----- frame production ------------------------------------------------

    pub fn viz_mode(&self) -> VizMode {
        self.pipeline.mode()
    }

    pub fn set_viz_mode(&mut self, mode: VizMode) {
        self.pipeline.set_mode(mode, self.model.size());
    }

    /// Render the lattice through the pipeline (revalidating the spin
    /// view).
    pub fn render(&mut self) -> &Raster {
        self.pipeline.render(&self.model)
    }

    pub fn set_plot_kind(&mut self, kind: PlotKind) {
        self.plot.set_kind(kind);
    }

    /// Render the live history plot at the current coupling/field scale.
    pub fn render_history(&self) -> Raster {
        self.plot.render(self.model.coupling(), self.model.field())
    }

    /// Export accumulated sweep results in the fixed 13-column CSV format.
    pub fn export_csv<W: io::Write>(&self, writer: W) -> csv::Result<()> {
        crate::sweep::write_csv(self.results(), writer)
    }
}
