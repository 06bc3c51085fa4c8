// sweep.rs - temperature-sweep state machine and result finalization

use crate::algorithm::Algorithm;
use crate::binning::{binned_estimate, specific_heat, susceptibility, BinnedEstimate, DEFAULT_BIN_TARGET};
use crate::lattice::XyModel;
use std::io;
use thiserror::Error;

/// Ladder values are rounded to this many decimal places, so repeated step
/// addition cannot smear the printed temperatures.
const LADDER_DECIMALS: f64 = 1e6;

/// Sweep parameters. Immutable once a sweep starts, except `batch_size`
/// (the user may change pacing mid-sweep).
#[derive(Debug, Clone)]
pub struct SweepSpec {
    pub t_init: f64,
    pub t_final: f64,
    pub t_step: f64,
    /// Sweeps discarded while equilibrating at each new temperature.
    pub warmup_sweeps: usize,
    /// Sweeps discarded between measurements.
    pub decorrelation_sweeps: usize,
    /// Sweeps sampled into the estimators.
    pub measurement_sweeps: usize,
    /// Engine steps executed per scheduler tick.
    pub batch_size: usize,
}

/// Inconsistent sweep range parameters. The sweep does not start and no
/// state is mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidRangeError {
    #[error("sweep parameters must be finite")]
    NonFinite,
    #[error("temperature step must be non-zero")]
    ZeroStep,
    #[error("temperature step direction does not match the range")]
    StepDirection,
    #[error("at least one measurement sweep is required")]
    NoMeasurementSweeps,
    #[error("batch size must be at least 1")]
    ZeroBatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPhase {
    Warmup,
    Decorrelation,
    Measurement,
}

/// Estimates for one fully measured temperature. Immutable once appended.
#[derive(Debug, Clone)]
pub struct MeasurementResult {
    pub temp: f64,
    pub energy: BinnedEstimate,
    pub magnetization: BinnedEstimate,
    pub acceptance: BinnedEstimate,
    pub energy_sq: BinnedEstimate,
    pub magnetization_sq: BinnedEstimate,
    pub specific_heat: f64,
    pub susceptibility: f64,
}

/// Raw per-step sample series for the temperature currently being measured.
/// Discarded as soon as the temperature is finalized.
#[derive(Debug, Default)]
struct SampleSet {
    energy: Vec<f64>,
    magnetization: Vec<f64>,
    acceptance: Vec<f64>,
    energy_sq: Vec<f64>,
    magnetization_sq: Vec<f64>,
}

impl SampleSet {
    fn record(&mut self, model: &XyModel) {
        let e = model.energy();
        let m = model.magnetization();
        self.energy.push(e);
        self.magnetization.push(m);
        self.acceptance.push(model.acceptance_ratio());
        self.energy_sq.push(e * e);
        self.magnetization_sq.push(m * m);
    }

    fn finalize(&self, temp: f64) -> MeasurementResult {
        let energy = binned_estimate(&self.energy, DEFAULT_BIN_TARGET);
        let magnetization = binned_estimate(&self.magnetization, DEFAULT_BIN_TARGET);
        let acceptance = binned_estimate(&self.acceptance, DEFAULT_BIN_TARGET);
        let energy_sq = binned_estimate(&self.energy_sq, DEFAULT_BIN_TARGET);
        let magnetization_sq = binned_estimate(&self.magnetization_sq, DEFAULT_BIN_TARGET);
        let specific_heat = specific_heat(&energy, &energy_sq, temp);
        let susceptibility = susceptibility(&magnetization, &magnetization_sq, temp);
        MeasurementResult {
            temp,
            energy,
            magnetization,
            acceptance,
            energy_sq,
            magnetization_sq,
            specific_heat,
            susceptibility,
        }
    }
}

/// Drives Warmup → Decorrelation → Measurement across an inclusive
/// temperature ladder, one bounded batch of engine steps per tick.
#[derive(Debug)]
pub struct SweepController {
    spec: SweepSpec,
    temps: Vec<f64>,
    active: bool,
    phase: SweepPhase,
    temp_index: usize,
    progress: usize,
    samples: SampleSet,
    results: Vec<MeasurementResult>,
}

/// Build the inclusive temperature ladder for the given range. The final
/// value is always present, even when stepping overshoots it.
fn temperature_ladder(t_init: f64, t_final: f64, t_step: f64) -> Vec<f64> {
    let round = |t: f64| (t * LADDER_DECIMALS).round() / LADDER_DECIMALS;
    let mut temps = Vec::new();
    let mut i = 0usize;
    loop {
        let t = round(t_init + i as f64 * t_step);
        let past_end = if t_step > 0.0 { t > t_final } else { t < t_final };
        if past_end {
            break;
        }
        temps.push(t);
        i += 1;
    }
    let end = round(t_final);
    if temps.last() != Some(&end) {
        temps.push(end);
    }
    temps
}

impl SweepController {
    /// Validate `spec` and start a sweep in phase Warmup at the first
    /// ladder temperature.
    pub fn start(spec: SweepSpec) -> Result<Self, InvalidRangeError> {
        if !(spec.t_init.is_finite() && spec.t_final.is_finite() && spec.t_step.is_finite()) {
            return Err(InvalidRangeError::NonFinite);
        }
        if spec.t_step == 0.0 {
            return Err(InvalidRangeError::ZeroStep);
        }
        if (spec.t_step > 0.0 && spec.t_init > spec.t_final)
            || (spec.t_step < 0.0 && spec.t_init < spec.t_final)
        {
            return Err(InvalidRangeError::StepDirection);
        }
        if spec.measurement_sweeps == 0 {
            return Err(InvalidRangeError::NoMeasurementSweeps);
        }
        if spec.batch_size == 0 {
            return Err(InvalidRangeError::ZeroBatch);
        }

        let temps = temperature_ladder(spec.t_init, spec.t_final, spec.t_step);
        Ok(Self {
            spec,
            temps,
            active: true,
            phase: SweepPhase::Warmup,
            temp_index: 0,
            progress: 0,
            samples: SampleSet::default(),
            results: Vec::new(),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn phase(&self) -> SweepPhase {
        self.phase
    }

    pub fn temp_index(&self) -> usize {
        self.temp_index
    }

    /// Progress counter inside the current phase.
    pub fn progress(&self) -> usize {
        self.progress
    }

    pub fn temperatures(&self) -> &[f64] {
        &self.temps
    }

    /// Ladder temperature currently being worked, if any remain.
    pub fn current_temp(&self) -> Option<f64> {
        self.temps.get(self.temp_index).copied()
    }

    /// Finalized per-temperature results, oldest first.
    pub fn results(&self) -> &[MeasurementResult] {
        &self.results
    }

    /// Adjust pacing mid-sweep. All other spec fields stay frozen.
    pub fn set_batch_size(&mut self, batch_size: usize) {
        if batch_size >= 1 {
            self.spec.batch_size = batch_size;
        }
    }

    /// Cooperative cancellation: deactivates the sweep, keeps every
    /// finalized result and discards the in-progress temperature's samples.
    pub fn cancel(&mut self) {
        self.active = false;
        self.samples = SampleSet::default();
    }

    /// Total engine steps a full run of this sweep will execute; drives
    /// progress reporting.
    pub fn total_steps(&self) -> usize {
        self.temps.len()
            * (self.spec.warmup_sweeps + self.spec.decorrelation_sweeps + self.spec.measurement_sweeps)
    }

    fn phase_target(&self) -> usize {
        match self.phase {
            SweepPhase::Warmup => self.spec.warmup_sweeps,
            SweepPhase::Decorrelation => self.spec.decorrelation_sweeps,
            SweepPhase::Measurement => self.spec.measurement_sweeps,
        }
    }

    /// One scheduler tick: run at most `batch_size` engine steps against
    /// the current phase and advance the state machine when the phase's
    /// target is reached. Returns the number of steps actually executed.
    pub fn tick(&mut self, model: &mut XyModel, algorithm: Algorithm) -> usize {
        if !self.active {
            return 0;
        }
        let temp = match self.current_temp() {
            Some(t) => t,
            None => {
                self.active = false;
                return 0;
            }
        };
        model.set_temp(temp);

        // Single phase-parameterized batch routine; only the measurement
        // phase records samples.
        let remaining = self.phase_target().saturating_sub(self.progress);
        let batch = self.spec.batch_size.min(remaining);
        let measuring = self.phase == SweepPhase::Measurement;
        for _ in 0..batch {
            algorithm.step(model);
            if measuring {
                self.samples.record(model);
            }
        }
        self.progress += batch;

        if self.progress >= self.phase_target() {
            self.advance_phase(temp);
        }
        batch
    }

    fn advance_phase(&mut self, temp: f64) {
        self.progress = 0;
        match self.phase {
            SweepPhase::Warmup => self.phase = SweepPhase::Decorrelation,
            SweepPhase::Decorrelation => self.phase = SweepPhase::Measurement,
            SweepPhase::Measurement => {
                self.results.push(self.samples.finalize(temp));
                self.samples = SampleSet::default();
                self.temp_index += 1;
                self.phase = SweepPhase::Warmup;
                if self.temp_index >= self.temps.len() {
                    self.active = false;
                }
            }
        }
    }
}

/// CSV header for exported sweep results.
pub const CSV_HEADER: [&str; 13] = [
    "T",
    "Energy",
    "Energy_SEM",
    "Magnetization",
    "Magnetization_SEM",
    "Acceptance",
    "Acceptance_SEM",
    "Energy2",
    "Energy2_SEM",
    "Magnetization2",
    "Magnetization2_SEM",
    "SpecificHeat",
    "MagneticSusceptibility",
];

/// Write the result list as CSV: one header line, one unquoted row per
/// completed temperature, values in native `f64` precision.
pub fn write_csv<W: io::Write>(results: &[MeasurementResult], writer: W) -> csv::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for r in results {
        wtr.write_record(&[
            r.temp.to_string(),
            r.energy.mean.to_string(),
            r.energy.sem.to_string(),
            r.magnetization.mean.to_string(),
            r.magnetization.sem.to_string(),
            r.acceptance.mean.to_string(),
            r.acceptance.sem.to_string(),
            r.energy_sq.mean.to_string(),
            r.energy_sq.sem.to_string(),
            r.magnetization_sq.mean.to_string(),
            r.magnetization_sq.sem.to_string(),
            r.specific_heat.to_string(),
            r.susceptibility.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
