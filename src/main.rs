//! Headless temperature-sweep driver: runs the full interactive tick loop
//! without a display, then writes the CSV artifact (and optionally a PPM
//! snapshot of the final lattice frame).

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use xymc::algorithm::Algorithm;
use xymc::render::VizMode;
use xymc::session::{Session, SessionConfig, LATTICE_SIZES};
use xymc::sweep::SweepSpec;

#[derive(Debug, Parser)]
#[command(name = "xymc", about = "XY-model temperature sweep")]
struct Cli {
    /// Lattice side length (16, 32, 64, 128 or 256).
    #[arg(long, default_value_t = 64)]
    size: usize,

    /// Update rule (metropolis, metropolis-reflection, overrelaxation,
    /// wolff, swendsen-wang, heat-bath, glauber, kawasaki).
    #[arg(long, default_value = "metropolis")]
    algorithm: Algorithm,

    /// Coupling constant J.
    #[arg(long, default_value_t = 1.0)]
    coupling: f64,

    /// External field h.
    #[arg(long, default_value_t = 0.0)]
    field: f64,

    #[arg(long, default_value_t = 0.5)]
    t_init: f64,

    #[arg(long, default_value_t = 2.5)]
    t_final: f64,

    #[arg(long, default_value_t = 0.1)]
    t_step: f64,

    /// Warmup sweeps per temperature.
    #[arg(long, default_value_t = 200)]
    warmup: usize,

    /// Decorrelation sweeps per temperature.
    #[arg(long, default_value_t = 50)]
    decorrelation: usize,

    /// Measurement sweeps per temperature.
    #[arg(long, default_value_t = 500)]
    measure: usize,

    /// Engine steps per scheduler tick.
    #[arg(long, default_value_t = 16)]
    batch: usize,

    /// RNG seed for a reproducible run.
    #[arg(long)]
    seed: Option<u64>,

    /// Output CSV path; defaults to xy_<algorithm>_results.csv.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also write the final lattice frame as a binary PPM.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    if !LATTICE_SIZES.contains(&cli.size) {
        return Err(format!("lattice size must be one of {LATTICE_SIZES:?}"));
    }

    let mut session = Session::new(SessionConfig {
        size: cli.size,
        coupling: cli.coupling,
        field: cli.field,
        algorithm: cli.algorithm,
        sweeps_per_tick: cli.batch,
        seed: cli.seed,
        ..SessionConfig::default()
    });

    if let Some(notice) = session.set_algorithm(cli.algorithm) {
        println!("note: {notice}; field/coupling coerced");
    }

    let spec = SweepSpec {
        t_init: cli.t_init,
        t_final: cli.t_final,
        t_step: cli.t_step,
        warmup_sweeps: cli.warmup,
        decorrelation_sweeps: cli.decorrelation,
        measurement_sweeps: cli.measure,
        batch_size: cli.batch,
    };
    session.start_sweep(spec).map_err(|e| e.to_string())?;

    let sweep = session.sweep().expect("sweep just started");
    let n_temps = sweep.temperatures().len();
    println!(
        "Sweeping {} temperatures with {} on a {}x{} lattice",
        n_temps,
        cli.algorithm,
        cli.size,
        cli.size
    );

    let bar = ProgressBar::new(sweep.total_steps() as u64);
    bar.set_style(
        ProgressStyle::with_template(" {bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}]")
            .expect("valid template"),
    );

    loop {
        let outcome = session.tick();
        bar.inc(outcome.steps as u64);
        if !outcome.sweep_active {
            break;
        }
    }
    bar.finish();

    let output = cli
        .output
        .unwrap_or_else(|| PathBuf::from(format!("xy_{}_results.csv", cli.algorithm.csv_tag())));
    let file = File::create(&output).map_err(|e| format!("cannot create {output:?}: {e}"))?;
    session
        .export_csv(BufWriter::new(file))
        .map_err(|e| e.to_string())?;

    print_summary(&session);
    println!("Sweep complete -> {}", output.display());

    if let Some(path) = cli.snapshot {
        session.set_viz_mode(VizMode::Color);
        write_ppm(&path, session.render())
            .map_err(|e| format!("cannot write snapshot {path:?}: {e}"))?;
        println!("Snapshot -> {}", path.display());
    }
    Ok(())
}

fn print_summary(session: &Session) {
    println!(
        "{:>8} {:>12} {:>12} {:>12} {:>12}",
        "T", "Energy", "Magnetiz.", "SpecHeat", "Suscept."
    );
    for r in session.results() {
        println!(
            "{:>8.4} {:>12.6} {:>12.6} {:>12.6} {:>12.6}",
            r.temp, r.energy.mean, r.magnetization.mean, r.specific_heat, r.susceptibility
        );
    }
}

/// Dump a raster as binary PPM (P6). Alpha is dropped.
fn write_ppm(path: &PathBuf, raster: &xymc::render::Raster) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write!(out, "P6\n{} {}\n255\n", raster.width(), raster.height())?;
    for px in raster.as_rgba().chunks_exact(4) {
        out.write_all(&px[..3])?;
    }
    out.flush()
}
