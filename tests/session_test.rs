//! Session lifecycle: bounded edits, cluster-constraint coercion, sweep
//! driving and CSV export.

use xymc::algorithm::Algorithm;
use xymc::history::PlotKind;
use xymc::session::{Session, SessionConfig};
use xymc::sweep::{InvalidRangeError, SweepPhase, SweepSpec};

fn session(size: usize) -> Session {
    Session::new(SessionConfig {
        size,
        seed: Some(99),
        ..SessionConfig::default()
    })
}

fn quick_spec() -> SweepSpec {
    SweepSpec {
        t_init: 1.0,
        t_final: 1.5,
        t_step: 0.5,
        warmup_sweeps: 2,
        decorrelation_sweeps: 1,
        measurement_sweeps: 3,
        batch_size: 4,
    }
}

#[test]
fn out_of_bound_edits_are_rejected_without_mutation() {
    let mut s = session(16);
    let before = s.model().temp();
    assert!(s.set_temperature(0.05).is_err());
    assert!(s.set_temperature(7.0).is_err());
    assert!(s.set_temperature(f64::NAN).is_err());
    assert_eq!(s.model().temp(), before, "rejected edit must not stick");

    assert!(s.set_coupling(-3.0).is_err());
    assert!(s.set_field(2.5).is_err());
    assert!(s.set_sweeps_per_tick(0).is_err());
    assert!(s.set_sweeps_per_tick(101).is_err());

    assert!(s.set_temperature(3.0).is_ok());
    assert_eq!(s.model().temp(), 3.0);
}

#[test]
fn selecting_cluster_rule_coerces_invalid_parameters() {
    let mut s = session(16);
    s.set_field(0.5).unwrap();
    s.set_coupling(-1.0).unwrap();

    let notice = s.set_algorithm(Algorithm::Wolff);
    let err = notice.expect("violation must be reported");
    assert_eq!(err.algorithm, Algorithm::Wolff);
    assert_eq!(err.field, 0.5);
    assert_eq!(err.coupling, -1.0);

    assert_eq!(s.model().field(), 0.0);
    assert_eq!(s.model().coupling(), 1.0);

    // Once coerced, re-selecting is quiet.
    assert!(s.set_algorithm(Algorithm::SwendsenWang).is_none());
}

#[test]
fn editing_parameters_under_cluster_rule_coerces_back() {
    let mut s = session(16);
    assert!(s.set_algorithm(Algorithm::SwendsenWang).is_none());

    let notice = s.set_field(1.0).unwrap();
    assert!(notice.is_some(), "field edit under cluster rule is coerced");
    assert_eq!(s.model().field(), 0.0);

    let notice = s.set_coupling(-0.5).unwrap();
    assert!(notice.is_some());
    assert_eq!(s.model().coupling(), 1.0);

    // Non-cluster rules accept the same edits silently.
    s.set_algorithm(Algorithm::Metropolis);
    assert!(s.set_field(1.0).unwrap().is_none());
    assert_eq!(s.model().field(), 1.0);
}

#[test]
fn free_running_tick_paces_by_sweeps_per_tick() {
    let mut s = session(16);
    s.set_sweeps_per_tick(3).unwrap();
    let outcome = s.tick();
    assert_eq!(outcome.steps, 3);
    assert!(!outcome.sweep_active);
    assert_eq!(s.plot().buffer().len(), 1, "each tick records one point");
}

#[test]
fn sweep_runs_to_completion_through_session_ticks() {
    let mut s = session(16);
    s.start_sweep(quick_spec()).unwrap();
    assert!(s.sweep().unwrap().is_active());

    let mut guard = 0;
    loop {
        let outcome = s.tick();
        if !outcome.sweep_active {
            break;
        }
        guard += 1;
        assert!(guard < 10_000, "sweep failed to terminate");
    }
    assert_eq!(s.results().len(), 2, "one result per ladder temperature");

    // Results survive after the sweep goes inactive and free-running
    // ticks resume.
    s.tick();
    assert_eq!(s.results().len(), 2);
}

#[test]
fn invalid_sweep_spec_leaves_previous_results_readable() {
    let mut s = session(16);
    s.start_sweep(quick_spec()).unwrap();
    while s.tick().sweep_active {}
    assert_eq!(s.results().len(), 2);

    let bad = SweepSpec {
        t_step: 0.0,
        ..quick_spec()
    };
    assert_eq!(s.start_sweep(bad).err(), Some(InvalidRangeError::ZeroStep));
    assert_eq!(s.results().len(), 2, "failed start must not clobber results");
}

#[test]
fn cancel_takes_effect_at_tick_boundary() {
    let mut s = session(16);
    s.start_sweep(quick_spec()).unwrap();
    s.tick();
    s.cancel_sweep();
    let outcome = s.tick();
    assert_eq!(outcome.steps, s.sweeps_per_tick(), "free-running resumed");
    assert!(!outcome.sweep_active);
}

#[test]
fn pacing_change_propagates_into_active_sweep() {
    let mut s = session(16);
    s.start_sweep(SweepSpec {
        warmup_sweeps: 50,
        ..quick_spec()
    })
    .unwrap();
    s.set_sweeps_per_tick(2).unwrap();
    let outcome = s.tick();
    assert_eq!(outcome.steps, 2);
    assert_eq!(s.sweep().unwrap().phase(), SweepPhase::Warmup);
}

#[test]
fn resize_replaces_the_lattice_wholesale() {
    let mut s = session(64);
    s.tick();
    assert!(s.resize_lattice(48).is_err(), "only selector sizes allowed");
    s.resize_lattice(32).unwrap();
    assert_eq!(s.model().size(), 32);
    assert!(s.plot().buffer().is_empty(), "history dies with the lattice");
    assert_eq!(s.render().width(), 32);
}

#[test]
fn reset_data_clears_counters_and_history() {
    let mut s = session(16);
    s.tick();
    assert!(s.model().attempted() > 0);
    s.reset_data();
    assert_eq!(s.model().attempted(), 0);
    assert!(s.plot().buffer().is_empty());
}

#[test]
fn plot_kind_selection_feeds_the_chosen_scalar() {
    let mut s = session(16);
    s.set_plot_kind(PlotKind::AcceptanceRatio);
    s.tick();
    let recorded = s.plot().buffer().iter().next().unwrap();
    assert!((0.0..=1.0).contains(&recorded));
}

#[test]
fn csv_export_matches_result_count() {
    let mut s = session(16);
    s.start_sweep(quick_spec()).unwrap();
    while s.tick().sweep_active {}

    let mut buf = Vec::new();
    s.export_csv(&mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1 + s.results().len());
    for row in &lines[1..] {
        assert_eq!(row.split(',').count(), 13);
    }
}

#[test]
fn unknown_algorithm_identifier_fails_fast() {
    assert!("metropolis".parse::<Algorithm>().is_ok());
    assert!("heat-bath".parse::<Algorithm>().is_ok());
    assert!("metropolis-hastings".parse::<Algorithm>().is_err());
    assert!("".parse::<Algorithm>().is_err());
    for algorithm in Algorithm::ALL {
        assert_eq!(algorithm.id().parse::<Algorithm>(), Ok(algorithm));
    }
}
