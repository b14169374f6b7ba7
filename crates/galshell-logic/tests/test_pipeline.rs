//! Integration tests for the full shell pipeline.
//!
//! Exercises: RunConfig → arms → sampler → density + membership
//! → ExpectationResult → sensitivity sweep → convergence study.

use galshell_logic::arms::{reid_2014_arms, write_arm_table};
use galshell_logic::config::RunConfig;
use galshell_logic::convergence::{convergence_study, relative_change};
use galshell_logic::expectation::{read_population, run_shell_model, write_results};
use galshell_logic::ModelError;

// ── Helpers ────────────────────────────────────────────────────────────

/// The 20,366–20,374 ly reference shell the published counts refer to.
fn reference_config(samples: usize) -> RunConfig {
    let mut config = RunConfig::default();
    config.shell.inner_radius_ly = 20366.0;
    config.shell.outer_radius_ly = 20374.0;
    config.sampling.samples = samples;
    config
}

// ── End-to-end values ──────────────────────────────────────────────────

#[test]
fn reference_shell_counts() {
    let run = run_shell_model(&reference_config(100_000)).unwrap();
    let r = &run.result;

    assert!((r.shell_volume / 1.2023e9 - 1.0).abs() < 1e-3, "V={}", r.shell_volume);
    assert!(
        r.expected_shell > 3.6e6 && r.expected_shell < 4.5e6,
        "N_shell={}",
        r.expected_shell
    );
    assert!(
        r.arm_fraction > 0.25 && r.arm_fraction < 0.29,
        "fraction={}",
        r.arm_fraction
    );
    assert!(r.expected_arms < r.expected_shell);
    assert!(!r.params.use_reid_csv);
    assert_eq!(run.arm_set.arms().len(), 4);
}

#[test]
fn default_shell_counts() {
    let mut config = RunConfig::default();
    config.sampling.samples = 20_000;
    let r = run_shell_model(&config).unwrap().result;

    assert!((r.shell_volume / 1.9527e9 - 1.0).abs() < 1e-3, "V={}", r.shell_volume);
    assert!(
        r.expected_shell > 6.2e6 && r.expected_shell < 7.5e6,
        "N_shell={}",
        r.expected_shell
    );
    assert!(
        r.arm_fraction > 0.31 && r.arm_fraction < 0.35,
        "fraction={}",
        r.arm_fraction
    );
}

#[test]
fn deterministic_output() {
    let config = reference_config(5_000);
    let a = run_shell_model(&config).unwrap();
    let b = run_shell_model(&config).unwrap();
    assert_eq!(a.result, b.result);
    assert_eq!(a.memberships, b.memberships);

    let mut other = config.clone();
    other.sampling.seed += 1;
    let c = run_shell_model(&other).unwrap();
    assert_ne!(a.result.expected_shell, c.result.expected_shell);
}

#[test]
fn sensitivity_rows_scale_with_population() {
    let r = run_shell_model(&reference_config(5_000)).unwrap().result;
    assert_eq!(r.sensitivity.len(), 4);
    let at_default = r
        .sensitivity
        .iter()
        .find(|row| row.total_population == 2.0e10)
        .unwrap();
    assert!((at_default.expected_arms - r.expected_arms).abs() < 1e-6 * r.expected_arms);
    assert!((r.sensitivity[3].expected_arms / r.sensitivity[0].expected_arms - 10.0).abs() < 1e-9);
}

#[test]
fn in_arm_positions_match_fraction() {
    let run = run_shell_model(&reference_config(4_000)).unwrap();
    let positions = run.in_arm_positions();
    let expected = (run.result.arm_fraction * 4_000.0).round() as usize;
    assert_eq!(positions.len(), expected);
    for p in &positions {
        assert!((p.x.hypot(p.y) - p.r).abs() < 1e-6);
    }
}

// ── Arm table handling ─────────────────────────────────────────────────

#[test]
fn missing_table_uses_parametric_arms() {
    let mut config = reference_config(2_000);
    config.arms.table = Some("/nonexistent/reid_arms.csv".into());
    config.arms.count = 3;
    let run = run_shell_model(&config).unwrap();
    assert!(!run.arm_set.is_loaded());
    assert_eq!(run.arm_set.arms().len(), 3);
    assert!(run.arm_set.arms().iter().all(|a| a.r_ref == 8122.0));
    assert!(!run.result.params.use_reid_csv);
}

#[test]
fn loaded_table_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reid_arms.csv");
    write_arm_table(&path, &reid_2014_arms()).unwrap();

    let mut config = reference_config(2_000);
    config.arms.table = Some(path);
    let run = run_shell_model(&config).unwrap();
    assert!(run.arm_set.is_loaded());
    assert!(run.result.params.use_reid_csv);
    assert_eq!(run.arm_set.arms()[0].name, "Perseus");
}

// ── Validation and hand-off ────────────────────────────────────────────

#[test]
fn invalid_config_rejected_before_sampling() {
    let mut config = reference_config(1_000);
    config.disk.scale_length_pc = -1.0;
    config.arms.window_steps = 4;
    match run_shell_model(&config) {
        Err(ModelError::InvalidConfig(errors)) => assert_eq!(errors.len(), 2),
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
}

#[test]
fn results_hand_off_to_drake_stage() {
    let run = run_shell_model(&reference_config(2_000)).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("g_star_results.json");
    write_results(&path, &run.result).unwrap();
    let n = read_population(&path).unwrap();
    assert!((n - run.result.expected_arms).abs() <= 1e-9 * n);
}

// ── Convergence ────────────────────────────────────────────────────────

#[test]
fn spread_shrinks_with_sqrt_samples() {
    let report = convergence_study(&reference_config(1_000), &[1_000, 10_000], 24, 1234).unwrap();
    let ratio = report.ratios[0];
    // Ideal is √10 ≈ 3.16; accept within a factor of two.
    assert!(ratio.within(2.0), "observed {} expected {}", ratio.observed, ratio.expected);
}

#[test]
fn larger_run_changes_little() {
    let small = run_shell_model(&reference_config(20_000)).unwrap().result;
    let mut big_config = reference_config(200_000);
    big_config.sampling.seed = 7;
    let big = run_shell_model(&big_config).unwrap().result;
    let change = relative_change(&small, &big);

    // Both estimates should agree within four combined standard errors.
    let shell_tol = 4.0 * small.stderr_shell.hypot(big.stderr_shell) / small.expected_shell * 100.0;
    let arms_tol = 4.0 * small.stderr_arms.hypot(big.stderr_arms) / small.expected_arms * 100.0;
    assert!(change.shell_pct < shell_tol, "shell changed {}% (tol {shell_tol}%)", change.shell_pct);
    assert!(change.arms_pct < arms_tol, "arms changed {}% (tol {arms_tol}%)", change.arms_pct);
    assert!(big.stderr_arms < small.stderr_arms);
}
