//! galshell Headless Validation Harness
//!
//! Checks the statistical and numerical properties of the shell model and
//! the Drake stage end to end. Runs entirely in-process with fixed seeds.
//!
//! Usage:
//!   cargo run -p galshell-simtest
//!   cargo run -p galshell-simtest -- --verbose

use std::f64::consts::PI;
use std::path::Path;

use galshell_logic::arms::{load_arms, wrap_angle, ParametricArms, SpiralArm};
use galshell_logic::constants::{arms as arm_defaults, disk};
use galshell_logic::convergence::convergence_study;
use galshell_logic::density::{integrate_surface_density, DiskModel, DiskProfile};
use galshell_logic::drake::{at_least_one, per_star_probability, DrakeConstants, DrakePriors, Prior};
use galshell_logic::expectation::run_shell_model;
use galshell_logic::membership::{ArmClassifier, AzimuthWindow};
use galshell_logic::shell::{sample, SamplePoint, ShellGeometry};
use galshell_logic::stats::{ks_critical_value, ks_uniform_statistic, mean};
use galshell_logic::RunConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;

// ── Shipped arm table ───────────────────────────────────────────────────
const ARM_TABLE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data/reid_arms.csv");

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== galshell Validation Harness ===\n");

    let mut results = Vec::new();

    // 1. Shell sampler uniformity
    results.extend(validate_sampler(verbose));

    // 2. Disk density normalization
    results.extend(validate_density(verbose));

    // 3. Spiral arm geometry and loading
    results.extend(validate_arms(verbose));

    // 4. Arm membership
    results.extend(validate_membership(verbose));

    // 5. At-least-one probability
    results.extend(validate_drake(verbose));

    // 6. End-to-end reference shell
    results.extend(validate_pipeline(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn reference_shell() -> ShellGeometry {
    ShellGeometry::from_light_years(20366.0, 20374.0, disk::OBSERVER_RADIUS_PC)
}

fn reference_config(samples: usize) -> RunConfig {
    let mut config = RunConfig::default();
    config.shell.inner_radius_ly = 20366.0;
    config.shell.outer_radius_ly = 20374.0;
    config.sampling.samples = samples;
    config
}

// ── 1. Sampler ──────────────────────────────────────────────────────────

fn validate_sampler(verbose: bool) -> Vec<TestResult> {
    println!("--- Shell Sampler ---");
    let mut results = Vec::new();

    let shell = reference_shell();
    let n = 20_000;
    let mut rng = StdRng::seed_from_u64(2024);
    let points = match sample(&shell, n, &mut rng) {
        Ok(points) => points,
        Err(e) => {
            results.push(TestResult {
                name: "sampler_runs".into(),
                passed: false,
                detail: format!("reference shell rejected: {}", e),
            });
            return results;
        }
    };

    let out_of_shell = points
        .iter()
        .filter(|p| p.r < shell.inner_radius || p.r > shell.outer_radius)
        .count();
    results.push(TestResult {
        name: "sampler_radii_in_shell".into(),
        passed: out_of_shell == 0,
        detail: format!("{} of {} points outside the shell", out_of_shell, n),
    });

    // r³ must be uniform between r1³ and r2³.
    let r1_cubed = shell.inner_radius.powi(3);
    let span = shell.outer_radius.powi(3) - r1_cubed;
    let mut u: Vec<f64> = points.iter().map(|p| (p.r.powi(3) - r1_cubed) / span).collect();
    let d = ks_uniform_statistic(&mut u);
    let critical = ks_critical_value(n, 0.01);
    results.push(TestResult {
        name: "sampler_r_cubed_uniform".into(),
        passed: d < critical,
        detail: format!("KS D = {:.5} (critical {:.5} at α = 0.01)", d, critical),
    });

    // cos θ ~ U(−1, 1) has σ = 1/√3; φ ~ U(0, 2π) has σ = π/√3.
    let cos_mean = mean(&points.iter().map(|p| p.cos_theta).collect::<Vec<_>>());
    let cos_tol = 5.0 / (3.0 * n as f64).sqrt();
    results.push(TestResult {
        name: "sampler_cos_theta_centred".into(),
        passed: cos_mean.abs() < cos_tol,
        detail: format!("mean cos θ = {:.5} (tol {:.5})", cos_mean, cos_tol),
    });

    let az_mean = mean(&points.iter().map(|p| p.azimuth).collect::<Vec<_>>());
    let az_tol = 5.0 * PI / (3.0 * n as f64).sqrt();
    results.push(TestResult {
        name: "sampler_azimuth_centred".into(),
        passed: (az_mean - PI).abs() < az_tol,
        detail: format!("mean φ = {:.5} (expected π, tol {:.5})", az_mean, az_tol),
    });

    let bad_frame = points
        .iter()
        .filter(|p| {
            let (x, y, _) = p.galactocentric(shell.observer_radius);
            (x.hypot(y) - p.r_gc).abs() > 1e-6 || p.phi_gc <= -PI || p.phi_gc > PI
        })
        .count();
    results.push(TestResult {
        name: "sampler_galactocentric_frame".into(),
        passed: bad_frame == 0,
        detail: format!("{} points with inconsistent galactocentric coordinates", bad_frame),
    });

    if verbose {
        println!("  {} points, KS D = {:.5}", n, d);
    }
    results
}

// ── 2. Density ──────────────────────────────────────────────────────────

fn validate_density(verbose: bool) -> Vec<TestResult> {
    println!("--- Disk Density ---");
    let mut results = Vec::new();

    let profile = DiskProfile {
        scale_length: disk::SCALE_LENGTH_PC,
        scale_height: disk::SCALE_HEIGHT_PC,
        cutoff_radius: disk::CUTOFF_RADIUS_PC,
        total_population: disk::TOTAL_POPULATION,
    };
    let model = match DiskModel::new(profile) {
        Ok(m) => m,
        Err(e) => {
            results.push(TestResult {
                name: "density_model_builds".into(),
                passed: false,
                detail: format!("default disk rejected: {}", e),
            });
            return results;
        }
    };

    let closed = model.enclosed_population(profile.cutoff_radius) / profile.total_population - 1.0;
    results.push(TestResult {
        name: "density_normalization_closed_form".into(),
        passed: closed.abs() < 1e-6,
        detail: format!("relative error {:.2e}", closed),
    });

    let numeric = integrate_surface_density(&model, profile.cutoff_radius, 4000);
    let numeric_err = numeric / profile.total_population - 1.0;
    results.push(TestResult {
        name: "density_normalization_numeric".into(),
        passed: numeric_err.abs() < 1e-6,
        detail: format!("Simpson integral {:.6e}, relative error {:.2e}", numeric, numeric_err),
    });

    let symmetric = (model.density(8000.0, 250.0) - model.density(8000.0, -250.0)).abs() == 0.0;
    let decreasing = model.density(4000.0, 0.0) > model.density(8000.0, 0.0)
        && model.density(8000.0, 0.0) > model.density(8000.0, 600.0);
    results.push(TestResult {
        name: "density_shape".into(),
        passed: symmetric && decreasing,
        detail: format!("symmetric in z: {}, decreasing in R and |z|: {}", symmetric, decreasing),
    });

    // Σ0 scales linearly with the population.
    let doubled = model
        .with_total_population(2.0 * profile.total_population)
        .map(|m| m.sigma0() / model.sigma0());
    results.push(TestResult {
        name: "density_linear_in_population".into(),
        passed: matches!(doubled, Ok(ratio) if (ratio - 2.0).abs() < 1e-12),
        detail: format!("Σ0 ratio for doubled population: {:?}", doubled),
    });

    if verbose {
        println!("  Σ0 = {:.4e} stars/pc²", model.sigma0());
    }
    results
}

// ── 3. Arms ─────────────────────────────────────────────────────────────

fn validate_arms(verbose: bool) -> Vec<TestResult> {
    println!("--- Spiral Arms ---");
    let mut results = Vec::new();

    let arm = SpiralArm::from_degrees("test", 8400.0, 169.0, 13.8);
    let at_ref = arm.radius_at(arm.phi_ref);
    results.push(TestResult {
        name: "arm_radius_exact_at_reference".into(),
        passed: at_ref == arm.r_ref,
        detail: format!("r(φ_ref) = {} (R_ref = {})", at_ref, arm.r_ref),
    });

    let worst_wrap = (0..72)
        .map(|k| -PI + k as f64 * PI / 36.0 + 0.01)
        .map(|phi| {
            let base = arm.radius_at(phi);
            let up = (arm.radius_at(phi + 2.0 * PI) / base - 1.0).abs();
            let down = (arm.radius_at(phi - 4.0 * PI) / base - 1.0).abs();
            up.max(down)
        })
        .fold(0.0, f64::max);
    results.push(TestResult {
        name: "arm_radius_wrap_invariant".into(),
        passed: worst_wrap < 1e-9,
        detail: format!("worst relative change under 2π shifts: {:.2e}", worst_wrap),
    });

    let wrapped_ok = [-7.0, -PI, 0.0, PI, 3.5, 100.0]
        .iter()
        .all(|&a| {
            let w = wrap_angle(a);
            w > -PI && w <= PI
        });
    results.push(TestResult {
        name: "arm_wrap_range".into(),
        passed: wrapped_ok,
        detail: "wrapped angles fall in (−π, π]".into(),
    });

    let fallback = ParametricArms {
        count: 5,
        reference_radius: disk::OBSERVER_RADIUS_PC,
        pitch: arm_defaults::PITCH_DEG.to_radians(),
    };
    let missing = load_arms(Some(Path::new("/nonexistent/reid_arms.csv")), &fallback);
    results.push(TestResult {
        name: "arm_missing_table_falls_back".into(),
        passed: !missing.is_loaded() && missing.arms().len() == 5,
        detail: format!("{} parametric arms generated", missing.arms().len()),
    });

    let shipped = load_arms(Some(Path::new(ARM_TABLE)), &fallback);
    let names: Vec<&str> = shipped.arms().iter().map(|a| a.name.as_str()).collect();
    results.push(TestResult {
        name: "arm_shipped_table_loads".into(),
        passed: shipped.is_loaded() && names == ["Perseus", "Local", "Sagittarius", "Norma"],
        detail: format!("arms: {}", names.join(", ")),
    });

    if verbose {
        for a in shipped.arms() {
            println!(
                "  {:<12} R_ref = {:>7.0} pc, φ_ref = {:>6.1}°, pitch = {:.1}°",
                a.name,
                a.r_ref,
                a.phi_ref.to_degrees(),
                a.pitch.to_degrees()
            );
        }
    }
    results
}

// ── 4. Membership ───────────────────────────────────────────────────────

fn validate_membership(verbose: bool) -> Vec<TestResult> {
    println!("--- Arm Membership ---");
    let mut results = Vec::new();

    let observer = disk::OBSERVER_RADIUS_PC;
    let fallback = ParametricArms {
        count: 4,
        reference_radius: observer,
        pitch: arm_defaults::PITCH_DEG.to_radians(),
    };
    let arms = fallback.generate();
    let classifier = match ArmClassifier::new(&arms, AzimuthWindow::default(), 300.0) {
        Ok(c) => c,
        Err(e) => {
            results.push(TestResult {
                name: "membership_classifier_builds".into(),
                passed: false,
                detail: format!("classifier rejected: {}", e),
            });
            return results;
        }
    };

    // The observer sits on arm1 (R_ref = R0, φ_ref = 0).
    let on_arm = SamplePoint::from_spherical(0.0, 1.0, 0.0, observer);
    let sep = classifier.min_separation(&on_arm);
    results.push(TestResult {
        name: "membership_point_on_arm".into(),
        passed: sep < 1e-9 && classifier.is_in_arm(&on_arm),
        detail: format!("separation {:.3e} pc", sep),
    });

    // A point whose separation equals the half-width is outside.
    let edge = SamplePoint::from_spherical(300.0, 0.0, 0.0, observer);
    let edge_sep = classifier.min_separation(&edge);
    let strict = ArmClassifier::new(&arms, AzimuthWindow::default(), edge_sep)
        .map(|at_edge| !at_edge.is_in_arm(&edge))
        .unwrap_or(false);
    results.push(TestResult {
        name: "membership_half_width_strict".into(),
        passed: strict && edge_sep <= 300.0 + 1e-9,
        detail: format!("separation {:.3} pc for a point 300 pc outward", edge_sep),
    });

    // Widening the half-width can only add members.
    let shell = reference_shell();
    let mut rng = StdRng::seed_from_u64(99);
    let points = match sample(&shell, 5_000, &mut rng) {
        Ok(points) => points,
        Err(e) => {
            results.push(TestResult {
                name: "membership_sampler_runs".into(),
                passed: false,
                detail: format!("reference shell rejected: {}", e),
            });
            return results;
        }
    };
    let narrow = classifier.classify(&points);
    let monotone = ArmClassifier::new(&arms, AzimuthWindow::default(), 600.0)
        .map(|wide| {
            wide.classify(&points)
                .iter()
                .zip(&narrow)
                .all(|(&w, &n)| w || !n)
        })
        .unwrap_or(false);
    results.push(TestResult {
        name: "membership_monotone_in_half_width".into(),
        passed: monotone,
        detail: "every 300 pc member is also a 600 pc member".into(),
    });

    let fraction = narrow.iter().filter(|&&f| f).count() as f64 / points.len() as f64;
    results.push(TestResult {
        name: "membership_fraction_plausible".into(),
        passed: fraction > 0.2 && fraction < 0.35,
        detail: format!("{:.4} of sampled points in arms", fraction),
    });

    if verbose {
        println!("  in-arm fraction {:.4} over {} points", fraction, points.len());
    }
    results
}

// ── 5. Drake ────────────────────────────────────────────────────────────

fn validate_drake(verbose: bool) -> Vec<TestResult> {
    println!("--- Drake Probability ---");
    let mut results = Vec::new();

    let ps = [0.0, 1e-30, 1e-20, 1e-12, 1e-6, 1e-3, 0.1, 0.5, 1.0];
    let ns = [1.0, 2.0, 1e3, 4.0e6, 1e12];

    let in_bounds = ps
        .iter()
        .flat_map(|&p| ns.iter().map(move |&n| at_least_one(p, n)))
        .all(|v| (0.0..=1.0).contains(&v));
    results.push(TestResult {
        name: "drake_p_any_bounded".into(),
        passed: in_bounds,
        detail: "P(at least one) in [0, 1] across the grid".into(),
    });

    let monotone_p = ns.iter().all(|&n| {
        ps.windows(2)
            .all(|w| at_least_one(w[1], n) >= at_least_one(w[0], n))
    });
    let monotone_n = ps.iter().all(|&p| {
        ns.windows(2)
            .all(|w| at_least_one(p, w[1]) >= at_least_one(p, w[0]))
    });
    results.push(TestResult {
        name: "drake_p_any_monotone".into(),
        passed: monotone_p && monotone_n,
        detail: format!("monotone in p: {}, in n: {}", monotone_p, monotone_n),
    });

    let worst_linear = [1e-15, 1e-20, 1e-25, 1e-30]
        .iter()
        .map(|&p| (at_least_one(p, 2.0) / (2.0 * p) - 1.0).abs())
        .fold(0.0, f64::max);
    results.push(TestResult {
        name: "drake_p_any_linear_for_tiny_p".into(),
        passed: worst_linear < 1e-12,
        detail: format!("worst |P/(n·p) − 1| = {:.2e}", worst_linear),
    });

    let corner = per_star_probability(&DrakeConstants::default(), 1e-6, 1e-6, 0.1, 1e4);
    let corner_any = at_least_one(corner, 2.0);
    results.push(TestResult {
        name: "drake_pessimistic_corner".into(),
        passed: (corner.log10() + 20.0).abs() < 1e-9 && corner_any > 0.0,
        detail: format!("p = {:.3e}, P(any of 2) = {:.3e}", corner, corner_any),
    });

    let too_long = DrakePriors {
        lifetime: Prior::log_uniform((1e2, 1e12)),
        ..Default::default()
    };
    let negative = DrakePriors {
        f_c: Prior::uniform((-0.5, 1.0)),
        ..Default::default()
    };
    let rejected = !too_long.validate().is_empty() && !negative.validate().is_empty();
    results.push(TestResult {
        name: "drake_rejects_non_probability_priors".into(),
        passed: rejected && DrakePriors::default().validate().is_empty(),
        detail: format!(
            "max p for L ≤ 1e12: {:.1}, f_c from −0.5 rejected: {}",
            too_long.max_per_star_probability(),
            !negative.validate().is_empty()
        ),
    });

    if verbose {
        println!("  pessimistic corner p = {:.3e}", corner);
    }
    results
}

// ── 6. Pipeline ─────────────────────────────────────────────────────────

fn validate_pipeline(verbose: bool) -> Vec<TestResult> {
    println!("--- End-to-End Reference Shell ---");
    let mut results = Vec::new();

    let run = match run_shell_model(&reference_config(100_000)) {
        Ok(run) => run,
        Err(e) => {
            results.push(TestResult {
                name: "pipeline_runs".into(),
                passed: false,
                detail: format!("shell model failed: {}", e),
            });
            return results;
        }
    };
    let r = &run.result;

    results.push(TestResult {
        name: "pipeline_shell_volume".into(),
        passed: (r.shell_volume / 1.2023e9 - 1.0).abs() < 1e-3,
        detail: format!("V = {:.5e} pc³", r.shell_volume),
    });
    results.push(TestResult {
        name: "pipeline_shell_count".into(),
        passed: r.expected_shell > 3.6e6 && r.expected_shell < 4.5e6,
        detail: format!("N_shell = {:.4e} ± {:.2e}", r.expected_shell, r.stderr_shell),
    });
    results.push(TestResult {
        name: "pipeline_arm_fraction".into(),
        passed: r.arm_fraction > 0.25 && r.arm_fraction < 0.29,
        detail: format!("fraction = {:.4}", r.arm_fraction),
    });
    results.push(TestResult {
        name: "pipeline_arms_below_shell".into(),
        passed: r.expected_arms > 0.0 && r.expected_arms < r.expected_shell,
        detail: format!("N_arms = {:.4e}", r.expected_arms),
    });

    match convergence_study(&reference_config(1_000), &[1_000, 10_000], 24, 1234) {
        Ok(report) => {
            let ratio = report.ratios[0];
            results.push(TestResult {
                name: "pipeline_sqrt_n_convergence".into(),
                passed: ratio.within(2.0),
                detail: format!(
                    "spread ratio {:.2} for 10× samples (ideal {:.2})",
                    ratio.observed, ratio.expected
                ),
            });
        }
        Err(e) => results.push(TestResult {
            name: "pipeline_sqrt_n_convergence".into(),
            passed: false,
            detail: format!("convergence study failed: {}", e),
        }),
    }

    if verbose {
        println!(
            "  N_shell = {:.4e}, N_arms = {:.4e}, fraction = {:.4}",
            r.expected_shell, r.expected_arms, r.arm_fraction
        );
    }
    results
}
