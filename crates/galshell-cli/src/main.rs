//! galshell command-line front end.
//!
//! Usage:
//!   galshell shell --samples 100000 --out g_star_results.json
//!   galshell drake --results g_star_results.json
//!   galshell --config run.toml convergence --counts 1000,10000 --repeats 24

mod args;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use galshell_logic::arms::{reid_2014_arms, write_arm_table, ArmSet};
use galshell_logic::constants::units;
use galshell_logic::convergence::{convergence_study, relative_change};
use galshell_logic::drake::propagate;
use galshell_logic::error::check;
use galshell_logic::expectation::{read_population, read_results, run_shell_model, write_results};
use galshell_logic::scenarios::{drake_scenarios, drake_sweep, write_sweep_csv, SweepFixed, SWEEP_F_I, SWEEP_F_L};
use galshell_logic::RunConfig;
use serde::Serialize;

use crate::args::{DrakeOverrides, ShellOverrides};

#[derive(Parser)]
#[command(name = "galshell", author, version, about, long_about = None)]
struct Cli {
    /// TOML run configuration; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG still wins when set)
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate star counts in the shell and in spiral arms
    Shell {
        #[command(flatten)]
        overrides: ShellOverrides,

        /// Results JSON
        #[arg(short, long, default_value = "g_star_results.json")]
        out: PathBuf,

        /// Also write in-arm galactocentric positions to this CSV
        #[arg(long)]
        positions: Option<PathBuf>,
    },

    /// Propagate Drake priors for the star count from a shell run
    Drake {
        #[command(flatten)]
        overrides: DrakeOverrides,

        /// Shell results to read the star count from
        #[arg(long, default_value = "g_star_results.json")]
        results: PathBuf,

        /// Summary JSON
        #[arg(short, long, default_value = "g_drake_results.json")]
        out: PathBuf,
    },

    /// Evaluate the optimistic, moderate and pessimistic scenarios
    Scenarios {
        #[arg(long, default_value_t = 2.0)]
        n_stars: f64,

        /// Also write the results as JSON
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Deterministic f_l × f_i grid
    Sweep {
        #[arg(long, default_value_t = galshell_logic::scenarios::SWEEP_N_STARS)]
        n_stars: f64,

        /// Civilization lifetime in years
        #[arg(long)]
        lifetime: Option<f64>,

        /// Stellar lifetime in years
        #[arg(long)]
        t_star: Option<f64>,

        #[arg(short, long, default_value = "g_drake_sweep_results.csv")]
        out: PathBuf,
    },

    /// Repeat the shell model at several sample counts and report the spread
    Convergence {
        #[command(flatten)]
        overrides: ShellOverrides,

        /// Sample counts (comma-separated)
        #[arg(long, value_delimiter = ',', default_value = "1000,10000")]
        counts: Vec<usize>,

        #[arg(long, default_value_t = 24)]
        repeats: usize,

        /// Write the report as JSON
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Percent change between two shell results files
    Compare { baseline: PathBuf, candidate: PathBuf },

    /// Write the Reid et al. 2014 arm table
    WriteArms {
        #[arg(short, long, default_value = "reid_arms.csv")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = match &cli.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RunConfig::default(),
    };

    match cli.command {
        Commands::Shell {
            overrides,
            out,
            positions,
        } => {
            overrides.apply(&mut config);
            run_shell(&config, &out, positions.as_deref())
        }
        Commands::Drake {
            overrides,
            results,
            out,
        } => {
            overrides.apply(&mut config);
            run_drake(&config, &results, &out)
        }
        Commands::Scenarios { n_stars, out } => run_scenarios(n_stars, out.as_deref()),
        Commands::Sweep {
            n_stars,
            lifetime,
            t_star,
            out,
        } => {
            let defaults = SweepFixed::default();
            let fixed = SweepFixed {
                lifetime: lifetime.unwrap_or(defaults.lifetime),
                t_star: t_star.unwrap_or(defaults.t_star),
                ..defaults
            };
            run_sweep(n_stars, &fixed, &out)
        }
        Commands::Convergence {
            overrides,
            counts,
            repeats,
            out,
        } => {
            overrides.apply(&mut config);
            run_convergence(&config, &counts, repeats, out.as_deref())
        }
        Commands::Compare {
            baseline,
            candidate,
        } => run_compare(&baseline, &candidate),
        Commands::WriteArms { out } => {
            write_arm_table(&out, &reid_2014_arms())
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Wrote Reid 2014 arm table to {}", out.display());
            Ok(())
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

// ── Shell ───────────────────────────────────────────────────────────────

fn run_shell(config: &RunConfig, out: &Path, positions: Option<&Path>) -> Result<()> {
    log::debug!("run configuration: {:?}", config);
    let run = run_shell_model(config).context("Shell model failed")?;
    let r = &run.result;

    println!(
        "Shell {:.1}–{:.1} ly ({:.2}–{:.2} pc), {} samples",
        units::pc_to_ly(r.params.r1_pc),
        units::pc_to_ly(r.params.r2_pc),
        r.params.r1_pc,
        r.params.r2_pc,
        r.params.sample_count
    );
    println!("Arms: {} ({})", run.arm_set.arms().len(), arm_source(&run.arm_set));
    println!("Shell volume:              {:.4e} pc³", r.shell_volume);
    println!("Mean density:              {:.4e} stars/pc³", r.mean_density);
    println!(
        "Expected in shell:         {:.1} ± {:.1}",
        r.expected_shell, r.stderr_shell
    );
    println!(
        "Expected in arms:          {:.1} ± {:.1}",
        r.expected_arms, r.stderr_arms
    );
    println!("Geometric fraction in arm: {:.5}", r.arm_fraction);

    if !r.sensitivity.is_empty() {
        println!("\nSensitivity:");
        for row in &r.sensitivity {
            println!(
                "  N_total = {:.1e} → expected in arms ≈ {:.1}",
                row.total_population, row.expected_arms
            );
        }
    }

    write_results(out, r).with_context(|| format!("Failed to write {}", out.display()))?;
    println!("\nResults written to {}", out.display());

    if let Some(path) = positions {
        let count = run
            .write_positions_csv(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} in-arm positions written to {}", count, path.display());
    }
    Ok(())
}

fn arm_source(set: &ArmSet) -> String {
    match set {
        ArmSet::Loaded { path, .. } => format!("loaded from {}", path.display()),
        ArmSet::Fallback { reason, .. } => format!("parametric, {}", reason),
    }
}

// ── Drake ───────────────────────────────────────────────────────────────

fn run_drake(config: &RunConfig, results: &Path, out: &Path) -> Result<()> {
    check(config.validate_drake()).context("Invalid Drake configuration")?;

    let n_stars = match config.drake.n_stars {
        Some(n) => n,
        None => read_population(results).with_context(|| {
            format!(
                "No star count: {} unreadable and --n-stars not given",
                results.display()
            )
        })?,
    };

    let priors = config.drake_priors();
    let summary = propagate(n_stars, config.drake.samples, &priors, config.drake.seed)
        .context("Drake propagation failed")?;

    println!(
        "Drake Monte Carlo: N_stars = {:.3e}, n_samples = {}",
        summary.n_stars, summary.samples
    );
    println!(
        "Per-star p (median) = {:.3e}, mean = {:.3e}",
        summary.per_star_p.median, summary.per_star_p.mean
    );
    println!(
        "P(at least one) median = {:.3e}, mean = {:.3e}",
        summary.p_any.median, summary.p_any.mean
    );
    println!(
        "Expected civilizations (median) = {:.3e}, mean = {:.3e}",
        summary.expected_civ.median, summary.expected_civ.mean
    );

    write_json(out, &summary)?;
    println!("Results written to {}", out.display());
    Ok(())
}

fn run_scenarios(n_stars: f64, out: Option<&Path>) -> Result<()> {
    let results = drake_scenarios(n_stars).context("Scenario evaluation failed")?;
    println!("Drake scenarios for n_stars = {}", n_stars);
    for s in &results {
        println!(
            "  {:<12} p = {:.3e}   P(at least one) = {:.3e}",
            s.name, s.per_star_p, s.p_at_least_one
        );
    }
    if let Some(path) = out {
        write_json(path, &results)?;
        println!("Results written to {}", path.display());
    }
    Ok(())
}

fn run_sweep(n_stars: f64, fixed: &SweepFixed, out: &Path) -> Result<()> {
    let rows = drake_sweep(&SWEEP_F_L, &SWEEP_F_I, fixed, n_stars).context("Sweep failed")?;
    write_sweep_csv(out, &rows).with_context(|| format!("Failed to write {}", out.display()))?;

    let (min_p, max_p) = rows.iter().fold((f64::INFINITY, 0.0f64), |(lo, hi), r| {
        (lo.min(r.per_star_p), hi.max(r.per_star_p))
    });
    println!("Exported {} sweep rows to {}", rows.len(), out.display());
    println!("  Per-star p range: {:.3e} to {:.3e}", min_p, max_p);
    Ok(())
}

// ── Convergence ─────────────────────────────────────────────────────────

fn run_convergence(config: &RunConfig, counts: &[usize], repeats: usize, out: Option<&Path>) -> Result<()> {
    let report = convergence_study(config, counts, repeats, config.sampling.seed)
        .context("Convergence study failed")?;

    println!(
        "{:>10} {:>16} {:>14} {:>10} {:>10}",
        "samples", "mean arms", "std arms", "frac", "std frac"
    );
    for level in &report.levels {
        println!(
            "{:>10} {:>16.1} {:>14.1} {:>10.5} {:>10.5}",
            level.samples, level.mean_arms, level.std_arms, level.mean_fraction, level.std_fraction
        );
    }
    for ratio in &report.ratios {
        println!(
            "  {} → {}: spread ratio {:.2} (ideal {:.2})",
            ratio.from_samples, ratio.to_samples, ratio.observed, ratio.expected
        );
    }

    if let Some(path) = out {
        write_json(path, &report)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}

fn run_compare(baseline: &Path, candidate: &Path) -> Result<()> {
    let a = read_results(baseline).with_context(|| format!("Failed to read {}", baseline.display()))?;
    let b = read_results(candidate).with_context(|| format!("Failed to read {}", candidate.display()))?;
    let change = relative_change(&a, &b);

    println!(
        "{:<32} {:>20} {:>20}",
        "Metric",
        format!("{} samples", a.params.sample_count),
        format!("{} samples", b.params.sample_count)
    );
    println!("{:<32} {:>20.1} {:>20.1}", "Expected in shell", a.expected_shell, b.expected_shell);
    println!("{:<32} {:>20.1} {:>20.1}", "Expected in arms", a.expected_arms, b.expected_arms);
    println!("{:<32} {:>20.5} {:>20.5}", "Geometric fraction", a.arm_fraction, b.arm_fraction);
    println!("\nRelative change in shell estimate: {:.2}%", change.shell_pct);
    println!("Relative change in arms estimate:  {:.2}%", change.arms_pct);
    Ok(())
}
