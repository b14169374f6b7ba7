//! Monte Carlo convergence checks.
//!
//! Repeats the shell model with independent seeds at several sample counts
//! and reports how the spread of the estimates shrinks. For a healthy
//! estimator the standard deviation falls as `1/√n`, so going from `n1` to
//! `n2` samples should shrink it by about `√(n2/n1)`.

use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::error::{check, ConfigError, ModelResult};
use crate::expectation::{run_shell_model, ExpectationResult};
use crate::stats;

/// Spread of the estimates at one sample count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceLevel {
    pub samples: usize,
    pub repeats: usize,
    pub mean_shell: f64,
    pub std_shell: f64,
    pub mean_arms: f64,
    pub std_arms: f64,
    pub mean_fraction: f64,
    pub std_fraction: f64,
}

/// Observed against ideal shrinkage of the arm-count spread between two levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadRatio {
    pub from_samples: usize,
    pub to_samples: usize,
    /// `std(from) / std(to)`.
    pub observed: f64,
    /// `√(to / from)`.
    pub expected: f64,
}

impl SpreadRatio {
    /// True when the observed ratio is within a factor `tolerance` of ideal.
    pub fn within(&self, tolerance: f64) -> bool {
        self.observed >= self.expected / tolerance && self.observed <= self.expected * tolerance
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    pub levels: Vec<ConvergenceLevel>,
    pub ratios: Vec<SpreadRatio>,
}

/// Seed for run `index`. Runs are spaced 2³² apart so their per-chunk
/// streams (`seed + chunk`) never overlap.
fn run_seed(base_seed: u64, index: usize) -> u64 {
    base_seed.wrapping_add((index as u64) << 32)
}

/// Run `config` `repeats` times at each of `sample_counts`.
pub fn convergence_study(
    config: &RunConfig,
    sample_counts: &[usize],
    repeats: usize,
    base_seed: u64,
) -> ModelResult<ConvergenceReport> {
    let mut errors = config.validate();
    if repeats < 2 {
        errors.push(ConfigError::TooFewRepeats(repeats));
    }
    if sample_counts.iter().any(|&n| n == 0) || sample_counts.is_empty() {
        errors.push(ConfigError::ZeroSamples);
    }
    check(errors)?;

    let mut levels = Vec::with_capacity(sample_counts.len());
    let mut run_index = 0;
    for &samples in sample_counts {
        let mut results = Vec::with_capacity(repeats);
        for _ in 0..repeats {
            let mut run_config = config.clone();
            run_config.sampling.samples = samples;
            run_config.sampling.seed = run_seed(base_seed, run_index);
            run_index += 1;
            results.push(run_shell_model(&run_config)?.result);
        }
        let level = summarize_level(samples, &results);
        log::info!(
            "convergence: n = {}, arms {:.1} ± {:.1}, fraction {:.4} ± {:.4}",
            samples,
            level.mean_arms,
            level.std_arms,
            level.mean_fraction,
            level.std_fraction
        );
        levels.push(level);
    }

    let ratios = levels
        .windows(2)
        .map(|pair| SpreadRatio {
            from_samples: pair[0].samples,
            to_samples: pair[1].samples,
            observed: pair[0].std_arms / pair[1].std_arms,
            expected: (pair[1].samples as f64 / pair[0].samples as f64).sqrt(),
        })
        .collect();

    Ok(ConvergenceReport { levels, ratios })
}

fn summarize_level(samples: usize, results: &[ExpectationResult]) -> ConvergenceLevel {
    let shell: Vec<f64> = results.iter().map(|r| r.expected_shell).collect();
    let arms: Vec<f64> = results.iter().map(|r| r.expected_arms).collect();
    let fraction: Vec<f64> = results.iter().map(|r| r.arm_fraction).collect();
    ConvergenceLevel {
        samples,
        repeats: results.len(),
        mean_shell: stats::mean(&shell),
        std_shell: stats::std_dev(&shell),
        mean_arms: stats::mean(&arms),
        std_arms: stats::std_dev(&arms),
        mean_fraction: stats::mean(&fraction),
        std_fraction: stats::std_dev(&fraction),
    }
}

// ============================================================================
// RECORD COMPARISON
// ============================================================================

/// Percent change from `baseline` to `candidate`, as `|b − a| / a · 100`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeChange {
    pub shell_pct: f64,
    pub arms_pct: f64,
    pub fraction_pct: f64,
}

pub fn relative_change(baseline: &ExpectationResult, candidate: &ExpectationResult) -> RelativeChange {
    let pct = |a: f64, b: f64| (b - a).abs() / a * 100.0;
    RelativeChange {
        shell_pct: pct(baseline.expected_shell, candidate.expected_shell),
        arms_pct: pct(baseline.expected_arms, candidate.expected_arms),
        fraction_pct: pct(baseline.arm_fraction, candidate.arm_fraction),
    }
}
