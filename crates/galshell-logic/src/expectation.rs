//! Expectation aggregator and shell-model orchestration.
//!
//! A Monte Carlo estimate of `∫ρ dV` over the shell is `mean(ρ)·V`. The arm
//! estimate uses the same samples with out-of-arm densities zeroed, so both
//! numbers share one set of draws.
//!
//! [`run_shell_model`] is the full pipeline: validate, load arms, sample,
//! evaluate density and membership, aggregate, sweep populations.
//!
//! ```no_run
//! use galshell_logic::config::RunConfig;
//! use galshell_logic::expectation::run_shell_model;
//!
//! let run = run_shell_model(&RunConfig::default()).unwrap();
//! println!("{:.0} stars in the shell", run.result.expected_shell);
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::arms::{load_arms, ArmSet};
use crate::config::RunConfig;
use crate::density::DiskModel;
use crate::error::{check, ConfigError, ModelError, ModelResult};
use crate::membership::ArmClassifier;
use crate::shell::{sample_parallel, SamplePoint, ShellGeometry};
use crate::stats;

/// Exact volume of the shell (pc³).
pub fn shell_volume(shell: &ShellGeometry) -> f64 {
    shell.volume()
}

// ============================================================================
// RESULT RECORDS
// ============================================================================

/// Parameters echoed into the results record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    #[serde(rename = "R0_pc")]
    pub observer_radius: f64,
    #[serde(rename = "Rd")]
    pub scale_length: f64,
    #[serde(rename = "hz")]
    pub scale_height: f64,
    pub arm_half_width: f64,
    #[serde(rename = "N_total_G")]
    pub total_population: f64,
    #[serde(rename = "N_mc")]
    pub sample_count: usize,
    /// True when the arm table was loaded rather than falling back.
    pub use_reid_csv: bool,
    pub r1_pc: f64,
    pub r2_pc: f64,
    #[serde(rename = "Rmax")]
    pub cutoff_radius: f64,
    pub seed: u64,
}

/// Expected arm count under an alternate total population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRow {
    #[serde(rename = "N_total_G")]
    pub total_population: f64,
    #[serde(rename = "N_expected_arms")]
    pub expected_arms: f64,
}

/// Output of one shell run. Field names on disk follow the JSON hand-off format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationResult {
    #[serde(rename = "V_shell")]
    pub shell_volume: f64,
    #[serde(rename = "N_expected_shell")]
    pub expected_shell: f64,
    #[serde(rename = "N_expected_arms")]
    pub expected_arms: f64,
    /// Fraction of sampled points inside an arm (geometric, not density-weighted).
    #[serde(rename = "frac_points_in_arm")]
    pub arm_fraction: f64,
    pub mean_density: f64,
    pub stderr_shell: f64,
    pub stderr_arms: f64,
    pub params: RunParams,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sensitivity: Vec<SensitivityRow>,
}

/// Reduce per-point densities and memberships to expected counts.
pub fn aggregate(
    densities: &[f64],
    memberships: &[bool],
    shell_volume: f64,
    params: RunParams,
) -> ModelResult<ExpectationResult> {
    if densities.len() != memberships.len() {
        return Err(ModelError::LengthMismatch {
            densities: densities.len(),
            memberships: memberships.len(),
        });
    }
    if densities.is_empty() {
        return Err(ConfigError::ZeroSamples.into());
    }

    let weighted: Vec<f64> = densities
        .iter()
        .zip(memberships)
        .map(|(&rho, &inside)| if inside { rho } else { 0.0 })
        .collect();
    let in_arm = memberships.iter().filter(|&&m| m).count();

    let mean_density = stats::mean(densities);
    Ok(ExpectationResult {
        shell_volume,
        expected_shell: mean_density * shell_volume,
        expected_arms: stats::mean(&weighted) * shell_volume,
        arm_fraction: in_arm as f64 / memberships.len() as f64,
        mean_density,
        stderr_shell: stats::std_error(densities) * shell_volume,
        stderr_arms: stats::std_error(&weighted) * shell_volume,
        params,
        sensitivity: Vec::new(),
    })
}

/// Expected arm count had the disk held `total_population` stars instead.
/// Density is linear in the total, so this is a plain rescale.
pub fn rescale_arm_count(result: &ExpectationResult, total_population: f64) -> f64 {
    result.expected_arms * total_population / result.params.total_population
}

pub fn sensitivity_sweep(result: &ExpectationResult, totals: &[f64]) -> Vec<SensitivityRow> {
    totals
        .iter()
        .map(|&total| SensitivityRow {
            total_population: total,
            expected_arms: rescale_arm_count(result, total),
        })
        .collect()
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Galactocentric position of an in-arm sample, as exported to CSV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmPosition {
    #[serde(rename = "X_gc_pc")]
    pub x: f64,
    #[serde(rename = "Y_gc_pc")]
    pub y: f64,
    #[serde(rename = "Z_gc_pc")]
    pub z: f64,
    #[serde(rename = "R_gc_pc")]
    pub r: f64,
}

/// A completed shell run with the intermediate samples kept for export.
#[derive(Debug, Clone)]
pub struct ShellRun {
    pub result: ExpectationResult,
    pub arm_set: ArmSet,
    pub points: Vec<SamplePoint>,
    pub memberships: Vec<bool>,
    observer_radius: f64,
}

impl ShellRun {
    pub fn in_arm_positions(&self) -> Vec<ArmPosition> {
        self.points
            .iter()
            .zip(&self.memberships)
            .filter(|(_, &inside)| inside)
            .map(|(p, _)| {
                let (x, y, z) = p.galactocentric(self.observer_radius);
                ArmPosition { x, y, z, r: p.r_gc }
            })
            .collect()
    }

    pub fn write_positions_csv(&self, path: &Path) -> ModelResult<usize> {
        let positions = self.in_arm_positions();
        let mut writer = csv::Writer::from_path(path)?;
        for pos in &positions {
            writer.serialize(pos)?;
        }
        writer.flush()?;
        log::info!("wrote {} in-arm positions to {}", positions.len(), path.display());
        Ok(positions.len())
    }
}

/// Run the full shell model for `config`.
pub fn run_shell_model(config: &RunConfig) -> ModelResult<ShellRun> {
    check(config.validate())?;

    let shell = config.shell_geometry();
    let model = DiskModel::new(config.disk_profile())?;
    let arm_set = load_arms(config.arms.table.as_deref(), &config.parametric_arms());
    let classifier = ArmClassifier::new(arm_set.arms(), config.azimuth_window(), config.arms.half_width_pc)?;

    log::info!(
        "shell {:.1}..{:.1} pc, {} samples, seed {}, sigma0 {:.2} stars/pc^2",
        shell.inner_radius,
        shell.outer_radius,
        config.sampling.samples,
        config.sampling.seed,
        model.sigma0()
    );

    let started = Instant::now();
    let points = sample_parallel(&shell, config.sampling.samples, config.sampling.seed, config.sampling.chunk_size)?;
    let densities = model.densities(&points);
    let memberships = classifier.classify(&points);
    log::debug!("sampling and classification took {:?}", started.elapsed());

    let params = RunParams {
        observer_radius: shell.observer_radius,
        scale_length: config.disk.scale_length_pc,
        scale_height: config.disk.scale_height_pc,
        arm_half_width: config.arms.half_width_pc,
        total_population: config.disk.total_population,
        sample_count: config.sampling.samples,
        use_reid_csv: arm_set.is_loaded(),
        r1_pc: shell.inner_radius,
        r2_pc: shell.outer_radius,
        cutoff_radius: config.disk.cutoff_radius_pc,
        seed: config.sampling.seed,
    };

    let mut result = aggregate(&densities, &memberships, shell_volume(&shell), params)?;
    result.sensitivity = sensitivity_sweep(&result, &config.sampling.sensitivity_totals);

    log::info!(
        "expected {:.1} in shell, {:.1} in arms (fraction {:.4})",
        result.expected_shell,
        result.expected_arms,
        result.arm_fraction
    );

    Ok(ShellRun {
        result,
        arm_set,
        points,
        memberships,
        observer_radius: shell.observer_radius,
    })
}

// ============================================================================
// JSON HAND-OFF
// ============================================================================

pub fn write_results(path: &Path, result: &ExpectationResult) -> ModelResult<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, result)?;
    Ok(())
}

pub fn read_results(path: &Path) -> ModelResult<ExpectationResult> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Star count for the Drake stage: `N_expected_arms`, else `N_expected_shell`.
///
/// Works on any JSON object so partial records from other tools are accepted.
pub fn population_from_value(record: &serde_json::Value) -> ModelResult<f64> {
    ["N_expected_arms", "N_expected_shell"]
        .iter()
        .find_map(|key| record.get(key).and_then(serde_json::Value::as_f64))
        .ok_or(ModelError::MissingPopulation)
}

pub fn read_population(path: &Path) -> ModelResult<f64> {
    let reader = BufReader::new(File::open(path)?);
    let record: serde_json::Value = serde_json::from_reader(reader)?;
    population_from_value(&record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> RunParams {
        RunParams {
            observer_radius: 8122.0,
            scale_length: 2600.0,
            scale_height: 300.0,
            arm_half_width: 300.0,
            total_population: 2.0e10,
            sample_count: 4,
            use_reid_csv: false,
            r1_pc: 100.0,
            r2_pc: 110.0,
            cutoff_radius: 15000.0,
            seed: 42,
        }
    }

    #[test]
    fn test_aggregate_simple() {
        let densities = [1.0, 2.0, 3.0, 4.0];
        let memberships = [true, false, true, false];
        let r = aggregate(&densities, &memberships, 10.0, params()).unwrap();
        assert_eq!(r.mean_density, 2.5);
        assert_eq!(r.expected_shell, 25.0);
        // (1 + 3) / 4 · 10
        assert_eq!(r.expected_arms, 10.0);
        assert_eq!(r.arm_fraction, 0.5);
        assert!(r.expected_arms <= r.expected_shell);
    }

    #[test]
    fn test_aggregate_stderr() {
        let densities = [2.0; 16];
        let memberships = [true; 16];
        let r = aggregate(&densities, &memberships, 5.0, params()).unwrap();
        assert_eq!(r.stderr_shell, 0.0);
        assert_eq!(r.stderr_arms, 0.0);
    }

    #[test]
    fn test_aggregate_rejects_mismatch_and_empty() {
        assert!(matches!(
            aggregate(&[1.0], &[], 1.0, params()),
            Err(ModelError::LengthMismatch { .. })
        ));
        assert!(aggregate(&[], &[], 1.0, params()).is_err());
    }

    #[test]
    fn test_sensitivity_is_linear() {
        let r = aggregate(&[1.0, 1.0], &[true, true], 100.0, params()).unwrap();
        let rows = sensitivity_sweep(&r, &[5.0e9, 1.0e10, 2.0e10, 5.0e10]);
        assert_eq!(rows.len(), 4);
        assert!((rows[0].expected_arms - 25.0).abs() < 1e-9);
        assert!((rows[2].expected_arms - 100.0).abs() < 1e-9);
        assert!((rows[3].expected_arms - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_json_field_names() {
        let r = aggregate(&[1.0, 2.0], &[true, false], 3.0, params()).unwrap();
        let v = serde_json::to_value(&r).unwrap();
        for key in [
            "V_shell",
            "N_expected_shell",
            "N_expected_arms",
            "frac_points_in_arm",
            "mean_density",
            "stderr_shell",
            "stderr_arms",
        ] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        let p = &v["params"];
        for key in ["R0_pc", "Rd", "hz", "N_total_G", "N_mc", "use_reid_csv", "r1_pc", "r2_pc", "Rmax", "seed"] {
            assert!(p.get(key).is_some(), "missing params.{key}");
        }
        assert!(v.get("sensitivity").is_none());
    }

    #[test]
    fn test_results_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g_star_results.json");
        let mut r = aggregate(&[1.0, 2.0], &[true, false], 3.0, params()).unwrap();
        r.sensitivity = sensitivity_sweep(&r, &[1.0e10]);
        write_results(&path, &r).unwrap();
        let back = read_results(&path).unwrap();
        assert_eq!(back.params, r.params);
        assert_eq!(back.expected_shell, r.expected_shell);
        assert_eq!(back.sensitivity, r.sensitivity);
        assert_eq!(read_population(&path).unwrap(), r.expected_arms);
    }

    #[test]
    fn test_population_prefers_arms() {
        let both = json!({"N_expected_arms": 2.0, "N_expected_shell": 9.0});
        assert_eq!(population_from_value(&both).unwrap(), 2.0);
        let shell_only = json!({"N_expected_shell": 9.0});
        assert_eq!(population_from_value(&shell_only).unwrap(), 9.0);
        assert!(matches!(
            population_from_value(&json!({"V_shell": 1.0})),
            Err(ModelError::MissingPopulation)
        ));
    }

    #[test]
    fn test_in_arm_positions_filter() {
        let points = vec![
            SamplePoint::from_spherical(100.0, 0.0, 0.0, 8000.0),
            SamplePoint::from_spherical(100.0, 0.0, std::f64::consts::PI, 8000.0),
        ];
        let result = aggregate(&[1.0, 1.0], &[false, true], 1.0, params()).unwrap();
        let run = ShellRun {
            result,
            arm_set: ArmSet::Fallback {
                arms: Vec::new(),
                reason: crate::arms::FallbackReason::NoTable,
            },
            points,
            memberships: vec![false, true],
            observer_radius: 8000.0,
        };
        let positions = run.in_arm_positions();
        assert_eq!(positions.len(), 1);
        assert!((positions[0].x - 7900.0).abs() < 1e-9);
        assert!((positions[0].r - 7900.0).abs() < 1e-9);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arm_positions.csv");
        assert_eq!(run.write_positions_csv(&path).unwrap(), 1);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("X_gc_pc,Y_gc_pc,Z_gc_pc,R_gc_pc"), "{text}");
    }
}
