//! Fixed Drake scenarios and the deterministic `f_l × f_i` sweep.
//!
//! Both evaluate the per-star probability directly (no priors) and reuse
//! [`at_least_one`] for the tail.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::drake::{at_least_one, per_star_probability, DrakeConstants};
use crate::error::{check, require_fraction, require_positive, require_probability, ConfigError, ModelResult};

/// A point estimate of every Drake factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrakeFactors {
    pub f_p: f64,
    pub n_e: f64,
    pub f_l: f64,
    pub f_i: f64,
    pub f_c: f64,
    /// Civilization lifetime (years).
    #[serde(rename = "L")]
    pub lifetime: f64,
    pub t_star: f64,
}

impl DrakeFactors {
    pub fn per_star_probability(&self) -> f64 {
        let constants = DrakeConstants {
            f_p: self.f_p,
            n_e: self.n_e,
            t_star: self.t_star,
        };
        per_star_probability(&constants, self.f_l, self.f_i, self.f_c, self.lifetime)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub per_star_p: f64,
    pub p_at_least_one: f64,
    pub n_stars: f64,
    pub params: DrakeFactors,
}

const SCENARIO_T_STAR: f64 = 1.0e10;

/// The optimistic, moderate and pessimistic parameter sets.
pub fn scenario_presets() -> Vec<(&'static str, DrakeFactors)> {
    let preset = |f_p, n_e, f_l, f_i, f_c, lifetime| DrakeFactors {
        f_p,
        n_e,
        f_l,
        f_i,
        f_c,
        lifetime,
        t_star: SCENARIO_T_STAR,
    };
    vec![
        ("optimistic", preset(1.0, 0.2, 1.0, 0.1, 0.5, 1.0e6)),
        ("moderate", preset(1.0, 0.1, 0.1, 0.01, 0.1, 1.0e5)),
        ("pessimistic", preset(0.5, 0.01, 1.0e-6, 1.0e-6, 0.1, 1.0e4)),
    ]
}

/// Evaluate every preset for `n_stars` stars.
pub fn drake_scenarios(n_stars: f64) -> ModelResult<Vec<ScenarioResult>> {
    check(crate::drake::validate_population(n_stars))?;
    Ok(scenario_presets()
        .into_iter()
        .map(|(name, params)| {
            let p = params.per_star_probability();
            ScenarioResult {
                name: name.to_string(),
                per_star_p: p,
                p_at_least_one: at_least_one(p, n_stars),
                n_stars,
                params,
            }
        })
        .collect())
}

// ============================================================================
// SWEEP
// ============================================================================

/// Factors held fixed while `f_l` and `f_i` vary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepFixed {
    pub f_p: f64,
    pub n_e: f64,
    pub f_c: f64,
    pub lifetime: f64,
    pub t_star: f64,
}

impl Default for SweepFixed {
    fn default() -> Self {
        Self {
            f_p: 1.0,
            n_e: 0.1,
            f_c: 0.1,
            lifetime: 1.0e5,
            t_star: 5.0e6,
        }
    }
}

impl SweepFixed {
    fn constants(&self) -> DrakeConstants {
        DrakeConstants {
            f_p: self.f_p,
            n_e: self.n_e,
            t_star: self.t_star,
        }
    }

    /// Problems with the fixed factors, and with `fl_values × fi_values`
    /// if the largest grid cell would reach `p >= 1`.
    pub fn validate(&self, fl_values: &[f64], fi_values: &[f64]) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        require_fraction(&mut errors, "f_p", self.f_p, self.f_p);
        require_fraction(&mut errors, "f_c", self.f_c, self.f_c);
        require_positive(&mut errors, "n_e", self.n_e);
        require_positive(&mut errors, "L", self.lifetime);
        require_positive(&mut errors, "t_star", self.t_star);
        for &fl in fl_values {
            require_fraction(&mut errors, "f_l", fl, fl);
        }
        for &fi in fi_values {
            require_fraction(&mut errors, "f_i", fi, fi);
        }

        let largest = |values: &[f64]| values.iter().copied().fold(0.0, f64::max);
        let p_max = per_star_probability(
            &self.constants(),
            largest(fl_values),
            largest(fi_values),
            self.f_c,
            self.lifetime,
        );
        require_probability(&mut errors, p_max);
        errors
    }
}

pub const SWEEP_F_L: [f64; 6] = [1.0, 1.0e-1, 1.0e-2, 1.0e-3, 1.0e-4, 1.0e-6];
pub const SWEEP_F_I: [f64; 5] = [1.0, 1.0e-1, 1.0e-2, 1.0e-3, 1.0e-6];
pub const SWEEP_N_STARS: f64 = 2.0;

/// One grid cell. Column names match the sweep CSV header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub fl: f64,
    pub fi: f64,
    pub per_star_p: f64,
    pub p_at_least_one: f64,
}

/// Evaluate the `f_l × f_i` grid, `f_l` outermost.
pub fn drake_sweep(fl_values: &[f64], fi_values: &[f64], fixed: &SweepFixed, n_stars: f64) -> ModelResult<Vec<SweepRow>> {
    let mut errors = crate::drake::validate_population(n_stars);
    errors.extend(fixed.validate(fl_values, fi_values));
    check(errors)?;
    let constants = fixed.constants();

    let mut rows = Vec::with_capacity(fl_values.len() * fi_values.len());
    for &fl in fl_values {
        for &fi in fi_values {
            let p = per_star_probability(&constants, fl, fi, fixed.f_c, fixed.lifetime);
            rows.push(SweepRow {
                fl,
                fi,
                per_star_p: p,
                p_at_least_one: at_least_one(p, n_stars),
            });
        }
    }
    Ok(rows)
}

pub fn write_sweep_csv(path: &Path, rows: &[SweepRow]) -> ModelResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
