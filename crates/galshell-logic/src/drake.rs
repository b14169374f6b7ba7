//! Drake-equation probability propagation.
//!
//! Per star, the chance of currently hosting a detectable civilization is
//!
//! ```text
//! p = f_p · n_e · f_l · f_i · f_c · (L / t_star)
//! ```
//!
//! and the chance that at least one of `N` stars does is `1 − (1 − p)^N`.
//! With `p` near 1e-20 the naive form rounds to zero, so it is evaluated as
//! `−expm1(N · ln_1p(−p))`.
//!
//! The four uncertain factors are drawn from independent priors and every
//! derived metric is summarized by quantiles, mean and median.
//!
//! ```
//! use galshell_logic::drake::{propagate, DrakePriors};
//!
//! let summary = propagate(2.0, 10_000, &DrakePriors::default(), 7).unwrap();
//! assert!(summary.p_any.median >= 0.0 && summary.p_any.median <= 1.0);
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::constants::drake as defaults;
use crate::error::{check, require_fraction, require_positive, require_probability, ConfigError, ModelResult};
use crate::stats::{self, Summary};

// ============================================================================
// PRIORS
// ============================================================================

/// Distribution family and bounds for one uncertain factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Prior {
    /// Uniform in `ln x` over `[low, high]`.
    LogUniform { low: f64, high: f64 },
    Uniform { low: f64, high: f64 },
}

impl Prior {
    pub fn log_uniform((low, high): (f64, f64)) -> Self {
        Prior::LogUniform { low, high }
    }

    pub fn uniform((low, high): (f64, f64)) -> Self {
        Prior::Uniform { low, high }
    }

    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            Prior::LogUniform { low, high } | Prior::Uniform { low, high } => (low, high),
        }
    }

    pub fn validate(&self, name: &'static str) -> Vec<ConfigError> {
        let (low, high) = self.bounds();
        let ordered = low.is_finite() && high.is_finite() && low <= high;
        let ok = match self {
            Prior::LogUniform { .. } => ordered && low > 0.0,
            Prior::Uniform { .. } => ordered,
        };
        if ok {
            Vec::new()
        } else {
            vec![ConfigError::InvalidPriorBounds { name, low, high }]
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Prior::LogUniform { low, high } => {
                let (log_low, log_high) = (low.ln(), high.ln());
                (log_low + rng.gen::<f64>() * (log_high - log_low)).exp()
            }
            Prior::Uniform { low, high } => low + rng.gen::<f64>() * (high - low),
        }
    }
}

/// Factors held fixed across samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrakeConstants {
    /// Fraction of stars with planets.
    pub f_p: f64,
    /// Potentially habitable planets per star.
    pub n_e: f64,
    /// Stellar lifetime (years).
    pub t_star: f64,
}

impl Default for DrakeConstants {
    fn default() -> Self {
        Self {
            f_p: defaults::F_P,
            n_e: defaults::N_E,
            t_star: defaults::T_STAR_YEARS,
        }
    }
}

/// The full prior configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrakePriors {
    pub f_l: Prior,
    pub f_i: Prior,
    pub f_c: Prior,
    /// Civilization lifetime `L` (years).
    pub lifetime: Prior,
    pub constants: DrakeConstants,
}

impl Default for DrakePriors {
    fn default() -> Self {
        Self {
            f_l: Prior::log_uniform(defaults::F_L_RANGE),
            f_i: Prior::log_uniform(defaults::F_I_RANGE),
            f_c: Prior::uniform(defaults::F_C_RANGE),
            lifetime: Prior::log_uniform(defaults::L_RANGE_YEARS),
            constants: DrakeConstants::default(),
        }
    }
}

impl DrakePriors {
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.f_l.validate("f_l"));
        errors.extend(self.f_i.validate("f_i"));
        errors.extend(self.f_c.validate("f_c"));
        errors.extend(self.lifetime.validate("L"));
        require_positive(&mut errors, "f_p", self.constants.f_p);
        require_positive(&mut errors, "n_e", self.constants.n_e);
        require_positive(&mut errors, "t_star", self.constants.t_star);

        for (name, prior) in [("f_l", &self.f_l), ("f_i", &self.f_i), ("f_c", &self.f_c)] {
            let (low, high) = prior.bounds();
            require_fraction(&mut errors, name, low, high);
        }
        require_fraction(&mut errors, "f_p", self.constants.f_p, self.constants.f_p);
        require_probability(&mut errors, self.max_per_star_probability());
        errors
    }

    /// Per-star probability with every prior at its upper bound.
    pub fn max_per_star_probability(&self) -> f64 {
        per_star_probability(
            &self.constants,
            self.f_l.bounds().1,
            self.f_i.bounds().1,
            self.f_c.bounds().1,
            self.lifetime.bounds().1,
        )
    }
}

// ============================================================================
// PROBABILITIES
// ============================================================================

/// Per-star probability for one draw of the uncertain factors.
pub fn per_star_probability(constants: &DrakeConstants, f_l: f64, f_i: f64, f_c: f64, lifetime: f64) -> f64 {
    constants.f_p * constants.n_e * f_l * f_i * f_c * (lifetime / constants.t_star)
}

/// `1 − (1 − p)^n` without cancellation for tiny `p`.
#[inline]
pub fn at_least_one(p: f64, n: f64) -> f64 {
    -(n * (-p).ln_1p()).exp_m1()
}

/// All draws of one propagation, kept side by side.
#[derive(Debug, Clone, Default)]
pub struct DrakeSampleBatch {
    pub f_l: Vec<f64>,
    pub f_i: Vec<f64>,
    pub f_c: Vec<f64>,
    pub lifetime: Vec<f64>,
    pub per_star_p: Vec<f64>,
    pub p_any: Vec<f64>,
    pub expected_civ: Vec<f64>,
}

impl DrakeSampleBatch {
    pub fn len(&self) -> usize {
        self.per_star_p.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_star_p.is_empty()
    }
}

/// Draw `samples` factor sets and derive every metric for `n_stars` stars.
pub fn draw_batch<R: Rng + ?Sized>(
    n_stars: f64,
    samples: usize,
    priors: &DrakePriors,
    rng: &mut R,
) -> DrakeSampleBatch {
    let mut batch = DrakeSampleBatch::default();
    for _ in 0..samples {
        let f_l = priors.f_l.sample(rng);
        let f_i = priors.f_i.sample(rng);
        let f_c = priors.f_c.sample(rng);
        let lifetime = priors.lifetime.sample(rng);
        let p = per_star_probability(&priors.constants, f_l, f_i, f_c, lifetime);

        batch.f_l.push(f_l);
        batch.f_i.push(f_i);
        batch.f_c.push(f_c);
        batch.lifetime.push(lifetime);
        batch.per_star_p.push(p);
        batch.p_any.push(at_least_one(p, n_stars));
        batch.expected_civ.push(n_stars * p);
    }
    batch
}

// ============================================================================
// SUMMARY
// ============================================================================

/// Prior configuration as echoed in the summary record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorEcho {
    pub fp: f64,
    pub ne: f64,
    pub f_l_range: [f64; 2],
    pub f_i_range: [f64; 2],
    pub f_c_range: [f64; 2],
    #[serde(rename = "L_range_years")]
    pub l_range_years: [f64; 2],
    pub t_star_years: f64,
}

impl From<&DrakePriors> for PriorEcho {
    fn from(p: &DrakePriors) -> Self {
        let range = |prior: &Prior| {
            let (low, high) = prior.bounds();
            [low, high]
        };
        Self {
            fp: p.constants.f_p,
            ne: p.constants.n_e,
            f_l_range: range(&p.f_l),
            f_i_range: range(&p.f_i),
            f_c_range: range(&p.f_c),
            l_range_years: range(&p.lifetime),
            t_star_years: p.constants.t_star,
        }
    }
}

/// Summary of one propagation. Serialized flat, as `<metric>_quantiles`,
/// `<metric>_mean` and `<metric>_median`.
#[derive(Debug, Clone, PartialEq)]
pub struct DrakeSummary {
    pub n_stars: f64,
    pub samples: usize,
    pub quantile_levels: Vec<f64>,
    pub per_star_p: Summary,
    pub p_any: Summary,
    pub expected_civ: Summary,
    pub priors: PriorEcho,
}

#[derive(Serialize, Deserialize)]
struct DrakeSummaryRecord {
    #[serde(rename = "N_stars_used")]
    n_stars_used: f64,
    n_samples: usize,
    per_star_p_quantiles: Vec<f64>,
    per_star_p_mean: f64,
    per_star_p_median: f64,
    p_any_quantiles: Vec<f64>,
    p_any_mean: f64,
    p_any_median: f64,
    expected_n_civ_quantiles: Vec<f64>,
    expected_n_civ_mean: f64,
    expected_n_civ_median: f64,
    quantile_levels: Vec<f64>,
    priors: PriorEcho,
}

impl Serialize for DrakeSummary {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DrakeSummaryRecord {
            n_stars_used: self.n_stars,
            n_samples: self.samples,
            per_star_p_quantiles: self.per_star_p.quantiles.clone(),
            per_star_p_mean: self.per_star_p.mean,
            per_star_p_median: self.per_star_p.median,
            p_any_quantiles: self.p_any.quantiles.clone(),
            p_any_mean: self.p_any.mean,
            p_any_median: self.p_any.median,
            expected_n_civ_quantiles: self.expected_civ.quantiles.clone(),
            expected_n_civ_mean: self.expected_civ.mean,
            expected_n_civ_median: self.expected_civ.median,
            quantile_levels: self.quantile_levels.clone(),
            priors: self.priors.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DrakeSummary {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let r = DrakeSummaryRecord::deserialize(deserializer)?;
        Ok(Self {
            n_stars: r.n_stars_used,
            samples: r.n_samples,
            quantile_levels: r.quantile_levels,
            per_star_p: Summary {
                quantiles: r.per_star_p_quantiles,
                mean: r.per_star_p_mean,
                median: r.per_star_p_median,
            },
            p_any: Summary {
                quantiles: r.p_any_quantiles,
                mean: r.p_any_mean,
                median: r.p_any_median,
            },
            expected_civ: Summary {
                quantiles: r.expected_n_civ_quantiles,
                mean: r.expected_n_civ_mean,
                median: r.expected_n_civ_median,
            },
            priors: r.priors,
        })
    }
}

/// Check the population handed to the Drake stage.
pub fn validate_population(n_stars: f64) -> Vec<ConfigError> {
    if n_stars.is_finite() && n_stars > 0.0 {
        Vec::new()
    } else {
        vec![ConfigError::InvalidPopulation(n_stars)]
    }
}

/// Sample the priors `samples` times for `n_stars` stars and summarize.
pub fn propagate(n_stars: f64, samples: usize, priors: &DrakePriors, seed: u64) -> ModelResult<DrakeSummary> {
    let mut errors = validate_population(n_stars);
    if samples == 0 {
        errors.push(ConfigError::ZeroSamples);
    }
    errors.extend(priors.validate());
    check(errors)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let batch = draw_batch(n_stars, samples, priors, &mut rng);
    let levels = defaults::QUANTILE_LEVELS.to_vec();

    let summary = DrakeSummary {
        n_stars,
        samples,
        per_star_p: stats::summarize(&batch.per_star_p, &levels),
        p_any: stats::summarize(&batch.p_any, &levels),
        expected_civ: stats::summarize(&batch.expected_civ, &levels),
        quantile_levels: levels,
        priors: PriorEcho::from(priors),
    };

    log::info!(
        "Drake: N = {:.3e}, {} samples, median p = {:.3e}, median P(any) = {:.3e}",
        n_stars,
        samples,
        summary.per_star_p.median,
        summary.p_any.median
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_least_one_small_p() {
        let p = 1.0e-20;
        let any = at_least_one(p, 2.0);
        assert!((any / (2.0 * p) - 1.0).abs() < 1e-12, "any={any}");
        // The naive form collapses to zero here.
        assert_eq!(1.0 - (1.0 - p).powf(2.0), 0.0);
    }

    #[test]
    fn test_at_least_one_edges() {
        assert_eq!(at_least_one(0.0, 5.0), 0.0);
        assert_eq!(at_least_one(1.0, 5.0), 1.0);
        assert!((at_least_one(0.5, 2.0) - 0.75).abs() < 1e-15);
    }

    #[test]
    fn test_per_star_probability_product() {
        let c = DrakeConstants::default();
        // 1 · 0.1 · 1e-6 · 1e-6 · 0.1 · (1e4 / 1e10)
        let p = per_star_probability(&c, 1e-6, 1e-6, 0.1, 1e4);
        assert!((p / 1e-20 - 1.0).abs() < 1e-12, "p={p}");
    }

    #[test]
    fn test_log_uniform_within_bounds() {
        let prior = Prior::log_uniform((1e-6, 1.0));
        let mut rng = StdRng::seed_from_u64(3);
        let draws: Vec<f64> = (0..20_000).map(|_| prior.sample(&mut rng)).collect();
        assert!(draws.iter().all(|&x| (1e-6..=1.0).contains(&x)));
        // Median of a log-uniform on [1e-6, 1] is 1e-3.
        let median_log10 = stats::median(&draws).log10();
        assert!((median_log10 + 3.0).abs() < 0.1, "median log10={median_log10}");
    }

    #[test]
    fn test_prior_validation() {
        assert_eq!(Prior::log_uniform((0.0, 1.0)).validate("f_l").len(), 1);
        assert_eq!(Prior::uniform((1.0, 0.5)).validate("f_c").len(), 1);
        assert!(Prior::uniform((0.0, 1.0)).validate("f_c").is_empty());
        assert!(DrakePriors::default().validate().is_empty());
    }

    #[test]
    fn test_propagate_rejects_bad_inputs() {
        let priors = DrakePriors::default();
        assert!(propagate(0.0, 100, &priors, 1).is_err());
        assert!(propagate(f64::NAN, 100, &priors, 1).is_err());
        assert!(propagate(2.0, 0, &priors, 1).is_err());
        let bad = DrakePriors {
            lifetime: Prior::log_uniform((1e8, 1e2)),
            ..Default::default()
        };
        assert!(propagate(2.0, 100, &bad, 1).is_err());
    }

    #[test]
    fn test_fraction_prior_outside_unit_interval_rejected() {
        let priors = DrakePriors {
            f_c: Prior::uniform((-0.5, 1.0)),
            ..Default::default()
        };
        let errors = priors.validate();
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ConfigError::FractionOutOfRange { name: "f_c", .. })),
            "{errors:?}"
        );
        assert!(propagate(2.0, 100, &priors, 1).is_err());

        let above_one = DrakePriors {
            f_l: Prior::log_uniform((1e-6, 2.0)),
            ..Default::default()
        };
        assert_eq!(above_one.validate().len(), 1);
    }

    #[test]
    fn test_lifetime_beyond_stellar_lifetime_rejected() {
        // L up to 1e12 years lets p reach 10 against t_star = 1e10.
        let priors = DrakePriors {
            lifetime: Prior::log_uniform((1e2, 1e12)),
            ..Default::default()
        };
        assert!((priors.max_per_star_probability() - 10.0).abs() < 1e-9);
        assert!(matches!(
            priors.validate().as_slice(),
            [ConfigError::ProbabilityNotBelowOne(_)]
        ));
        assert!(propagate(2.0, 1000, &priors, 1).is_err());
    }

    #[test]
    fn test_accepted_priors_keep_p_any_a_probability() {
        // Largest p just under 1 is still accepted and every draw stays in [0, 1].
        let priors = DrakePriors {
            lifetime: Prior::log_uniform((1e2, 9.9e10)),
            ..Default::default()
        };
        assert!(priors.validate().is_empty());
        let summary = propagate(1.0e6, 20_000, &priors, 4).unwrap();
        for q in summary.p_any.quantiles.iter().chain([&summary.p_any.mean]) {
            assert!((0.0..=1.0).contains(q), "p_any value {q}");
        }
    }

    #[test]
    fn test_propagate_deterministic_and_ordered() {
        let priors = DrakePriors::default();
        let a = propagate(1.0e6, 5000, &priors, 11).unwrap();
        let b = propagate(1.0e6, 5000, &priors, 11).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.per_star_p.quantiles.len(), defaults::QUANTILE_LEVELS.len());
        assert!(a.p_any.quantiles.windows(2).all(|w| w[0] <= w[1]));
        assert!(a.p_any.quantiles.iter().all(|&q| (0.0..=1.0).contains(&q)));
    }

    #[test]
    fn test_summary_json_keys() {
        let s = propagate(2.0, 200, &DrakePriors::default(), 5).unwrap();
        let v = serde_json::to_value(&s).unwrap();
        for key in [
            "N_stars_used",
            "n_samples",
            "per_star_p_quantiles",
            "per_star_p_mean",
            "per_star_p_median",
            "p_any_quantiles",
            "p_any_mean",
            "p_any_median",
            "expected_n_civ_quantiles",
            "expected_n_civ_mean",
            "expected_n_civ_median",
            "quantile_levels",
        ] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        assert_eq!(v["priors"]["L_range_years"][1], 1e8);
        assert_eq!(v["priors"]["t_star_years"], 1e10);
        assert_eq!(v["N_stars_used"], 2.0);
    }
}
