//! Exponential-disk stellar density model.
//!
//! Surface density falls off as `Σ(R) = Σ0·e^(−R/Rd)` and the vertical
//! profile is a two-sided exponential of scale height `hz`:
//!
//! ```text
//! ρ(R, z) = Σ0·e^(−R/Rd) / (2·hz) · e^(−|z|/hz)
//! ```
//!
//! `Σ0` is chosen so that the surface density integrated over a disk of
//! radius `Rmax` equals the configured total population.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{check, require_positive, ConfigError, ModelResult};
use crate::shell::SamplePoint;

/// Disk shape and population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiskProfile {
    /// Radial scale length `Rd` (pc).
    pub scale_length: f64,
    /// Vertical scale height `hz` (pc).
    pub scale_height: f64,
    /// Normalization radius `Rmax` (pc).
    pub cutoff_radius: f64,
    /// Stars within `Rmax`.
    pub total_population: f64,
}

impl DiskProfile {
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        require_positive(&mut errors, "scale length", self.scale_length);
        require_positive(&mut errors, "scale height", self.scale_height);
        require_positive(&mut errors, "cutoff radius", self.cutoff_radius);
        require_positive(&mut errors, "total population", self.total_population);
        errors
    }
}

/// Closed-form `∫0^Rmax 2πR·e^(−R/Rd) dR`: the population of a disk with `Σ0 = 1`.
fn unit_disk_integral(scale_length: f64, cutoff_radius: f64) -> f64 {
    let x = cutoff_radius / scale_length;
    2.0 * PI * scale_length * scale_length * (1.0 - (-x).exp() * (1.0 + x))
}

/// Solve `Σ0` so the disk holds `total_population` stars within `cutoff_radius`.
pub fn normalization(total_population: f64, scale_length: f64, cutoff_radius: f64) -> ModelResult<f64> {
    let mut errors = Vec::new();
    require_positive(&mut errors, "total population", total_population);
    require_positive(&mut errors, "scale length", scale_length);
    require_positive(&mut errors, "cutoff radius", cutoff_radius);
    check(errors)?;

    Ok(total_population / unit_disk_integral(scale_length, cutoff_radius))
}

/// Volume density at galactocentric radius `r` and height `z`.
#[inline]
pub fn density(r: f64, z: f64, sigma0: f64, scale_length: f64, scale_height: f64) -> f64 {
    sigma0 * (-r / scale_length).exp() / (2.0 * scale_height) * (-z.abs() / scale_height).exp()
}

/// A disk profile with its normalization solved once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskModel {
    profile: DiskProfile,
    sigma0: f64,
}

impl DiskModel {
    pub fn new(profile: DiskProfile) -> ModelResult<Self> {
        check(profile.validate())?;
        let sigma0 = normalization(
            profile.total_population,
            profile.scale_length,
            profile.cutoff_radius,
        )?;
        Ok(Self { profile, sigma0 })
    }

    pub fn profile(&self) -> &DiskProfile {
        &self.profile
    }

    /// Central surface density `Σ0` (stars/pc²).
    pub fn sigma0(&self) -> f64 {
        self.sigma0
    }

    pub fn surface_density(&self, r: f64) -> f64 {
        self.sigma0 * (-r / self.profile.scale_length).exp()
    }

    pub fn density(&self, r: f64, z: f64) -> f64 {
        density(
            r,
            z,
            self.sigma0,
            self.profile.scale_length,
            self.profile.scale_height,
        )
    }

    pub fn density_at(&self, point: &SamplePoint) -> f64 {
        self.density(point.r_gc, point.z)
    }

    /// Densities for a batch of points, in order.
    pub fn densities(&self, points: &[SamplePoint]) -> Vec<f64> {
        points.iter().map(|p| self.density_at(p)).collect()
    }

    /// Stars enclosed within galactocentric radius `r` (closed form).
    pub fn enclosed_population(&self, r: f64) -> f64 {
        self.sigma0 * unit_disk_integral(self.profile.scale_length, r)
    }

    /// Same model with a different total population (Σ0 scales linearly).
    pub fn with_total_population(&self, total_population: f64) -> ModelResult<Self> {
        Self::new(DiskProfile {
            total_population,
            ..self.profile
        })
    }
}

/// Composite Simpson integral of `2πR·Σ(R)` over `[0, r_max]`.
pub fn integrate_surface_density(model: &DiskModel, r_max: f64, intervals: usize) -> f64 {
    let n = (intervals + intervals % 2).max(2);
    let h = r_max / n as f64;
    let f = |r: f64| 2.0 * PI * r * model.surface_density(r);

    let mut sum = f(0.0) + f(r_max);
    for i in 1..n {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * f(i as f64 * h);
    }
    sum * h / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::disk;

    fn default_profile() -> DiskProfile {
        DiskProfile {
            scale_length: disk::SCALE_LENGTH_PC,
            scale_height: disk::SCALE_HEIGHT_PC,
            cutoff_radius: disk::CUTOFF_RADIUS_PC,
            total_population: disk::TOTAL_POPULATION,
        }
    }

    #[test]
    fn test_normalization_value() {
        let sigma0 = normalization(2.0e10, 2600.0, 15000.0).unwrap();
        // 2e10 / (2π·2600²·(1 − e^−5.769·6.769)) ≈ 481 stars/pc²
        assert!(sigma0 > 470.0 && sigma0 < 490.0, "sigma0={sigma0}");
    }

    #[test]
    fn test_normalization_inversion_simpson() {
        let model = DiskModel::new(default_profile()).unwrap();
        let integral = integrate_surface_density(&model, disk::CUTOFF_RADIUS_PC, 20_000);
        let rel = (integral - disk::TOTAL_POPULATION).abs() / disk::TOTAL_POPULATION;
        assert!(rel < 1e-6, "rel error {rel}");
    }

    #[test]
    fn test_enclosed_population_at_cutoff() {
        let model = DiskModel::new(default_profile()).unwrap();
        let n = model.enclosed_population(disk::CUTOFF_RADIUS_PC);
        assert!((n / disk::TOTAL_POPULATION - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalization_rejects_bad_inputs() {
        assert!(normalization(2.0e10, 0.0, 15000.0).is_err());
        assert!(normalization(2.0e10, 2600.0, -1.0).is_err());
        assert!(normalization(0.0, 2600.0, 15000.0).is_err());
        assert!(normalization(f64::INFINITY, 2600.0, 15000.0).is_err());
    }

    #[test]
    fn test_density_symmetric_in_z() {
        let model = DiskModel::new(default_profile()).unwrap();
        assert_eq!(model.density(8000.0, 150.0), model.density(8000.0, -150.0));
        assert!(model.density(8000.0, 0.0) > model.density(8000.0, 300.0));
        assert!(model.density(4000.0, 0.0) > model.density(8000.0, 0.0));
    }

    #[test]
    fn test_density_midplane_value() {
        let model = DiskModel::new(default_profile()).unwrap();
        let rho = model.density(0.0, 0.0);
        assert!((rho - model.sigma0() / (2.0 * disk::SCALE_HEIGHT_PC)).abs() < 1e-12);
    }

    #[test]
    fn test_density_scales_linearly_with_population() {
        let model = DiskModel::new(default_profile()).unwrap();
        let doubled = model.with_total_population(4.0e10).unwrap();
        let ratio = doubled.density(7000.0, 50.0) / model.density(7000.0, 50.0);
        assert!((ratio - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_batch_matches_pointwise() {
        let model = DiskModel::new(default_profile()).unwrap();
        let points = [
            SamplePoint::from_spherical(100.0, 0.5, 1.0, 8122.0),
            SamplePoint::from_spherical(5000.0, -0.2, 3.0, 8122.0),
        ];
        let batch = model.densities(&points);
        assert_eq!(batch[0], model.density_at(&points[0]));
        assert_eq!(batch[1], model.density_at(&points[1]));
    }
}
