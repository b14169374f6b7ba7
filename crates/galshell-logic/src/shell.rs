//! Spherical-shell sampler.
//!
//! Draws points uniformly by volume inside a shell centred on the observer
//! and converts them to galactocentric cylindrical coordinates. The observer
//! sits at `(R0, 0, 0)` in the galactocentric frame.
//!
//! ```
//! use galshell_logic::shell::{sample_parallel, ShellGeometry};
//!
//! let shell = ShellGeometry::new(5000.0, 5010.0, 8122.0);
//! let points = sample_parallel(&shell, 1000, 7, 256).unwrap();
//! assert_eq!(points.len(), 1000);
//!
//! // An empty shell is rejected instead of sampled.
//! assert!(sample_parallel(&ShellGeometry::new(10.0, 5.0, 8122.0), 10, 7, 256).is_err());
//! ```

use std::cmp::Ordering;
use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::units;
use crate::error::{check, require_positive, ConfigError, ModelResult};

/// Shell bounds and observer placement, all in parsecs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShellGeometry {
    pub inner_radius: f64,
    pub outer_radius: f64,
    /// Observer's distance from the galactic centre.
    pub observer_radius: f64,
}

impl ShellGeometry {
    pub fn new(inner_radius: f64, outer_radius: f64, observer_radius: f64) -> Self {
        Self {
            inner_radius,
            outer_radius,
            observer_radius,
        }
    }

    /// Shell given in light-years around an observer given in parsecs.
    pub fn from_light_years(inner_ly: f64, outer_ly: f64, observer_radius_pc: f64) -> Self {
        Self::new(
            units::ly_to_pc(inner_ly),
            units::ly_to_pc(outer_ly),
            observer_radius_pc,
        )
    }

    /// Exact shell volume, 4/3·π·(r2³ − r1³).
    pub fn volume(&self) -> f64 {
        4.0 / 3.0 * PI * (self.outer_radius.powi(3) - self.inner_radius.powi(3))
    }

    pub fn thickness(&self) -> f64 {
        self.outer_radius - self.inner_radius
    }

    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if !(self.inner_radius.is_finite() && self.inner_radius > 0.0) {
            errors.push(ConfigError::NonPositiveInnerRadius(self.inner_radius));
        }
        if self.inner_radius.partial_cmp(&self.outer_radius) != Some(Ordering::Less) {
            errors.push(ConfigError::ShellRadiiOrder {
                inner: self.inner_radius,
                outer: self.outer_radius,
            });
        }
        require_positive(&mut errors, "observer radius", self.observer_radius);
        errors
    }
}

/// One Monte Carlo draw. Observer-centred Cartesian plus galactocentric
/// cylindrical `(r_gc, phi_gc, z)`; `z` is shared by both frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Distance from the observer.
    pub r: f64,
    /// Polar angle cosine in the observer frame.
    pub cos_theta: f64,
    /// Observer-frame azimuth in [0, 2π).
    pub azimuth: f64,
    pub r_gc: f64,
    /// Galactocentric azimuth in (−π, π].
    pub phi_gc: f64,
}

impl SamplePoint {
    /// Build a point from observer-frame spherical coordinates.
    pub fn from_spherical(r: f64, cos_theta: f64, azimuth: f64, observer_radius: f64) -> Self {
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let x = r * sin_theta * azimuth.cos();
        let y = r * sin_theta * azimuth.sin();
        let z = r * cos_theta;

        let x_gc = observer_radius + x;
        let y_gc = y;

        Self {
            x,
            y,
            z,
            r,
            cos_theta,
            azimuth,
            r_gc: x_gc.hypot(y_gc),
            phi_gc: y_gc.atan2(x_gc),
        }
    }

    /// Galactocentric Cartesian `(X, Y, Z)`.
    pub fn galactocentric(&self, observer_radius: f64) -> (f64, f64, f64) {
        (observer_radius + self.x, self.y, self.z)
    }
}

/// Draw a single point uniformly by volume. `shell` must already be valid.
fn draw_point<R: Rng + ?Sized>(shell: &ShellGeometry, rng: &mut R) -> SamplePoint {
    let r1_cubed = shell.inner_radius.powi(3);
    let r2_cubed = shell.outer_radius.powi(3);

    // Uniform in r³ gives uniform density by volume.
    let u = rng.gen_range(r1_cubed..r2_cubed);
    let r = u.cbrt();
    let cos_theta = rng.gen_range(-1.0..=1.0);
    let azimuth = rng.gen_range(0.0..2.0 * PI);

    SamplePoint::from_spherical(r, cos_theta, azimuth, shell.observer_radius)
}

fn draw_points<R: Rng + ?Sized>(shell: &ShellGeometry, count: usize, rng: &mut R) -> Vec<SamplePoint> {
    (0..count).map(|_| draw_point(shell, rng)).collect()
}

/// Draw `count` points from a single RNG stream.
pub fn sample<R: Rng + ?Sized>(shell: &ShellGeometry, count: usize, rng: &mut R) -> ModelResult<Vec<SamplePoint>> {
    check(shell.validate())?;
    Ok(draw_points(shell, count, rng))
}

/// Draw `count` points in parallel chunks.
///
/// Chunk `i` gets its own `StdRng` seeded with `seed + i`, so the output
/// depends only on `(seed, chunk_size)` and not on the thread count.
pub fn sample_parallel(
    shell: &ShellGeometry,
    count: usize,
    seed: u64,
    chunk_size: usize,
) -> ModelResult<Vec<SamplePoint>> {
    check(shell.validate())?;
    let chunk_size = chunk_size.max(1);
    let chunk_count = count.div_ceil(chunk_size);

    let chunks: Vec<Vec<SamplePoint>> = (0..chunk_count)
        .into_par_iter()
        .map(|chunk_idx| {
            let start = chunk_idx * chunk_size;
            let len = chunk_size.min(count - start);
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(chunk_idx as u64));
            draw_points(shell, len, &mut rng)
        })
        .collect();

    log::debug!(
        "sampled {} points in {} chunks (r = {:.1}..{:.1} pc)",
        count,
        chunk_count,
        shell.inner_radius,
        shell.outer_radius
    );

    Ok(chunks.into_iter().flatten().collect())
}
