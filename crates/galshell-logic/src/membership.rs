//! Arm-membership classification by local azimuth grid search.
//!
//! An arm locus is a curve, not a function of radius, so the distance from a
//! point to it has no closed form. For each point we walk a small window of
//! azimuths centred on the point's own azimuth, evaluate every arm's radius
//! there, and keep the smallest radial separation. The window must stay
//! local: a full turn would pick up other windings of the same spiral.
//!
//! A point is in an arm iff that minimum is strictly below the arm
//! half-width. The boundary is crisp; there is no soft kernel.
//!
//! Cost is `points × arms × steps` exponentials, spread over the rayon pool.

use std::f64::consts::PI;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::arms::{radius_with_tan, SpiralArm};
use crate::constants::arms as defaults;
use crate::error::{check, require_positive, ConfigError, ModelResult};
use crate::shell::SamplePoint;

/// Azimuth search window: `steps` evenly spaced offsets in `[−half_width, +half_width]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AzimuthWindow {
    /// Half-width in radians.
    pub half_width: f64,
    /// Number of grid points, odd.
    pub steps: usize,
}

impl Default for AzimuthWindow {
    fn default() -> Self {
        Self::from_degrees(defaults::WINDOW_HALF_WIDTH_DEG, defaults::WINDOW_STEPS)
    }
}

impl AzimuthWindow {
    pub fn from_degrees(half_width_deg: f64, steps: usize) -> Self {
        Self {
            half_width: half_width_deg.to_radians(),
            steps,
        }
    }

    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.steps == 0 || self.steps % 2 == 0 {
            errors.push(ConfigError::EvenWindowSteps(self.steps));
        }
        if !(self.half_width > 0.0 && self.half_width <= PI) {
            errors.push(ConfigError::WindowOutOfRange(self.half_width.to_degrees()));
        }
        errors
    }

    /// Grid offsets, symmetric about zero (the centre one is exactly 0).
    pub fn offsets(&self) -> Vec<f64> {
        if self.steps <= 1 {
            return vec![0.0];
        }
        let last = (self.steps - 1) as i64;
        (0..self.steps as i64)
            .map(|i| self.half_width * (2 * i - last) as f64 / last as f64)
            .collect()
    }
}

/// Arm geometry prepared for repeated evaluation.
#[derive(Debug, Clone, Copy)]
struct PreparedArm {
    r_ref: f64,
    phi_ref: f64,
    tan_pitch: f64,
}

/// Classifier bound to one arm set, window and threshold.
#[derive(Debug, Clone)]
pub struct ArmClassifier {
    arms: Vec<PreparedArm>,
    offsets: Vec<f64>,
    half_width: f64,
}

impl ArmClassifier {
    pub fn new(arms: &[SpiralArm], window: AzimuthWindow, half_width: f64) -> ModelResult<Self> {
        let mut errors = window.validate();
        require_positive(&mut errors, "arm half-width", half_width);
        if arms.is_empty() {
            errors.push(ConfigError::ZeroArms);
        }
        check(errors)?;

        Ok(Self {
            arms: arms
                .iter()
                .map(|a| PreparedArm {
                    r_ref: a.r_ref,
                    phi_ref: a.phi_ref,
                    tan_pitch: a.pitch.tan(),
                })
                .collect(),
            offsets: window.offsets(),
            half_width,
        })
    }

    pub fn half_width(&self) -> f64 {
        self.half_width
    }

    /// Smallest radial separation between `point` and any arm over the window.
    pub fn min_separation(&self, point: &SamplePoint) -> f64 {
        let mut best = f64::INFINITY;
        for arm in &self.arms {
            for &offset in &self.offsets {
                let r_arm = radius_with_tan(arm.r_ref, arm.phi_ref, arm.tan_pitch, point.phi_gc + offset);
                let sep = (point.r_gc - r_arm).abs();
                if sep < best {
                    best = sep;
                }
            }
        }
        best
    }

    pub fn is_in_arm(&self, point: &SamplePoint) -> bool {
        self.min_separation(point) < self.half_width
    }

    /// Membership flag per point, in input order.
    pub fn classify(&self, points: &[SamplePoint]) -> Vec<bool> {
        let flags: Vec<bool> = points.par_iter().map(|p| self.is_in_arm(p)).collect();
        log::debug!(
            "classified {} points against {} arms ({} grid steps): {} in arms",
            points.len(),
            self.arms.len(),
            self.offsets.len(),
            flags.iter().filter(|&&f| f).count()
        );
        flags
    }
}

/// One-shot form of [`ArmClassifier::classify`].
pub fn classify(
    points: &[SamplePoint],
    arms: &[SpiralArm],
    window: AzimuthWindow,
    half_width: f64,
) -> ModelResult<Vec<bool>> {
    Ok(ArmClassifier::new(arms, window, half_width)?.classify(points))
}

/// One-shot form of [`ArmClassifier::min_separation`].
pub fn min_separation(point: &SamplePoint, arms: &[SpiralArm], window: AzimuthWindow) -> ModelResult<f64> {
    Ok(ArmClassifier::new(arms, window, f64::MAX)?.min_separation(point))
}
