//! Run configuration: shell, disk, arms, sampling and Drake priors.
//!
//! Every field has a default, so a TOML file only needs the values it
//! changes:
//!
//! ```
//! use galshell_logic::config::RunConfig;
//!
//! let config = RunConfig::from_toml_str(r#"
//!     [shell]
//!     inner_radius_ly = 20366.0
//!     outer_radius_ly = 20374.0
//!
//!     [sampling]
//!     samples = 20000
//! "#).unwrap();
//! assert_eq!(config.arms.count, 4);
//! assert!(config.validate().is_empty());
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::arms::ParametricArms;
use crate::constants::{arms, disk, drake, shell};
use crate::density::DiskProfile;
use crate::drake::{validate_population, DrakeConstants, DrakePriors, Prior};
use crate::error::{require_positive, ConfigError, ModelResult};
use crate::membership::AzimuthWindow;
use crate::shell::ShellGeometry;

// ============================================================================
// SECTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellConfig {
    pub inner_radius_ly: f64,
    pub outer_radius_ly: f64,
    /// Observer's galactocentric radius (pc).
    pub observer_radius_pc: f64,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            inner_radius_ly: shell::INNER_RADIUS_LY,
            outer_radius_ly: shell::OUTER_RADIUS_LY,
            observer_radius_pc: disk::OBSERVER_RADIUS_PC,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiskConfig {
    pub scale_length_pc: f64,
    pub scale_height_pc: f64,
    pub cutoff_radius_pc: f64,
    pub total_population: f64,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            scale_length_pc: disk::SCALE_LENGTH_PC,
            scale_height_pc: disk::SCALE_HEIGHT_PC,
            cutoff_radius_pc: disk::CUTOFF_RADIUS_PC,
            total_population: disk::TOTAL_POPULATION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArmConfig {
    /// Parametric arm count, used when no table is loaded.
    pub count: usize,
    pub pitch_deg: f64,
    pub half_width_pc: f64,
    pub window_half_width_deg: f64,
    pub window_steps: usize,
    /// Optional arm table (`name,R_ref_pc,phi_ref_deg,pitch_deg`).
    pub table: Option<PathBuf>,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            count: arms::ARM_COUNT,
            pitch_deg: arms::PITCH_DEG,
            half_width_pc: arms::HALF_WIDTH_PC,
            window_half_width_deg: arms::WINDOW_HALF_WIDTH_DEG,
            window_steps: arms::WINDOW_STEPS,
            table: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplingConfig {
    pub samples: usize,
    pub seed: u64,
    pub chunk_size: usize,
    /// Alternate total populations for the sensitivity sweep.
    pub sensitivity_totals: Vec<f64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            samples: shell::SAMPLE_COUNT,
            seed: shell::SEED,
            chunk_size: shell::CHUNK_SIZE,
            sensitivity_totals: disk::SENSITIVITY_TOTALS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DrakeConfig {
    pub samples: usize,
    pub seed: u64,
    pub f_p: f64,
    pub n_e: f64,
    pub t_star_years: f64,
    pub f_l_range: (f64, f64),
    pub f_i_range: (f64, f64),
    pub f_c_range: (f64, f64),
    pub l_range_years: (f64, f64),
    /// Overrides the star count read from the shell results.
    pub n_stars: Option<f64>,
}

impl Default for DrakeConfig {
    fn default() -> Self {
        Self {
            samples: drake::SAMPLE_COUNT,
            seed: shell::SEED,
            f_p: drake::F_P,
            n_e: drake::N_E,
            t_star_years: drake::T_STAR_YEARS,
            f_l_range: drake::F_L_RANGE,
            f_i_range: drake::F_I_RANGE,
            f_c_range: drake::F_C_RANGE,
            l_range_years: drake::L_RANGE_YEARS,
            n_stars: None,
        }
    }
}

// ============================================================================
// RUN CONFIG
// ============================================================================

/// Complete configuration for a shell run and its Drake stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub shell: ShellConfig,
    pub disk: DiskConfig,
    pub arms: ArmConfig,
    pub sampling: SamplingConfig,
    pub drake: DrakeConfig,
}

impl RunConfig {
    pub fn from_toml_str(text: &str) -> ModelResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> ModelResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Every problem with the configuration, empty if it is usable.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = self.shell_geometry().validate();
        errors.extend(self.disk_profile().validate());

        if self.arms.count == 0 {
            errors.push(ConfigError::ZeroArms);
        }
        if !self.arms.pitch_deg.is_finite() {
            errors.push(ConfigError::NonPositive {
                name: "arm pitch",
                value: self.arms.pitch_deg,
            });
        }
        require_positive(&mut errors, "arm half-width", self.arms.half_width_pc);
        errors.extend(self.azimuth_window().validate());

        if self.sampling.samples == 0 {
            errors.push(ConfigError::ZeroSamples);
        }
        if self.sampling.chunk_size == 0 {
            errors.push(ConfigError::ZeroChunkSize);
        }
        for &total in &self.sampling.sensitivity_totals {
            require_positive(&mut errors, "sensitivity total", total);
        }

        errors.extend(self.validate_drake());
        errors
    }

    /// Problems in the `[drake]` section alone. A Drake-only run reads its
    /// population from a results file and never touches the shell settings.
    pub fn validate_drake(&self) -> Vec<ConfigError> {
        let mut errors = self.drake_priors().validate();
        if self.drake.samples == 0 {
            errors.push(ConfigError::ZeroSamples);
        }
        if let Some(n) = self.drake.n_stars {
            errors.extend(validate_population(n));
        }
        errors
    }

    pub fn shell_geometry(&self) -> ShellGeometry {
        ShellGeometry::from_light_years(
            self.shell.inner_radius_ly,
            self.shell.outer_radius_ly,
            self.shell.observer_radius_pc,
        )
    }

    pub fn disk_profile(&self) -> DiskProfile {
        DiskProfile {
            scale_length: self.disk.scale_length_pc,
            scale_height: self.disk.scale_height_pc,
            cutoff_radius: self.disk.cutoff_radius_pc,
            total_population: self.disk.total_population,
        }
    }

    /// Fallback arms: evenly spaced, anchored at the observer's radius.
    pub fn parametric_arms(&self) -> ParametricArms {
        ParametricArms {
            count: self.arms.count,
            reference_radius: self.shell.observer_radius_pc,
            pitch: self.arms.pitch_deg.to_radians(),
        }
    }

    pub fn azimuth_window(&self) -> AzimuthWindow {
        AzimuthWindow::from_degrees(self.arms.window_half_width_deg, self.arms.window_steps)
    }

    pub fn drake_priors(&self) -> DrakePriors {
        DrakePriors {
            f_l: Prior::log_uniform(self.drake.f_l_range),
            f_i: Prior::log_uniform(self.drake.f_i_range),
            f_c: Prior::uniform(self.drake.f_c_range),
            lifetime: Prior::log_uniform(self.drake.l_range_years),
            constants: DrakeConstants {
                f_p: self.drake.f_p,
                n_e: self.drake.n_e,
                t_star: self.drake.t_star_years,
            },
        }
    }
}
