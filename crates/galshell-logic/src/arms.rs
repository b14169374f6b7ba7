//! Logarithmic spiral arms.
//!
//! Each arm is the curve `R(φ) = R_ref · e^{wrap(φ − φ_ref) · tan(pitch)}`,
//! where `wrap` folds the azimuth difference into (−π, π]. Without the wrap,
//! azimuths on the far side of the ±π seam blow the exponential up.
//!
//! Arms come from a CSV table (`name,R_ref_pc,phi_ref_deg,pitch_deg`) when one
//! is available and readable; otherwise a set of evenly spaced parametric
//! arms is generated. Loading never fails: the result is an [`ArmSet`] that
//! records which way it went.

use std::f64::consts::PI;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// One spiral arm. Angles in radians, radius in parsecs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpiralArm {
    pub name: String,
    pub r_ref: f64,
    pub phi_ref: f64,
    pub pitch: f64,
}

impl SpiralArm {
    pub fn from_degrees(name: impl Into<String>, r_ref: f64, phi_ref_deg: f64, pitch_deg: f64) -> Self {
        Self {
            name: name.into(),
            r_ref,
            phi_ref: phi_ref_deg.to_radians(),
            pitch: pitch_deg.to_radians(),
        }
    }

    /// Arm radius at galactocentric azimuth `phi`.
    pub fn radius_at(&self, phi: f64) -> f64 {
        radius_with_tan(self.r_ref, self.phi_ref, self.pitch.tan(), phi)
    }
}

/// Arm radius at azimuth `phi`; see the module docs for the formula.
pub fn arm_radius_at(arm: &SpiralArm, phi: f64) -> f64 {
    arm.radius_at(phi)
}

/// Same as [`arm_radius_at`] with `tan(pitch)` already evaluated.
#[inline]
pub(crate) fn radius_with_tan(r_ref: f64, phi_ref: f64, tan_pitch: f64, phi: f64) -> f64 {
    r_ref * (wrap_angle(phi - phi_ref) * tan_pitch).exp()
}

/// Fold an angle into (−π, π].
#[inline]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

// ============================================================================
// PARAMETRIC ARMS
// ============================================================================

/// Recipe for the fallback arm set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParametricArms {
    pub count: usize,
    /// Shared reference radius, normally the observer's galactocentric radius.
    pub reference_radius: f64,
    /// Shared pitch (radians).
    pub pitch: f64,
}

impl ParametricArms {
    pub fn generate(&self) -> Vec<SpiralArm> {
        parametric_arms(self.count, self.reference_radius, self.pitch)
    }
}

/// `count` arms evenly spaced in azimuth starting at 0.
pub fn parametric_arms(count: usize, reference_radius: f64, pitch: f64) -> Vec<SpiralArm> {
    let spacing = 2.0 * PI / count.max(1) as f64;
    (0..count)
        .map(|k| SpiralArm {
            name: format!("arm{}", k + 1),
            r_ref: reference_radius,
            phi_ref: k as f64 * spacing,
            pitch,
        })
        .collect()
}

/// Four-arm Milky Way model of Reid et al. 2014 (ApJ 783, 130):
/// Perseus, Local, Sagittarius and Norma, all at 13.8° pitch.
pub fn reid_2014_arms() -> Vec<SpiralArm> {
    vec![
        SpiralArm::from_degrees("Perseus", 9.9e3, 25.3, 13.8),
        SpiralArm::from_degrees("Local", 8.4e3, 169.0, 13.8),
        SpiralArm::from_degrees("Sagittarius", 6.6e3, 26.7, 13.8),
        SpiralArm::from_degrees("Norma", 11.0e3, 201.7, 13.8),
    ]
}

// ============================================================================
// TABLE LOADING
// ============================================================================

/// Why the parametric arms were used.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// No table path configured.
    NoTable,
    /// Path configured but nothing there.
    Missing(PathBuf),
    /// File present but could not be read or parsed.
    Unreadable { path: PathBuf, message: String },
    /// File parsed but held no usable rows.
    Empty(PathBuf),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::NoTable => write!(f, "no arm table configured"),
            FallbackReason::Missing(p) => write!(f, "arm table {} not found", p.display()),
            FallbackReason::Unreadable { path, message } => {
                write!(f, "arm table {} unreadable: {}", path.display(), message)
            }
            FallbackReason::Empty(p) => write!(f, "arm table {} has no usable rows", p.display()),
        }
    }
}

/// Arms for one run, tagged with where they came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ArmSet {
    Loaded { arms: Vec<SpiralArm>, path: PathBuf },
    Fallback { arms: Vec<SpiralArm>, reason: FallbackReason },
}

impl ArmSet {
    pub fn arms(&self) -> &[SpiralArm] {
        match self {
            ArmSet::Loaded { arms, .. } | ArmSet::Fallback { arms, .. } => arms,
        }
    }

    /// True when the external table was used.
    pub fn is_loaded(&self) -> bool {
        matches!(self, ArmSet::Loaded { .. })
    }

    pub fn into_arms(self) -> Vec<SpiralArm> {
        match self {
            ArmSet::Loaded { arms, .. } | ArmSet::Fallback { arms, .. } => arms,
        }
    }
}

/// Load arms from `table` if possible, otherwise generate `fallback`.
pub fn load_arms(table: Option<&Path>, fallback: &ParametricArms) -> ArmSet {
    let reason = match table {
        None => FallbackReason::NoTable,
        Some(path) if !path.exists() => FallbackReason::Missing(path.to_path_buf()),
        Some(path) => match read_arm_table(path) {
            Ok(arms) if !arms.is_empty() => {
                log::info!("loaded {} arms from {}", arms.len(), path.display());
                return ArmSet::Loaded {
                    arms,
                    path: path.to_path_buf(),
                };
            }
            Ok(_) => FallbackReason::Empty(path.to_path_buf()),
            Err(e) => FallbackReason::Unreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
        },
    };

    let arms = fallback.generate();
    match &reason {
        FallbackReason::NoTable => log::info!("using {} parametric arms", arms.len()),
        other => log::warn!("{other}; using {} parametric arms", arms.len()),
    }
    ArmSet::Fallback { arms, reason }
}

/// Parse an arm table. Header row is skipped, rows with fewer than four
/// fields are ignored, angles are converted from degrees.
pub fn read_arm_table(path: &Path) -> ModelResult<Vec<SpiralArm>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut arms = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() < 4 {
            continue;
        }
        let r_ref = parse_field(&record, 1, "R_ref_pc")?;
        let phi_ref_deg = parse_field(&record, 2, "phi_ref_deg")?;
        let pitch_deg = parse_field(&record, 3, "pitch_deg")?;
        arms.push(SpiralArm::from_degrees(&record[0], r_ref, phi_ref_deg, pitch_deg));
    }
    Ok(arms)
}

fn parse_field(record: &csv::StringRecord, idx: usize, field: &'static str) -> ModelResult<f64> {
    let value = &record[idx];
    value.parse::<f64>().map_err(|_| ModelError::ArmTable {
        line: record.position().map_or(0, |p| p.line()),
        field,
        value: value.to_string(),
    })
}

/// Write arms in the table format `read_arm_table` accepts.
pub fn write_arm_table(path: &Path, arms: &[SpiralArm]) -> ModelResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["name", "R_ref_pc", "phi_ref_deg", "pitch_deg"])?;
    for arm in arms {
        writer.write_record([
            arm.name.clone(),
            arm.r_ref.to_string(),
            arm.phi_ref.to_degrees().to_string(),
            arm.pitch.to_degrees().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fallback() -> ParametricArms {
        ParametricArms {
            count: 4,
            reference_radius: 8122.0,
            pitch: 12f64.to_radians(),
        }
    }

    #[test]
    fn test_radius_at_reference_is_exact() {
        let mut arms = fallback().generate();
        arms.extend(reid_2014_arms());
        for arm in &arms {
            assert_eq!(arm_radius_at(arm, arm.phi_ref), arm.r_ref, "arm {}", arm.name);
        }
    }

    #[test]
    fn test_radius_wraps_full_turn() {
        for arm in reid_2014_arms() {
            let base = arm.radius_at(arm.phi_ref + 0.3);
            let turned = arm.radius_at(arm.phi_ref + 0.3 + 2.0 * PI);
            assert!((base - turned).abs() / base < 1e-9, "arm {}", arm.name);

            let at_ref = arm.radius_at(arm.phi_ref + 2.0 * PI);
            assert!((at_ref - arm.r_ref).abs() / arm.r_ref < 1e-9);
        }
    }

    #[test]
    fn test_wrap_angle_range() {
        assert_eq!(wrap_angle(0.0), 0.0);
        assert!((wrap_angle(PI) - PI).abs() < 1e-12);
        assert!((wrap_angle(-PI) - PI).abs() < 1e-12);
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        for i in -50..50 {
            let w = wrap_angle(i as f64 * 0.37);
            assert!(w > -PI && w <= PI, "w={w}");
        }
    }

    #[test]
    fn test_radius_bounded_across_seam() {
        // Without the wrap, φ − φ_ref near 2π would give e^{2π·tan} growth.
        let arm = SpiralArm::from_degrees("a", 8000.0, -179.0, 12.0);
        let r = arm.radius_at(179.0f64.to_radians());
        let max = 8000.0 * (PI * 12f64.to_radians().tan()).exp();
        assert!(r <= max, "r={r}");
    }

    #[test]
    fn test_parametric_spacing() {
        let arms = fallback().generate();
        assert_eq!(arms.len(), 4);
        assert_eq!(arms[0].phi_ref, 0.0);
        assert!((arms[1].phi_ref - PI / 2.0).abs() < 1e-12);
        assert!(arms.iter().all(|a| a.r_ref == 8122.0));
        assert_eq!(arms[3].name, "arm4");
    }

    #[test]
    fn test_missing_table_falls_back() {
        let set = load_arms(Some(Path::new("/nonexistent/reid_arms.csv")), &fallback());
        assert!(!set.is_loaded());
        assert_eq!(set.arms().len(), 4);
        assert!(set.arms().iter().all(|a| a.r_ref == 8122.0));
        assert!(matches!(
            set,
            ArmSet::Fallback {
                reason: FallbackReason::Missing(_),
                ..
            }
        ));
    }

    #[test]
    fn test_no_table_falls_back() {
        let set = load_arms(None, &fallback());
        assert!(matches!(
            set,
            ArmSet::Fallback {
                reason: FallbackReason::NoTable,
                ..
            }
        ));
    }

    #[test]
    fn test_table_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reid_arms.csv");
        write_arm_table(&path, &reid_2014_arms()).unwrap();

        let set = load_arms(Some(&path), &fallback());
        assert!(set.is_loaded());
        let arms = set.arms();
        assert_eq!(arms.len(), 4);
        assert_eq!(arms[1].name, "Local");
        assert!((arms[1].phi_ref - 169f64.to_radians()).abs() < 1e-12);
        assert!((arms[1].pitch - 13.8f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn test_short_rows_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name,R_ref_pc,phi_ref_deg,pitch_deg").unwrap();
        writeln!(file, "Perseus,9900,25.3,13.8").unwrap();
        writeln!(file, "broken,1000").unwrap();
        writeln!(file, "Norma,11000,201.7,13.8").unwrap();
        file.flush().unwrap();

        let arms = read_arm_table(file.path()).unwrap();
        assert_eq!(arms.len(), 2);
        assert_eq!(arms[1].name, "Norma");
    }

    #[test]
    fn test_malformed_number_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name,R_ref_pc,phi_ref_deg,pitch_deg").unwrap();
        writeln!(file, "Perseus,far,25.3,13.8").unwrap();
        file.flush().unwrap();

        match read_arm_table(file.path()) {
            Err(ModelError::ArmTable { line, field, value }) => {
                assert_eq!(line, 2);
                assert_eq!(field, "R_ref_pc");
                assert_eq!(value, "far");
            }
            other => panic!("expected ArmTable error, got {other:?}"),
        }

        let set = load_arms(Some(file.path()), &fallback());
        assert!(!set.is_loaded());
        assert_eq!(set.arms().len(), 4);
        match set {
            ArmSet::Fallback {
                reason: FallbackReason::Unreadable { message, .. },
                ..
            } => assert!(message.contains("R_ref_pc") && message.contains("far"), "{message}"),
            other => panic!("expected Unreadable fallback, got {other:?}"),
        }
    }

    #[test]
    fn test_header_only_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name,R_ref_pc,phi_ref_deg,pitch_deg").unwrap();
        file.flush().unwrap();

        let set = load_arms(Some(file.path()), &fallback());
        assert!(matches!(
            set,
            ArmSet::Fallback {
                reason: FallbackReason::Empty(_),
                ..
            }
        ));
    }
}
