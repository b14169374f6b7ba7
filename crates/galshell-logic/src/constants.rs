//! Model constants: unit conversions and default parameters.
//!
//! Defaults describe the G-type star run: a Sun-like observer at 8.122 kpc,
//! an exponential thin disk, four parametric arms, and the Drake priors.
//! They are defaults only; every value is overridable through `RunConfig`.

/// Unit conversions.
pub mod units {
    /// Parsecs per light-year, as used by the shell analysis.
    pub const LY_TO_PC: f64 = 0.306601;

    pub fn ly_to_pc(ly: f64) -> f64 {
        ly * LY_TO_PC
    }

    pub fn pc_to_ly(pc: f64) -> f64 {
        pc / LY_TO_PC
    }
}

/// Galactic disk defaults (parsecs).
pub mod disk {
    /// Sun's galactocentric radius (8.122 kpc).
    pub const OBSERVER_RADIUS_PC: f64 = 8122.0;
    /// Radial scale length for G stars.
    pub const SCALE_LENGTH_PC: f64 = 2600.0;
    /// Vertical scale height for G stars.
    pub const SCALE_HEIGHT_PC: f64 = 300.0;
    /// Radius the surface density is normalized within.
    pub const CUTOFF_RADIUS_PC: f64 = 15000.0;
    /// Total G-type population of the galaxy.
    pub const TOTAL_POPULATION: f64 = 2.0e10;
    /// Alternate totals reported by the sensitivity sweep.
    pub const SENSITIVITY_TOTALS: [f64; 4] = [5.0e9, 1.0e10, 2.0e10, 5.0e10];
}

/// Spiral arm defaults.
pub mod arms {
    pub const ARM_COUNT: usize = 4;
    pub const PITCH_DEG: f64 = 12.0;
    /// Radial half-width of an arm (pc).
    pub const HALF_WIDTH_PC: f64 = 300.0;
    /// Half-width of the local azimuth search window.
    pub const WINDOW_HALF_WIDTH_DEG: f64 = 6.0;
    /// Grid points in the azimuth window (odd, so the point's own azimuth is sampled).
    pub const WINDOW_STEPS: usize = 121;
}

/// Shell and sampling defaults.
pub mod shell {
    pub const INNER_RADIUS_LY: f64 = 16408.70211;
    pub const OUTER_RADIUS_LY: f64 = 16428.70211;
    pub const SAMPLE_COUNT: usize = 100_000;
    pub const CHUNK_SIZE: usize = 8192;
    pub const SEED: u64 = 42;
}

/// Drake-equation defaults.
pub mod drake {
    /// Fraction of stars with planets.
    pub const F_P: f64 = 1.0;
    /// Potentially habitable planets per star.
    pub const N_E: f64 = 0.1;
    /// G-type main-sequence lifetime (years).
    pub const T_STAR_YEARS: f64 = 1.0e10;

    pub const F_L_RANGE: (f64, f64) = (1.0e-6, 1.0);
    pub const F_I_RANGE: (f64, f64) = (1.0e-6, 1.0);
    pub const F_C_RANGE: (f64, f64) = (0.01, 1.0);
    pub const L_RANGE_YEARS: (f64, f64) = (1.0e2, 1.0e8);

    pub const SAMPLE_COUNT: usize = 100_000;

    /// Reported quantile levels.
    pub const QUANTILE_LEVELS: [f64; 9] = [0.001, 0.01, 0.05, 0.16, 0.5, 0.84, 0.95, 0.99, 0.999];
}
