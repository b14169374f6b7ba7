//! Error types for model configuration and the I/O-facing helpers.
//!
//! Configuration problems are collected up front and rejected before any
//! sampling starts. Arm-table problems are not errors at all: the loader
//! falls back to parametric arms (see [`crate::arms::load_arms`]).

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// A single configuration problem.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("shell inner radius must be positive, got {0}")]
    NonPositiveInnerRadius(f64),

    #[error("shell inner radius {inner} must be below outer radius {outer}")]
    ShellRadiiOrder { inner: f64, outer: f64 },

    #[error("{name} must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("sample count must be at least 1")]
    ZeroSamples,

    #[error("chunk size must be at least 1")]
    ZeroChunkSize,

    #[error("arm count must be at least 1")]
    ZeroArms,

    #[error("azimuth window needs an odd number of steps, got {0}")]
    EvenWindowSteps(usize),

    #[error("azimuth window half-width must lie in (0, 180] degrees, got {0}")]
    WindowOutOfRange(f64),

    #[error("prior for {name} has invalid bounds [{low}, {high}]")]
    InvalidPriorBounds {
        name: &'static str,
        low: f64,
        high: f64,
    },

    #[error("{name} is a fraction and must lie in [0, 1], got [{low}, {high}]")]
    FractionOutOfRange {
        name: &'static str,
        low: f64,
        high: f64,
    },

    #[error("largest possible per-star probability is {0}, must be below 1")]
    ProbabilityNotBelowOne(f64),

    #[error("convergence study needs at least 2 repeats, got {0}")]
    TooFewRepeats(usize),

    #[error("population for the Drake stage must be positive and finite, got {0}")]
    InvalidPopulation(f64),
}

/// Error type for model entry points.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("invalid configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ConfigError>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("arm table line {line}: {field} is not a number ({value:?})")]
    ArmTable {
        line: u64,
        field: &'static str,
        value: String,
    },

    #[error("results record has neither N_expected_arms nor N_expected_shell")]
    MissingPopulation,

    #[error("{densities} densities but {memberships} membership flags")]
    LengthMismatch { densities: usize, memberships: usize },
}

impl From<ConfigError> for ModelError {
    fn from(e: ConfigError) -> Self {
        ModelError::InvalidConfig(vec![e])
    }
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Turn a list of validation problems into a result.
pub fn check(errors: Vec<ConfigError>) -> ModelResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ModelError::InvalidConfig(errors))
    }
}

/// Push a `FractionOutOfRange` error unless `[low, high]` lies in `[0, 1]`.
pub(crate) fn require_fraction(errors: &mut Vec<ConfigError>, name: &'static str, low: f64, high: f64) {
    if !((0.0..=1.0).contains(&low) && (0.0..=1.0).contains(&high)) {
        errors.push(ConfigError::FractionOutOfRange { name, low, high });
    }
}

/// Push a `ProbabilityNotBelowOne` error unless `0 <= p_max < 1`.
pub(crate) fn require_probability(errors: &mut Vec<ConfigError>, p_max: f64) {
    if !(p_max >= 0.0 && p_max < 1.0) {
        errors.push(ConfigError::ProbabilityNotBelowOne(p_max));
    }
}

/// Push a `NonPositive` error unless `value` is positive and finite.
pub(crate) fn require_positive(errors: &mut Vec<ConfigError>, name: &'static str, value: f64) {
    if !(value.is_finite() && value > 0.0) {
        errors.push(ConfigError::NonPositive { name, value });
    }
}
