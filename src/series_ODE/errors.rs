use crate::symbolic::symbolic_canonical::FixedPointError;
use std::fmt;

/// Engine defects: a state the algorithm should never reach on any input.
#[derive(Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    /// canonicalization did not reach a canonical fixed point within its pass bound
    CanonicalFixedPoint { expr: String, passes: usize },
    /// a substitution pass left a derivative node or a dependent function in the value
    SubstitutionArtifact { residue: String },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::CanonicalFixedPoint { expr, passes } => write!(
                f,
                "canonical fixed point not reached for {} after {} passes",
                expr, passes
            ),
            InvariantViolation::SubstitutionArtifact { residue } => {
                write!(f, "unresolved derivative residue after substitution: {}", residue)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesError {
    /// malformed input, reported before any computation
    InputValidation(String),
    /// the highest derivative order could not be determined
    Detection(String),
    /// the highest derivative cannot be isolated algebraically
    Isolation { equation: String, reason: String },
    /// engine defect, never an input problem
    InternalInvariant(InvariantViolation),
}

impl SeriesError {
    pub fn input(msg: impl Into<String>) -> Self {
        SeriesError::InputValidation(msg.into())
    }

    /// true for errors caused by a bug in the engine rather than by the input
    pub fn is_defect(&self) -> bool {
        matches!(self, SeriesError::InternalInvariant(_))
    }
}

impl fmt::Display for SeriesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesError::InputValidation(msg) => write!(f, "Invalid input: {}", msg),
            SeriesError::Detection(msg) => write!(f, "Order detection failed: {}", msg),
            SeriesError::Isolation { equation, reason } => write!(
                f,
                "Cannot isolate the highest derivative in {}: {}. The equation must be explicit in the highest derivative",
                equation, reason
            ),
            SeriesError::InternalInvariant(violation) => {
                write!(f, "Internal defect: {}", violation)
            }
        }
    }
}

impl std::error::Error for SeriesError {}

impl From<FixedPointError> for SeriesError {
    fn from(err: FixedPointError) -> Self {
        SeriesError::InternalInvariant(InvariantViolation::CanonicalFixedPoint {
            expr: err.expr,
            passes: err.passes,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    InvalidValue { key: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "Cannot read configuration: {}", err),
            ConfigError::Parse(err) => write!(f, "Cannot parse configuration: {}", err),
            ConfigError::InvalidValue { key, reason } => {
                write!(f, "Invalid value for '{}': {}", key, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err)
    }
}
