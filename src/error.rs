//! Unified error types for the gpionode firmware core.
//!
//! Follows embedded best practice: a single `Error` enum that every subsystem
//! can convert into, keeping the request boundary's error handling uniform.
//! Structural errors during configuration load are fatal to startup; every
//! other variant is recovered at the request boundary and returned to the
//! caller as data.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the core funnels into this type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration load, lookup, or persistence failed.
    Config(ConfigError),
    /// A candidate calibration spec was rejected.
    Validation(ValidationError),
    /// The document store could not be read or written.
    Store(StoreError),
    /// An actuator command carried invalid parameters.
    Actuator(ActuatorError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Validation(e) => write!(f, "calibration: {e}"),
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required top-level section is absent from the document.
    MissingSection(&'static str),
    /// An entry is missing a required field or the field has the wrong type.
    InvalidField { entry: String, field: &'static str },
    /// Two descriptors declare the same GPIO pin.
    DuplicatePin { pin: u8, entry: String },
    /// An embedded calibration block failed validation at load time,
    /// or a calibration update was rejected.
    InvalidCalibration {
        sensor: String,
        source: ValidationError,
    },
    /// No sensor is bound under this id.
    UnknownSensor(String),
    /// No LED is bound under this id.
    UnknownLed(String),
    /// No motor is bound under this id.
    UnknownMotor(String),
    /// Persistence failed. When returned from a calibration update the
    /// in-memory spec has already been replaced (memory is authoritative).
    Store(StoreError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSection(s) => write!(f, "missing section '{s}'"),
            Self::InvalidField { entry, field } => {
                write!(f, "entry '{entry}': missing or invalid field '{field}'")
            }
            Self::DuplicatePin { pin, entry } => {
                write!(f, "entry '{entry}': pin {pin} is already bound")
            }
            Self::InvalidCalibration { sensor, source } => {
                write!(f, "sensor '{sensor}': {source}")
            }
            Self::UnknownSensor(id) => write!(f, "unknown sensor '{id}'"),
            Self::UnknownLed(id) => write!(f, "unknown LED '{id}'"),
            Self::UnknownMotor(id) => write!(f, "unknown motor '{id}'"),
            Self::Store(e) => write!(f, "persistence failed: {e}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StoreError> for ConfigError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Calibration validation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The `type` tag is neither "linear" nor "polynomial".
    UnknownType(String),
    /// A required parameter is absent (or not a number / number array).
    MissingParameter(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType(tag) => write!(f, "unknown calibration type '{tag}'"),
            Self::MissingParameter(p) => write!(f, "missing parameter '{p}'"),
        }
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

// ---------------------------------------------------------------------------
// Document store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The persisted document could not be read or parsed.
    ReadFailed,
    /// The document could not be written out whole.
    WriteFailed,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorError {
    /// Direction token is neither "cw" nor "ccw".
    InvalidDirection(String),
    /// Step count must be strictly positive.
    InvalidSteps(i64),
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDirection(tok) => write!(f, "invalid direction '{tok}'"),
            Self::InvalidSteps(n) => write!(f, "invalid step count {n}"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
