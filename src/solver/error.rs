use std::string::String;

/// Engine errors.
#[derive(Debug, Clone, PartialEq)]
pub enum OptError
{
    /// Invalid parameter detected by a state check.
    Config(String),
    /// Unknown label or malformed parameter string during release/capture.
    Serialization(String),
    /// Quasi-Newton operator applied with inconsistent stored history.
    InvalidHistory(&'static str),
    /// An external operator was selected but not provided.
    UnsupportedOperator(&'static str),
    /// A reserved algorithm variant without an implementation.
    NotImplemented(&'static str),
    /// Failure propagated unchanged from a user oracle.
    Oracle(String),
    /// The status sink refused a write.
    Log,
}

impl core::fmt::Display for OptError
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result
    {
        match self {
            OptError::Config(s) => write!(f, "Config: {}", s),
            OptError::Serialization(s) => write!(f, "Serialization: {}", s),
            OptError::InvalidHistory(s) => write!(f, "InvalidHistory: {}", s),
            OptError::UnsupportedOperator(s) => write!(f, "UnsupportedOperator: {}", s),
            OptError::NotImplemented(s) => write!(f, "NotImplemented: {}", s),
            OptError::Oracle(s) => write!(f, "Oracle: {}", s),
            OptError::Log => write!(f, "Log: the status sink refused a write"),
        }
    }
}

impl std::error::Error for OptError {}
