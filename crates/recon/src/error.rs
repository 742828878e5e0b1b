use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Tolerance, threshold, or weight outside its valid range.
    /// Rejected before a run starts.
    ConfigValidation(String),
    /// Caller-requested cancellation between passes. No partial
    /// results are returned.
    Aborted,
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Aborted => write!(f, "run aborted before completion"),
        }
    }
}

impl std::error::Error for ReconError {}
