//! CLI error types.

use std::fmt;

use ad_mediation_common::error::MediationError;
use error_stack::Report;

#[derive(Debug)]
pub enum CliError {
    /// Configuration file error
    Config(String),
    /// Rejected by the mediation layer
    Mediation(String),
    /// Malformed command-line value
    Usage(String),
    /// IO error
    Io(std::io::Error),
    /// JSON parsing or encoding error
    Json(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Mediation(msg) => write!(f, "Mediation error: {}", msg),
            CliError::Usage(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Io(err) => write!(f, "IO error: {}", err),
            CliError::Json(msg) => write!(f, "JSON error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Json(err.to_string())
    }
}

impl From<Report<MediationError>> for CliError {
    fn from(report: Report<MediationError>) -> Self {
        CliError::Mediation(report.current_context().to_string())
    }
}
