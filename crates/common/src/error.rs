//! Error types for the mediation adapters.
//!
//! Every fallible operation returns `Result<T, Report<MediationError>>`; vendor
//! SDK failures are converted into one of these variants at the adapter
//! boundary and never escape as vendor-specific types.

use derive_more::{Display, Error};
use serde::Serialize;

/// Mediation error variants.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum MediationError {
    /// Malformed configuration string, unsupported format or wrong host context.
    #[display("Configuration error: {message}")]
    Configuration { message: String },

    /// The network answered but had no inventory for this request.
    #[display("No fill: {message}")]
    NoFill { message: String },

    /// Any other load failure reported by the vendor.
    #[display("Network error: {message}")]
    Network { message: String },

    /// The ad could not be displayed.
    #[display("Display error: {message}")]
    Display { message: String },

    /// The operation is not allowed in the adapter's current state.
    #[display("Invalid state: {message}")]
    InvalidState { message: String },

    /// Settings could not be loaded or failed validation.
    #[display("Settings error: {message}")]
    Settings { message: String },
}

/// Coarse classification used in logs and CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    NoFill,
    Network,
    Display,
    InvalidState,
    Settings,
}

impl MediationError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::NoFill { .. } => ErrorKind::NoFill,
            Self::Network { .. } => ErrorKind::Network,
            Self::Display { .. } => ErrorKind::Display,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Settings { .. } => ErrorKind::Settings,
        }
    }

    /// The bare message, without the variant prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Configuration { message }
            | Self::NoFill { message }
            | Self::Network { message }
            | Self::Display { message }
            | Self::InvalidState { message }
            | Self::Settings { message } => message,
        }
    }

    /// Value of the `isNoAd` flag reported with `adRequestFailed`.
    #[must_use]
    pub fn is_no_ad(&self) -> bool {
        matches!(self, Self::NoFill { .. })
    }
}
