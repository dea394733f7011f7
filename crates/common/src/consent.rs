//! GDPR consent resolution.
//!
//! The mediator tells us whether GDPR applies through a client parameter, and
//! the host app stores the user's binary decision under a well-known key.
//! [`resolve`] combines the two; [`ConsentSignal`] is the per-vendor shape the
//! decision is delivered in.

use serde::Serialize;

use crate::consent_store::ConsentStore;
use crate::constants::CONSENT_GRANTED_VALUE;
use crate::request::ClientParameters;
use crate::settings::ConsentSettings;

/// GDPR applicability as reported by the mediator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GdprApplies {
    Yes,
    No,
    Unknown,
}

impl GdprApplies {
    /// Case-insensitive `"true"` / `"false"`; anything else is unknown.
    #[must_use]
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("true") => Self::Yes,
            Some(value) if value.eq_ignore_ascii_case("false") => Self::No,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn as_option(self) -> Option<bool> {
        match self {
            Self::Yes => Some(true),
            Self::No => Some(false),
            Self::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentDecision {
    Granted,
    Denied,
}

impl ConsentDecision {
    #[must_use]
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

/// Resolves the consent decision.
///
/// GDPR explicitly not applying grants regardless of storage. Otherwise consent
/// is granted only when the stored value is exactly `"1"`; missing data denies.
#[must_use]
pub fn resolve(gdpr_applies: Option<bool>, stored_consent: Option<&str>) -> ConsentDecision {
    match (gdpr_applies, stored_consent) {
        (Some(false), _) => ConsentDecision::Granted,
        (_, Some(CONSENT_GRANTED_VALUE)) => ConsentDecision::Granted,
        _ => ConsentDecision::Denied,
    }
}

/// Tri-state outcome used by vendors that distinguish "does not apply".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentState {
    NotApplicable,
    Granted,
    Denied,
}

/// The raw consent inputs of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConsent {
    pub gdpr_applies: GdprApplies,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_consent: Option<String>,
    /// TCF consent string, forwarded verbatim to vendors that accept it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent_string: Option<String>,
}

impl ResolvedConsent {
    #[must_use]
    pub fn new(
        gdpr_applies: GdprApplies,
        stored_consent: Option<&str>,
        consent_string: Option<&str>,
    ) -> Self {
        Self {
            gdpr_applies,
            stored_consent: stored_consent.map(str::to_string),
            consent_string: consent_string.map(str::to_string),
        }
    }

    /// Reads applicability and the TCF string from the client parameters and
    /// the stored decision from the host store. A store read failure counts
    /// as "no stored decision".
    #[must_use]
    pub fn from_sources(
        parameters: &ClientParameters,
        store: &dyn ConsentStore,
        settings: &ConsentSettings,
    ) -> Self {
        let gdpr_applies =
            GdprApplies::from_param(parameters.get_string(&settings.gdpr_applies_param).as_deref());
        let stored_consent = match store.get(&settings.storage_key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!(
                    "Failed to read consent key '{}', treating as absent: {:?}",
                    settings.storage_key,
                    e
                );
                None
            }
        };
        Self {
            gdpr_applies,
            stored_consent,
            consent_string: parameters.get_string(&settings.consent_string_param),
        }
    }

    #[must_use]
    pub fn decision(&self) -> ConsentDecision {
        resolve(self.gdpr_applies.as_option(), self.stored_consent.as_deref())
    }

    #[must_use]
    pub fn is_granted(&self) -> bool {
        self.decision().is_granted()
    }

    #[must_use]
    pub fn state(&self) -> ConsentState {
        if self.gdpr_applies == GdprApplies::No {
            ConsentState::NotApplicable
        } else if self.is_granted() {
            ConsentState::Granted
        } else {
            ConsentState::Denied
        }
    }

    #[must_use]
    pub fn has_stored_preference(&self) -> bool {
        self.stored_consent.is_some()
    }
}

// ============================================================================
// Vendor shapes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptStatus {
    OptedIn,
    OptedOut,
}

/// Consent in the form a specific vendor SDK accepts it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ConsentSignal {
    /// Plain boolean "has user consent".
    HasUserConsent { granted: bool },
    /// JSON object handed to the vendor's consent update call.
    Json { value: serde_json::Value },
    /// `None` leaves the vendor's own default untouched.
    OptInOut { status: Option<OptStatus> },
    /// GDPR-required flag plus the stored value passed through.
    GdprRequired {
        required: bool,
        consent: Option<String>,
    },
    /// Subject-to-GDPR flag plus the TCF string passed through. `subject` is
    /// `None` when the mediator did not say.
    SubjectToGdpr {
        subject: Option<bool>,
        consent_string: Option<String>,
    },
    /// Request-level non-personalized-ads flag.
    NonPersonalized { npa: bool },
    /// Explicit accept / decline call.
    AcceptDecline { accepted: bool },
    /// The vendor takes no consent input.
    NotForwarded,
}

impl ConsentSignal {
    #[must_use]
    pub fn has_user_consent(consent: &ResolvedConsent) -> Self {
        Self::HasUserConsent {
            granted: consent.is_granted(),
        }
    }

    /// `{"gdpr": "1"|"0"|"", "gdpr_consent_available": <stored>|""}`.
    #[must_use]
    pub fn gdpr_json(consent: &ResolvedConsent) -> Self {
        let gdpr = match consent.gdpr_applies {
            GdprApplies::Yes => "1",
            GdprApplies::No => "0",
            GdprApplies::Unknown => "",
        };
        Self::Json {
            value: serde_json::json!({
                "gdpr": gdpr,
                "gdpr_consent_available": consent.stored_consent.as_deref().unwrap_or(""),
            }),
        }
    }

    /// Opted in or out only when GDPR may apply and the user has decided.
    #[must_use]
    pub fn opt_in_out(consent: &ResolvedConsent) -> Self {
        let status = match consent.state() {
            ConsentState::NotApplicable => None,
            _ if !consent.has_stored_preference() => None,
            ConsentState::Granted => Some(OptStatus::OptedIn),
            ConsentState::Denied => Some(OptStatus::OptedOut),
        };
        Self::OptInOut { status }
    }

    #[must_use]
    pub fn gdpr_required(consent: &ResolvedConsent) -> Self {
        Self::GdprRequired {
            required: consent.gdpr_applies != GdprApplies::No,
            consent: consent.stored_consent.clone(),
        }
    }

    #[must_use]
    pub fn subject_to_gdpr(consent: &ResolvedConsent) -> Self {
        let subject = match consent.gdpr_applies {
            GdprApplies::Yes => Some(true),
            GdprApplies::No => Some(false),
            GdprApplies::Unknown => None,
        };
        Self::SubjectToGdpr {
            subject,
            consent_string: consent.consent_string.clone(),
        }
    }

    #[must_use]
    pub fn non_personalized(consent: &ResolvedConsent) -> Self {
        Self::NonPersonalized {
            npa: !consent.is_granted(),
        }
    }

    #[must_use]
    pub fn accept_decline(consent: &ResolvedConsent) -> Self {
        Self::AcceptDecline {
            accepted: consent.is_granted(),
        }
    }
}
