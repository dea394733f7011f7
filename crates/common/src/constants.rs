/// Client parameter carrying the mediator's GDPR applicability (`"true"` / `"false"`).
pub const PARAM_GDPR_APPLIES: &str = "gdprapplies";
/// Client parameter carrying the raw TCF consent string, forwarded untouched.
pub const PARAM_GDPR_CONSENT: &str = "gdpr_consent";
pub const PARAM_AD_VIEW_WIDTH: &str = "adViewWidth";
pub const PARAM_AD_VIEW_HEIGHT: &str = "adViewHeight";

/// Default key of the stored consent value in the host's consent storage.
pub const DEFAULT_CONSENT_STORAGE_KEY: &str = "Smart_advertisingConsentStatus";
/// Stored consent value meaning "granted"; anything else is denied.
pub const CONSENT_GRANTED_VALUE: &str = "1";

/// Environment prefix for settings overrides, e.g. `AD_MEDIATION__DISPLAY__SHOW_TIMEOUT_MS`.
pub const ENV_PREFIX: &str = "AD_MEDIATION";

/// Failure message of `show()` outside the loaded state.
pub const NOTHING_LOADED: &str = "nothing loaded";

/// Name the adapters report to vendors that ask for the mediation partner.
pub const MEDIATION_PARTNER_NAME: &str = "ad-mediation";
