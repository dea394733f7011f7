//! InMobi: banner, interstitial and rewarded, configured as
//! `accountID/placementID` with a numeric placement.

use std::sync::Arc;

use error_stack::Report;

use super::{base_request, enabled, AdNetwork, STANDARD_BANNER};
use crate::consent::{ConsentSignal, ResolvedConsent};
use crate::error::MediationError;
use crate::events::{LoadFailureKind, RewardSignal, VendorCallback, VendorEvent};
use crate::request::{AdFormat, AdRequestContext, BannerSize, ConfigGrammar, VendorRequest};
use crate::settings::Settings;

pub const NAME: &str = "inmobi";

/// Partner tag sent with every request.
pub const PARTNER_TAG: &str = "c_ad_mediation";

const BANNER_SIZES: &[BannerSize] = &[
    STANDARD_BANNER,
    BannerSize::new("MEDIUM_RECTANGLE", 300, 250),
    BannerSize::new("LEADERBOARD", 728, 90),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct InMobi;

impl AdNetwork for InMobi {
    fn name(&self) -> &'static str {
        NAME
    }

    fn grammar(&self) -> ConfigGrammar {
        ConfigGrammar {
            delimiter: '/',
            required: &["accountID", "placementID"],
            optional: &[],
        }
    }

    fn formats(&self) -> &'static [AdFormat] {
        &[AdFormat::Banner, AdFormat::Interstitial, AdFormat::Rewarded]
    }

    /// Not IAB compliant: applicability plus the stored binary value as JSON,
    /// sent at init and again with every request.
    fn consent_signal(&self, consent: &ResolvedConsent) -> ConsentSignal {
        ConsentSignal::gdpr_json(consent)
    }

    fn displays_on_ui_thread(&self) -> bool {
        true
    }

    fn banner_sizes(&self) -> &'static [BannerSize] {
        BANNER_SIZES
    }

    fn build_request(
        &self,
        ctx: &AdRequestContext,
    ) -> Result<VendorRequest, Report<MediationError>> {
        if ctx.config.numeric_field::<i64>("placementID").is_none() {
            return Err(Report::new(MediationError::Configuration {
                message: format!(
                    "InMobi placement ID must be numeric, got '{}'",
                    ctx.config.field("placementID").unwrap_or_default()
                ),
            }));
        }

        let mut request = base_request(self, ctx);
        request
            .extras
            .insert("tp".to_string(), PARTNER_TAG.to_string());
        request
            .extras
            .insert("tp-ver".to_string(), env!("CARGO_PKG_VERSION").to_string());
        Ok(request)
    }
}

/// `InMobiAdRequestStatus.StatusCode` values surfaced on load failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    NoFill,
    NetworkUnreachable,
    RequestTimedOut,
    RequestInvalid,
    InternalError,
    ServerError,
    EarlyRefreshRequest,
}

/// Banner and interstitial event listener callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum InMobiCallback {
    AdLoadSucceeded,
    AdLoadFailed { status: StatusCode, message: String },
    AdReceived,
    AdClicked,
    AdWillDisplay,
    AdDisplayed,
    AdDisplayFailed,
    AdDismissed,
    UserLeftApplication,
    /// Reward key-values as reported by the SDK.
    RewardsUnlocked(Vec<(String, String)>),
}

impl VendorCallback for InMobiCallback {
    fn into_events(self) -> Vec<VendorEvent> {
        match self {
            Self::AdLoadSucceeded => vec![VendorEvent::loaded()],
            Self::AdLoadFailed { status, message } => {
                let kind = if status == StatusCode::NoFill {
                    LoadFailureKind::NoFill
                } else {
                    LoadFailureKind::Network
                };
                vec![VendorEvent::load_failure(
                    kind,
                    format!("{message} ({status:?})"),
                )]
            }
            Self::AdReceived | Self::AdWillDisplay | Self::UserLeftApplication => Vec::new(),
            Self::AdClicked => vec![VendorEvent::Clicked],
            Self::AdDisplayed => vec![VendorEvent::Shown],
            Self::AdDisplayFailed => vec![VendorEvent::DisplayFailed {
                message: "no reason available".to_string(),
            }],
            Self::AdDismissed => vec![VendorEvent::Closed],
            Self::RewardsUnlocked(rewards) => {
                let reward = rewards
                    .iter()
                    .find_map(|(label, amount)| RewardSignal::parse(Some(label), Some(amount)));
                if reward.is_none() {
                    log::debug!("No parseable InMobi reward in {rewards:?}");
                }
                vec![VendorEvent::RewardOnCompletion { reward }]
            }
        }
    }
}

#[must_use]
pub fn register(settings: &Settings) -> Option<Arc<dyn AdNetwork>> {
    enabled(settings, InMobi)
}
