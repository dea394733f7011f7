//! Google Mobile Ads: banner, interstitial and rewarded through either AdMob
//! or Ad Manager, configured as `appID|adUnitID[|sizeIndex]`.
//!
//! The literal application ID `admanager` selects the Ad Manager channel,
//! which needs no SDK initialization.

use std::sync::Arc;

use error_stack::Report;
use serde::Serialize;

use super::{base_request, enabled, AdNetwork, STANDARD_BANNER};
use crate::consent::{ConsentSignal, ResolvedConsent};
use crate::error::MediationError;
use crate::events::{LoadFailureKind, RewardSignal, VendorCallback, VendorEvent};
use crate::request::{
    AdFormat, AdRequestContext, AdapterConfig, BannerSize, ConfigGrammar, VendorRequest,
};
use crate::settings::Settings;

pub const NAME: &str = "google";

/// `AdRequest.ERROR_CODE_NO_FILL`.
pub const NO_FILL: i64 = 3;

/// Application ID selecting the Ad Manager channel.
pub const AD_MANAGER_KEY: &str = "admanager";

pub const SMART_BANNER: BannerSize = BannerSize::new("SMART_BANNER", 0, 0);

const BANNER_SIZES: &[BannerSize] = &[
    STANDARD_BANNER,
    BannerSize::new("FULL_BANNER", 468, 60),
    BannerSize::new("LARGE_BANNER", 320, 100),
    BannerSize::new("LEADERBOARD", 728, 90),
    BannerSize::new("MEDIUM_RECTANGLE", 300, 250),
];

const INDEXED_BANNER_SIZES: &[BannerSize] = &[
    STANDARD_BANNER,
    BannerSize::new("MEDIUM_RECTANGLE", 300, 250),
    BannerSize::new("LEADERBOARD", 728, 90),
    BannerSize::new("LARGE_BANNER", 320, 100),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    AdMob,
    AdManager,
}

impl Channel {
    #[must_use]
    pub fn from_app_id(app_id: &str) -> Self {
        if app_id == AD_MANAGER_KEY {
            Self::AdManager
        } else {
            Self::AdMob
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdMob => "admob",
            Self::AdManager => "admanager",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Google;

impl AdNetwork for Google {
    fn name(&self) -> &'static str {
        NAME
    }

    fn grammar(&self) -> ConfigGrammar {
        ConfigGrammar {
            delimiter: '|',
            required: &["appID", "adUnitID"],
            optional: &["sizeIndex"],
        }
    }

    fn formats(&self) -> &'static [AdFormat] {
        &[AdFormat::Banner, AdFormat::Interstitial, AdFormat::Rewarded]
    }

    /// Only a binary decision is accepted, as the request-level `npa` extra.
    fn consent_signal(&self, consent: &ResolvedConsent) -> ConsentSignal {
        ConsentSignal::non_personalized(consent)
    }

    fn init_identity(&self, config: &AdapterConfig) -> Option<String> {
        match Channel::from_app_id(config.identity()) {
            Channel::AdMob => Some(config.identity().to_string()),
            Channel::AdManager => None,
        }
    }

    fn displays_on_ui_thread(&self) -> bool {
        true
    }

    fn banner_sizes(&self) -> &'static [BannerSize] {
        BANNER_SIZES
    }

    fn default_banner_size(&self) -> BannerSize {
        SMART_BANNER
    }

    fn size_index_field(&self) -> Option<&'static str> {
        Some("sizeIndex")
    }

    fn indexed_banner_sizes(&self) -> &'static [BannerSize] {
        INDEXED_BANNER_SIZES
    }

    fn build_request(
        &self,
        ctx: &AdRequestContext,
    ) -> Result<VendorRequest, Report<MediationError>> {
        let mut request = base_request(self, ctx);
        let channel = Channel::from_app_id(ctx.config.identity());
        request
            .extras
            .insert("channel".to_string(), channel.as_str().to_string());
        if matches!(request.consent, ConsentSignal::NonPersonalized { npa: true }) {
            request.extras.insert("npa".to_string(), "1".to_string());
        }
        Ok(request)
    }
}

/// `AdListener` (banner) and `FullScreenContentCallback` family callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum GoogleCallback {
    AdLoaded,
    AdFailedToLoad { code: i64, message: String },
    /// Banner opened an overlay after a tap.
    AdOpened,
    AdClicked,
    AdImpression,
    AdClosed,
    ShowedFullScreenContent,
    FailedToShowFullScreenContent { message: String },
    DismissedFullScreenContent,
    FullScreenClicked,
    UserEarnedReward { reward_type: String, amount: i64 },
}

impl VendorCallback for GoogleCallback {
    #[allow(clippy::cast_precision_loss)]
    fn into_events(self) -> Vec<VendorEvent> {
        match self {
            Self::AdLoaded => vec![VendorEvent::loaded()],
            Self::AdFailedToLoad { code, message } => vec![VendorEvent::load_failure(
                LoadFailureKind::from_code(code, &[NO_FILL]),
                format!("Google Mobile Ads failed to load (code {code}): {message}"),
            )],
            // Banner clicks surface as the overlay opening.
            Self::AdOpened | Self::FullScreenClicked => vec![VendorEvent::Clicked],
            Self::AdClicked | Self::AdImpression => Vec::new(),
            Self::AdClosed | Self::DismissedFullScreenContent => vec![VendorEvent::Closed],
            Self::ShowedFullScreenContent => vec![VendorEvent::Shown],
            Self::FailedToShowFullScreenContent { message } => {
                vec![VendorEvent::DisplayFailed { message }]
            }
            Self::UserEarnedReward {
                reward_type,
                amount,
            } => vec![VendorEvent::Rewarded {
                reward: RewardSignal::from_amount(Some(&reward_type), amount as f64),
            }],
        }
    }
}

#[must_use]
pub fn register(settings: &Settings) -> Option<Arc<dyn AdNetwork>> {
    enabled(settings, Google)
}
