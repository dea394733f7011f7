//! Facebook Audience Network: banner, interstitial and rewarded video,
//! configured with a bare placement ID.

use std::sync::Arc;

use super::{enabled, AdNetwork};
use crate::consent::{ConsentSignal, ResolvedConsent};
use crate::constants::MEDIATION_PARTNER_NAME;
use crate::events::{LoadFailureKind, VendorCallback, VendorEvent};
use crate::request::{AdFormat, AdapterConfig, BannerSize, ConfigGrammar};
use crate::settings::Settings;

pub const NAME: &str = "facebook";

/// `AdError.NO_FILL_ERROR_CODE`.
pub const NO_FILL: i64 = 1001;

const BANNER_HEIGHT_50: BannerSize = BannerSize::new("BANNER_HEIGHT_50", 0, 50);

const BANNER_SIZES: &[BannerSize] = &[
    BANNER_HEIGHT_50,
    BannerSize::new("BANNER_HEIGHT_90", 0, 90),
    BannerSize::new("RECTANGLE_HEIGHT_250", 300, 250),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct Facebook;

impl AdNetwork for Facebook {
    fn name(&self) -> &'static str {
        NAME
    }

    fn grammar(&self) -> ConfigGrammar {
        ConfigGrammar {
            delimiter: '/',
            required: &["placementID"],
            optional: &[],
        }
    }

    fn formats(&self) -> &'static [AdFormat] {
        &[AdFormat::Banner, AdFormat::Interstitial, AdFormat::Rewarded]
    }

    fn consent_signal(&self, _consent: &ResolvedConsent) -> ConsentSignal {
        ConsentSignal::NotForwarded
    }

    /// The one-time setup only registers the mediation service name.
    fn init_identity(&self, _config: &AdapterConfig) -> Option<String> {
        Some(MEDIATION_PARTNER_NAME.to_string())
    }

    fn placement(&self, config: &AdapterConfig) -> Option<String> {
        Some(config.identity().to_string())
    }

    fn banner_sizes(&self) -> &'static [BannerSize] {
        BANNER_SIZES
    }

    fn default_banner_size(&self) -> BannerSize {
        BANNER_HEIGHT_50
    }
}

/// Audience Network `AdListener` family callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum FacebookCallback {
    AdLoaded,
    Error { code: i64, message: String },
    AdClicked,
    LoggingImpression,
    InterstitialDisplayed,
    InterstitialDismissed,
    RewardedVideoCompleted,
    RewardedVideoClosed,
}

impl VendorCallback for FacebookCallback {
    fn into_events(self) -> Vec<VendorEvent> {
        match self {
            Self::AdLoaded => vec![VendorEvent::loaded()],
            Self::Error { code, message } => vec![VendorEvent::Failed {
                kind: LoadFailureKind::from_code(code, &[NO_FILL]),
                message,
            }],
            Self::AdClicked => vec![VendorEvent::Clicked],
            Self::LoggingImpression | Self::InterstitialDisplayed => vec![VendorEvent::Shown],
            Self::InterstitialDismissed | Self::RewardedVideoClosed => vec![VendorEvent::Closed],
            Self::RewardedVideoCompleted => vec![VendorEvent::RewardOnCompletion { reward: None }],
        }
    }
}

#[must_use]
pub fn register(settings: &Settings) -> Option<Arc<dyn AdNetwork>> {
    enabled(settings, Facebook)
}
