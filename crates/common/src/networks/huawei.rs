//! Huawei Ads Kit: banner, interstitial and rewarded, configured as
//! `appID|adUnitID[|sizeIndex]`.

use std::sync::Arc;

use error_stack::Report;

use super::{base_request, enabled, AdNetwork};
use crate::consent::{ConsentSignal, ResolvedConsent};
use crate::error::MediationError;
use crate::events::{LoadFailureKind, RewardSignal, VendorCallback, VendorEvent};
use crate::request::{AdFormat, AdRequestContext, BannerSize, ConfigGrammar, VendorRequest};
use crate::settings::Settings;

pub const NAME: &str = "huawei";

/// `AdParam.ErrorCode.NO_AD`.
pub const NO_AD: i64 = 3;

const BANNER_SIZE_320_50: BannerSize = BannerSize::new("BANNER_SIZE_320_50", 320, 50);

const INDEXED_BANNER_SIZES: &[BannerSize] = &[
    BANNER_SIZE_320_50,
    BannerSize::new("BANNER_SIZE_300_250", 300, 250),
    BannerSize::new("BANNER_SIZE_728_90", 728, 90),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct Huawei;

impl AdNetwork for Huawei {
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

    fn consent_signal(&self, consent: &ResolvedConsent) -> ConsentSignal {
        ConsentSignal::non_personalized(consent)
    }

    fn displays_on_ui_thread(&self) -> bool {
        true
    }

    fn default_banner_size(&self) -> BannerSize {
        BANNER_SIZE_320_50
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
        if matches!(request.consent, ConsentSignal::NonPersonalized { npa: true }) {
            request
                .extras
                .insert("nonPersonalizedAd".to_string(), "1".to_string());
        }
        Ok(request)
    }
}

/// `AdListener` and `RewardAdListener` callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum HuaweiCallback {
    AdLoaded,
    AdFailedToLoad { code: i64 },
    AdOpened,
    AdLeftApplication,
    AdClosed,
    RewardAdStarted,
    RewardAdCompleted,
    Rewarded { name: String, amount: i64 },
}

impl VendorCallback for HuaweiCallback {
    #[allow(clippy::cast_precision_loss)]
    fn into_events(self) -> Vec<VendorEvent> {
        match self {
            Self::AdLoaded => vec![VendorEvent::loaded()],
            Self::AdFailedToLoad { code } => vec![VendorEvent::load_failure(
                LoadFailureKind::from_code(code, &[NO_AD]),
                format!("Huawei ads loading error code {code}"),
            )],
            Self::AdOpened => vec![VendorEvent::Shown],
            Self::AdLeftApplication => vec![VendorEvent::Clicked],
            Self::AdClosed => vec![VendorEvent::Closed],
            Self::RewardAdStarted | Self::RewardAdCompleted => Vec::new(),
            Self::Rewarded { name, amount } => vec![VendorEvent::Rewarded {
                reward: RewardSignal::from_amount(Some(&name), amount as f64),
            }],
        }
    }
}

#[must_use]
pub fn register(settings: &Settings) -> Option<Arc<dyn AdNetwork>> {
    enabled(settings, Huawei)
}
