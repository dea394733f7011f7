//! AppLovin: interstitial, rewarded and native ads, configured as `sdkKey[/zoneID]`.

use std::sync::Arc;

use super::{enabled, AdNetwork};
use crate::consent::{ConsentSignal, ResolvedConsent};
use crate::events::{AdCreative, LoadFailureKind, RewardSignal, VendorCallback, VendorEvent};
use crate::native::{NativeAdContent, NativeAssets};
use crate::request::{AdFormat, ConfigGrammar};
use crate::settings::Settings;

pub const NAME: &str = "applovin";

/// `AppLovinErrorCodes.NO_FILL`.
pub const NO_FILL: i64 = 204;

#[derive(Debug, Clone, Copy, Default)]
pub struct AppLovin;

impl AdNetwork for AppLovin {
    fn name(&self) -> &'static str {
        NAME
    }

    fn grammar(&self) -> ConfigGrammar {
        ConfigGrammar {
            delimiter: '/',
            required: &["sdkKey"],
            optional: &["zoneID"],
        }
    }

    fn formats(&self) -> &'static [AdFormat] {
        &[AdFormat::Interstitial, AdFormat::Rewarded, AdFormat::Native]
    }

    fn consent_signal(&self, consent: &ResolvedConsent) -> ConsentSignal {
        ConsentSignal::has_user_consent(consent)
    }
}

/// AppLovin ad load, display, video and reward listener callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum AppLovinCallback {
    AdReceived,
    FailedToReceiveAd {
        error_code: i64,
    },
    AdDisplayed,
    AdHidden,
    AdClicked,
    VideoPlaybackBegan,
    VideoPlaybackEnded {
        percentage: f64,
        fully_watched: bool,
    },
    /// Server-side verified reward; `currency` and `amount` come from the response map.
    UserRewardVerified {
        currency: Option<String>,
        amount: Option<String>,
    },
    UserOverQuota,
    UserRewardRejected,
    ValidationRequestFailed {
        response_code: i64,
    },
    UserDeclinedToViewAd,
    NativeAdsLoaded(NativeAssets),
    NativeAdsFailedToLoad {
        error_code: i64,
    },
}

fn load_failure(error_code: i64) -> VendorEvent {
    VendorEvent::load_failure(
        LoadFailureKind::from_code(error_code, &[NO_FILL]),
        format!("AppLovin failed to receive ad (error {error_code})"),
    )
}

impl VendorCallback for AppLovinCallback {
    fn into_events(self) -> Vec<VendorEvent> {
        match self {
            Self::AdReceived => vec![VendorEvent::loaded()],
            Self::FailedToReceiveAd { error_code } | Self::NativeAdsFailedToLoad { error_code } => {
                vec![load_failure(error_code)]
            }
            Self::AdDisplayed => vec![VendorEvent::Shown],
            Self::AdHidden => vec![VendorEvent::Closed],
            Self::AdClicked => vec![VendorEvent::Clicked],
            Self::UserRewardVerified { currency, amount } => vec![VendorEvent::Rewarded {
                reward: RewardSignal::parse(currency.as_deref(), amount.as_deref()),
            }],
            Self::NativeAdsLoaded(assets) => vec![VendorEvent::Loaded {
                creative: Some(AdCreative::Native(NativeAdContent::from(assets))),
            }],
            Self::VideoPlaybackBegan
            | Self::VideoPlaybackEnded { .. }
            | Self::UserOverQuota
            | Self::UserRewardRejected
            | Self::ValidationRequestFailed { .. }
            | Self::UserDeclinedToViewAd => Vec::new(),
        }
    }
}

#[must_use]
pub fn register(settings: &Settings) -> Option<Arc<dyn AdNetwork>> {
    enabled(settings, AppLovin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_fill_code_table() {
        assert!(matches!(
            AppLovinCallback::FailedToReceiveAd { error_code: 204 }.into_events().as_slice(),
            [VendorEvent::NoFill { .. }]
        ));
        assert!(matches!(
            AppLovinCallback::FailedToReceiveAd { error_code: -1009 }.into_events().as_slice(),
            [VendorEvent::NetworkError { .. }]
        ));
    }

    #[test]
    fn test_verified_reward_payload() {
        let events = AppLovinCallback::UserRewardVerified {
            currency: Some("gold".to_string()),
            amount: Some("5.00".to_string()),
        }
        .into_events();
        assert_eq!(
            events,
            vec![VendorEvent::Rewarded {
                reward: RewardSignal::from_amount(Some("gold"), 5.0)
            }]
        );
    }

    #[test]
    fn test_unparseable_reward_amount_omits_payload() {
        let events = AppLovinCallback::UserRewardVerified {
            currency: Some("gold".to_string()),
            amount: Some("five".to_string()),
        }
        .into_events();
        assert_eq!(events, vec![VendorEvent::Rewarded { reward: None }]);
    }

    #[test]
    fn test_native_assets_mapped_with_defaults() {
        let events = AppLovinCallback::NativeAdsLoaded(NativeAssets {
            title: Some("Play now".to_string()),
            rating: Some(4.0),
            ..NativeAssets::default()
        })
        .into_events();
        let [VendorEvent::Loaded {
            creative: Some(AdCreative::Native(content)),
        }] = events.as_slice()
        else {
            unreachable!("expected a native load, got {:?}", events);
        };
        assert_eq!(content.title, "Play now");
        assert_eq!(content.call_to_action, "");
    }
}
