//! MoPub: banner, interstitial and rewarded video, configured with the ad
//! unit ID alone.
//!
//! MoPub ships its own consent dialog; when the user has not decided yet it
//! is presented at the next full-screen show so it never lands underneath
//! the ad.

use std::sync::Arc;

use super::{enabled, AdNetwork};
use crate::consent::{ConsentSignal, GdprApplies, ResolvedConsent};
use crate::events::{LoadFailureKind, RewardSignal, VendorCallback, VendorEvent};
use crate::request::{AdFormat, AdapterConfig, ConfigGrammar};
use crate::settings::Settings;

pub const NAME: &str = "mopub";

#[derive(Debug, Clone, Copy, Default)]
pub struct MoPub;

impl AdNetwork for MoPub {
    fn name(&self) -> &'static str {
        NAME
    }

    fn grammar(&self) -> ConfigGrammar {
        ConfigGrammar {
            delimiter: '/',
            required: &["adUnitID"],
            optional: &[],
        }
    }

    fn formats(&self) -> &'static [AdFormat] {
        &[AdFormat::Banner, AdFormat::Interstitial, AdFormat::Rewarded]
    }

    /// Grant or revoke through the personal information manager.
    fn consent_signal(&self, consent: &ResolvedConsent) -> ConsentSignal {
        ConsentSignal::accept_decline(consent)
    }

    fn placement(&self, config: &AdapterConfig) -> Option<String> {
        Some(config.identity().to_string())
    }

    fn requires_activity(&self, format: AdFormat) -> bool {
        format.is_full_screen()
    }

    fn needs_consent_prompt(&self, consent: &ResolvedConsent) -> bool {
        consent.gdpr_applies != GdprApplies::No && !consent.has_stored_preference()
    }
}

/// `MoPubErrorCode` values surfaced on load and playback failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoPubErrorCode {
    NoFill,
    NetworkNoFill,
    NetworkTimeout,
    NetworkInvalidState,
    ServerError,
    InternalError,
    VideoPlaybackError,
    Unspecified,
}

impl MoPubErrorCode {
    #[must_use]
    pub fn load_failure_kind(self) -> LoadFailureKind {
        match self {
            Self::NoFill | Self::NetworkNoFill => LoadFailureKind::NoFill,
            _ => LoadFailureKind::Network,
        }
    }
}

/// Banner, interstitial and rewarded video listener callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum MoPubCallback {
    Loaded,
    LoadFailed(MoPubErrorCode),
    BannerExpanded,
    BannerCollapsed,
    InterstitialShown,
    RewardedVideoStarted,
    PlaybackError(MoPubErrorCode),
    Clicked,
    Dismissed,
    RewardedVideoCompleted { label: String, amount: i64 },
}

impl VendorCallback for MoPubCallback {
    #[allow(clippy::cast_precision_loss)]
    fn into_events(self) -> Vec<VendorEvent> {
        match self {
            Self::Loaded => vec![VendorEvent::loaded()],
            Self::LoadFailed(code) => vec![VendorEvent::load_failure(
                code.load_failure_kind(),
                format!("MoPub load failed: {code:?}"),
            )],
            Self::BannerExpanded => Vec::new(),
            Self::BannerCollapsed | Self::Dismissed => vec![VendorEvent::Closed],
            Self::InterstitialShown | Self::RewardedVideoStarted => vec![VendorEvent::Shown],
            Self::PlaybackError(code) => vec![VendorEvent::DisplayFailed {
                message: format!("MoPub playback error: {code:?}"),
            }],
            Self::Clicked => vec![VendorEvent::Clicked],
            Self::RewardedVideoCompleted { label, amount } => vec![VendorEvent::Rewarded {
                reward: RewardSignal::from_amount(Some(&label), amount as f64),
            }],
        }
    }
}

#[must_use]
pub fn register(settings: &Settings) -> Option<Arc<dyn AdNetwork>> {
    enabled(settings, MoPub)
}
