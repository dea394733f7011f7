//! Vungle: banner, interstitial and rewarded video, configured as
//! `applicationID/placementID[/sizeIndex]`.

use std::sync::Arc;

use super::{enabled, AdNetwork, STANDARD_BANNER};
use crate::consent::{ConsentSignal, ResolvedConsent};
use crate::events::{LoadFailureKind, VendorCallback, VendorEvent};
use crate::request::{AdFormat, BannerSize, ConfigGrammar};
use crate::settings::Settings;

pub const NAME: &str = "vungle";

/// `VungleException.NO_SERVE`.
pub const NO_SERVE: i64 = 1;

const INDEXED_BANNER_SIZES: &[BannerSize] = &[
    STANDARD_BANNER,
    BannerSize::new("BANNER_SHORT", 300, 50),
    BannerSize::new("BANNER_LEADERBOARD", 728, 90),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct Vungle;

impl AdNetwork for Vungle {
    fn name(&self) -> &'static str {
        NAME
    }

    fn grammar(&self) -> ConfigGrammar {
        ConfigGrammar {
            delimiter: '/',
            required: &["applicationID", "placementID"],
            optional: &["sizeIndex"],
        }
    }

    fn formats(&self) -> &'static [AdFormat] {
        &[AdFormat::Banner, AdFormat::Interstitial, AdFormat::Rewarded]
    }

    /// Not IAB compliant: opted in or out from the stored binary value.
    fn consent_signal(&self, consent: &ResolvedConsent) -> ConsentSignal {
        ConsentSignal::opt_in_out(consent)
    }

    fn size_index_field(&self) -> Option<&'static str> {
        Some("sizeIndex")
    }

    fn indexed_banner_sizes(&self) -> &'static [BannerSize] {
        INDEXED_BANNER_SIZES
    }
}

/// `InitCallback`, `LoadAdCallback` and `PlayAdCallback` callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum VungleCallback {
    InitError { message: String },
    AdLoad,
    AdStart,
    AdViewed,
    AdClick,
    AdLeftApplication,
    AdRewarded,
    /// Packed end-of-ad report.
    AdEnd { completed: bool, clicked: bool },
    /// Load or playback error, told apart by the adapter's phase.
    Error { code: Option<i64>, message: String },
}

impl VendorCallback for VungleCallback {
    fn into_events(self) -> Vec<VendorEvent> {
        match self {
            Self::InitError { message } => vec![VendorEvent::NetworkError { message }],
            Self::AdLoad => vec![VendorEvent::loaded()],
            Self::AdStart => vec![VendorEvent::Shown],
            Self::AdViewed | Self::AdLeftApplication => Vec::new(),
            Self::AdClick => vec![VendorEvent::Clicked],
            Self::AdRewarded => vec![VendorEvent::RewardOnCompletion { reward: None }],
            Self::AdEnd { completed, clicked } => {
                let mut events = Vec::with_capacity(3);
                if clicked {
                    events.push(VendorEvent::Clicked);
                }
                if completed {
                    events.push(VendorEvent::RewardOnCompletion { reward: None });
                }
                events.push(VendorEvent::Closed);
                events
            }
            Self::Error { code, message } => vec![VendorEvent::Failed {
                kind: code.map_or(LoadFailureKind::Network, |code| {
                    LoadFailureKind::from_code(code, &[NO_SERVE])
                }),
                message,
            }],
        }
    }
}

#[must_use]
pub fn register(settings: &Settings) -> Option<Arc<dyn AdNetwork>> {
    enabled(settings, Vungle)
}
