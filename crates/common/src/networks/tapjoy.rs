//! Tapjoy: interstitial and rewarded video placements, configured as
//! `sdkKey/placementName`.
//!
//! Tapjoy reports display through its video listener, so `onShown` waits for
//! the video to start rather than for the show call to return.

use std::sync::Arc;

use super::{enabled, AdNetwork};
use crate::consent::{ConsentSignal, ResolvedConsent};
use crate::events::{VendorCallback, VendorEvent};
use crate::lifecycle::ShownSignal;
use crate::request::{AdFormat, AdapterConfig, ConfigGrammar};
use crate::settings::Settings;

pub const NAME: &str = "tapjoy";

#[derive(Debug, Clone, Copy, Default)]
pub struct Tapjoy;

impl AdNetwork for Tapjoy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn grammar(&self) -> ConfigGrammar {
        ConfigGrammar {
            delimiter: '/',
            required: &["sdkKey", "placementName"],
            optional: &[],
        }
    }

    fn formats(&self) -> &'static [AdFormat] {
        &[AdFormat::Interstitial, AdFormat::Rewarded]
    }

    /// Subject-to-GDPR only when the mediator said; the consent string is
    /// forwarded as the user consent.
    fn consent_signal(&self, consent: &ResolvedConsent) -> ConsentSignal {
        ConsentSignal::subject_to_gdpr(consent)
    }

    fn placement(&self, config: &AdapterConfig) -> Option<String> {
        config.field("placementName").map(str::to_string)
    }

    fn shown_signal(&self) -> ShownSignal {
        ShownSignal::VendorEvent
    }
}

/// `TJConnectListener`, `TJPlacementListener` and `TJPlacementVideoListener` callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum TapjoyCallback {
    ConnectFailure,
    RequestSuccess { content_available: bool },
    RequestFailure { message: String },
    ContentReady,
    ContentShow,
    ContentDismiss,
    Click,
    VideoStart,
    VideoError { message: String },
    VideoComplete,
}

impl VendorCallback for TapjoyCallback {
    fn into_events(self) -> Vec<VendorEvent> {
        match self {
            Self::ConnectFailure => vec![VendorEvent::NetworkError {
                message: "The Tapjoy SDK failed to connect".to_string(),
            }],
            Self::RequestSuccess {
                content_available: false,
            } => vec![VendorEvent::NoFill {
                message: "Request succeeded but content is not available".to_string(),
            }],
            // Content follows through ContentReady.
            Self::RequestSuccess {
                content_available: true,
            }
            | Self::ContentShow => Vec::new(),
            Self::RequestFailure { message } => vec![VendorEvent::NetworkError { message }],
            Self::ContentReady => vec![VendorEvent::loaded()],
            Self::ContentDismiss => vec![VendorEvent::Closed],
            Self::Click => vec![VendorEvent::Clicked],
            Self::VideoStart => vec![VendorEvent::Shown],
            Self::VideoError { message } => vec![VendorEvent::DisplayFailed { message }],
            Self::VideoComplete => vec![VendorEvent::RewardOnCompletion { reward: None }],
        }
    }
}

#[must_use]
pub fn register(settings: &Settings) -> Option<Arc<dyn AdNetwork>> {
    enabled(settings, Tapjoy)
}
