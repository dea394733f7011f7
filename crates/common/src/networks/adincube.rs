//! AdinCube: banner, interstitial, rewarded and native, configured with the
//! app key alone.

use std::sync::Arc;

use super::{enabled, AdNetwork};
use crate::consent::{ConsentSignal, GdprApplies, ResolvedConsent};
use crate::events::{AdCreative, LoadFailureKind, VendorCallback, VendorEvent};
use crate::native::NativeAssets;
use crate::request::{AdFormat, AdapterConfig, ConfigGrammar};
use crate::settings::Settings;

pub const NAME: &str = "adincube";

#[derive(Debug, Clone, Copy, Default)]
pub struct AdinCube;

impl AdNetwork for AdinCube {
    fn name(&self) -> &'static str {
        NAME
    }

    fn grammar(&self) -> ConfigGrammar {
        ConfigGrammar {
            delimiter: '/',
            required: &["appKey"],
            optional: &[],
        }
    }

    fn formats(&self) -> &'static [AdFormat] {
        &[
            AdFormat::Banner,
            AdFormat::Interstitial,
            AdFormat::Rewarded,
            AdFormat::Native,
        ]
    }

    /// Not IAB compliant: an explicit accepted or declined call.
    fn consent_signal(&self, consent: &ResolvedConsent) -> ConsentSignal {
        ConsentSignal::accept_decline(consent)
    }

    /// The SDK is keyed globally and serves every placement of the app.
    fn placement(&self, _config: &AdapterConfig) -> Option<String> {
        None
    }

    fn requires_activity(&self, format: AdFormat) -> bool {
        format.is_full_screen()
    }

    fn needs_consent_prompt(&self, consent: &ResolvedConsent) -> bool {
        consent.gdpr_applies != GdprApplies::No && !consent.has_stored_preference()
    }
}

/// Banner, interstitial, rewarded and native event listener callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum AdinCubeCallback {
    /// Banner loaded, interstitial cached or rewarded fetched.
    AdReady,
    LoadError { message: String },
    NativeAdLoaded(NativeAssets),
    AdShown,
    /// Uncoded error shared by the load and display phases.
    Error { message: String },
    AdClicked,
    AdCompleted,
    AdHidden,
}

impl VendorCallback for AdinCubeCallback {
    fn into_events(self) -> Vec<VendorEvent> {
        match self {
            Self::AdReady => vec![VendorEvent::loaded()],
            Self::LoadError { message } => vec![VendorEvent::NoFill { message }],
            Self::NativeAdLoaded(assets) => vec![VendorEvent::Loaded {
                creative: Some(AdCreative::Native(assets.into())),
            }],
            Self::AdShown => vec![VendorEvent::Shown],
            Self::Error { message } => vec![VendorEvent::Failed {
                kind: LoadFailureKind::Network,
                message,
            }],
            Self::AdClicked => vec![VendorEvent::Clicked],
            Self::AdCompleted => vec![VendorEvent::RewardOnCompletion { reward: None }],
            Self::AdHidden => vec![VendorEvent::Closed],
        }
    }
}

#[must_use]
pub fn register(settings: &Settings) -> Option<Arc<dyn AdNetwork>> {
    enabled(settings, AdinCube)
}
