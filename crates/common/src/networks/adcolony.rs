//! AdColony: interstitial and rewarded video, configured as `appID/zoneID`.

use std::sync::Arc;

use super::{enabled, AdNetwork};
use crate::consent::{ConsentSignal, ResolvedConsent};
use crate::events::{RewardSignal, VendorCallback, VendorEvent};
use crate::request::{AdFormat, AdapterConfig, ConfigGrammar};
use crate::settings::Settings;

pub const NAME: &str = "adcolony";

#[derive(Debug, Clone, Copy, Default)]
pub struct AdColony;

impl AdNetwork for AdColony {
    fn name(&self) -> &'static str {
        NAME
    }

    fn grammar(&self) -> ConfigGrammar {
        ConfigGrammar {
            delimiter: '/',
            required: &["appID", "zoneID"],
            optional: &[],
        }
    }

    fn formats(&self) -> &'static [AdFormat] {
        &[AdFormat::Interstitial, AdFormat::Rewarded]
    }

    /// Not IAB compliant: a GDPR-required flag plus the stored binary value.
    fn consent_signal(&self, consent: &ResolvedConsent) -> ConsentSignal {
        ConsentSignal::gdpr_required(consent)
    }

    fn placement(&self, config: &AdapterConfig) -> Option<String> {
        config.field("zoneID").map(str::to_string)
    }

    fn requires_activity(&self, _format: AdFormat) -> bool {
        true
    }
}

/// AdColony interstitial listener callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum AdColonyCallback {
    RequestFilled,
    RequestNotFilled { zone_id: String },
    Opened,
    Closed,
    Clicked,
    LeftApplication,
    Expiring,
    Reward {
        success: bool,
        name: String,
        amount: i64,
    },
}

impl VendorCallback for AdColonyCallback {
    fn into_events(self) -> Vec<VendorEvent> {
        match self {
            Self::RequestFilled => vec![VendorEvent::loaded()],
            Self::RequestNotFilled { zone_id } => vec![VendorEvent::NoFill {
                message: format!("AdColony request not filled for zone {zone_id}"),
            }],
            Self::Opened => vec![VendorEvent::Shown],
            Self::Closed => vec![VendorEvent::Closed],
            Self::Clicked => vec![VendorEvent::Clicked],
            Self::LeftApplication => Vec::new(),
            Self::Expiring => vec![VendorEvent::Expired],
            Self::Reward {
                success,
                name,
                amount,
            } => {
                if !success {
                    return Vec::new();
                }
                #[allow(clippy::cast_precision_loss)]
                let reward = RewardSignal::from_amount(Some(&name), amount as f64);
                vec![VendorEvent::Rewarded { reward }]
            }
        }
    }
}

#[must_use]
pub fn register(settings: &Settings) -> Option<Arc<dyn AdNetwork>> {
    enabled(settings, AdColony)
}
