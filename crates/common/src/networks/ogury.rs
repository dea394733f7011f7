//! Ogury: banner (or thumbnail), interstitial and opt-in video, configured as
//! `assetKey|adUnitID` followed by either a banner size index or the four
//! thumbnail fields `maxWidth|maxHeight|topMargin|leftMargin`.

use std::sync::Arc;

use error_stack::Report;

use super::{base_request, enabled, AdNetwork};
use crate::consent::{ConsentSignal, ResolvedConsent};
use crate::error::MediationError;
use crate::events::{LoadFailureKind, RewardSignal, VendorCallback, VendorEvent};
use crate::request::{
    select_indexed_size, AdFormat, AdRequestContext, AdapterConfig, BannerSize, ConfigGrammar,
    VendorRequest,
};
use crate::settings::Settings;

pub const NAME: &str = "ogury";

/// `AD_DISABLED` and `AD_NOT_AVAILABLE`.
pub const NO_FILL_CODES: &[i64] = &[2001, 2008];

const SMALL_BANNER: BannerSize = BannerSize::new("SMALL_BANNER_320x50", 320, 50);

const INDEXED_BANNER_SIZES: &[BannerSize] =
    &[SMALL_BANNER, BannerSize::new("MPU_300x250", 300, 250)];

/// Placement of a thumbnail ad on screen, in dp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thumbnail {
    pub max_width: u32,
    pub max_height: u32,
    pub top_margin: u32,
    pub left_margin: u32,
}

impl Thumbnail {
    /// Reads the four thumbnail fields; `None` unless all are present and numeric.
    #[must_use]
    pub fn from_config(config: &AdapterConfig) -> Option<Self> {
        Some(Self {
            max_width: config.numeric_field("maxWidth")?,
            max_height: config.numeric_field("maxHeight")?,
            top_margin: config.numeric_field("topMargin")?,
            left_margin: config.numeric_field("leftMargin")?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ogury;

impl AdNetwork for Ogury {
    fn name(&self) -> &'static str {
        NAME
    }

    fn grammar(&self) -> ConfigGrammar {
        ConfigGrammar {
            delimiter: '|',
            required: &["assetKey", "adUnitID"],
            optional: &["maxWidth", "maxHeight", "topMargin", "leftMargin"],
        }
    }

    fn formats(&self) -> &'static [AdFormat] {
        &[AdFormat::Banner, AdFormat::Interstitial, AdFormat::Rewarded]
    }

    /// IAB compliant: the TCF string is passed through when the mediator has one.
    fn consent_signal(&self, consent: &ResolvedConsent) -> ConsentSignal {
        ConsentSignal::subject_to_gdpr(consent)
    }

    fn requires_activity(&self, format: AdFormat) -> bool {
        format.is_full_screen()
    }

    fn default_banner_size(&self) -> BannerSize {
        SMALL_BANNER
    }

    /// Without thumbnail fields, the third field is a size index.
    fn banner_size(&self, ctx: &AdRequestContext) -> BannerSize {
        if let Some(thumbnail) = Thumbnail::from_config(&ctx.config) {
            return BannerSize::new("THUMBNAIL", thumbnail.max_width, thumbnail.max_height);
        }
        select_indexed_size(ctx.config.numeric_field("maxWidth"), INDEXED_BANNER_SIZES)
            .unwrap_or(SMALL_BANNER)
    }

    fn build_request(
        &self,
        ctx: &AdRequestContext,
    ) -> Result<VendorRequest, Report<MediationError>> {
        let mut request = base_request(self, ctx);
        if ctx.format == AdFormat::Banner {
            if let Some(thumbnail) = Thumbnail::from_config(&ctx.config) {
                request
                    .extras
                    .insert("topMargin".to_string(), thumbnail.top_margin.to_string());
                request
                    .extras
                    .insert("leftMargin".to_string(), thumbnail.left_margin.to_string());
            }
        }
        Ok(request)
    }
}

/// `OguryAdListener` and opt-in video callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum OguryCallback {
    AdLoaded,
    AdDisplayed,
    AdClicked,
    AdClosed,
    /// `None` when the SDK reports an error without details.
    AdError { code: Option<i64> },
    AdRewarded { name: String, value: String },
}

impl VendorCallback for OguryCallback {
    fn into_events(self) -> Vec<VendorEvent> {
        match self {
            Self::AdLoaded => vec![VendorEvent::loaded()],
            Self::AdDisplayed => vec![VendorEvent::Shown],
            Self::AdClicked => vec![VendorEvent::Clicked],
            Self::AdClosed => vec![VendorEvent::Closed],
            Self::AdError { code: Some(code) } => vec![VendorEvent::Failed {
                kind: LoadFailureKind::from_code(code, NO_FILL_CODES),
                message: format!("Ogury failed with error code {code}"),
            }],
            Self::AdError { code: None } => vec![VendorEvent::Failed {
                kind: LoadFailureKind::Network,
                message: "Ogury failed with unknown error".to_string(),
            }],
            Self::AdRewarded { name, value } => {
                match RewardSignal::parse(Some(&name), Some(&value)) {
                    Some(reward) => vec![VendorEvent::Rewarded {
                        reward: Some(reward),
                    }],
                    None => {
                        log::debug!("Ignoring non-numeric Ogury reward '{name}': '{value}'");
                        Vec::new()
                    }
                }
            }
        }
    }
}

#[must_use]
pub fn register(settings: &Settings) -> Option<Arc<dyn AdNetwork>> {
    enabled(settings, Ogury)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::GdprApplies;
    use crate::request::ClientParameters;

    fn banner_context(raw: &str) -> AdRequestContext {
        AdRequestContext {
            format: AdFormat::Banner,
            config: AdapterConfig::parse(raw, &Ogury.grammar()).expect("config should parse"),
            consent: ResolvedConsent::new(GdprApplies::Yes, None, Some("CPtcf")),
            geometry: None,
            parameters: ClientParameters::new(),
        }
    }

    #[test]
    fn test_banner_size_index() {
        let size = |raw: &str| Ogury.banner_size(&banner_context(raw));
        assert_eq!(size("key|unit"), SMALL_BANNER);
        assert_eq!(size("key|unit|1").name, "MPU_300x250");
        assert_eq!(size("key|unit|x"), SMALL_BANNER);
    }

    #[test]
    fn test_thumbnail_fields() {
        let request = Ogury
            .build_request(&banner_context("key|unit|180|180|10|20"))
            .expect("request should build");
        assert_eq!(
            request.banner_size,
            Some(BannerSize::new("THUMBNAIL", 180, 180))
        );
        assert_eq!(request.extras.get("topMargin").map(String::as_str), Some("10"));
        assert_eq!(request.extras.get("leftMargin").map(String::as_str), Some("20"));
    }

    #[test]
    fn test_tcf_string_passthrough() {
        let request = Ogury
            .build_request(&banner_context("key|unit"))
            .expect("request should build");
        assert_eq!(
            request.consent,
            ConsentSignal::SubjectToGdpr {
                subject: Some(true),
                consent_string: Some("CPtcf".to_string())
            }
        );
    }

    #[test]
    fn test_error_code_classification() {
        let kind = |code| match (OguryCallback::AdError { code }).into_events().as_slice() {
            [VendorEvent::Failed { kind, .. }] => *kind,
            other => panic!("unexpected events {other:?}"),
        };
        assert_eq!(kind(Some(2001)), LoadFailureKind::NoFill);
        assert_eq!(kind(Some(2008)), LoadFailureKind::NoFill);
        assert_eq!(kind(Some(0)), LoadFailureKind::Network);
        assert_eq!(kind(Some(2000)), LoadFailureKind::Network);
        assert_eq!(kind(None), LoadFailureKind::Network);
    }

    #[test]
    fn test_non_numeric_reward_is_ignored() {
        assert!(OguryCallback::AdRewarded {
            name: "coins".to_string(),
            value: "lots".to_string()
        }
        .into_events()
        .is_empty());
    }
}
