//! Vendor-neutral event vocabulary.
//!
//! Every network shim translates its SDK callbacks into [`VendorEvent`]s; the
//! lifecycle turns those into [`MediatorEvent`]s delivered to a
//! [`MediatorListener`].

use serde::{Deserialize, Serialize};

use crate::native::NativeAdContent;
use crate::request::BannerSize;

/// Reward payload reported with `onReward`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardSignal {
    pub label: String,
    pub amount: f64,
}

impl RewardSignal {
    /// Builds a payload from raw vendor values. A missing, unparseable or
    /// non-positive amount yields no payload.
    #[must_use]
    pub fn parse(label: Option<&str>, amount: Option<&str>) -> Option<Self> {
        let amount: f64 = amount?.trim().parse().ok()?;
        Self::from_amount(label, amount)
    }

    #[must_use]
    pub fn from_amount(label: Option<&str>, amount: f64) -> Option<Self> {
        if !amount.is_finite() || amount <= 0.0 {
            return None;
        }
        Some(Self {
            label: label.unwrap_or_default().to_string(),
            amount,
        })
    }
}

/// Banner view delivered with `onLoaded` for banner requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BannerView {
    pub size: BannerSize,
}

/// Creative attached to a successful load, when the format has one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdCreative {
    Banner(BannerView),
    Native(NativeAdContent),
}

/// How a load failure is classified for `adRequestFailed`'s `isNoAd` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadFailureKind {
    NoFill,
    Network,
}

impl LoadFailureKind {
    /// Classifies a numeric vendor code against that vendor's no-fill codes.
    #[must_use]
    pub fn from_code(code: i64, no_fill_codes: &[i64]) -> Self {
        if no_fill_codes.contains(&code) {
            Self::NoFill
        } else {
            Self::Network
        }
    }
}

/// Internal event every vendor callback maps into.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VendorEvent {
    Loaded { creative: Option<AdCreative> },
    NoFill { message: String },
    NetworkError { message: String },
    /// Error callback shared by the load and display phases. Classified as a
    /// load failure while requesting and as a display failure once loaded.
    Failed {
        kind: LoadFailureKind,
        message: String,
    },
    Shown,
    Closed,
    DisplayFailed { message: String },
    Clicked,
    /// Reward confirmed by the network; forwarded as soon as it arrives.
    Rewarded { reward: Option<RewardSignal> },
    /// Playback completed; the reward is held back and flushed before close.
    RewardOnCompletion { reward: Option<RewardSignal> },
    Expired,
}

impl VendorEvent {
    #[must_use]
    pub fn load_failure(kind: LoadFailureKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            LoadFailureKind::NoFill => Self::NoFill { message },
            LoadFailureKind::Network => Self::NetworkError { message },
        }
    }

    #[must_use]
    pub fn loaded() -> Self {
        Self::Loaded { creative: None }
    }
}

/// Callback delivered to the mediator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "callback", rename_all = "snake_case")]
pub enum MediatorEvent {
    Loaded { creative: Option<AdCreative> },
    RequestFailed { message: String, is_no_ad: bool },
    Shown,
    Closed,
    FailedToShow { message: String },
    Clicked,
    Reward { reward: Option<RewardSignal> },
}

impl MediatorEvent {
    /// Invokes the matching listener method.
    pub fn dispatch(&self, listener: &dyn MediatorListener) {
        match self {
            Self::Loaded { creative: None } => listener.on_loaded(),
            Self::Loaded {
                creative: Some(AdCreative::Banner(view)),
            } => listener.on_banner_loaded(view),
            Self::Loaded {
                creative: Some(AdCreative::Native(content)),
            } => listener.on_native_loaded(content),
            Self::RequestFailed { message, is_no_ad } => {
                listener.ad_request_failed(message, *is_no_ad);
            }
            Self::Shown => listener.on_shown(),
            Self::Closed => listener.on_ad_closed(),
            Self::FailedToShow { message } => listener.on_failed_to_show(message),
            Self::Clicked => listener.on_ad_clicked(),
            Self::Reward { reward } => listener.on_reward(reward.as_ref()),
        }
    }

    #[must_use]
    pub fn is_terminal_load(&self) -> bool {
        matches!(self, Self::Loaded { .. } | Self::RequestFailed { .. })
    }
}

/// The mediator's listener interface.
pub trait MediatorListener: Send + Sync {
    fn on_loaded(&self);

    fn on_banner_loaded(&self, _view: &BannerView) {
        self.on_loaded();
    }

    fn on_native_loaded(&self, _content: &NativeAdContent) {
        self.on_loaded();
    }

    fn ad_request_failed(&self, message: &str, is_no_ad: bool);
    fn on_shown(&self);
    fn on_ad_closed(&self);
    fn on_failed_to_show(&self, message: &str);
    fn on_ad_clicked(&self);
    fn on_reward(&self, reward: Option<&RewardSignal>);
}

/// A vendor callback enum that translates into internal events.
pub trait VendorCallback: std::fmt::Debug {
    fn into_events(self) -> Vec<VendorEvent>;
}
