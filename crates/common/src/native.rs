//! Native ad content and click-through proxying.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::adapter::VendorClient;
use crate::lifecycle::{AdHandle, EventSink};

/// Rating reported when the vendor provides none.
pub const NO_RATING: f64 = -1.0;

/// Native assets handed to the mediator. Missing text assets are `""`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeAdContent {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub icon_url: String,
    pub cover_url: String,
    pub call_to_action: String,
    pub sponsored: String,
    pub rating: f64,
}

impl Default for NativeAdContent {
    fn default() -> Self {
        Self {
            title: String::new(),
            subtitle: String::new(),
            body: String::new(),
            icon_url: String::new(),
            cover_url: String::new(),
            call_to_action: String::new(),
            sponsored: String::new(),
            rating: NO_RATING,
        }
    }
}

/// Native assets as a vendor reports them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NativeAssets {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub body: Option<String>,
    pub icon_url: Option<String>,
    pub cover_url: Option<String>,
    pub call_to_action: Option<String>,
    pub sponsored: Option<String>,
    pub rating: Option<f64>,
}

impl From<NativeAssets> for NativeAdContent {
    fn from(assets: NativeAssets) -> Self {
        Self {
            title: assets.title.unwrap_or_default(),
            subtitle: assets.subtitle.unwrap_or_default(),
            body: assets.body.unwrap_or_default(),
            icon_url: assets.icon_url.unwrap_or_default(),
            cover_url: assets.cover_url.unwrap_or_default(),
            call_to_action: assets.call_to_action.unwrap_or_default(),
            sponsored: assets.sponsored.unwrap_or_default(),
            rating: assets
                .rating
                .filter(|rating| rating.is_finite() && *rating >= 0.0)
                .unwrap_or(NO_RATING),
        }
    }
}

/// Forwards clicks on the host's registered native views to the vendor and
/// reports each one to the mediator. The proxy is the only click reporter for
/// native ads; click callbacks the vendor raises for a proxied click are dropped.
pub struct ClickProxy {
    client: Arc<dyn VendorClient>,
    handle: AdHandle,
    sink: EventSink,
    registered: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for ClickProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickProxy")
            .field("handle", &self.handle.id)
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}

impl ClickProxy {
    pub(crate) fn new(client: Arc<dyn VendorClient>, handle: AdHandle, sink: EventSink) -> Self {
        Self {
            client,
            handle,
            sink,
            registered: Mutex::new(HashSet::new()),
        }
    }

    pub fn register_views<I, S>(&self, views: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registered = self
            .registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        registered.extend(views.into_iter().map(Into::into));
    }

    pub fn unregister_views(&self) {
        self.registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Handles one physical click. Returns `false` for views that are not
    /// registered, which are left alone.
    pub fn on_view_clicked(&self, view: &str) -> bool {
        let is_registered = self
            .registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(view);
        if !is_registered {
            return false;
        }
        self.client.perform_click(&self.handle);
        self.sink.report_click();
        true
    }
}
