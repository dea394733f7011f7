//! Per-network shims and the network registry.
//!
//! Each network module declares its configuration grammar, load-error code
//! table, consent shape and banner sizes through [`AdNetwork`], and mirrors
//! its SDK's listener interface as a callback enum translated into
//! [`crate::events::VendorEvent`]s.

use std::sync::Arc;

use crate::settings::Settings;

pub mod adcolony;
pub mod adincube;
pub mod applovin;
pub mod facebook;
pub mod google;
pub mod huawei;
pub mod inmobi;
pub mod mopub;
pub mod ogury;
mod registry;
pub mod tapjoy;
pub mod vungle;

pub use registry::{base_request, AdNetwork, NetworkRegistry, STANDARD_BANNER};

type NetworkBuilder = fn(&Settings) -> Option<Arc<dyn AdNetwork>>;

pub(crate) fn builders() -> &'static [NetworkBuilder] {
    &[
        adcolony::register,
        adincube::register,
        applovin::register,
        facebook::register,
        google::register,
        huawei::register,
        inmobi::register,
        mopub::register,
        ogury::register,
        tapjoy::register,
        vungle::register,
    ]
}

/// Builder helper: the network when enabled in settings.
fn enabled<N: AdNetwork + 'static>(settings: &Settings, network: N) -> Option<Arc<dyn AdNetwork>> {
    if settings.network_enabled(network.name()) {
        Some(Arc::new(network))
    } else {
        log::debug!("Network '{}' disabled in settings", network.name());
        None
    }
}
