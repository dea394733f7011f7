use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use error_stack::Report;

use crate::consent::{ConsentSignal, ResolvedConsent};
use crate::error::MediationError;
use crate::lifecycle::ShownSignal;
use crate::request::{
    select_indexed_size, select_nearest_size, AdFormat, AdRequestContext, AdapterConfig,
    BannerSize, ConfigGrammar, VendorRequest,
};
use crate::settings::Settings;

/// Standard 320x50 banner, the usual fallback size.
pub const STANDARD_BANNER: BannerSize = BannerSize::new("BANNER", 320, 50);

/// Static description of one ad network: how its configuration string reads,
/// which formats it serves, how consent and sizes are expressed to its SDK.
pub trait AdNetwork: Send + Sync {
    /// Lowercase identifier used in settings and logs.
    fn name(&self) -> &'static str;

    fn grammar(&self) -> ConfigGrammar;

    fn formats(&self) -> &'static [AdFormat];

    fn consent_signal(&self, consent: &ResolvedConsent) -> ConsentSignal;

    /// Identity the SDK is initialized with, `None` when the network needs no
    /// process-wide initialization for this configuration.
    fn init_identity(&self, config: &AdapterConfig) -> Option<String> {
        Some(config.identity().to_string())
    }

    fn placement(&self, config: &AdapterConfig) -> Option<String> {
        config.sub_parameters().get(1).cloned()
    }

    /// Whether the SDK needs an Activity (not just an application context).
    fn requires_activity(&self, _format: AdFormat) -> bool {
        false
    }

    /// Whether `show()` must run on the UI context.
    fn displays_on_ui_thread(&self) -> bool {
        false
    }

    fn shown_signal(&self) -> ShownSignal {
        ShownSignal::OnShowCall
    }

    /// Whether a one-time consent prompt must be presented before the next show.
    fn needs_consent_prompt(&self, _consent: &ResolvedConsent) -> bool {
        false
    }

    /// Nearest-fit table for geometry-based selection.
    fn banner_sizes(&self) -> &'static [BannerSize] {
        &[]
    }

    fn default_banner_size(&self) -> BannerSize {
        STANDARD_BANNER
    }

    /// Configuration field holding an index into [`AdNetwork::indexed_banner_sizes`].
    fn size_index_field(&self) -> Option<&'static str> {
        None
    }

    fn indexed_banner_sizes(&self) -> &'static [BannerSize] {
        &[]
    }

    /// Banner size for a request: an index from the configuration string when
    /// present, otherwise the nearest fit for the requested geometry.
    fn banner_size(&self, ctx: &AdRequestContext) -> BannerSize {
        if let Some(field) = self.size_index_field() {
            if ctx.config.field(field).is_some() {
                if let Some(size) =
                    select_indexed_size(ctx.config.numeric_field(field), self.indexed_banner_sizes())
                {
                    return size;
                }
            }
        }
        select_nearest_size(
            ctx.geometry.as_ref(),
            self.banner_sizes(),
            self.default_banner_size(),
        )
    }

    /// Builds the vendor request.
    ///
    /// # Errors
    ///
    /// Returns [`MediationError::Configuration`] when the configuration cannot
    /// be expressed as a vendor request.
    fn build_request(
        &self,
        ctx: &AdRequestContext,
    ) -> Result<VendorRequest, Report<MediationError>> {
        Ok(base_request(self, ctx))
    }
}

/// Request fields every network fills the same way.
pub fn base_request<N: AdNetwork + ?Sized>(network: &N, ctx: &AdRequestContext) -> VendorRequest {
    VendorRequest {
        network: network.name(),
        format: ctx.format,
        identity: ctx.config.identity().to_string(),
        placement: network.placement(&ctx.config),
        consent: network.consent_signal(&ctx.consent),
        banner_size: (ctx.format == AdFormat::Banner).then(|| network.banner_size(ctx)),
        extras: BTreeMap::new(),
    }
}

/// Enabled networks keyed by name.
#[derive(Clone)]
pub struct NetworkRegistry {
    networks: Arc<HashMap<&'static str, Arc<dyn AdNetwork>>>,
}

impl std::fmt::Debug for NetworkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkRegistry")
            .field("networks", &self.names())
            .finish()
    }
}

impl NetworkRegistry {
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let mut networks: HashMap<&'static str, Arc<dyn AdNetwork>> = HashMap::new();
        for builder in super::builders() {
            if let Some(network) = builder(settings) {
                log::debug!("Registered network '{}'", network.name());
                networks.insert(network.name(), network);
            }
        }
        log::info!("{} ad networks enabled", networks.len());
        Self {
            networks: Arc::new(networks),
        }
    }

    /// Looks up a network by name, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn AdNetwork>> {
        self.networks.get(name.to_ascii_lowercase().as_str()).cloned()
    }

    /// Looks up a network by name.
    ///
    /// # Errors
    ///
    /// Returns [`MediationError::Configuration`] for unknown or disabled networks.
    pub fn require(&self, name: &str) -> Result<Arc<dyn AdNetwork>, Report<MediationError>> {
        self.get(name).ok_or_else(|| {
            Report::new(MediationError::Configuration {
                message: format!(
                    "unknown or disabled network '{}', expected one of: {}",
                    name,
                    self.names().join(", ")
                ),
            })
        })
    }

    /// Sorted network names.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.networks.keys().copied().collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.networks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}
