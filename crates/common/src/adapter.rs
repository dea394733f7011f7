//! Format adapters: one per (network, format) pair, driven by the mediator.
//!
//! A [`FormatAdapter`] composes the consent resolver, the process-wide
//! initializer, the network's request translation and the lifecycle state
//! machine around a [`VendorClient`], the only part that talks to the vendor SDK.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use error_stack::Report;

use crate::consent::{ConsentSignal, ResolvedConsent};
use crate::consent_store::ConsentStore;
use crate::error::MediationError;
use crate::events::{MediatorListener, VendorEvent};
use crate::initializer::InitRegistry;
use crate::lifecycle::{AdHandle, AdapterState, EventSink, EventTranslator, Teardown};
use crate::native::ClickProxy;
use crate::networks::AdNetwork;
use crate::request::{
    AdFormat, AdGeometry, AdRequestContext, AdapterConfig, ClientParameters, VendorRequest,
};
use crate::settings::Settings;
use crate::ui::{run_blocking, UiDispatcher};

/// Failure raised synchronously by a vendor SDK call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorFailure {
    pub code: Option<i64>,
    pub message: String,
}

impl VendorFailure {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

impl fmt::Display for VendorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

/// The vendor SDK surface one adapter drives. Asynchronous outcomes are
/// reported through the [`EventSink`] passed to [`VendorClient::load`].
pub trait VendorClient: Send + Sync {
    /// One-time SDK initialization; called at most once per network and process.
    fn initialize(&self, identity: &str, consent: &ConsentSignal);

    /// Starts loading an ad.
    ///
    /// # Errors
    ///
    /// Returns the vendor's synchronous failure, reported as a network error.
    fn load(&self, request: &VendorRequest, sink: EventSink) -> Result<(), VendorFailure>;

    fn is_ready(&self, _handle: &AdHandle) -> bool {
        true
    }

    /// Displays a loaded ad.
    ///
    /// # Errors
    ///
    /// Returns the vendor's synchronous failure, reported as a display error.
    fn show(&self, handle: &AdHandle) -> Result<(), VendorFailure>;

    /// Releases vendor resources. `handle` is the loaded ad, if any.
    fn destroy(&self, _handle: Option<&AdHandle>) {}

    fn present_consent_prompt(&self) {}

    /// Forwards a click on a registered native view.
    fn perform_click(&self, _handle: &AdHandle) {}
}

/// The host context a request is made from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostContext {
    pub is_activity: bool,
    pub density: f32,
}

impl HostContext {
    #[must_use]
    pub fn activity(density: f32) -> Self {
        Self {
            is_activity: true,
            density,
        }
    }

    #[must_use]
    pub fn application(density: f32) -> Self {
        Self {
            is_activity: false,
            density,
        }
    }
}

/// Dependencies shared by every adapter of a host app.
#[derive(Clone)]
pub struct AdapterEnvironment {
    pub settings: Arc<Settings>,
    pub consent_store: Arc<dyn ConsentStore>,
    pub initializer: Arc<InitRegistry>,
    pub ui: Option<Arc<dyn UiDispatcher>>,
}

impl fmt::Debug for AdapterEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterEnvironment")
            .field("settings", &self.settings)
            .field("has_ui", &self.ui.is_some())
            .finish_non_exhaustive()
    }
}

impl AdapterEnvironment {
    /// Environment using the process-wide init registry and no UI context.
    #[must_use]
    pub fn new(settings: Arc<Settings>, consent_store: Arc<dyn ConsentStore>) -> Self {
        Self {
            settings,
            consent_store,
            initializer: InitRegistry::global(),
            ui: None,
        }
    }

    #[must_use]
    pub fn with_initializer(mut self, initializer: Arc<InitRegistry>) -> Self {
        self.initializer = initializer;
        self
    }

    #[must_use]
    pub fn with_ui(mut self, ui: Arc<dyn UiDispatcher>) -> Self {
        self.ui = Some(ui);
        self
    }
}

pub struct FormatAdapter {
    network: Arc<dyn AdNetwork>,
    format: AdFormat,
    client: Arc<dyn VendorClient>,
    env: AdapterEnvironment,
    translator: Arc<EventTranslator>,
    consent_prompt_pending: AtomicBool,
}

impl fmt::Debug for FormatAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatAdapter")
            .field("network", &self.network.name())
            .field("format", &self.format)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl FormatAdapter {
    #[must_use]
    pub fn new(
        network: Arc<dyn AdNetwork>,
        format: AdFormat,
        client: Arc<dyn VendorClient>,
        env: AdapterEnvironment,
    ) -> Self {
        let translator = EventTranslator::new(network.name(), format, network.shown_signal());
        Self {
            network,
            format,
            client,
            env,
            translator,
            consent_prompt_pending: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn network(&self) -> &'static str {
        self.network.name()
    }

    #[must_use]
    pub fn format(&self) -> AdFormat {
        self.format
    }

    #[must_use]
    pub fn state(&self) -> AdapterState {
        self.translator.state()
    }

    /// Requests an ad. The outcome arrives asynchronously on `listener`.
    ///
    /// Configuration problems, synchronous vendor failures and a request made
    /// while another is in flight are reported to the listener as
    /// `adRequestFailed` and also returned. A loaded banner or native ad is
    /// refreshed. A destroyed adapter rejects the call without callbacks.
    ///
    /// # Errors
    ///
    /// Returns [`MediationError::InvalidState`], [`MediationError::Configuration`]
    /// or [`MediationError::Network`].
    pub fn request_ad(
        &self,
        host: &HostContext,
        config: &str,
        parameters: &ClientParameters,
        listener: Arc<dyn MediatorListener>,
    ) -> Result<VendorRequest, Report<MediationError>> {
        let sink = self.translator.begin_request(listener)?;

        let request = match self.prepare(host, config, parameters) {
            Ok(request) => request,
            Err(e) => {
                log::warn!(
                    "{} {} request rejected: {:?}",
                    self.network.name(),
                    self.format,
                    e
                );
                sink.emit(VendorEvent::NetworkError {
                    message: e.current_context().to_string(),
                });
                return Err(e);
            }
        };

        if let Some(size) = request.banner_size {
            self.translator.set_banner_size(sink.generation(), size);
        }
        log::info!(
            "{} {} loading placement {:?}",
            self.network.name(),
            self.format,
            request.placement
        );
        if let Err(failure) = self.client.load(&request, sink.clone()) {
            let message = failure.to_string();
            sink.emit(VendorEvent::NetworkError {
                message: message.clone(),
            });
            return Err(Report::new(MediationError::Network { message }));
        }

        Ok(request)
    }

    fn prepare(
        &self,
        host: &HostContext,
        raw_config: &str,
        parameters: &ClientParameters,
    ) -> Result<VendorRequest, Report<MediationError>> {
        if !self.network.formats().contains(&self.format) {
            return Err(Report::new(MediationError::Configuration {
                message: format!(
                    "{} does not serve {} ads",
                    self.network.name(),
                    self.format
                ),
            }));
        }
        if self.network.requires_activity(self.format) && !host.is_activity {
            return Err(Report::new(MediationError::Configuration {
                message: format!(
                    "{} {} ads require an Activity context",
                    self.network.name(),
                    self.format
                ),
            }));
        }

        let config = AdapterConfig::parse(raw_config, &self.network.grammar())?;
        let consent = ResolvedConsent::from_sources(
            parameters,
            self.env.consent_store.as_ref(),
            &self.env.settings.consent,
        );
        let ctx = AdRequestContext {
            format: self.format,
            geometry: AdGeometry::from_parameters(parameters, host.density),
            config,
            consent,
            parameters: parameters.clone(),
        };
        let request = self.network.build_request(&ctx)?;

        if let Some(identity) = self.network.init_identity(&ctx.config) {
            self.env
                .initializer
                .ensure_initialized(self.network.name(), &identity, |identity| {
                    self.client.initialize(identity, &request.consent);
                });
        }

        if self.format.is_full_screen() && self.network.needs_consent_prompt(&ctx.consent) {
            self.consent_prompt_pending.store(true, Ordering::SeqCst);
        }

        Ok(request)
    }

    /// Shows the loaded ad, blocking until the vendor's show call completes.
    ///
    /// # Errors
    ///
    /// Returns [`MediationError::InvalidState`] ("nothing loaded") outside the
    /// loaded state without reaching the vendor, or [`MediationError::Display`]
    /// when the vendor rejects the show.
    pub fn show(&self) -> Result<(), Report<MediationError>> {
        let handle = self.translator.begin_show()?;

        if self.consent_prompt_pending.swap(false, Ordering::SeqCst) {
            log::info!("{} presenting deferred consent prompt", self.network.name());
            self.client.present_consent_prompt();
        }

        let result = self.display(&handle);
        self.translator.finish_show(&handle, &result);
        result
    }

    fn display(&self, handle: &AdHandle) -> Result<(), Report<MediationError>> {
        let client = Arc::clone(&self.client);
        let network = self.network.name();
        let handle = handle.clone();
        let task = move || {
            if !client.is_ready(&handle) {
                return Err(Report::new(MediationError::Display {
                    message: format!("{network} ad is not ready"),
                }));
            }
            client.show(&handle).map_err(|failure| {
                Report::new(MediationError::Display {
                    message: failure.to_string(),
                })
            })
        };

        match &self.env.ui {
            Some(ui) if self.network.displays_on_ui_thread() => {
                run_blocking(ui.as_ref(), self.env.settings.show_timeout(), task)
            }
            _ => task(),
        }
    }

    /// Click proxy for a loaded native ad.
    #[must_use]
    pub fn click_proxy(&self) -> Option<ClickProxy> {
        if self.format != AdFormat::Native || self.translator.state() != AdapterState::Loaded {
            return None;
        }
        let handle = self.translator.handle()?;
        let sink = self.translator.current_sink()?;
        Some(ClickProxy::new(Arc::clone(&self.client), handle, sink))
    }

    /// Releases the loaded ad and silences every later vendor callback.
    pub fn on_destroy(&self) {
        if let Teardown::Released(handle) = self.translator.destroy() {
            self.client.destroy(handle.as_ref());
        }
    }
}

impl Drop for FormatAdapter {
    fn drop(&mut self) {
        self.on_destroy();
    }
}
