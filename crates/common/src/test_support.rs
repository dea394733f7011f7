//! Scripted vendor, recording listener and a manually driven UI context.
//!
//! Used by the test suites and by the CLI's `simulate` command to replay
//! vendor callback scripts through a real adapter.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use error_stack::Report;

use crate::adapter::{AdapterEnvironment, VendorClient, VendorFailure};
use crate::consent::ConsentSignal;
use crate::consent_store::MemoryConsentStore;
use crate::error::MediationError;
use crate::events::{
    AdCreative, BannerView, MediatorEvent, MediatorListener, RewardSignal, VendorCallback,
    VendorEvent,
};
use crate::initializer::InitRegistry;
use crate::lifecycle::{AdHandle, EventSink};
use crate::native::NativeAdContent;
use crate::request::{AdFormat, VendorRequest};
use crate::settings::Settings;
use crate::ui::{UiDispatcher, UiTask};

/// Listener that records every mediator callback in order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<MediatorEvent>>,
}

impl RecordingListener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: MediatorEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    #[must_use]
    pub fn events(&self) -> Vec<MediatorEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of `onLoaded` / `adRequestFailed` callbacks received.
    #[must_use]
    pub fn terminal_load_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| event.is_terminal_load())
            .count()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl MediatorListener for RecordingListener {
    fn on_loaded(&self) {
        self.record(MediatorEvent::Loaded { creative: None });
    }

    fn on_banner_loaded(&self, view: &BannerView) {
        self.record(MediatorEvent::Loaded {
            creative: Some(AdCreative::Banner(view.clone())),
        });
    }

    fn on_native_loaded(&self, content: &NativeAdContent) {
        self.record(MediatorEvent::Loaded {
            creative: Some(AdCreative::Native(content.clone())),
        });
    }

    fn ad_request_failed(&self, message: &str, is_no_ad: bool) {
        self.record(MediatorEvent::RequestFailed {
            message: message.to_string(),
            is_no_ad,
        });
    }

    fn on_shown(&self) {
        self.record(MediatorEvent::Shown);
    }

    fn on_ad_closed(&self) {
        self.record(MediatorEvent::Closed);
    }

    fn on_failed_to_show(&self, message: &str) {
        self.record(MediatorEvent::FailedToShow {
            message: message.to_string(),
        });
    }

    fn on_ad_clicked(&self) {
        self.record(MediatorEvent::Clicked);
    }

    fn on_reward(&self, reward: Option<&RewardSignal>) {
        self.record(MediatorEvent::Reward {
            reward: reward.cloned(),
        });
    }
}

/// Calls received by a [`ScriptedVendor`].
#[derive(Debug, Clone, PartialEq)]
pub enum VendorCall {
    Initialize {
        identity: String,
        consent: ConsentSignal,
    },
    Load(VendorRequest),
    IsReady,
    Show,
    Destroy {
        had_ad: bool,
    },
    ConsentPrompt,
    Click,
}

/// What a [`ScriptedVendor`] does when asked to load.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadBehavior {
    /// Keep the sink; the test emits callbacks later.
    #[default]
    Defer,
    /// Report a load immediately from the calling thread.
    Succeed,
    /// Fail the load call synchronously.
    Throw(VendorFailure),
}

/// Vendor SDK double whose behavior is scripted up front.
#[derive(Debug, Default)]
pub struct ScriptedVendor {
    load_behavior: Mutex<LoadBehavior>,
    not_ready: AtomicBool,
    show_failure: Mutex<Option<VendorFailure>>,
    show_events: Mutex<Vec<VendorEvent>>,
    sink: Mutex<Option<EventSink>>,
    calls: Mutex<Vec<VendorCall>>,
    init_counter: Option<Arc<AtomicUsize>>,
}

impl ScriptedVendor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_load(self, behavior: LoadBehavior) -> Self {
        *self
            .load_behavior
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = behavior;
        self
    }

    #[must_use]
    pub fn not_ready(self) -> Self {
        self.not_ready.store(true, Ordering::SeqCst);
        self
    }

    #[must_use]
    pub fn with_show_failure(self, failure: VendorFailure) -> Self {
        *self
            .show_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(failure);
        self
    }

    /// Events emitted synchronously from inside the show call.
    #[must_use]
    pub fn with_show_events(self, events: Vec<VendorEvent>) -> Self {
        *self
            .show_events
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = events;
        self
    }

    /// Counter shared across vendors to observe process-wide initialization.
    #[must_use]
    pub fn with_init_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.init_counter = Some(counter);
        self
    }

    fn record(&self, call: VendorCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<VendorCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn count(&self, matches: impl Fn(&VendorCall) -> bool) -> usize {
        self.calls().iter().filter(|call| matches(call)).count()
    }

    #[must_use]
    pub fn sink(&self) -> Option<EventSink> {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Emits a vendor event on the last load's sink. Returns `false` when no
    /// load happened yet.
    pub fn emit(&self, event: VendorEvent) -> bool {
        match self.sink() {
            Some(sink) => {
                sink.emit(event);
                true
            }
            None => false,
        }
    }

    /// Forwards a vendor callback on the last load's sink.
    pub fn forward<C: VendorCallback>(&self, callback: C) -> bool {
        match self.sink() {
            Some(sink) => {
                sink.forward(callback);
                true
            }
            None => false,
        }
    }
}

impl VendorClient for ScriptedVendor {
    fn initialize(&self, identity: &str, consent: &ConsentSignal) {
        if let Some(counter) = &self.init_counter {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        self.record(VendorCall::Initialize {
            identity: identity.to_string(),
            consent: consent.clone(),
        });
    }

    fn load(&self, request: &VendorRequest, sink: EventSink) -> Result<(), VendorFailure> {
        self.record(VendorCall::Load(request.clone()));
        *self.sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink.clone());

        let behavior = self
            .load_behavior
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match behavior {
            LoadBehavior::Defer => Ok(()),
            LoadBehavior::Succeed => {
                let creative = match (request.format, request.banner_size) {
                    (AdFormat::Banner, Some(size)) => Some(AdCreative::Banner(BannerView { size })),
                    (AdFormat::Native, _) => Some(AdCreative::Native(NativeAdContent::default())),
                    _ => None,
                };
                sink.emit(VendorEvent::Loaded { creative });
                Ok(())
            }
            LoadBehavior::Throw(failure) => Err(failure),
        }
    }

    fn is_ready(&self, _handle: &AdHandle) -> bool {
        self.record(VendorCall::IsReady);
        !self.not_ready.load(Ordering::SeqCst)
    }

    fn show(&self, _handle: &AdHandle) -> Result<(), VendorFailure> {
        self.record(VendorCall::Show);
        if let Some(failure) = self
            .show_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(failure);
        }
        let events = self
            .show_events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for event in events {
            self.emit(event);
        }
        Ok(())
    }

    fn destroy(&self, handle: Option<&AdHandle>) {
        self.record(VendorCall::Destroy {
            had_ad: handle.is_some(),
        });
    }

    fn present_consent_prompt(&self) {
        self.record(VendorCall::ConsentPrompt);
    }

    fn perform_click(&self, _handle: &AdHandle) {
        self.record(VendorCall::Click);
    }
}

/// UI context whose queued tasks only run when the test drains them.
#[derive(Default)]
pub struct ManualUi {
    tasks: Mutex<VecDeque<UiTask>>,
}

impl std::fmt::Debug for ManualUi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualUi")
            .field("pending", &self.pending())
            .finish()
    }
}

impl ManualUi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Runs every queued task on the calling thread. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some(task) = task else {
                return ran;
            };
            task();
            ran += 1;
        }
    }
}

impl UiDispatcher for ManualUi {
    fn is_current(&self) -> bool {
        false
    }

    fn post(&self, task: UiTask) -> Result<(), Report<MediationError>> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(task);
        Ok(())
    }
}

/// Environment with default settings, an empty consent store and a private
/// init registry, so tests do not share initialization state.
#[must_use]
pub fn test_environment() -> (AdapterEnvironment, Arc<MemoryConsentStore>) {
    let store = Arc::new(MemoryConsentStore::new());
    let env = AdapterEnvironment::new(Arc::new(Settings::default()), store.clone())
        .with_initializer(Arc::new(InitRegistry::new()));
    (env, store)
}
