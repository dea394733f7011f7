//! Adapter lifecycle and vendor-to-mediator event translation.
//!
//! [`EventTranslator`] owns the adapter state machine. Vendor callbacks reach
//! it through an [`EventSink`] bound to one request generation; callbacks from
//! an older generation or after destroy are dropped. Mediator callbacks are
//! queued and delivered in order by a single thread at a time, never while
//! the state lock is held, so a listener may call back into the adapter.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};

use error_stack::Report;
use serde::Serialize;
use uuid::Uuid;

use crate::constants::NOTHING_LOADED;
use crate::error::MediationError;
use crate::events::{
    AdCreative, BannerView, LoadFailureKind, MediatorEvent, MediatorListener, RewardSignal,
    VendorCallback, VendorEvent,
};
use crate::request::{AdFormat, BannerSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterState {
    Idle,
    Requesting,
    Loaded,
    Showing,
    Closed,
    Error,
    Destroyed,
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Requesting => "requesting",
            Self::Loaded => "loaded",
            Self::Showing => "showing",
            Self::Closed => "closed",
            Self::Error => "error",
            Self::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// When a network's `onShown` is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShownSignal {
    /// As soon as the vendor's show call returns successfully, or earlier if
    /// the vendor reports display first.
    OnShowCall,
    /// Only when the vendor reports display (e.g. video start).
    VendorEvent,
}

/// A loaded ad owned by the vendor SDK.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdHandle {
    pub id: Uuid,
    pub generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creative: Option<AdCreative>,
}

/// Outcome of [`EventTranslator::destroy`].
#[derive(Debug, Clone, PartialEq)]
pub enum Teardown {
    /// This call destroyed the adapter; the loaded ad, if any, is to be released.
    Released(Option<AdHandle>),
    AlreadyDestroyed,
}

type Delivery = (Arc<dyn MediatorListener>, MediatorEvent);

struct Inner {
    state: AdapterState,
    generation: u64,
    listener: Option<Arc<dyn MediatorListener>>,
    handle: Option<AdHandle>,
    shown_reported: bool,
    reward_reported: bool,
    pending_reward: Option<Option<RewardSignal>>,
    banner_size: Option<BannerSize>,
    queue: VecDeque<Delivery>,
    delivering: Option<ThreadId>,
}

impl Inner {
    fn enqueue(&mut self, event: MediatorEvent) {
        if let Some(listener) = &self.listener {
            self.queue.push_back((Arc::clone(listener), event));
        }
    }

    fn reset_for_request(&mut self) {
        self.handle = None;
        self.shown_reported = false;
        self.reward_reported = false;
        self.pending_reward = None;
        self.banner_size = None;
    }
}

pub struct EventTranslator {
    network: &'static str,
    format: AdFormat,
    shown_signal: ShownSignal,
    inner: Mutex<Inner>,
    delivered: Condvar,
}

impl fmt::Debug for EventTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTranslator")
            .field("network", &self.network)
            .field("format", &self.format)
            .field("state", &self.state())
            .finish()
    }
}

impl EventTranslator {
    #[must_use]
    pub fn new(network: &'static str, format: AdFormat, shown_signal: ShownSignal) -> Arc<Self> {
        Arc::new(Self {
            network,
            format,
            shown_signal,
            inner: Mutex::new(Inner {
                state: AdapterState::Idle,
                generation: 0,
                listener: None,
                handle: None,
                shown_reported: false,
                reward_reported: false,
                pending_reward: None,
                banner_size: None,
                queue: VecDeque::new(),
                delivering: None,
            }),
            delivered: Condvar::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn state(&self) -> AdapterState {
        self.lock().state
    }

    #[must_use]
    pub fn handle(&self) -> Option<AdHandle> {
        self.lock().handle.clone()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Starts a new request and returns the sink its vendor callbacks go to.
    ///
    /// A loaded banner or native ad is replaced by the new request. A call
    /// rejected while a full-screen request or ad is in flight is answered
    /// with `adRequestFailed` on its own listener; the in-flight request is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`MediationError::InvalidState`] when the adapter is destroyed
    /// or a request or loaded ad is still in flight.
    pub fn begin_request(
        self: &Arc<Self>,
        listener: Arc<dyn MediatorListener>,
    ) -> Result<EventSink, Report<MediationError>> {
        let mut inner = self.lock();
        match inner.state {
            AdapterState::Idle | AdapterState::Closed | AdapterState::Error => {}
            AdapterState::Loaded if !self.format.is_full_screen() => {
                log::debug!(
                    "{} {} refresh replaces request #{}",
                    self.network,
                    self.format,
                    inner.generation
                );
            }
            AdapterState::Destroyed => {
                return Err(Report::new(MediationError::InvalidState {
                    message: format!("cannot request a {} ad after destroy", self.format),
                }));
            }
            state => {
                let message = format!("cannot request a {} ad while {}", self.format, state);
                log::warn!("{} {}", self.network, message);
                inner.queue.push_back((
                    listener,
                    MediatorEvent::RequestFailed {
                        message: message.clone(),
                        is_no_ad: false,
                    },
                ));
                self.deliver(inner);
                return Err(Report::new(MediationError::InvalidState { message }));
            }
        }

        inner.generation += 1;
        inner.state = AdapterState::Requesting;
        inner.listener = Some(listener);
        inner.reset_for_request();
        log::debug!(
            "{} {} request #{} started",
            self.network,
            self.format,
            inner.generation
        );

        Ok(EventSink {
            translator: Arc::downgrade(self),
            generation: inner.generation,
        })
    }

    /// Records the size a banner request was made with; a later load without
    /// its own creative is reported with a view of this size.
    pub fn set_banner_size(&self, generation: u64, size: BannerSize) {
        let mut inner = self.lock();
        if inner.generation == generation {
            inner.banner_size = Some(size);
        }
    }

    /// Sink for the current request, if one was started and not destroyed.
    #[must_use]
    pub fn current_sink(self: &Arc<Self>) -> Option<EventSink> {
        let inner = self.lock();
        (inner.listener.is_some() && inner.state != AdapterState::Destroyed).then(|| EventSink {
            translator: Arc::downgrade(self),
            generation: inner.generation,
        })
    }

    /// Moves a loaded ad to `Showing` and hands back its handle.
    ///
    /// # Errors
    ///
    /// Returns [`MediationError::InvalidState`] ("nothing loaded") outside the
    /// loaded state; the vendor must not be called in that case.
    pub fn begin_show(&self) -> Result<AdHandle, Report<MediationError>> {
        let mut inner = self.lock();
        let handle = match (inner.state, &inner.handle) {
            (AdapterState::Loaded, Some(handle)) if self.format.is_full_screen() => handle.clone(),
            _ => {
                return Err(Report::new(MediationError::InvalidState {
                    message: NOTHING_LOADED.to_string(),
                })
                .attach(format!("{} {} is {}", self.network, self.format, inner.state)));
            }
        };
        inner.state = AdapterState::Showing;
        Ok(handle)
    }

    /// Records the outcome of the vendor's show call for the request that
    /// produced `handle`.
    pub fn finish_show(&self, handle: &AdHandle, result: &Result<(), Report<MediationError>>) {
        let mut inner = self.lock();
        if inner.generation != handle.generation || inner.state != AdapterState::Showing {
            return;
        }
        match result {
            Ok(()) => {
                if self.shown_signal == ShownSignal::OnShowCall && !inner.shown_reported {
                    inner.shown_reported = true;
                    inner.enqueue(MediatorEvent::Shown);
                }
            }
            Err(e) => {
                log::warn!("{} {} show rejected: {:?}", self.network, self.format, e);
                inner.state = AdapterState::Error;
                inner.handle = None;
            }
        }
        self.deliver(inner);
    }

    /// Destroys the adapter. Queued callbacks are discarded, an in-flight
    /// delivery on another thread is waited for, and every later vendor
    /// callback is dropped. Only the first call performs the teardown.
    pub fn destroy(&self) -> Teardown {
        let mut inner = self.lock();
        if inner.state == AdapterState::Destroyed {
            return Teardown::AlreadyDestroyed;
        }
        inner.state = AdapterState::Destroyed;
        inner.generation += 1;
        inner.listener = None;
        inner.queue.clear();
        inner.pending_reward = None;
        let handle = inner.handle.take();

        let current = thread::current().id();
        while inner.delivering.is_some_and(|thread| thread != current) {
            inner = self
                .delivered
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
        log::debug!("{} {} destroyed", self.network, self.format);
        Teardown::Released(handle)
    }

    /// Reports one proxied click on a registered native view.
    fn handle_proxied_click(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.state != AdapterState::Loaded || inner.generation != generation {
            log::debug!("{} dropping proxied click while {}", self.network, inner.state);
            return;
        }
        inner.enqueue(MediatorEvent::Clicked);
        self.deliver(inner);
    }

    fn handle_event(&self, generation: u64, event: VendorEvent) {
        let mut inner = self.lock();
        if inner.state == AdapterState::Destroyed || inner.generation != generation {
            log::debug!(
                "{} dropping stale {:?} (request #{}, current #{})",
                self.network,
                event,
                generation,
                inner.generation
            );
            return;
        }
        self.apply(&mut inner, event);
        self.deliver(inner);
    }

    fn apply(&self, inner: &mut Inner, event: VendorEvent) {
        let state = inner.state;
        match event {
            VendorEvent::Loaded { creative } => {
                if state != AdapterState::Requesting {
                    log::debug!("{} ignoring duplicate load while {}", self.network, state);
                    return;
                }
                let creative = match (creative, inner.banner_size) {
                    (None, Some(size)) if self.format == AdFormat::Banner => {
                        Some(AdCreative::Banner(BannerView { size }))
                    }
                    (creative, _) => creative,
                };
                inner.state = AdapterState::Loaded;
                inner.handle = Some(AdHandle {
                    id: Uuid::new_v4(),
                    generation: inner.generation,
                    creative: creative.clone(),
                });
                inner.enqueue(MediatorEvent::Loaded { creative });
            }
            VendorEvent::NoFill { message } => {
                self.fail_load(inner, LoadFailureKind::NoFill, message);
            }
            VendorEvent::NetworkError { message } => {
                self.fail_load(inner, LoadFailureKind::Network, message);
            }
            VendorEvent::Failed { kind, message } => match state {
                AdapterState::Requesting => self.fail_load(inner, kind, message),
                AdapterState::Showing => self.fail_display(inner, message),
                _ => log::warn!("{} error while {}: {}", self.network, state, message),
            },
            VendorEvent::DisplayFailed { message } => {
                if state == AdapterState::Showing {
                    self.fail_display(inner, message);
                } else {
                    log::debug!("{} ignoring display failure while {}", self.network, state);
                }
            }
            VendorEvent::Shown => {
                if state == AdapterState::Showing && !inner.shown_reported {
                    inner.shown_reported = true;
                    inner.enqueue(MediatorEvent::Shown);
                }
            }
            VendorEvent::Closed => match state {
                AdapterState::Showing => {
                    if !inner.shown_reported {
                        inner.shown_reported = true;
                        inner.enqueue(MediatorEvent::Shown);
                    }
                    if let Some(reward) = inner.pending_reward.take() {
                        if !inner.reward_reported {
                            inner.reward_reported = true;
                            inner.enqueue(MediatorEvent::Reward { reward });
                        }
                    }
                    inner.state = AdapterState::Closed;
                    inner.handle = None;
                    inner.enqueue(MediatorEvent::Closed);
                }
                // inline formats close their expanded click-through view without leaving Loaded
                AdapterState::Loaded if !self.format.is_full_screen() => {
                    inner.enqueue(MediatorEvent::Closed);
                }
                _ => log::debug!("{} ignoring close while {}", self.network, state),
            },
            VendorEvent::Clicked => {
                if state == AdapterState::Idle {
                    return;
                }
                // native clicks are reported by the click proxy
                if self.format == AdFormat::Native {
                    log::debug!("{} ignoring vendor click on native ad", self.network);
                    return;
                }
                inner.enqueue(MediatorEvent::Clicked);
            }
            VendorEvent::Rewarded { reward } => {
                if !self.accepts_reward(state) || inner.reward_reported {
                    return;
                }
                inner.reward_reported = true;
                inner.pending_reward = None;
                inner.enqueue(MediatorEvent::Reward { reward });
            }
            VendorEvent::RewardOnCompletion { reward } => {
                if !self.accepts_reward(state) || inner.reward_reported {
                    return;
                }
                inner.pending_reward = Some(reward);
            }
            VendorEvent::Expired => {
                if state == AdapterState::Loaded {
                    log::info!("{} {} ad expired before show", self.network, self.format);
                    inner.state = AdapterState::Error;
                    inner.handle = None;
                }
            }
        }
    }

    fn accepts_reward(&self, state: AdapterState) -> bool {
        if self.format != AdFormat::Rewarded {
            log::debug!("{} ignoring reward for {} format", self.network, self.format);
            return false;
        }
        if state != AdapterState::Showing {
            log::warn!("{} dropping reward received while {}", self.network, state);
            return false;
        }
        true
    }

    fn fail_load(&self, inner: &mut Inner, kind: LoadFailureKind, message: String) {
        if inner.state != AdapterState::Requesting {
            log::debug!(
                "{} ignoring load failure while {}: {}",
                self.network,
                inner.state,
                message
            );
            return;
        }
        log::info!("{} {} load failed ({:?}): {}", self.network, self.format, kind, message);
        inner.state = AdapterState::Error;
        inner.enqueue(MediatorEvent::RequestFailed {
            message,
            is_no_ad: kind == LoadFailureKind::NoFill,
        });
    }

    fn fail_display(&self, inner: &mut Inner, message: String) {
        log::info!("{} {} display failed: {}", self.network, self.format, message);
        inner.state = AdapterState::Error;
        inner.handle = None;
        inner.enqueue(MediatorEvent::FailedToShow { message });
    }

    fn deliver<'a>(&'a self, mut inner: MutexGuard<'a, Inner>) {
        if inner.delivering.is_some() {
            return;
        }
        inner.delivering = Some(thread::current().id());

        while let Some((listener, event)) = inner.queue.pop_front() {
            drop(inner);
            log::debug!("{} -> mediator {:?}", self.network, event);
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| event.dispatch(listener.as_ref())));
            if outcome.is_err() {
                log::error!("{} listener panicked handling {:?}", self.network, event);
            }
            inner = self.lock();
        }

        inner.delivering = None;
        drop(inner);
        self.delivered.notify_all();
    }
}

/// Where one request's vendor callbacks are sent.
#[derive(Clone)]
pub struct EventSink {
    translator: Weak<EventTranslator>,
    generation: u64,
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl EventSink {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn emit(&self, event: VendorEvent) {
        if let Some(translator) = self.translator.upgrade() {
            translator.handle_event(self.generation, event);
        }
    }

    pub(crate) fn report_click(&self) {
        if let Some(translator) = self.translator.upgrade() {
            translator.handle_proxied_click(self.generation);
        }
    }

    /// Translates a vendor callback and emits the resulting events in order.
    pub fn forward<C: VendorCallback>(&self, callback: C) {
        log::debug!("vendor callback {:?}", callback);
        for event in callback.into_events() {
            self.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingListener;

    fn start(
        format: AdFormat,
        shown_signal: ShownSignal,
    ) -> (Arc<EventTranslator>, Arc<RecordingListener>, EventSink) {
        let translator = EventTranslator::new("test", format, shown_signal);
        let listener = Arc::new(RecordingListener::new());
        let sink = translator
            .begin_request(listener.clone())
            .expect("request should start");
        (translator, listener, sink)
    }

    fn show(translator: &EventTranslator) {
        let handle = translator.begin_show().expect("ad should be loaded");
        translator.finish_show(&handle, &Ok(()));
    }

    #[test]
    fn test_load_show_close_sequence() {
        let (translator, listener, sink) = start(AdFormat::Interstitial, ShownSignal::OnShowCall);
        sink.emit(VendorEvent::loaded());
        assert_eq!(translator.state(), AdapterState::Loaded);

        show(&translator);
        sink.emit(VendorEvent::Closed);

        assert_eq!(
            listener.events(),
            vec![
                MediatorEvent::Loaded { creative: None },
                MediatorEvent::Shown,
                MediatorEvent::Closed,
            ]
        );
        assert_eq!(translator.state(), AdapterState::Closed);
        assert!(translator.handle().is_none(), "handle is released on close");
    }

    #[test]
    fn test_exactly_one_terminal_load_callback() {
        let (translator, listener, sink) = start(AdFormat::Interstitial, ShownSignal::OnShowCall);
        sink.emit(VendorEvent::loaded());
        sink.emit(VendorEvent::loaded());
        sink.emit(VendorEvent::NoFill {
            message: "late".to_string(),
        });

        assert_eq!(listener.terminal_load_count(), 1);
        assert_eq!(translator.state(), AdapterState::Loaded);
    }

    #[test]
    fn test_no_fill_sets_is_no_ad() {
        let (translator, listener, sink) = start(AdFormat::Rewarded, ShownSignal::OnShowCall);
        sink.emit(VendorEvent::NoFill {
            message: "no inventory".to_string(),
        });
        assert_eq!(
            listener.events(),
            vec![MediatorEvent::RequestFailed {
                message: "no inventory".to_string(),
                is_no_ad: true
            }]
        );
        assert_eq!(translator.state(), AdapterState::Error);
    }

    #[test]
    fn test_phase_dependent_failure() {
        let (_translator, listener, sink) = start(AdFormat::Interstitial, ShownSignal::OnShowCall);
        sink.emit(VendorEvent::Failed {
            kind: LoadFailureKind::Network,
            message: "timeout".to_string(),
        });
        assert_eq!(
            listener.events(),
            vec![MediatorEvent::RequestFailed {
                message: "timeout".to_string(),
                is_no_ad: false
            }]
        );

        let (translator, listener, sink) = start(AdFormat::Interstitial, ShownSignal::VendorEvent);
        sink.emit(VendorEvent::loaded());
        show(&translator);
        sink.emit(VendorEvent::Failed {
            kind: LoadFailureKind::NoFill,
            message: "playback".to_string(),
        });
        assert_eq!(
            listener.events(),
            vec![
                MediatorEvent::Loaded { creative: None },
                MediatorEvent::FailedToShow {
                    message: "playback".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_close_without_shown_synthesizes_shown() {
        let (translator, listener, sink) = start(AdFormat::Interstitial, ShownSignal::VendorEvent);
        sink.emit(VendorEvent::loaded());
        show(&translator);
        sink.emit(VendorEvent::Closed);

        assert_eq!(
            listener.events(),
            vec![
                MediatorEvent::Loaded { creative: None },
                MediatorEvent::Shown,
                MediatorEvent::Closed,
            ]
        );
    }

    #[test]
    fn test_vendor_shown_is_reported_once() {
        let (translator, listener, sink) = start(AdFormat::Interstitial, ShownSignal::OnShowCall);
        sink.emit(VendorEvent::loaded());
        let handle = translator.begin_show().expect("loaded");
        sink.emit(VendorEvent::Shown);
        translator.finish_show(&handle, &Ok(()));
        sink.emit(VendorEvent::Shown);

        let shown = listener
            .events()
            .into_iter()
            .filter(|event| *event == MediatorEvent::Shown)
            .count();
        assert_eq!(shown, 1);
    }

    #[test]
    fn test_completion_reward_flushed_before_close() {
        let (translator, listener, sink) = start(AdFormat::Rewarded, ShownSignal::OnShowCall);
        sink.emit(VendorEvent::loaded());
        show(&translator);
        sink.emit(VendorEvent::RewardOnCompletion { reward: None });
        assert_eq!(listener.events().len(), 2, "completion reward is buffered");

        sink.emit(VendorEvent::Closed);
        assert_eq!(
            listener.events(),
            vec![
                MediatorEvent::Loaded { creative: None },
                MediatorEvent::Shown,
                MediatorEvent::Reward { reward: None },
                MediatorEvent::Closed,
            ]
        );
    }

    #[test]
    fn test_confirmed_reward_forwarded_once() {
        let (translator, listener, sink) = start(AdFormat::Rewarded, ShownSignal::OnShowCall);
        sink.emit(VendorEvent::loaded());
        show(&translator);
        let reward = RewardSignal::from_amount(Some("coins"), 10.0);
        sink.emit(VendorEvent::Rewarded {
            reward: reward.clone(),
        });
        sink.emit(VendorEvent::Rewarded { reward: None });
        sink.emit(VendorEvent::RewardOnCompletion { reward: None });
        sink.emit(VendorEvent::Closed);

        assert_eq!(
            listener.events(),
            vec![
                MediatorEvent::Loaded { creative: None },
                MediatorEvent::Shown,
                MediatorEvent::Reward { reward },
                MediatorEvent::Closed,
            ]
        );
    }

    #[test]
    fn test_reward_after_close_is_dropped() {
        let (translator, listener, sink) = start(AdFormat::Rewarded, ShownSignal::OnShowCall);
        sink.emit(VendorEvent::loaded());
        show(&translator);
        sink.emit(VendorEvent::Closed);
        sink.emit(VendorEvent::Rewarded { reward: None });

        assert_eq!(listener.events().last(), Some(&MediatorEvent::Closed));
        assert!(!listener
            .events()
            .iter()
            .any(|event| matches!(event, MediatorEvent::Reward { .. })));
    }

    #[test]
    fn test_reward_ignored_for_interstitial() {
        let (translator, listener, sink) = start(AdFormat::Interstitial, ShownSignal::OnShowCall);
        sink.emit(VendorEvent::loaded());
        show(&translator);
        sink.emit(VendorEvent::RewardOnCompletion { reward: None });
        sink.emit(VendorEvent::Closed);

        assert!(!listener
            .events()
            .iter()
            .any(|event| matches!(event, MediatorEvent::Reward { .. })));
    }

    #[test]
    fn test_show_outside_loaded_fails_fast() {
        let (translator, _listener, _sink) = start(AdFormat::Interstitial, ShownSignal::OnShowCall);
        let error = translator.begin_show().expect_err("nothing loaded yet");
        assert_eq!(error.current_context().message(), NOTHING_LOADED);
        assert_eq!(translator.state(), AdapterState::Requesting);
    }

    #[test]
    fn test_rejected_show_moves_to_error() {
        let (translator, listener, sink) = start(AdFormat::Interstitial, ShownSignal::OnShowCall);
        sink.emit(VendorEvent::loaded());
        let handle = translator.begin_show().expect("loaded");
        let rejected = Err(Report::new(MediationError::Display {
            message: "not ready".to_string(),
        }));
        translator.finish_show(&handle, &rejected);

        assert_eq!(translator.state(), AdapterState::Error);
        assert_eq!(listener.events(), vec![MediatorEvent::Loaded { creative: None }]);
    }

    #[test]
    fn test_stale_generation_is_dropped() {
        let translator = EventTranslator::new("test", AdFormat::Interstitial, ShownSignal::OnShowCall);
        let first = Arc::new(RecordingListener::new());
        let stale = translator.begin_request(first.clone()).expect("first request");
        stale.emit(VendorEvent::NetworkError {
            message: "boom".to_string(),
        });

        let second = Arc::new(RecordingListener::new());
        let current = translator.begin_request(second.clone()).expect("second request");
        stale.emit(VendorEvent::loaded());
        assert!(second.events().is_empty(), "stale callback must not reach the new request");

        current.emit(VendorEvent::loaded());
        assert_eq!(second.events(), vec![MediatorEvent::Loaded { creative: None }]);
        assert_eq!(first.terminal_load_count(), 1);
    }

    #[test]
    fn test_request_rejected_while_in_flight() {
        let (translator, listener, sink) = start(AdFormat::Interstitial, ShownSignal::OnShowCall);
        let other = Arc::new(RecordingListener::new());
        assert!(translator.begin_request(other.clone()).is_err());

        assert!(matches!(
            other.events().as_slice(),
            [MediatorEvent::RequestFailed {
                is_no_ad: false,
                ..
            }]
        ));
        sink.emit(VendorEvent::loaded());
        assert_eq!(listener.events(), vec![MediatorEvent::Loaded { creative: None }]);
        assert_eq!(other.terminal_load_count(), 1);
    }

    #[test]
    fn test_loaded_banner_is_refreshed() {
        let (translator, first, old) = start(AdFormat::Banner, ShownSignal::OnShowCall);
        old.emit(VendorEvent::loaded());

        let second = Arc::new(RecordingListener::new());
        let current = translator
            .begin_request(second.clone())
            .expect("refresh should start");
        assert_eq!(translator.state(), AdapterState::Requesting);
        old.emit(VendorEvent::Clicked);
        current.emit(VendorEvent::loaded());

        assert_eq!(first.events(), vec![MediatorEvent::Loaded { creative: None }]);
        assert_eq!(second.events(), vec![MediatorEvent::Loaded { creative: None }]);
    }

    #[test]
    fn test_native_vendor_clicks_are_not_reported() {
        let (translator, listener, sink) = start(AdFormat::Native, ShownSignal::OnShowCall);
        sink.emit(VendorEvent::loaded());
        sink.emit(VendorEvent::Clicked);
        sink.report_click();

        assert_eq!(
            listener.events(),
            vec![MediatorEvent::Loaded { creative: None }, MediatorEvent::Clicked]
        );

        translator.destroy();
        sink.report_click();
        assert_eq!(listener.events().len(), 2);
    }

    #[test]
    fn test_destroy_silences_callbacks() {
        let (translator, listener, sink) = start(AdFormat::Interstitial, ShownSignal::OnShowCall);
        sink.emit(VendorEvent::loaded());
        match translator.destroy() {
            Teardown::Released(handle) => {
                assert!(handle.is_some(), "destroy hands back the loaded ad");
            }
            Teardown::AlreadyDestroyed => panic!("first destroy performs the teardown"),
        }
        assert_eq!(translator.destroy(), Teardown::AlreadyDestroyed);

        sink.emit(VendorEvent::Clicked);
        sink.emit(VendorEvent::Closed);
        assert_eq!(listener.events(), vec![MediatorEvent::Loaded { creative: None }]);
        assert_eq!(translator.state(), AdapterState::Destroyed);
        assert!(translator.begin_show().is_err());
        assert!(translator
            .begin_request(Arc::new(RecordingListener::new()))
            .is_err());
    }

    #[test]
    fn test_expiry_moves_to_error_quietly() {
        let (translator, listener, sink) = start(AdFormat::Interstitial, ShownSignal::OnShowCall);
        sink.emit(VendorEvent::loaded());
        sink.emit(VendorEvent::Expired);

        assert_eq!(translator.state(), AdapterState::Error);
        assert!(translator.handle().is_none());
        assert_eq!(listener.events().len(), 1);
        assert!(translator.begin_show().is_err());
    }

    #[test]
    fn test_banner_load_reports_requested_size() {
        let (translator, listener, sink) = start(AdFormat::Banner, ShownSignal::OnShowCall);
        let size = BannerSize::new("MEDIUM_RECTANGLE", 300, 250);
        translator.set_banner_size(sink.generation(), size);
        sink.emit(VendorEvent::loaded());

        assert_eq!(
            listener.events(),
            vec![MediatorEvent::Loaded {
                creative: Some(AdCreative::Banner(BannerView { size }))
            }]
        );
    }

    #[test]
    fn test_banner_click_and_close_stay_loaded() {
        let (translator, listener, sink) = start(AdFormat::Banner, ShownSignal::OnShowCall);
        let creative = AdCreative::Banner(BannerView {
            size: BannerSize::new("BANNER", 320, 50),
        });
        sink.emit(VendorEvent::Loaded {
            creative: Some(creative.clone()),
        });
        sink.emit(VendorEvent::Clicked);
        sink.emit(VendorEvent::Closed);

        assert_eq!(
            listener.events(),
            vec![
                MediatorEvent::Loaded {
                    creative: Some(creative)
                },
                MediatorEvent::Clicked,
                MediatorEvent::Closed,
            ]
        );
        assert_eq!(translator.state(), AdapterState::Loaded);
        assert!(translator.begin_show().is_err(), "banners are not shown");
    }

    struct DestroyOnLoad {
        translator: Mutex<Option<Arc<EventTranslator>>>,
        recorded: RecordingListener,
    }

    impl MediatorListener for DestroyOnLoad {
        fn on_loaded(&self) {
            self.recorded.on_loaded();
            let translator = self
                .translator
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(translator) = translator {
                translator.destroy();
            }
        }
        fn ad_request_failed(&self, message: &str, is_no_ad: bool) {
            self.recorded.ad_request_failed(message, is_no_ad);
        }
        fn on_shown(&self) {
            self.recorded.on_shown();
        }
        fn on_ad_closed(&self) {
            self.recorded.on_ad_closed();
        }
        fn on_failed_to_show(&self, message: &str) {
            self.recorded.on_failed_to_show(message);
        }
        fn on_ad_clicked(&self) {
            self.recorded.on_ad_clicked();
        }
        fn on_reward(&self, reward: Option<&RewardSignal>) {
            self.recorded.on_reward(reward);
        }
    }

    #[test]
    fn test_destroy_from_listener_does_not_deadlock() {
        let translator = EventTranslator::new("test", AdFormat::Interstitial, ShownSignal::OnShowCall);
        let listener = Arc::new(DestroyOnLoad {
            translator: Mutex::new(Some(Arc::clone(&translator))),
            recorded: RecordingListener::new(),
        });
        let sink = translator
            .begin_request(listener.clone())
            .expect("request should start");

        sink.emit(VendorEvent::loaded());
        sink.emit(VendorEvent::Clicked);

        assert_eq!(translator.state(), AdapterState::Destroyed);
        assert_eq!(
            listener.recorded.events(),
            vec![MediatorEvent::Loaded { creative: None }]
        );
        listener
            .translator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
