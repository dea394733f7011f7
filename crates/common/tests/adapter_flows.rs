use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use ad_mediation_common::adapter::{FormatAdapter, HostContext};
use ad_mediation_common::consent::ConsentSignal;
use ad_mediation_common::events::{AdCreative, MediatorEvent, RewardSignal, VendorEvent};
use ad_mediation_common::lifecycle::AdapterState;
use ad_mediation_common::networks::NetworkRegistry;
use ad_mediation_common::request::{AdFormat, ClientParameters};
use ad_mediation_common::settings::Settings;
use ad_mediation_common::test_support::{
    test_environment, LoadBehavior, RecordingListener, ScriptedVendor, VendorCall,
};

fn registry() -> NetworkRegistry {
    NetworkRegistry::new(&Settings::default())
}

#[test]
fn test_adcolony_gdpr_flag_reaches_initialization() {
    let (env, _store) = test_environment();
    let vendor = Arc::new(ScriptedVendor::new());
    let network = registry().require("adcolony").expect("adcolony is registered");
    let adapter = FormatAdapter::new(network, AdFormat::Interstitial, vendor.clone(), env);

    let request = adapter
        .request_ad(
            &HostContext::activity(2.0),
            "abc123/zone9",
            &ClientParameters::new().with("gdprapplies", "false"),
            Arc::new(RecordingListener::new()),
        )
        .expect("request should start");

    let expected = ConsentSignal::GdprRequired {
        required: false,
        consent: None,
    };
    assert_eq!(request.consent, expected);
    assert_eq!(request.placement.as_deref(), Some("zone9"));
    assert_eq!(
        vendor.calls().first(),
        Some(&VendorCall::Initialize {
            identity: "abc123".to_string(),
            consent: expected,
        })
    );
}

#[test]
fn test_concurrent_requests_initialize_once() {
    let (env, _store) = test_environment();
    let counter = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let env = env.clone();
            let counter = Arc::clone(&counter);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let network = registry().require("applovin").expect("applovin is registered");
                let format = if i % 2 == 0 {
                    AdFormat::Interstitial
                } else {
                    AdFormat::Rewarded
                };
                let vendor = Arc::new(
                    ScriptedVendor::new()
                        .with_load(LoadBehavior::Succeed)
                        .with_init_counter(counter),
                );
                let adapter = FormatAdapter::new(network, format, vendor, env);
                let listener = Arc::new(RecordingListener::new());
                barrier.wait();
                adapter
                    .request_ad(
                        &HostContext::activity(1.0),
                        "sdk-key",
                        &ClientParameters::new(),
                        listener.clone(),
                    )
                    .expect("request should succeed");
                listener.terminal_load_count()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().expect("request thread"), 1);
    }
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(env.initializer.is_initialized("applovin"));
}

#[test]
fn test_callbacks_after_destroy_are_silent() {
    let (env, _store) = test_environment();
    let vendor = Arc::new(ScriptedVendor::new());
    let network = registry().require("vungle").expect("vungle is registered");
    let adapter = FormatAdapter::new(network, AdFormat::Rewarded, vendor.clone(), env);
    let listener = Arc::new(RecordingListener::new());
    adapter
        .request_ad(
            &HostContext::activity(1.0),
            "app/placement",
            &ClientParameters::new(),
            listener.clone(),
        )
        .expect("request should start");

    adapter.on_destroy();
    assert!(vendor.emit(VendorEvent::loaded()));
    vendor.emit(VendorEvent::Closed);

    assert!(listener.events().is_empty());
    assert_eq!(adapter.state(), AdapterState::Destroyed);
}

#[test]
fn test_google_banner_nearest_fit() {
    let (env, _store) = test_environment();
    let vendor = Arc::new(ScriptedVendor::new().with_load(LoadBehavior::Succeed));
    let network = registry().require("google").expect("google is registered");
    let adapter = FormatAdapter::new(network, AdFormat::Banner, vendor, env);
    let listener = Arc::new(RecordingListener::new());

    let request = adapter
        .request_ad(
            &HostContext::activity(2.0),
            "ca-app-pub-1~2|ca-app-pub-1/3",
            &ClientParameters::new()
                .with("adViewWidth", 640)
                .with("adViewHeight", 100),
            listener.clone(),
        )
        .expect("request should succeed");

    let size = request.banner_size.expect("banner requests carry a size");
    assert_eq!(size.name, "BANNER");
    assert_eq!((size.width, size.height), (320, 50));
    match listener.events().as_slice() {
        [MediatorEvent::Loaded {
            creative: Some(AdCreative::Banner(view)),
        }] => assert_eq!(view.size, size),
        other => panic!("unexpected events {other:?}"),
    }
}

#[test]
fn test_reward_from_vendor_thread_precedes_close() {
    let (env, _store) = test_environment();
    let vendor = Arc::new(ScriptedVendor::new().with_load(LoadBehavior::Succeed));
    let network = registry().require("inmobi").expect("inmobi is registered");
    let adapter = FormatAdapter::new(network, AdFormat::Rewarded, vendor.clone(), env);
    let listener = Arc::new(RecordingListener::new());
    adapter
        .request_ad(
            &HostContext::activity(1.0),
            "acct/1234567890",
            &ClientParameters::new(),
            listener.clone(),
        )
        .expect("request should succeed");
    adapter.show().expect("show should succeed");

    let sink = vendor.sink().expect("load kept a sink");
    thread::spawn(move || {
        sink.emit(VendorEvent::RewardOnCompletion {
            reward: RewardSignal::parse(Some("coins"), Some("5")),
        });
        sink.emit(VendorEvent::Closed);
    })
    .join()
    .expect("vendor thread");

    let events = listener.events();
    let reward = events
        .iter()
        .position(|event| matches!(event, MediatorEvent::Reward { .. }))
        .expect("reward delivered");
    let closed = events
        .iter()
        .position(|event| *event == MediatorEvent::Closed)
        .expect("close delivered");
    assert!(reward < closed);
    assert_eq!(
        events[reward],
        MediatorEvent::Reward {
            reward: RewardSignal::parse(Some("coins"), Some("5"))
        }
    );
}

#[test]
fn test_disabled_network_is_not_registered() {
    let settings = Settings::from_toml(
        r#"
        [networks.tapjoy]
        enabled = false
        "#,
    )
    .expect("settings should parse");
    let registry = NetworkRegistry::new(&settings);
    assert!(registry.get("tapjoy").is_none());
    assert!(registry.require("tapjoy").is_err());
    assert!(registry.get("ogury").is_some());
}

#[test]
fn test_small_banner_on_dense_screen_picks_smallest_cover() {
    let (env, _store) = test_environment();
    let vendor = Arc::new(ScriptedVendor::new());
    let network = registry().require("google").expect("google is registered");
    let adapter = FormatAdapter::new(network, AdFormat::Banner, vendor, env);

    // 320x50 px at 2.0 is 160x25 dp
    let request = adapter
        .request_ad(
            &HostContext::activity(2.0),
            "ca-app-pub-1~2|ca-app-pub-1/3",
            &ClientParameters::new()
                .with("adViewWidth", 320)
                .with("adViewHeight", 50),
            Arc::new(RecordingListener::new()),
        )
        .expect("request should start");

    let size = request.banner_size.expect("banner requests carry a size");
    assert_eq!((size.name, size.width, size.height), ("BANNER", 320, 50));
}
