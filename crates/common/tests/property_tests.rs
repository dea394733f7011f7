use std::sync::Arc;

use ad_mediation_common::events::{LoadFailureKind, MediatorEvent, RewardSignal, VendorEvent};
use ad_mediation_common::lifecycle::{EventTranslator, ShownSignal};
use ad_mediation_common::request::AdFormat;
use ad_mediation_common::test_support::RecordingListener;
use proptest::prelude::*;

/// One step of a replayed vendor session.
#[derive(Debug, Clone)]
enum Step {
    Vendor(VendorEvent),
    Show,
}

fn vendor_event() -> impl Strategy<Value = VendorEvent> {
    prop_oneof![
        Just(VendorEvent::loaded()),
        Just(VendorEvent::NoFill {
            message: "no fill".to_string()
        }),
        Just(VendorEvent::NetworkError {
            message: "timeout".to_string()
        }),
        prop_oneof![Just(LoadFailureKind::NoFill), Just(LoadFailureKind::Network)].prop_map(
            |kind| VendorEvent::Failed {
                kind,
                message: "error".to_string()
            }
        ),
        Just(VendorEvent::Shown),
        Just(VendorEvent::Closed),
        Just(VendorEvent::DisplayFailed {
            message: "render".to_string()
        }),
        Just(VendorEvent::Clicked),
        (0.0f64..100.0).prop_map(|amount| VendorEvent::Rewarded {
            reward: RewardSignal::from_amount(Some("coins"), amount)
        }),
        Just(VendorEvent::RewardOnCompletion { reward: None }),
        Just(VendorEvent::Expired),
    ]
}

fn session() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec(
        prop_oneof![
            4 => vendor_event().prop_map(Step::Vendor),
            1 => Just(Step::Show),
        ],
        0..24,
    )
}

fn is_load_outcome(event: &VendorEvent) -> bool {
    matches!(
        event,
        VendorEvent::Loaded { .. }
            | VendorEvent::NoFill { .. }
            | VendorEvent::NetworkError { .. }
            | VendorEvent::Failed { .. }
    )
}

fn replay(format: AdFormat, shown_signal: ShownSignal, steps: &[Step]) -> Vec<MediatorEvent> {
    let translator = EventTranslator::new("replay", format, shown_signal);
    let listener = Arc::new(RecordingListener::new());
    let sink = translator
        .begin_request(listener.clone())
        .expect("request should start");
    for step in steps {
        match step {
            Step::Vendor(event) => sink.emit(event.clone()),
            Step::Show => {
                if let Ok(handle) = translator.begin_show() {
                    translator.finish_show(&handle, &Ok(()));
                }
            }
        }
    }
    listener.events()
}

fn count(events: &[MediatorEvent], matches: impl Fn(&MediatorEvent) -> bool) -> usize {
    events.iter().filter(|event| matches(event)).count()
}

proptest! {
    #[test]
    fn test_exactly_one_terminal_load(steps in session()) {
        let events = replay(AdFormat::Rewarded, ShownSignal::OnShowCall, &steps);
        let expected = usize::from(
            steps
                .iter()
                .any(|step| matches!(step, Step::Vendor(event) if is_load_outcome(event))),
        );
        prop_assert_eq!(count(&events, MediatorEvent::is_terminal_load), expected);
    }

    #[test]
    fn test_shown_precedes_single_close(steps in session()) {
        let events = replay(AdFormat::Rewarded, ShownSignal::VendorEvent, &steps);
        prop_assert!(count(&events, |e| *e == MediatorEvent::Shown) <= 1);
        prop_assert!(count(&events, |e| *e == MediatorEvent::Closed) <= 1);
        if let Some(closed) = events.iter().position(|e| *e == MediatorEvent::Closed) {
            let shown = events.iter().position(|e| *e == MediatorEvent::Shown);
            prop_assert!(shown.is_some_and(|shown| shown < closed));
        }
    }

    #[test]
    fn test_at_most_one_reward_never_after_close(steps in session()) {
        let events = replay(AdFormat::Rewarded, ShownSignal::OnShowCall, &steps);
        prop_assert!(
            count(&events, |e| matches!(e, MediatorEvent::Reward { .. })) <= 1,
            "more than one reward"
        );
        if let Some(closed) = events.iter().position(|e| *e == MediatorEvent::Closed) {
            prop_assert!(events[closed..]
                .iter()
                .all(|e| !matches!(e, MediatorEvent::Reward { .. })),
                "reward after close");
        }
    }

    #[test]
    fn test_interstitial_never_rewards(steps in session()) {
        let events = replay(AdFormat::Interstitial, ShownSignal::OnShowCall, &steps);
        prop_assert_eq!(count(&events, |e| matches!(e, MediatorEvent::Reward { .. })), 0);
    }
}
