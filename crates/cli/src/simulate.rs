//! Replays a vendor callback script through a real adapter.
//!
//! The script drives a [`ScriptedVendor`]: vendor steps are emitted on the
//! load's event sink, `show` and `destroy` call the adapter itself. Everything
//! the mediator would have received is printed as JSON.

use std::sync::Arc;

use ad_mediation_common::adapter::{AdapterEnvironment, FormatAdapter, HostContext};
use ad_mediation_common::consent_store::MemoryConsentStore;
use ad_mediation_common::events::{LoadFailureKind, RewardSignal, VendorEvent};
use ad_mediation_common::initializer::InitRegistry;
use ad_mediation_common::networks::NetworkRegistry;
use ad_mediation_common::request::{AdFormat, ClientParameters};
use ad_mediation_common::settings::Settings;
use ad_mediation_common::test_support::{RecordingListener, ScriptedVendor};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::CliError;

/// A session to replay.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default)]
    pub parameters: ClientParameters,
    /// Value found under the consent storage key, if any.
    #[serde(default)]
    pub stored_consent: Option<String>,
    /// Request from an application context instead of an Activity.
    #[serde(default)]
    pub application_context: bool,
    #[serde(default = "default_density")]
    pub density: f32,
    pub steps: Vec<ScriptStep>,
}

fn default_density() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScriptStep {
    Loaded,
    NoFill {
        #[serde(default)]
        message: String,
    },
    NetworkError {
        #[serde(default)]
        message: String,
    },
    /// Uncoded vendor error, classified by the adapter's phase.
    Failed {
        #[serde(default)]
        no_fill: bool,
        #[serde(default)]
        message: String,
    },
    Shown,
    Closed,
    DisplayFailed {
        #[serde(default)]
        message: String,
    },
    Clicked,
    Rewarded {
        label: Option<String>,
        amount: Option<f64>,
    },
    RewardOnCompletion {
        label: Option<String>,
        amount: Option<f64>,
    },
    Expired,
    Show,
    Destroy,
}

fn reward(label: Option<&str>, amount: Option<f64>) -> Option<RewardSignal> {
    RewardSignal::from_amount(label, amount?)
}

impl ScriptStep {
    /// The vendor event this step emits; `None` for adapter calls.
    fn vendor_event(&self) -> Option<VendorEvent> {
        let event = match self {
            Self::Loaded => VendorEvent::loaded(),
            Self::NoFill { message } => VendorEvent::NoFill {
                message: message.clone(),
            },
            Self::NetworkError { message } => VendorEvent::NetworkError {
                message: message.clone(),
            },
            Self::Failed { no_fill, message } => VendorEvent::Failed {
                kind: if *no_fill {
                    LoadFailureKind::NoFill
                } else {
                    LoadFailureKind::Network
                },
                message: message.clone(),
            },
            Self::Shown => VendorEvent::Shown,
            Self::Closed => VendorEvent::Closed,
            Self::DisplayFailed { message } => VendorEvent::DisplayFailed {
                message: message.clone(),
            },
            Self::Clicked => VendorEvent::Clicked,
            Self::Rewarded { label, amount } => VendorEvent::Rewarded {
                reward: reward(label.as_deref(), *amount),
            },
            Self::RewardOnCompletion { label, amount } => VendorEvent::RewardOnCompletion {
                reward: reward(label.as_deref(), *amount),
            },
            Self::Expired => VendorEvent::Expired,
            Self::Show | Self::Destroy => return None,
        };
        Some(event)
    }
}

/// Runs `script` against `network_name` and returns the transcript.
pub fn run(
    settings: Settings,
    network_name: &str,
    format: AdFormat,
    raw_config: &str,
    script: &Script,
) -> Result<Value, CliError> {
    let network = NetworkRegistry::new(&settings).require(network_name)?;

    let store = Arc::new(MemoryConsentStore::new());
    if let Some(stored) = &script.stored_consent {
        store.set(&settings.consent.storage_key, stored);
    }
    let env = AdapterEnvironment::new(Arc::new(settings), store)
        .with_initializer(Arc::new(InitRegistry::new()));

    let vendor = Arc::new(ScriptedVendor::new());
    let adapter = FormatAdapter::new(network, format, vendor.clone(), env);
    let listener = Arc::new(RecordingListener::new());

    let host = if script.application_context {
        HostContext::application(script.density)
    } else {
        HostContext::activity(script.density)
    };
    let (request, request_error) =
        match adapter.request_ad(&host, raw_config, &script.parameters, listener.clone()) {
            Ok(request) => (Some(request), None),
            Err(e) => (None, Some(e.current_context().to_string())),
        };

    let mut rejected = Vec::new();
    for (index, step) in script.steps.iter().enumerate() {
        log::debug!("step {}: {:?}", index, step);
        match step {
            ScriptStep::Show => {
                if let Err(e) = adapter.show() {
                    rejected.push(json!({
                        "step": index,
                        "error": e.current_context().to_string(),
                    }));
                }
            }
            ScriptStep::Destroy => adapter.on_destroy(),
            step => {
                if let Some(event) = step.vendor_event() {
                    if !vendor.emit(event) {
                        log::warn!("step {} dropped: the vendor was never asked to load", index);
                    }
                }
            }
        }
    }

    Ok(json!({
        "network": adapter.network(),
        "format": format,
        "request": request,
        "request_error": request_error,
        "rejected": rejected,
        "events": listener.events(),
        "final_state": adapter.state(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(body: &str) -> Script {
        serde_json::from_str(body).expect("script should parse")
    }

    #[test]
    fn test_rewarded_session_transcript() {
        let script = script(
            r#"{
                "parameters": {"gdprapplies": "true"},
                "stored_consent": "1",
                "steps": [
                    {"step": "loaded"},
                    {"step": "show"},
                    {"step": "reward_on_completion", "label": "coins", "amount": 5},
                    {"step": "closed"}
                ]
            }"#,
        );
        let out = run(
            Settings::default(),
            "vungle",
            AdFormat::Rewarded,
            "app/placement",
            &script,
        )
        .expect("simulation runs");

        let callbacks: Vec<&str> = out["events"]
            .as_array()
            .expect("events array")
            .iter()
            .filter_map(|event| event["callback"].as_str())
            .collect();
        assert_eq!(callbacks, vec!["loaded", "shown", "reward", "closed"]);
        assert_eq!(out["final_state"], "closed");
        assert_eq!(out["request"]["consent"]["status"], "opted_in");
    }

    #[test]
    fn test_show_before_load_is_rejected() {
        let script = script(r#"{"steps": [{"step": "show"}, {"step": "no_fill"}]}"#);
        let out = run(
            Settings::default(),
            "applovin",
            AdFormat::Interstitial,
            "sdk-key",
            &script,
        )
        .expect("simulation runs");

        assert_eq!(out["rejected"][0]["step"], 0);
        assert_eq!(out["events"][0]["callback"], "request_failed");
        assert_eq!(out["events"][0]["is_no_ad"], true);
    }

    #[test]
    fn test_configuration_error_is_reported() {
        let script = script(r#"{"steps": []}"#);
        let out = run(
            Settings::default(),
            "adcolony",
            AdFormat::Interstitial,
            "missing-zone",
            &script,
        )
        .expect("simulation runs");

        assert!(out["request"].is_null());
        assert!(out["request_error"]
            .as_str()
            .is_some_and(|error| error.starts_with("Configuration error")));
    }

    #[test]
    fn test_unknown_step_is_rejected() {
        let result: Result<Script, _> = serde_json::from_str(r#"{"steps": [{"step": "explode"}]}"#);
        assert!(result.is_err());
    }
}
