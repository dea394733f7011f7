//! Read-only commands that show how one network would see a request.

use std::sync::Arc;

use ad_mediation_common::consent::{GdprApplies, ResolvedConsent};
use ad_mediation_common::networks::{AdNetwork, NetworkRegistry};
use ad_mediation_common::request::{
    AdFormat, AdGeometry, AdRequestContext, AdapterConfig, ClientParameters,
};
use ad_mediation_common::settings::Settings;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::error::CliError;

/// Banner geometry given as `<width>x<height>[@<density>]` in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSize {
    pub width_px: u32,
    pub height_px: u32,
    pub density: f32,
}

impl ViewSize {
    pub fn parse(raw: &str) -> Result<Self, CliError> {
        let pattern = Regex::new(r"^(\d+)x(\d+)(?:@(\d+(?:\.\d+)?))?$")
            .map_err(|e| CliError::Usage(format!("size pattern failed to compile: {e}")))?;

        let invalid = || CliError::Usage(format!("expected <width>x<height>[@<density>], got '{raw}'"));
        let captures = pattern.captures(raw.trim()).ok_or_else(invalid)?;
        let width_px = captures[1].parse().map_err(|_| invalid())?;
        let height_px = captures[2].parse().map_err(|_| invalid())?;
        let density = match captures.get(3) {
            Some(density) => density.as_str().parse().map_err(|_| invalid())?,
            None => 1.0,
        };
        if density <= 0.0 {
            return Err(invalid());
        }

        Ok(Self {
            width_px,
            height_px,
            density,
        })
    }
}

fn lookup(settings: &Settings, name: &str) -> Result<Arc<dyn AdNetwork>, CliError> {
    Ok(NetworkRegistry::new(settings).require(name)?)
}

fn context(
    network: &dyn AdNetwork,
    format: AdFormat,
    raw_config: &str,
    consent: ResolvedConsent,
    geometry: Option<AdGeometry>,
) -> Result<AdRequestContext, CliError> {
    Ok(AdRequestContext {
        format,
        config: AdapterConfig::parse(raw_config, &network.grammar())?,
        consent,
        geometry,
        parameters: ClientParameters::new(),
    })
}

/// Splits a configuration string with the network's grammar.
pub fn parse(settings: &Settings, network_name: &str, raw_config: &str) -> Result<Value, CliError> {
    let network = lookup(settings, network_name)?;
    let grammar = network.grammar();
    let config = AdapterConfig::parse(raw_config, &grammar)?;

    let mut fields = Map::new();
    for name in grammar.required.iter().chain(grammar.optional.iter()) {
        if let Some(value) = config.field(name) {
            fields.insert((*name).to_string(), Value::String(value.to_string()));
        }
    }
    log::debug!("{} parsed {:?}", network.name(), config);

    Ok(json!({
        "network": network.name(),
        "grammar": grammar.describe(),
        "identity": config.identity(),
        "init_identity": network.init_identity(&config),
        "placement": network.placement(&config),
        "fields": fields,
        "formats": network.formats(),
    }))
}

/// Resolves consent inputs, optionally into the shape one network takes.
pub fn consent(
    settings: &Settings,
    gdpr_applies: Option<&str>,
    stored: Option<&str>,
    consent_string: Option<&str>,
    network_name: Option<&str>,
) -> Result<Value, CliError> {
    let consent = ResolvedConsent::new(GdprApplies::from_param(gdpr_applies), stored, consent_string);
    let mut out = json!({
        "inputs": consent,
        "decision": consent.decision(),
        "state": consent.state(),
    });
    if let Some(name) = network_name {
        let network = lookup(settings, name)?;
        out["network"] = json!(network.name());
        out["signal"] = serde_json::to_value(network.consent_signal(&consent))?;
        out["deferred_prompt"] = json!(network.needs_consent_prompt(&consent));
    }
    Ok(out)
}

/// Picks the banner size a network would request for the given geometry.
pub fn banner_size(
    settings: &Settings,
    network_name: &str,
    raw_config: &str,
    size: Option<ViewSize>,
) -> Result<Value, CliError> {
    let network = lookup(settings, network_name)?;
    if !network.formats().contains(&AdFormat::Banner) {
        return Err(CliError::Usage(format!(
            "{} does not serve banner ads",
            network.name()
        )));
    }

    let geometry = size.map(|size| AdGeometry::new(size.width_px, size.height_px, size.density));
    let requested_dp = geometry.as_ref().map(AdGeometry::to_dp);
    let ctx = context(
        network.as_ref(),
        AdFormat::Banner,
        raw_config,
        ResolvedConsent::new(GdprApplies::Unknown, None, None),
        geometry,
    )?;
    let selected = network.banner_size(&ctx);

    Ok(json!({
        "network": network.name(),
        "requested_dp": requested_dp,
        "size": selected,
    }))
}
