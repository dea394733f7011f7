//! Request-side types: configuration strings, client parameters, banner
//! geometry and the vendor-neutral request handed to a vendor SDK.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::consent::{ConsentSignal, ResolvedConsent};
use crate::constants::{PARAM_AD_VIEW_HEIGHT, PARAM_AD_VIEW_WIDTH};
use crate::error::MediationError;

/// Ad formats a mediator can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdFormat {
    Banner,
    Interstitial,
    Rewarded,
    Native,
}

impl AdFormat {
    /// Whether the mediator drives display through `show()`. Banner and
    /// native ads are displayed by the host as soon as they load.
    #[must_use]
    pub fn is_full_screen(self) -> bool {
        matches!(self, Self::Interstitial | Self::Rewarded)
    }
}

impl fmt::Display for AdFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Banner => "banner",
            Self::Interstitial => "interstitial",
            Self::Rewarded => "rewarded",
            Self::Native => "native",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Client parameters
// ============================================================================

/// Key-value bag the mediator passes with every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientParameters(HashMap<String, serde_json::Value>);

impl ClientParameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// String view of a parameter. Numbers and booleans are rendered, other
    /// JSON shapes and `null` read as absent.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            serde_json::Value::String(value) => Some(value.clone()),
            serde_json::Value::Bool(value) => Some(value.to_string()),
            serde_json::Value::Number(value) => Some(value.to_string()),
            _ => None,
        }
    }

    /// Numeric parameter; unparseable values read as absent.
    #[must_use]
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        match self.0.get(key)? {
            serde_json::Value::Number(value) => value.as_u64().and_then(|v| u32::try_from(v).ok()),
            serde_json::Value::String(value) => value.trim().parse().ok(),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration strings
// ============================================================================

/// Positional grammar of one network's configuration string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigGrammar {
    pub delimiter: char,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

impl ConfigGrammar {
    /// Human-readable form, e.g. `appID|adUnitID[|sizeIndex]`.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = self.required.join(&self.delimiter.to_string());
        for name in self.optional {
            out.push('[');
            out.push(self.delimiter);
            out.push_str(name);
            out.push(']');
        }
        out
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.required
            .iter()
            .chain(self.optional.iter())
            .position(|field| *field == name)
    }
}

/// A configuration string split by its network's grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterConfig {
    raw: String,
    parts: Vec<String>,
    #[serde(skip)]
    grammar: ConfigGrammar,
}

impl AdapterConfig {
    /// Splits `raw` on the grammar's delimiter and checks required fields.
    ///
    /// Parsing is total and deterministic: the same string always yields the
    /// same fields or the same error. Extra trailing fields are kept but not
    /// interpreted.
    ///
    /// # Errors
    ///
    /// Returns [`MediationError::Configuration`] when the string is empty or a
    /// required field is missing or blank.
    pub fn parse(raw: &str, grammar: &ConfigGrammar) -> Result<Self, Report<MediationError>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Report::new(MediationError::Configuration {
                message: format!("empty configuration, expected '{}'", grammar.describe()),
            }));
        }

        let parts: Vec<String> = raw
            .split(grammar.delimiter)
            .map(|part| part.trim().to_string())
            .collect();

        for (index, name) in grammar.required.iter().enumerate() {
            if parts.get(index).map_or(true, String::is_empty) {
                return Err(Report::new(MediationError::Configuration {
                    message: format!(
                        "missing '{}' in configuration '{}', expected '{}'",
                        name,
                        raw,
                        grammar.describe()
                    ),
                }));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            parts,
            grammar: *grammar,
        })
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// First field: the key the network is initialized with.
    #[must_use]
    pub fn identity(&self) -> &str {
        self.parts.first().map_or("", String::as_str)
    }

    /// All positional fields in order.
    #[must_use]
    pub fn sub_parameters(&self) -> &[String] {
        &self.parts
    }

    /// Named field, `None` when absent or blank.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        let position = self.grammar.position(name)?;
        self.parts
            .get(position)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Named numeric field. Unparseable values degrade to `None`.
    #[must_use]
    pub fn numeric_field<T: FromStr>(&self, name: &str) -> Option<T> {
        let value = self.field(name)?;
        match value.parse() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                log::debug!(
                    "Ignoring unparseable '{}' value '{}' in '{}'",
                    name,
                    value,
                    self.raw
                );
                None
            }
        }
    }
}

// ============================================================================
// Banner sizing
// ============================================================================

/// A vendor banner size in density-independent pixels. A zero dimension
/// means "fill the available space".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BannerSize {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
}

impl BannerSize {
    #[must_use]
    pub const fn new(name: &'static str, width: u32, height: u32) -> Self {
        Self {
            name,
            width,
            height,
        }
    }

    /// Whether this size covers `width` x `height` dp; a zero dimension always does.
    fn covers(self, width: u32, height: u32) -> bool {
        (self.width == 0 || self.width >= width) && (self.height == 0 || self.height >= height)
    }

    /// Area once zero dimensions are resolved against the requested size.
    fn fitted_area(self, width: u32, height: u32) -> u64 {
        let fitted = |size: u32, requested: u32| u64::from(if size == 0 { requested } else { size });
        fitted(self.width, width) * fitted(self.height, height)
    }
}

/// Requested banner area in physical pixels plus the screen density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdGeometry {
    pub width_px: u32,
    pub height_px: u32,
    pub density: f32,
}

impl AdGeometry {
    #[must_use]
    pub fn new(width_px: u32, height_px: u32, density: f32) -> Self {
        Self {
            width_px,
            height_px,
            density,
        }
    }

    /// Reads `adViewWidth` / `adViewHeight`; `None` if either is missing or unparseable.
    #[must_use]
    pub fn from_parameters(parameters: &ClientParameters, density: f32) -> Option<Self> {
        let width_px = parameters.get_u32(PARAM_AD_VIEW_WIDTH)?;
        let height_px = parameters.get_u32(PARAM_AD_VIEW_HEIGHT)?;
        Some(Self::new(width_px, height_px, density))
    }

    /// Size in dp, rounded up. Non-positive densities count as 1.0.
    #[must_use]
    pub fn to_dp(&self) -> (u32, u32) {
        let density = if self.density > 0.0 { self.density } else { 1.0 };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let convert = |px: u32| {
            (f64::from(px) / f64::from(density))
                .ceil()
                .min(f64::from(u32::MAX)) as u32
        };
        (convert(self.width_px), convert(self.height_px))
    }
}

/// Smallest vendor size that covers the requested size in dp, else `default`.
///
/// Full-width sizes (zero width) cover any requested width. Ties on area go
/// to the narrower, then shorter size.
#[must_use]
pub fn select_nearest_size(
    geometry: Option<&AdGeometry>,
    sizes: &[BannerSize],
    default: BannerSize,
) -> BannerSize {
    let Some(geometry) = geometry else {
        return default;
    };
    let (width, height) = geometry.to_dp();
    sizes
        .iter()
        .copied()
        .filter(|size| size.covers(width, height))
        .min_by_key(|size| (size.fitted_area(width, height), size.width, size.height))
        .unwrap_or(default)
}

/// Entry `index` of an index table; unknown indices select entry 0.
#[must_use]
pub fn select_indexed_size(index: Option<usize>, sizes: &[BannerSize]) -> Option<BannerSize> {
    index
        .and_then(|index| sizes.get(index))
        .or_else(|| sizes.first())
        .copied()
}

// ============================================================================
// Vendor-neutral request
// ============================================================================

/// Everything a network needs to build its vendor request.
#[derive(Debug, Clone)]
pub struct AdRequestContext {
    pub format: AdFormat,
    pub config: AdapterConfig,
    pub consent: ResolvedConsent,
    pub geometry: Option<AdGeometry>,
    pub parameters: ClientParameters,
}

/// The request passed to a vendor SDK's load call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorRequest {
    pub network: &'static str,
    pub format: AdFormat,
    pub identity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<String>,
    pub consent: ConsentSignal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner_size: Option<BannerSize>,
    /// Vendor-specific key-values (extras bundles, partner tags).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, String>,
}
