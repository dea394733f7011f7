//! Ad mediation adapters.
//!
//! This crate lets a host mediation SDK drive third-party ad network SDKs
//! (AdColony, AppLovin, Facebook Audience Network, Google Mobile Ads, Huawei,
//! InMobi, MoPub, Ogury, Tapjoy, Vungle, AdinCube) through one uniform
//! request / show / destroy contract.
//!
//! # Modules
//!
//! - [`adapter`]: Format adapters and the vendor client seam
//! - [`consent`]: GDPR consent resolution and vendor consent shapes
//! - [`consent_store`]: Host key-value store holding the stored consent decision
//! - [`constants`]: Parameter keys and shared literals
//! - [`error`]: Error types and error handling utilities
//! - [`events`]: Vendor and mediator event vocabularies
//! - [`initializer`]: Once-per-process network SDK initialization
//! - [`lifecycle`]: Adapter state machine and event translation
//! - [`logging`]: Logger installation for binaries and hosts
//! - [`native`]: Native ad content and click proxying
//! - [`networks`]: Per-network shims and the network registry
//! - [`request`]: Configuration parsing, banner sizing and vendor requests
//! - [`settings`]: Configuration management and validation
//! - [`test_support`]: Recording listener, scripted vendor client and manual UI context
//! - [`ui`]: Hand-off of vendor calls to the UI context

pub mod adapter;
pub mod consent;
pub mod consent_store;
pub mod constants;
pub mod error;
pub mod events;
pub mod initializer;
pub mod lifecycle;
pub mod logging;
pub mod native;
pub mod networks;
pub mod request;
pub mod settings;
pub mod test_support;
pub mod ui;
