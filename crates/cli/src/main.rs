//! Ad mediation CLI for configuration checks and adapter dry runs.
//!
//! This tool provides commands for:
//! - Validating settings files (with `AD_MEDIATION__` environment overrides)
//! - Splitting a network configuration string into its named fields
//! - Resolving consent inputs into a network's consent shape
//! - Picking the banner size a network would request
//! - Replaying vendor callback scripts through a real adapter

use std::fs;
use std::path::{Path, PathBuf};

use ad_mediation_common::logging::{init_logger, level_for_verbosity};
use ad_mediation_common::request::AdFormat;
use ad_mediation_common::settings::Settings;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

mod config;
mod error;
mod inspect;
mod simulate;

use error::CliError;

#[derive(Parser)]
#[command(name = "mediationcli")]
#[command(about = "Ad mediation adapter configuration and simulation tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file used by the network commands (defaults apply when absent)
    #[arg(long, short = 's', global = true, env = "AD_MEDIATION_SETTINGS")]
    settings: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Split a network configuration string into its named fields
    Parse {
        /// Network name, e.g. `google` or `adcolony`
        #[arg(long, short)]
        network: String,

        /// Configuration string as entered by the publisher
        config: String,
    },

    /// Resolve consent inputs and show what a network would receive
    Consent {
        /// Value of the `gdprapplies` client parameter (`true` / `false`)
        #[arg(long)]
        gdpr_applies: Option<String>,

        /// Value found under the consent storage key
        #[arg(long)]
        stored: Option<String>,

        /// TCF consent string
        #[arg(long)]
        consent_string: Option<String>,

        /// Show the consent shape of this network
        #[arg(long, short)]
        network: Option<String>,
    },

    /// Pick the banner size a network would request
    BannerSize {
        #[arg(long, short)]
        network: String,

        /// Configuration string; may carry a size index
        #[arg(long, short)]
        config: String,

        /// Ad view size in pixels with optional density, e.g. `640x100@2.0`
        #[arg(long)]
        size: Option<String>,
    },

    /// Replay a vendor callback script and print the mediator callbacks as JSON
    Simulate {
        #[arg(long, short)]
        network: String,

        #[arg(long, short, value_enum)]
        format: FormatArg,

        #[arg(long, short)]
        config: String,

        /// JSON script: `{"parameters": {...}, "stored_consent": "1", "steps": [...]}`
        #[arg(long)]
        script: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a settings file
    Validate {
        /// Path to the TOML settings file
        #[arg(long, short)]
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum, Debug)]
enum FormatArg {
    Banner,
    Interstitial,
    Rewarded,
    Native,
}

impl From<FormatArg> for AdFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Banner => AdFormat::Banner,
            FormatArg::Interstitial => AdFormat::Interstitial,
            FormatArg::Rewarded => AdFormat::Rewarded,
            FormatArg::Native => AdFormat::Native,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logger(level_for_verbosity(cli.verbose)) {
        eprintln!("Warning: {:?}", e);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_settings(path: Option<&Path>, verbose: bool) -> Result<Settings, CliError> {
    match path {
        Some(path) => Ok(config::load_and_merge_config(path, verbose)?.0),
        None => Settings::from_toml("")
            .map_err(|e| CliError::Config(format!("Failed to load default settings: {:?}", e))),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    let verbose = cli.verbose > 0;
    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Validate { file } => config::validate(file, verbose),
        },
        Commands::Parse { network, config } => {
            let settings = load_settings(cli.settings.as_deref(), verbose)?;
            print_json(&inspect::parse(&settings, &network, &config)?)
        }
        Commands::Consent {
            gdpr_applies,
            stored,
            consent_string,
            network,
        } => {
            let settings = load_settings(cli.settings.as_deref(), verbose)?;
            print_json(&inspect::consent(
                &settings,
                gdpr_applies.as_deref(),
                stored.as_deref(),
                consent_string.as_deref(),
                network.as_deref(),
            )?)
        }
        Commands::BannerSize {
            network,
            config,
            size,
        } => {
            let settings = load_settings(cli.settings.as_deref(), verbose)?;
            let size = size.as_deref().map(inspect::ViewSize::parse).transpose()?;
            print_json(&inspect::banner_size(&settings, &network, &config, size)?)
        }
        Commands::Simulate {
            network,
            format,
            config,
            script,
        } => {
            let settings = load_settings(cli.settings.as_deref(), verbose)?;
            let script: simulate::Script = serde_json::from_str(&fs::read_to_string(&script)?)?;
            print_json(&simulate::run(
                settings,
                &network,
                format.into(),
                &config,
                &script,
            )?)
        }
    }
}
