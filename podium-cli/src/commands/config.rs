//! `podium config` — inspect and update the persisted user config.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use podium_core::{store, ApiKey, ConfigError, Provider, UserConfig};
use podium_runtime::RuntimeSettings;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the persisted config. Secrets are masked unless --reveal.
    Show(ShowArgs),
    /// Merge the given values over the persisted config and save it.
    Set(SetArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    /// Print API keys in full.
    #[arg(long)]
    pub reveal: bool,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Active provider: openai or google.
    #[arg(long)]
    pub llm: Option<Provider>,

    #[arg(long)]
    pub openai_api_key: Option<String>,

    #[arg(long)]
    pub google_api_key: Option<String>,
}

pub fn run(command: ConfigCommand) -> Result<()> {
    let location = ConfigLocation::resolve()?;
    match command {
        ConfigCommand::Show(args) => show(&location, &args),
        ConfigCommand::Set(args) => set(&location, args),
    }
}

/// Where the record lives and whether it may be changed, as seen by the
/// services `podium start` would launch.
struct ConfigLocation {
    path: PathBuf,
    can_change_keys: bool,
}

impl ConfigLocation {
    fn resolve() -> Result<Self> {
        let cwd = std::env::current_dir().context("could not determine current directory")?;
        let settings =
            RuntimeSettings::from_env(&cwd).context("failed to resolve config location")?;
        Ok(Self {
            path: settings.user_config_path,
            can_change_keys: settings.can_change_keys,
        })
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ConfigJson {
    path: String,
    can_change_keys: bool,
    has_valid_credentials: bool,
    llm: Option<&'static str>,
    openai_api_key: Option<String>,
    google_api_key: Option<String>,
}

#[derive(Tabled)]
struct ConfigRow {
    #[tabled(rename = "setting")]
    setting: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

fn show(location: &ConfigLocation, args: &ShowArgs) -> Result<()> {
    let config = store::load(&location.path)
        .with_context(|| format!("failed to load {}", location.path.display()))?;
    let render = |key: Option<&ApiKey>| {
        key.map(|k| {
            if args.reveal {
                k.expose().to_string()
            } else {
                k.masked()
            }
        })
    };

    if args.json {
        let payload = ConfigJson {
            path: location.path.display().to_string(),
            can_change_keys: location.can_change_keys,
            has_valid_credentials: config.has_valid_credentials(),
            llm: config.llm.map(Provider::as_str),
            openai_api_key: render(config.openai_api_key.as_ref()),
            google_api_key: render(config.google_api_key.as_ref()),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).context("failed to serialize config JSON")?
        );
        return Ok(());
    }

    println!("{}", location.path.display().to_string().bold());
    let unset = || "(unset)".bright_black().to_string();
    let rows = vec![
        ConfigRow {
            setting: "LLM",
            value: config
                .llm
                .map(|p| p.as_str().to_string())
                .unwrap_or_else(unset),
        },
        ConfigRow {
            setting: "OPENAI_API_KEY",
            value: render(config.openai_api_key.as_ref()).unwrap_or_else(unset),
        },
        ConfigRow {
            setting: "GOOGLE_API_KEY",
            value: render(config.google_api_key.as_ref()).unwrap_or_else(unset),
        },
        ConfigRow {
            setting: "keys editable",
            value: yes_no(location.can_change_keys),
        },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if !config.has_valid_credentials() {
        println!(
            "{} no provider with a key is configured; run 'podium config set'",
            "warning:".yellow().bold()
        );
    }
    Ok(())
}

fn yes_no(value: bool) -> String {
    if value {
        "yes".green().to_string()
    } else {
        "no".red().to_string()
    }
}

// ---------------------------------------------------------------------------
// set
// ---------------------------------------------------------------------------

fn set(location: &ConfigLocation, args: SetArgs) -> Result<()> {
    let incoming = UserConfig {
        llm: args.llm,
        openai_api_key: args.openai_api_key.and_then(ApiKey::new),
        google_api_key: args.google_api_key.and_then(ApiKey::new),
    };
    if incoming.is_empty() {
        bail!("nothing to update; pass --llm, --openai-api-key, or --google-api-key");
    }

    match store::update(&location.path, incoming, location.can_change_keys) {
        Ok(saved) => {
            println!("updated {}", location.path.display());
            if !saved.has_valid_credentials() {
                println!(
                    "{} the selected provider has no key yet",
                    "warning:".yellow().bold()
                );
            }
            Ok(())
        }
        Err(ConfigError::KeysLocked) => {
            bail!("API keys are locked for this deployment (CAN_CHANGE_KEYS=false)")
        }
        Err(err) => Err(err).with_context(|| format!("failed to update {}", location.path.display())),
    }
}
