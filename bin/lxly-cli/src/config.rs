//! The configuration file of the CLI.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use lxly_bridge_tracker::TrackerConfig;
use lxly_status_api::{StatusApiConfig, StatusNetwork};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, trace};

use crate::cli::GlobalArgs;

/// Everything the CLI needs to talk to the status API and follow transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Config {
    /// Connection parameters of the status API.
    pub status_api: StatusApiConfig,

    /// Polling and retry behavior.
    #[serde(default)]
    pub tracker: TrackerConfig,
}

/// Builds the effective configuration from the config file, if any, and the command-line
/// overrides.
pub(crate) fn load(args: &GlobalArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => parse_toml::<Config>(path)?,
        None => {
            let Some(api_key) = &args.api_key else {
                bail!("either a config file or an API key is required");
            };

            Config {
                status_api: StatusApiConfig::new(
                    args.network.unwrap_or(StatusNetwork::Mainnet),
                    api_key.clone(),
                ),
                tracker: TrackerConfig::default(),
            }
        }
    };

    if let Some(api_key) = &args.api_key {
        config.status_api.api_key = api_key.clone();
    }

    if let Some(network) = args.network {
        config.status_api.network = network;
    }

    Ok(config)
}

/// Reads the file at `path` and deserializes it as TOML.
fn parse_toml<T>(path: impl AsRef<Path>) -> Result<T>
where
    T: std::fmt::Debug + DeserializeOwned,
{
    let path = path.as_ref();
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    trace!(?path, "read file");

    let parsed = toml::from_str::<T>(&contents)
        .with_context(|| format!("parse TOML file {}", path.display()))?;
    debug!(?path, "parsed TOML file");

    Ok(parsed)
}
