//! Configuration loading.
//!
//! The config file names the node RPC endpoint and the accounts whose
//! activity the bridge watches. Path resolution: `$ADDRESSBRIDGE_CONFIG`
//! if set, else `~/.addressbridge.json`.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{ServerError, ServerResult};
use crate::xpub;

pub const DEFAULT_CONFIG_FILE: &str = ".addressbridge.json";

/// Gap limit applied when expanding account xpubs into watch addresses.
pub const DEFAULT_GAP_LIMIT: u32 = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub xpub: Option<String>,
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Configuration {
    pub rpc_url: String,
    pub rpc_user: String,
    pub rpc_password: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub accounts: Vec<Account>,
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("ADDRESSBRIDGE_CONFIG") {
        return PathBuf::from(path);
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_CONFIG_FILE)
}

pub fn load(path: &Path) -> ServerResult<Configuration> {
    let file = File::open(path)
        .map_err(|err| ServerError::Config(format!("cannot open {}: {}", path.display(), err)))?;

    let configuration: Configuration = serde_json::from_reader(file)
        .map_err(|err| ServerError::Config(format!("cannot decode {}: {}", path.display(), err)))?;

    configuration.validate()?;
    info!("Loaded config file {}", path.display());

    Ok(configuration)
}

impl Configuration {
    pub fn validate(&self) -> ServerResult<()> {
        if self.rpc_url.is_empty() {
            return Err(ServerError::Config("rpc_url must not be empty".into()));
        }

        for (index, account) in self.accounts.iter().enumerate() {
            if account.xpub.is_none() && account.addresses.is_empty() {
                return Err(ServerError::Config(format!(
                    "account {index} names neither an xpub nor addresses"
                )));
            }

            if let Some(key) = &account.xpub {
                if !xpub::is_xpub(key) {
                    return Err(ServerError::InvalidAddress(format!(
                        "account {index}: '{key}' is not an extended public key"
                    )));
                }
            }

            for address in &account.addresses {
                if !xpub::looks_like_address(address) {
                    return Err(ServerError::InvalidAddress(format!(
                        "account {index}: '{address}'"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Every address this deployment watches, with account xpubs expanded
    /// up to the gap limit. An xpub that fails to expand is logged and
    /// skipped; the remaining accounts still get imported.
    pub fn watch_addresses(&self) -> Vec<String> {
        let mut watch = Vec::new();

        for account in &self.accounts {
            if let Some(key) = &account.xpub {
                match xpub::derive_addresses(key, DEFAULT_GAP_LIMIT) {
                    Ok(derived) => watch.extend(derived),
                    Err(err) => {
                        let label = account.label.as_deref().unwrap_or("unlabeled");
                        warn!("Skipping xpub of account '{}': {}", label, err);
                    }
                }
            }

            watch.extend(account.addresses.iter().cloned());
        }

        watch
    }
}
