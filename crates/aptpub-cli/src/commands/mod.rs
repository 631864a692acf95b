//! CLI commands

use std::sync::Arc;

use aptpub_client::{AptlyApi, AptlyClient, ClientConfig, Credentials};
use aptpub_core::PublicationId;
use aptpub_engine::CancelFlag;

use crate::error::{CliError, Result};

pub mod cleanup;
pub mod dump;
pub mod promote;
pub mod publish;
pub mod purge;
pub mod restore;

/// Connection flags shared by every command
#[derive(Debug, Clone)]
pub struct Connection {
    pub url: Option<String>,
    pub timeout: u64,
    pub dry_run: bool,
    pub storage: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Connection {
    /// Client settings from the flags, falling back to the saved client config
    pub fn client_config(&self) -> Result<ClientConfig> {
        let config = match &self.url {
            Some(url) => ClientConfig::new(url.as_str())?.with_timeout(self.timeout),
            None => ClientConfig::load()?.ok_or_else(|| {
                CliError::usage_with_help(
                    "No aptly API URL given",
                    "pass --url or set APTLY_URL",
                )
            })?,
        };

        let config = match (&self.user, &self.password) {
            (Some(user), Some(password)) => {
                config.with_credentials(Credentials::basic(user.as_str(), password.as_str()))
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(CliError::usage(
                    "--user and --password must be given together",
                ));
            }
            (None, None) => config,
        };

        let dry_run = self.dry_run || config.dry_run;
        Ok(config.with_dry_run(dry_run))
    }

    /// Connect and check that the service answers
    pub async fn connect(&self) -> Result<Arc<dyn AptlyApi>> {
        let config = self.client_config()?;
        if config.dry_run {
            tracing::warn!("Dry run: no change will be made on {}", config.url);
        }
        let client = AptlyClient::connect(&config).await?;
        Ok(Arc::new(client))
    }

    /// Parse a publication name, defaulting to `--storage`
    pub fn publication(&self, name: &str) -> Result<PublicationId> {
        Ok(PublicationId::parse(name, &self.storage)?)
    }
}

/// Tag for snapshots created by this run
pub fn timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Flag set when the user presses Ctrl-C
pub fn cancel_on_interrupt() -> CancelFlag {
    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current request");
            flag.cancel();
        }
    });
    cancel
}
