use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use snafu::ResultExt;

use crate::auth::Authenticator;
use crate::database::DatabaseConfig;
use crate::error::{ApplicationError, ConfigLoadSnafu};

/// Settings read from the environment (and `.env`, when present).
#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(rename = "host_address", default = "default_host")]
    pub host: SocketAddr,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(flatten)]
    pub database: DatabaseConfig,

    pub jwt_secret: SecretString,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_token_ttl")]
    pub token_ttl: humantime::Duration,

    /// Upper bound for a single counter store call.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_store_timeout")]
    pub store_timeout: humantime::Duration,
    /// Period of the counter reconciliation sweep, disabled when unset.
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub recount_interval: Option<humantime::Duration>,
}

impl Config {
    pub fn from_env() -> Result<Config, ApplicationError> {
        envy::from_env::<Config>().context(ConfigLoadSnafu)
    }

    pub fn authenticator(&self) -> Authenticator {
        Authenticator::new(self.jwt_secret.clone(), self.token_ttl.into())
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout.into()
    }

    pub fn recount_interval(&self) -> Option<Duration> {
        self.recount_interval.map(Into::into)
    }
}

fn default_host() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3001))
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_token_ttl() -> humantime::Duration {
    Duration::from_secs(24 * 60 * 60).into()
}

fn default_store_timeout() -> humantime::Duration {
    Duration::from_secs(5).into()
}
