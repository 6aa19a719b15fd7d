//! Configuration management

use anyhow::{anyhow, Context as _};
use serde::Deserialize;
use sqslite::{ClientConfig, Credentials, Region};
use std::path::Path;

/// Settings merged from the config file and `SQSLITE_*` variables
#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub access_key: Option<String>,

    #[serde(default)]
    pub secret_key: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    /// Overrides the region's EC2 endpoint, e.g. a local test service
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            access_key: None,
            secret_key: None,
            region: default_region(),
            endpoint: None,
            debug: false,
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Settings {
    /// Load configuration from file and environment
    ///
    /// Without an explicit path, `sqslite.{toml,json,yaml,...}` in the working
    /// directory is used if present.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("sqslite").required(false),
        };

        let config = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix("SQSLITE"))
            .build()?;

        Ok(config.try_deserialize::<Settings>()?)
    }

    pub fn credentials(&self) -> anyhow::Result<Credentials> {
        let access_key = self
            .access_key
            .as_deref()
            .context("no access key; pass --access-key or set SQSLITE_ACCESS_KEY")?;
        let secret_key = self
            .secret_key
            .as_deref()
            .context("no secret key; pass --secret-key or set SQSLITE_SECRET_KEY")?;

        Ok(Credentials::new(access_key, secret_key))
    }

    pub fn region(&self) -> anyhow::Result<Region> {
        match &self.endpoint {
            Some(endpoint) => Ok(Region::new(self.region.clone(), endpoint.clone())),
            None => Region::from_name(&self.region).ok_or_else(|| {
                let known: Vec<String> = Region::known().map(|r| r.name).collect();
                anyhow!(
                    "unknown region {}; expected one of {} or an --endpoint",
                    self.region,
                    known.join(", ")
                )
            }),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            debug: self.debug,
            ..ClientConfig::default()
        }
    }
}
