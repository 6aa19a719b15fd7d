//! Client configuration

use serde::Deserialize;

/// Options fixed when a client is constructed
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Log full request and response bodies at debug level
    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            debug: false,
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!("sqslite/{}", env!("CARGO_PKG_VERSION"))
}
