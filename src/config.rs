//! Plugin configuration.

use crate::chains::KNOWN_CHAINS;
use crate::types::ChainId;
use std::time::Duration;

/// Default window for interactive popup flows (5 minutes).
pub const DEFAULT_POPUP_TIMEOUT: Duration = Duration::from_millis(300_000);

/// Configuration for the wallet plugin.
#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Registered app id with the ORE ID service.
    pub app_id: String,
    /// Service deployment to talk to.
    pub service_url: String,
    /// Chains this plugin instance will offer to the session.
    pub supported_chains: Vec<ChainId>,
    /// How long the interactive login popup may stay unresolved.
    pub login_timeout: Duration,
    /// How long the signing popup may stay unresolved.
    pub sign_timeout: Duration,
    /// Map unknown chains onto the default network bucket instead of
    /// failing. Off unless a deployment explicitly opts in.
    pub allow_network_fallback: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginConfig {
    /// Configuration against the production service, supporting every
    /// chain in the built-in table.
    pub fn new() -> Self {
        Self {
            app_id: "t_515b4ffcfdbf42a986a927481e6baf82".to_string(),
            service_url: "https://service.oreid.io".to_string(),
            supported_chains: KNOWN_CHAINS
                .iter()
                .map(|(id, _, _)| id.parse().unwrap())
                .collect(),
            login_timeout: DEFAULT_POPUP_TIMEOUT,
            sign_timeout: DEFAULT_POPUP_TIMEOUT,
            allow_network_fallback: false,
        }
    }

    /// Use a different registered app id.
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    /// Point at a different service deployment.
    pub fn with_service_url(mut self, service_url: impl Into<String>) -> Self {
        self.service_url = service_url.into();
        self
    }

    /// Restrict the chains offered to the session.
    pub fn with_supported_chains(mut self, chains: Vec<ChainId>) -> Self {
        self.supported_chains = chains;
        self
    }

    /// Override the interactive login window.
    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// Override the signing window.
    pub fn with_sign_timeout(mut self, timeout: Duration) -> Self {
        self.sign_timeout = timeout;
        self
    }

    /// Opt in to bucketing unknown chains onto the default network.
    pub fn with_network_fallback(mut self, allow: bool) -> Self {
        self.allow_network_fallback = allow;
        self
    }
}
