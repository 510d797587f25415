//! Plugin entry point.

use crate::config::PluginConfig;
use crate::error::{AuthError, ConfigError, SignError};
use crate::login;
use crate::provider::{IdentityProvider, OreIdClient, ProviderError};
use crate::session::{LoginContext, TransactContext};
use crate::sign;
use crate::types::{ChainDefinition, LoginResult, ResolvedSigningRequest, SignResult};

/// Wallet plugin backed by the ORE ID service.
///
/// Generic over the provider client so tests can substitute fakes. The
/// injected instance is the one authenticated session shared across
/// calls; nothing else in the plugin holds state between operations.
///
/// Exactly one login or sign operation is expected in flight per
/// instance. There is no internal mutual exclusion; concurrent calls
/// against the same underlying service session are undefined behavior
/// and callers must serialize requests.
pub struct WalletPlugin<P: IdentityProvider> {
    provider: P,
    config: PluginConfig,
}

impl WalletPlugin<OreIdClient> {
    /// Plugin against the configured service deployment.
    pub fn new(config: PluginConfig) -> Result<Self, ProviderError> {
        let provider =
            OreIdClient::new(config.app_id.clone())?.with_service_url(config.service_url.clone());
        Ok(Self::with_provider(provider, config))
    }
}

impl<P: IdentityProvider> WalletPlugin<P> {
    /// Build a plugin around an injected provider client.
    pub fn with_provider(provider: P, config: PluginConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// The injected provider client.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn check_supported(&self, chain: Option<&ChainDefinition>) -> Result<(), ConfigError> {
        if let Some(chain) = chain {
            if !self.config.supported_chains.contains(&chain.id) {
                return Err(ConfigError::UnsupportedChain {
                    chain: chain.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Acquire a signed-in account identity for the selected chain.
    pub async fn login(&self, ctx: &LoginContext) -> Result<LoginResult, AuthError> {
        self.check_supported(ctx.chain.as_ref())?;
        tracing::info!(
            chain = ctx.chain.as_ref().map(|c| c.name.as_str()),
            "starting login"
        );
        login::login(&self.provider, &self.config, ctx).await
    }

    /// Obtain authorization signatures for a resolved request.
    pub async fn sign(
        &self,
        request: &ResolvedSigningRequest,
        ctx: &TransactContext,
    ) -> Result<SignResult, SignError> {
        self.check_supported(ctx.chain.as_ref())?;
        tracing::info!(
            chain = ctx.chain.as_ref().map(|c| c.name.as_str()),
            actions = request.transaction.actions.len(),
            "starting signing"
        );
        sign::sign(&self.provider, &self.config, request, ctx).await
    }
}
