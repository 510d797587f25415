//! Wallet plugin for session kits that delegates login and transaction
//! signing to the ORE ID identity service.
//!
//! The service is reachable two ways: silently, through a cached session
//! token, or interactively, through a browser popup. This crate
//! sequences those paths, resolves a chain-specific account and key from
//! the identity the service returns, dispatches signing requests, and
//! validates whatever transaction comes back against what was asked for.
//!
//! # Example
//!
//! ```rust,ignore
//! use oreid_wallet_plugin::{LoginContext, PluginConfig, TransactContext, WalletPlugin};
//!
//! #[tokio::main]
//! async fn main() -> eyre::Result<()> {
//!     let plugin = WalletPlugin::new(PluginConfig::default())?;
//!
//!     let ctx = LoginContext::new(wax_mainnet());
//!     let login = plugin.login(&ctx).await?;
//!     println!("signed in as {}", login.permission_level());
//!
//!     let sign_ctx = TransactContext::new(wax_mainnet())
//!         .with_whitelist(login.whitelisted_contracts.clone());
//!     let signed = plugin.sign(&resolved_request, &sign_ctx).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod chains;
pub mod config;
pub mod error;
pub mod login;
pub mod plugin;
pub mod provider;
pub mod session;
pub mod sign;
pub mod types;
pub mod validate;

// Re-export main types for convenience
pub use chains::{ChainNetwork, ResolvedAccount};
pub use config::PluginConfig;
pub use error::{AuthError, ConfigError, SignError};
pub use plugin::WalletPlugin;
pub use provider::{IdentityProvider, OreIdClient, ProviderError};
pub use session::{LoginContext, SessionUi, TransactContext};
pub use types::{
    ChainDefinition, ChainId, LoginResult, PermissionLevel, ResolvedSigningRequest, SignResult,
    WhitelistEntry,
};
pub use validate::validate_modifications;
