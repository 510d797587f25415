//! The identity-provider seam.
//!
//! Everything the plugin needs from the external service is expressed as
//! the [`IdentityProvider`] trait; coordinators never talk to the network
//! directly. The client instance is injected through the plugin
//! constructor so tests can substitute fakes and separate plugin
//! instances share no hidden state. [`OreIdClient`] is the production
//! implementation.
//!
//! Responses are duck-typed on the wire: every field the service may omit
//! is optional here, and the adapters in the coordinators reject
//! non-conforming shapes instead of patching them up.

mod oreid;

pub use oreid::OreIdClient;

use crate::types::{Name, ResolvedAction, ReturnedTransaction};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Failures at the provider boundary, before the coordinators translate
/// them into the canonical error kinds.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service returned {status}: {body}")]
    Endpoint { status: u16, body: String },
    #[error("malformed service response: {0}")]
    Malformed(String),
    #[error("the popup window could not be opened: {0}")]
    PopupBlocked(String),
    #[error("the popup was closed before the request completed")]
    PopupClosed,
    #[error("the request was denied")]
    Denied,
    #[error("the client has not been initialized")]
    NotInitialized,
    #[error("no signed-in session is available")]
    NoSession,
}

/// Parameters for the interactive popup login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthParams {
    /// External auth provider to present, e.g. `google`.
    pub provider: String,
    /// Defer on-chain wallet creation until first use.
    pub delay_wallet_setup: bool,
}

impl Default for AuthParams {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
            delay_wallet_setup: true,
        }
    }
}

/// Signing options forwarded with every transaction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOptions {
    pub broadcast: bool,
    pub return_signed_transaction: bool,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            broadcast: false,
            return_signed_transaction: true,
        }
    }
}

/// A provider-native transaction to be created ahead of signing.
///
/// Carries every action of the request; the decoded payloads are what the
/// service renders for user approval.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    pub chain_account: Name,
    pub chain_network: String,
    pub actions: Vec<ResolvedAction>,
    pub sign_options: SignOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_seconds: Option<u32>,
}

/// Handle to a transaction the service has accepted for signing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionHandle {
    pub transaction_id: String,
}

/// Parameters for popup-based signing.
#[derive(Debug, Clone)]
pub struct SignParams {
    pub transaction: TransactionHandle,
    /// Set when the whitelist permits resolving without a prompt; the
    /// service still decides whether a popup is required.
    pub allow_unattended: bool,
}

/// One account entry of the provider's account set.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAccount {
    pub chain_network: String,
    pub chain_account: String,
    #[serde(default)]
    pub public_keys: Vec<String>,
    #[serde(default)]
    pub default_permission: Option<String>,
}

/// Wire shape of a whitelist entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderWhitelistEntry {
    pub contract: String,
    #[serde(default)]
    pub recipients: Vec<String>,
}

/// What either login path returns.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderLoginResponse {
    #[serde(default)]
    pub auto_login: bool,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub chain_accounts: Vec<ProviderAccount>,
    #[serde(default)]
    pub whitelisted_contracts: Vec<ProviderWhitelistEntry>,
}

/// What popup signing returns.
///
/// `cpu`/`net`/`ram` are resource estimates; `Fee` and `ramFee` are
/// charges the service wants accepted, and cause the whole operation to
/// be rejected upstream.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSigningResponse {
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub signatures: Vec<String>,
    /// Signed transaction body, base64 over the JSON encoding.
    #[serde(default)]
    pub signed_transaction: Option<String>,
    #[serde(default, rename = "Fee")]
    pub fee: Option<f64>,
    #[serde(default)]
    pub ram_fee: Option<f64>,
    #[serde(default)]
    pub cpu: Option<f64>,
    #[serde(default)]
    pub net: Option<f64>,
    #[serde(default)]
    pub ram: Option<f64>,
}

impl ProviderSigningResponse {
    /// The first fee field that is present and non-zero, if any.
    pub fn charged_fee(&self) -> Option<(&'static str, f64)> {
        [("Fee", self.fee), ("ramFee", self.ram_fee)]
            .into_iter()
            .find_map(|(field, value)| match value {
                Some(v) if v != 0.0 => Some((field, v)),
                _ => None,
            })
    }

    /// Decode the echoed transaction body, when one was returned.
    pub fn decode_signed_transaction(
        &self,
    ) -> Result<Option<ReturnedTransaction>, ProviderError> {
        let Some(encoded) = &self.signed_transaction else {
            return Ok(None);
        };
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| ProviderError::Malformed(format!("signed transaction: {e}")))?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ProviderError::Malformed(format!("signed transaction: {e}")))
    }
}

/// The external identity/custody service.
///
/// Mirrors exactly what the coordinators consume: initialization, the
/// cached-session flags, token-based silent login, popup login,
/// transaction creation and popup signing. Popup transport mechanics are
/// the implementation's business.
pub trait IdentityProvider: Send + Sync {
    /// One-time service handshake; idempotent.
    fn init(&self) -> impl Future<Output = Result<(), ProviderError>> + Send;

    fn is_initialized(&self) -> bool;

    /// Whether a cached session is available for silent login.
    fn is_logged_in(&self) -> bool;

    /// The cached session token, when one is held.
    fn session_token(&self) -> Option<String>;

    /// Exchange a cached session token for a fresh login assertion
    /// without user interaction.
    fn login_with_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<ProviderLoginResponse, ProviderError>> + Send;

    /// Interactive popup login. Resolves when the popup settles; the
    /// caller bounds the wait.
    fn popup_auth(
        &self,
        params: AuthParams,
    ) -> impl Future<Output = Result<ProviderLoginResponse, ProviderError>> + Send;

    /// Register a transaction with the service ahead of signing.
    fn create_transaction(
        &self,
        data: TransactionData,
    ) -> impl Future<Output = Result<TransactionHandle, ProviderError>> + Send;

    /// Popup-based signing of a previously created transaction. Resolves
    /// when the popup settles; the caller bounds the wait.
    fn popup_sign(
        &self,
        params: SignParams,
    ) -> impl Future<Output = Result<ProviderSigningResponse, ProviderError>> + Send;
}
