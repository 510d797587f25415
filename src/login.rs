//! Login orchestration.
//!
//! The flow runs `Idle -> AttemptingSilent -> AttemptingPopup`, stopping
//! at the first path that yields a verified response: a cached session is
//! exchanged for a fresh assertion without user interaction, and only
//! when that is unavailable does the interactive popup open. Both paths
//! normalize into the same canonical [`LoginResult`] before returning.

use crate::cancel::{race, RaceOutcome};
use crate::chains::{self, ChainError};
use crate::config::PluginConfig;
use crate::error::{AuthError, ConfigError};
use crate::provider::{AuthParams, IdentityProvider, ProviderError, ProviderLoginResponse};
use crate::session::LoginContext;
use crate::types::{ChainDefinition, LoginResult, WhitelistEntry};

pub async fn login<P: IdentityProvider>(
    provider: &P,
    config: &PluginConfig,
    ctx: &LoginContext,
) -> Result<LoginResult, AuthError> {
    let chain = ctx
        .chain
        .as_ref()
        .ok_or(ConfigError::NoChainSelected { operation: "login" })?;
    let ui = &ctx.ui;

    ui.status(&ui.translate("connecting", "Connecting to ORE ID", &[]));

    if !provider.is_initialized() {
        provider.init().await.map_err(|source| AuthError::NoResponse {
            message: ui.translate("login.error.response", "ORE ID failed to respond", &[]),
            source: Some(source),
        })?;
    }

    let (auto, response) = match auto_login(provider).await {
        Some(response) => (true, response),
        None => {
            ui.status(&ui.translate(
                "login.popup",
                "Login with the ORE ID popup window",
                &[],
            ));
            (false, popup_login(provider, config, ctx).await?)
        }
    };

    normalize(chain, config, ctx, auto, response)
}

/// Attempt the silent path. Any failure here falls through to the popup
/// flow rather than failing the login.
async fn auto_login<P: IdentityProvider>(provider: &P) -> Option<ProviderLoginResponse> {
    if !provider.is_logged_in() {
        return None;
    }
    let token = provider.session_token()?;

    match provider.login_with_token(&token).await {
        Ok(response) => {
            tracing::debug!("silent login succeeded");
            Some(response)
        }
        Err(err) => {
            tracing::warn!(error = %err, "silent login failed, falling back to popup");
            None
        }
    }
}

/// Run the interactive popup, bounded by the configured login timeout and
/// the session's cancellation token.
async fn popup_login<P: IdentityProvider>(
    provider: &P,
    config: &PluginConfig,
    ctx: &LoginContext,
) -> Result<ProviderLoginResponse, AuthError> {
    let ui = &ctx.ui;
    let operation = provider.popup_auth(AuthParams::default());

    match race(operation, &ctx.cancel, config.login_timeout).await {
        RaceOutcome::Completed(Ok(response)) => Ok(response),
        RaceOutcome::Completed(Err(ProviderError::PopupClosed)) => {
            Err(AuthError::UserCanceled {
                message: ui.translate(
                    "error.closed",
                    "ORE ID was closed before the login was completed",
                    &[],
                ),
            })
        }
        RaceOutcome::Completed(Err(ProviderError::PopupBlocked(_))) => {
            Err(AuthError::PopupBlocked {
                message: ui.translate(
                    "error.popup",
                    "Unable to open the popup window. Check your browser settings and try again.",
                    &[],
                ),
            })
        }
        RaceOutcome::Completed(Err(ProviderError::Denied)) => Err(AuthError::NotVerified {
            message: ui.translate("login.error.denied", "ORE ID denied the login request", &[]),
        }),
        RaceOutcome::Completed(Err(source)) => Err(AuthError::NoResponse {
            message: ui.translate("login.error.response", "ORE ID failed to respond", &[]),
            source: Some(source),
        }),
        RaceOutcome::Canceled => Err(AuthError::UserCanceled {
            message: ui.translate("error.canceled", "The login request was canceled", &[]),
        }),
        RaceOutcome::TimedOut => Err(AuthError::Timeout {
            message: ui.translate(
                "error.timeout",
                "The request has timed out after {{timeout}} seconds. Please try again.",
                &[("timeout", (config.login_timeout.as_secs()).to_string())],
            ),
        }),
    }
}

/// Normalize a provider response into the canonical login result.
///
/// A result leaves here only when the provider asserted a verified
/// identity and a chain account with a real key could be resolved.
fn normalize(
    chain: &ChainDefinition,
    config: &PluginConfig,
    ctx: &LoginContext,
    auto: bool,
    response: ProviderLoginResponse,
) -> Result<LoginResult, AuthError> {
    let ui = &ctx.ui;

    if !response.verified {
        return Err(AuthError::NotVerified {
            message: ui.translate(
                "error.closed",
                "ORE ID was closed before the login was completed",
                &[],
            ),
        });
    }

    let resolved = chains::resolve_account(
        chain,
        &response.chain_accounts,
        config.allow_network_fallback,
    )
    .map_err(|err| match err {
        ChainError::Malformed(detail) => {
            tracing::warn!(detail = %detail, "provider account set is malformed");
            AuthError::NoResponse {
                message: ui.translate("login.error.response", "ORE ID failed to respond", &[]),
                source: None,
            }
        }
        other => {
            tracing::debug!(error = %other, "account resolution failed");
            AuthError::NoAccountForChain {
                message: ui.translate(
                    "login.error.chain",
                    "No {{chain}} account is linked to this ORE ID",
                    &[("chain", chain.name.clone())],
                ),
            }
        }
    })?;

    let mut whitelist = Vec::with_capacity(response.whitelisted_contracts.len());
    for entry in &response.whitelisted_contracts {
        let contract = entry.contract.parse().map_err(|_| AuthError::NoResponse {
            message: ui.translate("login.error.response", "ORE ID failed to respond", &[]),
            source: None,
        })?;
        let mut recipients = Vec::with_capacity(entry.recipients.len());
        for recipient in &entry.recipients {
            recipients.push(recipient.parse().map_err(|_| AuthError::NoResponse {
                message: ui.translate("login.error.response", "ORE ID failed to respond", &[]),
                source: None,
            })?);
        }
        whitelist.push(WhitelistEntry {
            contract,
            recipients,
        });
    }

    Ok(LoginResult {
        auto,
        account: resolved.account,
        public_keys: vec![resolved.public_key],
        verified: true,
        whitelisted_contracts: whitelist,
    })
}
