//! Signing orchestration.
//!
//! A signing pass builds a provider-native transaction from every action
//! of the resolved request, registers it with the service, drives the
//! popup to completion under the session's timeout and cancellation, and
//! then refuses to trust the response: signatures must parse, fees are
//! rejected outright, and an echoed transaction body must pass the
//! modification policy before it can become a replacement request.

use crate::cancel::{race, RaceOutcome};
use crate::chains;
use crate::config::PluginConfig;
use crate::error::{ConfigError, SignError};
use crate::provider::{
    IdentityProvider, ProviderError, SignOptions, SignParams, TransactionData,
};
use crate::session::TransactContext;
use crate::types::{
    ChainDefinition, ResolvedAction, ResolvedSigningRequest, ResolvedTransaction,
    ReturnedTransaction, SignResult, Signature, WhitelistEntry,
};
use crate::validate::validate_modifications;

pub async fn sign<P: IdentityProvider>(
    provider: &P,
    config: &PluginConfig,
    request: &ResolvedSigningRequest,
    ctx: &TransactContext,
) -> Result<SignResult, SignError> {
    let chain = ctx
        .chain
        .as_ref()
        .ok_or(ConfigError::NoChainSelected { operation: "sign" })?;
    let ui = &ctx.ui;

    if !provider.is_initialized() {
        provider.init().await.map_err(|source| SignError::NoResponse {
            message: ui.translate("sign.error.response", "ORE ID failed to respond", &[]),
            source: Some(source),
        })?;
    }

    let data = build_transaction_data(chain, config, request)?;
    let allow_unattended = provider.is_logged_in() && allow_autosign(request, &ctx.whitelist);

    ui.status(&ui.translate(
        "transact.popup",
        "Sign with the ORE ID popup window",
        &[],
    ));

    let operation = async {
        let handle = provider.create_transaction(data).await?;
        provider
            .popup_sign(SignParams {
                transaction: handle,
                allow_unattended,
            })
            .await
    };

    let response = match race(operation, &ctx.cancel, config.sign_timeout).await {
        RaceOutcome::Completed(Ok(response)) => response,
        RaceOutcome::Completed(Err(ProviderError::PopupClosed)) => {
            return Err(SignError::UserCanceled {
                message: ui.translate(
                    "error.closed",
                    "ORE ID was closed before the request was completed",
                    &[],
                ),
            })
        }
        RaceOutcome::Completed(Err(ProviderError::Denied)) => {
            return Err(SignError::NotVerified {
                message: ui.translate(
                    "sign.error.denied",
                    "ORE ID denied the signing request",
                    &[],
                ),
            })
        }
        RaceOutcome::Completed(Err(source)) => {
            return Err(SignError::NoResponse {
                message: ui.translate("sign.error.response", "ORE ID failed to respond", &[]),
                source: Some(source),
            })
        }
        RaceOutcome::Canceled => {
            return Err(SignError::UserCanceled {
                message: ui.translate("error.canceled", "The signing request was canceled", &[]),
            })
        }
        RaceOutcome::TimedOut => {
            return Err(SignError::Timeout {
                message: ui.translate(
                    "error.timeout",
                    "The request has timed out after {{timeout}} seconds. Please try again.",
                    &[("timeout", config.sign_timeout.as_secs().to_string())],
                ),
            })
        }
    };

    if !response.verified {
        return Err(SignError::NotVerified {
            message: ui.translate(
                "error.closed",
                "ORE ID was closed before the request was completed",
                &[],
            ),
        });
    }

    if let Some((field, amount)) = response.charged_fee() {
        tracing::debug!(field, amount, "rejecting fee-bearing response");
        return Err(SignError::FeeNotSupported {
            message: ui.translate(
                "error.fee",
                "The transaction requires a fee, and the fee interface is not supported",
                &[],
            ),
        });
    }

    let mut signatures = Vec::with_capacity(response.signatures.len());
    for raw in &response.signatures {
        let signature: Signature = raw.parse().map_err(|_| SignError::NoResponse {
            message: ui.translate("sign.error.response", "ORE ID failed to respond", &[]),
            source: Some(ProviderError::Malformed(format!("signature: {raw}"))),
        })?;
        signatures.push(signature);
    }
    if signatures.is_empty() {
        return Err(SignError::NoResponse {
            message: ui.translate("sign.error.response", "ORE ID failed to respond", &[]),
            source: Some(ProviderError::Malformed("response carried no signatures".into())),
        });
    }

    let mut replacement_request = None;
    let returned = response
        .decode_signed_transaction()
        .map_err(|source| SignError::NoResponse {
            message: ui.translate("sign.error.response", "ORE ID failed to respond", &[]),
            source: Some(source),
        })?;
    if let Some(returned) = returned {
        if returned.transaction != request.transaction {
            validate_modifications(request.chain_id, &request.transaction, &returned).map_err(
                |source| SignError::ModificationRejected {
                    message: ui.translate(
                        "error.modified",
                        "The transaction was modified by ORE ID in an unauthorized way",
                        &[],
                    ),
                    source,
                },
            )?;
            tracing::debug!("signer returned a permitted variant of the transaction");
            replacement_request = Some(build_replacement(request, returned));
        }
    }

    Ok(SignResult {
        signatures,
        replacement_request,
    })
}

/// Whether every action of the request is covered by the session's
/// unattended-signing whitelist.
///
/// Token transfers are gated on the decoded recipient as well; an entry
/// without the recipient listed, or a payload the decode cannot see a
/// recipient in, keeps the prompt.
pub fn allow_autosign(request: &ResolvedSigningRequest, whitelist: &[WhitelistEntry]) -> bool {
    if whitelist.is_empty() {
        return false;
    }
    request.resolved_transaction.actions.iter().all(|action| {
        whitelist.iter().any(|entry| {
            if action.account != entry.contract {
                return false;
            }
            if action.account.as_str() == "eosio.token" && action.name.as_str() == "transfer" {
                return action
                    .data
                    .get("to")
                    .and_then(|to| to.as_str())
                    .map(|to| entry.recipients.iter().any(|r| r.as_str() == to))
                    .unwrap_or(false);
            }
            true
        })
    })
}

/// Build the provider-native transaction from the resolved request,
/// carrying every action.
fn build_transaction_data(
    chain: &ChainDefinition,
    config: &PluginConfig,
    request: &ResolvedSigningRequest,
) -> Result<TransactionData, SignError> {
    let network = chains::network_for_chain(chain, config.allow_network_fallback)
        .map_err(|_| ConfigError::UnsupportedChain {
            chain: chain.name.clone(),
        })?;

    let tx_actions = &request.transaction.actions;
    let resolved_actions = &request.resolved_transaction.actions;
    if tx_actions.len() != resolved_actions.len() {
        return Err(ConfigError::MalformedRequest {
            detail: format!(
                "{} actions but {} resolved payloads",
                tx_actions.len(),
                resolved_actions.len()
            ),
        }
        .into());
    }

    let actions = tx_actions
        .iter()
        .zip(resolved_actions)
        .map(|(action, resolved)| ResolvedAction {
            account: action.account.clone(),
            name: action.name.clone(),
            authorization: action.authorization.clone(),
            data: resolved.data.clone(),
        })
        .collect();

    Ok(TransactionData {
        chain_account: request.signer.actor.clone(),
        chain_network: network.as_str().to_string(),
        actions,
        sign_options: SignOptions::default(),
        expire_seconds: None,
    })
}

/// Package a validated variant as a fresh request. Actions matched to the
/// original keep their decoded payloads; appended fee actions keep their
/// raw hex, since decoding foreign payloads is the service's business.
fn build_replacement(
    request: &ResolvedSigningRequest,
    returned: ReturnedTransaction,
) -> ResolvedSigningRequest {
    let originals = request.transaction.actions.len();
    let actions = returned
        .transaction
        .actions
        .iter()
        .enumerate()
        .map(|(index, action)| {
            if index < originals {
                request.resolved_transaction.actions[index].clone()
            } else {
                ResolvedAction {
                    account: action.account.clone(),
                    name: action.name.clone(),
                    authorization: action.authorization.clone(),
                    data: serde_json::Value::String(action.data.to_hex()),
                }
            }
        })
        .collect();

    ResolvedSigningRequest {
        chain_id: returned.chain_id.unwrap_or(request.chain_id),
        transaction: returned.transaction,
        resolved_transaction: ResolvedTransaction { actions },
        signer: request.signer.clone(),
    }
}
