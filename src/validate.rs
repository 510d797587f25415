//! Acceptance policy for transactions echoed back by the signer.
//!
//! The signer may append fee actions from known system contracts but may
//! never remove, reorder or mutate what was requested. The check is a
//! structural comparison: every requested action must survive
//! byte-identical, in order, as a prefix of the returned action list, and
//! anything after that prefix must match the fee allowlist.

use crate::types::{ChainId, ReturnedTransaction, Transaction};
use thiserror::Error;

/// `(contract, action)` pairs the service is allowed to append to cover
/// resource fees.
pub const FEE_ACTION_ALLOWLIST: &[(&str, &str)] = &[
    ("eosio", "buyrambytes"),
    ("eosio.token", "transfer"),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModificationError {
    #[error("the returned transaction targets a different chain")]
    ChainIdChanged,
    #[error("the returned transaction has a different expiration")]
    ExpirationChanged,
    #[error("the returned transaction references a different block")]
    ReferenceBlockChanged,
    #[error("action #{index} was removed from the transaction")]
    ActionRemoved { index: usize },
    #[error("action #{index} was modified in place")]
    ActionModified { index: usize },
    #[error("action #{index} was moved out of order")]
    ActionReordered { index: usize },
    #[error("unauthorized action {contract}::{action} was added")]
    ActionAdded { contract: String, action: String },
}

/// Check that `returned` is a safe variant of the originally requested
/// transaction.
pub fn validate_modifications(
    original_chain: ChainId,
    original: &Transaction,
    returned: &ReturnedTransaction,
) -> Result<(), ModificationError> {
    if let Some(chain_id) = returned.chain_id {
        if chain_id != original_chain {
            return Err(ModificationError::ChainIdChanged);
        }
    }

    let body = &returned.transaction;
    if body.expiration != original.expiration {
        return Err(ModificationError::ExpirationChanged);
    }
    if body.ref_block_num != original.ref_block_num
        || body.ref_block_prefix != original.ref_block_prefix
    {
        return Err(ModificationError::ReferenceBlockChanged);
    }

    // Requested actions must survive as an untouched prefix.
    for (index, requested) in original.actions.iter().enumerate() {
        match body.actions.get(index) {
            None => return Err(ModificationError::ActionRemoved { index }),
            Some(got) if got == requested => {}
            Some(got) => {
                // Distinguish a shuffle from an in-place edit for the
                // error message; both are rejected unconditionally.
                if original.actions.iter().any(|a| a == got) {
                    return Err(ModificationError::ActionReordered { index });
                }
                return Err(ModificationError::ActionModified { index });
            }
        }
    }

    // Anything appended must be a known fee-injection pattern.
    for added in &body.actions[original.actions.len()..] {
        let allowed = FEE_ACTION_ALLOWLIST
            .iter()
            .any(|(contract, action)| {
                added.account.as_str() == *contract && added.name.as_str() == *action
            });
        if !allowed {
            return Err(ModificationError::ActionAdded {
                contract: added.account.to_string(),
                action: added.name.to_string(),
            });
        }
    }

    Ok(())
}
