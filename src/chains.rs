//! Chain-to-network mapping and account resolution.
//!
//! The service buckets accounts by its own network identifiers; this
//! module owns the fixed table from chain id to network and picks the
//! account/key pair a login should use.

use crate::provider::ProviderAccount;
use crate::types::{ChainDefinition, Name, PublicKey};
use thiserror::Error;

/// Network identifiers understood by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainNetwork {
    WaxMain,
    WaxTest,
    UxMain,
    TelosMain,
    EosMain,
    OreTest,
}

impl ChainNetwork {
    /// The identifier used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainNetwork::WaxMain => "wax_main",
            ChainNetwork::WaxTest => "wax_test",
            ChainNetwork::UxMain => "ux_main",
            ChainNetwork::TelosMain => "telos_main",
            ChainNetwork::EosMain => "eos_main",
            ChainNetwork::OreTest => "ore_test",
        }
    }
}

/// The chains this plugin knows how to map, by chain id.
pub const KNOWN_CHAINS: &[(&str, ChainNetwork, &str)] = &[
    (
        "1064487b3cd1a897ce03ae5b6a865651747e2e152090f99c1d19d44e01aea5a4",
        ChainNetwork::WaxMain,
        "WAX (Mainnet)",
    ),
    (
        "f16b1833c747c43682f4386fca9cbb327929334a762755ebec17f6f23c9b8a12",
        ChainNetwork::WaxTest,
        "WAX (Testnet)",
    ),
    (
        "8fc6dce7942189f842170de953932b1f66693ad3788f766e777b6f9d22335c02",
        ChainNetwork::UxMain,
        "UX Network (Mainnet)",
    ),
    (
        "4667b205c6838ef70ff7988f6e8257e8be0e1284a2f59699054a018f743b1d11",
        ChainNetwork::TelosMain,
        "Telos (Mainnet)",
    ),
    (
        "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906",
        ChainNetwork::EosMain,
        "EOS (Mainnet)",
    ),
    (
        "a6df478d5593b4efb1ea20d13ba8a3efc1364ee0bf7dbd85d8d756831c0e3256",
        ChainNetwork::OreTest,
        "ORE (Testnet)",
    ),
];

/// Network used when `allow_fallback` is set and the chain is unmapped.
const FALLBACK_NETWORK: ChainNetwork = ChainNetwork::WaxMain;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain {0} does not map to a known network")]
    UnsupportedChain(String),
    #[error("the signed-in identity has no account on {0}")]
    NoAccountForChain(String),
    #[error("account {0} has no public keys")]
    NoPublicKey(Name),
    #[error("provider account entry is malformed: {0}")]
    Malformed(String),
}

/// The account/key pair selected for a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAccount {
    pub account: Name,
    pub public_key: PublicKey,
}

/// Map a chain to the service's network identifier.
///
/// An unmapped chain fails with [`ChainError::UnsupportedChain`] unless
/// `allow_fallback` was explicitly configured, in which case the fallback
/// bucket is used and a warning is logged.
pub fn network_for_chain(
    chain: &ChainDefinition,
    allow_fallback: bool,
) -> Result<ChainNetwork, ChainError> {
    let id = chain.id.to_string();
    if let Some((_, network, _)) = KNOWN_CHAINS.iter().find(|(known, _, _)| *known == id) {
        return Ok(*network);
    }
    if allow_fallback {
        tracing::warn!(
            chain = %chain.name,
            fallback = FALLBACK_NETWORK.as_str(),
            "chain is unmapped, using configured fallback network"
        );
        return Ok(FALLBACK_NETWORK);
    }
    Err(ChainError::UnsupportedChain(chain.name.clone()))
}

/// Select the account and first public key the provider holds for the
/// given chain.
///
/// Fails rather than substituting a placeholder when the matched account
/// carries no keys, and rejects malformed account entries outright.
pub fn resolve_account(
    chain: &ChainDefinition,
    accounts: &[ProviderAccount],
    allow_fallback: bool,
) -> Result<ResolvedAccount, ChainError> {
    let network = network_for_chain(chain, allow_fallback)?;

    let entry = accounts
        .iter()
        .find(|account| account.chain_network == network.as_str())
        .ok_or_else(|| ChainError::NoAccountForChain(chain.name.clone()))?;

    let account: Name = entry
        .chain_account
        .parse()
        .map_err(|_| ChainError::Malformed(entry.chain_account.clone()))?;

    let first_key = entry
        .public_keys
        .first()
        .ok_or_else(|| ChainError::NoPublicKey(account.clone()))?;
    let public_key: PublicKey = first_key
        .parse()
        .map_err(|_| ChainError::Malformed(first_key.clone()))?;

    Ok(ResolvedAccount {
        account,
        public_key,
    })
}
