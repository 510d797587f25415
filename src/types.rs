//! Data model shared between the coordinators and the provider seam.
//!
//! Transactions travel through this crate as structured JSON. The binary
//! wire encoding of the underlying transaction format is owned by the
//! service; the only envelope this crate decodes is the base64 JSON body
//! the signer echoes back (see [`crate::provider`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when parsing the primitive wire types.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid chain id: {0}")]
    ChainId(String),
    #[error("invalid name: {0}")]
    Name(String),
    #[error("invalid public key: {0}")]
    PublicKey(String),
    #[error("invalid signature: {0}")]
    Signature(String),
}

/// A 32-byte chain identifier, rendered as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainId([u8; 32]);

impl ChainId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for ChainId {
    fn from(bytes: [u8; 32]) -> Self {
        ChainId(bytes)
    }
}

impl FromStr for ChainId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| ParseError::ChainId(s.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ParseError::ChainId(s.to_string()))?;
        Ok(ChainId(bytes))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl TryFrom<String> for ChainId {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ChainId> for String {
    fn from(id: ChainId) -> String {
        id.to_string()
    }
}

/// The chain a login or signing operation targets, as selected by the
/// calling session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainDefinition {
    pub id: ChainId,
    pub name: String,
}

/// An account, permission, contract or action name.
///
/// Follows the on-chain name rules: 1 to 13 characters drawn from
/// `a-z`, `1-5` and `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Name {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid_len = !s.is_empty() && s.len() <= 13;
        let valid_chars = s
            .chars()
            .all(|c| c.is_ascii_lowercase() || ('1'..='5').contains(&c) || c == '.');
        if !valid_len || !valid_chars {
            return Err(ParseError::Name(s.to_string()));
        }
        Ok(Name(s.to_string()))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Name {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Name> for String {
    fn from(name: Name) -> String {
        name.0
    }
}

/// A public key in the service's textual encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey(String);

impl PublicKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PublicKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let known_prefix = s.starts_with("PUB_K1_")
            || s.starts_with("PUB_R1_")
            || s.starts_with("PUB_WA_")
            || s.starts_with("EOS");
        if !known_prefix || s.len() < 8 {
            return Err(ParseError::PublicKey(s.to_string()));
        }
        Ok(PublicKey(s.to_string()))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PublicKey {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> String {
        key.0
    }
}

/// A transaction signature in textual encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Signature {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let known_prefix =
            s.starts_with("SIG_K1_") || s.starts_with("SIG_R1_") || s.starts_with("SIG_WA_");
        if !known_prefix || s.len() < 8 {
            return Err(ParseError::Signature(s.to_string()));
        }
        Ok(Signature(s.to_string()))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Signature {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Signature> for String {
    fn from(sig: Signature) -> String {
        sig.0
    }
}

/// The account/permission pair authorized to act.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionLevel {
    pub actor: Name,
    pub permission: Name,
}

impl PermissionLevel {
    pub fn new(actor: Name, permission: Name) -> Self {
        Self { actor, permission }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.actor, self.permission)
    }
}

/// Raw action payload, rendered as hex on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl Serialize for Bytes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map(Bytes).map_err(serde::de::Error::custom)
    }
}

/// A single action with its raw (undecoded) payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub account: Name,
    pub name: Name,
    pub authorization: Vec<PermissionLevel>,
    pub data: Bytes,
}

/// A transaction body as this crate sees it: header fields plus the
/// ordered action list. Comparison is plain structural equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Expiration as POSIX seconds.
    pub expiration: u32,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub actions: Vec<Action>,
}

/// An action whose payload has been decoded to structured data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAction {
    pub account: Name,
    pub name: Name,
    pub authorization: Vec<PermissionLevel>,
    pub data: serde_json::Value,
}

/// The decoded view of a transaction's actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTransaction {
    pub actions: Vec<ResolvedAction>,
}

/// A transaction request together with its fully decoded action data,
/// ready for presentation or signing.
///
/// Owned by the calling session and read-only to this crate; a modified
/// transaction is always returned as a new request, never written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSigningRequest {
    pub chain_id: ChainId,
    pub transaction: Transaction,
    pub resolved_transaction: ResolvedTransaction,
    pub signer: PermissionLevel,
}

/// A transaction body echoed back by the signer, with the chain it was
/// signed for when the service reports one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReturnedTransaction {
    #[serde(default)]
    pub chain_id: Option<ChainId>,
    pub transaction: Transaction,
}

/// A contract/recipient pair eligible for unattended signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub contract: Name,
    #[serde(default)]
    pub recipients: Vec<Name>,
}

/// Canonical result of a completed login, regardless of which provider
/// path produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResult {
    /// Whether the cached-session path satisfied the login.
    pub auto: bool,
    pub account: Name,
    pub public_keys: Vec<PublicKey>,
    pub verified: bool,
    pub whitelisted_contracts: Vec<WhitelistEntry>,
}

impl LoginResult {
    /// The permission level the session should act under.
    pub fn permission_level(&self) -> PermissionLevel {
        PermissionLevel {
            actor: self.account.clone(),
            permission: "active".parse().unwrap(),
        }
    }
}

/// Canonical result of a completed signing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignResult {
    /// At least one signature; adapters reject empty responses before a
    /// result is ever constructed.
    pub signatures: Vec<Signature>,
    /// Present only when the signer returned a transaction that differs
    /// from the request in a permitted way.
    pub replacement_request: Option<ResolvedSigningRequest>,
}
