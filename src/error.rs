//! Typed failures surfaced to the calling session.
//!
//! Provider-level errors are caught at the coordinator boundary and
//! re-raised as one of these kinds, carrying a message already localized
//! through the session's translate function. No failure path produces a
//! successful result, and no retries happen here; retry policy belongs to
//! the caller.

use crate::provider::ProviderError;
use crate::validate::ModificationError;
use thiserror::Error;

/// Problems with how the plugin was invoked, independent of the service.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("a chain must be selected to {operation} with")]
    NoChainSelected { operation: &'static str },
    #[error("chain {chain} is not supported by this wallet")]
    UnsupportedChain { chain: String },
    #[error("the resolved request is malformed: {detail}")]
    MalformedRequest { detail: String },
}

/// Failures of the login flow.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Neither the silent nor the popup path produced a usable response.
    #[error("{message}")]
    NoResponse {
        message: String,
        #[source]
        source: Option<ProviderError>,
    },
    /// The service answered but did not assert a verified identity.
    #[error("{message}")]
    NotVerified { message: String },
    /// The session canceled the operation, or the user closed the popup.
    #[error("{message}")]
    UserCanceled { message: String },
    /// The popup window could not be opened.
    #[error("{message}")]
    PopupBlocked { message: String },
    /// The interactive window elapsed before the popup settled.
    #[error("{message}")]
    Timeout { message: String },
    /// The signed-in identity holds no usable account on the selected
    /// chain.
    #[error("{message}")]
    NoAccountForChain { message: String },
}

/// Failures of the signing flow.
#[derive(Debug, Error)]
pub enum SignError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{message}")]
    NoResponse {
        message: String,
        #[source]
        source: Option<ProviderError>,
    },
    #[error("{message}")]
    NotVerified { message: String },
    /// The response carried a non-zero fee; fee negotiation is not
    /// supported.
    #[error("{message}")]
    FeeNotSupported { message: String },
    /// The signer returned a transaction that is not a safe variant of
    /// the request.
    #[error("{message}")]
    ModificationRejected {
        message: String,
        #[source]
        source: ModificationError,
    },
    #[error("{message}")]
    Timeout { message: String },
    #[error("{message}")]
    UserCanceled { message: String },
}
