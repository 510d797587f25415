//! What the calling session hands the plugin for a single operation.
//!
//! The session owns the user interface; the plugin only reports phase
//! transitions through the status callback and localizes its messages
//! through the translate function. Cancellation arrives on the context's
//! token and aborts whichever operation is in flight.

use crate::types::{ChainDefinition, WhitelistEntry};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Arguments to the session's translate function: the fallback text and
/// the values interpolated into `{{placeholder}}` slots.
pub struct TranslateArgs<'a> {
    pub default: &'a str,
    pub params: &'a [(&'static str, String)],
}

pub type TranslateFn = Arc<dyn Fn(&str, &TranslateArgs<'_>) -> String + Send + Sync>;
pub type StatusFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Substitute `{{name}}` placeholders in a template.
pub fn interpolate(template: &str, params: &[(&'static str, String)]) -> String {
    let mut out = template.to_string();
    for (name, value) in params {
        out = out.replace(&format!("{{{{{name}}}}}"), value);
    }
    out
}

/// The UI callbacks a session exposes to the plugin.
#[derive(Clone)]
pub struct SessionUi {
    status: StatusFn,
    translate: TranslateFn,
}

impl SessionUi {
    pub fn new(status: StatusFn, translate: TranslateFn) -> Self {
        Self { status, translate }
    }

    /// Report a phase transition to the user interface.
    pub fn status(&self, text: &str) {
        (self.status)(text);
    }

    /// Localize a message, falling back to interpolating `default`.
    pub fn translate(
        &self,
        key: &str,
        default: &str,
        params: &[(&'static str, String)],
    ) -> String {
        (self.translate)(key, &TranslateArgs { default, params })
    }
}

impl Default for SessionUi {
    fn default() -> Self {
        Self {
            status: Arc::new(|_| {}),
            translate: Arc::new(|_key, args| interpolate(args.default, args.params)),
        }
    }
}

/// Context for a login operation.
#[derive(Clone, Default)]
pub struct LoginContext {
    pub chain: Option<ChainDefinition>,
    pub ui: SessionUi,
    pub cancel: CancellationToken,
}

impl LoginContext {
    pub fn new(chain: ChainDefinition) -> Self {
        Self {
            chain: Some(chain),
            ..Default::default()
        }
    }

    pub fn with_ui(mut self, ui: SessionUi) -> Self {
        self.ui = ui;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Context for a signing operation.
#[derive(Clone, Default)]
pub struct TransactContext {
    pub chain: Option<ChainDefinition>,
    pub ui: SessionUi,
    pub cancel: CancellationToken,
    /// Contracts the user has approved for unattended signing.
    pub whitelist: Vec<WhitelistEntry>,
}

impl TransactContext {
    pub fn new(chain: ChainDefinition) -> Self {
        Self {
            chain: Some(chain),
            ..Default::default()
        }
    }

    pub fn with_ui(mut self, ui: SessionUi) -> Self {
        self.ui = ui;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_whitelist(mut self, whitelist: Vec<WhitelistEntry>) -> Self {
        self.whitelist = whitelist;
        self
    }
}
