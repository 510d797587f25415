//! REST client for the ORE ID service.
//!
//! Popup operations are dispatched as service requests: the service
//! returns a one-time URL, the client opens it in the user's browser and
//! polls the request until it settles. The window itself belongs to the
//! service; this client only observes its outcome. Waits are unbounded
//! here on purpose: the coordinators race every popup future against
//! their own timeout and cancellation, and dropping the future stops the
//! poll loop.

use super::{
    AuthParams, IdentityProvider, ProviderError, ProviderLoginResponse, ProviderSigningResponse,
    SignParams, TransactionData, TransactionHandle,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const DEFAULT_SERVICE_URL: &str = "https://service.oreid.io";
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Client for the ORE ID REST API.
///
/// Holds the app access token established by `init()` and the signed-in
/// user's session token; both live only inside this client, which is the
/// provider-side session cache the rest of the plugin relies on.
pub struct OreIdClient {
    app_id: String,
    service_url: String,
    client: Client,
    app_token: Mutex<Option<String>>,
    session_token: Mutex<Option<String>>,
}

// ========== API Request/Response Types ==========

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppTokenRequest<'a> {
    app_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppTokenResponse {
    app_access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PopupAuthRequest<'a> {
    app_id: &'a str,
    #[serde(flatten)]
    params: &'a AuthParams,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PopupSignRequest<'a> {
    app_id: &'a str,
    transaction_id: &'a str,
    allow_unattended: bool,
}

/// Returned when a popup request is accepted. `url` is absent when the
/// service resolved the request without needing a window.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PopupDispatchResponse {
    request_id: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PopupAuthStatus {
    state: String,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    result: Option<ProviderLoginResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PopupSignStatus {
    state: String,
    #[serde(default)]
    result: Option<ProviderSigningResponse>,
}

#[derive(Debug, PartialEq, Eq)]
enum PopupState {
    Pending,
    Completed,
    Closed,
    Denied,
    Unknown,
}

fn classify(state: &str) -> PopupState {
    match state {
        "pending" | "in_progress" | "awaiting_user" => PopupState::Pending,
        "completed" => PopupState::Completed,
        "closed" | "dismissed" => PopupState::Closed,
        "denied" | "rejected" => PopupState::Denied,
        _ => PopupState::Unknown,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl OreIdClient {
    /// Create a client for the given registered app id, pointed at the
    /// production service.
    pub fn new(app_id: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            app_id: app_id.into(),
            service_url: DEFAULT_SERVICE_URL.to_string(),
            client,
            app_token: Mutex::new(None),
            session_token: Mutex::new(None),
        })
    }

    /// Point the client at a different service deployment.
    pub fn with_service_url(mut self, service_url: impl Into<String>) -> Self {
        self.service_url = service_url.into();
        self
    }

    fn app_token(&self) -> Result<String, ProviderError> {
        lock(&self.app_token)
            .clone()
            .ok_or(ProviderError::NotInitialized)
    }

    async fn get_json<R: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
    ) -> Result<R, ProviderError> {
        let url = format!("{}{}", self.service_url, path);
        let resp = self.client.get(&url).bearer_auth(token).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Endpoint { status, body });
        }

        resp.json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    async fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<R, ProviderError> {
        let url = format!("{}{}", self.service_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let resp = request.send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Endpoint { status, body });
        }

        resp.json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    /// Dispatch a popup request and open its window, if the service asked
    /// for one.
    async fn dispatch_popup<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, ProviderError> {
        let app_token = self.app_token()?;
        let dispatch: PopupDispatchResponse =
            self.post_json(path, Some(&app_token), body).await?;

        if let Some(url) = &dispatch.url {
            opener::open(url).map_err(|e| ProviderError::PopupBlocked(e.to_string()))?;
            tracing::info!(request_id = %dispatch.request_id, "opened popup window");
        }

        Ok(dispatch.request_id)
    }
}

impl IdentityProvider for OreIdClient {
    async fn init(&self) -> Result<(), ProviderError> {
        if self.is_initialized() {
            return Ok(());
        }

        let request = AppTokenRequest {
            app_id: &self.app_id,
        };
        let response: AppTokenResponse =
            self.post_json("/api/app-token", None, &request).await?;
        *lock(&self.app_token) = Some(response.app_access_token);
        tracing::debug!(app_id = %self.app_id, "initialized ORE ID client");
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        lock(&self.app_token).is_some()
    }

    fn is_logged_in(&self) -> bool {
        lock(&self.session_token).is_some()
    }

    fn session_token(&self) -> Option<String> {
        lock(&self.session_token).clone()
    }

    async fn login_with_token(&self, token: &str) -> Result<ProviderLoginResponse, ProviderError> {
        let response: ProviderLoginResponse =
            self.get_json("/api/account/user", token).await?;
        *lock(&self.session_token) = Some(token.to_string());
        Ok(response)
    }

    async fn popup_auth(&self, params: AuthParams) -> Result<ProviderLoginResponse, ProviderError> {
        let request = PopupAuthRequest {
            app_id: &self.app_id,
            params: &params,
        };
        let request_id = self.dispatch_popup("/webwidget/auth", &request).await?;
        let app_token = self.app_token()?;

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let status: PopupAuthStatus = self
                .get_json(&format!("/webwidget/auth/{request_id}"), &app_token)
                .await?;
            tracing::debug!(state = %status.state, "auth popup state");

            match classify(&status.state) {
                PopupState::Pending => {}
                PopupState::Completed => {
                    if let Some(token) = status.access_token {
                        *lock(&self.session_token) = Some(token);
                    }
                    return status.result.ok_or_else(|| {
                        ProviderError::Malformed("completed auth request with no result".into())
                    });
                }
                PopupState::Closed => return Err(ProviderError::PopupClosed),
                PopupState::Denied => return Err(ProviderError::Denied),
                PopupState::Unknown => {
                    tracing::warn!(state = %status.state, "unknown auth popup state");
                }
            }
        }
    }

    async fn create_transaction(
        &self,
        data: TransactionData,
    ) -> Result<TransactionHandle, ProviderError> {
        let token = self.session_token().ok_or(ProviderError::NoSession)?;
        let handle: TransactionHandle = self
            .post_json("/api/transaction", Some(&token), &data)
            .await?;
        tracing::debug!(transaction_id = %handle.transaction_id, "created transaction");
        Ok(handle)
    }

    async fn popup_sign(&self, params: SignParams) -> Result<ProviderSigningResponse, ProviderError> {
        let request = PopupSignRequest {
            app_id: &self.app_id,
            transaction_id: &params.transaction.transaction_id,
            allow_unattended: params.allow_unattended,
        };
        let request_id = self.dispatch_popup("/webwidget/sign", &request).await?;
        let app_token = self.app_token()?;

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let status: PopupSignStatus = self
                .get_json(&format!("/webwidget/sign/{request_id}"), &app_token)
                .await?;
            tracing::debug!(state = %status.state, "sign popup state");

            match classify(&status.state) {
                PopupState::Pending => {}
                PopupState::Completed => {
                    return status.result.ok_or_else(|| {
                        ProviderError::Malformed("completed sign request with no result".into())
                    });
                }
                PopupState::Closed => return Err(ProviderError::PopupClosed),
                PopupState::Denied => return Err(ProviderError::Denied),
                PopupState::Unknown => {
                    tracing::warn!(state = %status.state, "unknown sign popup state");
                }
            }
        }
    }
}
