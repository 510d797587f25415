//! End-to-end behavior of the login and signing flows against a scripted
//! provider.
//!
//! The fake stands in for the external service behind the
//! `IdentityProvider` seam: tests script each path's response, count the
//! calls that reach the provider, and drive timeouts on virtual time.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;

use oreid_wallet_plugin::provider::{
    AuthParams, IdentityProvider, ProviderError, ProviderLoginResponse, ProviderSigningResponse,
    SignParams, TransactionData, TransactionHandle,
};
use oreid_wallet_plugin::types::{
    Action, Bytes, ChainDefinition, Name, PermissionLevel, ResolvedSigningRequest, Transaction,
};
use oreid_wallet_plugin::{
    AuthError, LoginContext, PluginConfig, SignError, TransactContext, WalletPlugin,
    WhitelistEntry,
};

const KEY: &str = "PUB_K1_6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV";
const SIG: &str = "SIG_K1_KfqBXGdSRnVgZbAXyL9hEYbAvrZjcaxUCenD7Z3aX6yzf6MEyc4C";

fn name(s: &str) -> Name {
    s.parse().unwrap()
}

fn wax_testnet() -> ChainDefinition {
    ChainDefinition {
        id: "f16b1833c747c43682f4386fca9cbb327929334a762755ebec17f6f23c9b8a12"
            .parse()
            .unwrap(),
        name: "WAX (Testnet)".into(),
    }
}

fn verified_login() -> ProviderLoginResponse {
    serde_json::from_value(json!({
        "verified": true,
        "chainAccounts": [{
            "chainNetwork": "wax_test",
            "chainAccount": "alice",
            "publicKeys": [KEY],
        }],
        "whitelistedContracts": [
            {"contract": "eosio.token", "recipients": ["bob"]},
        ],
    }))
    .unwrap()
}

fn request() -> ResolvedSigningRequest {
    let auth = vec![PermissionLevel::new(name("alice"), name("active"))];
    let transaction = Transaction {
        expiration: 1_700_000_000,
        ref_block_num: 7,
        ref_block_prefix: 99,
        actions: vec![
            Action {
                account: name("eosio.token"),
                name: name("transfer"),
                authorization: auth.clone(),
                data: Bytes(vec![1, 2]),
            },
            Action {
                account: name("atomicassets"),
                name: name("mintasset"),
                authorization: auth.clone(),
                data: Bytes(vec![3]),
            },
        ],
    };
    let resolved: oreid_wallet_plugin::types::ResolvedTransaction = serde_json::from_value(json!({
        "actions": [
            {
                "account": "eosio.token",
                "name": "transfer",
                "authorization": [{"actor": "alice", "permission": "active"}],
                "data": {"from": "alice", "to": "bob", "quantity": "1.00000000 WAX"},
            },
            {
                "account": "atomicassets",
                "name": "mintasset",
                "authorization": [{"actor": "alice", "permission": "active"}],
                "data": {"template_id": 42},
            },
        ],
    }))
    .unwrap();
    ResolvedSigningRequest {
        chain_id: wax_testnet().id,
        transaction,
        resolved_transaction: resolved,
        signer: PermissionLevel::new(name("alice"), name("active")),
    }
}

/// Encode a transaction body the way the service echoes it: base64 over
/// the JSON envelope.
fn echo_body(transaction: &Transaction) -> String {
    let envelope = json!({
        "chain_id": wax_testnet().id.to_string(),
        "transaction": serde_json::to_value(transaction).unwrap(),
    });
    BASE64.encode(serde_json::to_vec(&envelope).unwrap())
}

fn signed_response(transaction: Option<&Transaction>) -> ProviderSigningResponse {
    serde_json::from_value(json!({
        "verified": true,
        "signatures": [SIG],
        "signedTransaction": transaction.map(echo_body),
    }))
    .unwrap()
}

#[derive(Default)]
struct FakeProvider {
    initialized: AtomicBool,
    session_token: Mutex<Option<String>>,
    silent_response: Mutex<Option<Result<ProviderLoginResponse, ProviderError>>>,
    popup_response: Mutex<Option<Result<ProviderLoginResponse, ProviderError>>>,
    sign_response: Mutex<Option<Result<ProviderSigningResponse, ProviderError>>>,
    hang_popups: AtomicBool,
    popup_auth_calls: AtomicUsize,
    last_transaction: Mutex<Option<TransactionData>>,
    last_sign_params: Mutex<Option<SignParams>>,
}

impl FakeProvider {
    fn with_session(self) -> Self {
        *self.session_token.lock().unwrap() = Some("cached-token".into());
        self
    }

    fn silent(self, response: ProviderLoginResponse) -> Self {
        *self.silent_response.lock().unwrap() = Some(Ok(response));
        self
    }

    fn popup(self, response: Result<ProviderLoginResponse, ProviderError>) -> Self {
        *self.popup_response.lock().unwrap() = Some(response);
        self
    }

    fn signing(self, response: Result<ProviderSigningResponse, ProviderError>) -> Self {
        *self.sign_response.lock().unwrap() = Some(response);
        self
    }

    fn hanging(self) -> Self {
        self.hang_popups.store(true, Ordering::SeqCst);
        self
    }
}

impl IdentityProvider for FakeProvider {
    async fn init(&self) -> Result<(), ProviderError> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn is_logged_in(&self) -> bool {
        self.session_token.lock().unwrap().is_some()
    }

    fn session_token(&self) -> Option<String> {
        self.session_token.lock().unwrap().clone()
    }

    async fn login_with_token(
        &self,
        _token: &str,
    ) -> Result<ProviderLoginResponse, ProviderError> {
        self.silent_response
            .lock()
            .unwrap()
            .take()
            .expect("no scripted silent response")
    }

    async fn popup_auth(
        &self,
        _params: AuthParams,
    ) -> Result<ProviderLoginResponse, ProviderError> {
        self.popup_auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_popups.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.popup_response
            .lock()
            .unwrap()
            .take()
            .expect("no scripted popup response")
    }

    async fn create_transaction(
        &self,
        data: TransactionData,
    ) -> Result<TransactionHandle, ProviderError> {
        *self.last_transaction.lock().unwrap() = Some(data);
        Ok(serde_json::from_value(json!({"transactionId": "tx-1"})).unwrap())
    }

    async fn popup_sign(
        &self,
        params: SignParams,
    ) -> Result<ProviderSigningResponse, ProviderError> {
        *self.last_sign_params.lock().unwrap() = Some(params);
        if self.hang_popups.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.sign_response
            .lock()
            .unwrap()
            .take()
            .expect("no scripted sign response")
    }
}

fn plugin(provider: FakeProvider) -> WalletPlugin<FakeProvider> {
    WalletPlugin::with_provider(provider, PluginConfig::default())
}

// ========== Login ==========

#[tokio::test]
async fn login_returns_verified_result_with_account() {
    let plugin = plugin(FakeProvider::default().with_session().silent(verified_login()));
    let result = plugin.login(&LoginContext::new(wax_testnet())).await.unwrap();

    assert!(result.verified);
    assert!(!result.account.as_str().is_empty());
    assert!(result.auto);
    assert_eq!(result.permission_level().to_string(), "alice@active");
}

#[tokio::test]
async fn cached_session_never_opens_a_popup() {
    let provider = FakeProvider::default().with_session().silent(verified_login());
    let plugin = plugin(provider);
    tokio_test::assert_ok!(plugin.login(&LoginContext::new(wax_testnet())).await);
    assert_eq!(
        plugin.provider().popup_auth_calls.load(Ordering::SeqCst),
        0,
        "silent login must not open a popup"
    );
}

#[tokio::test]
async fn unverified_popup_response_fails_not_verified() {
    let mut unverified = verified_login();
    unverified.verified = false;
    let plugin = plugin(FakeProvider::default().popup(Ok(unverified)));

    let err = plugin
        .login(&LoginContext::new(wax_testnet()))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NotVerified { .. }));
}

#[tokio::test]
async fn login_without_chain_fails_config() {
    let plugin = plugin(FakeProvider::default());
    let err = plugin.login(&LoginContext::default()).await.unwrap_err();
    assert!(matches!(err, AuthError::Config(_)));
}

#[tokio::test]
async fn keyless_account_fails_instead_of_placeholder_key() {
    let response: ProviderLoginResponse = serde_json::from_value(json!({
        "verified": true,
        "chainAccounts": [{
            "chainNetwork": "wax_test",
            "chainAccount": "alice",
            "publicKeys": [],
        }],
    }))
    .unwrap();
    let plugin = plugin(FakeProvider::default().with_session().silent(response));

    let err = plugin
        .login(&LoginContext::new(wax_testnet()))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NoAccountForChain { .. }));
}

#[tokio::test(start_paused = true)]
async fn canceled_login_rejects_with_user_canceled() {
    let plugin = plugin(FakeProvider::default().hanging());
    let token = CancellationToken::new();
    let ctx = LoginContext::new(wax_testnet()).with_cancel(token.clone());

    let canceler = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
    });

    let err = plugin.login(&ctx).await.unwrap_err();
    assert!(matches!(err, AuthError::UserCanceled { .. }));
    canceler.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn login_popup_that_never_settles_times_out_at_the_window() {
    let config = PluginConfig::default().with_login_timeout(Duration::from_millis(300_000));
    let plugin = WalletPlugin::with_provider(FakeProvider::default().hanging(), config);
    let started = tokio::time::Instant::now();

    let err = plugin
        .login(&LoginContext::new(wax_testnet()))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Timeout { .. }));
    assert_eq!(started.elapsed(), Duration::from_millis(300_000));
}

#[tokio::test]
async fn popup_blocked_is_distinguished() {
    let plugin = plugin(
        FakeProvider::default().popup(Err(ProviderError::PopupBlocked("no display".into()))),
    );
    let err = plugin
        .login(&LoginContext::new(wax_testnet()))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::PopupBlocked { .. }));
}

#[tokio::test]
async fn closed_popup_is_a_cancellation() {
    let plugin = plugin(FakeProvider::default().popup(Err(ProviderError::PopupClosed)));
    let err = plugin
        .login(&LoginContext::new(wax_testnet()))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UserCanceled { .. }));
}

// ========== Signing ==========

#[tokio::test]
async fn identical_echo_produces_no_replacement() {
    let req = request();
    let provider = FakeProvider::default()
        .with_session()
        .signing(Ok(signed_response(Some(&req.transaction))));
    let plugin = plugin(provider);

    let result = plugin
        .sign(&req, &TransactContext::new(wax_testnet()))
        .await
        .unwrap();
    assert_eq!(result.signatures.len(), 1);
    assert!(result.replacement_request.is_none());
}

#[tokio::test]
async fn every_action_is_forwarded_to_the_provider() {
    let req = request();
    let provider = FakeProvider::default()
        .with_session()
        .signing(Ok(signed_response(None)));
    let plugin = plugin(provider);

    tokio_test::assert_ok!(plugin.sign(&req, &TransactContext::new(wax_testnet())).await);

    let sent = plugin
        .provider()
        .last_transaction
        .lock()
        .unwrap()
        .take()
        .expect("transaction was created");
    assert_eq!(sent.actions.len(), 2);
    assert_eq!(sent.chain_network, "wax_test");
}

#[tokio::test]
async fn removed_first_action_fails_modification_rejected() {
    let req = request();
    let mut tampered = req.transaction.clone();
    tampered.actions.remove(0);
    let provider = FakeProvider::default()
        .with_session()
        .signing(Ok(signed_response(Some(&tampered))));
    let plugin = plugin(provider);

    let err = plugin
        .sign(&req, &TransactContext::new(wax_testnet()))
        .await
        .unwrap_err();
    assert!(matches!(err, SignError::ModificationRejected { .. }));
}

#[tokio::test]
async fn appended_fee_action_returns_replacement_request() {
    let req = request();
    let mut variant = req.transaction.clone();
    variant.actions.push(Action {
        account: name("eosio"),
        name: name("buyrambytes"),
        authorization: vec![PermissionLevel::new(name("alice"), name("active"))],
        data: Bytes(vec![0xaa]),
    });
    let provider = FakeProvider::default()
        .with_session()
        .signing(Ok(signed_response(Some(&variant))));
    let plugin = plugin(provider);

    let result = plugin
        .sign(&req, &TransactContext::new(wax_testnet()))
        .await
        .unwrap();
    let replacement = result.replacement_request.expect("replacement expected");
    assert_eq!(replacement.transaction.actions.len(), 3);
    assert_eq!(replacement.chain_id, req.chain_id);
    // the original request is untouched
    assert_eq!(req.transaction.actions.len(), 2);
}

#[tokio::test]
async fn ram_fee_fails_fee_not_supported_despite_valid_signatures() {
    let req = request();
    let response: ProviderSigningResponse = serde_json::from_value(json!({
        "verified": true,
        "signatures": [SIG],
        "ramFee": 0.05,
    }))
    .unwrap();
    let provider = FakeProvider::default().with_session().signing(Ok(response));
    let plugin = plugin(provider);

    let err = plugin
        .sign(&req, &TransactContext::new(wax_testnet()))
        .await
        .unwrap_err();
    assert!(matches!(err, SignError::FeeNotSupported { .. }));
}

#[tokio::test]
async fn empty_signature_list_is_no_response() {
    let req = request();
    let response: ProviderSigningResponse =
        serde_json::from_value(json!({"verified": true, "signatures": []})).unwrap();
    let provider = FakeProvider::default().with_session().signing(Ok(response));
    let plugin = plugin(provider);

    let err = plugin
        .sign(&req, &TransactContext::new(wax_testnet()))
        .await
        .unwrap_err();
    assert!(matches!(err, SignError::NoResponse { .. }));
}

#[tokio::test(start_paused = true)]
async fn sign_popup_that_never_settles_times_out_at_the_window() {
    let req = request();
    let config = PluginConfig::default().with_sign_timeout(Duration::from_millis(300_000));
    let provider = FakeProvider::default().with_session().hanging();
    let plugin = WalletPlugin::with_provider(provider, config);
    let started = tokio::time::Instant::now();

    let err = plugin
        .sign(&req, &TransactContext::new(wax_testnet()))
        .await
        .unwrap_err();
    assert!(matches!(err, SignError::Timeout { .. }));
    assert_eq!(started.elapsed(), Duration::from_millis(300_000));
}

#[tokio::test(start_paused = true)]
async fn canceled_sign_rejects_with_user_canceled() {
    let req = request();
    let provider = FakeProvider::default().with_session().hanging();
    let plugin = plugin(provider);
    let token = CancellationToken::new();
    let ctx = TransactContext::new(wax_testnet()).with_cancel(token.clone());

    let canceler = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
    });

    let err = plugin.sign(&req, &ctx).await.unwrap_err();
    assert!(matches!(err, SignError::UserCanceled { .. }));
    canceler.await.unwrap();
}

#[tokio::test]
async fn whitelisted_actions_request_unattended_signing() {
    let req = request();
    let whitelist = vec![
        WhitelistEntry {
            contract: name("eosio.token"),
            recipients: vec![name("bob")],
        },
        WhitelistEntry {
            contract: name("atomicassets"),
            recipients: vec![],
        },
    ];
    let provider = FakeProvider::default()
        .with_session()
        .signing(Ok(signed_response(None)));
    let plugin = plugin(provider);
    let ctx = TransactContext::new(wax_testnet()).with_whitelist(whitelist);

    tokio_test::assert_ok!(plugin.sign(&req, &ctx).await);
    let params = plugin
        .provider()
        .last_sign_params
        .lock()
        .unwrap()
        .take()
        .expect("sign params recorded");
    assert!(params.allow_unattended);
}

#[tokio::test]
async fn unsupported_chain_fails_before_reaching_the_provider() {
    let plugin = plugin(FakeProvider::default());
    let unknown = ChainDefinition {
        id: oreid_wallet_plugin::ChainId::from([0x42u8; 32]),
        name: "Mystery".into(),
    };
    let err = plugin.login(&LoginContext::new(unknown)).await.unwrap_err();
    assert!(matches!(err, AuthError::Config(_)));
}
