//! Login and sign walkthrough against the live ORE ID service.
//!
//! Run with: cargo run --example login_and_sign
//!
//! Set OREID_APP_ID to use your own registered app.

use std::sync::Arc;

use oreid_wallet_plugin::session::interpolate;
use oreid_wallet_plugin::types::{
    Action, Bytes, ChainDefinition, ResolvedSigningRequest, Transaction,
};
use oreid_wallet_plugin::{
    LoginContext, PluginConfig, SessionUi, TransactContext, WalletPlugin,
};

fn wax_mainnet() -> ChainDefinition {
    ChainDefinition {
        id: "1064487b3cd1a897ce03ae5b6a865651747e2e152090f99c1d19d44e01aea5a4"
            .parse()
            .unwrap(),
        name: "WAX (Mainnet)".into(),
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let mut config = PluginConfig::default();
    if let Ok(app_id) = std::env::var("OREID_APP_ID") {
        config = config.with_app_id(app_id);
    }

    let plugin = WalletPlugin::new(config)?;
    let ui = SessionUi::new(
        Arc::new(|status| println!("[status] {status}")),
        Arc::new(|_key, args| interpolate(args.default, args.params)),
    );

    println!("\n========================================");
    println!("      ORE ID Wallet Plugin Demo");
    println!("========================================");

    let ctx = LoginContext::new(wax_mainnet()).with_ui(ui.clone());
    let login = plugin.login(&ctx).await?;
    println!(
        "Signed in as {} ({})",
        login.permission_level(),
        if login.auto { "cached session" } else { "popup" }
    );

    // A sample single-action transfer, resolved the way a session kit
    // would hand it over.
    let signer = login.permission_level();
    let request = ResolvedSigningRequest {
        chain_id: wax_mainnet().id,
        transaction: Transaction {
            expiration: 1_767_225_600,
            ref_block_num: 0,
            ref_block_prefix: 0,
            actions: vec![Action {
                account: "eosio.token".parse()?,
                name: "transfer".parse()?,
                authorization: vec![signer.clone()],
                data: Bytes(vec![]),
            }],
        },
        resolved_transaction: serde_json::from_value(serde_json::json!({
            "actions": [{
                "account": "eosio.token",
                "name": "transfer",
                "authorization": [{
                    "actor": signer.actor.as_str(),
                    "permission": signer.permission.as_str(),
                }],
                "data": {
                    "from": signer.actor.as_str(),
                    "to": "teamgreymass",
                    "quantity": "0.00000001 WAX",
                    "memo": "oreid-wallet-plugin demo",
                },
            }],
        }))?,
        signer,
    };

    let sign_ctx = TransactContext::new(wax_mainnet())
        .with_ui(ui)
        .with_whitelist(login.whitelisted_contracts.clone());
    let result = plugin.sign(&request, &sign_ctx).await?;

    println!("Received {} signature(s):", result.signatures.len());
    for signature in &result.signatures {
        println!("  {signature}");
    }
    if result.replacement_request.is_some() {
        println!("The service returned a permitted variant of the transaction.");
    }

    Ok(())
}
