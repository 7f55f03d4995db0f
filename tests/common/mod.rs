//! Shared utilities for integration tests.

#![allow(dead_code)]

use alloy::primitives::Address;
use axum::{
    body::{to_bytes, Body},
    extract::connect_info::MockConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use testnet_faucet::blockchain::mock::MockChain;
use testnet_faucet::blockchain::{Account, ChainId, TxBroadcaster};
use testnet_faucet::http::MessageResponse;
use testnet_faucet::{FaucetConfig, FaucetServer};
use tower::ServiceExt;

/// Anvil's first dev account.
pub const TEST_PRIVATE_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const FAUCET_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const RECIPIENT: &str = "0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B";
pub const OTHER_RECIPIENT: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";

pub fn test_config() -> FaucetConfig {
    let mut config = FaucetConfig::default();
    config.faucet.network = "anvil".into();
    config.explorer.url = "https://explorer.example".into();
    config.hcaptcha.site_key = "site-key".into();
    config.observability.metrics_enabled = false;
    config
}

pub async fn broadcaster(chain: &MockChain, token: Option<Address>) -> Arc<TxBroadcaster<MockChain>> {
    let account = Account::from_private_key(TEST_PRIVATE_KEY, ChainId(31337)).unwrap();
    Arc::new(
        TxBroadcaster::new(Arc::new(chain.clone()), account, token)
            .await
            .unwrap(),
    )
}

pub async fn faucet(chain: &MockChain, config: &FaucetConfig, token: Option<Address>) -> FaucetServer {
    FaucetServer::new(config, broadcaster(chain, token).await).unwrap()
}

pub fn peer(ip: &str) -> SocketAddr {
    format!("{}:40000", ip).parse().unwrap()
}

/// POST a claim as if it came from `from`, optionally through proxies.
pub async fn claim(
    server: &FaucetServer,
    from: SocketAddr,
    address: &str,
    forwarded_for: Option<&str>,
) -> (StatusCode, MessageResponse) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/api/claim")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(chain) = forwarded_for {
        request = request.header("x-forwarded-for", chain);
    }
    let body = serde_json::json!({ "address": address }).to_string();
    let response = with_peer(server.router(), from)
        .oneshot(request.body(Body::from(body)).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

pub async fn get(server: &FaucetServer, path: &str) -> (StatusCode, Vec<u8>) {
    let response = with_peer(server.router(), peer("127.0.0.1"))
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

pub fn with_peer(router: Router, addr: SocketAddr) -> Router {
    router.layer(MockConnectInfo(addr))
}
