//! Serve over a real socket and shut down cleanly.

use std::time::Duration;
use testnet_faucet::blockchain::mock::MockChain;
use testnet_faucet::lifecycle::Shutdown;
use tokio::net::TcpListener;

mod common;

#[tokio::test]
async fn test_serves_until_shutdown() {
    let chain = MockChain::new();
    let server = common::faucet(&chain, &common::test_config(), None).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.clone()));

    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    let res = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .expect("Faucet unreachable");
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "OK");

    let res = client
        .post(format!("http://{}/api/claim", addr))
        .json(&serde_json::json!({ "address": common::RECIPIENT }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(chain.submitted().len(), 1);

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("Server did not stop")
        .unwrap();
    assert!(result.is_ok());
}
