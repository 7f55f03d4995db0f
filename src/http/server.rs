//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID, claim rate limit)
//! - Run the claim path under its deadline
//! - Serve until shutdown, with the rate-limit sweeper alongside

use alloy::primitives::{Address, TxHash, U256};
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::blockchain::units::to_base_units;
use crate::blockchain::{BlockchainResult, ChainClient, TransferRequest, TxBroadcaster};
use crate::config::FaucetConfig;
use crate::http::request::{Claim, X_REQUEST_ID};
use crate::http::response::{ClaimError, InfoResponse, MessageResponse};
use crate::lifecycle::Shutdown;
use crate::observability::metrics::{self, outcome};
use crate::resilience::with_deadline;
use crate::security::rate_limit::{claim_rate_limit_middleware, spawn_sweeper, ClaimGate};
use crate::security::ClaimRateLimiter;

/// Decimals of every EVM native currency.
const NATIVE_DECIMALS: u8 = 18;

/// Application state injected into handlers.
pub struct AppState<C> {
    pub broadcaster: Arc<TxBroadcaster<C>>,
    /// Payout in base units.
    pub payout: U256,
    pub claim_timeout: Duration,
    pub info: Arc<InfoResponse>,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            broadcaster: self.broadcaster.clone(),
            payout: self.payout,
            claim_timeout: self.claim_timeout,
            info: self.info.clone(),
        }
    }
}

/// HTTP server for the faucet.
pub struct FaucetServer {
    router: Router,
    limiter: Arc<ClaimRateLimiter>,
    sweep_interval: Duration,
}

impl FaucetServer {
    /// Create a server paying out through `broadcaster`.
    ///
    /// Fails when the configured payout does not convert to base units.
    pub fn new<C: ChainClient>(
        config: &FaucetConfig,
        broadcaster: Arc<TxBroadcaster<C>>,
    ) -> BlockchainResult<Self> {
        let decimals = if broadcaster.token().is_some() {
            config.token.decimals
        } else {
            NATIVE_DECIMALS
        };
        let payout = to_base_units(config.faucet.payout, decimals)?;

        let info = InfoResponse {
            account: broadcaster.address().to_string(),
            network: config.faucet.network.clone(),
            symbol: config.faucet.symbol.clone(),
            payout: config.faucet.payout.to_string(),
            hcaptcha_site_key: config.hcaptcha.site_key.clone(),
            explorer_url: config.explorer.url.clone(),
            explorer_tx_path: config.explorer.tx_path.clone(),
        };

        let limiter = Arc::new(ClaimRateLimiter::new(Duration::from_secs(
            config.faucet.interval_minutes.saturating_mul(60),
        )));
        let gate = ClaimGate {
            limiter: limiter.clone(),
            proxy_count: config.server.proxy_count,
            max_body_size: config.server.max_body_size,
        };

        let state = AppState {
            broadcaster,
            payout,
            claim_timeout: Duration::from_secs(config.faucet.claim_timeout_secs),
            info: Arc::new(info),
        };

        tracing::info!(
            payout = %payout,
            interval_minutes = config.faucet.interval_minutes,
            proxy_count = config.server.proxy_count,
            "Faucet configured"
        );

        Ok(Self {
            router: Self::build_router(config, state, gate),
            limiter,
            sweep_interval: Duration::from_secs(config.faucet.sweep_interval_secs),
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router<C: ChainClient>(
        config: &FaucetConfig,
        state: AppState<C>,
        gate: ClaimGate,
    ) -> Router {
        let claim = post(claim_handler::<C>)
            .route_layer(middleware::from_fn_with_state(gate, claim_rate_limit_middleware));

        Router::new()
            .route("/api/claim", claim)
            .route("/api/info", get(info_handler::<C>))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.server.max_body_size))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id,
                    )
                }),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router without a listener, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn limiter(&self) -> &Arc<ClaimRateLimiter> {
        &self.limiter
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = spawn_sweeper(self.limiter.clone(), self.sweep_interval, shutdown.subscribe());

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let mut stop = shutdown.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        shutdown.trigger();
        if let Err(e) = sweeper.await {
            tracing::warn!(error = %e, "Rate limit sweeper ended abnormally");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn claim_handler<C: ChainClient>(
    State(state): State<AppState<C>>,
    Extension(claim): Extension<Claim>,
) -> Result<Json<MessageResponse>, ClaimError> {
    let start_time = Instant::now();

    match with_deadline(state.claim_timeout, pay_out(&state, claim.address)).await {
        Ok(tx_hash) => {
            tracing::info!(tx_hash = %tx_hash, address = %claim.address, "Transaction sent successfully");
            metrics::record_claim(outcome::SUCCESS, start_time);
            Ok(Json(MessageResponse::new(format!("Txhash: {}", tx_hash))))
        }
        Err(e) => {
            tracing::error!(address = %claim.address, error = %e, "Failed to send transaction");
            let err = ClaimError::from(e);
            metrics::record_claim(err.outcome(), start_time);
            Err(err)
        }
    }
}

async fn pay_out<C: ChainClient>(state: &AppState<C>, to: Address) -> BlockchainResult<TxHash> {
    let broadcaster = &state.broadcaster;
    let request = if broadcaster.token().is_some() {
        let balance = match broadcaster.recipient_token_balance(to).await {
            Ok(balance) => balance,
            Err(e) => {
                tracing::warn!(address = %to, error = %e, "Failed to fetch recipient balance");
                U256::ZERO
            }
        };
        TransferRequest::token(to, state.payout, balance)
    } else {
        TransferRequest::native(to, state.payout)
    };
    broadcaster.transfer(request).await
}

async fn info_handler<C: ChainClient>(State(state): State<AppState<C>>) -> Json<InfoResponse> {
    Json(state.info.as_ref().clone())
}

async fn health_handler() -> &'static str {
    "OK"
}
