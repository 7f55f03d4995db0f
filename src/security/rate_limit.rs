//! Claim rate limiting by caller address and destination address.

use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use alloy::primitives::Address;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::http::request::Claim;
use crate::http::response::ClaimError;
use crate::observability::metrics;
use crate::security::headers::client_ip;

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected { retry_after: Duration },
}

/// Longest cooldown window: one year.
pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Cooldown table: one window per identity.
///
/// Entries whose window has passed are treated as absent and removed the
/// next time they are looked at, or by [`ClaimRateLimiter::sweep_expired`].
#[derive(Debug)]
pub struct ClaimRateLimiter {
    interval: Duration,
    entries: Mutex<HashMap<String, Instant>>,
}

impl ClaimRateLimiter {
    /// Windows longer than [`MAX_INTERVAL`] are shortened to it.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.min(MAX_INTERVAL),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn admit(&self, keys: &[String]) -> Admission {
        self.admit_at(keys, Instant::now())
    }

    /// Admit only if no key has a live window, then open a window for all of
    /// them. A rejection reports the longest remaining wait.
    pub fn admit_at(&self, keys: &[String], now: Instant) -> Admission {
        let mut entries = self.lock();

        let mut retry_after: Option<Duration> = None;
        for key in keys {
            match entries.get(key) {
                Some(&expires_at) if expires_at > now => {
                    let remaining = expires_at - now;
                    retry_after = Some(retry_after.map_or(remaining, |r| r.max(remaining)));
                }
                Some(_) => {
                    entries.remove(key);
                }
                None => {}
            }
        }

        if let Some(retry_after) = retry_after {
            return Admission::Rejected { retry_after };
        }

        let expires_at = now + self.interval;
        for key in keys {
            entries.insert(key.clone(), expires_at);
        }
        metrics::record_rate_limit_entries(entries.len());
        Admission::Admitted
    }

    /// Drop the windows for `keys`, letting them claim again immediately.
    pub fn release(&self, keys: &[String]) {
        let mut entries = self.lock();
        for key in keys {
            entries.remove(key);
        }
        metrics::record_rate_limit_entries(entries.len());
    }

    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    /// Remove every entry whose window has passed; returns how many went.
    pub fn sweep_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        metrics::record_rate_limit_entries(entries.len());
        before - entries.len()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identities a claim is throttled by.
pub fn claim_keys(client_ip: &str, address: &Address) -> Vec<String> {
    vec![client_ip.to_string(), address.to_string().to_lowercase()]
}

/// Whole-second wait rendered like `1h2m3s`, `4m0s` or `59s`.
pub fn format_wait(wait: &Duration) -> String {
    let mut secs = wait.as_secs();
    if wait.subsec_millis() >= 500 {
        secs += 1;
    }
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Evict expired windows every `every` until `shutdown` fires.
pub fn spawn_sweeper(
    limiter: Arc<ClaimRateLimiter>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = limiter.sweep_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = limiter.len(), "Swept expired rate limit entries");
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
        tracing::debug!("Rate limit sweeper stopped");
    })
}

/// State for the claim rate-limit middleware.
#[derive(Debug, Clone)]
pub struct ClaimGate {
    pub limiter: Arc<ClaimRateLimiter>,
    pub proxy_count: usize,
    pub max_body_size: usize,
}

/// Parse the claim, admit it, and roll the windows back if it fails.
pub async fn claim_rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(gate): State<ClaimGate>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let (parts, body) = request.into_parts();

    let claim = match to_bytes(body, gate.max_body_size)
        .await
        .map_err(|e| ClaimError::InvalidInput(format!("failed to read request body: {}", e)))
        .and_then(|bytes| Claim::from_body(&bytes))
    {
        Ok(claim) => claim,
        Err(e) => {
            metrics::record_claim(e.outcome(), start_time);
            return e.into_response();
        }
    };

    let client = client_ip(&parts.headers, addr, gate.proxy_count);
    let keys = claim_keys(&client, &claim.address);

    if let Admission::Rejected { retry_after } = gate.limiter.admit(&keys) {
        tracing::warn!(
            client = %client,
            address = %claim.address,
            retry_after_secs = retry_after.as_secs(),
            "Rate limit exceeded"
        );
        let err = ClaimError::RateLimited { retry_after };
        metrics::record_claim(err.outcome(), start_time);
        return err.into_response();
    }

    let mut request = Request::from_parts(parts, Body::empty());
    request.extensions_mut().insert(claim);

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        gate.limiter.release(&keys);
        tracing::debug!(client = %client, status = %response.status(), "Claim failed, rate limit released");
    }
    response
}
