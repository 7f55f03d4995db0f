//! JSON response bodies and claim failures.
//!
//! Every claim outcome is rendered as `{"message": ...}`; the status code
//! carries the failure class.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;

use crate::blockchain::BlockchainError;
use crate::observability::metrics::outcome;
use crate::security::rate_limit::format_wait;

#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of `GET /api/info`.
#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub account: String,
    pub network: String,
    pub symbol: String,
    pub payout: String,
    pub hcaptcha_site_key: String,
    #[serde(rename = "explorerURL")]
    pub explorer_url: String,
    pub explorer_tx_path: String,
}

/// Why a claim was not paid out.
#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(
        "You have exceeded the rate limit. Please wait {} before you try again",
        format_wait(.retry_after)
    )]
    RateLimited { retry_after: Duration },

    #[error(transparent)]
    Chain(#[from] BlockchainError),
}

impl ClaimError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Chain(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Metrics label for this failure.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => outcome::INVALID,
            Self::RateLimited { .. } => outcome::RATE_LIMITED,
            Self::Chain(_) => outcome::FAILED,
        }
    }
}

impl IntoResponse for ClaimError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(MessageResponse::new(self.to_string()))).into_response()
    }
}
