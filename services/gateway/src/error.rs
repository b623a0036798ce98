use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use market_data::MarketDataError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Central error type for the Gateway application
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unknown symbol or resolution")]
    UnknownSeries {
        valid_symbol: bool,
        valid_resolution: bool,
    },

    #[error("Unknown market address")]
    UnknownMarket,

    #[error("Storage error: {0}")]
    Storage(#[from] MarketDataError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "s": "error", "message": message }),
            ),
            AppError::UnknownSeries {
                valid_symbol,
                valid_resolution,
            } => (
                StatusCode::NOT_FOUND,
                json!({
                    "s": "error",
                    "validSymbol": valid_symbol,
                    "validResolution": valid_resolution,
                }),
            ),
            AppError::UnknownMarket => (
                StatusCode::NOT_FOUND,
                json!({ "s": "error", "validPk": false }),
            ),
            AppError::Storage(e) => {
                // Detail stays in the log; clients get an opaque body.
                error!(error = %e, "Storage read failed");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "s": "error" }))
            }
        };

        (status, Json(body)).into_response()
    }
}
