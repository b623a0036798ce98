use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use types::ids::Address;

use crate::error::AppError;
use crate::handlers::tv::as_number;
use crate::state::AppState;

const TRADES_CACHE: &str = "public, max-age=5";

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TradeEntry {
    pub market: String,
    pub market_address: String,
    pub price: f64,
    pub size: f64,
    pub side: String,
    /// Unix millis
    pub time: i64,
    pub order_id: String,
    pub fee_cost: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TradesResponse {
    pub success: bool,
    pub data: Vec<TradeEntry>,
}

/// Recent trades for a market, newest first.
pub async fn recent_trades(
    State(state): State<AppState>,
    Path(market_address): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let market = market_address
        .parse::<Address>()
        .ok()
        .and_then(|address| state.registry.by_address(&address))
        .ok_or(AppError::UnknownMarket)?;

    let trades = state.trades.load_recent(&market.name).await?;
    let data = trades
        .iter()
        .map(|t| TradeEntry {
            market: market.name.to_string(),
            market_address: market.address.to_base58(),
            price: as_number(t.price),
            size: as_number(t.size),
            side: t.side.as_str().to_string(),
            time: t.observed_at,
            order_id: String::new(),
            fee_cost: 0.0,
        })
        .collect();

    Ok((
        [(header::CACHE_CONTROL, TRADES_CACHE)],
        Json(TradesResponse {
            success: true,
            data,
        }),
    ))
}
