//! TradingView UDF endpoints.

use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use types::candle::Resolution;

use crate::error::AppError;
use crate::state::AppState;

const STATIC_CACHE: &str = "public, max-age=360";
const HISTORY_CACHE: &str = "public, max-age=1";

fn supported_resolutions() -> Vec<&'static str> {
    Resolution::all().iter().map(|r| r.label()).collect()
}

pub(crate) fn as_number(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub supported_resolutions: Vec<&'static str>,
    pub supports_group_request: bool,
    pub supports_marks: bool,
    pub supports_search: bool,
    pub supports_timescale_marks: bool,
}

pub async fn config() -> impl IntoResponse {
    let body = ConfigResponse {
        supported_resolutions: supported_resolutions(),
        supports_group_request: false,
        supports_marks: false,
        supports_search: true,
        supports_timescale_marks: false,
    };
    ([(header::CACHE_CONTROL, STATIC_CACHE)], Json(body))
}

#[derive(Debug, Deserialize)]
pub struct SymbolQuery {
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Serialize)]
pub struct SymbolResponse {
    pub name: String,
    pub ticker: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub session: &'static str,
    pub exchange: &'static str,
    pub listed_exchange: &'static str,
    pub timezone: &'static str,
    pub has_intraday: bool,
    pub supported_resolutions: Vec<&'static str>,
    pub minmov: u32,
    pub pricescale: u32,
}

pub async fn symbols(Query(query): Query<SymbolQuery>) -> impl IntoResponse {
    let body = SymbolResponse {
        name: query.symbol.clone(),
        ticker: query.symbol.clone(),
        description: query.symbol,
        kind: "Spot",
        session: "24x7",
        exchange: "Serum",
        listed_exchange: "Serum",
        timezone: "Etc/UTC",
        has_intraday: true,
        supported_resolutions: supported_resolutions(),
        minmov: 1,
        pricescale: 100,
    };
    ([(header::CACHE_CONTROL, STATIC_CACHE)], Json(body))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub symbol: Option<String>,
    pub resolution: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HistoryResponse {
    pub s: String,
    pub t: Vec<i64>,
    pub o: Vec<f64>,
    pub h: Vec<f64>,
    pub l: Vec<f64>,
    pub c: Vec<f64>,
    pub v: Vec<f64>,
}

/// Unix seconds from the query string to Unix millis.
fn parse_bound(name: &str, raw: Option<&str>) -> Result<i64, AppError> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .and_then(|secs| secs.checked_mul(1000))
        .ok_or_else(|| AppError::BadRequest(format!("invalid {name}")))
}

pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let market = query
        .symbol
        .as_deref()
        .and_then(|s| state.registry.by_name(s));
    let resolution = query
        .resolution
        .as_deref()
        .and_then(|r| r.parse::<Resolution>().ok());

    let (Some(market), Some(resolution)) = (market, resolution) else {
        return Err(AppError::UnknownSeries {
            valid_symbol: market.is_some(),
            valid_resolution: resolution.is_some(),
        });
    };

    let from = parse_bound("from", query.from.as_deref())?;
    let to = parse_bound("to", query.to.as_deref())?;

    let candles = state.candles.query(&market.name, resolution, from, to).await?;
    let body = HistoryResponse {
        s: "ok".to_string(),
        t: candles.iter().map(|c| c.start / 1000).collect(),
        o: candles.iter().map(|c| as_number(c.open)).collect(),
        h: candles.iter().map(|c| as_number(c.high)).collect(),
        l: candles.iter().map(|c| as_number(c.low)).collect(),
        c: candles.iter().map(|c| as_number(c.close)).collect(),
        v: candles.iter().map(|c| as_number(c.volume)).collect(),
    };
    Ok(([(header::CACHE_CONTROL, HISTORY_CACHE)], Json(body)))
}
