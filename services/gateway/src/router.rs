use crate::handlers::{trades, tv};
use crate::state::AppState;
use axum::{Router, routing::get};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let tv_routes = Router::new()
        .route("/config", get(tv::config))
        .route("/symbols", get(tv::symbols))
        .route("/history", get(tv::history));

    Router::new()
        .nest("/tv", tv_routes)
        .route("/trades/address/{market_address}", get(trades::recent_trades))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::trades::TradesResponse;
    use crate::handlers::tv::HistoryResponse;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use market_data::{CandleStore, TradeLog};
    use persistence::{MemoryBackend, StorageBackend, StorageError};
    use rust_decimal::Decimal;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;
    use types::candle::{Candle, Resolution};
    use types::ids::MarketId;
    use types::market::MarketRegistry;
    use types::trade::{Trade, TradeSide};

    const SOL_USDC: &str = "9wFFyRfZBsuAha4YcuxcXLKwMxJR43S7fPfQLusDBzvT";
    const PROGRAM: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";

    /// Backend that is always down.
    struct FailingBackend;

    fn down() -> StorageError {
        StorageError::Unavailable("connection refused".to_string())
    }

    #[async_trait]
    impl StorageBackend for FailingBackend {
        async fn load_number(&self, _: &MarketId, _: &str) -> Result<Option<u64>, StorageError> {
            Err(down())
        }

        async fn store_number(&self, _: &MarketId, _: &str, _: u64) -> Result<(), StorageError> {
            Err(down())
        }

        async fn push_recent(&self, _: &MarketId, _: &str, _: String, _: usize) -> Result<(), StorageError> {
            Err(down())
        }

        async fn load_recent(&self, _: &MarketId, _: &str) -> Result<Vec<String>, StorageError> {
            Err(down())
        }

        async fn load_candle(&self, _: &MarketId, _: Resolution, _: i64) -> Result<Option<Candle>, StorageError> {
            Err(down())
        }

        async fn store_candle(&self, _: &MarketId, _: Resolution, _: &Candle) -> Result<(), StorageError> {
            Err(down())
        }

        async fn load_candles(
            &self,
            _: &MarketId,
            _: Resolution,
            _: i64,
            _: i64,
        ) -> Result<Vec<Candle>, StorageError> {
            Err(down())
        }
    }

    fn registry() -> MarketRegistry {
        let json = format!(
            r#"[{{"name":"SOL/USDC","address":"{SOL_USDC}","program_id":"{PROGRAM}",
                 "base_decimals":9,"quote_decimals":6}}]"#
        );
        MarketRegistry::from_json(&json).unwrap()
    }

    fn market() -> MarketId {
        MarketId::new("SOL/USDC")
    }

    async fn seeded_state() -> AppState {
        let backend: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
        let candles = CandleStore::new(backend.clone(), vec![Resolution::M1]);
        let log = TradeLog::new(backend.clone(), 100);
        for (price, size, at_secs) in [(10, 1, 0), (12, 2, 30), (9, 1, 90)] {
            let trade = Trade::new(
                Decimal::from(price),
                if price == 9 { TradeSide::Sell } else { TradeSide::Buy },
                Decimal::from(size),
                at_secs * 1000,
            );
            candles.record_trade(&market(), &trade).await.unwrap();
            log.append(&market(), &trade).await.unwrap();
        }
        AppState::new(registry(), backend, 100)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let cache = response
            .headers()
            .get(header::CACHE_CONTROL)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, cache, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_config_lists_resolutions() {
        let app = create_router(seeded_state().await);
        let (status, cache, body) = get(app, "/tv/config").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("public, max-age=360"));
        assert_eq!(body["supported_resolutions"][0], "1");
        assert_eq!(body["supported_resolutions"][8], "1D");
        assert_eq!(body["supports_search"], true);
    }

    #[tokio::test]
    async fn test_symbols_describes_symbol() {
        let app = create_router(seeded_state().await);
        let (status, _, body) = get(app, "/tv/symbols?symbol=SOL%2FUSDC").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "SOL/USDC");
        assert_eq!(body["type"], "Spot");
        assert_eq!(body["session"], "24x7");
        assert_eq!(body["pricescale"], 100);
    }

    #[tokio::test]
    async fn test_history_returns_candles_in_seconds() {
        let app = create_router(seeded_state().await);
        let (status, cache, body) =
            get(app, "/tv/history?symbol=SOL%2FUSDC&resolution=1&from=0&to=120").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("public, max-age=1"));

        let history: HistoryResponse = serde_json::from_value(body).unwrap();
        assert_eq!(history.s, "ok");
        assert_eq!(history.t, vec![0, 60]);
        assert_eq!(history.o, vec![10.0, 9.0]);
        assert_eq!(history.h, vec![12.0, 9.0]);
        assert_eq!(history.l, vec![10.0, 9.0]);
        assert_eq!(history.c, vec![12.0, 9.0]);
        assert_eq!(history.v, vec![3.0, 1.0]);
    }

    #[tokio::test]
    async fn test_history_equal_bounds_widen_to_one_bucket() {
        let app = create_router(seeded_state().await);
        let (status, _, body) =
            get(app, "/tv/history?symbol=SOL%2FUSDC&resolution=1&from=60&to=60").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["t"], serde_json::json!([60]));
    }

    #[tokio::test]
    async fn test_history_empty_range_is_ok() {
        let app = create_router(seeded_state().await);
        let (status, _, body) =
            get(app, "/tv/history?symbol=SOL%2FUSDC&resolution=60&from=7200&to=9000").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["s"], "ok");
        assert_eq!(body["t"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_history_unknown_symbol_or_resolution() {
        let app = create_router(seeded_state().await);
        let (status, _, body) =
            get(app.clone(), "/tv/history?symbol=DOGE%2FUSDC&resolution=1&from=0&to=60").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["s"], "error");
        assert_eq!(body["validSymbol"], false);
        assert_eq!(body["validResolution"], true);

        let (status, _, body) =
            get(app, "/tv/history?symbol=SOL%2FUSDC&resolution=7&from=0&to=60").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["validSymbol"], true);
        assert_eq!(body["validResolution"], false);
    }

    #[tokio::test]
    async fn test_history_bad_bounds() {
        let app = create_router(seeded_state().await);
        let (status, _, body) =
            get(app.clone(), "/tv/history?symbol=SOL%2FUSDC&resolution=1&from=abc&to=60").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["s"], "error");

        let (status, _, _) =
            get(app, "/tv/history?symbol=SOL%2FUSDC&resolution=1&from=9223372036854776&to=60").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_history_inverted_bounds_are_empty() {
        let app = create_router(seeded_state().await);
        let (status, _, body) =
            get(app, "/tv/history?symbol=SOL%2FUSDC&resolution=1&from=120&to=60").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["s"], "ok");
        assert_eq!(body["t"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_history_extreme_bounds_do_not_overflow() {
        let app = create_router(seeded_state().await);
        let (status, _, body) = get(
            app.clone(),
            "/tv/history?symbol=SOL%2FUSDC&resolution=1D&from=9223372036854775&to=9223372036854775",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["t"], serde_json::json!([]));

        let (status, _, body) = get(
            app,
            "/tv/history?symbol=SOL%2FUSDC&resolution=1&from=-9223372036854775&to=9223372036854775",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["t"], serde_json::json!([0, 60]));
    }

    #[tokio::test]
    async fn test_recent_trades_newest_first() {
        let app = create_router(seeded_state().await);
        let (status, cache, body) = get(app, &format!("/trades/address/{SOL_USDC}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("public, max-age=5"));

        let response: TradesResponse = serde_json::from_value(body).unwrap();
        assert!(response.success);
        assert_eq!(response.data.len(), 3);
        let first = &response.data[0];
        assert_eq!(first.market, "SOL/USDC");
        assert_eq!(first.market_address, SOL_USDC);
        assert_eq!(first.price, 9.0);
        assert_eq!(first.side, "sell");
        assert_eq!(first.time, 90_000);
        assert_eq!(first.order_id, "");
        assert_eq!(first.fee_cost, 0.0);
        assert_eq!(response.data[2].price, 10.0);
    }

    #[tokio::test]
    async fn test_recent_trades_unknown_address() {
        let app = create_router(seeded_state().await);
        let (status, _, body) = get(app.clone(), &format!("/trades/address/{PROGRAM}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["validPk"], false);

        let (status, _, _) = get(app, "/trades/address/not-base58!").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_storage_failure_is_opaque_500() {
        let state = AppState::new(registry(), Arc::new(FailingBackend), 100);
        let app = create_router(state);

        let (status, _, body) =
            get(app.clone(), "/tv/history?symbol=SOL%2FUSDC&resolution=1&from=0&to=60").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, serde_json::json!({ "s": "error" }));

        let (status, _, body) = get(app, &format!("/trades/address/{SOL_USDC}")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, serde_json::json!({ "s": "error" }));
    }
}
