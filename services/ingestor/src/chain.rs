//! Chain account reader
//!
//! The poller only ever needs "give me the current bytes of this account".
//! `AccountReader` is that seam; `RpcAccountReader` implements it with a
//! JSON-RPC `getAccountInfo` call and `InMemoryAccounts` backs tests and
//! offline runs.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::RwLock;
use types::ids::Address;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("account {0} not found")]
    NotFound(Address),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unexpected response payload: {0}")]
    Payload(String),
}

#[async_trait]
pub trait AccountReader: Send + Sync {
    /// Current data of `address`, or `ChainError::NotFound` if it does not exist.
    async fn get_account_bytes(&self, address: &Address) -> Result<Vec<u8>, ChainError>;
}

// ── JSON-RPC ────────────────────────────────────────────────────────

/// Default per-request timeout for RPC calls.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct RpcAccountReader {
    client: reqwest::Client,
    endpoint: String,
}

impl RpcAccountReader {
    /// Build a reader with its own HTTP client.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_RPC_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, endpoint))
    }

    /// Build a reader that shares an existing client's connection pool.
    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<RpcResult>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcResult {
    value: Option<RpcAccount>,
}

#[derive(Deserialize)]
struct RpcAccount {
    /// `[payload, encoding]`
    data: (String, String),
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Decode a `getAccountInfo` response body.
pub fn parse_account_response(address: &Address, body: &str) -> Result<Vec<u8>, ChainError> {
    let response: RpcResponse =
        serde_json::from_str(body).map_err(|e| ChainError::Payload(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(ChainError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    let result = response
        .result
        .ok_or_else(|| ChainError::Payload("missing result".to_string()))?;
    let account = result.value.ok_or(ChainError::NotFound(*address))?;

    let (payload, encoding) = account.data;
    if encoding != "base64" {
        return Err(ChainError::Payload(format!("unsupported encoding {encoding}")));
    }
    STANDARD
        .decode(payload)
        .map_err(|e| ChainError::Payload(e.to_string()))
}

#[async_trait]
impl AccountReader for RpcAccountReader {
    async fn get_account_bytes(&self, address: &Address) -> Result<Vec<u8>, ChainError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getAccountInfo",
            "params": [
                address.to_base58(),
                { "encoding": "base64", "commitment": "confirmed" }
            ]
        });

        let body = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_account_response(address, &body)
    }
}

// ── In-memory ───────────────────────────────────────────────────────

/// Account store served from memory.
#[derive(Default)]
pub struct InMemoryAccounts {
    accounts: RwLock<HashMap<Address, Vec<u8>>>,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, address: Address, data: Vec<u8>) {
        self.accounts.write().await.insert(address, data);
    }

    pub async fn remove(&self, address: &Address) {
        self.accounts.write().await.remove(address);
    }
}

#[async_trait]
impl AccountReader for InMemoryAccounts {
    async fn get_account_bytes(&self, address: &Address) -> Result<Vec<u8>, ChainError> {
        self.accounts
            .read()
            .await
            .get(address)
            .cloned()
            .ok_or(ChainError::NotFound(*address))
    }
}
