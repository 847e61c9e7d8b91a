//! JSON-RPC client for read-only connection checks and calls.
//!
//! One request per call. No retries and no backoff; a failed call is
//! reported to the caller as is.

use crate::error::{BlueprintError, Result};
use crate::tx::Address;
use crate::util::strip_hex_prefix;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::debug;

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Network {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
}

/// Networks known without any configuration.
pub fn default_networks() -> Vec<Network> {
    vec![
        Network {
            name: "arbitrum-sepolia".to_string(),
            chain_id: 421614,
            rpc_url: "https://sepolia-rollup.arbitrum.io/rpc".to_string(),
        },
        Network {
            name: "arbitrum-one".to_string(),
            chain_id: 42161,
            rpc_url: "https://arb1.arbitrum.io/rpc".to_string(),
        },
    ]
}

#[derive(Serialize, Debug)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize, Debug)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize, Debug)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ConnectionReport {
    pub network: String,
    pub chain_id: u64,
    pub block_number: u64,
    pub chain_id_matches: bool,
    pub latency_ms: u128,
}

pub struct RpcClient {
    rpc_url: String,
    http_client: reqwest::Client,
}

impl RpcClient {
    pub fn new(rpc_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(RpcClient {
            rpc_url: rpc_url.into(),
            http_client,
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        debug!(url = %self.rpc_url, method, "rpc request");
        let response: RpcResponse = self
            .http_client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        into_result(response)
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let value = self.request("eth_chainId", json!([])).await?;
        parse_quantity(as_str(&value)?)
    }

    pub async fn block_number(&self) -> Result<u64> {
        let value = self.request("eth_blockNumber", json!([])).await?;
        parse_quantity(as_str(&value)?)
    }

    /// Deployed bytecode at `address` on the latest block, `0x` when empty.
    pub async fn get_code(&self, address: &Address) -> Result<String> {
        let value = self
            .request("eth_getCode", json!([address.to_string(), "latest"]))
            .await?;
        Ok(as_str(&value)?.to_string())
    }

    pub async fn call(&self, to: &Address, data: &str) -> Result<String> {
        let value = self
            .request(
                "eth_call",
                json!([{ "to": to.to_string(), "data": data }, "latest"]),
            )
            .await?;
        Ok(as_str(&value)?.to_string())
    }

    pub async fn check_connection(&self, network: &Network) -> Result<ConnectionReport> {
        let started = Instant::now();
        let chain_id = self.chain_id().await?;
        let block_number = self.block_number().await?;
        Ok(ConnectionReport {
            network: network.name.clone(),
            chain_id,
            block_number,
            chain_id_matches: chain_id == network.chain_id,
            latency_ms: started.elapsed().as_millis(),
        })
    }
}

fn into_result(response: RpcResponse) -> Result<Value> {
    if let Some(error) = response.error {
        return Err(BlueprintError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    response
        .result
        .ok_or_else(|| BlueprintError::InvalidResponse("missing result".to_string()))
}

fn as_str(value: &Value) -> Result<&str> {
    value
        .as_str()
        .ok_or_else(|| BlueprintError::InvalidResponse(format!("expected hex string, got {value}")))
}

/// Parses a hex quantity such as `0x66eee`.
pub fn parse_quantity(quantity: &str) -> Result<u64> {
    let digits = strip_hex_prefix(quantity);
    if digits.is_empty() {
        return Err(BlueprintError::InvalidResponse(format!(
            "empty quantity `{quantity}`"
        )));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|_| BlueprintError::InvalidResponse(format!("invalid quantity `{quantity}`")))
}
