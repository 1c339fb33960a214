//! mempool.space-compatible REST client
//!
//! | Call | Endpoint |
//! |------|----------|
//! | `list_utxos` | `GET /api/address/{address}/utxo` |
//! | `recommended_fees` | `GET /api/v1/fees/recommended` |
//! | `raw_transaction_hex` | `GET /api/tx/{txid}/hex` |
//! | `broadcast` | `POST /api/tx` (hex body) |

use std::str::FromStr;

use async_trait::async_trait;
use bitcoin::Txid;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{ChainData, ChainError, FeeRates, UnspentOutput, UtxoSet};
use crate::config::FractalConfig;

#[derive(Debug, Deserialize)]
struct UtxoStatus {
    confirmed: bool,
}

#[derive(Debug, Deserialize)]
struct MempoolUtxo {
    txid: Txid,
    vout: u32,
    value: u64,
    status: UtxoStatus,
}

impl From<MempoolUtxo> for UnspentOutput {
    fn from(u: MempoolUtxo) -> Self {
        UnspentOutput { txid: u.txid, vout: u.vout, value: u.value, confirmed: u.status.confirmed }
    }
}

pub struct MempoolClient {
    http: Client,
    base_url: String,
}

impl MempoolClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ChainError> {
        Self::with_client(base_url, Client::new())
    }

    pub fn from_config(config: &FractalConfig) -> Result<Self, ChainError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChainError::Unavailable(format!("http client: {}", e)))?;
        Self::with_client(&config.mempool_url, http)
    }

    pub fn with_client(base_url: impl Into<String>, http: Client) -> Result<Self, ChainError> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ChainError::Unavailable("empty mempool url".into()));
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    fn url(&self, path: &str) -> String { format!("{}{}", self.base_url, path) }

    async fn get(&self, path: &str) -> Result<Response, ChainError> {
        let url = self.url(path);
        debug!(%url, "GET");
        self.http.get(&url).send().await.map_err(|e| ChainError::Unavailable(format!("{}: {}", url, e)))
    }
}

async fn body_text(response: Response) -> Result<String, ChainError> {
    response.text().await.map_err(|e| ChainError::Decode(e.to_string()))
}

fn parse_utxos(body: &str) -> Result<UtxoSet, ChainError> {
    let utxos: Vec<MempoolUtxo> = serde_json::from_str(body).map_err(|e| ChainError::Decode(format!("utxo list: {}", e)))?;
    Ok(UtxoSet::from_outputs(utxos.into_iter().map(UnspentOutput::from)))
}

#[async_trait]
impl ChainData for MempoolClient {
    async fn list_utxos(&self, address: &str) -> Result<UtxoSet, ChainError> {
        let response = self.get(&format!("/api/address/{}/utxo", address)).await?;
        if !response.status().is_success() {
            return Err(ChainError::Unavailable(format!("utxo list for {}: HTTP {}", address, response.status())));
        }
        parse_utxos(&body_text(response).await?)
    }

    async fn recommended_fees(&self) -> Result<FeeRates, ChainError> {
        let response = self.get("/api/v1/fees/recommended").await?;
        if !response.status().is_success() {
            return Err(ChainError::Unavailable(format!("fee rates: HTTP {}", response.status())));
        }
        response.json::<FeeRates>().await.map_err(|e| ChainError::Decode(format!("fee rates: {}", e)))
    }

    async fn raw_transaction_hex(&self, txid: &Txid) -> Result<String, ChainError> {
        let response = self.get(&format!("/api/tx/{}/hex", txid)).await?;
        match response.status() {
            s if s.is_success() => Ok(body_text(response).await?.trim().to_string()),
            StatusCode::NOT_FOUND => Err(ChainError::NotFound(txid.to_string())),
            s => Err(ChainError::Unavailable(format!("tx {}: HTTP {}", txid, s))),
        }
    }

    async fn broadcast(&self, raw_hex: &str) -> Result<Txid, ChainError> {
        let url = self.url("/api/tx");
        debug!(%url, bytes = raw_hex.len() / 2, "POST");
        let response = self
            .http
            .post(&url)
            .body(raw_hex.to_string())
            .send()
            .await
            .map_err(|e| ChainError::Unavailable(format!("{}: {}", url, e)))?;
        let status = response.status();
        let body = body_text(response).await?;
        if !status.is_success() {
            return Err(ChainError::Rejected(format!("HTTP {}: {}", status, body.trim())));
        }
        Txid::from_str(body.trim()).map_err(|e| ChainError::Decode(format!("broadcast txid {:?}: {}", body.trim(), e)))
    }
}
