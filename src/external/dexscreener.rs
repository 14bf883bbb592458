//! Market-data adapter for DexScreener's public token-pairs API.

use super::MarketDataClient;
use crate::error::{Error, Result};
use crate::types::Mint;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEXSCREENER_BASE: &str = "https://api.dexscreener.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceChange {
    pub m5: Option<f64>,
    pub h1: Option<f64>,
    pub h6: Option<f64>,
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxnCount {
    pub buys: u32,
    pub sells: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Txns {
    pub m5: Option<TxnCount>,
    pub h1: Option<TxnCount>,
    pub h6: Option<TxnCount>,
    pub h24: Option<TxnCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Liquidity {
    pub usd: Option<f64>,
    pub base: Option<f64>,
    pub quote: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    pub m5: Option<f64>,
    pub h1: Option<f64>,
    pub h6: Option<f64>,
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseToken {
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexPair {
    #[serde(rename = "chainId")]
    pub chain_id: String,
    #[serde(rename = "dexId")]
    pub dex_id: String,
    pub url: Option<String>,
    #[serde(rename = "pairAddress")]
    pub pair_address: String,
    #[serde(rename = "baseToken")]
    pub base_token: BaseToken,
    #[serde(rename = "priceNative")]
    pub price_native: Option<String>,
    #[serde(rename = "priceUsd")]
    pub price_usd: Option<String>,
    #[serde(rename = "priceChange")]
    pub price_change: Option<PriceChange>,
    pub txns: Option<Txns>,
    pub volume: Option<Volume>,
    pub liquidity: Option<Liquidity>,
    #[serde(rename = "marketCap")]
    pub market_cap: Option<f64>,
    pub fdv: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenPairsResponse {
    pairs: Option<Vec<DexPair>>,
}

pub struct DexScreenerClient {
    client: reqwest::Client,
}

impl DexScreenerClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for DexScreenerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataClient for DexScreenerClient {
    async fn token_pairs(&self, mint: &Mint) -> Result<Vec<DexPair>> {
        let url = format!("{}/latest/dex/tokens/{}", DEXSCREENER_BASE, mint.as_str());
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::MarketData(e.to_string()))?;
        let data: TokenPairsResponse = resp
            .json()
            .await
            .map_err(|e| Error::MarketData(e.to_string()))?;
        Ok(data.pairs.unwrap_or_default())
    }
}

/// Fixed-fixture market-data client for tests exercising bars/ranking logic.
pub struct MockMarketDataClient {
    pub pairs: std::collections::HashMap<String, Vec<DexPair>>,
}

impl MockMarketDataClient {
    pub fn new() -> Self {
        Self {
            pairs: std::collections::HashMap::new(),
        }
    }

    pub fn with_pairs(mut self, mint: &str, pairs: Vec<DexPair>) -> Self {
        self.pairs.insert(mint.to_string(), pairs);
        self
    }
}

impl Default for MockMarketDataClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataClient for MockMarketDataClient {
    async fn token_pairs(&self, mint: &Mint) -> Result<Vec<DexPair>> {
        Ok(self.pairs.get(mint.as_str()).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pair(price_usd: &str, liquidity_usd: f64) -> DexPair {
        DexPair {
            chain_id: "solana".into(),
            dex_id: "raydium".into(),
            url: None,
            pair_address: "pair1".into(),
            base_token: BaseToken {
                address: "mint1".into(),
                name: Some("Token".into()),
                symbol: Some("TKN".into()),
            },
            price_native: None,
            price_usd: Some(price_usd.to_string()),
            price_change: None,
            txns: None,
            volume: None,
            liquidity: Some(Liquidity {
                usd: Some(liquidity_usd),
                base: None,
                quote: None,
            }),
            market_cap: None,
            fdv: None,
        }
    }

    #[tokio::test]
    async fn mock_client_returns_configured_pairs() {
        let client = MockMarketDataClient::new().with_pairs("mint1", vec![sample_pair("1.5", 50_000.0)]);
        let pairs = client.token_pairs(&Mint::from("mint1")).await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].price_usd.as_deref(), Some("1.5"));
    }

    #[tokio::test]
    async fn mock_client_unknown_mint_returns_empty() {
        let client = MockMarketDataClient::new();
        let pairs = client.token_pairs(&Mint::from("unknown")).await.unwrap();
        assert!(pairs.is_empty());
    }
}
