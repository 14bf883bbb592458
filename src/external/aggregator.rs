//! HTTP aggregator client: build request struct, POST JSON, parse response.

use super::{AggregatorClient, QuoteRequest, QuoteResponse, SwapRequest, SwapTxResponse};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Serialize)]
struct QuoteApiRequest {
    mint: String,
    side: &'static str,
    #[serde(rename = "amountIn")]
    amount_in: f64,
    #[serde(rename = "slippageBps")]
    slippage_bps: u32,
}

#[derive(Debug, Deserialize)]
struct QuoteApiResponse {
    mint: String,
    side: String,
    #[serde(rename = "inAmount")]
    in_amount: f64,
    #[serde(rename = "outAmount")]
    out_amount: f64,
    #[serde(rename = "priceUsd")]
    price_usd: f64,
    #[serde(rename = "priceImpactPct")]
    price_impact_pct: f64,
}

#[derive(Debug, Serialize)]
struct SwapApiRequest<'a> {
    quote: &'a QuoteApiResponse,
    #[serde(rename = "slippageBps")]
    slippage_bps: u32,
}

#[derive(Debug, Deserialize)]
struct SwapApiResponse {
    #[serde(rename = "txSig")]
    tx_sig: String,
    #[serde(rename = "filledInAmount")]
    filled_in_amount: f64,
    #[serde(rename = "filledOutAmount")]
    filled_out_amount: f64,
}

/// Talks to a swap aggregator's HTTP API: `GET /quote`, `POST /swap`.
/// Retries transient failures up to [`MAX_ATTEMPTS`] times with linear
/// backoff (1s * attempt number).
pub struct HttpAggregatorClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAggregatorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
        }
    }

    async fn quote_once(&self, body: &QuoteApiRequest) -> Result<QuoteApiResponse> {
        let url = format!("{}/quote", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(body)
            .send()
            .await
            .map_err(|e| Error::Quote(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::Quote(format!("quote request failed: {}", resp.status())));
        }
        resp.json::<QuoteApiResponse>()
            .await
            .map_err(|e| Error::Quote(e.to_string()))
    }

    async fn swap_once(&self, body: &SwapApiRequest<'_>) -> Result<SwapApiResponse> {
        let url = format!("{}/swap", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::SwapBuild(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::SwapBuild(format!("swap request failed: {}", resp.status())));
        }
        resp.json::<SwapApiResponse>()
            .await
            .map_err(|e| Error::SwapBuild(e.to_string()))
    }
}

#[async_trait]
impl AggregatorClient for HttpAggregatorClient {
    async fn quote(&self, req: QuoteRequest) -> Result<QuoteResponse> {
        let body = QuoteApiRequest {
            mint: req.mint.as_str().to_string(),
            side: match req.side {
                crate::types::Side::Buy => "buy",
                crate::types::Side::Sell => "sell",
            },
            amount_in: req.amount_in,
            slippage_bps: req.slippage_bps,
        };

        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.quote_once(&body).await {
                Ok(resp) => {
                    return Ok(QuoteResponse {
                        mint: req.mint,
                        side: req.side,
                        in_amount: resp.in_amount,
                        out_amount: resp.out_amount,
                        price_usd: resp.price_usd,
                        price_impact_pct: resp.price_impact_pct,
                    })
                }
                Err(e) => {
                    warn!(attempt, error = %e, "quote attempt failed");
                    last_err = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| Error::Quote("no attempts made".into())))
    }

    async fn swap_tx(&self, req: SwapRequest) -> Result<SwapTxResponse> {
        let api_quote = QuoteApiResponse {
            mint: req.quote.mint.as_str().to_string(),
            side: match req.quote.side {
                crate::types::Side::Buy => "buy".into(),
                crate::types::Side::Sell => "sell".into(),
            },
            in_amount: req.quote.in_amount,
            out_amount: req.quote.out_amount,
            price_usd: req.quote.price_usd,
            price_impact_pct: req.quote.price_impact_pct,
        };
        let body = SwapApiRequest {
            quote: &api_quote,
            slippage_bps: req.slippage_bps,
        };

        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.swap_once(&body).await {
                Ok(resp) => {
                    debug!(tx_sig = %resp.tx_sig, "swap submitted");
                    return Ok(SwapTxResponse {
                        tx_sig: resp.tx_sig,
                        filled_in_amount: resp.filled_in_amount,
                        filled_out_amount: resp.filled_out_amount,
                    });
                }
                Err(e) => {
                    warn!(attempt, error = %e, "swap attempt failed");
                    last_err = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| Error::SwapBuild("no attempts made".into())))
    }
}

/// Fixed-fixture aggregator used by tests that exercise scout/sizing/exit
/// logic without a network. Quotes always fill at 1:1 price with zero
/// impact unless configured otherwise.
pub struct MockAggregatorClient {
    pub price_usd: f64,
    pub price_impact_pct: f64,
}

impl MockAggregatorClient {
    pub fn new(price_usd: f64) -> Self {
        Self {
            price_usd,
            price_impact_pct: 0.0,
        }
    }
}

#[async_trait]
impl AggregatorClient for MockAggregatorClient {
    async fn quote(&self, req: QuoteRequest) -> Result<QuoteResponse> {
        let out_amount = if self.price_usd > 0.0 {
            req.amount_in / self.price_usd
        } else {
            0.0
        };
        Ok(QuoteResponse {
            mint: req.mint,
            side: req.side,
            in_amount: req.amount_in,
            out_amount,
            price_usd: self.price_usd,
            price_impact_pct: self.price_impact_pct,
        })
    }

    async fn swap_tx(&self, req: SwapRequest) -> Result<SwapTxResponse> {
        Ok(SwapTxResponse {
            tx_sig: format!("mock-{}", uuid::Uuid::new_v4()),
            filled_in_amount: req.quote.in_amount,
            filled_out_amount: req.quote.out_amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Mint, Side};

    #[tokio::test]
    async fn mock_quote_uses_configured_price() {
        let client = MockAggregatorClient::new(2.0);
        let quote = client
            .quote(QuoteRequest {
                mint: Mint::from("mint1"),
                side: Side::Buy,
                amount_in: 10.0,
                slippage_bps: 100,
            })
            .await
            .unwrap();
        assert!((quote.out_amount - 5.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn mock_swap_fills_at_quoted_amounts() {
        let client = MockAggregatorClient::new(2.0);
        let quote = client
            .quote(QuoteRequest {
                mint: Mint::from("mint1"),
                side: Side::Buy,
                amount_in: 10.0,
                slippage_bps: 100,
            })
            .await
            .unwrap();
        let swap = client
            .swap_tx(SwapRequest {
                quote: quote.clone(),
                slippage_bps: 100,
            })
            .await
            .unwrap();
        assert!((swap.filled_out_amount - quote.out_amount).abs() < 1e-9);
        assert!(swap.tx_sig.starts_with("mock-"));
    }
}
