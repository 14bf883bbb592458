//! Out-of-scope network collaborators, modelled as traits so the rest of the
//! engine can be exercised without a network.

pub mod aggregator;
pub mod balance;
pub mod dexscreener;
pub mod execution;

pub use aggregator::{HttpAggregatorClient, MockAggregatorClient};
pub use balance::ScriptedBalanceReader;
pub use dexscreener::{DexScreenerClient, MockMarketDataClient};
pub use execution::{Execution, ExecutionOutcome, LiveExecution, PaperExecution};

use crate::error::Result;
use crate::types::{Mint, Side};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub mint: Mint,
    pub side: Side,
    pub amount_in: f64,
    pub slippage_bps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub mint: Mint,
    pub side: Side,
    pub in_amount: f64,
    pub out_amount: f64,
    pub price_usd: f64,
    pub price_impact_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    pub quote: QuoteResponse,
    pub slippage_bps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapTxResponse {
    pub tx_sig: String,
    pub filled_in_amount: f64,
    pub filled_out_amount: f64,
}

/// Quote and swap-build collaborator. The real adapter talks to an aggregator
/// HTTP API; tests inject [`MockAggregatorClient`] instead.
#[async_trait]
pub trait AggregatorClient: Send + Sync {
    async fn quote(&self, req: QuoteRequest) -> Result<QuoteResponse>;
    async fn swap_tx(&self, req: SwapRequest) -> Result<SwapTxResponse>;
}

/// Token-pair market-data collaborator (liquidity, volume, price-change).
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    async fn token_pairs(&self, mint: &Mint) -> Result<Vec<dexscreener::DexPair>>;
}

/// On-chain balance reader. The signer and RPC client themselves are out of
/// scope; this is the one fact about them the exit-invariant algorithm needs.
#[async_trait]
pub trait BalanceReader: Send + Sync {
    async fn token_balance(&self, mint: &Mint) -> Result<f64>;
    async fn sol_balance(&self) -> Result<f64>;
}
