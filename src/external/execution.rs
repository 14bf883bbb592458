//! Execution trait resolving the "paper/live share code paths but diverge
//! subtly" open question: both implementations return the same
//! [`ExecutionOutcome`] shape, so downstream ledger/telemetry code cannot
//! tell which one ran.

use super::{AggregatorClient, QuoteRequest, SwapRequest};
use crate::error::Result;
use crate::types::{Mint, Side};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub mint: Mint,
    pub side: Side,
    pub amount_in: f64,
    pub slippage_bps: u32,
    /// Routes the sell's output to a stablecoin rather than SOL. Set by the
    /// flash-close path for capital preservation; the signer/aggregator
    /// route that actually honors this stays out of scope, so adapters pass
    /// it straight through onto the outcome.
    pub output_stable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub tx_sig: String,
    pub filled_qty: f64,
    pub proceeds_usd: f64,
    pub output_stable: bool,
}

#[async_trait]
pub trait Execution: Send + Sync {
    async fn execute(&self, req: ExecutionRequest) -> Result<ExecutionOutcome>;
}

/// Simulates fills from an aggregator quote without submitting a real
/// transaction. Used for dry runs and for replaying historical scenarios.
pub struct PaperExecution {
    aggregator: Arc<dyn AggregatorClient>,
}

impl PaperExecution {
    pub fn new(aggregator: Arc<dyn AggregatorClient>) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl Execution for PaperExecution {
    async fn execute(&self, req: ExecutionRequest) -> Result<ExecutionOutcome> {
        let output_stable = req.output_stable;
        let quote = self
            .aggregator
            .quote(QuoteRequest {
                mint: req.mint,
                side: req.side,
                amount_in: req.amount_in,
                slippage_bps: req.slippage_bps,
            })
            .await?;

        let (filled_qty, proceeds_usd) = match req.side {
            Side::Buy => (quote.out_amount, quote.in_amount * quote.price_usd),
            Side::Sell => (quote.in_amount, quote.out_amount),
        };

        Ok(ExecutionOutcome {
            tx_sig: format!("paper-{}", uuid::Uuid::new_v4()),
            filled_qty,
            proceeds_usd,
            output_stable,
        })
    }
}

/// Delegates to a real aggregator for quote and swap-build. Transaction
/// signing and submission stay out of scope (trait-only signer).
pub struct LiveExecution {
    aggregator: Arc<dyn AggregatorClient>,
}

impl LiveExecution {
    pub fn new(aggregator: Arc<dyn AggregatorClient>) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl Execution for LiveExecution {
    async fn execute(&self, req: ExecutionRequest) -> Result<ExecutionOutcome> {
        let output_stable = req.output_stable;
        let quote = self
            .aggregator
            .quote(QuoteRequest {
                mint: req.mint,
                side: req.side,
                amount_in: req.amount_in,
                slippage_bps: req.slippage_bps,
            })
            .await?;

        let swap = self
            .aggregator
            .swap_tx(SwapRequest {
                quote,
                slippage_bps: req.slippage_bps,
            })
            .await?;

        let proceeds_usd = match req.side {
            Side::Buy => swap.filled_in_amount,
            Side::Sell => swap.filled_out_amount,
        };

        Ok(ExecutionOutcome {
            tx_sig: swap.tx_sig,
            filled_qty: match req.side {
                Side::Buy => swap.filled_out_amount,
                Side::Sell => swap.filled_in_amount,
            },
            proceeds_usd,
            output_stable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::aggregator::MockAggregatorClient;

    #[tokio::test]
    async fn paper_execution_synthesizes_tx_sig() {
        let exec = PaperExecution::new(Arc::new(MockAggregatorClient::new(2.0)));
        let outcome = exec
            .execute(ExecutionRequest {
                mint: Mint::from("mint1"),
                side: Side::Buy,
                amount_in: 10.0,
                slippage_bps: 100,
                output_stable: false,
            })
            .await
            .unwrap();
        assert!(outcome.tx_sig.starts_with("paper-"));
        assert!((outcome.filled_qty - 5.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn live_execution_returns_aggregator_tx_sig() {
        let exec = LiveExecution::new(Arc::new(MockAggregatorClient::new(2.0)));
        let outcome = exec
            .execute(ExecutionRequest {
                mint: Mint::from("mint1"),
                side: Side::Sell,
                amount_in: 5.0,
                slippage_bps: 100,
                output_stable: false,
            })
            .await
            .unwrap();
        assert!(outcome.tx_sig.starts_with("mock-"));
        assert!((outcome.filled_qty - 5.0).abs() < 1e-9);
    }
}
