//! Pre-trade sellability and exit-liquidity probes run by the scout gate
//! pipeline: quote-only round-trip checks run before committing capital.

use crate::config::SizingConfig;
use crate::error::Result;
use crate::external::{AggregatorClient, QuoteRequest};
use crate::types::{Mint, Side, SlotType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Pass,
    Fail,
}

/// Small buy-then-sell quote pair; requires a minimum round-trip ratio
/// and a capped sell-side impact.
pub async fn sellability_probe(
    agg: &dyn AggregatorClient,
    mint: &Mint,
    probe_sol: f64,
    mode: SlotType,
    cfg: &SizingConfig,
) -> Result<ProbeOutcome> {
    let (min_ratio, exit_max) = match mode {
        SlotType::Scout => (cfg.min_round_trip_ratio_scout, cfg.exit_max_impact_pct_scout),
        SlotType::Core => (cfg.min_round_trip_ratio_core, cfg.exit_max_impact_pct_core),
    };

    let buy = agg
        .quote(QuoteRequest {
            mint: mint.clone(),
            side: Side::Buy,
            amount_in: probe_sol,
            slippage_bps: 100,
        })
        .await?;

    let sell = agg
        .quote(QuoteRequest {
            mint: mint.clone(),
            side: Side::Sell,
            amount_in: buy.out_amount,
            slippage_bps: 100,
        })
        .await?;

    let round_trip = if probe_sol > 0.0 { sell.out_amount / probe_sol } else { 0.0 };

    if round_trip >= min_ratio && sell.price_impact_pct <= exit_max {
        Ok(ProbeOutcome::Pass)
    } else {
        Ok(ProbeOutcome::Fail)
    }
}

/// Full-size exit quote against configured route constraints, run right
/// before a scout buy commits to a size that would be hard to unwind.
pub async fn exit_liquidity_probe(
    agg: &dyn AggregatorClient,
    mint: &Mint,
    full_size_tokens: f64,
    mode: SlotType,
    cfg: &SizingConfig,
) -> Result<ProbeOutcome> {
    let exit_max = match mode {
        SlotType::Scout => cfg.exit_max_impact_pct_scout,
        SlotType::Core => cfg.exit_max_impact_pct_core,
    };

    let quote = agg
        .quote(QuoteRequest {
            mint: mint.clone(),
            side: Side::Sell,
            amount_in: full_size_tokens,
            slippage_bps: 100,
        })
        .await?;

    if quote.out_amount > 0.0 && quote.price_impact_pct <= exit_max {
        Ok(ProbeOutcome::Pass)
    } else {
        Ok(ProbeOutcome::Fail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::aggregator::MockAggregatorClient;

    #[tokio::test]
    async fn sellability_probe_passes_on_frictionless_mock() {
        let agg = MockAggregatorClient::new(1.0);
        let outcome = sellability_probe(&agg, &Mint::from("mint1"), 0.1, SlotType::Scout, &SizingConfig::default())
            .await
            .unwrap();
        assert_eq!(outcome, ProbeOutcome::Pass);
    }

    #[tokio::test]
    async fn exit_liquidity_probe_passes_when_route_exists() {
        let agg = MockAggregatorClient::new(1.0);
        let outcome = exit_liquidity_probe(&agg, &Mint::from("mint1"), 100.0, SlotType::Core, &SizingConfig::default())
            .await
            .unwrap();
        assert_eq!(outcome, ProbeOutcome::Pass);
    }
}
