//! Ties one tick together: market-scan inputs are
//! supplied by the caller (market-data scraping is out of scope); from there
//! the engine runs decisions → ranking → rotation → sizing → scout/exit
//! execution → ledger/telemetry in the fixed order the design specifies.

use crate::bars::{PriceBarStore, WriteSummary};
use crate::config::Config;
use crate::decisions::{self, CoreHolding, DecisionsConfigView, ScoredCandidate};
use crate::error::Result;
use crate::exit::{ExitReason, PositionCloser};
use crate::external::{AggregatorClient, BalanceReader, Execution, MarketDataClient};
use crate::ledger::LotLedger;
use crate::ranking::rotation::{self, RotationAction};
use crate::ranking::{Candidate as RankCandidate, HeldPosition, RankedItem};
use crate::scout::gates::GateContext;
use crate::scout::ScoutQueueProcessor;
use crate::sizing::{CapitalSizer, SizingContext};
use crate::store::Store;
use crate::telemetry::TelemetryAggregator;
use crate::types::{Mint, SlotType};
use crate::watchdog::{LiquidationLock, OrphanTracker, StuckTargetWatchdog};
use tokio::sync::RwLock;

/// One market-observed candidate, as handed to the engine by the (out of
/// scope) market-scan collaborator.
#[derive(Debug, Clone)]
pub struct MarketCandidate {
    pub mint: Mint,
    pub signal: f64,
    pub regime: crate::types::Regime,
    pub scanner_score: f64,
    pub volume_24h: f64,
    pub liquidity_usd: f64,
    pub price_change_24h: f64,
    pub freshness_hours: f64,
    pub price_usd: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub rotation_action: Option<String>,
    pub scout_ticks_run: u32,
    pub exits_run: u32,
}

/// Owns every in-memory map the tick loop needs between ticks, following
/// `PositionManager`'s `RwLock`-guarded-field idiom rather than scattering
/// global statics.
pub struct Engine {
    pub store: Store,
    pub ledger: LotLedger,
    pub bars: RwLock<PriceBarStore>,
    pub orphan_tracker: RwLock<OrphanTracker>,
    pub stuck_watchdog: StuckTargetWatchdog,
    pub liquidation_lock: LiquidationLock,
    pub sizer: RwLock<CapitalSizer>,
    pub aggregator: std::sync::Arc<dyn AggregatorClient>,
    pub market_data: std::sync::Arc<dyn MarketDataClient>,
    pub execution: std::sync::Arc<dyn Execution>,
    pub balances: std::sync::Arc<dyn BalanceReader>,
    pub config: Config,
}

impl Engine {
    pub fn new(
        store: Store,
        config: Config,
        aggregator: std::sync::Arc<dyn AggregatorClient>,
        market_data: std::sync::Arc<dyn MarketDataClient>,
        execution: std::sync::Arc<dyn Execution>,
        balances: std::sync::Arc<dyn BalanceReader>,
    ) -> Self {
        let ledger = LotLedger::new(store.lots());
        let liquidation_lock = LiquidationLock::new(store.positions(), config.liquidation.clone());
        Self {
            bars: RwLock::new(PriceBarStore::new(config.bars.clone())),
            orphan_tracker: RwLock::new(OrphanTracker::new(config.orphan.clone())),
            stuck_watchdog: StuckTargetWatchdog::new(config.watchdog.clone()),
            sizer: RwLock::new(CapitalSizer::new(config.sizing.clone())),
            liquidation_lock,
            ledger,
            store,
            aggregator,
            market_data,
            execution,
            balances,
            config,
        }
    }

    /// Marks every held position to `prices` (advancing `peak_price`/
    /// `peak_time`/`peak_pnl_pct` on new highs) and appends a price bar for
    /// each observed pair. Call once per tick before `evaluate_rotation` so
    /// the ranking engine's trailing-stop and break-even-lock flags see
    /// peaks that actually track the market rather than the entry print.
    pub async fn mark_to_market(&self, prices: &[(Mint, Option<f64>)], now: i64) -> Result<WriteSummary> {
        for (mint, price) in prices {
            if let Some(price) = price {
                self.store.positions().mark_price(mint, *price, now).await?;
            }
        }
        let mut bars = self.bars.write().await;
        Ok(bars.write_tick(prices, now))
    }

    /// Runs decisions → ranking → rotation for the current snapshot and
    /// returns the single action the rotation evaluator chose, if any.
    pub async fn evaluate_rotation(&self, candidates: &[MarketCandidate], now_ms: i64) -> Result<RotationAction> {
        let held_rows = self.store.positions().all_held().await?;

        let mut held_ranked: Vec<RankedItem> = Vec::with_capacity(held_rows.len());
        for row in &held_rows {
            let entry_ms = self
                .ledger
                .entry_timestamp(&row.mint)
                .await?
                .map(|ts| ts * 1000)
                .unwrap_or(row.peak_time * 1000);

            held_ranked.push(crate::ranking::rank_held(
                &HeldPosition {
                    mint: row.mint.clone(),
                    signal: 0.0,
                    regime: crate::types::Regime::Unknown,
                    entry_price: row.entry_price,
                    peak_price: row.peak_price,
                    current_price: row.last_price,
                    entry_ms,
                    now_ms,
                    slot_type: row.slot_type,
                    fifo_discrepancy: false,
                    peak_pnl_pct: row.peak_pnl_pct,
                },
                &self.config.ranking,
            ));
        }

        let candidate_ranked: Vec<RankedItem> = candidates
            .iter()
            .map(|c| {
                crate::ranking::rank_candidate(
                    &RankCandidate {
                        mint: c.mint.clone(),
                        signal: c.signal,
                        regime: c.regime,
                        scanner_score: c.scanner_score,
                        volume_24h: c.volume_24h,
                        liquidity_usd: c.liquidity_usd,
                        price_change_24h: c.price_change_24h,
                        freshness_hours: c.freshness_hours,
                    },
                    &self.config.ranking,
                )
            })
            .collect();

        Ok(rotation::evaluate(&held_ranked, &candidate_ranked, &self.config.rotation, held_rows.len()))
    }

    /// Core-baseline reservation followed by score-proportional distribution.
    pub fn compute_targets(&self, cores: &[CoreHolding], candidates: &[ScoredCandidate]) -> (Vec<decisions::Target>, decisions::TargetsMeta) {
        let view = DecisionsConfigView {
            core_target_pct: self.config.decisions.core_target_pct,
            max_pos_pct: self.config.decisions.max_pos_pct,
            deploy_target_pct: self.config.decisions.deploy_target_pct,
            max_scaling_passes: self.config.decisions.max_scaling_passes,
        };
        decisions::compute_targets(cores, candidates, &view, 1.0)
    }

    /// Executes one rotation action: an exit reason plus (for replacement
    /// rotations) the caller's responsibility to re-enqueue the scout side.
    pub async fn apply_rotation(&self, action: &RotationAction, telemetry: &mut TelemetryAggregator<'_>, now: i64) -> Result<u32> {
        let closer = PositionCloser::new(
            &self.config.exit,
            &self.ledger,
            self.execution.as_ref(),
            self.balances.as_ref(),
            &self.liquidation_lock,
        );

        let (mint, reason) = match action {
            RotationAction::BreakEvenLockExit { mint } => (mint, ExitReason::TakeProfit),
            RotationAction::ScoutStopLossExit { mint } => (mint, ExitReason::ScoutStopLossExit),
            RotationAction::CoreLossExit { mint } => (mint, ExitReason::CoreLossExit),
            RotationAction::ScoutUnderperformGraceExpired { mint } => (mint, ExitReason::ScoutUnderperformGraceExpired),
            RotationAction::TrailingStopExit { mint } => (mint, ExitReason::TakeProfit),
            RotationAction::StaleTimeoutExit { mint } => (mint, ExitReason::UniverseExit),
            RotationAction::OpportunityCostRotation { worst_mint, .. } => (worst_mint, ExitReason::UniverseExit),
            RotationAction::StaleRotationWithReplacement { worst_mint, .. } => (worst_mint, ExitReason::UniverseExit),
            RotationAction::NoAction => return Ok(0),
        };

        let row = self.store.positions().get(mint).await?;
        let Some(row) = row else { return Ok(0) };

        closer.close_position(mint, reason, row.last_price, now, row.slot_type).await?;
        if row.total_tokens <= 1e-9 {
            self.store.positions().delete(mint).await?;
        }
        telemetry.record_exit();
        Ok(1)
    }

    /// Runs one scout-queue claim and gate-pipeline pass.
    pub async fn run_scout_tick(
        &self,
        sol_balance: f64,
        daily_entry_count: u32,
        current_scout_slots: usize,
        price_lookup: impl Fn(&Mint) -> f64,
        now: i64,
    ) -> Result<crate::scout::TickOutcome> {
        let queue = self.store.scout_queue();
        let positions = self.store.positions();
        let sizer = self.sizer.read().await;
        let bars = self.bars.read().await;

        let processor = ScoutQueueProcessor {
            queue: &queue,
            positions: &positions,
            ledger: &self.ledger,
            scout_cfg: &self.config.scout,
            sizing_cfg: &self.config.sizing,
            liquidation_lock: &self.liquidation_lock,
            sizer: &sizer,
            aggregator: self.aggregator.as_ref(),
            execution: self.execution.as_ref(),
        };

        processor
            .tick(self.config.runtime.manual_pause, now, |mint| {
                let price_usd = price_lookup(mint);
                GateContext {
                    mint: mint.clone(),
                    now,
                    daily_entry_count,
                    current_scout_slots,
                    sol_balance,
                    spend_sol: 0.1,
                    tx_fee_buffer_sol: 0.01,
                    whale_confirmed: None,
                    price_usd,
                    sizing_ctx: SizingContext {
                        mint: mint.clone(),
                        equity_usd: sol_balance * 150.0,
                        sol_price_usd: 150.0,
                        mode: SlotType::Scout,
                        stop_pct: 0.1,
                        expected_move_pct: 0.2,
                        current_mint_exposure_usd: 0.0,
                        pool_tvl_usd: None,
                        vol_5m_usd: None,
                        vol_1h_usd: None,
                    },
                    bars: &bars,
                    first_seen_at: now,
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{MockAggregatorClient, MockMarketDataClient, PaperExecution, ScriptedBalanceReader};
    use std::sync::Arc;

    fn test_config() -> Config {
        Config::default()
    }

    #[tokio::test]
    async fn evaluate_rotation_returns_no_action_with_no_positions() {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let agg = Arc::new(MockAggregatorClient::new(1.0));
        let market = Arc::new(MockMarketDataClient::default());
        let exec = Arc::new(PaperExecution::new(agg.clone()));
        let balances = Arc::new(ScriptedBalanceReader::new(vec![0.0], 1.0));

        let engine = Engine::new(store, test_config(), agg, market, exec, balances);
        let action = engine.evaluate_rotation(&[], 1_000_000).await.unwrap();
        assert_eq!(action, RotationAction::NoAction);
    }

    #[test]
    fn compute_targets_reserves_core_baseline() {
        let store = futures::executor::block_on(async {
            let s = Store::open_in_memory().unwrap();
            s.init_schema().await.unwrap();
            s
        });
        let agg = Arc::new(MockAggregatorClient::new(1.0));
        let market = Arc::new(MockMarketDataClient::default());
        let exec = Arc::new(PaperExecution::new(agg.clone()));
        let balances = Arc::new(ScriptedBalanceReader::new(vec![0.0], 1.0));
        let engine = Engine::new(store, test_config(), agg, market, exec, balances);

        let cores = vec![CoreHolding { mint: Mint::from("core1") }];
        let (targets, _meta) = engine.compute_targets(&cores, &[]);
        let core_target = targets.iter().find(|t| t.mint.0 == "core1").unwrap();
        assert!(core_target.weight_pct > 0.0);
    }
}
