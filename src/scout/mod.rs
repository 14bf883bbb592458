//! Scout queue processor: a persistent
//! claim-lock work queue that ingests candidate assets, gates each with
//! the entry pipeline, and executes buys one claim per tick.

pub mod gates;
pub mod recovery;

use crate::config::{ScoutConfig, SizingConfig};
use crate::error::Result;
use crate::external::{AggregatorClient, Execution, ExecutionRequest};
use crate::ledger::lot::{Lot, LotStatus, Side as LotSide};
use crate::ledger::LotLedger;
use crate::sizing::CapitalSizer;
use crate::store::{PositionTrackingRepo, PositionTrackingRow, ScoutQueueRepo, ScoutQueueStatus};
use crate::types::{Mint, Side, SlotType, TxSig};
use crate::watchdog::LiquidationLock;
use gates::{GateContext, GateOutcome};

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Paused,
    NothingPending,
    Skipped { mint: Mint, reason: &'static str },
    Rescheduled { mint: Mint },
    Bought { mint: Mint, tx_sig: String },
    BuyFailed { mint: Mint, attempts: u32, terminal: bool },
}

pub struct ScoutQueueProcessor<'a> {
    pub queue: &'a ScoutQueueRepo,
    pub positions: &'a PositionTrackingRepo,
    pub ledger: &'a LotLedger,
    pub scout_cfg: &'a ScoutConfig,
    pub sizing_cfg: &'a SizingConfig,
    pub liquidation_lock: &'a LiquidationLock,
    pub sizer: &'a CapitalSizer,
    pub aggregator: &'a dyn AggregatorClient,
    pub execution: &'a dyn Execution,
}

impl<'a> ScoutQueueProcessor<'a> {
    /// One tick: pause gate, recovery sweep, atomic claim, gate pipeline,
    /// swap execution. Only one claim is processed per call.
    pub async fn tick(&self, paused: bool, now: i64, gate_ctx_for: impl FnOnce(&Mint) -> GateContext<'a>) -> Result<TickOutcome> {
        if paused {
            return Ok(TickOutcome::Paused);
        }

        recovery::reclaim_stale(self.queue, self.scout_cfg, now).await?;

        let claimed = match self.queue.claim_one_pending(now).await? {
            crate::store::ClaimOutcome::Claimed(row) => row,
            crate::store::ClaimOutcome::NoneAvailable => return Ok(TickOutcome::NothingPending),
        };

        let gate_ctx = gate_ctx_for(&claimed.mint);
        let outcome = gates::run(
            &gate_ctx,
            self.scout_cfg,
            self.sizing_cfg,
            self.liquidation_lock,
            self.sizer,
            self.aggregator,
        )
        .await?;

        match outcome {
            GateOutcome::Skipped(reason) => {
                self.queue
                    .set_status(&claimed.mint, ScoutQueueStatus::Skipped, None, claimed.buy_attempts, Some(reason))
                    .await?;
                Ok(TickOutcome::Skipped { mint: claimed.mint, reason })
            }
            GateOutcome::InsufficientBars => {
                let backoff = now + self.scout_cfg.reschedule_backoff_secs;
                self.queue
                    .set_status(
                        &claimed.mint,
                        ScoutQueueStatus::Pending,
                        Some(backoff),
                        claimed.buy_attempts,
                        Some("insufficient_bars"),
                    )
                    .await?;
                Ok(TickOutcome::Rescheduled { mint: claimed.mint })
            }
            GateOutcome::Pass(size) => self.execute_buy(&claimed.mint, size.final_size_usd, now).await,
        }
    }

    async fn execute_buy(&self, mint: &Mint, spend_usd: f64, now: i64) -> Result<TickOutcome> {
        let row = self.queue.get(mint).await?;
        let buy_attempts = row.as_ref().map(|r| r.buy_attempts).unwrap_or(0);

        let result = self
            .execution
            .execute(ExecutionRequest {
                mint: mint.clone(),
                side: Side::Buy,
                amount_in: spend_usd,
                slippage_bps: 100,
                output_stable: false,
            })
            .await;

        match result {
            Ok(outcome) => {
                let tx_sig = TxSig(outcome.tx_sig.clone());
                self.ledger
                    .insert_trade_lot(&Lot {
                        lot_id: uuid::Uuid::new_v4(),
                        tx_sig: tx_sig.clone(),
                        timestamp: now,
                        mint: mint.clone(),
                        side: LotSide::Buy,
                        quantity: outcome.filled_qty,
                        usd_value: outcome.proceeds_usd,
                        unit_price_usd: if outcome.filled_qty > 0.0 { outcome.proceeds_usd / outcome.filled_qty } else { 0.0 },
                        sol_price_usd: None,
                        fee_usd: None,
                        source: Some("scout_queue".into()),
                        status: LotStatus::Confirmed,
                        decision_id: None,
                    })
                    .await?;

                self.positions
                    .upsert(&PositionTrackingRow {
                        mint: mint.clone(),
                        entry_price: if outcome.filled_qty > 0.0 { outcome.proceeds_usd / outcome.filled_qty } else { 0.0 },
                        peak_price: if outcome.filled_qty > 0.0 { outcome.proceeds_usd / outcome.filled_qty } else { 0.0 },
                        peak_time: now,
                        last_price: if outcome.filled_qty > 0.0 { outcome.proceeds_usd / outcome.filled_qty } else { 0.0 },
                        last_update: now,
                        total_tokens: outcome.filled_qty,
                        slot_type: SlotType::Scout,
                        promotion_count: 0,
                        source: Some("scout_queue".into()),
                        liquidating: false,
                        liquidating_reason: None,
                        liquidating_since: None,
                        reentry_ban_until: None,
                        peak_pnl_pct: 0.0,
                    })
                    .await?;

                self.queue.mark_bought(mint, &outcome.tx_sig, now).await?;
                Ok(TickOutcome::Bought { mint: mint.clone(), tx_sig: outcome.tx_sig })
            }
            Err(_) => {
                let attempts = buy_attempts + 1;
                if attempts < self.scout_cfg.max_buy_attempts {
                    self.queue
                        .set_status(mint, ScoutQueueStatus::Pending, Some(now + 300), attempts, Some("buy_failed_retrying"))
                        .await?;
                    Ok(TickOutcome::BuyFailed { mint: mint.clone(), attempts, terminal: false })
                } else {
                    self.queue
                        .set_status(mint, ScoutQueueStatus::Failed, None, attempts, Some("buy_failed_max_attempts"))
                        .await?;
                    Ok(TickOutcome::BuyFailed { mint: mint.clone(), attempts, terminal: true })
                }
            }
        }
    }
}
