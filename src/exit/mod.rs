//! Close-position / exit-invariant machinery:
//! guarantees that an exit decision actually leaves the position flat,
//! retrying under tightening slippage until residual value drops below dust.

use crate::config::ExitConfig;
use crate::error::{Error, Result};
use crate::external::{BalanceReader, Execution, ExecutionRequest};
use crate::ledger::LotLedger;
use crate::types::{Mint, Side, TxSig};
use crate::watchdog::LiquidationLock;

/// Fixed reason codes for a position close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    ScoutStopLossExit,
    ScoutUnderperformGraceExpired,
    ScoutTakeProfitExit,
    CoreLossExit,
    TakeProfit,
    FlashClose,
    UniverseExit,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ScoutStopLossExit => "scout_stop_loss_exit",
            Self::ScoutUnderperformGraceExpired => "scout_underperform_grace_expired",
            Self::ScoutTakeProfitExit => "scout_take_profit_exit",
            Self::CoreLossExit => "core_loss_exit",
            Self::TakeProfit => "take_profit",
            Self::FlashClose => "flash_close",
            Self::UniverseExit => "universe_exit",
        }
    }

    /// The five reasons that additionally arm the liquidation lock.
    pub fn is_protective(self) -> bool {
        matches!(
            self,
            Self::ScoutStopLossExit
                | Self::ScoutUnderperformGraceExpired
                | Self::ScoutTakeProfitExit
                | Self::CoreLossExit
                | Self::TakeProfit
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseStatus {
    FullyClosed,
    TriggeredCleanup,
    Failed,
    NotClosed,
}

#[derive(Debug, Clone)]
pub struct CloseOutcome {
    pub status: CloseStatus,
    pub fully_closed: bool,
    pub sold_qty: f64,
    pub remaining_qty: f64,
    pub proceeds_usd: f64,
    pub realized_pnl: f64,
    pub tx_sig: Option<TxSig>,
    pub retried: u32,
}

const DUST_QTY_BUFFER_UNITS: f64 = 10.0;

pub struct PositionCloser<'a> {
    cfg: &'a ExitConfig,
    ledger: &'a LotLedger,
    execution: &'a dyn Execution,
    balances: &'a dyn BalanceReader,
    liquidation_lock: &'a LiquidationLock,
}

impl<'a> PositionCloser<'a> {
    pub fn new(
        cfg: &'a ExitConfig,
        ledger: &'a LotLedger,
        execution: &'a dyn Execution,
        balances: &'a dyn BalanceReader,
        liquidation_lock: &'a LiquidationLock,
    ) -> Self {
        Self {
            cfg,
            ledger,
            execution,
            balances,
            liquidation_lock,
        }
    }

    /// Runs the full close-position algorithm for `mint` and, when `reason`
    /// is protective, arms the liquidation lock on success or partial success.
    pub async fn close_position(
        &self,
        mint: &Mint,
        reason: ExitReason,
        price_usd: f64,
        now: i64,
        slot_type: crate::types::SlotType,
    ) -> Result<CloseOutcome> {
        let balance = self.balances.token_balance(mint).await?;
        if balance * price_usd <= self.cfg.dust_usd_threshold {
            return Ok(CloseOutcome {
                status: CloseStatus::FullyClosed,
                fully_closed: true,
                sold_qty: 0.0,
                remaining_qty: 0.0,
                proceeds_usd: 0.0,
                realized_pnl: 0.0,
                tx_sig: None,
                retried: 0,
            });
        }

        let output_stable = matches!(reason, ExitReason::FlashClose);

        // Flash-close trades speed for capital preservation: cap the sell at
        // 95% of balance, hold back a SOL reserve, and book the output in
        // USDC rather than the generic full-balance sweep below.
        let sell_amount = if output_stable {
            (balance * self.cfg.flash_close_pct - self.cfg.sol_reserve).max(0.0)
        } else {
            (balance - self.cfg.dust_qty_buffer).max(0.0)
        };

        let first = self
            .execution
            .execute(ExecutionRequest {
                mint: mint.clone(),
                side: Side::Sell,
                amount_in: sell_amount,
                slippage_bps: self.cfg.initial_slippage_bps,
                output_stable,
            })
            .await;

        let Ok(first) = first else {
            return Ok(CloseOutcome {
                status: CloseStatus::NotClosed,
                fully_closed: false,
                sold_qty: 0.0,
                remaining_qty: balance,
                proceeds_usd: 0.0,
                realized_pnl: 0.0,
                tx_sig: None,
                retried: 0,
            });
        };

        let tx_sig = TxSig(first.tx_sig.clone());
        let fifo = self
            .ledger
            .process_sell_with_fifo(&tx_sig, mint, first.filled_qty, first.proceeds_usd, None)
            .await?;

        let mut total_sold = first.filled_qty;
        let mut total_proceeds = first.proceeds_usd;
        let mut total_pnl = fifo.realized_pnl;
        let mut last_tx_sig = Some(tx_sig);
        let mut retried = 0;

        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        let mut residual = self.balances.token_balance(mint).await?;

        if residual * price_usd > self.cfg.dust_usd_threshold {
            let doubled_slippage = (self.cfg.initial_slippage_bps * 2).min(500);
            if let Ok(retry) = self
                .execution
                .execute(ExecutionRequest {
                    mint: mint.clone(),
                    side: Side::Sell,
                    amount_in: (residual - self.cfg.dust_qty_buffer).max(0.0),
                    slippage_bps: doubled_slippage,
                    output_stable,
                })
                .await
            {
                let retry_sig = TxSig(retry.tx_sig.clone());
                let retry_fifo = self
                    .ledger
                    .process_sell_with_fifo(&retry_sig, mint, retry.filled_qty, retry.proceeds_usd, None)
                    .await?;
                total_sold += retry.filled_qty;
                total_proceeds += retry.proceeds_usd;
                total_pnl += retry_fifo.realized_pnl;
                last_tx_sig = Some(retry_sig);
                retried += 1;
            }
            residual = self.balances.token_balance(mint).await?;
        }

        if residual * price_usd <= self.cfg.dust_usd_threshold {
            if reason.is_protective() {
                self.liquidation_lock.lock(mint, reason.as_str(), now, slot_type).await?;
            }
            return Ok(CloseOutcome {
                status: CloseStatus::FullyClosed,
                fully_closed: true,
                sold_qty: total_sold,
                remaining_qty: 0.0,
                proceeds_usd: total_proceeds,
                realized_pnl: total_pnl,
                tx_sig: last_tx_sig,
                retried,
            });
        }

        let max_attempts = self.cfg.max_retries.max(10);
        let mut cleaned_up = false;
        for _ in 0..max_attempts {
            tokio::time::sleep(std::time::Duration::from_millis(self.cfg.retry_delay_ms)).await;
            let live_balance = self.balances.token_balance(mint).await?;
            let sell_amount = (live_balance - DUST_QTY_BUFFER_UNITS * 1e-9).max(0.0);
            if sell_amount * price_usd <= self.cfg.dust_usd_threshold {
                cleaned_up = true;
                break;
            }

            let Ok(attempt) = self
                .execution
                .execute(ExecutionRequest {
                    mint: mint.clone(),
                    side: Side::Sell,
                    amount_in: sell_amount,
                    slippage_bps: self.cfg.max_slippage_bps,
                    output_stable,
                })
                .await
            else {
                retried += 1;
                continue;
            };

            let attempt_sig = TxSig(attempt.tx_sig.clone());
            let attempt_fifo = self
                .ledger
                .process_sell_with_fifo(&attempt_sig, mint, attempt.filled_qty, attempt.proceeds_usd, None)
                .await?;
            total_sold += attempt.filled_qty;
            total_proceeds += attempt.proceeds_usd;
            total_pnl += attempt_fifo.realized_pnl;
            last_tx_sig = Some(attempt_sig);
            retried += 1;

            let post_balance = self.balances.token_balance(mint).await?;
            if post_balance * price_usd <= self.cfg.dust_usd_threshold {
                cleaned_up = true;
                break;
            }
        }

        let final_residual = self.balances.token_balance(mint).await?;

        if cleaned_up || final_residual * price_usd <= self.cfg.dust_usd_threshold {
            if reason.is_protective() {
                self.liquidation_lock.lock(mint, reason.as_str(), now, slot_type).await?;
            }
            return Ok(CloseOutcome {
                status: CloseStatus::TriggeredCleanup,
                fully_closed: true,
                sold_qty: total_sold,
                remaining_qty: 0.0,
                proceeds_usd: total_proceeds,
                realized_pnl: total_pnl,
                tx_sig: last_tx_sig,
                retried,
            });
        }

        Err(Error::ExitInvariantFailed {
            attempts: retried,
            residual_qty: final_residual,
        })
    }
}
