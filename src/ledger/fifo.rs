//! Two-phase FIFO sell matcher with PnL sanity clamping. Phase 1 dry-matches
//! open lots oldest-first; phase 2 sanity-checks the calculated PnL against
//! ground truth before committing.

use super::lot::{FifoMatchResult, IntegrityFlag, Lot, LotStatus, OpenPositionLot, PnlEvent, PnlEventType, Side};
use crate::error::Result;
use crate::store::LotRepo;
use crate::types::{Mint, TxSig};

const DUST_QTY_EPSILON: f64 = 1e-6;

struct DryMatch {
    lot: OpenPositionLot,
    qty_matched: f64,
    cost_basis_matched: f64,
}

/// Wraps a [`LotRepo`] with the FIFO matching and integrity-check business
/// logic the raw repository doesn't know about.
pub struct LotLedger {
    repo: LotRepo,
}

impl LotLedger {
    pub fn new(repo: LotRepo) -> Self {
        Self { repo }
    }

    /// Idempotent on tx_sig. On a buy, the repo also creates the matching
    /// open-position lot with remaining = original.
    pub async fn insert_trade_lot(&self, lot: &Lot) -> Result<bool> {
        self.repo.insert_lot(lot).await
    }

    /// The central invariant: matches a sell against open lots in FIFO order,
    /// sanity-clamps the PnL, and commits the resulting state.
    pub async fn process_sell_with_fifo(
        &self,
        tx_sig: &TxSig,
        mint: &Mint,
        sell_qty: f64,
        proceeds_usd: f64,
        portfolio_delta_usd: Option<f64>,
    ) -> Result<FifoMatchResult> {
        let open_lots = self.repo.open_lots_for_mint(mint).await?;

        // Phase 1: dry match, oldest lot first.
        let mut remaining_to_sell = sell_qty;
        let mut matches: Vec<DryMatch> = Vec::new();
        for lot in open_lots {
            if remaining_to_sell <= DUST_QTY_EPSILON {
                break;
            }
            let qty_matched = lot.remaining_qty.min(remaining_to_sell);
            let cost_basis_matched = qty_matched * lot.unit_cost_usd;
            remaining_to_sell -= qty_matched;
            matches.push(DryMatch {
                lot,
                qty_matched,
                cost_basis_matched,
            });
        }
        let unmatched_qty = remaining_to_sell.max(0.0);
        let total_cost_basis: f64 = matches.iter().map(|m| m.cost_basis_matched).sum();

        // Phase 2: sanity and commit.
        let calculated_pnl = proceeds_usd - total_cost_basis;

        let fired_sanity = (total_cost_basis < 0.01 && calculated_pnl > 1.0)
            || (total_cost_basis > 0.0 && calculated_pnl / total_cost_basis > 5.0)
            || (calculated_pnl > 2.0 * proceeds_usd);

        let fired_delta_override = portfolio_delta_usd
            .map(|delta| (calculated_pnl - delta).abs() > (1.0_f64).max(0.5 * proceeds_usd))
            .unwrap_or(false);

        let suspicious = fired_sanity || fired_delta_override;
        let adjusted_pnl = if suspicious {
            portfolio_delta_usd.unwrap_or(0.0)
        } else {
            calculated_pnl
        };

        let sell_qty_for_ratio = if sell_qty.abs() < DUST_QTY_EPSILON {
            1.0
        } else {
            sell_qty
        };

        for m in &matches {
            let qty_share = m.qty_matched / sell_qty_for_ratio;
            let pnl_share = adjusted_pnl * qty_share;

            let mut updated = m.lot.clone();
            updated.remaining_qty -= m.qty_matched;
            updated.cost_basis_usd -= m.cost_basis_matched;
            updated.recompute_closed();
            self.repo
                .update_open_lot_remaining(&updated.lot_id, updated.remaining_qty, updated.cost_basis_usd, updated.is_closed)
                .await?;

            let proceeds_share = proceeds_usd * qty_share;
            self.repo
                .insert_pnl_event(&PnlEvent::realized(
                    mint.clone(),
                    tx_sig.clone(),
                    m.cost_basis_matched,
                    proceeds_share,
                    pnl_share,
                    suspicious,
                ))
                .await?;
        }

        if unmatched_qty > DUST_QTY_EPSILON {
            let qty_share = unmatched_qty / sell_qty_for_ratio;
            let pnl_share = adjusted_pnl * qty_share;
            self.repo
                .insert_pnl_event(&PnlEvent {
                    mint: mint.clone(),
                    tx_sig: Some(tx_sig.clone()),
                    event_type: PnlEventType::RealizedGain,
                    cost_basis_usd: 0.0,
                    proceeds_usd: Some(proceeds_usd * qty_share),
                    pnl_usd: pnl_share,
                    suspicious,
                    detail: Some("unmatched sell quantity".into()),
                })
                .await?;
        }

        self.repo
            .insert_lot(&Lot {
                lot_id: uuid::Uuid::new_v4(),
                tx_sig: tx_sig.clone(),
                timestamp: chrono::Utc::now().timestamp(),
                mint: mint.clone(),
                side: Side::Sell,
                quantity: sell_qty,
                usd_value: proceeds_usd,
                unit_price_usd: if sell_qty > 0.0 { proceeds_usd / sell_qty } else { 0.0 },
                sol_price_usd: None,
                fee_usd: None,
                source: None,
                status: LotStatus::Confirmed,
                decision_id: None,
            })
            .await?;

        Ok(FifoMatchResult {
            realized_pnl: adjusted_pnl,
            lots_matched: matches.len() as u32,
            suspicious,
        })
    }

    /// Zeroes all open lots for an abandoned position and records the
    /// writeoff event.
    pub async fn dust_writeoff(&self, mint: &Mint, remaining_value_usd: f64) -> Result<()> {
        let open_lots = self.repo.open_lots_for_mint(mint).await?;
        let total_cost_basis: f64 = open_lots.iter().map(|l| l.remaining_qty * l.unit_cost_usd).sum();

        for lot in &open_lots {
            self.repo.update_open_lot_remaining(&lot.lot_id, 0.0, 0.0, true).await?;
        }

        self.repo
            .insert_pnl_event(&PnlEvent {
                mint: mint.clone(),
                tx_sig: None,
                event_type: PnlEventType::DustWriteoff,
                cost_basis_usd: total_cost_basis,
                proceeds_usd: Some(remaining_value_usd),
                pnl_usd: remaining_value_usd - total_cost_basis,
                suspicious: false,
                detail: None,
            })
            .await?;

        Ok(())
    }

    /// The oldest open lot's entry timestamp for `mint` — the true entry
    /// time for a held position, as opposed to `position_tracking`'s
    /// `peak_time` (which tracks the most recent new high, not the entry).
    pub async fn entry_timestamp(&self, mint: &Mint) -> Result<Option<i64>> {
        let open_lots = self.repo.open_lots_for_mint(mint).await?;
        Ok(open_lots.first().map(|l| l.entry_timestamp))
    }

    /// Compares the open-lot aggregate against position-tracking's own view
    /// of the position; discrepancies suppress promotion eligibility.
    pub async fn check_integrity(
        &self,
        mint: &Mint,
        tracked_total_tokens: f64,
        tracked_entry_price: f64,
    ) -> Result<IntegrityFlag> {
        let (open_qty, avg_cost) = self.repo.open_aggregate(mint).await?;

        if open_qty <= DUST_QTY_EPSILON && tracked_total_tokens > DUST_QTY_EPSILON {
            return Ok(IntegrityFlag::FifoMissing);
        }

        if tracked_total_tokens > DUST_QTY_EPSILON {
            let deviation = (open_qty - tracked_total_tokens).abs() / tracked_total_tokens;
            if deviation > 0.20 {
                return Ok(IntegrityFlag::QuantityMismatch);
            }
        }

        if tracked_entry_price > 0.0 && avg_cost > 0.0 {
            if avg_cost > 2.0 * tracked_entry_price || avg_cost < 0.5 * tracked_entry_price {
                return Ok(IntegrityFlag::PriceMismatch);
            }
        }

        Ok(IntegrityFlag::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    async fn ledger_with_buys(buys: &[(i64, f64, f64, &str)]) -> (LotLedger, Mint) {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let ledger = LotLedger::new(store.lots());
        let mint = Mint::from("mint1");

        for (ts, qty, price, sig) in buys {
            ledger
                .insert_trade_lot(&Lot {
                    lot_id: uuid::Uuid::new_v4(),
                    tx_sig: TxSig::from(*sig),
                    timestamp: *ts,
                    mint: mint.clone(),
                    side: Side::Buy,
                    quantity: *qty,
                    usd_value: qty * price,
                    unit_price_usd: *price,
                    sol_price_usd: None,
                    fee_usd: None,
                    source: None,
                    status: LotStatus::Confirmed,
                    decision_id: None,
                })
                .await
                .unwrap();
        }

        (ledger, mint)
    }

    /// S1 (FIFO basic) from the testable-properties scenarios.
    #[tokio::test]
    async fn fifo_basic_matches_two_lots() {
        let (ledger, mint) = ledger_with_buys(&[(1, 100.0, 1.0, "buy1"), (2, 100.0, 2.0, "buy2")]).await;

        let result = ledger
            .process_sell_with_fifo(&TxSig::from("sell1"), &mint, 150.0, 450.0, None)
            .await
            .unwrap();

        assert_eq!(result.lots_matched, 2);
        assert!(!result.suspicious);
        assert!((result.realized_pnl - 250.0).abs() < 1e-6);

        let remaining = ledger.repo.open_lots_for_mint(&mint).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!((remaining[0].remaining_qty - 50.0).abs() < 1e-6);
        assert!((remaining[0].cost_basis_usd - 100.0).abs() < 1e-6);
    }

    /// S2 (suspicious PnL) from the testable-properties scenarios.
    #[tokio::test]
    async fn suspicious_pnl_is_clamped_to_portfolio_delta() {
        let (ledger, mint) = ledger_with_buys(&[(1, 1_000_000.0, 0.000001, "buy1")]).await;

        let result = ledger
            .process_sell_with_fifo(&TxSig::from("sell1"), &mint, 1_000_000.0, 10.0, Some(2.0))
            .await
            .unwrap();

        assert!(result.suspicious);
        assert!((result.realized_pnl - 2.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn no_over_sell_when_open_lots_insufficient() {
        let (ledger, mint) = ledger_with_buys(&[(1, 50.0, 1.0, "buy1")]).await;

        let result = ledger
            .process_sell_with_fifo(&TxSig::from("sell1"), &mint, 100.0, 100.0, None)
            .await
            .unwrap();

        assert_eq!(result.lots_matched, 1);
        let remaining = ledger.repo.open_lots_for_mint(&mint).await.unwrap();
        assert!(remaining.is_empty() || remaining[0].is_closed);
    }

    #[tokio::test]
    async fn dust_writeoff_zeroes_open_lots() {
        let (ledger, mint) = ledger_with_buys(&[(1, 10.0, 1.0, "buy1")]).await;
        ledger.dust_writeoff(&mint, 0.5).await.unwrap();

        let remaining = ledger.repo.open_lots_for_mint(&mint).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn integrity_flags_fifo_missing() {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let ledger = LotLedger::new(store.lots());
        let mint = Mint::from("mint1");

        let flag = ledger.check_integrity(&mint, 100.0, 1.0).await.unwrap();
        assert_eq!(flag, IntegrityFlag::FifoMissing);
    }

    #[tokio::test]
    async fn integrity_flags_price_mismatch() {
        let (ledger, mint) = ledger_with_buys(&[(1, 100.0, 1.0, "buy1")]).await;
        let flag = ledger.check_integrity(&mint, 100.0, 5.0).await.unwrap();
        assert_eq!(flag, IntegrityFlag::PriceMismatch);
    }
}
