//! Lot and P&L event domain types.

use crate::types::{Mint, TxSig};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type LotId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    Confirmed,
    Paper,
    Failed,
    Pending,
}

/// An immutable record of one fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lot {
    pub lot_id: LotId,
    pub tx_sig: TxSig,
    pub timestamp: i64,
    pub mint: Mint,
    pub side: Side,
    pub quantity: f64,
    pub usd_value: f64,
    pub unit_price_usd: f64,
    pub sol_price_usd: Option<f64>,
    pub fee_usd: Option<f64>,
    pub source: Option<String>,
    pub status: LotStatus,
    pub decision_id: Option<String>,
}

/// The live remainder of a buy lot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPositionLot {
    pub lot_id: LotId,
    pub mint: Mint,
    pub original_qty: f64,
    pub remaining_qty: f64,
    pub cost_basis_usd: f64,
    pub unit_cost_usd: f64,
    pub entry_timestamp: i64,
    pub is_closed: bool,
}

impl OpenPositionLot {
    /// `is_closed` tracks `remaining_qty < 1e-6` by construction — callers
    /// recompute it whenever `remaining_qty` changes rather than trusting a
    /// stale flag.
    pub fn recompute_closed(&mut self) {
        self.is_closed = self.remaining_qty < 1e-6;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PnlEventType {
    RealizedGain,
    RealizedLoss,
    DustWriteoff,
    Fee,
    PartialExitRemaining,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PnlEvent {
    pub mint: Mint,
    pub tx_sig: Option<TxSig>,
    pub event_type: PnlEventType,
    pub cost_basis_usd: f64,
    pub proceeds_usd: Option<f64>,
    pub pnl_usd: f64,
    pub suspicious: bool,
    pub detail: Option<String>,
}

impl PnlEvent {
    pub fn realized(mint: Mint, tx_sig: TxSig, cost_basis_usd: f64, proceeds_usd: f64, pnl_usd: f64, suspicious: bool) -> Self {
        let event_type = if pnl_usd >= 0.0 {
            PnlEventType::RealizedGain
        } else {
            PnlEventType::RealizedLoss
        };
        Self {
            mint,
            tx_sig: Some(tx_sig),
            event_type,
            cost_basis_usd,
            proceeds_usd: Some(proceeds_usd),
            pnl_usd,
            suspicious,
            detail: None,
        }
    }
}

/// Outcome of `process_sell_with_fifo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FifoMatchResult {
    pub realized_pnl: f64,
    pub lots_matched: u32,
    pub suspicious: bool,
}

/// Result of an integrity comparison between the open-lot ledger and
/// position_tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityFlag {
    Ok,
    FifoMissing,
    QuantityMismatch,
    PriceMismatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recompute_closed_respects_dust_threshold() {
        let mut lot = OpenPositionLot {
            lot_id: Uuid::new_v4(),
            mint: Mint::from("mint1"),
            original_qty: 100.0,
            remaining_qty: 0.0000001,
            cost_basis_usd: 10.0,
            unit_cost_usd: 0.1,
            entry_timestamp: 0,
            is_closed: false,
        };
        lot.recompute_closed();
        assert!(lot.is_closed);
    }
}
