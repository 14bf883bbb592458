//! Lot-based P&L engine: immutable buy/sell
//! lots, open-position lots, and FIFO sell-matching with a PnL-sanity clamp.

pub mod fifo;
pub mod lot;

pub use fifo::LotLedger;
pub use lot::{FifoMatchResult, IntegrityFlag, Lot, LotId, LotStatus, OpenPositionLot, PnlEvent, PnlEventType, Side};
