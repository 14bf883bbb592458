//! Persistent store: a rusqlite-backed transactional key-row store with
//! indices, fronted by a small per-concern repository API. A single writer
//! connection serializes every claim and state transition — this is the
//! serialisation point referenced throughout the engine.

mod lots;
mod positions;
mod scout_queue;
mod settings;
mod telemetry;

pub use lots::LotRepo;
pub use positions::{PositionTrackingRepo, PositionTrackingRow};
pub use scout_queue::{ClaimOutcome, ScoutQueueRepo, ScoutQueueRow, ScoutQueueStatus};
pub use settings::SettingsRepo;
pub use telemetry::TelemetryRepo;

use crate::error::{Error, Result};
use rusqlite::Connection;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared handle onto the database connection. Every repository borrows this
/// same connection, since SQLite serializes writers anyway and the tick loop
/// is single-writer cooperative (see the concurrency model in the engine).
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(database_path: &str) -> Result<Self> {
        let conn = Connection::open(database_path)
            .map_err(|e| Error::Store(format!("open {database_path}: {e}")))?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        conn.pragma_update(None, "foreign_keys", "ON").ok();

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Store(format!("open in-memory db: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create all tables and indices if absent. Idempotent; safe to call on
    /// every startup.
    pub async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::Store(format!("init schema: {e}")))?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    pub fn lots(&self) -> LotRepo {
        LotRepo::new(self.clone())
    }

    pub fn positions(&self) -> PositionTrackingRepo {
        PositionTrackingRepo::new(self.clone())
    }

    pub fn scout_queue(&self) -> ScoutQueueRepo {
        ScoutQueueRepo::new(self.clone())
    }

    pub fn telemetry(&self) -> TelemetryRepo {
        TelemetryRepo::new(self.clone())
    }

    pub fn settings(&self) -> SettingsRepo {
        SettingsRepo::new(self.clone())
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS bot_trades (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tx_sig TEXT,
    mint TEXT NOT NULL,
    side TEXT NOT NULL,
    reason_code TEXT,
    status TEXT NOT NULL,
    quantity REAL NOT NULL,
    usd_value REAL NOT NULL,
    fee_usd REAL,
    realized_pnl REAL,
    decision_id TEXT,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_bot_trades_mint ON bot_trades(mint, created_at DESC);

CREATE TABLE IF NOT EXISTS trade_lots (
    lot_id TEXT PRIMARY KEY,
    tx_sig TEXT NOT NULL UNIQUE,
    mint TEXT NOT NULL,
    side TEXT NOT NULL,
    quantity REAL NOT NULL,
    usd_value REAL NOT NULL,
    unit_price_usd REAL NOT NULL,
    sol_price_usd REAL,
    fee_usd REAL,
    source TEXT,
    status TEXT NOT NULL,
    decision_id TEXT,
    entry_timestamp INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_trade_lots_mint_ts ON trade_lots(mint, entry_timestamp ASC);

CREATE TABLE IF NOT EXISTS position_lots (
    lot_id TEXT PRIMARY KEY REFERENCES trade_lots(lot_id),
    mint TEXT NOT NULL,
    original_qty REAL NOT NULL,
    remaining_qty REAL NOT NULL,
    cost_basis_usd REAL NOT NULL,
    unit_cost_usd REAL NOT NULL,
    entry_timestamp INTEGER NOT NULL,
    is_closed INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_position_lots_mint_open
    ON position_lots(mint, is_closed, entry_timestamp ASC);

CREATE TABLE IF NOT EXISTS pnl_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    mint TEXT NOT NULL,
    tx_sig TEXT,
    event_type TEXT NOT NULL,
    cost_basis_usd REAL NOT NULL,
    proceeds_usd REAL,
    pnl_usd REAL NOT NULL,
    suspicious INTEGER NOT NULL DEFAULT 0,
    detail TEXT,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_pnl_events_mint ON pnl_events(mint, created_at DESC);

CREATE TABLE IF NOT EXISTS position_tracking (
    mint TEXT PRIMARY KEY,
    entry_price REAL NOT NULL,
    peak_price REAL NOT NULL,
    peak_time INTEGER NOT NULL,
    last_price REAL NOT NULL,
    last_update INTEGER NOT NULL,
    total_tokens REAL NOT NULL,
    slot_type TEXT NOT NULL,
    promotion_count INTEGER NOT NULL DEFAULT 0,
    source TEXT,
    liquidating INTEGER NOT NULL DEFAULT 0,
    liquidating_reason TEXT,
    liquidating_since INTEGER,
    reentry_ban_until INTEGER,
    peak_pnl_pct REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS trading_universe (
    mint TEXT PRIMARY KEY,
    symbol TEXT,
    added_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS scout_queue (
    mint TEXT PRIMARY KEY,
    symbol TEXT,
    score REAL NOT NULL,
    reasons TEXT,
    spend_sol REAL NOT NULL,
    status TEXT NOT NULL,
    buy_attempts INTEGER NOT NULL DEFAULT 0,
    warmup_attempts INTEGER NOT NULL DEFAULT 0,
    in_progress_at INTEGER,
    next_attempt_at INTEGER,
    last_attempt_at INTEGER,
    last_error TEXT,
    tx_sig TEXT,
    queued_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_scout_queue_status ON scout_queue(status, next_attempt_at);

CREATE TABLE IF NOT EXISTS rotation_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    action TEXT NOT NULL,
    worst_mint TEXT,
    best_mint TEXT,
    detail TEXT,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS allocation_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    mint TEXT NOT NULL,
    outcome TEXT NOT NULL,
    reason TEXT,
    size_usd REAL,
    limiting_factor TEXT,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS equity_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    equity_usd REAL NOT NULL,
    sol_price_usd REAL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS bot_tick_telemetry (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tick_seq INTEGER NOT NULL,
    action TEXT,
    config_hash TEXT,
    duration_ms INTEGER,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS watch_candidates (
    mint TEXT PRIMARY KEY,
    symbol TEXT,
    reason TEXT,
    first_seen_at INTEGER NOT NULL,
    last_seen_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS capacity_telemetry (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scout_slots_used INTEGER NOT NULL,
    core_slots_used INTEGER NOT NULL,
    total_slots INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS bot_settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
