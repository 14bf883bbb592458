//! Error types for the trading engine

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // Store errors
    #[error("Store error: {0}")]
    Store(String),

    #[error("Row not found: {0}")]
    NotFound(String),

    // Aggregator / market-data client errors
    #[error("Quote request failed: {0}")]
    Quote(String),

    #[error("Swap build failed: {0}")]
    SwapBuild(String),

    #[error("No route available for {0}")]
    NoRoute(String),

    #[error("Market data fetch failed: {0}")]
    MarketData(String),

    // Execution errors
    #[error("Transaction send failed: {0}")]
    TransactionSend(String),

    #[error("Simulation failed: {0}")]
    SimulationFailed(String),

    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: f64, required: f64 },

    #[error("Slippage exceeded: expected {expected}, got {actual}")]
    SlippageExceeded { expected: u64, actual: u64 },

    // Lot ledger errors
    #[error("Lot not found for mint: {0}")]
    LotNotFound(String),

    #[error("Duplicate tx_sig: {0}")]
    DuplicateTxSig(String),

    // Position / sizing errors
    #[error("Position not found: {0}")]
    PositionNotFound(String),

    #[error("Sizing rejected: {0}")]
    SizingRejected(String),

    // Scout queue / claim errors
    #[error("Claim lost for mint {0}")]
    ClaimLost(String),

    #[error("Liquidation-locked: {0}")]
    LiquidationLocked(String),

    #[error("Watchdog-blocked: {mint}, {remaining_secs}s remaining")]
    WatchdogBlocked { mint: String, remaining_secs: i64 },

    // Exit-invariant errors
    #[error("Exit invariant failed after {attempts} attempts: residual {residual_qty}")]
    ExitInvariantFailed { attempts: u32, residual_qty: f64 },

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Quote(_)
                | Error::SwapBuild(_)
                | Error::MarketData(_)
                | Error::TransactionSend(_)
        )
    }

    /// Check if this error is terminal for the current attempt (not retried)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::InsufficientFunds { .. }
                | Error::SimulationFailed(_)
                | Error::NoRoute(_)
                | Error::LiquidationLocked(_)
                | Error::WatchdogBlocked { .. }
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Store(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Quote(e.to_string())
    }
}
