//! Shared identifier and dynamic-extension types used across the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A token mint address. Opaque at this layer — validation of the underlying
/// base58/Pubkey encoding belongs to the out-of-scope signer/RPC client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Mint(pub String);

impl Mint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Mint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Mint {
    fn from(s: &str) -> Self {
        Mint(s.to_string())
    }
}

impl From<String> for Mint {
    fn from(s: String) -> Self {
        Mint(s)
    }
}

/// An on-chain transaction signature, unique per confirmed fill.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxSig(pub String);

impl fmt::Display for TxSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TxSig {
    fn from(s: &str) -> Self {
        TxSig(s.to_string())
    }
}

impl From<String> for TxSig {
    fn from(s: String) -> Self {
        TxSig(s)
    }
}

/// Side of a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

/// Slot pool a position belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    Scout,
    Core,
}

/// Market regime used by the ranking engine's momentum/trailing components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    Trend,
    Chop,
    Unknown,
}

/// A runtime configuration snapshot: a stable hash for telemetry attribution
/// plus an open map for extension points the core schema doesn't name
/// explicitly. Modelled as one tagged/open-map pair rather than ad hoc
/// `HashMap<String, String>` fields scattered through call sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub hash: String,
    #[serde(default)]
    pub values: serde_json::Map<String, serde_json::Value>,
}

impl ConfigSnapshot {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            values: serde_json::Map::new(),
        }
    }

    pub fn with_value(mut self, key: &str, value: serde_json::Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_display_roundtrip() {
        let m = Mint::from("So11111111111111111111111111111111111111112");
        assert_eq!(format!("{}", m), m.0);
    }

    #[test]
    fn config_snapshot_extension_point() {
        let snap = ConfigSnapshot::new("abc123").with_value("risk_per_trade_scout", 0.01.into());
        assert_eq!(snap.values.get("risk_per_trade_scout").unwrap(), &0.01);
    }
}
