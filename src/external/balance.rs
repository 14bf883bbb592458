//! Test double for [`super::BalanceReader`]: replays a scripted sequence of
//! on-chain balances so exit-invariant retries can be exercised deterministically.

use super::BalanceReader;
use crate::error::Result;
use crate::types::Mint;
use async_trait::async_trait;
use std::sync::Mutex;

pub struct ScriptedBalanceReader {
    token_balances: Mutex<Vec<f64>>,
    sol_balance: f64,
}

impl ScriptedBalanceReader {
    /// `token_balances` is consumed front-to-back on successive calls; the
    /// last value repeats once exhausted.
    pub fn new(token_balances: Vec<f64>, sol_balance: f64) -> Self {
        Self {
            token_balances: Mutex::new(token_balances),
            sol_balance,
        }
    }
}

#[async_trait]
impl BalanceReader for ScriptedBalanceReader {
    async fn token_balance(&self, _mint: &Mint) -> Result<f64> {
        let mut balances = self.token_balances.lock().unwrap();
        if balances.len() > 1 {
            Ok(balances.remove(0))
        } else {
            Ok(*balances.first().unwrap_or(&0.0))
        }
    }

    async fn sol_balance(&self) -> Result<f64> {
        Ok(self.sol_balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_reader_replays_then_holds_last_value() {
        let reader = ScriptedBalanceReader::new(vec![10.0, 5.0, 0.0], 1.0);
        let mint = Mint::from("mint1");
        assert_eq!(reader.token_balance(&mint).await.unwrap(), 10.0);
        assert_eq!(reader.token_balance(&mint).await.unwrap(), 5.0);
        assert_eq!(reader.token_balance(&mint).await.unwrap(), 0.0);
        assert_eq!(reader.token_balance(&mint).await.unwrap(), 0.0);
    }
}
