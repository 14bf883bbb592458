use super::Store;
use crate::error::{Error, Result};
use rusqlite::{params, OptionalExtension};

/// Settings persisted as a key/value map in `bot_settings`.
#[derive(Clone)]
pub struct SettingsRepo {
    store: Store,
}

impl SettingsRepo {
    pub(super) fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.query_row(
            "SELECT value FROM bot_settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.store.conn();
        let conn = conn.lock().await;
        conn.execute(
            "INSERT INTO bot_settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub async fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        Ok(self
            .get(key)
            .await?
            .map(|v| v == "true" || v == "1")
            .unwrap_or(default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let repo = store.settings();

        repo.set("manual_pause", "true").await.unwrap();
        assert_eq!(repo.get("manual_pause").await.unwrap(), Some("true".into()));
        assert!(repo.get_bool("manual_pause", false).await.unwrap());
        assert!(repo.get_bool("missing_key", true).await.unwrap());
    }
}
