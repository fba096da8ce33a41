#![forbid(unsafe_code)]

//! Key-value persistence adapter.
//!
//! Every collection the hub owns is serialized as one JSON document and
//! stored under a fixed namespaced key in a single SQLite table. The adapter
//! deliberately hides read-side failures: a missing row, unreadable file or
//! malformed JSON document is indistinguishable from "never written" and the
//! caller's fallback takes its place. Write failures are swallowed too (the
//! in-memory copy stays authoritative until the next successful write); the
//! only trace is a warning on stderr for the operator.

use std::path::Path;

use anyhow::{Context, Result};
use libsql::{Builder, Connection, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Database file kept inside the data root.
pub const STORE_DB_FILE: &str = "streettube.db";

async fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;
        "#,
    )
    .await?;
    Ok(())
}

async fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )
    .await?;
    Ok(())
}

/// Handle on the durable key-value table.
pub struct KvStorage {
    conn: Connection,
}

impl std::fmt::Debug for KvStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStorage").finish_non_exhaustive()
    }
}

impl KvStorage {
    /// Opens (and if necessary creates) the backing database and makes sure
    /// the `kv` table exists.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating data directory {}", parent.display()))?;
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .with_context(|| format!("opening store DB {}", path.display()))?;

        let conn = db.connect()?;
        configure_connection(&conn).await?;
        ensure_schema(&conn).await?;
        Ok(Self { conn })
    }

    /// Reads and deserializes the entry stored under `key`. Any failure along
    /// the way (missing row, query error, parse error) yields `fallback`.
    pub async fn load<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.read_raw(key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or(fallback),
            _ => fallback,
        }
    }

    /// Serializes `value` and writes it under `key`. Errors are swallowed.
    pub async fn save<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                eprintln!("Warning: could not serialize {key}: {err}");
                return;
            }
        };
        if let Err(err) = self.write_raw(key, &raw).await {
            eprintln!("Warning: could not persist {key}: {err}");
        }
    }

    /// Writes several entries inside one transaction so a multi-collection
    /// mutation never reaches disk half-applied. Errors are swallowed like
    /// `save`; on failure none of the entries land.
    pub async fn save_batch(&self, entries: &[(&str, String)]) {
        if entries.is_empty() {
            return;
        }
        if let Err(err) = self.write_batch(entries).await {
            let keys: Vec<&str> = entries.iter().map(|(key, _)| *key).collect();
            eprintln!("Warning: could not persist [{}]: {err}", keys.join(", "));
        }
    }

    async fn read_raw(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM kv WHERE key = ?1", [key])
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        Ok(Some(row.get(0)?))
    }

    async fn write_raw(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO kv (key, value) VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value
                "#,
                params![key, value],
            )
            .await?;
        Ok(())
    }

    async fn write_batch(&self, entries: &[(&str, String)]) -> Result<()> {
        let tx = self.conn.transaction().await?;
        for (key, value) in entries {
            tx.execute(
                r#"
                INSERT INTO kv (key, value) VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value
                "#,
                params![*key, value.as_str()],
            )
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn create_storage() -> Result<(tempfile::TempDir, KvStorage)> {
        let dir = tempdir()?;
        let storage = KvStorage::open(&dir.path().join("data").join(STORE_DB_FILE)).await?;
        Ok((dir, storage))
    }

    #[tokio::test]
    async fn open_creates_database_and_enables_wal() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested/streettube.db");
        let storage = KvStorage::open(&path).await?;
        assert!(path.exists(), "database file should be created");

        let mut rows = storage
            .conn
            .query("PRAGMA journal_mode", params![])
            .await?;
        let row = rows.next().await?.context("missing journal_mode row")?;
        let journal: String = row.get(0)?;
        assert_eq!(journal.to_lowercase(), "wal");
        Ok(())
    }

    #[tokio::test]
    async fn load_missing_key_returns_fallback() -> Result<()> {
        let (_dir, storage) = create_storage().await?;
        let value: Vec<String> = storage.load("streettube.ghost", vec!["seed".into()]).await;
        assert_eq!(value, vec!["seed".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn save_then_load_round_trips() -> Result<()> {
        let (_dir, storage) = create_storage().await?;
        storage
            .save("streettube.tags", &vec!["turbo".to_string(), "jdm".to_string()])
            .await;
        let back: Vec<String> = storage.load("streettube.tags", Vec::new()).await;
        assert_eq!(back, vec!["turbo".to_string(), "jdm".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn save_overwrites_previous_value() -> Result<()> {
        let (_dir, storage) = create_storage().await?;
        storage.save("streettube.count", &1u64).await;
        storage.save("streettube.count", &2u64).await;
        let back: u64 = storage.load("streettube.count", 0).await;
        assert_eq!(back, 2);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_entry_falls_back_silently() -> Result<()> {
        let (_dir, storage) = create_storage().await?;
        storage
            .write_raw("streettube.users", "{not valid json")
            .await?;
        let back: Vec<String> = storage
            .load("streettube.users", vec!["fallback".into()])
            .await;
        assert_eq!(back, vec!["fallback".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn wrong_shape_entry_falls_back_silently() -> Result<()> {
        let (_dir, storage) = create_storage().await?;
        storage.save("streettube.videos", &42u64).await;
        let back: Vec<String> = storage.load("streettube.videos", Vec::new()).await;
        assert!(back.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn save_batch_writes_every_entry() -> Result<()> {
        let (_dir, storage) = create_storage().await?;
        storage
            .save_batch(&[
                ("streettube.a", "[1]".to_string()),
                ("streettube.b", "[2,3]".to_string()),
            ])
            .await;

        let a: Vec<u64> = storage.load("streettube.a", Vec::new()).await;
        let b: Vec<u64> = storage.load("streettube.b", Vec::new()).await;
        assert_eq!(a, vec![1]);
        assert_eq!(b, vec![2, 3]);
        Ok(())
    }

    #[tokio::test]
    async fn values_survive_reopen() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(STORE_DB_FILE);
        {
            let storage = KvStorage::open(&path).await?;
            storage.save("streettube.marker", &"kept".to_string()).await;
        }
        let storage = KvStorage::open(&path).await?;
        let back: String = storage.load("streettube.marker", String::new()).await;
        assert_eq!(back, "kept");
        Ok(())
    }
}
