//! SQLite persistence backend for `whatsapp-rust`.
//!
//! Implements wacore's `Backend` trait bundle (SignalStore + AppSyncStore +
//! ProtocolStore + DeviceStore) over sqlx. The library dictates the trait
//! surface; the schema below is ours.

mod appstate;
mod protocol;
mod signal;

use async_trait::async_trait;
use sqlx::{Pool, Sqlite, SqlitePool};
use wacore::store::error::{db_err, StoreError};
use wacore::store::traits::DeviceStore;
use wacore::store::Device;

type Result<T> = wacore::store::error::Result<T>;

/// Session store backed by a single SQLite file.
pub struct SqliteSessionStore {
    pool: Pool<Sqlite>,
}

impl SqliteSessionStore {
    /// Open (or create) the session database and ensure the schema exists.
    pub async fn open(db_path: &str) -> std::result::Result<Self, sqlx::Error> {
        let pool = SqlitePool::connect(&format!("sqlite:{db_path}?mode=rwc")).await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> std::result::Result<(), sqlx::Error> {
        const SCHEMA: &[&str] = &[
            "CREATE TABLE IF NOT EXISTS identities (
                addr TEXT PRIMARY KEY,
                pubkey BLOB NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS signal_sessions (
                addr TEXT PRIMARY KEY,
                record BLOB NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS prekeys (
                id INTEGER PRIMARY KEY,
                record BLOB NOT NULL,
                uploaded INTEGER NOT NULL DEFAULT 0
            )",
            "CREATE TABLE IF NOT EXISTS signed_prekeys (
                id INTEGER PRIMARY KEY,
                record BLOB NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS sender_keys (
                addr TEXT PRIMARY KEY,
                record BLOB NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS sync_keys (
                key_id BLOB PRIMARY KEY,
                key_data BLOB NOT NULL,
                ts INTEGER NOT NULL DEFAULT 0,
                fingerprint BLOB
            )",
            "CREATE TABLE IF NOT EXISTS sync_versions (
                collection TEXT PRIMARY KEY,
                state_json TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS mutation_macs (
                collection TEXT NOT NULL,
                index_mac BLOB NOT NULL,
                version INTEGER NOT NULL,
                value_mac BLOB NOT NULL,
                PRIMARY KEY (collection, index_mac)
            )",
            "CREATE TABLE IF NOT EXISTS skdm_recipients (
                group_jid TEXT NOT NULL,
                device_jid TEXT NOT NULL,
                PRIMARY KEY (group_jid, device_jid)
            )",
            "CREATE TABLE IF NOT EXISTS lid_map (
                lid TEXT PRIMARY KEY,
                phone TEXT NOT NULL,
                created_at INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL DEFAULT 0,
                source TEXT NOT NULL DEFAULT ''
            )",
            "CREATE TABLE IF NOT EXISTS base_keys (
                addr TEXT NOT NULL,
                message_id TEXT NOT NULL,
                base_key BLOB NOT NULL,
                PRIMARY KEY (addr, message_id)
            )",
            "CREATE TABLE IF NOT EXISTS device_lists (
                user TEXT PRIMARY KEY,
                record_json TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS forget_marks (
                group_jid TEXT NOT NULL,
                participant TEXT NOT NULL,
                PRIMARY KEY (group_jid, participant)
            )",
            "CREATE TABLE IF NOT EXISTS device (
                id INTEGER PRIMARY KEY,
                blob BLOB NOT NULL
            )",
        ];

        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub(crate) fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl DeviceStore for SqliteSessionStore {
    async fn save(&self, device: &Device) -> Result<()> {
        // Device uses custom serde (key_pair_serde, BigArray) that needs a
        // binary format; serde_json cannot handle deserialize_bytes.
        let blob =
            bincode::serialize(device).map_err(|e| StoreError::Serialization(e.to_string()))?;
        sqlx::query("INSERT OR REPLACE INTO device (id, blob) VALUES (1, ?)")
            .bind(&blob)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<Device>> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as("SELECT blob FROM device WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(|(blob,)| {
            bincode::deserialize(&blob).map_err(|e| StoreError::Serialization(e.to_string()))
        })
        .transpose()
    }

    async fn exists(&self) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM device WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.is_some())
    }

    async fn create(&self) -> Result<i32> {
        // One device per store; the row itself appears on first save().
        Ok(1)
    }
}
