//! Signal-protocol key material: identities, sessions, prekeys, sender keys.

use async_trait::async_trait;
use wacore::store::error::db_err;
use wacore::store::traits::SignalStore;

use super::SqliteSessionStore;

type Result<T> = wacore::store::error::Result<T>;

#[async_trait]
impl SignalStore for SqliteSessionStore {
    async fn put_identity(&self, address: &str, key: [u8; 32]) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO identities (addr, pubkey) VALUES (?, ?)")
            .bind(address)
            .bind(key.as_slice())
            .execute(self.pool())
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn load_identity(&self, address: &str) -> Result<Option<Vec<u8>>> {
        let row: Option<(Vec<u8>,)> =
            sqlx::query_as("SELECT pubkey FROM identities WHERE addr = ?")
                .bind(address)
                .fetch_optional(self.pool())
                .await
                .map_err(db_err)?;
        Ok(row.map(|(k,)| k))
    }

    async fn delete_identity(&self, address: &str) -> Result<()> {
        sqlx::query("DELETE FROM identities WHERE addr = ?")
            .bind(address)
            .execute(self.pool())
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get_session(&self, address: &str) -> Result<Option<Vec<u8>>> {
        let row: Option<(Vec<u8>,)> =
            sqlx::query_as("SELECT record FROM signal_sessions WHERE addr = ?")
                .bind(address)
                .fetch_optional(self.pool())
                .await
                .map_err(db_err)?;
        Ok(row.map(|(r,)| r))
    }

    async fn put_session(&self, address: &str, session: &[u8]) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO signal_sessions (addr, record) VALUES (?, ?)")
            .bind(address)
            .bind(session)
            .execute(self.pool())
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_session(&self, address: &str) -> Result<()> {
        sqlx::query("DELETE FROM signal_sessions WHERE addr = ?")
            .bind(address)
            .execute(self.pool())
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn store_prekey(&self, id: u32, record: &[u8], uploaded: bool) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO prekeys (id, record, uploaded) VALUES (?, ?, ?)")
            .bind(id as i64)
            .bind(record)
            .bind(uploaded as i32)
            .execute(self.pool())
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn load_prekey(&self, id: u32) -> Result<Option<Vec<u8>>> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as("SELECT record FROM prekeys WHERE id = ?")
            .bind(id as i64)
            .fetch_optional(self.pool())
            .await
            .map_err(db_err)?;
        Ok(row.map(|(r,)| r))
    }

    async fn remove_prekey(&self, id: u32) -> Result<()> {
        sqlx::query("DELETE FROM prekeys WHERE id = ?")
            .bind(id as i64)
            .execute(self.pool())
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn store_signed_prekey(&self, id: u32, record: &[u8]) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO signed_prekeys (id, record) VALUES (?, ?)")
            .bind(id as i64)
            .bind(record)
            .execute(self.pool())
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn load_signed_prekey(&self, id: u32) -> Result<Option<Vec<u8>>> {
        let row: Option<(Vec<u8>,)> =
            sqlx::query_as("SELECT record FROM signed_prekeys WHERE id = ?")
                .bind(id as i64)
                .fetch_optional(self.pool())
                .await
                .map_err(db_err)?;
        Ok(row.map(|(r,)| r))
    }

    async fn load_all_signed_prekeys(&self) -> Result<Vec<(u32, Vec<u8>)>> {
        let rows: Vec<(i64, Vec<u8>)> = sqlx::query_as("SELECT id, record FROM signed_prekeys")
            .fetch_all(self.pool())
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(|(id, r)| (id as u32, r)).collect())
    }

    async fn remove_signed_prekey(&self, id: u32) -> Result<()> {
        sqlx::query("DELETE FROM signed_prekeys WHERE id = ?")
            .bind(id as i64)
            .execute(self.pool())
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn put_sender_key(&self, address: &str, record: &[u8]) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO sender_keys (addr, record) VALUES (?, ?)")
            .bind(address)
            .bind(record)
            .execute(self.pool())
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get_sender_key(&self, address: &str) -> Result<Option<Vec<u8>>> {
        let row: Option<(Vec<u8>,)> =
            sqlx::query_as("SELECT record FROM sender_keys WHERE addr = ?")
                .bind(address)
                .fetch_optional(self.pool())
                .await
                .map_err(db_err)?;
        Ok(row.map(|(r,)| r))
    }

    async fn delete_sender_key(&self, address: &str) -> Result<()> {
        sqlx::query("DELETE FROM sender_keys WHERE addr = ?")
            .bind(address)
            .execute(self.pool())
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
