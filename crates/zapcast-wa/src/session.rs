//! Shared session state and the `SessionClient` collaborator implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tracing::warn;

use zapcast_core::campaign::MediaFile;
use zapcast_core::config::WhatsAppConfig;
use zapcast_core::error::BridgeError;
use zapcast_core::traits::SessionClient;

use crate::qr;

/// Live WhatsApp session over `whatsapp-rust`.
///
/// All fields the bot's event handler mutates are `Arc`-shared so a rebuilt
/// bot (after a disconnect) updates the same state the API handlers read.
pub struct WaSession {
    pub(crate) config: WhatsAppConfig,
    pub(crate) data_dir: String,
    /// Client handle for sending: present only while connected.
    pub(crate) client: Arc<Mutex<Option<Arc<whatsapp_rust::client::Client>>>>,
    /// Readiness flag, flipped only by lifecycle events.
    pub(crate) ready: Arc<AtomicBool>,
    /// Last pairing QR data, buffered until the session connects.
    pub(crate) last_qr: Arc<Mutex<Option<String>>>,
    /// Last session-level failure, surfaced on `/api/status`.
    pub(crate) last_error: Arc<Mutex<Option<String>>>,
    /// Signalled by the event handler when the session drops.
    pub(crate) disconnected: Arc<Notify>,
}

impl WaSession {
    /// Create a new, not-yet-started session.
    pub fn new(config: WhatsAppConfig, data_dir: &str) -> Self {
        Self {
            config,
            data_dir: data_dir.to_string(),
            client: Arc::new(Mutex::new(None)),
            ready: Arc::new(AtomicBool::new(false)),
            last_qr: Arc::new(Mutex::new(None)),
            last_error: Arc::new(Mutex::new(None)),
            disconnected: Arc::new(Notify::new()),
        }
    }

    /// Record a session-level failure and drop readiness.
    pub(crate) async fn record_failure(&self, reason: String) {
        warn!("whatsapp session failure: {reason}");
        self.ready.store(false, Ordering::SeqCst);
        *self.last_error.lock().await = Some(reason);
    }

    /// Path of the SQLite session database, creating the directory.
    pub(crate) fn session_db_path(&self) -> String {
        let dir = zapcast_core::config::shellexpand(&self.data_dir);
        let session_dir = format!("{dir}/wa_session");
        let _ = std::fs::create_dir_all(&session_dir);
        format!("{session_dir}/session.db")
    }
}

#[async_trait]
impl SessionClient for WaSession {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn resolve(&self, digits: &str) -> Result<String, BridgeError> {
        // Normalized input is digits-only; anything shorter than a full
        // international number cannot be addressed.
        if digits.len() < 10 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(BridgeError::NumberNotFound(digits.to_string()));
        }
        Ok(format!("{digits}@s.whatsapp.net"))
    }

    async fn send_text(&self, dest: &str, text: &str) -> Result<(), BridgeError> {
        self.send_text_impl(dest, text).await
    }

    async fn send_media(
        &self,
        dest: &str,
        media: &MediaFile,
        caption: Option<&str>,
    ) -> Result<(), BridgeError> {
        self.send_media_impl(dest, media, caption).await
    }

    async fn qr_data_url(&self) -> Option<String> {
        if self.is_ready() {
            return None;
        }
        let guard = self.last_qr.lock().await;
        let data = guard.as_ref()?;
        match qr::data_url(data) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("QR rendering failed: {e}");
                None
            }
        }
    }

    async fn last_error(&self) -> Option<String> {
        self.last_error.lock().await.clone()
    }
}
