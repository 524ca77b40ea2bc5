//! Shared mock collaborator for queue and API tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use std::sync::Arc;

use zapcast_core::campaign::MediaFile;
use zapcast_core::error::BridgeError;
use zapcast_core::traits::SessionClient;

/// A scripted session client that records sends instead of delivering them.
pub struct MockSession {
    ready: AtomicBool,
    /// When set, readiness drops after this many successful sends.
    drop_ready_after: Option<usize>,
    send_count: AtomicUsize,
    /// Destinations starting with this prefix fail to send.
    fail_prefix: Mutex<Option<String>>,
    texts: Mutex<Vec<(String, String)>>,
    media: Mutex<Vec<(String, String, Option<String>)>>,
    instants: Mutex<Vec<Instant>>,
    qr: Mutex<Option<String>>,
    error: Mutex<Option<String>>,
}

impl MockSession {
    fn new(ready: bool, drop_ready_after: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            ready: AtomicBool::new(ready),
            drop_ready_after,
            send_count: AtomicUsize::new(0),
            fail_prefix: Mutex::new(None),
            texts: Mutex::new(Vec::new()),
            media: Mutex::new(Vec::new()),
            instants: Mutex::new(Vec::new()),
            qr: Mutex::new(None),
            error: Mutex::new(None),
        })
    }

    pub fn ready() -> Arc<Self> {
        Self::new(true, None)
    }

    pub fn not_ready() -> Arc<Self> {
        Self::new(false, None)
    }

    /// Ready until `n` sends have succeeded, then disconnected.
    pub fn ready_until(n: usize) -> Arc<Self> {
        Self::new(true, Some(n))
    }

    /// Flip readiness, as a reconnect or disconnect event would.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn fail_sends_to(&self, digits_prefix: &str) {
        *self.fail_prefix.lock().unwrap() = Some(digits_prefix.to_string());
    }

    pub fn set_qr(&self, data_url: &str) {
        *self.qr.lock().unwrap() = Some(data_url.to_string());
    }

    pub fn set_error(&self, reason: &str) {
        *self.error.lock().unwrap() = Some(reason.to_string());
    }

    pub fn sent_texts(&self) -> Vec<(String, String)> {
        self.texts.lock().unwrap().clone()
    }

    pub fn sent_media(&self) -> Vec<(String, String, Option<String>)> {
        self.media.lock().unwrap().clone()
    }

    pub fn sent_instants(&self) -> Vec<Instant> {
        self.instants.lock().unwrap().clone()
    }

    fn check_fail(&self, dest: &str) -> Result<(), BridgeError> {
        if let Some(prefix) = self.fail_prefix.lock().unwrap().as_deref() {
            if dest.starts_with(prefix) {
                return Err(BridgeError::Send("connection reset".into()));
            }
        }
        Ok(())
    }

    fn record_send(&self) {
        let count = self.send_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.instants.lock().unwrap().push(Instant::now());
        if let Some(limit) = self.drop_ready_after {
            if count >= limit {
                self.ready.store(false, Ordering::SeqCst);
            }
        }
    }
}

#[async_trait]
impl SessionClient for MockSession {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn resolve(&self, digits: &str) -> Result<String, BridgeError> {
        if digits.len() < 10 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(BridgeError::NumberNotFound(digits.to_string()));
        }
        Ok(format!("{digits}@s.whatsapp.net"))
    }

    async fn send_text(&self, dest: &str, text: &str) -> Result<(), BridgeError> {
        self.check_fail(dest)?;
        self.texts
            .lock()
            .unwrap()
            .push((dest.to_string(), text.to_string()));
        self.record_send();
        Ok(())
    }

    async fn send_media(
        &self,
        dest: &str,
        media: &MediaFile,
        caption: Option<&str>,
    ) -> Result<(), BridgeError> {
        self.check_fail(dest)?;
        self.media.lock().unwrap().push((
            dest.to_string(),
            media.file_name().to_string(),
            caption.map(|c| c.to_string()),
        ));
        self.record_send();
        Ok(())
    }

    async fn qr_data_url(&self) -> Option<String> {
        self.qr.lock().unwrap().clone()
    }

    async fn last_error(&self) -> Option<String> {
        self.error.lock().unwrap().clone()
    }
}
