//! Bot lifecycle: building, running, and re-initializing the session.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use wacore::types::events::Event;
use whatsapp_rust::bot::Bot;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

use zapcast_core::error::BridgeError;

use crate::session::WaSession;
use crate::store::SqliteSessionStore;

impl WaSession {
    /// Run the session forever: build the bot, and whenever the session
    /// drops, rebuild after a fixed delay instead of crashing.
    ///
    /// Never returns; spawn it. Unattended startup failures (store errors,
    /// handshake refusal) land in `last_error` and retry on the same cadence
    /// as a disconnect.
    pub async fn run_supervised(self: Arc<Self>) {
        let delay = Duration::from_secs(self.config.reconnect_delay_secs);
        loop {
            match self.build_and_run_bot().await {
                Ok(()) => {
                    // Bot runs in the background; park until it drops.
                    self.disconnected.notified().await;
                }
                Err(e) => {
                    self.record_failure(format!("session init failed: {e}"))
                        .await;
                }
            }
            info!(
                "re-initializing WhatsApp session in {}s",
                delay.as_secs()
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Build a bot wired to this session's shared state and run it in the
    /// background. The previous bot, if any, is orphaned: the event handler
    /// of the new one updates the same `Arc`-wrapped fields.
    async fn build_and_run_bot(&self) -> Result<(), BridgeError> {
        let db_path = self.session_db_path();
        info!("building WhatsApp bot (session: {db_path})...");

        let backend = Arc::new(
            SqliteSessionStore::open(&db_path)
                .await
                .map_err(|e| BridgeError::Session(format!("session store init failed: {e}")))?,
        );

        let client_handle = self.client.clone();
        let ready_flag = self.ready.clone();
        let qr_buf = self.last_qr.clone();
        let error_buf = self.last_error.clone();
        let drop_signal = self.disconnected.clone();

        let mut bot = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .with_device_props(
                Some(self.config.device_name.clone()),
                None,
                Some(waproto::whatsapp::device_props::PlatformType::Desktop),
            )
            .on_event(move |event, client| {
                let client_store = client_handle.clone();
                let ready = ready_flag.clone();
                let qr_buf = qr_buf.clone();
                let error_buf = error_buf.clone();
                let drop_signal = drop_signal.clone();
                async move {
                    match event {
                        Event::PairingQrCode { code, .. } => {
                            info!("WhatsApp QR code generated (fetch it from /api/status)");
                            *qr_buf.lock().await = Some(code);
                        }
                        Event::PairSuccess(_) => {
                            info!("WhatsApp pairing successful");
                        }
                        Event::Connected(_) => {
                            info!("WhatsApp connected and ready");
                            *client_store.lock().await = Some(client);
                            // Session is valid; no more QR needed.
                            *qr_buf.lock().await = None;
                            ready.store(true, Ordering::SeqCst);
                        }
                        Event::Disconnected(_) => {
                            warn!("WhatsApp disconnected");
                            ready.store(false, Ordering::SeqCst);
                            *client_store.lock().await = None;
                            *error_buf.lock().await = Some("session disconnected".to_string());
                            drop_signal.notify_one();
                        }
                        Event::LoggedOut(_) => {
                            warn!("WhatsApp logged out: session invalidated");
                            ready.store(false, Ordering::SeqCst);
                            *client_store.lock().await = None;
                            *error_buf.lock().await =
                                Some("logged out: session invalidated, re-pair required".to_string());
                            drop_signal.notify_one();
                        }
                        _ => {}
                    }
                }
            })
            .build()
            .await
            .map_err(|e| BridgeError::Session(format!("bot build failed: {e}")))?;

        // Store the client handle immediately; readiness still waits for
        // the Connected event.
        *self.client.lock().await = Some(bot.client());

        let _handle = bot
            .run()
            .await
            .map_err(|e| BridgeError::Session(format!("bot run failed: {e}")))?;

        info!("WhatsApp bot started");
        Ok(())
    }
}
