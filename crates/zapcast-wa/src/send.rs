//! Outbound send paths: JID parsing, retry with backoff, media upload.

use tracing::{error, warn};
use wacore_binary::jid::Jid;
use whatsapp_rust::client::Client;

use zapcast_core::campaign::MediaFile;
use zapcast_core::error::BridgeError;

use crate::session::WaSession;

/// Retry delays for exponential backoff: 500ms, 1s, 2s.
pub(crate) const RETRY_DELAYS_MS: [u64; 3] = [500, 1000, 2000];

/// Send a message with retry and exponential backoff.
///
/// Attempts up to 3 times with delays of 500ms, 1s, 2s between retries.
pub(crate) async fn retry_send(
    client: &Client,
    jid: &Jid,
    msg: waproto::whatsapp::Message,
) -> Result<String, BridgeError> {
    let mut last_err = None;

    for (attempt, delay_ms) in RETRY_DELAYS_MS.iter().enumerate() {
        match client.send_message(jid.clone(), msg.clone()).await {
            Ok(msg_id) => return Ok(msg_id),
            Err(e) => {
                let attempt_num = attempt + 1;
                if attempt_num < RETRY_DELAYS_MS.len() {
                    warn!(
                        "send attempt {attempt_num}/{} failed: {e}, retrying in {delay_ms}ms",
                        RETRY_DELAYS_MS.len()
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(*delay_ms)).await;
                } else {
                    error!(
                        "send attempt {attempt_num}/{} failed: {e}, giving up",
                        RETRY_DELAYS_MS.len()
                    );
                }
                last_err = Some(e);
            }
        }
    }

    Err(BridgeError::Send(format!(
        "send failed after {} attempts: {}",
        RETRY_DELAYS_MS.len(),
        last_err.map(|e| e.to_string()).unwrap_or_default()
    )))
}

impl WaSession {
    /// Parse a destination string into a JID.
    fn parse_jid(dest: &str) -> Result<Jid, BridgeError> {
        dest.parse()
            .map_err(|e| BridgeError::Send(format!("invalid destination '{dest}': {e}")))
    }

    pub(crate) async fn send_text_impl(&self, dest: &str, text: &str) -> Result<(), BridgeError> {
        let client_guard = self.client.lock().await;
        let client = client_guard
            .as_ref()
            .ok_or_else(|| BridgeError::Session("whatsapp client not connected".into()))?;

        let jid = Self::parse_jid(dest)?;
        let msg = waproto::whatsapp::Message {
            conversation: Some(text.to_string()),
            ..Default::default()
        };
        retry_send(client, &jid, msg).await?;
        Ok(())
    }

    pub(crate) async fn send_media_impl(
        &self,
        dest: &str,
        media: &MediaFile,
        caption: Option<&str>,
    ) -> Result<(), BridgeError> {
        let bytes = media.decode()?;

        let client_guard = self.client.lock().await;
        let client = client_guard
            .as_ref()
            .ok_or_else(|| BridgeError::Session("whatsapp client not connected".into()))?;

        let jid = Self::parse_jid(dest)?;

        let media_type = if media.is_image() {
            whatsapp_rust::download::MediaType::Image
        } else {
            whatsapp_rust::download::MediaType::Document
        };

        let upload = client
            .upload(bytes, media_type)
            .await
            .map_err(|e| BridgeError::Send(format!("media upload failed: {e}")))?;

        let msg = if media.is_image() {
            waproto::whatsapp::Message {
                image_message: Some(Box::new(waproto::whatsapp::message::ImageMessage {
                    mimetype: Some(media.mimetype.clone()),
                    caption: caption.map(|c| c.to_string()),
                    url: Some(upload.url),
                    direct_path: Some(upload.direct_path),
                    media_key: Some(upload.media_key),
                    file_enc_sha256: Some(upload.file_enc_sha256),
                    file_sha256: Some(upload.file_sha256),
                    file_length: Some(upload.file_length),
                    ..Default::default()
                })),
                ..Default::default()
            }
        } else {
            waproto::whatsapp::Message {
                document_message: Some(Box::new(waproto::whatsapp::message::DocumentMessage {
                    mimetype: Some(media.mimetype.clone()),
                    title: Some(media.file_name().to_string()),
                    file_name: Some(media.file_name().to_string()),
                    caption: caption.map(|c| c.to_string()),
                    url: Some(upload.url),
                    direct_path: Some(upload.direct_path),
                    media_key: Some(upload.media_key),
                    file_enc_sha256: Some(upload.file_enc_sha256),
                    file_sha256: Some(upload.file_sha256),
                    file_length: Some(upload.file_length),
                    ..Default::default()
                })),
                ..Default::default()
            }
        };

        retry_send(client, &jid, msg).await?;
        Ok(())
    }
}
