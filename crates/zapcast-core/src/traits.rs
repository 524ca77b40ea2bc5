use crate::{campaign::MediaFile, error::BridgeError};
use async_trait::async_trait;

/// The external WhatsApp session collaborator.
///
/// The real implementation (`zapcast-wa`) drives a `whatsapp-rust` client;
/// tests substitute a mock. Protocol handling, session crypto, and delivery
/// all live behind this seam.
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Whether the session is authenticated and connected. Driven solely by
    /// collaborator lifecycle events, never computed locally.
    fn is_ready(&self) -> bool;

    /// Resolve normalized digits to a destination identifier.
    /// Returns `BridgeError::NumberNotFound` for unusable input.
    async fn resolve(&self, digits: &str) -> Result<String, BridgeError>;

    /// Send a plain text message to a resolved destination.
    async fn send_text(&self, dest: &str, text: &str) -> Result<(), BridgeError>;

    /// Send one media attachment, with an optional caption.
    async fn send_media(
        &self,
        dest: &str,
        media: &MediaFile,
        caption: Option<&str>,
    ) -> Result<(), BridgeError>;

    /// Current pairing QR code as a PNG data URL, if the session is
    /// awaiting authentication.
    async fn qr_data_url(&self) -> Option<String>;

    /// Last session-level failure (disconnect reason, auth failure, ...).
    async fn last_error(&self) -> Option<String>;
}
