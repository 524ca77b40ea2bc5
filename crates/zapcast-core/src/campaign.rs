use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// A single campaign recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Raw phone number as submitted; normalized before sending.
    pub phone: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// An inline media attachment.
///
/// The payload arrives base64-encoded, optionally with a browser-style
/// `data:<mime>;base64,` prefix which is stripped before decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub mimetype: String,
    pub base64: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl MediaFile {
    /// Decode the payload into raw bytes, tolerating a data-URL prefix.
    pub fn decode(&self) -> Result<Vec<u8>, BridgeError> {
        let raw = match self.base64.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => self.base64.as_str(),
        };
        BASE64
            .decode(raw.trim())
            .map_err(|e| BridgeError::Media(format!("invalid base64 payload: {e}")))
    }

    /// Attachment file name, falling back to a generic one.
    pub fn file_name(&self) -> &str {
        self.name.as_deref().unwrap_or("attachment")
    }

    /// Whether this attachment should be sent as an inline image.
    pub fn is_image(&self) -> bool {
        self.mimetype.starts_with("image/")
    }
}

/// A bulk-send job: an ordered list of targets plus optional shared media.
///
/// Owned exclusively by the queue once enqueued; dropped after processing.
/// There is no persistence across process restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignJob {
    pub targets: Vec<Target>,
    #[serde(default)]
    pub media_files: Vec<MediaFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_base64() {
        let media = MediaFile {
            mimetype: "image/png".into(),
            base64: BASE64.encode(b"hello"),
            name: None,
        };
        assert_eq!(media.decode().unwrap(), b"hello");
    }

    #[test]
    fn test_decode_strips_data_url_prefix() {
        let media = MediaFile {
            mimetype: "image/png".into(),
            base64: format!("data:image/png;base64,{}", BASE64.encode(b"pixels")),
            name: None,
        };
        assert_eq!(media.decode().unwrap(), b"pixels");
    }

    #[test]
    fn test_decode_invalid_base64_fails() {
        let media = MediaFile {
            mimetype: "image/png".into(),
            base64: "!!!not-base64!!!".into(),
            name: None,
        };
        assert!(media.decode().is_err());
    }

    #[test]
    fn test_is_image_by_mimetype() {
        let img = MediaFile {
            mimetype: "image/jpeg".into(),
            base64: String::new(),
            name: None,
        };
        let doc = MediaFile {
            mimetype: "application/pdf".into(),
            base64: String::new(),
            name: Some("invoice.pdf".into()),
        };
        assert!(img.is_image());
        assert!(!doc.is_image());
        assert_eq!(doc.file_name(), "invoice.pdf");
        assert_eq!(img.file_name(), "attachment");
    }

    #[test]
    fn test_campaign_job_wire_names() {
        let json = serde_json::json!({
            "targets": [{"phone": "11988887777", "message": "oi"}],
            "mediaFiles": [{"mimetype": "image/png", "base64": "aGk=", "name": "a.png"}]
        });
        let job: CampaignJob = serde_json::from_value(json).unwrap();
        assert_eq!(job.targets.len(), 1);
        assert_eq!(job.targets[0].phone, "11988887777");
        assert_eq!(job.media_files.len(), 1);
        assert_eq!(job.media_files[0].name.as_deref(), Some("a.png"));
    }

    #[test]
    fn test_campaign_job_media_optional() {
        let json = serde_json::json!({
            "targets": [{"phone": "11988887777"}]
        });
        let job: CampaignJob = serde_json::from_value(json).unwrap();
        assert!(job.media_files.is_empty());
        assert!(job.targets[0].message.is_none());
    }
}
