//! Push delivery decoding.
//!
//! A delivery arrives either as a bare Pub/Sub push envelope or as a
//! structured-mode CloudEvent whose `data` member is that envelope. In both
//! cases `message.data` holds the base64 encoding of a UTF-8 JSON asset
//! change event.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::models::{AssetChangeEvent, COMPUTE_INSTANCE_ASSET_TYPE};

/// Reasons an inbound delivery could not be turned into an event.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Body is not a push envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("Push message carries no data")]
    MissingData,

    #[error("Message data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Message data is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Message payload is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("Message payload is not a JSON object")]
    NotAnObject,
}

/// Pub/Sub push envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEnvelope {
    pub message: PubSubMessage,
    #[serde(default)]
    pub subscription: Option<String>,
}

/// The message carried by a push envelope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubSubMessage {
    /// Base64-encoded payload.
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub publish_time: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// Structured-mode CloudEvent wrapping a push envelope.
#[derive(Debug, Clone, Deserialize)]
struct CloudEventBody {
    data: PushEnvelope,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InboundBody {
    Push(PushEnvelope),
    CloudEvent(CloudEventBody),
}

/// A fully decoded delivery.
#[derive(Debug, Clone)]
pub struct DecodedEvent {
    pub event: AssetChangeEvent,
    /// Decoded message text, kept verbatim for auditing.
    pub raw_payload: String,
    pub message_id: Option<String>,
}

/// Parses the transport body into its push envelope.
pub fn parse_push_body(body: &[u8]) -> Result<PushEnvelope, DecodeError> {
    let inbound: InboundBody = serde_json::from_slice(body).map_err(DecodeError::Envelope)?;
    Ok(match inbound {
        InboundBody::Push(envelope) => envelope,
        InboundBody::CloudEvent(cloud_event) => cloud_event.data,
    })
}

impl PubSubMessage {
    /// Decodes `data` from base64 into UTF-8 text.
    pub fn payload_text(&self) -> Result<String, DecodeError> {
        let encoded = self.data.as_deref().ok_or(DecodeError::MissingData)?;
        let bytes = BASE64.decode(encoded.trim())?;
        Ok(String::from_utf8(bytes)?)
    }
}

/// Decoded message text parsed as a JSON object but not yet typed.
///
/// Only `assetType` is read eagerly so that events for other asset types can
/// be skipped whatever the shape of their remaining fields.
#[derive(Debug, Clone)]
pub struct AssetPayload {
    value: serde_json::Value,
}

impl AssetPayload {
    /// Parses decoded message text, which must be a JSON object.
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(DecodeError::Json)?;
        if !value.is_object() {
            return Err(DecodeError::NotAnObject);
        }
        Ok(Self { value })
    }

    /// Returns the asset type. A non-string value is rendered as JSON text.
    pub fn asset_type(&self) -> Option<String> {
        match self.value.get("assetType")? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Returns true when the payload describes a Compute Engine instance.
    pub fn is_compute_instance(&self) -> bool {
        self.value.get("assetType").and_then(serde_json::Value::as_str)
            == Some(COMPUTE_INSTANCE_ASSET_TYPE)
    }

    /// Interprets the payload as a typed asset change event.
    pub fn into_event(self) -> Result<AssetChangeEvent, DecodeError> {
        serde_json::from_value(self.value).map_err(DecodeError::Json)
    }
}

/// Parses decoded message text as an asset change event.
pub fn parse_asset_event(text: &str) -> Result<AssetChangeEvent, DecodeError> {
    AssetPayload::parse(text)?.into_event()
}

/// Decodes a transport body all the way to an asset change event.
pub fn decode_push_body(body: &[u8]) -> Result<DecodedEvent, DecodeError> {
    let envelope = parse_push_body(body)?;
    let raw_payload = envelope.message.payload_text()?;
    let event = parse_asset_event(&raw_payload)?;
    Ok(DecodedEvent {
        event,
        raw_payload,
        message_id: envelope.message.message_id,
    })
}

/// Encodes an asset payload as a push envelope body. Used by tests and
/// local tooling.
pub fn encode_push_body(payload: &str, message_id: &str) -> Vec<u8> {
    serde_json::json!({
        "message": {
            "data": BASE64.encode(payload.as_bytes()),
            "messageId": message_id,
            "attributes": {},
        },
        "subscription": "projects/local/subscriptions/label-warden",
    })
    .to_string()
    .into_bytes()
}
