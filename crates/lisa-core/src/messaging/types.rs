use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use crate::domain::{Jid, MessageId};

/// Everything the transport pushes into the pipeline.
#[derive(Clone, Debug)]
pub enum TransportEvent {
    Message(Box<IncomingEvent>),
    Receipt { message_ids: Vec<MessageId> },
    Connected,
    Disconnected,
    LoggedOut,
}

/// An inbound WhatsApp message as delivered by the transport.
///
/// Every field is optional on the wire. Missing or wrongly typed values
/// deserialize to empty defaults so a bad field never fails the event.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomingEvent {
    #[serde(deserialize_with = "lenient")]
    pub info: MessageInfo,
    #[serde(deserialize_with = "lenient")]
    pub message: MessageContent,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageInfo {
    #[serde(deserialize_with = "lenient")]
    pub id: MessageId,
    #[serde(deserialize_with = "lenient")]
    pub chat: Jid,
    #[serde(deserialize_with = "lenient")]
    pub sender: Jid,
    #[serde(deserialize_with = "lenient")]
    pub push_name: String,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(deserialize_with = "lenient")]
    pub is_group: bool,
    #[serde(deserialize_with = "lenient")]
    pub is_from_me: bool,
}

/// Content payloads. In practice only one is set per message.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageContent {
    #[serde(deserialize_with = "lenient")]
    pub conversation: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub extended_text: Option<ExtendedTextPayload>,
    #[serde(deserialize_with = "lenient")]
    pub image: Option<ImagePayload>,
    #[serde(deserialize_with = "lenient")]
    pub document: Option<DocumentPayload>,
    #[serde(deserialize_with = "lenient")]
    pub audio: Option<AudioPayload>,
    #[serde(deserialize_with = "lenient")]
    pub video: Option<VideoPayload>,
    #[serde(deserialize_with = "lenient")]
    pub sticker: Option<StickerPayload>,
    #[serde(deserialize_with = "lenient")]
    pub contact: Option<ContactPayload>,
    #[serde(deserialize_with = "lenient")]
    pub location: Option<LocationPayload>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtendedTextPayload {
    #[serde(deserialize_with = "lenient")]
    pub text: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagePayload {
    #[serde(deserialize_with = "lenient")]
    pub mimetype: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub caption: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentPayload {
    #[serde(deserialize_with = "lenient")]
    pub file_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub mimetype: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub file_length: Option<u64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioPayload {
    #[serde(deserialize_with = "lenient")]
    pub mimetype: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub seconds: Option<u32>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoPayload {
    #[serde(deserialize_with = "lenient")]
    pub mimetype: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub caption: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub seconds: Option<u32>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StickerPayload {
    #[serde(deserialize_with = "lenient")]
    pub mimetype: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactPayload {
    #[serde(deserialize_with = "lenient")]
    pub display_name: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationPayload {
    #[serde(deserialize_with = "lenient")]
    pub latitude: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub longitude: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
}

impl IncomingEvent {
    /// Plain text, falling back to the extended-text body when empty.
    pub fn text(&self) -> &str {
        let plain = self.message.conversation.as_deref().unwrap_or("");
        if !plain.is_empty() {
            return plain;
        }
        self.message
            .extended_text
            .as_ref()
            .and_then(|t| t.text.as_deref())
            .unwrap_or("")
    }

    pub fn is_from_me(&self) -> bool {
        self.info.is_from_me
    }

    /// Group chat per the transport flag, or by the chat's server.
    pub fn is_group(&self) -> bool {
        self.info.is_group || self.info.chat.is_group()
    }
}

/// Decode a field, falling back to its default when the value has the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// RFC 3339 strings or unix seconds; anything else is the epoch.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let ts = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .ok(),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    };
    Ok(ts.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_payload_degrades_to_defaults() {
        let raw = r#"{"info":{"push_name":"Ana"},"message":{"audio":{"seconds":null}}}"#;
        let ev: IncomingEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(ev.info.push_name, "Ana");
        assert!(!ev.is_group());
        let audio = ev.message.audio.unwrap();
        assert!(audio.mimetype.is_none());
        assert!(audio.seconds.is_none());
    }

    #[test]
    fn wrongly_typed_fields_fall_back_to_empty() {
        let raw = r#"{
            "info":{"id":7,"push_name":"Ana","timestamp":1700000000,"is_group":"yes"},
            "message":{"video":{"mimetype":"video/mp4","caption":5,"seconds":"12"},"audio":{"seconds":-1}}
        }"#;
        let ev: IncomingEvent = serde_json::from_str(raw).unwrap();
        assert!(ev.info.id.0.is_empty());
        assert_eq!(ev.info.push_name, "Ana");
        assert_eq!(ev.info.timestamp.timestamp(), 1_700_000_000);
        assert!(!ev.is_group());

        let video = ev.message.video.as_ref().unwrap();
        assert_eq!(video.mimetype.as_deref(), Some("video/mp4"));
        assert!(video.caption.is_none());
        assert!(video.seconds.is_none());
        assert!(ev.message.audio.as_ref().unwrap().seconds.is_none());
    }

    #[test]
    fn wrongly_typed_payload_is_dropped_not_fatal() {
        let raw = r#"{"info":{"timestamp":"2024-05-01T10:00:00Z"},"message":{"image":"oops","conversation":"hola"}}"#;
        let ev: IncomingEvent = serde_json::from_str(raw).unwrap();
        assert!(ev.message.image.is_none());
        assert_eq!(ev.text(), "hola");
        assert_eq!(ev.info.timestamp.timestamp(), 1_714_557_600);
    }

    #[test]
    fn group_chat_is_detected_from_the_chat_address() {
        let raw = r#"{"info":{"chat":"120363000000000000@g.us","is_group":"true"}}"#;
        let ev: IncomingEvent = serde_json::from_str(raw).unwrap();
        assert!(ev.is_group());
    }

    #[test]
    fn text_falls_back_to_extended_text() {
        let mut ev = IncomingEvent::default();
        ev.message.conversation = Some(String::new());
        ev.message.extended_text = Some(ExtendedTextPayload {
            text: Some("from link preview".into()),
        });
        assert_eq!(ev.text(), "from link preview");

        ev.message.conversation = Some("plain".into());
        assert_eq!(ev.text(), "plain");
    }
}
