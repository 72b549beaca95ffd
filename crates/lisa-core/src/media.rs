//! Read-only media views and the normalized message record handed to consumers.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    classify::{classify_content, Content, MessageKind},
    context::ResolvedContext,
    domain::{Jid, MessageId},
    messaging::types::IncomingEvent,
};

const TEXT_MIME_TYPES: &[&str] = &[
    "text/plain",
    "text/csv",
    "application/json",
    "text/xml",
    "application/xml",
];

const TEXT_EXTENSIONS: &[&str] = &["txt", "log", "csv", "json", "xml", "md"];

/// Attributes extracted from a media payload. Absent fields stay empty/zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MediaSummary {
    pub kind: MessageKind,
    pub mimetype: String,
    pub caption: String,
    pub duration_seconds: u32,
    pub file_name: String,
    pub file_length: u64,
}

impl MediaSummary {
    fn empty(kind: MessageKind) -> Self {
        Self {
            kind,
            mimetype: String::new(),
            caption: String::new(),
            duration_seconds: 0,
            file_name: String::new(),
            file_length: 0,
        }
    }

    /// Build the summary for a classified payload. `None` for text and unknown.
    pub fn from_content(content: &Content<'_>) -> Option<Self> {
        let mut s = Self::empty(content.kind());
        match content {
            Content::Text(_) | Content::ExtendedText(_) | Content::Unknown => return None,
            Content::Image(p) => {
                s.mimetype = owned(&p.mimetype);
                s.caption = owned(&p.caption);
            }
            Content::Document(p) => {
                s.mimetype = owned(&p.mimetype);
                s.file_name = owned(&p.file_name);
                s.file_length = p.file_length.unwrap_or(0);
            }
            Content::Audio(p) => {
                s.mimetype = owned(&p.mimetype);
                s.duration_seconds = p.seconds.unwrap_or(0);
            }
            Content::Video(p) => {
                s.mimetype = owned(&p.mimetype);
                s.caption = owned(&p.caption);
                s.duration_seconds = p.seconds.unwrap_or(0);
            }
            Content::Sticker(p) => {
                s.mimetype = owned(&p.mimetype);
            }
            Content::Contact(_) | Content::Location(_) => {}
        }
        Some(s)
    }

    pub fn is_text_document(&self) -> bool {
        self.kind == MessageKind::Document
            && is_processable_text_file(&self.file_name, &self.mimetype)
    }
}

fn owned(v: &Option<String>) -> String {
    v.as_deref().unwrap_or("").to_string()
}

/// Whether a document is plain text we could read without conversion.
pub fn is_processable_text_file(file_name: &str, mimetype: &str) -> bool {
    if TEXT_MIME_TYPES.iter().any(|mt| mimetype.contains(mt)) {
        return true;
    }
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| TEXT_EXTENSIONS.contains(&e.as_str()))
}

/// Flattened, serializable view of a message for downstream consumers.
#[derive(Clone, Debug, Serialize)]
pub struct NormalizedMessage {
    pub id: MessageId,
    pub chat: Jid,
    pub sender: Jid,
    pub push_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_group: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub group_name: String,
    pub is_from_me: bool,
    pub kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaSummary>,
}

impl NormalizedMessage {
    pub fn new(event: &IncomingEvent, context: Option<&ResolvedContext>) -> Self {
        let content = classify_content(&event.message);
        Self {
            id: event.info.id.clone(),
            chat: event.info.chat.clone(),
            sender: event.info.sender.clone(),
            push_name: event.info.push_name.clone(),
            text: event.text().to_string(),
            timestamp: event.info.timestamp,
            is_group: event.info.is_group,
            group_name: context.map(|c| c.group_name.clone()).unwrap_or_default(),
            is_from_me: event.info.is_from_me,
            kind: content.kind(),
            media: MediaSummary::from_content(&content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::types::{AudioPayload, DocumentPayload};

    #[test]
    fn document_summary_extracts_fields() {
        let p = DocumentPayload {
            file_name: Some("report.pdf".into()),
            mimetype: Some("application/pdf".into()),
            file_length: Some(2048),
        };
        let s = MediaSummary::from_content(&Content::Document(&p)).unwrap();
        assert_eq!(s.kind, MessageKind::Document);
        assert_eq!(s.file_name, "report.pdf");
        assert_eq!(s.file_length, 2048);
        assert!(!s.is_text_document());
    }

    #[test]
    fn missing_fields_stay_empty() {
        let p = AudioPayload::default();
        let s = MediaSummary::from_content(&Content::Audio(&p)).unwrap();
        assert_eq!(s.mimetype, "");
        assert_eq!(s.duration_seconds, 0);
    }

    #[test]
    fn text_has_no_media_summary() {
        assert!(MediaSummary::from_content(&Content::Text("hola")).is_none());
        assert!(MediaSummary::from_content(&Content::Unknown).is_none());
    }

    #[test]
    fn detects_text_files_by_mime_or_extension() {
        assert!(is_processable_text_file("data.bin", "application/json; charset=utf-8"));
        assert!(is_processable_text_file("NOTES.MD", ""));
        assert!(is_processable_text_file("server.log", "application/octet-stream"));
        assert!(!is_processable_text_file("photo.jpg", "image/jpeg"));
        assert!(!is_processable_text_file("", ""));
    }

    #[test]
    fn normalized_message_serializes_without_empty_group() {
        let mut ev = IncomingEvent::default();
        ev.info.push_name = "Ana".into();
        ev.message.conversation = Some("hola".into());
        let n = NormalizedMessage::new(&ev, None);
        let v = serde_json::to_value(&n).unwrap();
        assert_eq!(v["text"], "hola");
        assert_eq!(v["kind"], "text");
        assert!(v.get("group_name").is_none());
        assert!(v.get("media").is_none());
    }
}
