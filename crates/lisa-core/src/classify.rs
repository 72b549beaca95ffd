//! Message classification.
//!
//! The winning payload is picked in a fixed priority order: plain text, extended
//! text, image, document, audio, video, sticker, contact, location. Anything
//! else is `Unknown`. Classification never fails.

use serde::{Deserialize, Serialize};

use crate::messaging::types::{
    AudioPayload, ContactPayload, DocumentPayload, ExtendedTextPayload, ImagePayload,
    IncomingEvent, LocationPayload, MessageContent, StickerPayload, VideoPayload,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    Document,
    Audio,
    Video,
    Sticker,
    Contact,
    Location,
    Unknown,
}

impl MessageKind {
    pub fn label(self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Document => "document",
            MessageKind::Audio => "audio",
            MessageKind::Video => "video",
            MessageKind::Sticker => "sticker",
            MessageKind::Contact => "contact",
            MessageKind::Location => "location",
            MessageKind::Unknown => "unknown",
        }
    }

    /// Uppercase tag used in log summaries (`[IMAGE]`, `[UNKNOWN]`, ...).
    pub fn tag(self) -> &'static str {
        match self {
            MessageKind::Text => "TEXT",
            MessageKind::Image => "IMAGE",
            MessageKind::Document => "DOCUMENT",
            MessageKind::Audio => "AUDIO",
            MessageKind::Video => "VIDEO",
            MessageKind::Sticker => "STICKER",
            MessageKind::Contact => "CONTACT",
            MessageKind::Location => "LOCATION",
            MessageKind::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Borrowed view of the payload that decided the kind.
#[derive(Clone, Copy, Debug)]
pub enum Content<'a> {
    Text(&'a str),
    ExtendedText(&'a ExtendedTextPayload),
    Image(&'a ImagePayload),
    Document(&'a DocumentPayload),
    Audio(&'a AudioPayload),
    Video(&'a VideoPayload),
    Sticker(&'a StickerPayload),
    Contact(&'a ContactPayload),
    Location(&'a LocationPayload),
    Unknown,
}

impl Content<'_> {
    pub fn kind(&self) -> MessageKind {
        match self {
            Content::Text(_) | Content::ExtendedText(_) => MessageKind::Text,
            Content::Image(_) => MessageKind::Image,
            Content::Document(_) => MessageKind::Document,
            Content::Audio(_) => MessageKind::Audio,
            Content::Video(_) => MessageKind::Video,
            Content::Sticker(_) => MessageKind::Sticker,
            Content::Contact(_) => MessageKind::Contact,
            Content::Location(_) => MessageKind::Location,
            Content::Unknown => MessageKind::Unknown,
        }
    }
}

pub fn classify_content(msg: &MessageContent) -> Content<'_> {
    if let Some(text) = &msg.conversation {
        return Content::Text(text);
    }
    if let Some(p) = &msg.extended_text {
        return Content::ExtendedText(p);
    }
    if let Some(p) = &msg.image {
        return Content::Image(p);
    }
    if let Some(p) = &msg.document {
        return Content::Document(p);
    }
    if let Some(p) = &msg.audio {
        return Content::Audio(p);
    }
    if let Some(p) = &msg.video {
        return Content::Video(p);
    }
    if let Some(p) = &msg.sticker {
        return Content::Sticker(p);
    }
    if let Some(p) = &msg.contact {
        return Content::Contact(p);
    }
    if let Some(p) = &msg.location {
        return Content::Location(p);
    }
    Content::Unknown
}

pub fn classify(event: &IncomingEvent) -> MessageKind {
    classify_content(&event.message).kind()
}
