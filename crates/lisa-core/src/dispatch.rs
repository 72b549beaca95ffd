//! Kind → handler dispatch.
//!
//! Each handler turns the message into a summary, the summary is formatted
//! with the resolved context and written to a [`LogSink`], and then the
//! downstream [`MessageHandler`] (if any) sees the original event.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{
    classify::{classify_content, MessageKind},
    context::ResolvedContext,
    formatting::{format_line, media_summary, unsupported_summary},
    media::MediaSummary,
    messaging::types::IncomingEvent,
};

/// Destination for formatted log lines.
pub trait LogSink: Send + Sync {
    fn emit(&self, line: &str);
}

/// Writes lines through `tracing` at info level.
#[derive(Clone, Copy, Debug)]
pub struct TracingSink {
    prefix: &'static str,
}

impl TracingSink {
    /// Sink for inbound message lines (`WA [DIRECT] ...`).
    pub fn messages() -> Self {
        Self { prefix: "WA " }
    }

    pub fn with_prefix(prefix: &'static str) -> Self {
        Self { prefix }
    }
}

impl LogSink for TracingSink {
    fn emit(&self, line: &str) {
        tracing::info!("{}{line}", self.prefix);
    }
}

/// Keeps every emitted line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line.to_string());
    }
}

/// Downstream consumer of dispatched messages (AI replies, ticket filing, ...).
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_message(&self, event: &IncomingEvent);
}

#[async_trait]
impl<F> MessageHandler for F
where
    F: Fn(&IncomingEvent) + Send + Sync,
{
    async fn on_message(&self, event: &IncomingEvent) {
        self(event)
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    sink: Arc<dyn LogSink>,
    handler: Option<Arc<dyn MessageHandler>>,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            handler: None,
        }
    }

    /// Register the downstream consumer. Fixed for the dispatcher's lifetime.
    pub fn with_handler(mut self, handler: Arc<dyn MessageHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Handle one classified message. Returns the emitted line, if any.
    ///
    /// Self-authored events are dropped without output or callback.
    pub async fn dispatch(
        &self,
        event: &IncomingEvent,
        kind: MessageKind,
        context: &ResolvedContext,
    ) -> Option<String> {
        if event.is_from_me() {
            return None;
        }

        let line = summarize(event, kind).map(|summary| {
            let line = format_line(context, &context.sender_name, &summary);
            self.sink.emit(&line);
            line
        });

        if let Some(handler) = &self.handler {
            handler.on_message(event).await;
        }

        line
    }
}

fn summarize(event: &IncomingEvent, kind: MessageKind) -> Option<String> {
    match kind {
        MessageKind::Text => handle_text(event),
        MessageKind::Image
        | MessageKind::Document
        | MessageKind::Audio
        | MessageKind::Video
        | MessageKind::Sticker
        | MessageKind::Contact
        | MessageKind::Location => handle_media(event, kind),
        MessageKind::Unknown => Some(unsupported_summary(kind)),
    }
}

fn handle_text(event: &IncomingEvent) -> Option<String> {
    let text = event.text();
    if text.is_empty() {
        return None;
    }
    Some(text.to_string())
}

fn handle_media(event: &IncomingEvent, kind: MessageKind) -> Option<String> {
    // The payload must agree with the requested kind; otherwise there is nothing to show.
    let media = MediaSummary::from_content(&classify_content(&event.message))
        .filter(|m| m.kind == kind)?;

    if media.is_text_document() {
        tracing::debug!(
            id = %event.info.id.0,
            file = %media.file_name,
            "document is plain text; eligible for content processing"
        );
    }

    Some(media_summary(&media))
}
