//! Sequential event loop between the transport channel and the dispatcher.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    classify::classify,
    context::resolve,
    dispatch::Dispatcher,
    messaging::{
        port::GroupLookup,
        types::{IncomingEvent, TransportEvent},
    },
};

/// Capacity of the transport → pipeline channel.
pub const EVENT_BUFFER: usize = 256;

pub struct Pipeline {
    dispatcher: Dispatcher,
    lookup: Arc<dyn GroupLookup>,
}

impl Pipeline {
    pub fn new(dispatcher: Dispatcher, lookup: Arc<dyn GroupLookup>) -> Self {
        Self { dispatcher, lookup }
    }

    /// Consume events in delivery order until the channel closes or `cancel` fires.
    pub async fn run(self, mut rx: mpsc::Receiver<TransportEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("event pipeline cancelled");
                    return;
                }
                ev = rx.recv() => {
                    let Some(ev) = ev else {
                        tracing::debug!("transport event channel closed");
                        return;
                    };
                    self.handle(ev).await;
                }
            }
        }
    }

    pub async fn handle(&self, ev: TransportEvent) {
        match ev {
            TransportEvent::Message(msg) => self.handle_message(&msg).await,
            TransportEvent::Receipt { message_ids } => {
                if let Some(first) = message_ids.first() {
                    tracing::info!("WA: message delivered: {}", first.0);
                }
            }
            TransportEvent::Connected => tracing::info!("WA: client connected"),
            TransportEvent::Disconnected => tracing::warn!("WA: client disconnected"),
            TransportEvent::LoggedOut => tracing::warn!("WA: session logged out"),
        }
    }

    async fn handle_message(&self, event: &IncomingEvent) {
        if event.is_from_me() {
            return;
        }
        let kind = classify(event);
        let context = resolve(event, self.lookup.as_ref()).await;
        self.dispatcher.dispatch(event, kind, &context).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::UNKNOWN_GROUP,
        dispatch::MemorySink,
        domain::{Jid, MessageId},
        errors::Error,
        Result,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FailingLookup {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GroupLookup for FailingLookup {
        async fn group_name(&self, _group: &Jid) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::GroupLookup("timed out".into()))
        }
    }

    fn message(is_group: bool, from_me: bool, text: &str) -> TransportEvent {
        let mut ev = IncomingEvent::default();
        ev.info.push_name = "Ana".into();
        ev.info.is_group = is_group;
        ev.info.is_from_me = from_me;
        ev.info.chat = Jid::new(if is_group {
            "120363000000000000@g.us"
        } else {
            "5491100000000@s.whatsapp.net"
        });
        ev.message.conversation = Some(text.to_string());
        TransportEvent::Message(Box::new(ev))
    }

    #[tokio::test]
    async fn processes_events_in_order_until_channel_closes() {
        let sink = Arc::new(MemorySink::default());
        let lookup = Arc::new(FailingLookup::default());
        let pipeline = Pipeline::new(Dispatcher::new(sink.clone()), lookup.clone());

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tx.send(message(false, false, "hola")).await.unwrap();
        tx.send(TransportEvent::Receipt {
            message_ids: vec![MessageId("ABC".into())],
        })
        .await
        .unwrap();
        tx.send(message(true, false, "hola")).await.unwrap();
        tx.send(TransportEvent::Disconnected).await.unwrap();
        tx.send(message(false, false, "sigo aca")).await.unwrap();
        drop(tx);

        pipeline.run(rx, CancellationToken::new()).await;

        assert_eq!(
            sink.lines(),
            vec![
                "[DIRECT] Ana: hola".to_string(),
                format!("[GROUP:{UNKNOWN_GROUP}] Ana: hola"),
                "[DIRECT] Ana: sigo aca".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn self_messages_skip_group_lookup() {
        let sink = Arc::new(MemorySink::default());
        let lookup = Arc::new(FailingLookup::default());
        let pipeline = Pipeline::new(Dispatcher::new(sink.clone()), lookup.clone());

        pipeline.handle(message(true, true, "mine")).await;

        assert!(sink.lines().is_empty());
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stops_on_cancel() {
        let sink = Arc::new(MemorySink::default());
        let pipeline = Pipeline::new(
            Dispatcher::new(sink),
            Arc::new(FailingLookup::default()),
        );
        let (_tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        pipeline.run(rx, cancel).await;
    }
}
