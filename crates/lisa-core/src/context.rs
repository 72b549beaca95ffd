//! Group/direct addressing context for an inbound message.

use serde::Serialize;

use crate::messaging::{port::GroupLookup, types::IncomingEvent};

/// Substituted when a group name cannot be resolved.
pub const UNKNOWN_GROUP: &str = "unknown group";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedContext {
    pub is_group: bool,
    /// Empty for direct messages.
    pub group_name: String,
    pub sender_name: String,
}

impl ResolvedContext {
    pub fn direct(sender_name: impl Into<String>) -> Self {
        Self {
            is_group: false,
            group_name: String::new(),
            sender_name: sender_name.into(),
        }
    }

    pub fn group(group_name: impl Into<String>, sender_name: impl Into<String>) -> Self {
        Self {
            is_group: true,
            group_name: group_name.into(),
            sender_name: sender_name.into(),
        }
    }
}

/// Resolve context for one event. Never fails: a failed lookup becomes
/// [`UNKNOWN_GROUP`]. Nothing is cached between events.
pub async fn resolve(event: &IncomingEvent, lookup: &dyn GroupLookup) -> ResolvedContext {
    let sender_name = sender_display_name(event);
    if !event.is_group() {
        return ResolvedContext::direct(sender_name);
    }

    let group_name = match lookup.group_name(&event.info.chat).await {
        Ok(name) if !name.trim().is_empty() => name,
        Ok(_) => {
            tracing::debug!(chat = %event.info.chat, "group has no name");
            UNKNOWN_GROUP.to_string()
        }
        Err(e) => {
            tracing::warn!(chat = %event.info.chat, "group lookup failed: {e}");
            UNKNOWN_GROUP.to_string()
        }
    };

    ResolvedContext::group(group_name, sender_name)
}

fn sender_display_name(event: &IncomingEvent) -> String {
    let push_name = event.info.push_name.trim();
    if !push_name.is_empty() {
        return push_name.to_string();
    }
    event.info.sender.user().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::Jid, errors::Error, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedLookup {
        name: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl FixedLookup {
        fn new(name: Option<&'static str>) -> Self {
            Self {
                name,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl GroupLookup for FixedLookup {
        async fn group_name(&self, _group: &Jid) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.name
                .map(str::to_string)
                .ok_or_else(|| Error::GroupLookup("not a participant".into()))
        }
    }

    fn event(is_group: bool, push_name: &str) -> IncomingEvent {
        let mut ev = IncomingEvent::default();
        ev.info.is_group = is_group;
        ev.info.push_name = push_name.to_string();
        ev.info.sender = Jid::new("5491100000000@s.whatsapp.net");
        ev.info.chat = if is_group {
            Jid::new("120363000000000000@g.us")
        } else {
            ev.info.sender.clone()
        };
        ev
    }

    #[tokio::test]
    async fn direct_messages_skip_lookup() {
        let lookup = FixedLookup::new(Some("Team"));
        let ctx = resolve(&event(false, "Ana"), &lookup).await;
        assert_eq!(ctx, ResolvedContext::direct("Ana"));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn group_lookup_failure_uses_sentinel() {
        let lookup = FixedLookup::new(None);
        let ctx = resolve(&event(true, "Ana"), &lookup).await;
        assert_eq!(ctx, ResolvedContext::group(UNKNOWN_GROUP, "Ana"));
    }

    #[tokio::test]
    async fn group_name_is_resolved_every_time() {
        let lookup = FixedLookup::new(Some("Soporte"));
        let ev = event(true, "Ana");
        for _ in 0..3 {
            let ctx = resolve(&ev, &lookup).await;
            assert_eq!(ctx.group_name, "Soporte");
        }
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_push_name_falls_back_to_sender_user() {
        let lookup = FixedLookup::new(None);
        let ctx = resolve(&event(false, "  "), &lookup).await;
        assert_eq!(ctx.sender_name, "5491100000000");
    }
}
