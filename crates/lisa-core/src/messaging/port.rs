use async_trait::async_trait;

use crate::{domain::Jid, Result};

/// Resolves a group JID to its display name.
#[async_trait]
pub trait GroupLookup: Send + Sync {
    async fn group_name(&self, group: &Jid) -> Result<String>;
}

/// Session to the messaging network.
///
/// The protocol, encryption, pairing and device store all live behind this
/// trait. Inbound events are pushed into the `mpsc::Sender<TransportEvent>`
/// an implementation receives at construction, in delivery order.
#[async_trait]
pub trait SessionTransport: GroupLookup {
    /// Open the session. On first use this blocks through pairing.
    async fn connect(&self) -> Result<()>;

    /// Close the session and release the underlying resources. Idempotent.
    async fn disconnect(&self);

    fn is_connected(&self) -> bool;

    /// JID of the linked device, once known.
    fn device_jid(&self) -> Option<Jid>;
}
