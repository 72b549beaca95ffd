//! JSON-lines protocol spoken with the bridge sidecar.
//!
//! One JSON object per line, discriminated by `type`. Requests carry an `id`
//! that the matching `response` echoes back.

use serde::{Deserialize, Serialize};

use lisa_core::{
    domain::{Jid, MessageId},
    messaging::types::IncomingEvent,
};

/// Lines written to the bridge's stdin.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeCommand {
    Connect { id: u64 },
    GroupInfo { id: u64, jid: Jid },
    Disconnect,
}

/// Lines read from the bridge's stdout.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeMessage {
    Response(BridgeResponse),
    Qr {
        code: String,
    },
    PairSuccess,
    Connected,
    Disconnected,
    LoggedOut,
    Receipt {
        #[serde(default)]
        message_ids: Vec<MessageId>,
    },
    Message(Box<IncomingEvent>),
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct BridgeResponse {
    pub id: u64,
    pub ok: bool,
    pub error: Option<String>,
    /// Group display name (`group_info`).
    pub name: Option<String>,
    /// Linked device JID (`connect`).
    pub jid: Option<Jid>,
}

impl BridgeResponse {
    pub fn error_text(&self) -> String {
        self.error
            .clone()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "bridge reported failure".to_string())
    }
}

pub fn parse_line(line: &str) -> serde_json::Result<BridgeMessage> {
    serde_json::from_str(line)
}

/// Serialize a command as one newline-terminated line.
pub fn encode_command(cmd: &BridgeCommand) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(cmd)?;
    line.push('\n');
    Ok(line)
}
