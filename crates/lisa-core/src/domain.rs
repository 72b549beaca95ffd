use std::fmt;

use serde::{Deserialize, Serialize};

/// Server part used by WhatsApp group chats.
pub const GROUP_SERVER: &str = "g.us";

/// WhatsApp address (`user@server`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Jid(pub String);

impl Jid {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// User part (before `@`). Device suffixes like `:12` are dropped.
    pub fn user(&self) -> &str {
        let user = self.0.split_once('@').map(|(u, _)| u).unwrap_or(&self.0);
        user.split_once(':').map(|(u, _)| u).unwrap_or(user)
    }

    pub fn server(&self) -> &str {
        self.0.split_once('@').map(|(_, s)| s).unwrap_or("")
    }

    pub fn is_group(&self) -> bool {
        self.server() == GROUP_SERVER
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport-assigned message id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_user_and_server() {
        let j = Jid::new("5491122334455:7@s.whatsapp.net");
        assert_eq!(j.user(), "5491122334455");
        assert_eq!(j.server(), "s.whatsapp.net");
        assert!(!j.is_group());
    }

    #[test]
    fn detects_group_server() {
        assert!(Jid::new("120363025246125486@g.us").is_group());
        assert_eq!(Jid::new("no-server").server(), "");
    }
}
