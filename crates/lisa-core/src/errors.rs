/// Core error type for the bot.
///
/// Adapter crates map their specific failures into this type so startup can tell
/// fatal errors (config, connect) apart from failures that only get logged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingConfig(Vec<String>),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("group lookup failed: {0}")]
    GroupLookup(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error must abort startup.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::MissingConfig(_) | Error::Connect(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_lists_every_name() {
        let e = Error::MissingConfig(vec!["DISCORD_TOKEN".into(), "GEMINI_API_KEY".into()]);
        assert_eq!(
            e.to_string(),
            "missing required environment variables: DISCORD_TOKEN, GEMINI_API_KEY"
        );
        assert!(e.is_startup_fatal());
    }

    #[test]
    fn lookup_failures_are_not_fatal() {
        assert!(!Error::GroupLookup("timeout".into()).is_startup_fatal());
        assert!(!Error::Transport("closed".into()).is_startup_fatal());
    }
}
