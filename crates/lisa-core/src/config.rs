use std::{env, path::Path};

use crate::{errors::Error, Result};

/// Typed configuration, sourced from the process environment (and `.env`).
///
/// Empty values count as unset. Only Discord, PostgreSQL password and Gemini
/// are required; Jira is optional and only produces a warning when incomplete.
#[derive(Clone, Debug)]
pub struct Config {
    pub discord: DiscordConfig,
    pub whatsapp: WhatsAppConfig,
    pub jira: JiraConfig,
    pub gemini: GeminiConfig,
    pub server: ServerConfig,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub token: String,
    pub guild_id: String,
}

/// Session store + bridge settings for the WhatsApp transport.
#[derive(Clone, Debug)]
pub struct WhatsAppConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub ssl_mode: String,
    pub log_level: String,
    pub bridge_path: String,
    pub bridge_args: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct JiraConfig {
    pub url: String,
    pub email: String,
    pub token: String,
    pub project_key: String,
}

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: String,
    pub log_level: String,
    pub environment: String,
}

impl Config {
    /// Read the config from the process environment. Run [`load_dotenv`] first
    /// to pick up `.env`.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key → value source, then validate.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let log_level = get("LOG_LEVEL", "INFO");

        let cfg = Self {
            discord: DiscordConfig {
                token: get("DISCORD_TOKEN", ""),
                guild_id: get("DISCORD_GUILD_ID", ""),
            },
            whatsapp: WhatsAppConfig {
                host: get("POSTGRES_HOST", "localhost"),
                port: get("POSTGRES_PORT", "5432").trim().parse().unwrap_or(5432),
                database: get("POSTGRES_DB", "lisa_whatsmeow"),
                user: get("POSTGRES_USER", "postgres"),
                password: get("POSTGRES_PASSWORD", ""),
                ssl_mode: get("POSTGRES_SSL", "disable"),
                log_level: log_level.clone(),
                bridge_path: get("WA_BRIDGE_PATH", "lisa-wa-bridge"),
                bridge_args: get("WA_BRIDGE_ARGS", "")
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
            },
            jira: JiraConfig {
                url: get("JIRA_URL", ""),
                email: get("JIRA_EMAIL", ""),
                token: get("JIRA_TOKEN", ""),
                project_key: get("JIRA_PROJECT_KEY", "SUPPORT"),
            },
            gemini: GeminiConfig {
                api_key: get("GEMINI_API_KEY", ""),
                model: get("GEMINI_MODEL", "gemini-pro"),
            },
            server: ServerConfig {
                port: get("PORT", "8080"),
                log_level,
                environment: get("ENVIRONMENT", "development"),
            },
        };

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.discord.token.is_empty() {
            missing.push("DISCORD_TOKEN".to_string());
        }
        if self.whatsapp.password.is_empty() {
            missing.push("POSTGRES_PASSWORD".to_string());
        }
        if self.gemini.api_key.is_empty() {
            missing.push("GEMINI_API_KEY".to_string());
        }

        if !self.jira_configured() {
            tracing::warn!("Jira configuration incomplete; ticket features will be unavailable");
        }

        if !missing.is_empty() {
            return Err(Error::MissingConfig(missing));
        }
        Ok(())
    }

    pub fn jira_configured(&self) -> bool {
        !self.jira.url.is_empty() && !self.jira.email.is_empty() && !self.jira.token.is_empty()
    }

    pub fn is_development(&self) -> bool {
        self.server.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.server.environment == "production"
    }

    pub fn server_address(&self) -> String {
        format!(":{}", self.server.port)
    }

    /// Connection string handed to the transport's device store.
    pub fn database_uri(&self) -> String {
        let wa = &self.whatsapp;
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            wa.user, wa.password, wa.host, wa.port, wa.database, wa.ssl_mode
        )
    }
}

/// Load `./.env` into the process environment. Existing variables win.
pub fn load_dotenv() -> Result<()> {
    load_dotenv_if_present(Path::new(".env"))
}

fn load_dotenv_if_present(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    dotenvy::from_path(path)
        .map_err(|e| Error::Config(format!("failed to load {}: {e}", path.display())))
}
