use std::{sync::Arc, time::Duration};

use lisa_bridge::{BridgeConfig, BridgeTransport};

use lisa_core::{
    config::{self, Config},
    dispatch::{Dispatcher, TracingSink},
    media::NormalizedMessage,
    messaging::{port::SessionTransport, types::IncomingEvent},
    pipeline::{Pipeline, EVENT_BUFFER},
    status::{StatusMonitor, STATUS_INTERVAL},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    print_banner();

    config::load_dotenv()?;
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_default();
    lisa_core::logging::init("lisa", &log_level)?;

    let cfg = Config::load().map_err(|e| startup_failure("configuration", e))?;
    log_config_status(&cfg);

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let transport = Arc::new(BridgeTransport::new(BridgeConfig::from_config(&cfg), tx));

    tracing::info!("connecting to WhatsApp...");
    let connected = tokio::select! {
        res = transport.connect() => res,
        _ = shutdown_signal() => {
            tracing::info!("shutdown requested before the WhatsApp session came up");
            transport.disconnect().await;
            return Ok(());
        }
    };
    if let Err(e) = connected {
        transport.disconnect().await;
        return Err(startup_failure("WhatsApp connect", e));
    }
    if let Some(jid) = transport.device_jid() {
        tracing::info!("WhatsApp device: {jid}");
    }

    let dispatcher = Dispatcher::new(Arc::new(TracingSink::messages()))
        .with_handler(Arc::new(|event: &IncomingEvent| {
            if !tracing::enabled!(tracing::Level::DEBUG) {
                return;
            }
            match serde_json::to_string(&NormalizedMessage::new(event, None)) {
                Ok(json) => tracing::debug!("WA: normalized {json}"),
                Err(e) => tracing::debug!("WA: failed to serialize message record: {e}"),
            }
        }));

    let cancel = CancellationToken::new();
    let pipeline = Pipeline::new(dispatcher, transport.clone());
    let pipeline_task = tokio::spawn(pipeline.run(rx, cancel.clone()));
    let status_task = StatusMonitor::spawn(
        transport.clone(),
        STATUS_INTERVAL,
        Arc::new(TracingSink::with_prefix("")),
        cancel.clone(),
    );

    tracing::info!("Lisa bot is running. Press Ctrl+C to stop.");
    shutdown_signal().await;

    tracing::info!("shutting down...");
    cancel.cancel();
    tokio::time::sleep(SHUTDOWN_GRACE).await;
    transport.disconnect().await;
    let _ = tokio::join!(pipeline_task, status_task);
    tracing::info!("Lisa bot stopped");

    Ok(())
}

fn print_banner() {
    println!("==============================================");
    println!("  Lisa Bot");
    println!("  Discord + WhatsApp + Jira + AI Assistant Bot");
    println!("==============================================");
}

fn startup_failure(stage: &str, e: lisa_core::Error) -> anyhow::Error {
    if e.is_startup_fatal() {
        tracing::error!("{stage} failed: {e}");
    } else {
        tracing::error!("{stage} failed unexpectedly: {e}");
    }
    e.into()
}

fn log_config_status(cfg: &Config) {
    let mode = if cfg.is_production() {
        "PRODUCTION"
    } else if cfg.is_development() {
        "DEVELOPMENT"
    } else {
        cfg.server.environment.as_str()
    };
    tracing::info!(
        "MODE: {mode} | ADDRESS: {} | LOG LEVEL: {}",
        cfg.server_address(),
        cfg.server.log_level
    );
    tracing::info!("Discord: configured");
    tracing::info!(
        "WhatsApp: PostgreSQL {}:{}/{}",
        cfg.whatsapp.host,
        cfg.whatsapp.port,
        cfg.whatsapp.database
    );
    if cfg.jira_configured() {
        tracing::info!("Jira: {} ({})", cfg.jira.url, cfg.jira.project_key);
    } else {
        tracing::info!("Jira: not configured (optional)");
    }
    tracing::info!("Gemini: {}", cfg.gemini.model);
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("SIGTERM handler unavailable: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
