//! Periodic connectivity report.

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::{dispatch::LogSink, messaging::port::SessionTransport};

pub const STATUS_INTERVAL: Duration = Duration::from_secs(30);

pub fn status_line(connected: bool) -> String {
    let state = if connected {
        "CONNECTED"
    } else {
        "DISCONNECTED"
    };
    format!("STATUS: Lisa Bot running - WhatsApp: {state}")
}

pub struct StatusMonitor;

impl StatusMonitor {
    /// Report `is_connected()` every `period`, first report after one period.
    pub fn spawn(
        transport: Arc<dyn SessionTransport>,
        period: Duration,
        sink: Arc<dyn LogSink>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("status monitor stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        sink.emit(&status_line(transport.is_connected()));
                    }
                }
            }
        })
    }
}
