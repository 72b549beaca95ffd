//! WhatsApp transport over a bridge sidecar.
//!
//! The sidecar owns the protocol, encryption, pairing and device store. We
//! spawn it, talk JSON lines on its stdio (see [`protocol`]) and push every
//! inbound event into the pipeline channel.

use std::{
    collections::{HashMap, VecDeque},
    path::PathBuf,
    process::Stdio,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, RwLock,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::{Child, ChildStdin, ChildStdout, Command},
    sync::{mpsc, oneshot, Mutex},
};

use lisa_core::{
    config::Config,
    domain::Jid,
    errors::Error,
    messaging::{
        port::{GroupLookup, SessionTransport},
        types::TransportEvent,
    },
    Result,
};

pub mod pairing;
pub mod protocol;

use protocol::{BridgeCommand, BridgeMessage, BridgeResponse};

const STDERR_TAIL_MAX_BYTES: usize = 16 * 1024;
const STDERR_TAIL_MAX_LINES: usize = 200;

#[derive(Clone, Debug)]
pub struct BridgeConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    /// Timeout for requests other than `connect` (which blocks through pairing).
    pub request_timeout: Duration,
    /// How long to wait for the sidecar to exit before killing it.
    pub shutdown_timeout: Duration,
}

impl BridgeConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            request_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(5),
        }
    }

    /// The sidecar gets the device store location and log level through its environment.
    pub fn from_config(cfg: &Config) -> Self {
        let mut out = Self::new(&cfg.whatsapp.bridge_path);
        out.args = cfg.whatsapp.bridge_args.clone();
        out.env = vec![
            ("WA_DATABASE_URI".to_string(), cfg.database_uri()),
            ("WA_LOG_LEVEL".to_string(), cfg.whatsapp.log_level.clone()),
        ];
        out
    }
}

#[derive(Clone, Debug, Default)]
struct StderrTail {
    lines: VecDeque<String>,
    bytes: usize,
}

impl StderrTail {
    fn push_line(&mut self, line: String) {
        self.bytes = self.bytes.saturating_add(line.len() + 1);
        self.lines.push_back(line);

        while self.lines.len() > STDERR_TAIL_MAX_LINES || self.bytes > STDERR_TAIL_MAX_BYTES {
            match self.lines.pop_front() {
                Some(front) => self.bytes = self.bytes.saturating_sub(front.len() + 1),
                None => break,
            }
        }
    }

    fn snapshot(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

#[derive(Clone)]
pub struct BridgeTransport {
    inner: Arc<Inner>,
}

struct Inner {
    cfg: BridgeConfig,
    events: mpsc::Sender<TransportEvent>,
    child: Mutex<Option<Child>>,
    stdin: Mutex<Option<ChildStdin>>,
    pending: Mutex<HashMap<u64, oneshot::Sender<BridgeResponse>>>,
    next_id: AtomicU64,
    alive: AtomicBool,
    connected: AtomicBool,
    closing: AtomicBool,
    device: RwLock<Option<Jid>>,
    stderr_tail: Mutex<StderrTail>,
}

impl BridgeTransport {
    pub fn new(cfg: BridgeConfig, events: mpsc::Sender<TransportEvent>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cfg,
                events,
                child: Mutex::new(None),
                stdin: Mutex::new(None),
                pending: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                alive: AtomicBool::new(false),
                connected: AtomicBool::new(false),
                closing: AtomicBool::new(false),
                device: RwLock::new(None),
                stderr_tail: Mutex::new(StderrTail::default()),
            }),
        }
    }

    async fn spawn_bridge(&self) -> Result<()> {
        let mut child_slot = self.inner.child.lock().await;
        if child_slot.is_some() {
            return Ok(());
        }

        let cfg = &self.inner.cfg;
        let mut cmd = Command::new(&cfg.program);
        cmd.args(&cfg.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (k, v) in &cfg.env {
            cmd.env(k, v);
        }

        let mut child = cmd.spawn().map_err(|e| {
            Error::Connect(format!(
                "failed to start bridge {}: {e}",
                cfg.program.display()
            ))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Connect("bridge stdout was not captured".to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Connect("bridge stdin was not captured".to_string()))?;

        // Drain stderr in background to avoid blocking on a full pipe.
        if let Some(stderr) = child.stderr.take() {
            let inner = self.inner.clone();
            tokio::spawn(async move {
                let mut r = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = r.next_line().await {
                    tracing::debug!("wa-bridge: {line}");
                    inner.stderr_tail.lock().await.push_line(line);
                }
            });
        }

        // The reader never waits on the pipeline channel, so responses keep
        // flowing while the pipeline is blocked on a request.
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        tokio::spawn(forward_loop(queue_rx, self.inner.events.clone()));

        self.inner.alive.store(true, Ordering::SeqCst);
        tokio::spawn(read_loop(self.inner.clone(), stdout, queue_tx));

        *self.inner.stdin.lock().await = Some(stdin);
        *child_slot = Some(child);
        tracing::debug!(program = %cfg.program.display(), "bridge started");
        Ok(())
    }

    async fn send(&self, cmd: &BridgeCommand) -> Result<()> {
        let line = protocol::encode_command(cmd)?;
        let mut guard = self.inner.stdin.lock().await;
        let stdin = guard
            .as_mut()
            .ok_or_else(|| Error::Transport("bridge is not running".to_string()))?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn request(
        &self,
        make: impl FnOnce(u64) -> BridgeCommand,
        timeout: Option<Duration>,
    ) -> Result<BridgeResponse> {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().await.insert(id, tx);

        // Checked after registering: the reader clears `pending` only after dropping `alive`.
        if !self.inner.alive.load(Ordering::SeqCst) {
            self.inner.pending.lock().await.remove(&id);
            return Err(Error::Transport("bridge is not running".to_string()));
        }

        if let Err(e) = self.send(&make(id)).await {
            self.inner.pending.lock().await.remove(&id);
            return Err(e);
        }

        let resp = match timeout {
            Some(t) => match tokio::time::timeout(t, rx).await {
                Ok(r) => r,
                Err(_) => {
                    self.inner.pending.lock().await.remove(&id);
                    return Err(Error::Transport(format!(
                        "bridge did not answer request {id} within {}s",
                        t.as_secs()
                    )));
                }
            },
            None => rx.await,
        };

        resp.map_err(|_| Error::Transport("bridge exited before responding".to_string()))
    }

    async fn stderr_snapshot(&self) -> String {
        self.inner.stderr_tail.lock().await.snapshot()
    }
}

#[async_trait]
impl GroupLookup for BridgeTransport {
    async fn group_name(&self, group: &Jid) -> Result<String> {
        let jid = group.clone();
        let resp = self
            .request(
                |id| BridgeCommand::GroupInfo { id, jid },
                Some(self.inner.cfg.request_timeout),
            )
            .await
            .map_err(|e| Error::GroupLookup(e.to_string()))?;

        if !resp.ok {
            return Err(Error::GroupLookup(resp.error_text()));
        }
        Ok(resp.name.unwrap_or_default())
    }
}

#[async_trait]
impl SessionTransport for BridgeTransport {
    async fn connect(&self) -> Result<()> {
        self.spawn_bridge().await?;

        let resp = match self.request(|id| BridgeCommand::Connect { id }, None).await {
            Ok(r) => r,
            Err(e) => {
                let mut msg = e.to_string();
                let stderr = self.stderr_snapshot().await;
                if !stderr.trim().is_empty() {
                    msg.push_str("\nstderr (tail):\n");
                    msg.push_str(&stderr);
                }
                return Err(Error::Connect(msg));
            }
        };

        if !resp.ok {
            return Err(Error::Connect(resp.error_text()));
        }

        if let Some(jid) = resp.jid {
            tracing::info!("WA: session ready as {jid}");
            if let Ok(mut device) = self.inner.device.write() {
                *device = Some(jid);
            }
        }
        self.inner.connected.store(true, Ordering::SeqCst);
        // The bridge may have exited right after answering.
        if !self.inner.alive.load(Ordering::SeqCst) {
            self.inner.connected.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn disconnect(&self) {
        self.inner.closing.store(true, Ordering::SeqCst);
        self.inner.connected.store(false, Ordering::SeqCst);

        let child = self.inner.child.lock().await.take();
        let Some(mut child) = child else {
            tracing::debug!("bridge not running; nothing to disconnect");
            return;
        };

        if let Err(e) = self.send(&BridgeCommand::Disconnect).await {
            tracing::debug!("could not send disconnect to bridge: {e}");
        }
        // Closing stdin lets a well-behaved bridge see EOF and exit.
        self.inner.stdin.lock().await.take();

        match tokio::time::timeout(self.inner.cfg.shutdown_timeout, child.wait()).await {
            Ok(Ok(status)) => tracing::debug!(%status, "bridge exited"),
            Ok(Err(e)) => tracing::warn!("error waiting for bridge: {e}"),
            Err(_) => {
                tracing::warn!("bridge did not exit in time, killing");
                if let Err(e) = child.kill().await {
                    tracing::warn!("failed to kill bridge: {e}");
                }
            }
        }

        tracing::info!("WA: client disconnected");
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    fn device_jid(&self) -> Option<Jid> {
        self.inner.device.read().ok().and_then(|d| d.clone())
    }
}

async fn read_loop(
    inner: Arc<Inner>,
    stdout: ChildStdout,
    queue: mpsc::UnboundedSender<TransportEvent>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if !line.trim().is_empty() {
                    route(&inner, &queue, &line).await;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("bridge stdout read failed: {e}");
                break;
            }
        }
    }

    inner.alive.store(false, Ordering::SeqCst);
    inner.connected.store(false, Ordering::SeqCst);
    // Dropping the senders wakes every waiter with an error.
    inner.pending.lock().await.clear();

    if inner.closing.load(Ordering::SeqCst) {
        return;
    }
    tracing::warn!("WA: bridge process exited");
    forward(&queue, TransportEvent::Disconnected);
}

async fn route(inner: &Inner, queue: &mpsc::UnboundedSender<TransportEvent>, line: &str) {
    let msg = match protocol::parse_line(line) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(
                "ignoring unparsable bridge line: {e}: {}",
                truncate_text(line, 200)
            );
            return;
        }
    };

    match msg {
        BridgeMessage::Response(resp) => {
            let waiter = inner.pending.lock().await.remove(&resp.id);
            match waiter {
                Some(tx) => {
                    let _ = tx.send(resp);
                }
                None => tracing::debug!(id = resp.id, "response for unknown request"),
            }
        }
        BridgeMessage::Qr { code } => pairing::display_pairing_code(&code),
        BridgeMessage::PairSuccess => tracing::info!("WA: pairing code scanned successfully"),
        BridgeMessage::Connected => {
            inner.connected.store(true, Ordering::SeqCst);
            forward(queue, TransportEvent::Connected);
        }
        BridgeMessage::Disconnected => {
            inner.connected.store(false, Ordering::SeqCst);
            forward(queue, TransportEvent::Disconnected);
        }
        BridgeMessage::LoggedOut => {
            inner.connected.store(false, Ordering::SeqCst);
            forward(queue, TransportEvent::LoggedOut);
        }
        BridgeMessage::Receipt { message_ids } => {
            forward(queue, TransportEvent::Receipt { message_ids });
        }
        BridgeMessage::Message(ev) => forward(queue, TransportEvent::Message(ev)),
        BridgeMessage::Unknown => tracing::debug!("ignoring unknown bridge event"),
    }
}

fn forward(queue: &mpsc::UnboundedSender<TransportEvent>, ev: TransportEvent) {
    if queue.send(ev).is_err() {
        tracing::debug!("event forwarder stopped; discarding transport event");
    }
}

/// Moves events from the reader's queue into the pipeline channel, in order.
async fn forward_loop(
    mut queue: mpsc::UnboundedReceiver<TransportEvent>,
    events: mpsc::Sender<TransportEvent>,
) {
    while let Some(ev) = queue.recv().await {
        if events.send(ev).await.is_err() {
            tracing::debug!("event receiver dropped; discarding transport events");
            return;
        }
    }
}

fn truncate_text(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}
