//! Unix domain socket server for the on/off toggle
//!
//! Clients (a toolbar button, a key binding script) flip the variometer
//! on and off and query what it is doing. The server is the only writer of
//! the toggle; the feedback loop only reads it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, error, info, warn};

use crate::state::Mode;

use super::protocol::{Request, Response, VarioStatus};

/// Largest accepted message body
const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    state: Arc<RwLock<ServerState>>,
    enabled_tx: Arc<watch::Sender<bool>>,
    shutdown_tx: broadcast::Sender<()>,
}

/// Shared server state
struct ServerState {
    start_time: std::time::Instant,
    /// Last mode reported by the feedback loop
    mode: Mode,
}

impl Server {
    /// Create a new IPC server that owns the enable toggle
    pub fn new(socket_path: &Path, enabled_tx: watch::Sender<bool>) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path)
            .context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            start_time: std::time::Instant::now(),
            mode: Mode::Idle,
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            state,
            enabled_tx: Arc::new(enabled_tx),
            shutdown_tx,
        })
    }

    /// Update the feedback mode reported to clients
    pub async fn set_mode(&self, mode: Mode) {
        let mut state = self.state.write().await;
        if state.mode != mode {
            debug!(from = %state.mode, to = %mode, "IPC server: mode updated");
        }
        state.mode = mode;
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref()
            .context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let state = Arc::clone(&self.state);
                    let enabled_tx = Arc::clone(&self.enabled_tx);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, state, enabled_tx) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(
        mut stream: UnixStream,
        state: Arc<RwLock<ServerState>>,
        enabled_tx: Arc<watch::Sender<bool>>,
    ) -> Result<()> {
        loop {
            let Some(msg_buf) = read_frame(&mut stream).await? else {
                debug!("client disconnected");
                return Ok(());
            };

            let response = match serde_json::from_slice::<Request>(&msg_buf) {
                Ok(request) => {
                    debug!(?request, "received request");
                    Self::process_request(request, &state, &enabled_tx).await
                }
                Err(e) => {
                    warn!(error = %e, "malformed request");
                    Response::Error {
                        code: "bad_request".to_string(),
                        message: e.to_string(),
                    }
                }
            };

            send_message(&mut stream, &response).await?;
        }
    }

    /// Process a request and return a response
    async fn process_request(
        request: Request,
        state: &RwLock<ServerState>,
        enabled_tx: &watch::Sender<bool>,
    ) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => {
                let state = state.read().await;
                Response::Status(VarioStatus {
                    enabled: *enabled_tx.borrow(),
                    mode: state.mode,
                    uptime_secs: state.start_time.elapsed().as_secs(),
                    ..VarioStatus::default()
                })
            }

            Request::Toggle => {
                enabled_tx.send_modify(|enabled| *enabled = !*enabled);
                Self::announce(*enabled_tx.borrow())
            }

            Request::SetEnabled { enabled } => {
                enabled_tx.send_replace(enabled);
                Self::announce(enabled)
            }
        }
    }

    fn announce(enabled: bool) -> Response {
        info!("Variometer: {}", if enabled { "ON" } else { "OFF" });
        Response::Enabled { enabled }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Read one length-prefixed message body, `None` on clean disconnect
async fn read_frame<R: AsyncRead + Unpin>(stream: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_LEN {
        warn!(len, "message too large, disconnecting");
        return Ok(None);
    }

    let mut msg_buf = vec![0u8; len];
    stream.read_exact(&mut msg_buf).await?;
    Ok(Some(msg_buf))
}

/// Send a length-prefixed JSON message
async fn send_message<W, T>(stream: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    stream.write_all(&msg_len).await?;
    stream.write_all(&msg_bytes).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> RwLock<ServerState> {
        RwLock::new(ServerState {
            start_time: std::time::Instant::now(),
            mode: Mode::Sink,
        })
    }

    #[test]
    fn test_toggle_flips_enabled() {
        let state = test_state();
        let (tx, rx) = watch::channel(false);

        let resp = tokio_test::block_on(Server::process_request(Request::Toggle, &state, &tx));
        assert!(matches!(resp, Response::Enabled { enabled: true }));
        assert!(*rx.borrow());

        let resp = tokio_test::block_on(Server::process_request(Request::Toggle, &state, &tx));
        assert!(matches!(resp, Response::Enabled { enabled: false }));
        assert!(!*rx.borrow());
    }

    #[test]
    fn test_status_reports_mode() {
        let state = test_state();
        let (tx, _rx) = watch::channel(true);

        let resp = tokio_test::block_on(Server::process_request(Request::GetStatus, &state, &tx));
        match resp {
            Response::Status(status) => {
                assert!(status.enabled);
                assert_eq!(status.mode, Mode::Sink);
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_set_enabled_over_socket() {
        let path = std::env::temp_dir().join(format!("variometer-ipc-{}.sock", std::process::id()));
        let (tx, rx) = watch::channel(false);
        let server = Arc::new(Server::new(&path, tx).unwrap());

        let runner = Arc::clone(&server);
        let handle = tokio::spawn(async move { runner.run().await });

        let mut stream = UnixStream::connect(&path).await.unwrap();
        send_message(&mut stream, &Request::SetEnabled { enabled: true }).await.unwrap();
        let body = read_frame(&mut stream).await.unwrap().unwrap();
        let resp: Response = serde_json::from_slice(&body).unwrap();
        assert!(matches!(resp, Response::Enabled { enabled: true }));
        assert!(*rx.borrow());

        // Garbage gets an error response, not a dropped connection
        stream.write_all(&3u32.to_le_bytes()).await.unwrap();
        stream.write_all(b"{{{").await.unwrap();
        let body = read_frame(&mut stream).await.unwrap().unwrap();
        let resp: Response = serde_json::from_slice(&body).unwrap();
        assert!(matches!(resp, Response::Error { .. }));

        handle.abort();
        server.shutdown().await;
        assert!(!path.exists());
    }
}
