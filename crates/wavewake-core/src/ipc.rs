use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
    sync::oneshot,
};
use wavewake_storage::PreferenceKey;

use crate::event::{DaemonEvent, DisplayState, EventSender};
use crate::service::ServiceStatus;

/// IPC request from CLI to daemon
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpcRequest {
    Status,
    Shutdown,
    /// Display edge for hosts without a watchable backlight
    Display(DisplayState),
    /// A preference was written; the daemon re-reads it
    PreferenceChanged(PreferenceKey),
}

/// IPC response from daemon to CLI
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum IpcResponse {
    Status(ServiceStatus),
    Shutdown,
    Ack,
}

#[derive(Debug)]
pub struct IpcClient {
    sock_path: PathBuf,
}

impl IpcClient {
    #[must_use]
    pub fn new(sock_path: &Path) -> Self {
        Self {
            sock_path: sock_path.to_path_buf(),
        }
    }

    /// Send one request and wait for the reply
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon is unreachable or replies with garbage
    pub async fn send_command(&self, request: IpcRequest) -> Result<IpcResponse> {
        let mut stream = UnixStream::connect(&self.sock_path).await?;

        let encoded = bincode::serialize(&request)?;
        stream.write_all(&encoded).await?;
        stream.shutdown().await?;

        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer).await?;
        let response: IpcResponse = bincode::deserialize(&buffer)?;

        Ok(response)
    }
}

/// Translates IPC requests into daemon mailbox events
pub struct DaemonIpcHandler {
    events: EventSender,
}

impl DaemonIpcHandler {
    #[must_use]
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }

    /// Dispatch a request and produce its response
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon mailbox is closed
    pub async fn respond(&self, request: IpcRequest) -> Result<IpcResponse> {
        let response = match request {
            IpcRequest::Status => {
                let (tx, rx) = oneshot::channel();
                self.post(DaemonEvent::Status(tx))?;
                IpcResponse::Status(rx.await?)
            }
            IpcRequest::Shutdown => {
                self.post(DaemonEvent::Shutdown)?;
                IpcResponse::Shutdown
            }
            IpcRequest::Display(state) => {
                self.post(DaemonEvent::Display(state))?;
                IpcResponse::Ack
            }
            IpcRequest::PreferenceChanged(key) => {
                self.post(DaemonEvent::PreferenceChanged(key))?;
                IpcResponse::Ack
            }
        };
        Ok(response)
    }

    pub async fn handle(&self, stream: &mut UnixStream, request: IpcRequest) -> Result<()> {
        let response = self.respond(request).await?;
        let encoded = bincode::serialize(&response)?;
        stream.write_all(&encoded).await?;
        Ok(())
    }

    fn post(&self, event: DaemonEvent) -> Result<()> {
        self.events
            .send(event)
            .map_err(|_| anyhow!("Daemon is shutting down"))
    }
}

pub async fn listen(handler: Arc<DaemonIpcHandler>, sock_path: &Path) -> io::Result<()> {
    if sock_path.exists() {
        fs::remove_file(sock_path)?;
    }
    if let Some(parent) = sock_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let listener = UnixListener::bind(sock_path)?;

    loop {
        match listener.accept().await {
            Ok((mut stream, _)) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0; 1024];
                    match stream.read(&mut buf).await {
                        Ok(n) if n > 0 => match bincode::deserialize::<IpcRequest>(&buf[..n]) {
                            Ok(request) => {
                                if let Err(e) = handler.handle(&mut stream, request).await {
                                    log::error!("IPC handle error: {e}");
                                }
                            }
                            Err(e) => {
                                log::error!("IPC deserialize error: {e}");
                            }
                        },
                        Ok(_) => {} // Connection closed
                        Err(e) => {
                            log::error!("IPC read error: {e}");
                        }
                    }
                });
            }
            Err(e) => {
                log::error!("IPC accept error: {e}");
            }
        }
    }
}
