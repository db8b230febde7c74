//! Control socket server.
//!
//! One request per connection, framed as described in [`crate::protocol`].
//! Peers are authenticated with `SO_PEERCRED` against the configured uid
//! allow list. Engine calls may scan directories and kill processes, so
//! they run on the blocking pool.

use crate::error::HideError;
use crate::hide::HideController;
use crate::protocol::{self, RequestCode, Status};
use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{UnixListener, UnixStream};

pub struct IpcServer {
    socket_path: PathBuf,
    allowed_uids: Vec<u32>,
    controller: HideController,
}

impl IpcServer {
    pub fn new(controller: HideController) -> Self {
        let config = controller.config();
        Self {
            socket_path: config.socket_path.clone(),
            allowed_uids: config.allowed_uids.clone(),
            controller,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Create the socket with mode 0660, replacing a stale one.
    pub fn bind(&self) -> Result<UnixListener> {
        if let Some(parent) = self.socket_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        // Ensure socket doesn't exist (prevent hijacking)
        if self.socket_path.exists() {
            fs::remove_file(&self.socket_path).with_context(|| {
                format!("Failed to remove stale socket {}", self.socket_path.display())
            })?;
        }

        // Narrow umask so the socket is never world-accessible, not even briefly
        let old_mask = unsafe { libc::umask(0o117) };
        let bound = UnixListener::bind(&self.socket_path);
        unsafe { libc::umask(old_mask) };
        let listener =
            bound.with_context(|| format!("Failed to bind {}", self.socket_path.display()))?;

        fs::set_permissions(&self.socket_path, fs::Permissions::from_mode(0o660))?;
        log::info!("Socket permissions set to 0660 (rw-rw----)");

        Ok(listener)
    }

    /// Accept connections until the listener fails.
    pub async fn serve(self: Arc<Self>, listener: UnixListener) -> Result<()> {
        log::info!("Control server listening on: {}", self.socket_path.display());

        loop {
            let (stream, _) = listener
                .accept()
                .await
                .context("Failed to accept control connection")?;
            let server = Arc::clone(&self);

            tokio::spawn(async move {
                if let Err(e) = server.handle_client(stream).await {
                    log::warn!("Client handler error: {:#}", e);
                }
            });
        }
    }

    /// Remove the socket file. Called on shutdown.
    pub fn remove_socket(&self) {
        if let Err(e) = fs::remove_file(&self.socket_path) {
            log::debug!(
                "Failed to remove socket {}: {}",
                self.socket_path.display(),
                e
            );
        }
    }

    async fn handle_client(&self, mut stream: UnixStream) -> Result<()> {
        let code = protocol::read_i32(&mut stream)
            .await
            .context("Failed to read request code")?;

        let cred = stream
            .peer_cred()
            .context("Failed to get peer credentials")?;
        if !self.allowed_uids.contains(&cred.uid()) {
            log::warn!(
                "Rejected control client uid {} (pid {:?})",
                cred.uid(),
                cred.pid()
            );
            protocol::write_i32(&mut stream, Status::RootRequired.as_i32()).await?;
            return Ok(());
        }

        let request = match RequestCode::try_from(code) {
            Ok(request) => request,
            Err(code) => {
                log::warn!("Unknown request code {} from uid {}", code, cred.uid());
                protocol::write_i32(&mut stream, Status::Error.as_i32()).await?;
                return Ok(());
            }
        };
        log::debug!("Control request {:?} from uid {}", request, cred.uid());

        match request {
            RequestCode::Enable => {
                let late_props = protocol::read_bool(&mut stream).await?;
                let result = self.run(move |c| c.enable(late_props)).await;
                reply(&mut stream, result).await?;
            }
            RequestCode::Disable => {
                let result = self.run(|c| c.disable()).await;
                reply(&mut stream, result).await?;
            }
            RequestCode::AddList => {
                let package = protocol::read_string(&mut stream).await?;
                let process = protocol::read_string(&mut stream).await?;
                let result = self.run(move |c| c.add(&package, &process)).await;
                reply(&mut stream, result).await?;
            }
            RequestCode::RmList => {
                let package = protocol::read_string(&mut stream).await?;
                let process = protocol::read_string(&mut stream).await?;
                let result = self.run(move |c| c.remove(&package, &process)).await;
                reply(&mut stream, result).await?;
            }
            RequestCode::LsList => match self.run(|c| c.list()).await {
                Ok(rules) => {
                    protocol::write_i32(&mut stream, Status::Success.as_i32()).await?;
                    for rule in rules {
                        let record = rule.to_record();
                        // Rows stored by older tools may not fit one wire string
                        if record.len() > protocol::MAX_STRING_LEN {
                            log::warn!("Skipping oversized hide list record [{}]", rule);
                            continue;
                        }
                        protocol::write_string(&mut stream, &record).await?;
                    }
                    protocol::write_i32(&mut stream, 0).await?;
                }
                Err(e) => reply(&mut stream, Err(e)).await?,
            },
            RequestCode::Status => {
                let status = if self.controller.is_enabled() {
                    Status::IsEnabled
                } else {
                    Status::NotEnabled
                };
                protocol::write_i32(&mut stream, status.as_i32()).await?;
            }
        }

        stream.flush().await?;
        Ok(())
    }

    async fn run<T, F>(&self, op: F) -> crate::error::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&HideController) -> crate::error::Result<T> + Send + 'static,
    {
        let controller = self.controller.clone();
        match tokio::task::spawn_blocking(move || op(&controller)).await {
            Ok(result) => result,
            Err(e) => Err(HideError::Operational(format!("request task failed: {}", e))),
        }
    }
}

async fn reply(stream: &mut UnixStream, result: crate::error::Result<()>) -> Result<()> {
    let status = match result {
        Ok(()) => Status::Success,
        Err(e) => {
            log::info!("Control request failed: {}", e);
            e.status()
        }
    };
    protocol::write_i32(stream, status.as_i32()).await?;
    Ok(())
}
