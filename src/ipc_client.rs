//! IPC client for communication with the hidelist daemon
//!
//! Blocking counterpart of the control server, used by the CLI subcommands.
//! Each call opens one connection and sends one request.

use crate::hide_rule::HideRule;
use crate::protocol::{self, RequestCode, Status};
use anyhow::{Context, Result};
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Client for communicating with the hidelist daemon
pub struct IpcClient {
    socket_path: PathBuf,
}

impl IpcClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn enable(&self, late_props: bool) -> Result<Status> {
        let mut request = Self::request(RequestCode::Enable)?;
        protocol::write_bool_sync(&mut request, late_props)?;
        let mut stream = self.send(&request)?;
        read_status(&mut stream)
    }

    pub fn disable(&self) -> Result<Status> {
        let mut stream = self.send(&Self::request(RequestCode::Disable)?)?;
        read_status(&mut stream)
    }

    pub fn add(&self, package: &str, process: &str) -> Result<Status> {
        self.rule_request(RequestCode::AddList, package, process)
    }

    pub fn remove(&self, package: &str, process: &str) -> Result<Status> {
        self.rule_request(RequestCode::RmList, package, process)
    }

    /// Hide list as reported by the daemon. Rules are only present on success.
    pub fn list(&self) -> Result<(Status, Vec<HideRule>)> {
        let mut stream = self.send(&Self::request(RequestCode::LsList)?)?;
        let status = read_status(&mut stream)?;
        if status != Status::Success {
            return Ok((status, Vec::new()));
        }

        let mut rules = Vec::new();
        loop {
            let record = protocol::read_string_sync(&mut stream)
                .context("Failed to read hide list record")?;
            if record.is_empty() {
                break;
            }
            let rule = HideRule::from_record(&record)
                .with_context(|| format!("Malformed hide list record: {}", record))?;
            rules.push(rule);
        }
        Ok((status, rules))
    }

    pub fn status(&self) -> Result<Status> {
        let mut stream = self.send(&Self::request(RequestCode::Status)?)?;
        read_status(&mut stream)
    }

    fn rule_request(&self, code: RequestCode, package: &str, process: &str) -> Result<Status> {
        let mut request = Self::request(code)?;
        protocol::write_string_sync(&mut request, package)?;
        protocol::write_string_sync(&mut request, process)?;
        let mut stream = self.send(&request)?;
        read_status(&mut stream)
    }

    fn request(code: RequestCode) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        protocol::write_i32_sync(&mut buf, code as i32)?;
        Ok(buf)
    }

    /// Connect and write the whole request in one go.
    fn send(&self, request: &[u8]) -> Result<UnixStream> {
        if !self.socket_path.exists() {
            return Err(anyhow::anyhow!(
                "hidelist daemon not running (socket {} not found)",
                self.socket_path.display()
            ));
        }

        let mut stream = UnixStream::connect(&self.socket_path)
            .context("Failed to connect to hidelist daemon")?;
        stream.set_read_timeout(Some(TIMEOUT))?;
        stream.set_write_timeout(Some(TIMEOUT))?;

        stream
            .write_all(request)
            .context("Failed to send request")?;
        stream.flush()?;
        Ok(stream)
    }
}

fn read_status(stream: &mut UnixStream) -> Result<Status> {
    let code = protocol::read_i32_sync(stream).context("Failed to read daemon reply")?;
    Status::try_from(code).map_err(|code| anyhow::anyhow!("Unknown status code {}", code))
}
