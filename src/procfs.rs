//! Access to the live process table.
//!
//! The engine only needs four things from it: the list of pids, a process's
//! command-line name, its uid, and a way to kill it. [`ProcessTable`] is the
//! seam; [`ProcFs`] reads a `/proc`-shaped directory.

use crate::hide_rule::NameMatch;
use crate::types::{ProcessId, UserId};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;

pub trait ProcessTable: Send + Sync {
    /// Pids currently present, in the order the table reports them.
    fn pids(&self) -> Vec<ProcessId>;

    /// Command-line name (argv[0]) of a process.
    fn name(&self, pid: ProcessId) -> Option<String>;

    /// Real uid a process runs as.
    fn uid(&self, pid: ProcessId) -> Option<UserId>;

    /// Deliver SIGKILL.
    fn kill(&self, pid: ProcessId) -> io::Result<()>;
}

/// Process table backed by a procfs mount.
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ProcessTable for ProcFs {
    fn pids(&self) -> Vec<ProcessId> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Failed to read {}: {}", self.root.display(), e);
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<i32>().ok())
            .filter(|pid| *pid > 0)
            .map(ProcessId::new)
            .collect()
    }

    fn name(&self, pid: ProcessId) -> Option<String> {
        let cmdline = fs::read(self.root.join(pid.to_string()).join("cmdline")).ok()?;
        let end = cmdline
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(cmdline.len());
        Some(String::from_utf8_lossy(&cmdline[..end]).into_owned())
    }

    fn uid(&self, pid: ProcessId) -> Option<UserId> {
        fs::metadata(self.root.join(pid.to_string()))
            .ok()
            .map(|meta| UserId::new(meta.uid()))
    }

    fn kill(&self, pid: ProcessId) -> io::Result<()> {
        signal::kill(Pid::from_raw(pid.as_i32()), Signal::SIGKILL).map_err(io::Error::from)
    }
}

/// Kill processes whose name matches `pattern` under `strategy`.
///
/// Stops after the first kill unless `multi` is set. Returns how many
/// processes were signalled.
pub fn kill_matching(
    table: &dyn ProcessTable,
    pattern: &str,
    strategy: NameMatch,
    multi: bool,
) -> usize {
    let mut killed = 0;
    for pid in table.pids() {
        let Some(name) = table.name(pid) else {
            continue;
        };
        if !strategy.matches(&name, pattern) {
            continue;
        }

        log::debug!("hide: kill PID=[{}] ({})", pid, name);
        match table.kill(pid) {
            Ok(()) => killed += 1,
            Err(e) => log::debug!("hide: failed to kill PID=[{}]: {}", pid, e),
        }
        if !multi {
            break;
        }
    }
    killed
}

#[cfg(test)]
pub mod fake {
    //! In-memory process table for tests.

    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeProcessTable {
        procs: Mutex<Vec<(ProcessId, UserId, String)>>,
        killed: Mutex<Vec<ProcessId>>,
    }

    impl FakeProcessTable {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn spawn(&self, pid: i32, uid: u32, name: &str) {
            self.procs.lock().unwrap().push((
                ProcessId::new(pid),
                UserId::new(uid),
                name.to_string(),
            ));
        }

        pub fn killed(&self) -> Vec<ProcessId> {
            self.killed.lock().unwrap().clone()
        }

        pub fn killed_names(&self) -> Vec<String> {
            let killed = self.killed.lock().unwrap();
            let procs = self.procs.lock().unwrap();
            killed
                .iter()
                .filter_map(|pid| procs.iter().find(|p| p.0 == *pid))
                .map(|p| p.2.clone())
                .collect()
        }
    }

    impl ProcessTable for FakeProcessTable {
        fn pids(&self) -> Vec<ProcessId> {
            let killed = self.killed.lock().unwrap();
            self.procs
                .lock()
                .unwrap()
                .iter()
                .map(|p| p.0)
                .filter(|pid| !killed.contains(pid))
                .collect()
        }

        fn name(&self, pid: ProcessId) -> Option<String> {
            let procs = self.procs.lock().unwrap();
            procs.iter().find(|p| p.0 == pid).map(|p| p.2.clone())
        }

        fn uid(&self, pid: ProcessId) -> Option<UserId> {
            let procs = self.procs.lock().unwrap();
            procs.iter().find(|p| p.0 == pid).map(|p| p.1)
        }

        fn kill(&self, pid: ProcessId) -> io::Result<()> {
            self.killed.lock().unwrap().push(pid);
            Ok(())
        }
    }
}
