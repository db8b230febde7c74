//! Polling process monitor.
//!
//! Runs on its own thread for as long as hiding is enabled. Every interval
//! it walks the process table and asks the engine about each process it has
//! not judged yet (or whose name changed since, as apps rename themselves
//! after forking from zygote). Matches are handed to the [`HidePolicy`].

use crate::policy::HidePolicy;
use crate::procfs::ProcessTable;
use crate::types::{ProcessId, UserId};
use std::collections::HashMap;
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Receiver, Sender};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Messages observed by the monitor at its wait point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorSignal {
    /// Leave the loop
    Terminate,
    /// Re-apply late property policy and re-judge every live process
    Refresh,
}

/// What the monitor needs from the engine.
pub trait TargetResolver: Send + Sync {
    fn is_hide_target(&self, uid: UserId, process: &str) -> bool;
}

pub struct MonitorHandle {
    signals: Sender<MonitorSignal>,
    thread: JoinHandle<()>,
}

impl MonitorHandle {
    /// Best effort: a monitor that already exited simply ignores it.
    pub fn signal(&self, signal: MonitorSignal) {
        if self.signals.send(signal).is_err() {
            log::debug!("hide: monitor already stopped, dropping {:?}", signal);
        }
    }

    /// Wait for the thread to finish. Send [`MonitorSignal::Terminate`] first.
    pub fn join(self) {
        if self.thread.join().is_err() {
            log::error!("hide: monitor thread panicked");
        }
    }
}

struct Monitor {
    resolver: Weak<dyn TargetResolver>,
    procs: Arc<dyn ProcessTable>,
    policy: Arc<dyn HidePolicy>,
    signals: Receiver<MonitorSignal>,
    interval: Duration,
    judged: HashMap<ProcessId, String>,
}

/// Start the monitor thread.
///
/// The monitor holds the engine weakly so a dropped engine ends the loop
/// even if nobody sent `Terminate`.
pub fn spawn(
    resolver: Weak<dyn TargetResolver>,
    procs: Arc<dyn ProcessTable>,
    policy: Arc<dyn HidePolicy>,
    interval: Duration,
) -> io::Result<MonitorHandle> {
    let (tx, rx) = mpsc::channel();
    let monitor = Monitor {
        resolver,
        procs,
        policy,
        signals: rx,
        interval,
        judged: HashMap::new(),
    };

    let thread = thread::Builder::new()
        .name("hide_monitor".to_string())
        .spawn(move || monitor.run())?;

    Ok(MonitorHandle {
        signals: tx,
        thread,
    })
}

impl Monitor {
    fn run(mut self) {
        log::info!("hide: monitor started");
        loop {
            match self.signals.recv_timeout(self.interval) {
                Ok(MonitorSignal::Terminate) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(MonitorSignal::Refresh) => {
                    log::debug!("hide: monitor refresh");
                    self.policy.hide_late_sensitive_props();
                    self.judged.clear();
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            let Some(resolver) = self.resolver.upgrade() else {
                break;
            };
            self.scan(resolver.as_ref());
        }
        log::info!("hide: monitor stopped");
    }

    fn scan(&mut self, resolver: &dyn TargetResolver) {
        let live = self.procs.pids();
        self.judged.retain(|pid, _| live.contains(pid));

        for pid in live {
            let Some(name) = self.procs.name(pid) else {
                continue;
            };
            if name.is_empty() || self.judged.get(&pid) == Some(&name) {
                continue;
            }
            let Some(uid) = self.procs.uid(pid) else {
                continue;
            };

            if resolver.is_hide_target(uid, &name) {
                self.policy.hide_process(pid, uid, &name);
            }
            self.judged.insert(pid, name);
        }
    }
}
