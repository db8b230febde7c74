//! Hiding actions the engine triggers but does not implement.
//!
//! Concealing mounts inside a matched process's namespace and rewriting
//! sensitive system properties live outside this crate. The engine drives
//! them through [`HidePolicy`].

use crate::types::{ProcessId, UserId};

pub trait HidePolicy: Send + Sync {
    /// Applied once when hiding is enabled.
    fn hide_sensitive_props(&self);

    /// Properties only settable after boot completes.
    fn hide_late_sensitive_props(&self);

    /// Called by the monitor for every process that matched the hide list.
    fn hide_process(&self, pid: ProcessId, uid: UserId, name: &str);
}

/// Policy that only records what would be hidden.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPolicy;

impl HidePolicy for LoggingPolicy {
    fn hide_sensitive_props(&self) {
        log::info!("hide: applying sensitive property policy");
    }

    fn hide_late_sensitive_props(&self) {
        log::info!("hide: applying late sensitive property policy");
    }

    fn hide_process(&self, pid: ProcessId, uid: UserId, name: &str) {
        log::info!("hide: target PID=[{}] UID=[{}] ({})", pid, uid, name);
    }
}

#[cfg(test)]
pub mod recording {
    //! Policy that remembers every call, for tests.

    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingPolicy {
        pub props: Mutex<usize>,
        pub late_props: Mutex<usize>,
        pub hidden: Mutex<Vec<(ProcessId, String)>>,
    }

    impl RecordingPolicy {
        pub fn late_props_count(&self) -> usize {
            *self.late_props.lock().unwrap()
        }

        pub fn hidden_names(&self) -> Vec<String> {
            self.hidden
                .lock()
                .unwrap()
                .iter()
                .map(|(_, name)| name.clone())
                .collect()
        }
    }

    impl HidePolicy for RecordingPolicy {
        fn hide_sensitive_props(&self) {
            *self.props.lock().unwrap() += 1;
        }

        fn hide_late_sensitive_props(&self) {
            *self.late_props.lock().unwrap() += 1;
        }

        fn hide_process(&self, pid: ProcessId, _uid: UserId, name: &str) {
            self.hidden.lock().unwrap().push((pid, name.to_string()));
        }
    }
}
