//! Hide-list engine: rule store plus enable/disable lifecycle.
//!
//! All in-memory state lives in one `Mutex<Option<HideData>>`. `Some` means
//! hiding is enabled. Every rule change rebuilds the uid projection inside
//! the same critical section, so a query issued after `add`/`remove` returns
//! always sees the change. Persistence writes happen after the lock is
//! released, except while disabled, where the database is the only store.

use crate::config::Config;
use crate::db::HideDb;
use crate::error::{ConflictKind, HideError, PreconditionKind, Result};
use crate::hide_rule::{HideRule, NameMatch, ZYGOTE_SUFFIX};
use crate::matcher;
use crate::monitor::{self, MonitorHandle, MonitorSignal, TargetResolver};
use crate::policy::HidePolicy;
use crate::procfs::{self, ProcessTable};
use crate::types::UserId;
use crate::uid_map::UidProjection;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// First SDK level with unspecialized app processes and app zygotes.
const USAP_SDK: u32 = 29;

struct HideData {
    rules: BTreeSet<HideRule>,
    uid_map: UidProjection,
    monitor: MonitorHandle,
}

struct Inner {
    config: Config,
    db: Arc<dyn HideDb>,
    procs: Arc<dyn ProcessTable>,
    policy: Arc<dyn HidePolicy>,
    data: Mutex<Option<HideData>>,
    // Readable without the lock, only written while holding it
    enabled: AtomicBool,
}

/// Shared handle to the engine. Clones refer to the same state.
#[derive(Clone)]
pub struct HideController {
    inner: Arc<Inner>,
}

impl HideController {
    pub fn new(
        config: Config,
        db: Arc<dyn HideDb>,
        procs: Arc<dyn ProcessTable>,
        policy: Arc<dyn HidePolicy>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                db,
                procs,
                policy,
                data: Mutex::new(None),
                enabled: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Turn hiding on.
    ///
    /// Loads the persisted rules (killing running matches), sweeps app
    /// zygotes on newer SDKs, applies property policy and starts the monitor.
    pub fn enable(&self, late_props: bool) -> Result<()> {
        let inner = &self.inner;
        if self.is_enabled() {
            return Err(PreconditionKind::AlreadyEnabled.into());
        }

        let ns_probe = inner.config.mnt_ns_path();
        if !ns_probe.exists() {
            log::warn!(
                "* Mount namespace not supported ({} missing)",
                ns_probe.display()
            );
            return Err(PreconditionKind::NoNamespaceSupport.into());
        }

        {
            let mut data = inner.lock_data();
            if data.is_some() {
                return Err(PreconditionKind::AlreadyEnabled.into());
            }

            log::info!("* Enable hiding");

            let mut rules = BTreeSet::new();
            for rule in inner.db.load_rules()? {
                inner.insert_and_kill(&mut rules, rule);
            }
            inner.initial_sweep();

            inner.policy.hide_sensitive_props();
            if late_props {
                inner.policy.hide_late_sensitive_props();
            }

            let weak: Weak<Inner> = Arc::downgrade(&self.inner);
            let resolver: Weak<dyn TargetResolver> = weak;
            let monitor = monitor::spawn(
                resolver,
                Arc::clone(&inner.procs),
                Arc::clone(&inner.policy),
                inner.config.monitor_interval(),
            )
            .map_err(|e| HideError::Operational(format!("cannot start monitor: {}", e)))?;

            let mut hide = HideData {
                rules,
                uid_map: UidProjection::new(),
                monitor,
            };
            hide.rebuild(&inner.config);
            *data = Some(hide);
            inner.enabled.store(true, Ordering::SeqCst);
        }

        inner.persist_enabled(true);
        Ok(())
    }

    /// Turn hiding off. Always succeeds, also when already disabled.
    pub fn disable(&self) -> Result<()> {
        self.teardown();
        self.inner.persist_enabled(false);
        Ok(())
    }

    /// Drop the in-memory engine but keep the persisted setting, so the next
    /// daemon start enables hiding again.
    pub fn shutdown(&self) {
        self.teardown();
    }

    fn teardown(&self) {
        let monitor = {
            let mut data = self.inner.lock_data();
            let monitor = data.take().map(|hide| {
                log::info!("* Disable hiding");
                hide.monitor.signal(MonitorSignal::Terminate);
                hide.monitor
            });
            self.inner.enabled.store(false, Ordering::SeqCst);
            monitor
        };

        // The monitor may be waiting for the lock, join only after releasing it
        if let Some(monitor) = monitor {
            monitor.join();
        }
    }

    /// Enable when the persisted setting asks for it, or refresh the monitor
    /// when already enabled.
    pub fn check_and_maybe_enable(&self, late_props: bool) -> Result<()> {
        if self.is_enabled() {
            let data = self.inner.lock_data();
            if let Some(hide) = data.as_ref() {
                hide.monitor.signal(MonitorSignal::Refresh);
            }
            return Ok(());
        }

        if !self.inner.db.hide_enabled()? {
            return Ok(());
        }
        match self.enable(late_props) {
            // Lost a race with another enable
            Err(HideError::Precondition(PreconditionKind::AlreadyEnabled)) => Ok(()),
            other => other,
        }
    }

    /// Add a rule. `process` defaults to `package` when empty.
    pub fn add(&self, package: &str, process: &str) -> Result<()> {
        let rule = HideRule::new(package, process);
        if !rule.is_valid() {
            return Err(HideError::invalid_input(package, process));
        }

        let inner = &self.inner;
        {
            let mut data = inner.lock_data();
            let Some(hide) = data.as_mut() else {
                // Database write under the lock on purpose: a concurrent
                // enable must not load the table before this row lands.
                inner.db.insert_rule(&rule)?;
                log::info!("hide_list add: [{}] (stored)", rule);
                return Ok(());
            };

            if hide.rules.contains(&rule) {
                return Err(ConflictKind::ItemExists.into());
            }
            inner.insert_and_kill(&mut hide.rules, rule.clone());
            hide.rebuild(&inner.config);
        }

        match inner.db.insert_rule(&rule) {
            // Row already there from an earlier failed removal
            Err(HideError::Conflict(ConflictKind::ItemExists)) => Ok(()),
            other => other,
        }
    }

    /// Remove one rule, or every rule of `package` when `process` is empty.
    pub fn remove(&self, package: &str, process: &str) -> Result<()> {
        let process = (!process.is_empty()).then_some(process);
        let inner = &self.inner;
        {
            let mut data = inner.lock_data();
            let Some(hide) = data.as_mut() else {
                // Same exception as in `add`, the database is the only store
                return match inner.db.delete_rules(package, process)? {
                    0 => Err(ConflictKind::ItemNotFound.into()),
                    removed => {
                        log::info!("hide_list rm: [{}] ({} stored rules)", package, removed);
                        Ok(())
                    }
                };
            };

            let before = hide.rules.len();
            hide.rules.retain(|rule| {
                let hit = rule.package == package && process.map_or(true, |p| rule.process == p);
                if hit {
                    log::info!("hide_list rm: [{}]", rule);
                }
                !hit
            });
            if hide.rules.len() == before {
                return Err(ConflictKind::ItemNotFound.into());
            }
            hide.rebuild(&inner.config);
        }

        inner.db.delete_rules(package, process)?;
        Ok(())
    }

    /// Snapshot of the hide list, sorted.
    pub fn list(&self) -> Result<Vec<HideRule>> {
        let data = self.inner.lock_data();
        match data.as_ref() {
            Some(hide) => Ok(hide.rules.iter().cloned().collect()),
            None => {
                // Read under the lock so it cannot interleave with enable
                let mut rules = self.inner.db.load_rules()?;
                rules.sort();
                Ok(rules)
            }
        }
    }

    /// Whether `process` running as `uid` must be hidden, using the
    /// configured length guard.
    pub fn is_hide_target(&self, uid: UserId, process: &str) -> bool {
        self.inner.is_hide_target(uid, process)
    }

    pub fn is_hide_target_with_len(&self, uid: UserId, process: &str, min_len: usize) -> bool {
        self.inner.is_hide_target_with_len(uid, process, min_len)
    }
}

impl Inner {
    fn lock_data(&self) -> MutexGuard<'_, Option<HideData>> {
        self.data.lock().unwrap_or_else(|e: PoisonError<_>| {
            log::warn!("Hide data lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn insert_and_kill(&self, rules: &mut BTreeSet<HideRule>, rule: HideRule) {
        let (strategy, multi) = rule.kill_strategy();
        procfs::kill_matching(self.procs.as_ref(), &rule.process, strategy, multi);
        log::info!("hide_list add: [{}]", rule);
        rules.insert(rule);
    }

    fn initial_sweep(&self) {
        match self.config.sdk_int() {
            Some(sdk) if sdk >= USAP_SDK => {
                let procs = self.procs.as_ref();
                procfs::kill_matching(procs, "usap32", NameMatch::Exact, true);
                procfs::kill_matching(procs, "usap64", NameMatch::Exact, true);
                procfs::kill_matching(procs, ZYGOTE_SUFFIX, NameMatch::SuffixExceptWebview, true);
            }
            Some(_) => {}
            None => log::debug!("hide: SDK level unknown, skipping zygote sweep"),
        }
    }

    fn persist_enabled(&self, enabled: bool) {
        if let Err(e) = self.db.set_hide_enabled(enabled) {
            log::error!("Failed to persist hide setting: {}", e);
        }
    }

    fn is_hide_target_with_len(&self, uid: UserId, process: &str, min_len: usize) -> bool {
        if !self.enabled.load(Ordering::SeqCst) {
            return false;
        }
        let data = self.lock_data();
        match data.as_ref() {
            Some(hide) => matcher::is_hide_target(&hide.uid_map, uid, process, min_len),
            None => false,
        }
    }
}

impl TargetResolver for Inner {
    fn is_hide_target(&self, uid: UserId, process: &str) -> bool {
        self.is_hide_target_with_len(uid, process, self.config.min_len)
    }
}

impl HideData {
    fn rebuild(&mut self, config: &Config) {
        self.uid_map.rebuild(&self.rules, &config.app_data_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use crate::hide_rule::{ISOLATED_MAGIC, WEBVIEW_ZYGOTE};
    use crate::policy::recording::RecordingPolicy;
    use crate::procfs::fake::FakeProcessTable;
    use crate::protocol::Status;
    use std::fs;
    use std::os::unix::fs::MetadataExt;
    use tempfile::TempDir;

    const ISOLATED_UID: UserId = UserId(99_001);

    /// In-memory store whose writes can be switched to fail.
    #[derive(Default)]
    struct FailingDb {
        store: MemoryDb,
        fail_rules: AtomicBool,
        fail_settings: AtomicBool,
    }

    fn write_error() -> HideError {
        HideError::Persistence(rusqlite::Error::InvalidQuery)
    }

    impl HideDb for FailingDb {
        fn load_rules(&self) -> Result<Vec<HideRule>> {
            self.store.load_rules()
        }

        fn insert_rule(&self, rule: &HideRule) -> Result<()> {
            if self.fail_rules.load(Ordering::SeqCst) {
                return Err(write_error());
            }
            self.store.insert_rule(rule)
        }

        fn delete_rules(&self, package: &str, process: Option<&str>) -> Result<usize> {
            if self.fail_rules.load(Ordering::SeqCst) {
                return Err(write_error());
            }
            self.store.delete_rules(package, process)
        }

        fn hide_enabled(&self) -> Result<bool> {
            self.store.hide_enabled()
        }

        fn set_hide_enabled(&self, enabled: bool) -> Result<()> {
            if self.fail_settings.load(Ordering::SeqCst) {
                return Err(write_error());
            }
            self.store.set_hide_enabled(enabled)
        }
    }

    struct Harness {
        _root: TempDir,
        controller: HideController,
        db: Arc<FailingDb>,
        procs: Arc<FakeProcessTable>,
        policy: Arc<RecordingPolicy>,
        app_uid: UserId,
    }

    fn harness_with(sdk_int: Option<u32>, with_ns: bool) -> Harness {
        let root = TempDir::new().unwrap();
        let app_data = root.path().join("user_de");
        let pkg_dir = app_data.join("0").join("com.example.app");
        fs::create_dir_all(&pkg_dir).unwrap();
        let app_uid = UserId::new(fs::metadata(&pkg_dir).unwrap().uid());

        let proc_dir = root.path().join("proc");
        fs::create_dir_all(proc_dir.join("self").join("ns")).unwrap();
        if with_ns {
            fs::write(proc_dir.join("self").join("ns").join("mnt"), b"").unwrap();
        }

        let mut config = Config::load_default().unwrap();
        config.app_data_dir = app_data;
        config.proc_dir = proc_dir;
        config.build_prop = root.path().join("build.prop");
        config.sdk_int = sdk_int;
        config.monitor_interval_ms = 10;

        let db = Arc::new(FailingDb::default());
        let procs = Arc::new(FakeProcessTable::new());
        let policy = Arc::new(RecordingPolicy::default());
        let controller = HideController::new(config, db.clone(), procs.clone(), policy.clone());

        Harness {
            _root: root,
            controller,
            db,
            procs,
            policy,
            app_uid,
        }
    }

    fn harness() -> Harness {
        harness_with(Some(30), true)
    }

    fn enabled() -> Harness {
        let h = harness();
        h.controller.enable(false).unwrap();
        h
    }

    fn pairs(rules: &[HideRule]) -> Vec<(&str, &str)> {
        rules
            .iter()
            .map(|r| (r.package.as_str(), r.process.as_str()))
            .collect()
    }

    #[test]
    fn test_add_list_remove() {
        let h = enabled();
        h.controller.add("com.example.app", "com.example.app:remote").unwrap();
        assert_eq!(
            pairs(&h.controller.list().unwrap()),
            [("com.example.app", "com.example.app:remote")]
        );

        h.controller.remove("com.example.app", "com.example.app:remote").unwrap();
        assert!(h.controller.list().unwrap().is_empty());
        assert!(h.db.load_rules().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_add_conflicts() {
        let h = enabled();
        h.controller.add("com.example.app", "").unwrap();
        let err = h.controller.add("com.example.app", "com.example.app").unwrap_err();
        assert!(matches!(err, HideError::Conflict(ConflictKind::ItemExists)));
    }

    #[test]
    fn test_remove_missing_conflicts() {
        let h = enabled();
        let err = h.controller.remove("com.example.app", "").unwrap_err();
        assert!(matches!(err, HideError::Conflict(ConflictKind::ItemNotFound)));
    }

    #[test]
    fn test_remove_empty_process_removes_whole_package_only() {
        let h = enabled();
        h.controller.add("com.example.app", "").unwrap();
        h.controller.add("com.example.app", "com.example.app:remote").unwrap();
        h.controller.add("com.other.app", "").unwrap();

        h.controller.remove("com.example.app", "").unwrap();
        assert_eq!(
            pairs(&h.controller.list().unwrap()),
            [("com.other.app", "com.other.app")]
        );
        assert_eq!(h.db.load_rules().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_package_rejected_without_mutation() {
        let h = enabled();
        for (package, process) in [("bad pkg!", ""), ("", ""), ("nodot", "")] {
            let err = h.controller.add(package, process).unwrap_err();
            assert!(matches!(err, HideError::InvalidInput { .. }));
        }
        assert!(h.controller.list().unwrap().is_empty());
        assert!(h.db.load_rules().unwrap().is_empty());
        assert!(h.procs.killed().is_empty());
    }

    #[test]
    fn test_queries_follow_changes_without_explicit_rebuild() {
        let h = enabled();
        assert!(!h.controller.is_hide_target(h.app_uid, "com.example.app"));

        h.controller.add("com.example.app", "").unwrap();
        assert!(h.controller.is_hide_target(h.app_uid, "com.example.app"));

        h.controller.remove("com.example.app", "").unwrap();
        assert!(!h.controller.is_hide_target(h.app_uid, "com.example.app"));
    }

    #[test]
    fn test_isolated_rule_matches_by_prefix() {
        let h = enabled();
        h.controller.add(ISOLATED_MAGIC, "com.foo:").unwrap();
        assert!(h.controller.is_hide_target(ISOLATED_UID, "com.foo:sandboxed0"));
        assert!(!h.controller.is_hide_target(ISOLATED_UID, "com.bar"));
    }

    #[test]
    fn test_min_len_guards_prefix_fallback() {
        let h = enabled();
        h.controller.add("com.example.app", "abcde").unwrap();
        assert!(!h.controller.is_hide_target_with_len(h.app_uid, "abcdf", 1024));
        assert!(!h.controller.is_hide_target_with_len(h.app_uid, "abcd", 1024));
        assert!(h.controller.is_hide_target_with_len(h.app_uid, "abcd", 3));
    }

    #[test]
    fn test_add_kills_first_exact_match() {
        let h = enabled();
        h.procs.spawn(100, 10_100, "com.example.app");
        h.procs.spawn(101, 10_100, "com.example.app");
        h.procs.spawn(102, 10_100, "com.example.app:remote");

        h.controller.add("com.example.app", "").unwrap();
        assert_eq!(h.procs.killed_names(), ["com.example.app"]);
    }

    #[test]
    fn test_isolated_add_kills_every_prefixed_process() {
        let h = enabled();
        h.procs.spawn(100, 99_000, "com.foo:sandboxed0");
        h.procs.spawn(101, 99_001, "com.foo:sandboxed1");
        h.procs.spawn(102, 10_100, "com.foobar");

        h.controller.add(ISOLATED_MAGIC, "com.foo:").unwrap();
        assert_eq!(
            h.procs.killed_names(),
            ["com.foo:sandboxed0", "com.foo:sandboxed1"]
        );
    }

    #[test]
    fn test_enable_sweep_spares_webview_zygote() {
        let h = harness();
        h.procs.spawn(10, 0, "usap32");
        h.procs.spawn(11, 0, "usap64");
        h.procs.spawn(12, 0, "usap64");
        h.procs.spawn(13, 10_100, "com.android.chrome_zygote");
        h.procs.spawn(14, 1_053, WEBVIEW_ZYGOTE);
        h.procs.spawn(15, 0, "zygote64");

        h.controller.enable(false).unwrap();

        let killed = h.procs.killed_names();
        assert_eq!(killed.len(), 4);
        assert!(!killed.iter().any(|n| n == WEBVIEW_ZYGOTE || n == "zygote64"));
    }

    #[test]
    fn test_enable_skips_sweep_on_old_sdk() {
        let h = harness_with(Some(28), true);
        h.procs.spawn(10, 0, "usap64");
        h.procs.spawn(11, 10_100, "com.android.chrome_zygote");
        h.controller.enable(false).unwrap();
        assert!(h.procs.killed().is_empty());
    }

    #[test]
    fn test_enable_requires_mount_namespace() {
        let h = harness_with(Some(30), false);
        h.procs.spawn(10, 0, "usap64");

        let err = h.controller.enable(false).unwrap_err();
        assert!(matches!(
            err,
            HideError::Precondition(PreconditionKind::NoNamespaceSupport)
        ));
        assert!(!h.controller.is_enabled());
        assert!(!h.db.hide_enabled().unwrap());
        assert!(h.procs.killed().is_empty());
        assert_eq!(*h.policy.props.lock().unwrap(), 0);
    }

    #[test]
    fn test_enable_twice() {
        let h = enabled();
        let err = h.controller.enable(false).unwrap_err();
        assert!(matches!(
            err,
            HideError::Precondition(PreconditionKind::AlreadyEnabled)
        ));
    }

    #[test]
    fn test_enable_applies_policy_and_persists() {
        let h = harness();
        h.controller.enable(true).unwrap();
        assert!(h.controller.is_enabled());
        assert!(h.db.hide_enabled().unwrap());
        assert_eq!(*h.policy.props.lock().unwrap(), 1);
        assert_eq!(h.policy.late_props_count(), 1);
    }

    #[test]
    fn test_disable_then_enable_reloads_rules() {
        let h = enabled();
        h.controller.add("com.example.app", "").unwrap();
        h.controller.add(ISOLATED_MAGIC, "com.foo:").unwrap();

        h.controller.disable().unwrap();
        assert!(!h.controller.is_enabled());
        assert!(!h.db.hide_enabled().unwrap());
        assert!(!h.controller.is_hide_target(h.app_uid, "com.example.app"));
        // Idempotent
        h.controller.disable().unwrap();

        h.controller.enable(false).unwrap();
        assert_eq!(h.controller.list().unwrap().len(), 2);
        assert!(h.controller.is_hide_target(h.app_uid, "com.example.app"));
        assert!(h.controller.is_hide_target(ISOLATED_UID, "com.foo:sandboxed3"));
    }

    #[test]
    fn test_disabled_operations_use_the_database() {
        let h = harness();
        h.procs.spawn(100, 10_100, "com.example.app");

        h.controller.add("com.example.app", "").unwrap();
        let err = h.controller.add("com.example.app", "").unwrap_err();
        assert!(matches!(err, HideError::Conflict(ConflictKind::ItemExists)));
        assert_eq!(
            pairs(&h.controller.list().unwrap()),
            [("com.example.app", "com.example.app")]
        );
        // No kills while disabled
        assert!(h.procs.killed().is_empty());

        h.controller.remove("com.example.app", "").unwrap();
        let err = h.controller.remove("com.example.app", "").unwrap_err();
        assert!(matches!(err, HideError::Conflict(ConflictKind::ItemNotFound)));
    }

    #[test]
    fn test_check_and_maybe_enable_follows_persisted_setting() {
        let h = harness();
        h.controller.check_and_maybe_enable(false).unwrap();
        assert!(!h.controller.is_enabled());

        h.db.set_hide_enabled(true).unwrap();
        h.db.insert_rule(&HideRule::new("com.example.app", "")).unwrap();
        h.controller.check_and_maybe_enable(false).unwrap();
        assert!(h.controller.is_enabled());
        assert!(h.controller.is_hide_target(h.app_uid, "com.example.app"));
    }

    #[test]
    fn test_check_when_enabled_refreshes_late_props() {
        let h = enabled();
        h.controller.check_and_maybe_enable(true).unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while h.policy.late_props_count() == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(h.policy.late_props_count(), 1);
    }

    #[test]
    fn test_failed_rule_write_is_reported_but_memory_keeps_change() {
        let h = enabled();
        h.db.fail_rules.store(true, Ordering::SeqCst);

        let err = h.controller.add("com.example.app", "").unwrap_err();
        assert!(matches!(err, HideError::Persistence(_)));
        assert_eq!(err.status(), Status::Error);
        assert_eq!(
            pairs(&h.controller.list().unwrap()),
            [("com.example.app", "com.example.app")]
        );
        assert!(h.controller.is_hide_target(h.app_uid, "com.example.app"));
        assert!(h.db.load_rules().unwrap().is_empty());

        let err = h.controller.remove("com.example.app", "").unwrap_err();
        assert_eq!(err.status(), Status::Error);
        assert!(h.controller.list().unwrap().is_empty());
        assert!(!h.controller.is_hide_target(h.app_uid, "com.example.app"));
    }

    #[test]
    fn test_failed_setting_write_only_logged() {
        let h = harness();
        h.db.fail_settings.store(true, Ordering::SeqCst);

        h.controller.enable(false).unwrap();
        assert!(h.controller.is_enabled());
        assert!(!h.db.hide_enabled().unwrap());

        h.controller.disable().unwrap();
        assert!(!h.controller.is_enabled());
    }

    #[test]
    fn test_shutdown_keeps_persisted_setting() {
        let h = enabled();
        h.controller.shutdown();
        assert!(!h.controller.is_enabled());
        assert!(h.db.hide_enabled().unwrap());
    }

    #[test]
    fn test_monitor_hides_new_targets() {
        let h = enabled();
        h.controller.add("com.example.app", "com.example.app:remote").unwrap();
        h.procs
            .spawn(300, h.app_uid.as_u32(), "com.example.app:remote");

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while h.policy.hidden_names().is_empty() && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(h.policy.hidden_names(), ["com.example.app:remote"]);
        h.controller.disable().unwrap();
    }

    #[test]
    fn test_projection_uses_configured_app_data_dir() {
        let h = enabled();
        let second = h.controller.config().app_data_dir.join("10").join("com.example.app");
        fs::create_dir_all(&second).unwrap();
        h.controller.add("com.example.app", "").unwrap();

        let uid = UserId::new(fs::metadata(&second).unwrap().uid());
        assert!(h.controller.is_hide_target(uid, "com.example.app"));
    }
}
