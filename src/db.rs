//! Persistence of hide rules and the enable setting.
//!
//! The engine only talks to [`HideDb`]. [`SqliteDb`] keeps the two tables in
//! a relational store; [`MemoryDb`] is used by tests and ephemeral runs.

use crate::error::{ConflictKind, HideError, Result};
use crate::hide_rule::HideRule;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Settings key holding the persisted enable flag.
pub const HIDE_CONFIG_KEY: &str = "magiskhide";

pub trait HideDb: Send + Sync {
    fn load_rules(&self) -> Result<Vec<HideRule>>;

    /// Insert one rule. A duplicate is reported as `ItemExists`.
    fn insert_rule(&self, rule: &HideRule) -> Result<()>;

    /// Delete one rule, or every rule of `package` when `process` is `None`.
    /// Returns the number of rows removed.
    fn delete_rules(&self, package: &str, process: Option<&str>) -> Result<usize>;

    fn hide_enabled(&self) -> Result<bool>;

    fn set_hide_enabled(&self, enabled: bool) -> Result<()>;
}

pub struct SqliteDb {
    conn: Mutex<Connection>,
}

impl SqliteDb {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS hidelist (
                 package_name TEXT,
                 process TEXT,
                 PRIMARY KEY(package_name, process));
             CREATE TABLE IF NOT EXISTS settings (
                 key TEXT,
                 value INT,
                 PRIMARY KEY(key));",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e: PoisonError<_>| {
            log::warn!("Database lock poisoned, recovering");
            e.into_inner()
        })
    }
}

impl HideDb for SqliteDb {
    fn load_rules(&self) -> Result<Vec<HideRule>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT package_name, process FROM hidelist")?;
        let rows = stmt.query_map([], |row| {
            Ok(HideRule {
                package: row.get(0)?,
                process: row.get(1)?,
            })
        })?;
        let mut rules = Vec::new();
        for rule in rows {
            rules.push(rule?);
        }
        Ok(rules)
    }

    fn insert_rule(&self, rule: &HideRule) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO hidelist (package_name, process) VALUES (?1, ?2)",
            params![rule.package, rule.process],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(ConflictKind::ItemExists.into())
            }
            Err(e) => Err(HideError::Persistence(e)),
        }
    }

    fn delete_rules(&self, package: &str, process: Option<&str>) -> Result<usize> {
        let conn = self.conn();
        let removed = match process {
            Some(process) => conn.execute(
                "DELETE FROM hidelist WHERE package_name = ?1 AND process = ?2",
                params![package, process],
            )?,
            None => conn.execute(
                "DELETE FROM hidelist WHERE package_name = ?1",
                params![package],
            )?,
        };
        Ok(removed)
    }

    fn hide_enabled(&self) -> Result<bool> {
        let value: Option<i64> = self
            .conn()
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![HIDE_CONFIG_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.unwrap_or(0) != 0)
    }

    fn set_hide_enabled(&self, enabled: bool) -> Result<()> {
        self.conn().execute(
            "REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![HIDE_CONFIG_KEY, i64::from(enabled)],
        )?;
        Ok(())
    }
}

/// Non-persistent store with the same semantics as [`SqliteDb`].
#[derive(Default)]
pub struct MemoryDb {
    rules: Mutex<BTreeSet<HideRule>>,
    settings: Mutex<BTreeMap<String, i64>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HideDb for MemoryDb {
    fn load_rules(&self) -> Result<Vec<HideRule>> {
        let rules = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(rules.iter().cloned().collect())
    }

    fn insert_rule(&self, rule: &HideRule) -> Result<()> {
        let mut rules = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
        if rules.insert(rule.clone()) {
            Ok(())
        } else {
            Err(ConflictKind::ItemExists.into())
        }
    }

    fn delete_rules(&self, package: &str, process: Option<&str>) -> Result<usize> {
        let mut rules = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
        let before = rules.len();
        rules.retain(|r| !(r.package == package && process.map_or(true, |p| r.process == p)));
        Ok(before - rules.len())
    }

    fn hide_enabled(&self) -> Result<bool> {
        let settings = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(settings.get(HIDE_CONFIG_KEY).copied().unwrap_or(0) != 0)
    }

    fn set_hide_enabled(&self, enabled: bool) -> Result<()> {
        let mut settings = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
        settings.insert(HIDE_CONFIG_KEY.to_string(), i64::from(enabled));
        Ok(())
    }
}
