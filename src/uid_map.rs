//! Projection of the hide list onto user ids.
//!
//! Package to uid is only discoverable on disk: every multiuser profile
//! directory under the app-data root holds one directory per installed
//! package, owned by that package's uid. The projection is always rebuilt
//! from scratch; it is never patched in place.

use crate::hide_rule::HideRule;
use crate::types::UserId;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

/// Key of the projection: a real uid, or the sentinel for isolated processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UidKey {
    Isolated,
    Uid(UserId),
}

#[derive(Debug, Default, Clone)]
pub struct UidProjection {
    map: HashMap<UidKey, Vec<String>>,
}

impl UidProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patterns for one key, `None` when nothing is hidden for it.
    pub fn patterns(&self, key: UidKey) -> Option<&[String]> {
        self.map.get(&key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Recompute the whole projection from `rules` and the app-data layout.
    ///
    /// Unreadable profiles or packages contribute nothing; the rebuild never
    /// fails. A process that silently escapes hiding is the accepted
    /// degradation.
    pub fn rebuild(&mut self, rules: &BTreeSet<HideRule>, app_data_dir: &Path) {
        self.map.clear();

        for (i, profile) in list_profiles(app_data_dir).into_iter().enumerate() {
            // Isolated patterns are profile independent, add them on the
            // first profile only. No profile means no app can run either.
            if i == 0 {
                for rule in rules.iter().filter(|r| r.is_isolated()) {
                    self.map
                        .entry(UidKey::Isolated)
                        .or_default()
                        .push(rule.process.clone());
                }
            }

            for rule in rules {
                // Isolated rules reach here too but own no package directory,
                // so the probe below never finds one for them.
                let package_dir = profile.join(&rule.package);
                let uid = match fs::metadata(&package_dir) {
                    Ok(meta) => UserId::new(meta.uid()),
                    Err(_) => continue,
                };
                self.map
                    .entry(UidKey::Uid(uid))
                    .or_default()
                    .push(rule.process.clone());
            }
        }

        log::debug!("hide: uid map rebuilt, {} entries", self.map.len());
    }
}

/// Multiuser profile directories under the app-data root, in a stable order.
fn list_profiles(app_data_dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(app_data_dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!(
                "hide: cannot read app data dir {}: {}",
                app_data_dir.display(),
                e
            );
            return Vec::new();
        }
    };

    let mut profiles: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                log::debug!("hide: skipping unreadable profile entry: {}", e);
                None
            }
        })
        .collect();
    profiles.sort();
    profiles
}
