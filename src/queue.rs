use std::fmt::Display;

use ahash::AHashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::nevra::PkgId;
use crate::pkginfo::PkgRecord;

/// Pending action a user selected for one package.
///
/// The serde form keeps the historical short codes (`i`, `u`, `r`, `o`,
/// `ri`, `do`, `li`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageAction {
    #[serde(rename = "i")]
    Install,
    #[serde(rename = "u")]
    Update,
    #[serde(rename = "r")]
    Remove,
    #[serde(rename = "o")]
    Obsolete,
    #[serde(rename = "ri")]
    Reinstall,
    #[serde(rename = "do")]
    Downgrade,
    #[serde(rename = "li")]
    LocalInstall,
}

impl PackageAction {
    pub const ALL: [PackageAction; 7] = [
        PackageAction::Install,
        PackageAction::Update,
        PackageAction::Remove,
        PackageAction::Obsolete,
        PackageAction::Reinstall,
        PackageAction::Downgrade,
        PackageAction::LocalInstall,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            PackageAction::Install => "i",
            PackageAction::Update => "u",
            PackageAction::Remove => "r",
            PackageAction::Obsolete => "o",
            PackageAction::Reinstall => "ri",
            PackageAction::Downgrade => "do",
            PackageAction::LocalInstall => "li",
        }
    }

    /// Actions whose packages have to be fetched before the transaction
    /// runs; only these contribute to the queue's download total.
    pub fn needs_download(&self) -> bool {
        matches!(
            self,
            PackageAction::Install | PackageAction::Reinstall | PackageAction::Update
        )
    }
}

impl Display for PackageAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Tracks user-selected actions per package until a transaction is built.
///
/// A package id is in at most one action bucket at a time; the reverse
/// index always agrees with the buckets, and the running download total
/// equals the sum of download sizes of packages whose current action
/// [`needs_download`](PackageAction::needs_download).
pub struct PackageQueue {
    buckets: IndexMap<PackageAction, Vec<PkgId>>,
    actions: AHashMap<PkgId, PackageAction>,
    download_size: u64,
}

impl Default for PackageQueue {
    fn default() -> Self {
        Self {
            buckets: PackageAction::ALL.iter().map(|a| (*a, vec![])).collect(),
            actions: AHashMap::new(),
            download_size: 0,
        }
    }
}

impl PackageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `action` for `pkg`, replacing any previously selected action.
    ///
    /// Replacing is rejected outright when the result would be meaningless
    /// (installing an installed package, removing one that is not
    /// installed); the package then ends up unselected entirely.
    pub fn add(&mut self, pkg: &PkgRecord, action: PackageAction) {
        let id = pkg.id();

        match self.actions.get(&id).copied() {
            Some(old) if old == action => {}
            Some(old) => {
                if old.needs_download() {
                    self.download_size = self.download_size.saturating_sub(pkg.download_size);
                }
                if let Some(bucket) = self.buckets.get_mut(&old) {
                    bucket.retain(|queued| queued != &id);
                }

                let rejected = (pkg.installed && action == PackageAction::Install)
                    || (!pkg.installed && action == PackageAction::Remove);

                if rejected {
                    debug!("unselect {id}: {action} replacing {old} is a no-op");
                    self.actions.remove(&id);
                } else {
                    self.buckets.entry(action).or_default().push(id.clone());
                    self.actions.insert(id, action);
                    if action.needs_download() {
                        self.download_size += pkg.download_size;
                    }
                }
            }
            None => {
                self.buckets.entry(action).or_default().push(id.clone());
                self.actions.insert(id, action);
                if action.needs_download() {
                    self.download_size += pkg.download_size;
                }
            }
        }
    }

    pub fn mark_install(&mut self, pkg: &PkgRecord) {
        self.add(pkg, PackageAction::Install);
    }

    pub fn mark_remove(&mut self, pkg: &PkgRecord) {
        self.add(pkg, PackageAction::Remove);
    }

    /// Drop `pkg` from the queue, whatever its current action is.
    pub fn remove(&mut self, pkg: &PkgRecord) {
        let id = pkg.id();
        if let Some(action) = self.actions.remove(&id) {
            if let Some(bucket) = self.buckets.get_mut(&action) {
                bucket.retain(|queued| queued != &id);
            }
            if action.needs_download() {
                self.download_size = self.download_size.saturating_sub(pkg.download_size);
            }
        }
    }

    pub fn clear(&mut self) {
        for bucket in self.buckets.values_mut() {
            bucket.clear();
        }
        self.actions.clear();
        self.download_size = 0;
    }

    pub fn total_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn download_size(&self) -> u64 {
        self.download_size
    }

    pub fn current_action(&self, pkg: &PkgRecord) -> Option<PackageAction> {
        self.actions.get(&pkg.id()).copied()
    }

    /// Whether the package shows up as selected in a package list.
    // TODO: confirm with the product owner whether a tracked package
    // should additionally require pkg.installed here; today any tracked
    // action other than Remove counts as selected.
    pub fn is_marked_for_install(&self, pkg: &PkgRecord) -> bool {
        match self.actions.get(&pkg.id()) {
            Some(&action) => action != PackageAction::Remove,
            None => pkg.installed,
        }
    }

    /// Queued ids for one action, in selection order.
    pub fn bucket(&self, action: PackageAction) -> &[PkgId] {
        self.buckets.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn install_list(&self) -> &[PkgId] {
        self.bucket(PackageAction::Install)
    }

    pub fn update_list(&self) -> &[PkgId] {
        self.bucket(PackageAction::Update)
    }

    pub fn remove_list(&self) -> &[PkgId] {
        self.bucket(PackageAction::Remove)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::record;

    #[test]
    fn add_tracks_action_and_size() {
        let mut queue = PackageQueue::new();
        let pkg = record("vim", (2, "9.1", "1.fc40"), false, 2000);

        queue.add(&pkg, PackageAction::Install);

        assert_eq!(queue.total_count(), 1);
        assert_eq!(queue.download_size(), 2000);
        assert_eq!(queue.current_action(&pkg), Some(PackageAction::Install));
        assert_eq!(queue.install_list(), [pkg.id()]);
    }

    #[test]
    fn add_same_action_twice_is_idempotent() {
        let mut queue = PackageQueue::new();
        let pkg = record("vim", (2, "9.1", "1.fc40"), false, 2000);

        queue.add(&pkg, PackageAction::Install);
        queue.add(&pkg, PackageAction::Install);

        assert_eq!(queue.total_count(), 1);
        assert_eq!(queue.download_size(), 2000);
        assert_eq!(queue.install_list().len(), 1);
    }

    #[test]
    fn replacing_install_with_remove_unselects_not_installed_pkg() {
        let mut queue = PackageQueue::new();
        let pkg = record("vim", (2, "9.1", "1.fc40"), false, 2000);

        queue.add(&pkg, PackageAction::Install);
        queue.add(&pkg, PackageAction::Remove);

        assert_eq!(queue.total_count(), 0);
        assert_eq!(queue.download_size(), 0);
        assert_eq!(queue.current_action(&pkg), None);
    }

    #[test]
    fn replacing_remove_with_install_unselects_installed_pkg() {
        let mut queue = PackageQueue::new();
        let pkg = record("bash", (0, "5.2.26", "3.fc40"), true, 100);

        queue.add(&pkg, PackageAction::Remove);
        queue.add(&pkg, PackageAction::Install);

        assert_eq!(queue.total_count(), 0);
        assert_eq!(queue.current_action(&pkg), None);
    }

    #[test]
    fn replacing_update_with_remove_keeps_remove_for_installed_pkg() {
        let mut queue = PackageQueue::new();
        let pkg = record("bash", (0, "5.2.26", "3.fc40"), true, 100);

        queue.add(&pkg, PackageAction::Update);
        assert_eq!(queue.download_size(), 100);

        queue.add(&pkg, PackageAction::Remove);
        assert_eq!(queue.current_action(&pkg), Some(PackageAction::Remove));
        assert_eq!(queue.download_size(), 0);
        assert_eq!(queue.remove_list().len(), 1);
        assert!(queue.update_list().is_empty());
    }

    #[test]
    fn remove_erases_bucket_and_size() {
        let mut queue = PackageQueue::new();
        let vim = record("vim", (2, "9.1", "1.fc40"), false, 2000);
        let bash = record("bash", (0, "5.2.26", "3.fc40"), true, 100);

        queue.add(&vim, PackageAction::Install);
        queue.add(&bash, PackageAction::Remove);
        assert_eq!(queue.total_count(), 2);

        queue.remove(&bash);
        assert_eq!(queue.total_count(), 1);
        assert_eq!(queue.download_size(), 2000);

        queue.remove(&vim);
        assert_eq!(queue.total_count(), 0);
        assert_eq!(queue.download_size(), 0);
    }

    #[test]
    fn clear_resets_everything() {
        let mut queue = PackageQueue::new();
        queue.add(
            &record("vim", (2, "9.1", "1.fc40"), false, 2000),
            PackageAction::Install,
        );

        queue.clear();

        assert_eq!(queue.total_count(), 0);
        assert_eq!(queue.download_size(), 0);
    }

    #[test]
    fn size_invariant_over_mixed_sequences() {
        let mut queue = PackageQueue::new();
        let vim = record("vim", (2, "9.1", "1.fc40"), false, 2000);
        let bash = record("bash", (0, "5.2.30", "1.fc40"), true, 100);
        let curl = record("curl", (0, "8.6.0", "1.fc40"), true, 550);

        queue.add(&vim, PackageAction::Install);
        queue.add(&bash, PackageAction::Update);
        queue.add(&curl, PackageAction::Remove);
        assert_eq!(queue.download_size(), 2100);

        queue.add(&curl, PackageAction::Reinstall);
        assert_eq!(queue.download_size(), 2650);

        queue.add(&bash, PackageAction::Remove);
        assert_eq!(queue.download_size(), 2550);

        queue.remove(&vim);
        assert_eq!(queue.download_size(), 550);

        let expected: u64 = [&vim, &bash, &curl]
            .iter()
            .filter_map(|p| queue.current_action(p).filter(PackageAction::needs_download).map(|_| p.download_size))
            .sum();
        assert_eq!(queue.download_size(), expected);
    }

    #[test]
    fn is_marked_for_install_follows_action_then_installed_flag() {
        let mut queue = PackageQueue::new();
        let installed = record("bash", (0, "5.2.26", "3.fc40"), true, 100);
        let avail = record("vim", (2, "9.1", "1.fc40"), false, 2000);

        assert!(queue.is_marked_for_install(&installed));
        assert!(!queue.is_marked_for_install(&avail));

        queue.add(&avail, PackageAction::Install);
        assert!(queue.is_marked_for_install(&avail));

        queue.add(&installed, PackageAction::Remove);
        assert!(!queue.is_marked_for_install(&installed));
    }

    #[test]
    fn action_codes_round_trip_through_serde() {
        for action in PackageAction::ALL {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.code()));
            let back: PackageAction = serde_json::from_str(&json).unwrap();
            assert_eq!(back, action);
        }
    }
}
