use chrono::{Duration, Utc};
use tracing::debug;

use crate::pkginfo::PkgRecord;
use crate::protected::{ProtectedResult, ProtectedSet};
use crate::query::{PkgSack, QueryFilter, QueryScope};
use crate::queue::PackageQueue;

/// Facade composing the selection queue, the protected-package cache and
/// the backend sack into one session object.
pub struct ManaBase<S> {
    sack: S,
    queue: PackageQueue,
    protected: ProtectedSet,
}

impl<S: PkgSack> ManaBase<S> {
    pub fn new(sack: S) -> Self {
        Self::with_protected(sack, ProtectedSet::default())
    }

    pub fn with_protected(sack: S, protected: ProtectedSet) -> Self {
        Self {
            sack,
            queue: PackageQueue::new(),
            protected,
        }
    }

    pub fn sack(&self) -> &S {
        &self.sack
    }

    pub fn queue(&self) -> &PackageQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut PackageQueue {
        &mut self.queue
    }

    pub fn protected_mut(&mut self) -> &mut ProtectedSet {
        &mut self.protected
    }

    /// Latest packages providing the given capability.
    pub fn packages_providing(&self, name: &str) -> Vec<PkgRecord> {
        self.sack.packages(
            &QueryFilter::builder()
                .provides(name)
                .latest_only(true)
                .build(),
        )
    }

    /// Most up-to-date package with the given name, or None.
    pub fn package_by_name(&self, name: &str) -> Option<PkgRecord> {
        self.sack
            .packages(&QueryFilter::builder().name(name).latest_only(true).build())
            .into_iter()
            .next()
    }

    /// Queue `pkg` for installation, optionally pinning it into the
    /// protected set.
    pub fn select_package(&mut self, pkg: &PkgRecord, protect: bool) -> ProtectedResult<()> {
        self.queue.mark_install(pkg);
        if protect {
            self.protected.mark_protected(&self.sack, pkg)?;
        }
        Ok(())
    }

    /// Queue the named packages for installation. Returns the names that
    /// matched nothing in the sack.
    pub fn select_by_package_names<'a>(
        &mut self,
        names: impl IntoIterator<Item = &'a str>,
        protect: bool,
    ) -> ProtectedResult<Vec<String>> {
        let mut no_result = vec![];

        for name in names {
            match self.package_by_name(name) {
                Some(pkg) => self.select_package(&pkg, protect)?,
                None => {
                    debug!("No package named {name}");
                    no_result.push(name.to_string());
                }
            }
        }

        Ok(no_result)
    }

    /// Queue `pkg` for removal, unless it is protected.
    pub fn unselect_package(&mut self, pkg: &PkgRecord) -> ProtectedResult<()> {
        if !self.protected.is_protected(&self.sack, pkg)? {
            self.queue.mark_remove(pkg);
        }
        Ok(())
    }

    /// Drop every pending install/update selection except protected
    /// packages.
    pub fn unselect_all(&mut self) -> ProtectedResult<()> {
        for pkg in self.packages_to_install() {
            if !self.protected.is_protected(&self.sack, &pkg)? {
                self.queue.remove(&pkg);
            }
        }
        Ok(())
    }

    /// Total download size of the current selection.
    pub fn selected_size(&self) -> u64 {
        self.queue.download_size()
    }

    /// Resolve the queued install and update selections back to sack
    /// records. Ids that no longer match anything are skipped.
    pub fn packages_to_install(&self) -> Vec<PkgRecord> {
        let mut out = vec![];

        let ids = self
            .queue
            .install_list()
            .iter()
            .chain(self.queue.update_list());

        for id in ids {
            let Ok(nevra) = id.nevra() else {
                continue;
            };

            let hit = self
                .sack
                .packages(&QueryFilter::builder().name(&*nevra.name).build())
                .into_iter()
                .find(|pkg| {
                    pkg.version == nevra.version
                        && pkg.release == nevra.release
                        && pkg.arch == nevra.arch
                });

            match hit {
                Some(pkg) => out.push(pkg),
                None => debug!("Queued id {id} no longer matches a sack record"),
            }
        }

        out
    }

    /// Latest packages built within the last `days` days.
    pub fn recent(&self, days: i64) -> Vec<PkgRecord> {
        let cutoff = (Utc::now() - Duration::days(days)).timestamp();

        self.sack
            .packages(
                &QueryFilter::builder()
                    .scope(QueryScope::Available)
                    .latest_only(true)
                    .build(),
            )
            .into_iter()
            .filter(|pkg| pkg.build_time > cutoff)
            .collect()
    }

    pub fn is_protected(&mut self, pkg: &PkgRecord) -> ProtectedResult<bool> {
        self.protected.is_protected(&self.sack, pkg)
    }

    pub fn all_protected(&mut self) -> ProtectedResult<Vec<PkgRecord>> {
        Ok(self
            .protected
            .all_protected(&self.sack)?
            .into_iter()
            .cloned()
            .collect())
    }
}
