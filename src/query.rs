use ahash::AHashMap;
use bon::Builder;
use glob_match::glob_match;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::nevra::evr_cmp;
use crate::pkginfo::PkgRecord;

/// Installed/available partition of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueryScope {
    #[default]
    All,
    Installed,
    Available,
    /// Available records that would upgrade an installed one.
    Upgrades,
}

/// Typed filter criteria, translated into the backend's native query calls
/// at the boundary.
#[derive(Debug, Clone, Default, Builder)]
pub struct QueryFilter {
    /// Exact package name.
    #[builder(into)]
    pub name: Option<String>,
    /// Glob over package names, e.g. `bash*`.
    #[builder(into)]
    pub name_glob: Option<String>,
    /// Provided capability, matched exactly.
    #[builder(into)]
    pub provides: Option<String>,
    /// Collapse to the highest EVR per (name, arch).
    #[builder(default)]
    pub latest_only: bool,
    #[builder(default)]
    pub scope: QueryScope,
}

/// Query capability of the external package database.
///
/// This is the seam where a real libdnf binding attaches; the rest of the
/// library only ever talks to the sack through [`QueryFilter`].
pub trait PkgSack {
    fn packages(&self, filter: &QueryFilter) -> Vec<PkgRecord>;

    fn installed_packages(&self) -> Vec<PkgRecord> {
        self.packages(&QueryFilter::builder().scope(QueryScope::Installed).build())
    }

    fn upgrades(&self) -> Vec<PkgRecord> {
        self.packages(&QueryFilter::builder().scope(QueryScope::Upgrades).build())
    }

    /// All packages in the repositories; a record that is also installed
    /// with the same EVR is replaced by the installed record.
    fn all_packages(&self, showdups: bool) -> Vec<PkgRecord> {
        self.dedup_installed(showdups, true)
    }

    /// Packages not installed yet; records identical to an installed one
    /// are dropped.
    fn available_packages(&self, showdups: bool) -> Vec<PkgRecord> {
        self.dedup_installed(showdups, false)
    }

    fn dedup_installed(&self, showdups: bool, replace: bool) -> Vec<PkgRecord> {
        let mut inst_na: AHashMap<(String, String), Vec<PkgRecord>> = AHashMap::new();
        for pkg in self.installed_packages() {
            inst_na
                .entry((pkg.name.clone(), pkg.arch.clone()))
                .or_default()
                .push(pkg);
        }

        let avail = self.packages(
            &QueryFilter::builder()
                .scope(QueryScope::Available)
                .latest_only(!showdups)
                .build(),
        );

        let mut out = vec![];
        for pkg in avail {
            let inst = inst_na
                .get(&(pkg.name.clone(), pkg.arch.clone()))
                .and_then(|v| v.iter().find(|i| i.same_evr(&pkg)));

            match inst {
                Some(inst) if replace => out.push(inst.clone()),
                Some(_) => {}
                None => out.push(pkg),
            }
        }

        out
    }
}

/// In-memory sack. Backs the test suite and embedders that preload
/// records from elsewhere; a production deployment implements [`PkgSack`]
/// over the real package database instead.
#[derive(Debug, Default)]
pub struct VecSack {
    records: Vec<PkgRecord>,
}

impl VecSack {
    pub fn new(records: Vec<PkgRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, pkg: PkgRecord) {
        self.records.push(pkg);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn is_upgrade(&self, pkg: &PkgRecord) -> bool {
        !pkg.installed
            && self.records.iter().any(|i| {
                i.installed
                    && i.name == pkg.name
                    && i.arch == pkg.arch
                    && evr_cmp(pkg, i) == std::cmp::Ordering::Greater
            })
    }
}

impl PkgSack for VecSack {
    fn packages(&self, filter: &QueryFilter) -> Vec<PkgRecord> {
        debug!("sack query: {filter:?}");

        let mut out = self
            .records
            .iter()
            .filter(|pkg| match filter.scope {
                QueryScope::All => true,
                QueryScope::Installed => pkg.installed,
                QueryScope::Available => !pkg.installed,
                QueryScope::Upgrades => self.is_upgrade(pkg),
            })
            .filter(|pkg| filter.name.as_deref().is_none_or(|n| pkg.name == n))
            .filter(|pkg| {
                filter
                    .name_glob
                    .as_deref()
                    .is_none_or(|g| glob_match(g, &pkg.name))
            })
            .filter(|pkg| {
                filter
                    .provides
                    .as_deref()
                    .is_none_or(|cap| pkg.provides.iter().any(|p| p == cap))
            })
            .cloned()
            .collect::<Vec<_>>();

        if filter.latest_only {
            let mut latest: AHashMap<(String, String), PkgRecord> = AHashMap::new();
            for pkg in &out {
                latest
                    .entry((pkg.name.clone(), pkg.arch.clone()))
                    .and_modify(|cur| {
                        if evr_cmp(pkg, cur) == std::cmp::Ordering::Greater {
                            *cur = pkg.clone();
                        }
                    })
                    .or_insert_with(|| pkg.clone());
            }
            out.retain(|pkg| {
                latest
                    .get(&(pkg.name.clone(), pkg.arch.clone()))
                    .is_some_and(|best| pkg.same_evr(best))
            });
        }

        out
    }
}
