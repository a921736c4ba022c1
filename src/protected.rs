use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use tracing::{debug, warn};

use crate::nevra::PkgId;
use crate::pkginfo::PkgRecord;
use crate::query::{PkgSack, QueryFilter};

/// Conventional rule directory on DNF systems.
pub const DEFAULT_RULE_DIR: &str = "/etc/dnf/protected.d";

#[derive(Debug, thiserror::Error)]
pub enum ProtectedError {
    #[error("Failed to read rule directory {path}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type ProtectedResult<T> = Result<T, ProtectedError>;

/// Lazily computed set of packages that must never be unselected.
///
/// The rule source is a directory of text files, one provided capability
/// per non-blank line. It is scanned once per process; the result is
/// stable until [`invalidate`](ProtectedSet::invalidate) is called, even
/// if the files change on disk.
pub struct ProtectedSet {
    rule_dir: PathBuf,
    cache: Option<AHashMap<PkgId, PkgRecord>>,
}

impl Default for ProtectedSet {
    fn default() -> Self {
        Self::new(DEFAULT_RULE_DIR)
    }
}

impl ProtectedSet {
    pub fn new(rule_dir: impl Into<PathBuf>) -> Self {
        Self {
            rule_dir: rule_dir.into(),
            cache: None,
        }
    }

    pub fn rule_dir(&self) -> &Path {
        &self.rule_dir
    }

    /// Drop the cache; the next query re-scans the rule directory.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    pub fn is_protected<S: PkgSack>(
        &mut self,
        sack: &S,
        pkg: &PkgRecord,
    ) -> ProtectedResult<bool> {
        Ok(self.populated(sack)?.contains_key(&pkg.id()))
    }

    pub fn all_protected<S: PkgSack>(&mut self, sack: &S) -> ProtectedResult<Vec<&PkgRecord>> {
        Ok(self.populated(sack)?.values().collect())
    }

    /// Insert `pkg` into the protected set for the rest of this process
    /// (or until invalidated). First-seen wins; an existing entry is kept.
    pub fn mark_protected<S: PkgSack>(
        &mut self,
        sack: &S,
        pkg: &PkgRecord,
    ) -> ProtectedResult<()> {
        self.populated(sack)?
            .entry(pkg.id())
            .or_insert_with(|| pkg.clone());
        Ok(())
    }

    fn populated<S: PkgSack>(
        &mut self,
        sack: &S,
    ) -> ProtectedResult<&mut AHashMap<PkgId, PkgRecord>> {
        if self.cache.is_none() {
            self.cache = Some(self.scan(sack)?);
        }

        Ok(self.cache.get_or_insert_with(AHashMap::new))
    }

    fn scan<S: PkgSack>(&self, sack: &S) -> ProtectedResult<AHashMap<PkgId, PkgRecord>> {
        let mut protected = AHashMap::new();

        let mut rule_files = fs::read_dir(&self.rule_dir)
            .map_err(|source| ProtectedError::ReadDir {
                path: self.rule_dir.clone(),
                source,
            })?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect::<Vec<_>>();
        rule_files.sort();

        for path in rule_files {
            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) => {
                    warn!("Skipping unreadable rule file {}: {e}", path.display());
                    continue;
                }
            };

            for name in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
                let pkgs = sack.packages(&QueryFilter::builder().provides(name).build());

                if pkgs.is_empty() {
                    debug!("Rule {name} in {} matches no package", path.display());
                }

                for pkg in pkgs {
                    protected.entry(pkg.id()).or_insert(pkg);
                }
            }
        }

        debug!(
            "Protected set populated with {} entries from {}",
            protected.len(),
            self.rule_dir.display()
        );

        Ok(protected)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::query::VecSack;
    use crate::test::record;

    fn sack() -> VecSack {
        let mut dnf = record("dnf", (0, "4.19.0", "1.fc40"), true, 0);
        dnf.provides = vec!["dnf".to_string()];

        let mut sudo = record("sudo", (0, "1.9.15", "1.fc40"), true, 0);
        sudo.provides = vec!["sudo".to_string()];

        let vim = record("vim", (2, "9.1", "1.fc40"), false, 0);

        VecSack::new(vec![dnf, sudo, vim])
    }

    fn rule_dir(rules: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (file, contents) in rules {
            fs::write(dir.path().join(file), contents).unwrap();
        }
        dir
    }

    #[test]
    fn protected_matches_by_provided_capability() {
        let dir = rule_dir(&[("dnf.conf", "dnf\n"), ("admin.conf", "\nsudo\n\n")]);
        let sack = sack();
        let mut protected = ProtectedSet::new(dir.path());

        assert!(protected
            .is_protected(&sack, &record("dnf", (0, "4.19.0", "1.fc40"), true, 0))
            .unwrap());
        assert!(!protected
            .is_protected(&sack, &record("vim", (2, "9.1", "1.fc40"), false, 0))
            .unwrap());
        assert_eq!(protected.all_protected(&sack).unwrap().len(), 2);
    }

    #[test]
    fn cache_is_stable_until_invalidated() {
        let dir = rule_dir(&[("dnf.conf", "dnf\n")]);
        let sack = sack();
        let mut protected = ProtectedSet::new(dir.path());

        let sudo = record("sudo", (0, "1.9.15", "1.fc40"), true, 0);
        assert!(!protected.is_protected(&sack, &sudo).unwrap());

        // the rule file changes on disk, the populated cache does not
        fs::write(dir.path().join("dnf.conf"), "dnf\nsudo\n").unwrap();
        assert!(!protected.is_protected(&sack, &sudo).unwrap());

        protected.invalidate();
        assert!(protected.is_protected(&sack, &sudo).unwrap());
    }

    #[test]
    fn mark_protected_inserts_on_top_of_rules() {
        let dir = rule_dir(&[("base.conf", "dnf\n")]);
        let sack = sack();
        let mut protected = ProtectedSet::new(dir.path());

        let vim = record("vim", (2, "9.1", "1.fc40"), false, 0);
        protected.mark_protected(&sack, &vim).unwrap();

        assert!(protected.is_protected(&sack, &vim).unwrap());
        assert_eq!(protected.all_protected(&sack).unwrap().len(), 2);
    }

    #[test]
    fn missing_rule_dir_is_an_error() {
        let sack = sack();
        let mut protected = ProtectedSet::new("/nonexistent/protected.d");

        let err = protected
            .is_protected(&sack, &record("dnf", (0, "4.19.0", "1.fc40"), true, 0))
            .unwrap_err();
        assert!(matches!(err, ProtectedError::ReadDir { .. }));
    }
}
