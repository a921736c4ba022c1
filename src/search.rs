use ahash::AHashSet;
use glob_match::glob_match;
use memchr::memmem;
use serde::{Deserialize, Serialize};

use crate::nevra::PkgId;
use crate::pkginfo::PkgRecord;
use crate::query::{PkgSack, QueryFilter};

/// Package attribute a search term is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchField {
    Name,
    Summary,
    Description,
    Provides,
}

/// Multi-field, multi-term search over a sack.
///
/// Each term matches a package when any selected field contains it
/// (case-insensitive substring, or glob when the term is a glob pattern);
/// terms combine by intersection (`match_all`) or union.
pub struct PkgSearcher<'a, S> {
    sack: &'a S,
    fields: Vec<SearchField>,
    match_all: bool,
    latest_only: bool,
}

impl<'a, S: PkgSack> PkgSearcher<'a, S> {
    pub fn new(sack: &'a S) -> Self {
        Self {
            sack,
            fields: vec![SearchField::Name, SearchField::Summary],
            match_all: true,
            latest_only: true,
        }
    }

    pub fn fields(&mut self, fields: Vec<SearchField>) -> &mut Self {
        self.fields = fields;
        self
    }

    pub fn match_all(&mut self, match_all: bool) -> &mut Self {
        self.match_all = match_all;
        self
    }

    pub fn latest_only(&mut self, latest_only: bool) -> &mut Self {
        self.latest_only = latest_only;
        self
    }

    /// No result is an empty Vec, never an error. Full name matches sort
    /// first.
    pub fn search(&self, terms: &[&str]) -> Vec<PkgRecord> {
        let base = self
            .sack
            .packages(&QueryFilter::builder().latest_only(self.latest_only).build());

        let mut matched: Option<AHashSet<PkgId>> = None;
        for term in terms {
            let term = term.to_lowercase();
            let hits = base
                .iter()
                .filter(|pkg| self.matches(pkg, &term))
                .map(PkgRecord::id)
                .collect::<AHashSet<_>>();

            matched = Some(match matched {
                None => hits,
                Some(prev) if self.match_all => prev.intersection(&hits).cloned().collect(),
                Some(prev) => prev.union(&hits).cloned().collect(),
            });
        }

        let matched = matched.unwrap_or_default();

        let mut res = base
            .into_iter()
            .filter(|pkg| matched.contains(&pkg.id()))
            .collect::<Vec<_>>();

        for i in 0..res.len() {
            if terms.iter().any(|t| *t == res[i].name) {
                let full = res.remove(i);
                res.insert(0, full);
            }
        }

        res
    }

    fn matches(&self, pkg: &PkgRecord, term: &str) -> bool {
        self.fields.iter().any(|field| match field {
            SearchField::Name => contains_or_glob(&pkg.name, term),
            SearchField::Summary => contains_or_glob(&pkg.summary, term),
            SearchField::Description => contains_or_glob(&pkg.description, term),
            SearchField::Provides => pkg.provides.iter().any(|p| contains_or_glob(p, term)),
        })
    }
}

fn contains_or_glob(haystack: &str, term: &str) -> bool {
    let haystack = haystack.to_lowercase();
    memmem::find(haystack.as_bytes(), term.as_bytes()).is_some() || glob_match(term, &haystack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::VecSack;
    use crate::test::record;

    fn sack() -> VecSack {
        let mut vim = record("vim", (2, "9.1", "1.fc40"), false, 2000);
        vim.summary = "The VIM editor".to_string();

        let mut nano = record("nano", (0, "7.2", "7.fc40"), true, 600);
        nano.summary = "A small text editor".to_string();
        nano.description = "GNU nano is an easy-to-use text editor".to_string();

        let mut bash = record("bash", (0, "5.2.26", "3.fc40"), true, 100);
        bash.summary = "The GNU Bourne Again shell".to_string();

        VecSack::new(vec![vim, nano, bash])
    }

    #[test]
    fn single_term_matches_name_and_summary() {
        let sack = sack();
        let res = PkgSearcher::new(&sack).search(&["editor"]);

        let names = res.iter().map(|p| p.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"vim") && names.contains(&"nano"));
    }

    #[test]
    fn match_all_intersects_terms() {
        let sack = sack();

        let mut searcher = PkgSearcher::new(&sack);
        searcher.fields(vec![
            SearchField::Name,
            SearchField::Summary,
            SearchField::Description,
        ]);

        let both = searcher.search(&["editor", "gnu"]);
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].name, "nano");

        searcher.match_all(false);
        let either = searcher.search(&["editor", "gnu"]);
        assert_eq!(either.len(), 3);
    }

    #[test]
    fn full_name_match_sorts_first() {
        let sack = sack();
        let mut searcher = PkgSearcher::new(&sack);
        searcher.match_all(false);

        let res = searcher.search(&["nano", "editor"]);
        assert_eq!(res[0].name, "nano");
    }

    #[test]
    fn glob_terms_match_names() {
        let sack = sack();
        let res = PkgSearcher::new(&sack).search(&["na*"]);
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].name, "nano");
    }

    #[test]
    fn no_result_is_empty() {
        let sack = sack();
        assert!(PkgSearcher::new(&sack).search(&["emacs"]).is_empty());
    }
}
