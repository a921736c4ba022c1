use std::cmp::Ordering;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::pkginfo::PkgRecord;

/// Field separator inside a [`PkgId`]. None of the NEVRA fields may
/// contain it.
pub const ID_SEPARATOR: char = ',';

#[derive(Debug, thiserror::Error)]
pub enum NevraError {
    #[error("Invalid package id {0}: expected 6 fields, got {1}")]
    FieldCount(String, usize),
}

pub type NevraResult<T> = Result<T, NevraError>;

/// Stable textual identity of a package: the NEVRA tuple plus the
/// repository of origin, joined with [`ID_SEPARATOR`].
///
/// This is the key used everywhere a pending action or protection status
/// is tracked. Two records with identical (name, epoch, version, release,
/// arch, repo) produce identical ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PkgId(Box<str>);

impl PkgId {
    pub fn of(pkg: &PkgRecord) -> Self {
        Self(
            format!(
                "{1}{0}{2}{0}{3}{0}{4}{0}{5}{0}{6}",
                ID_SEPARATOR,
                pkg.name,
                pkg.epoch,
                pkg.version,
                pkg.release,
                pkg.arch,
                pkg.repo
            )
            .into_boxed_str(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the six source fields. Fails unless the id contains exactly
    /// six separator-delimited fields.
    pub fn nevra(&self) -> NevraResult<Nevra> {
        let fields = self.0.split(ID_SEPARATOR).collect::<Vec<_>>();

        if fields.len() != 6 {
            return Err(NevraError::FieldCount(self.0.to_string(), fields.len()));
        }

        Ok(Nevra {
            name: fields[0].to_string(),
            epoch: fields[1].to_string(),
            version: fields[2].to_string(),
            release: fields[3].to_string(),
            arch: fields[4].to_string(),
            repo: fields[5].to_string(),
        })
    }

    /// `name-version-release.arch`, with the epoch prefixed when it is
    /// present and non-zero. Produces the same output as
    /// [`PkgRecord::display_name`] for the record this id was derived from.
    pub fn display_name(&self) -> NevraResult<String> {
        Ok(self.nevra()?.display_name())
    }
}

impl Display for PkgId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The six fields recovered from a [`PkgId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nevra {
    pub name: String,
    pub epoch: String,
    pub version: String,
    pub release: String,
    pub arch: String,
    pub repo: String,
}

impl Nevra {
    pub fn display_name(&self) -> String {
        if !self.epoch.is_empty() && self.epoch != "0" {
            format!(
                "{}-{}:{}-{}.{}",
                self.name, self.epoch, self.version, self.release, self.arch
            )
        } else {
            format!(
                "{}-{}-{}.{}",
                self.name, self.version, self.release, self.arch
            )
        }
    }

    pub fn to_id(&self) -> PkgId {
        PkgId(
            format!(
                "{1}{0}{2}{0}{3}{0}{4}{0}{5}{0}{6}",
                ID_SEPARATOR, self.name, self.epoch, self.version, self.release, self.arch, self.repo
            )
            .into_boxed_str(),
        )
    }
}

/// RPM-style EVR ordering. Used by the in-memory sack for latest-only
/// collapsing and upgrade detection; a real libdnf backend orders versions
/// itself.
pub fn evr_cmp(a: &PkgRecord, b: &PkgRecord) -> Ordering {
    a.epoch
        .cmp(&b.epoch)
        .then_with(|| vercmp(&a.version, &b.version))
        .then_with(|| vercmp(&a.release, &b.release))
}

/// rpmvercmp over one version string: alternating numeric and alphabetic
/// segments, numeric segments compare as numbers, `~` sorts before
/// everything including the empty string.
pub fn vercmp(a: &str, b: &str) -> Ordering {
    let mut a = a.as_bytes();
    let mut b = b.as_bytes();

    loop {
        // drop separators
        while let [c, rest @ ..] = a {
            if c.is_ascii_alphanumeric() || *c == b'~' {
                break;
            }
            a = rest;
        }
        while let [c, rest @ ..] = b {
            if c.is_ascii_alphanumeric() || *c == b'~' {
                break;
            }
            b = rest;
        }

        match (a.first(), b.first()) {
            (Some(b'~'), Some(b'~')) => {
                a = &a[1..];
                b = &b[1..];
                continue;
            }
            (Some(b'~'), _) => return Ordering::Less,
            (_, Some(b'~')) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => {
                let numeric = ca.is_ascii_digit();

                // a numeric segment always beats an alphabetic one
                if numeric != cb.is_ascii_digit() {
                    return if numeric {
                        Ordering::Greater
                    } else {
                        Ordering::Less
                    };
                }

                let take = |s: &[u8]| {
                    s.iter()
                        .take_while(|c| {
                            if numeric {
                                c.is_ascii_digit()
                            } else {
                                c.is_ascii_alphabetic()
                            }
                        })
                        .count()
                };

                let (seg_a, rest_a) = a.split_at(take(a));
                let (seg_b, rest_b) = b.split_at(take(b));

                let ord = if numeric {
                    let trim = |s: &[u8]| {
                        let zeros = s.iter().take_while(|c| **c == b'0').count();
                        s[zeros..].to_vec()
                    };
                    let (na, nb) = (trim(seg_a), trim(seg_b));
                    na.len().cmp(&nb.len()).then_with(|| na.cmp(&nb))
                } else {
                    seg_a.cmp(seg_b)
                };

                if ord != Ordering::Equal {
                    return ord;
                }

                a = rest_a;
                b = rest_b;
            }
        }
    }
}
