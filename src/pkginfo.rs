use std::fmt::Display;

use bon::Builder;
use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::nevra::PkgId;

/// Owned package record, copied out of the external package database at
/// the query boundary.
///
/// Only the attributes this library consumes are carried; everything else
/// (file lists, changelogs, dependency graphs) stays behind the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct PkgRecord {
    #[builder(into)]
    pub name: String,
    #[builder(default)]
    pub epoch: u64,
    #[builder(into)]
    pub version: String,
    #[builder(into)]
    pub release: String,
    #[builder(into)]
    pub arch: String,
    /// Repository of origin.
    #[builder(into)]
    pub repo: String,
    #[builder(default)]
    pub installed: bool,
    #[builder(default)]
    pub download_size: u64,
    #[builder(default)]
    pub install_size: u64,
    /// Build time, unix seconds.
    #[builder(default)]
    pub build_time: i64,
    #[builder(into, default)]
    pub summary: String,
    #[builder(into, default)]
    pub description: String,
    /// Capabilities this package provides.
    #[builder(default)]
    pub provides: Vec<String>,
}

impl PkgRecord {
    pub fn id(&self) -> PkgId {
        PkgId::of(self)
    }

    /// `name-version-release.arch`, epoch-prefixed when non-zero. Agrees
    /// with [`PkgId::display_name`] for this record's id.
    pub fn display_name(&self) -> String {
        if self.epoch != 0 {
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

    /// Same NEVRA on both sides, ignoring the repository of origin. Used
    /// to recognize an available record that is already installed.
    pub fn same_evr(&self, other: &PkgRecord) -> bool {
        self.epoch == other.epoch && self.version == other.version && self.release == other.release
    }
}

impl Display for PkgRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Name: {}", self.name)?;
        if self.epoch != 0 {
            writeln!(f, "Version: {}:{}-{}", self.epoch, self.version, self.release)?;
        } else {
            writeln!(f, "Version: {}-{}", self.version, self.release)?;
        }
        writeln!(f, "Architecture: {}", self.arch)?;
        writeln!(f, "Repository: {}", self.repo)?;
        writeln!(f, "Installed: {}", if self.installed { "yes" } else { "no" })?;
        writeln!(f, "Download-Size: {} B", self.download_size)?;
        writeln!(f, "Install-Size: {} B", self.install_size)?;
        if let Some(built) = DateTime::from_timestamp(self.build_time, 0) {
            writeln!(f, "Build-Time: {}", built.format("%Y-%m-%d %H:%M:%S UTC"))?;
        }
        if !self.provides.is_empty() {
            writeln!(f, "Provides: {}", self.provides.join(", "))?;
        }
        writeln!(
            f,
            "Description: {}",
            if self.description.is_empty() {
                "No description"
            } else {
                &self.description
            }
        )?;

        Ok(())
    }
}
