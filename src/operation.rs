use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::nevra::PkgId;
use crate::queue::{PackageAction, PackageQueue};

/// Serializable snapshot of everything currently selected in a queue,
/// one list per action, in selection order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSummary {
    pub install: Vec<PkgId>,
    pub update: Vec<PkgId>,
    pub remove: Vec<PkgId>,
    pub obsolete: Vec<PkgId>,
    pub reinstall: Vec<PkgId>,
    pub downgrade: Vec<PkgId>,
    pub local_install: Vec<PkgId>,
    pub total_download_size: u64,
}

impl SelectionSummary {
    pub fn from_queue(queue: &PackageQueue) -> Self {
        let bucket = |action| queue.bucket(action).to_vec();

        Self {
            install: bucket(PackageAction::Install),
            update: bucket(PackageAction::Update),
            remove: bucket(PackageAction::Remove),
            obsolete: bucket(PackageAction::Obsolete),
            reinstall: bucket(PackageAction::Reinstall),
            downgrade: bucket(PackageAction::Downgrade),
            local_install: bucket(PackageAction::LocalInstall),
            total_download_size: queue.download_size(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.install.is_empty()
            && self.update.is_empty()
            && self.remove.is_empty()
            && self.obsolete.is_empty()
            && self.reinstall.is_empty()
            && self.downgrade.is_empty()
            && self.local_install.is_empty()
    }
}

fn write_line(f: &mut std::fmt::Formatter<'_>, label: &str, ids: &[PkgId]) -> std::fmt::Result {
    if ids.is_empty() {
        return Ok(());
    }

    let names = ids
        .iter()
        .map(|id| id.display_name().unwrap_or_else(|_| id.to_string()))
        .collect::<Vec<_>>();

    writeln!(f, "{label}: {}", names.join(", "))
}

impl Display for SelectionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_line(f, "Install", &self.install)?;
        write_line(f, "Update", &self.update)?;
        write_line(f, "Remove", &self.remove)?;
        write_line(f, "Obsolete", &self.obsolete)?;
        write_line(f, "ReInstall", &self.reinstall)?;
        write_line(f, "Downgrade", &self.downgrade)?;
        write_line(f, "LocalInstall", &self.local_install)?;
        writeln!(f, "Download-Size: {} B", self.total_download_size)?;

        Ok(())
    }
}
