//! DNF package manager API abstraction library.
//!
//! The heavy machinery (dependency solving, repository metadata, the
//! package database itself) lives in an external backend reached through
//! the [`PkgSack`] seam; this crate owns the small stateful pieces on
//! top of it: the selection queue, the protected-package cache, package
//! identity, and query-result shaping.

pub mod base;
pub mod nevra;
pub mod operation;
pub mod pkginfo;
pub mod progress;
pub mod protected;
pub mod query;
pub mod queue;
pub mod search;

pub use base::ManaBase;
pub use nevra::{Nevra, NevraError, PkgId};
pub use operation::SelectionSummary;
pub use pkginfo::PkgRecord;
pub use progress::{DownloadStatus, DownloadTracker, ProgressObserver};
pub use protected::{ProtectedError, ProtectedSet};
pub use query::{PkgSack, QueryFilter, QueryScope, VecSack};
pub use queue::{PackageAction, PackageQueue};
pub use search::{PkgSearcher, SearchField};
