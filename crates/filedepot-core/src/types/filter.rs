//! Filter predicates for file listings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Predicate applied to admin file listings.
///
/// Listings accept at most one filter at a time; when the caller supplies
/// none, [`FileFilter::RecentlyDownloaded`] applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFilter {
    /// Files owned by the given user.
    Owner(Uuid),
    /// Original name contains the given fragment (case-insensitive).
    OriginalNameContains(String),
    /// Display name contains the given fragment (case-insensitive).
    NameContains(String),
    /// Size within ±10% of the target, bounds inclusive.
    SizeNear(i64),
    /// Uploaded on the given UTC calendar day.
    UploadedOn(NaiveDate),
    /// Last downloaded on the given UTC calendar day.
    LastDownloadOn(NaiveDate),
    /// Downloaded at least once within the last 24 hours.
    RecentlyDownloaded,
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::RecentlyDownloaded
    }
}

impl FileFilter {
    /// Compute the inclusive size window for [`FileFilter::SizeNear`].
    ///
    /// The window is ±10% of the target; bounds are compared as floats so a
    /// target that is not a multiple of ten still filters correctly.
    pub fn size_bounds(target: i64) -> (f64, f64) {
        let target = target as f64;
        (target * 0.9, target * 1.1)
    }
}
