//! Sorting types for file listings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Sortable columns of the file catalog.
///
/// The admin listing accepts a sort key from the caller; only these five
/// fields are sortable, and each maps to a fixed column name — caller input
/// never reaches the query text directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSortKey {
    /// When the file was uploaded.
    UploadedAt,
    /// When the file was last downloaded.
    LastDownloadAt,
    /// File size in bytes.
    Size,
    /// Current display name.
    DisplayName,
    /// Name given at upload time.
    OriginalName,
}

impl FileSortKey {
    /// Return the catalog column this key sorts on.
    pub fn as_column(&self) -> &'static str {
        match self {
            Self::UploadedAt => "uploaded_at",
            Self::LastDownloadAt => "last_download_at",
            Self::Size => "size",
            Self::DisplayName => "display_name",
            Self::OriginalName => "original_name",
        }
    }
}

impl Default for FileSortKey {
    fn default() -> Self {
        Self::UploadedAt
    }
}

impl fmt::Display for FileSortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UploadedAt => "uploaded_at",
            Self::LastDownloadAt => "last_download_at",
            Self::Size => "size",
            Self::DisplayName => "name",
            Self::OriginalName => "original_name",
        };
        write!(f, "{name}")
    }
}

impl FromStr for FileSortKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded_at" => Ok(Self::UploadedAt),
            "last_download_at" => Ok(Self::LastDownloadAt),
            "size" => Ok(Self::Size),
            "name" => Ok(Self::DisplayName),
            "original_name" => Ok(Self::OriginalName),
            _ => Err(AppError::invalid_input(format!(
                "Invalid sort key: '{s}'. Expected one of: uploaded_at, last_download_at, size, name, original_name"
            ))),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl Default for SortDirection {
    fn default() -> Self {
        Self::Asc
    }
}

impl SortDirection {
    /// Return the SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A sort specification consisting of a sort key and direction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FileSort {
    /// Column to sort by.
    pub key: FileSortKey,
    /// Sort direction.
    #[serde(default)]
    pub direction: SortDirection,
}

impl FileSort {
    /// Create a new sort specification.
    pub fn new(key: FileSortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Create an ascending sort on the given key.
    pub fn asc(key: FileSortKey) -> Self {
        Self::new(key, SortDirection::Asc)
    }

    /// Create a descending sort on the given key.
    pub fn desc(key: FileSortKey) -> Self {
        Self::new(key, SortDirection::Desc)
    }

    /// Parse a sort specification from caller input.
    ///
    /// A leading `-` selects descending order, mirroring the convention of
    /// the listing API (`"-size"` sorts largest first).
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.strip_prefix('-') {
            Some(key) => Ok(Self::desc(key.parse()?)),
            None => Ok(Self::asc(s.parse()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_from_str() {
        assert_eq!("size".parse::<FileSortKey>().unwrap(), FileSortKey::Size);
        assert_eq!(
            "name".parse::<FileSortKey>().unwrap(),
            FileSortKey::DisplayName
        );
        assert!("owner".parse::<FileSortKey>().is_err());
    }

    #[test]
    fn test_parse_descending_prefix() {
        let sort = FileSort::parse("-size").unwrap();
        assert_eq!(sort.key, FileSortKey::Size);
        assert_eq!(sort.direction, SortDirection::Desc);

        let sort = FileSort::parse("uploaded_at").unwrap();
        assert_eq!(sort.direction, SortDirection::Asc);
    }
}
