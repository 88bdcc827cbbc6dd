//! File repository implementation.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use filedepot_core::error::{AppError, ErrorKind};
use filedepot_core::result::AppResult;
use filedepot_core::types::{FileFilter, FileSort};
use filedepot_entity::file::File;

/// Repository for file metadata CRUD and query operations.
///
/// Every returned [`File`] is hydrated with its recipient set from the
/// share table.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: SqlitePool,
}

impl FileRepository {
    /// Create a new file repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a file by primary key.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<File>> {
        let file = sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find file by id", e)
            })?;
        self.hydrate(file).await
    }

    /// Find a file by its active public link token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<File>> {
        let file = sqlx::query_as::<_, File>("SELECT * FROM files WHERE special_link_token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find file by token", e)
            })?;
        self.hydrate(file).await
    }

    /// Find a file by owner and original name.
    pub async fn find_by_owner_and_name(
        &self,
        owner_id: Uuid,
        original_name: &str,
    ) -> AppResult<Option<File>> {
        let file = sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE owner_id = $1 AND original_name = $2",
        )
        .bind(owner_id)
        .bind(original_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find file by name", e)
        })?;
        self.hydrate(file).await
    }

    /// List all files owned by the given user, newest first.
    pub async fn find_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<File>> {
        let mut files = sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE owner_id = $1 ORDER BY uploaded_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list files by owner", e)
        })?;
        self.hydrate_all(&mut files).await?;
        Ok(files)
    }

    /// List files across all owners with the given sort and filter.
    ///
    /// The ORDER BY clause is assembled from enum variants, never from
    /// caller text; filter values are always bound.
    pub async fn find_all(&self, sort: &FileSort, filter: &FileFilter) -> AppResult<Vec<File>> {
        let order = format!(
            "ORDER BY {} {}",
            sort.key.as_column(),
            sort.direction.as_sql()
        );

        let query = match filter {
            FileFilter::Owner(owner_id) => sqlx::query_as::<_, File>(&format!(
                "SELECT * FROM files WHERE owner_id = $1 {order}"
            ))
            .bind(*owner_id)
            .fetch_all(&self.pool)
            .await,
            FileFilter::OriginalNameContains(fragment) => sqlx::query_as::<_, File>(&format!(
                "SELECT * FROM files WHERE instr(lower(original_name), lower($1)) > 0 {order}"
            ))
            .bind(fragment.clone())
            .fetch_all(&self.pool)
            .await,
            FileFilter::NameContains(fragment) => sqlx::query_as::<_, File>(&format!(
                "SELECT * FROM files WHERE instr(lower(display_name), lower($1)) > 0 {order}"
            ))
            .bind(fragment.clone())
            .fetch_all(&self.pool)
            .await,
            FileFilter::SizeNear(target) => {
                let (low, high) = FileFilter::size_bounds(*target);
                sqlx::query_as::<_, File>(&format!(
                    "SELECT * FROM files WHERE size >= $1 AND size <= $2 {order}"
                ))
                .bind(low)
                .bind(high)
                .fetch_all(&self.pool)
                .await
            }
            FileFilter::UploadedOn(date) => {
                let (start, end) = day_bounds(*date);
                sqlx::query_as::<_, File>(&format!(
                    "SELECT * FROM files WHERE uploaded_at >= $1 AND uploaded_at < $2 {order}"
                ))
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await
            }
            FileFilter::LastDownloadOn(date) => {
                let (start, end) = day_bounds(*date);
                sqlx::query_as::<_, File>(&format!(
                    "SELECT * FROM files WHERE last_download_at IS NOT NULL \
                     AND last_download_at >= $1 AND last_download_at < $2 {order}"
                ))
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await
            }
            FileFilter::RecentlyDownloaded => {
                let cutoff = Utc::now() - Duration::hours(24);
                sqlx::query_as::<_, File>(&format!(
                    "SELECT * FROM files WHERE last_download_at IS NOT NULL \
                     AND last_download_at >= $1 {order}"
                ))
                .bind(cutoff)
                .fetch_all(&self.pool)
                .await
            }
        };

        let mut files = query
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list files", e))?;
        self.hydrate_all(&mut files).await?;
        Ok(files)
    }

    /// Insert a fully-built file row.
    pub async fn create(&self, file: &File) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "INSERT INTO files (id, owner_id, original_name, display_name, content_key, \
                                size, comment, uploaded_at, last_download_at, \
                                special_link_token, quarantined) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING *",
        )
        .bind(file.id)
        .bind(file.owner_id)
        .bind(&file.original_name)
        .bind(&file.display_name)
        .bind(&file.content_key)
        .bind(file.size)
        .bind(&file.comment)
        .bind(file.uploaded_at)
        .bind(file.last_download_at)
        .bind(&file.special_link_token)
        .bind(file.quarantined)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::duplicate(format!(
                    "A file named '{}' already exists for this owner",
                    file.original_name
                ))
            }
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::not_found("Owner not found")
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create file", e),
        })
    }

    /// Change a file's display name.
    pub async fn rename(&self, file_id: Uuid, display_name: &str) -> AppResult<File> {
        let file = sqlx::query_as::<_, File>(
            "UPDATE files SET display_name = $2 WHERE id = $1 RETURNING *",
        )
        .bind(file_id)
        .bind(display_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to rename file", e))?
        .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))?;
        self.hydrate_one(file).await
    }

    /// Replace a file's comment.
    pub async fn update_comment(&self, file_id: Uuid, comment: &str) -> AppResult<File> {
        let file =
            sqlx::query_as::<_, File>("UPDATE files SET comment = $2 WHERE id = $1 RETURNING *")
                .bind(file_id)
                .bind(comment)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to update comment", e)
                })?
                .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))?;
        self.hydrate_one(file).await
    }

    /// Add a user to a file's recipient set.
    ///
    /// Returns `false` when the user was already a recipient. Recipients
    /// form a set; re-inserting an existing pair is a no-op.
    pub async fn add_recipient(&self, file_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO file_recipients (file_id, user_id, shared_at) VALUES ($1, $2, $3) \
             ON CONFLICT DO NOTHING",
        )
        .bind(file_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::not_found("Recipient user not found")
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to add recipient", e),
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Set a file's public link token.
    ///
    /// A token collision surfaces as a Duplicate error via the unique
    /// index; callers mint a fresh token and retry.
    pub async fn set_special_link(&self, file_id: Uuid, token: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE files SET special_link_token = $2 WHERE id = $1")
            .bind(file_id)
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    AppError::duplicate("Link token already in use")
                }
                _ => AppError::with_source(ErrorKind::Database, "Failed to set link token", e),
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("File {file_id} not found")));
        }
        Ok(())
    }

    /// Record a download timestamp.
    ///
    /// Tolerates a concurrently deleted file; the download already
    /// happened, so there is nothing left to record against.
    pub async fn set_last_download(&self, file_id: Uuid, when: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE files SET last_download_at = $2 WHERE id = $1")
            .bind(file_id)
            .bind(when)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to record download", e)
            })?;
        Ok(())
    }

    /// Flag a file whose bytes are missing from the content store.
    pub async fn mark_quarantined(&self, file_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE files SET quarantined = $2 WHERE id = $1")
            .bind(file_id)
            .bind(true)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to quarantine file", e)
            })?;
        Ok(())
    }

    /// Delete a file by ID. Recipient rows cascade.
    pub async fn delete(&self, file_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(file_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete file", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Load the recipient set for an optional file.
    async fn hydrate(&self, file: Option<File>) -> AppResult<Option<File>> {
        match file {
            Some(file) => Ok(Some(self.hydrate_one(file).await?)),
            None => Ok(None),
        }
    }

    /// Load the recipient set for a single file.
    async fn hydrate_one(&self, mut file: File) -> AppResult<File> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM file_recipients WHERE file_id = $1 ORDER BY shared_at ASC",
        )
        .bind(file.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load recipients", e))?;

        file.recipients = rows.into_iter().map(|(id,)| id).collect();
        Ok(file)
    }

    /// Load recipient sets for a list of files.
    async fn hydrate_all(&self, files: &mut Vec<File>) -> AppResult<()> {
        for file in files.iter_mut() {
            let rows: Vec<(Uuid,)> = sqlx::query_as(
                "SELECT user_id FROM file_recipients WHERE file_id = $1 ORDER BY shared_at ASC",
            )
            .bind(file.id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to load recipients", e)
            })?;
            file.recipients = rows.into_iter().map(|(id,)| id).collect();
        }
        Ok(())
    }
}

/// UTC day window for a calendar-date filter: start inclusive, end exclusive.
fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_bounds_cover_exactly_one_day() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let (start, end) = day_bounds(date);
        assert_eq!(start.to_rfc3339(), "2026-03-15T00:00:00+00:00");
        assert_eq!(end - start, Duration::days(1));
    }
}
