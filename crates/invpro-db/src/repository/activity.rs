//! # Activity Log Repository
//!
//! Append-only record of who did what, where.
//!
//! Mutating repositories write their entry through [`insert_activity`] on the
//! same connection as the change itself, so the log row commits or rolls back
//! together with it. Standalone events (login, logout, backups) use
//! [`ActivityRepository::log`].

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use invpro_core::{ActivityEntry, ActivityFilter, NewActivity};

/// Inserts one activity row on an open connection or transaction.
pub(crate) async fn insert_activity(conn: &mut SqliteConnection, entry: &NewActivity) -> DbResult<i64> {
    debug!(
        user = %entry.user,
        action = entry.action.as_str(),
        section = entry.section.as_str(),
        "Logging activity"
    );

    let result = sqlx::query(
        r#"
        INSERT INTO activity_log (user, action, section, details)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(&entry.user)
    .bind(entry.action)
    .bind(entry.section)
    .bind(&entry.details)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Repository for the activity log.
#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pool: SqlitePool,
}

impl ActivityRepository {
    /// Creates a new ActivityRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ActivityRepository { pool }
    }

    /// Appends a standalone entry.
    pub async fn log(&self, entry: &NewActivity) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        insert_activity(&mut conn, entry).await
    }

    /// Lists entries, newest first.
    ///
    /// ## Filters
    /// - `user`: exact username
    /// - `section` / `action`: exact match
    /// - `dates`: inclusive calendar dates on `created_at`
    /// - `search`: case-insensitive substring of `details`
    pub async fn list(&self, filter: &ActivityFilter) -> DbResult<Vec<ActivityEntry>> {
        let search = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let entries = sqlx::query_as::<_, ActivityEntry>(
            r#"
            SELECT id, user, action, section, details, created_at
            FROM activity_log
            WHERE (?1 IS NULL OR user = ?1)
              AND (?2 IS NULL OR section = ?2)
              AND (?3 IS NULL OR action = ?3)
              AND (?4 IS NULL OR date(created_at) >= ?4)
              AND (?5 IS NULL OR date(created_at) <= ?5)
              AND (?6 IS NULL OR LOWER(details) LIKE '%' || LOWER(?6) || '%')
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(filter.user.as_deref())
        .bind(filter.section)
        .bind(filter.action)
        .bind(filter.dates.from)
        .bind(filter.dates.to)
        .bind(search)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = entries.len(), "Listed activity");
        Ok(entries)
    }

    /// Counts all entries (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_log")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use invpro_core::{ActivityFilter, LogAction, NewActivity, Section};

    #[tokio::test]
    async fn test_log_and_filter() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.activity();

        repo.log(&NewActivity::new("admin", LogAction::Login, Section::Dashboard, "Signed in"))
            .await
            .unwrap();
        repo.log(&NewActivity::new("clerk", LogAction::Create, Section::Items, "Created item Widget"))
            .await
            .unwrap();

        let all = repo.list(&ActivityFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let by_user = repo
            .list(&ActivityFilter {
                user: Some("clerk".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_user.len(), 1);
        assert_eq!(by_user[0].section, Section::Items);
        assert_eq!(by_user[0].action, LogAction::Create);

        let by_text = repo
            .list(&ActivityFilter {
                search: Some("WIDGET".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_text.len(), 1);

        let by_section = repo
            .list(&ActivityFilter {
                section: Some(Section::Backup),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(by_section.is_empty());
    }
}
