//! # User Repository
//!
//! Login accounts. Password hashes stay inside this module: reads return
//! [`User`], which carries no hash, and authentication happens here.
//!
//! ## Login
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  authenticate("clerk", "pw")                                            │
//! │       │                                                                 │
//! │       ├── SELECT id, password_hash WHERE username = ?                   │
//! │       │        └── no row ─────────────────┐                            │
//! │       ├── argon2 verify (constant time)    │                            │
//! │       │        └── mismatch ───────────────┤                            │
//! │       │                                    ▼                            │
//! │       │                        CoreError::InvalidCredentials            │
//! │       ▼                        (same error for both cases)              │
//! │  User { id, username, role_id, role_name, ... }                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::password::{hash_password, verify_password, verify_unknown_user};
use crate::repository::activity::insert_activity;
use invpro_core::catalog::NewUser;
use invpro_core::validation::validate_password;
use invpro_core::{CoreError, LogAction, NewActivity, Section, User};

const USER_SELECT: &str = r#"
    SELECT u.id, u.username, u.full_name, u.role_id,
           COALESCE(r.name, '') AS role_name,
           u.created_at, u.updated_at
    FROM users u
    LEFT JOIN roles r ON r.id = u.role_id
"#;

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: i64,
    password_hash: String,
}

pub(crate) async fn fetch_user(conn: &mut SqliteConnection, id: i64) -> DbResult<User> {
    sqlx::query_as::<_, User>(&format!("{} WHERE u.id = ?1", USER_SELECT))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::not_found("User", id))
}

pub(crate) async fn insert_user(
    conn: &mut SqliteConnection,
    username: &str,
    password_hash: &str,
    full_name: &str,
    role_id: i64,
) -> DbResult<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO users (username, password_hash, full_name, role_id)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .bind(full_name)
    .bind(role_id)
    .execute(conn)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// Repository for user accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Lists users by username.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!("{} ORDER BY u.username", USER_SELECT))
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    /// Gets a user by ID.
    pub async fn get(&self, id: i64) -> DbResult<User> {
        let mut conn = self.pool.acquire().await?;
        fetch_user(&mut conn, id).await
    }

    /// Verifies credentials.
    ///
    /// Unknown usernames and wrong passwords fail identically with
    /// `CoreError::InvalidCredentials`.
    pub async fn authenticate(&self, username: &str, password: &str) -> DbResult<User> {
        let username = username.trim();
        debug!(username = %username, "Authenticating");

        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, password_hash FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        let verified = match &row {
            Some(row) => verify_password(password, &row.password_hash),
            None => verify_unknown_user(password),
        };

        match row {
            Some(row) if verified => self.get(row.id).await,
            _ => Err(CoreError::InvalidCredentials.into()),
        }
    }

    /// Creates a user.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - username taken
    /// * `Err(DbError::ForeignKeyViolation)` - role does not exist
    pub async fn create(&self, input: &NewUser, actor: &str) -> DbResult<User> {
        let input = input.normalized()?;
        debug!(username = %input.username, "Creating user");

        let hash = hash_password(&input.password)?;

        let mut tx = self.pool.begin().await?;

        let id = insert_user(&mut tx, &input.username, &hash, &input.full_name, input.role_id).await?;

        insert_activity(
            &mut tx,
            &NewActivity::new(
                actor,
                LogAction::Create,
                Section::Users,
                format!("Created user '{}'", input.username),
            ),
        )
        .await?;

        let user = fetch_user(&mut tx, id).await?;
        tx.commit().await?;

        info!(username = %user.username, "User created");
        Ok(user)
    }

    /// Updates full name and role.
    pub async fn update(&self, id: i64, full_name: &str, role_id: i64, actor: &str) -> DbResult<User> {
        debug!(id = %id, role_id = %role_id, "Updating user");
        let full_name = full_name.trim();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE users SET
                full_name = ?2,
                role_id = ?3,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(role_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        let user = fetch_user(&mut tx, id).await?;

        insert_activity(
            &mut tx,
            &NewActivity::new(
                actor,
                LogAction::Update,
                Section::Users,
                format!("Updated user '{}' (role '{}')", user.username, user.role_name),
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Replaces a user's password.
    ///
    /// Used both for an administrator reset and for changing one's own
    /// password; the caller decides which section the log entry belongs to.
    pub async fn set_password(
        &self,
        id: i64,
        new_password: &str,
        actor: &str,
        section: Section,
    ) -> DbResult<()> {
        validate_password(new_password)?;
        debug!(id = %id, "Setting password");

        let hash = hash_password(new_password)?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE users SET password_hash = ?2, updated_at = CURRENT_TIMESTAMP WHERE id = ?1",
        )
        .bind(id)
        .bind(hash)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        let user = fetch_user(&mut tx, id).await?;

        insert_activity(
            &mut tx,
            &NewActivity::new(
                actor,
                LogAction::PasswordChange,
                section,
                format!("Changed password of '{}'", user.username),
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Deletes a user.
    pub async fn delete(&self, id: i64, actor: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting user");

        let mut tx = self.pool.begin().await?;
        let user = fetch_user(&mut tx, id).await?;

        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        insert_activity(
            &mut tx,
            &NewActivity::new(
                actor,
                LogAction::Delete,
                Section::Users,
                format!("Deleted user '{}'", user.username),
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Counts users.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
