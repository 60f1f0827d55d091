//! # Role Repository
//!
//! Named permission sets. The `permissions` column holds the JSON form of
//! [`PermissionSet`]; decoding drops unknown section keys.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::activity::insert_activity;
use invpro_core::catalog::validate_role_name;
use invpro_core::{LogAction, NewActivity, PermissionSet, Role, Section};

#[derive(sqlx::FromRow)]
struct RoleRow {
    id: i64,
    name: String,
    permissions: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<RoleRow> for Role {
    type Error = DbError;

    fn try_from(row: RoleRow) -> DbResult<Role> {
        Ok(Role {
            id: row.id,
            name: row.name,
            permissions: serde_json::from_str(&row.permissions)?,
            created_at: row.created_at,
        })
    }
}

pub(crate) async fn fetch_role(conn: &mut SqliteConnection, id: i64) -> DbResult<Role> {
    sqlx::query_as::<_, RoleRow>("SELECT id, name, permissions, created_at FROM roles WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::not_found("Role", id))?
        .try_into()
}

pub(crate) async fn insert_role(
    conn: &mut SqliteConnection,
    name: &str,
    permissions: &PermissionSet,
) -> DbResult<i64> {
    let json = serde_json::to_string(permissions)?;

    let id = sqlx::query("INSERT INTO roles (name, permissions) VALUES (?1, ?2)")
        .bind(name)
        .bind(json)
        .execute(conn)
        .await?
        .last_insert_rowid();

    Ok(id)
}

/// Repository for role operations.
#[derive(Debug, Clone)]
pub struct RoleRepository {
    pool: SqlitePool,
}

impl RoleRepository {
    /// Creates a new RoleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RoleRepository { pool }
    }

    /// Lists all roles by name.
    pub async fn list(&self) -> DbResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, permissions, created_at FROM roles ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Role::try_from).collect()
    }

    /// Gets a role by ID.
    pub async fn get(&self, id: i64) -> DbResult<Role> {
        let mut conn = self.pool.acquire().await?;
        fetch_role(&mut conn, id).await
    }

    /// Creates a role.
    pub async fn create(&self, name: &str, permissions: &PermissionSet, actor: &str) -> DbResult<Role> {
        let name = validate_role_name(name)?;
        debug!(name = %name, "Creating role");

        let mut tx = self.pool.begin().await?;
        let id = insert_role(&mut tx, &name, permissions).await?;

        insert_activity(
            &mut tx,
            &NewActivity::new(actor, LogAction::Create, Section::Roles, format!("Created role '{}'", name)),
        )
        .await?;

        let role = fetch_role(&mut tx, id).await?;
        tx.commit().await?;

        Ok(role)
    }

    /// Replaces a role's permission set.
    pub async fn update_permissions(
        &self,
        id: i64,
        permissions: &PermissionSet,
        actor: &str,
    ) -> DbResult<Role> {
        debug!(id = %id, "Updating role permissions");
        let json = serde_json::to_string(permissions)?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE roles SET permissions = ?2 WHERE id = ?1")
            .bind(id)
            .bind(json)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Role", id));
        }

        let role = fetch_role(&mut tx, id).await?;

        insert_activity(
            &mut tx,
            &NewActivity::new(
                actor,
                LogAction::PermissionChange,
                Section::Roles,
                format!(
                    "Updated permissions of role '{}' ({} visible sections)",
                    role.name,
                    role.permissions.visible_sections().len()
                ),
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(role)
    }

    /// Renames a role.
    pub async fn rename(&self, id: i64, name: &str, actor: &str) -> DbResult<Role> {
        let name = validate_role_name(name)?;
        debug!(id = %id, name = %name, "Renaming role");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE roles SET name = ?2 WHERE id = ?1")
            .bind(id)
            .bind(&name)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Role", id));
        }

        insert_activity(
            &mut tx,
            &NewActivity::new(
                actor,
                LogAction::Update,
                Section::Roles,
                format!("Renamed role #{} to '{}'", id, name),
            ),
        )
        .await?;

        let role = fetch_role(&mut tx, id).await?;
        tx.commit().await?;

        Ok(role)
    }

    /// Deletes a role that no user is assigned to.
    ///
    /// ## Returns
    /// * `Err(DbError::Domain(CoreError::Conflict))` - users still hold the role
    pub async fn delete(&self, id: i64, actor: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting role");

        let mut tx = self.pool.begin().await?;
        let role = fetch_role(&mut tx, id).await?;

        let assigned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role_id = ?1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        if assigned > 0 {
            return Err(DbError::conflict(format!(
                "Role '{}' is assigned to {} user(s)",
                role.name, assigned
            )));
        }

        sqlx::query("DELETE FROM roles WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        insert_activity(
            &mut tx,
            &NewActivity::new(
                actor,
                LogAction::Delete,
                Section::Roles,
                format!("Deleted role '{}'", role.name),
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Counts roles.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
