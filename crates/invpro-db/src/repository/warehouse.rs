//! # Warehouse Repository
//!
//! Storage locations. Warehouses are referenced by items and by the from/to
//! fields of stock transactions, so they are never deleted.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::activity::insert_activity;
use invpro_core::catalog::NewWarehouse;
use invpro_core::{LogAction, NewActivity, Section, Warehouse};

pub(crate) async fn fetch_warehouse(conn: &mut SqliteConnection, id: i64) -> DbResult<Warehouse> {
    sqlx::query_as::<_, Warehouse>(
        "SELECT id, name, location, created_at FROM warehouses WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| DbError::not_found("Warehouse", id))
}

/// Repository for warehouse database operations.
#[derive(Debug, Clone)]
pub struct WarehouseRepository {
    pool: SqlitePool,
}

impl WarehouseRepository {
    /// Creates a new WarehouseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        WarehouseRepository { pool }
    }

    /// Lists all warehouses by name.
    pub async fn list(&self) -> DbResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as::<_, Warehouse>(
            "SELECT id, name, location, created_at FROM warehouses ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(warehouses)
    }

    /// Gets a warehouse by ID.
    pub async fn get(&self, id: i64) -> DbResult<Warehouse> {
        let mut conn = self.pool.acquire().await?;
        fetch_warehouse(&mut conn, id).await
    }

    /// Creates a warehouse.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - name already used
    pub async fn create(&self, input: &NewWarehouse, actor: &str) -> DbResult<Warehouse> {
        let input = input.normalized()?;
        debug!(name = %input.name, "Creating warehouse");

        let mut tx = self.pool.begin().await?;

        let id = sqlx::query("INSERT INTO warehouses (name, location) VALUES (?1, ?2)")
            .bind(&input.name)
            .bind(&input.location)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        insert_activity(
            &mut tx,
            &NewActivity::new(
                actor,
                LogAction::Create,
                Section::Warehouses,
                format!("Created warehouse '{}'", input.name),
            ),
        )
        .await?;

        let warehouse = fetch_warehouse(&mut tx, id).await?;
        tx.commit().await?;

        Ok(warehouse)
    }

    /// Renames or relocates a warehouse.
    pub async fn update(&self, id: i64, input: &NewWarehouse, actor: &str) -> DbResult<Warehouse> {
        let input = input.normalized()?;
        debug!(id = %id, "Updating warehouse");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE warehouses SET name = ?2, location = ?3 WHERE id = ?1")
            .bind(id)
            .bind(&input.name)
            .bind(&input.location)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Warehouse", id));
        }

        insert_activity(
            &mut tx,
            &NewActivity::new(
                actor,
                LogAction::Update,
                Section::Warehouses,
                format!("Updated warehouse #{} '{}'", id, input.name),
            ),
        )
        .await?;

        let warehouse = fetch_warehouse(&mut tx, id).await?;
        tx.commit().await?;

        Ok(warehouse)
    }

    /// Counts warehouses.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM warehouses")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use invpro_core::catalog::NewWarehouse;

    #[tokio::test]
    async fn test_create_update_and_duplicate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.warehouses();

        let main = repo.create(&NewWarehouse::new(" Main "), "admin").await.unwrap();
        assert_eq!(main.name, "Main");

        let dup = repo.create(&NewWarehouse::new("Main"), "admin").await;
        assert!(matches!(dup, Err(DbError::UniqueViolation { .. })));

        let moved = repo
            .update(
                main.id,
                &NewWarehouse {
                    name: "Main".to_string(),
                    location: Some("Dock 4".to_string()),
                },
                "admin",
            )
            .await
            .unwrap();
        assert_eq!(moved.location.as_deref(), Some("Dock 4"));

        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(db.activity().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_missing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let result = db.warehouses().update(42, &NewWarehouse::new("X"), "admin").await;
        assert!(matches!(result, Err(DbError::NotFound { .. })));
    }
}
