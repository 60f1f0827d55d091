//! # Partner Repository
//!
//! Suppliers and customers. Both tables share one shape, so one repository
//! serves both, keyed by [`PartnerKind`].

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::activity::insert_activity;
use invpro_core::catalog::NewPartner;
use invpro_core::{LogAction, NewActivity, Partner, PartnerKind, Section};

pub(crate) async fn fetch_partner(
    conn: &mut SqliteConnection,
    kind: PartnerKind,
    id: i64,
) -> DbResult<Partner> {
    sqlx::query_as::<_, Partner>(&format!(
        "SELECT id, name, phone, address, created_at FROM {} WHERE id = ?1",
        kind.table()
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| DbError::not_found(kind.label(), id))
}

/// Repository for supplier and customer operations.
#[derive(Debug, Clone)]
pub struct PartnerRepository {
    pool: SqlitePool,
}

impl PartnerRepository {
    /// Creates a new PartnerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PartnerRepository { pool }
    }

    /// Lists partners of one kind by name.
    pub async fn list(&self, kind: PartnerKind) -> DbResult<Vec<Partner>> {
        let partners = sqlx::query_as::<_, Partner>(&format!(
            "SELECT id, name, phone, address, created_at FROM {} ORDER BY name, id",
            kind.table()
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(partners)
    }

    /// Gets a partner by ID.
    pub async fn get(&self, kind: PartnerKind, id: i64) -> DbResult<Partner> {
        let mut conn = self.pool.acquire().await?;
        fetch_partner(&mut conn, kind, id).await
    }

    /// Creates a supplier or customer.
    pub async fn create(&self, kind: PartnerKind, input: &NewPartner, actor: &str) -> DbResult<Partner> {
        let input = input.normalized()?;
        debug!(kind = kind.label(), name = %input.name, "Creating partner");

        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(&format!(
            "INSERT INTO {} (name, phone, address) VALUES (?1, ?2, ?3)",
            kind.table()
        ))
        .bind(&input.name)
        .bind(&input.phone)
        .bind(&input.address)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        insert_activity(
            &mut tx,
            &NewActivity::new(
                actor,
                LogAction::Create,
                Section::Partners,
                format!("Created {} '{}'", kind.label().to_lowercase(), input.name),
            ),
        )
        .await?;

        let partner = fetch_partner(&mut tx, kind, id).await?;
        tx.commit().await?;

        Ok(partner)
    }

    /// Updates a supplier or customer.
    pub async fn update(
        &self,
        kind: PartnerKind,
        id: i64,
        input: &NewPartner,
        actor: &str,
    ) -> DbResult<Partner> {
        let input = input.normalized()?;
        debug!(kind = kind.label(), id = %id, "Updating partner");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(&format!(
            "UPDATE {} SET name = ?2, phone = ?3, address = ?4 WHERE id = ?1",
            kind.table()
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.phone)
        .bind(&input.address)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(kind.label(), id));
        }

        insert_activity(
            &mut tx,
            &NewActivity::new(
                actor,
                LogAction::Update,
                Section::Partners,
                format!("Updated {} #{} '{}'", kind.label().to_lowercase(), id, input.name),
            ),
        )
        .await?;

        let partner = fetch_partner(&mut tx, kind, id).await?;
        tx.commit().await?;

        Ok(partner)
    }

    /// Counts partners of one kind.
    pub async fn count(&self, kind: PartnerKind) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", kind.table()))
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use invpro_core::catalog::NewPartner;
    use invpro_core::PartnerKind;

    #[tokio::test]
    async fn test_suppliers_and_customers_are_separate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.partners();

        let acme = repo
            .create(
                PartnerKind::Supplier,
                &NewPartner {
                    name: "Acme".to_string(),
                    phone: Some("+20 2 555 0101".to_string()),
                    address: None,
                },
                "admin",
            )
            .await
            .unwrap();
        repo.create(PartnerKind::Customer, &NewPartner::new("Walk-in"), "admin")
            .await
            .unwrap();

        assert_eq!(repo.count(PartnerKind::Supplier).await.unwrap(), 1);
        assert_eq!(repo.list(PartnerKind::Customer).await.unwrap()[0].name, "Walk-in");

        let renamed = repo
            .update(PartnerKind::Supplier, acme.id, &NewPartner::new("Acme Ltd"), "admin")
            .await
            .unwrap();
        assert_eq!(renamed.name, "Acme Ltd");
        assert_eq!(renamed.phone, None);

        let missing = repo.get(PartnerKind::Customer, 999).await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
    }
}
