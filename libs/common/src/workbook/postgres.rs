//! PostgreSQL workbook backend
//!
//! Each table is one row of `workbook_tables`, its cells stored as JSONB.
//! Run [`crate::database::run_migrations`] before first use.

use async_trait::async_trait;
use sqlx::{PgPool, Row as _, types::Json};
use tracing::debug;

use super::{Row, SheetStore, TableId, TableKind};
use crate::error::{StoreError, StoreResult};

/// Workbook store backed by PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SheetStore for PgStore {
    async fn load(&self, id: &TableId) -> StoreResult<Option<Vec<Row>>> {
        let row = sqlx::query(
            r#"
            SELECT rows
            FROM workbook_tables
            WHERE kind = $1 AND name = $2
            "#,
        )
        .bind(id.kind.as_str())
        .bind(&id.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::Query)?;

        match row {
            Some(row) => {
                let Json(rows): Json<Vec<Row>> = row
                    .try_get("rows")
                    .map_err(|e| StoreError::Seed(format!("{}: {}", id.name, e)))?;
                Ok(Some(rows))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, id: &TableId, rows: &[Row]) -> StoreResult<()> {
        debug!("Saving {} rows to {} {}", rows.len(), id.kind.as_str(), id.name);

        sqlx::query(
            r#"
            INSERT INTO workbook_tables (kind, name, rows)
            VALUES ($1, $2, $3)
            ON CONFLICT (kind, name)
            DO UPDATE SET rows = EXCLUDED.rows, updated_at = now()
            "#,
        )
        .bind(id.kind.as_str())
        .bind(&id.name)
        .bind(Json(rows))
        .execute(&self.pool)
        .await
        .map_err(StoreError::Query)?;

        Ok(())
    }

    async fn list(&self, kind: TableKind) -> StoreResult<Vec<String>> {
        let rows = sqlx::query("SELECT name FROM workbook_tables WHERE kind = $1 ORDER BY name")
            .bind(kind.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Query)?;

        Ok(rows.iter().map(|row| row.get("name")).collect())
    }

    async fn health_check(&self) -> StoreResult<bool> {
        crate::database::health_check(&self.pool).await
    }
}
