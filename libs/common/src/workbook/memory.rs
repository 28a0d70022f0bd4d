//! In-process workbook backend

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{Row, SheetStore, TableId, TableKind, WorkbookSnapshot};
use crate::error::StoreResult;

/// Workbook store kept in memory, for development and tests
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<TableId, Vec<Row>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: WorkbookSnapshot) -> Self {
        Self {
            tables: RwLock::new(snapshot.tables().collect()),
        }
    }

    pub fn from_json(json: &str) -> StoreResult<Self> {
        Ok(Self::from_snapshot(WorkbookSnapshot::from_json(json)?))
    }
}

#[async_trait]
impl SheetStore for MemoryStore {
    async fn load(&self, id: &TableId) -> StoreResult<Option<Vec<Row>>> {
        Ok(self.tables.read().await.get(id).cloned())
    }

    async fn save(&self, id: &TableId, rows: &[Row]) -> StoreResult<()> {
        self.tables.write().await.insert(id.clone(), rows.to_vec());
        Ok(())
    }

    async fn list(&self, kind: TableKind) -> StoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .tables
            .read()
            .await
            .keys()
            .filter(|id| id.kind == kind)
            .map(|id| id.name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::Cell;

    #[tokio::test]
    async fn save_then_load_returns_rows() -> StoreResult<()> {
        let store = MemoryStore::new();
        let id = TableId::range("Roles");
        store.save(&id, &[vec![Cell::from("Resident")]]).await?;

        let rows = store.load(&id).await?.unwrap_or_default();
        assert_eq!(rows.len(), 1);
        assert!(store.load(&TableId::sheet("Roles")).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn list_filters_by_kind() -> StoreResult<()> {
        let store = MemoryStore::from_json(
            r#"{"sheets":{"UnitList":[],"FaultLog":[]},"ranges":{"Roles":[]}}"#,
        )?;
        assert_eq!(
            store.list(TableKind::Sheet).await?,
            vec!["FaultLog".to_string(), "UnitList".to_string()]
        );
        assert_eq!(store.list(TableKind::NamedRange).await?, vec!["Roles"]);
        Ok(())
    }

    #[test]
    fn memory_store_is_always_healthy() {
        let store = MemoryStore::new();
        let healthy = tokio_test::block_on(store.health_check());
        assert!(tokio_test::assert_ok!(healthy));
    }
}
