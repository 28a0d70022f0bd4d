//! Fault log repository

use common::{Cell, Table, Workbook};
use serde_json::{Value, json};
use tracing::info;

use crate::error::PortalResult;
use crate::models::fault::{FAULT_LOG_SHEET, FaultRecord, columns};

/// Sheet holding fault reports imported from the previous system
pub const LEGACY_LOG_SHEET: &str = "LegacyLog";

/// Fault log repository
#[derive(Clone)]
pub struct FaultRepository {
    workbook: Workbook,
}

impl FaultRepository {
    pub fn new(workbook: Workbook) -> Self {
        Self { workbook }
    }

    /// The FaultLog sheet; it must exist
    pub async fn sheet(&self) -> PortalResult<Table> {
        Ok(self.workbook.require_sheet(FAULT_LOG_SHEET).await?)
    }

    pub async fn save(&self, table: &Table) -> PortalResult<()> {
        Ok(self.workbook.save(table).await?)
    }

    /// Every problem row, in sheet order
    pub async fn list(&self) -> PortalResult<Vec<FaultRecord>> {
        let table = self.sheet().await?;
        let map = table.column_map();
        Ok(table
            .rows()
            .iter()
            .skip(1)
            .map(|row| FaultRecord::from_row(row, &map))
            .collect())
    }

    /// Row index of a problem, matched on Internal ID
    pub fn find_row(table: &Table, internal_id: &str) -> Option<usize> {
        let col = *table.column_map().get(columns::INTERNAL_ID)?;
        (1..table.len()).find(|&row| table.get(row, col).text() == internal_id)
    }

    pub async fn find(&self, internal_id: &str) -> PortalResult<Option<FaultRecord>> {
        let table = self.sheet().await?;
        let map = table.column_map();
        Ok(Self::find_row(&table, internal_id)
            .map(|row| FaultRecord::from_row(&table.rows()[row], &map)))
    }

    /// Append a new problem, creating the sheet on first use
    pub async fn append(&self, record: &FaultRecord) -> PortalResult<()> {
        let mut table = self
            .workbook
            .sheet_or_create(FAULT_LOG_SHEET, &columns::ALL)
            .await?;
        let row = record.to_row(table.header());
        table.push_row(row);
        self.workbook.save(&table).await?;

        info!("Appended problem {} to {}", record.internal_id, FAULT_LOG_SHEET);
        Ok(())
    }

    /// Historical problems from LegacyLog (columns A to G), shaped like
    /// current problems
    pub async fn legacy(&self) -> PortalResult<Vec<Value>> {
        let table = self.workbook.require_sheet(LEGACY_LOG_SHEET).await?;
        let problems = table
            .rows()
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, row)| row.get(1).is_some_and(Cell::truthy))
            .map(|(i, row)| {
                let text = |idx: usize| row.get(idx).map(Cell::text).unwrap_or_default();
                let reported = text(0);
                let priority = text(5);
                json!({
                    "timestamp": reported,
                    "unitNumber": text(1),
                    "problemDescription": text(2),
                    "category": text(3),
                    "subCategory": text(4),
                    "problemPriority": if priority.is_empty() { "Medium".to_string() } else { priority },
                    "zone": text(6),
                    "problemStatus": "Completed",
                    "assignedTo": "",
                    "internalId": format!("LEGACY-{}", i),
                    "reportedBy": "Legacy Import",
                    "reporterEmail": "",
                    "unitPrimaryName": "",
                    "unitPrimaryEmail": "",
                    "unitPrimaryPhone": "",
                    "comments": "",
                    "completionDate": reported,
                    "lastUpdated": reported,
                    "reporterPhone": "",
                })
            })
            .collect();
        Ok(problems)
    }
}
