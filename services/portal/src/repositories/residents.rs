//! Resident directory repository over the UnitList sheet

use common::{Table, Workbook};
use tracing::info;

use crate::error::PortalResult;
use crate::models::resident::{
    Resident, UNIT_LIST_SHEET, insertion_index, refresh_display_names,
};

/// Where an inserted resident landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Inside or right after the rows of its stage
    StageGrouped,
    /// At the end of the sheet
    Appended,
}

impl Placement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Placement::StageGrouped => "stage-grouped",
            Placement::Appended => "appended",
        }
    }
}

/// Resident repository
#[derive(Clone)]
pub struct ResidentRepository {
    workbook: Workbook,
}

impl ResidentRepository {
    pub fn new(workbook: Workbook) -> Self {
        Self { workbook }
    }

    /// The UnitList sheet; it must exist
    pub async fn sheet(&self) -> PortalResult<Table> {
        Ok(self.workbook.require_sheet(UNIT_LIST_SHEET).await?)
    }

    /// Recompute display names, then store the sheet
    pub async fn save(&self, mut table: Table) -> PortalResult<()> {
        refresh_display_names(table.rows_mut());
        Ok(self.workbook.save(&table).await?)
    }

    /// Data rows with their sheet row indexes
    pub async fn list(&self) -> PortalResult<Vec<(usize, Resident)>> {
        let table = self.sheet().await?;
        Ok(table
            .rows()
            .iter()
            .enumerate()
            .skip(1)
            .map(|(idx, row)| (idx, Resident::from_row(row)))
            .collect())
    }

    /// Insert a resident inside its stage block; returns the row index used
    pub async fn insert(&self, resident: &Resident) -> PortalResult<(usize, Placement)> {
        let mut table = self.sheet().await?;
        let index = insertion_index(table.rows(), &resident.stage, &resident.unit_number);
        let placement = if index >= table.len() {
            Placement::Appended
        } else {
            Placement::StageGrouped
        };
        table.insert_row(index, resident.to_row());
        self.save(table).await?;

        info!(
            "Inserted resident {} for {} at row {}",
            resident.resident_name, resident.unit_number, index
        );
        Ok((index, placement))
    }
}
