//! Named range repository
//!
//! Named ranges have no header row: row 0 is the first entry. Two shapes
//! are served here. Email lists (`MtceTeamEmailList`, `ZoneRepEmailList`)
//! are edited row by row. Slot lists (`Categories`, `SubCategories`,
//! `AssignedBy`, `Roles`) are fixed-size single-column ranges where blank
//! cells are free slots.

use common::{Cell, Row, Table, Workbook};
use serde_json::{Value, json};
use tracing::info;

use crate::error::{PortalError, PortalResult};
use crate::repositories::dropdowns::text_cmp;

pub const MTCE_TEAM_RANGE: &str = "MtceTeamEmailList";
pub const ZONE_REP_RANGE: &str = "ZoneRepEmailList";

/// Cells of one email-list row, laid out for the target range
pub fn row_layout(range: &str, name: &str, email: &str, zone: &str) -> Vec<String> {
    let owned = |v: &str| v.to_string();
    match range {
        MTCE_TEAM_RANGE => vec![owned(name), owned(email)],
        ZONE_REP_RANGE => vec![owned(zone), owned(name), owned(email)],
        _ => {
            let first = if name.is_empty() { zone } else { name };
            vec![owned(first), owned(email)]
        }
    }
}

fn row_json(range: &str, index: usize, row: &[Cell]) -> Value {
    let text = |idx: usize| row.get(idx).map(Cell::text).unwrap_or_default();
    match range {
        MTCE_TEAM_RANGE => json!({ "rowIndex": index, "name": text(0), "email": text(1) }),
        ZONE_REP_RANGE => json!({
            "rowIndex": index,
            "zone": text(0),
            "name": text(1),
            "email": text(2),
        }),
        _ => json!({
            "rowIndex": index,
            "col1": text(0),
            "col2": text(1),
            "col3": text(2),
        }),
    }
}

/// A single-column named range edited through numbered slots
#[derive(Debug, Clone, Copy)]
pub struct SlotList {
    pub range: &'static str,
    /// Response key listing the entries
    pub key: &'static str,
    /// Singular label used in success messages
    pub label: &'static str,
    /// Label used when the range is full
    pub space_label: &'static str,
    /// Label used when an id is rejected
    pub id_label: &'static str,
}

pub const CATEGORIES: SlotList = SlotList {
    range: "Categories",
    key: "categories",
    label: "Category",
    space_label: "categories",
    id_label: "category",
};

pub const SUB_CATEGORIES: SlotList = SlotList {
    range: "SubCategories",
    key: "subCategories",
    label: "SubCategory",
    space_label: "subcategories",
    id_label: "subcategory",
};

pub const ASSIGNED_BY: SlotList = SlotList {
    range: "AssignedBy",
    key: "assignedBy",
    label: "Assigned By",
    space_label: "assigned by",
    id_label: "AssignedBy",
};

pub const ROLES: SlotList = SlotList {
    range: "Roles",
    key: "roles",
    label: "Role",
    space_label: "Roles",
    id_label: "Role",
};

/// Roles offered when the Roles range has not been set up
pub const DEFAULT_ROLES: [&str; 8] = [
    "Resident",
    "Director",
    "Management",
    "Residents-Committee",
    "Social-Committee",
    "Chairperson",
    "Treasurer",
    "Secretary",
];

impl SlotList {
    pub fn invalid_id(&self) -> PortalError {
        PortalError::validation(format!("Invalid {} ID", self.id_label))
    }

    fn missing(&self) -> PortalError {
        PortalError::not_found(format!("{} named range not found", self.range))
    }
}

/// Trimmed non-blank values of the first column
fn slot_values(table: &Table) -> Vec<String> {
    table
        .rows()
        .iter()
        .filter_map(|row| row.first())
        .map(Cell::trimmed)
        .filter(|v| !v.is_empty())
        .collect()
}

/// Sort values into the top of the range and blank the rest
fn compact(table: &mut Table, mut values: Vec<String>) -> Vec<String> {
    values.sort_by(|a, b| text_cmp(a, b));
    for slot in 0..table.len() {
        let cell = values.get(slot).map(Cell::from).unwrap_or(Cell::Empty);
        table.set(slot, 0, cell);
    }
    values
}

/// Named range repository
#[derive(Clone)]
pub struct NamedRangeRepository {
    workbook: Workbook,
}

impl NamedRangeRepository {
    pub fn new(workbook: Workbook) -> Self {
        Self { workbook }
    }

    pub async fn load(&self, range: &str) -> PortalResult<Table> {
        Ok(self.workbook.require_range(range).await?)
    }

    pub async fn save(&self, table: &Table) -> PortalResult<()> {
        Ok(self.workbook.save(table).await?)
    }

    /// Every row as a JSON object keyed by the range layout
    pub async fn rows_json(&self, range: &str) -> PortalResult<Vec<Value>> {
        let table = self.load(range).await?;
        Ok(table
            .rows()
            .iter()
            .enumerate()
            .map(|(idx, row)| row_json(range, idx, row))
            .collect())
    }

    fn check_row(table: &Table, row: usize) -> PortalResult<()> {
        if row >= table.len() {
            return Err(PortalError::validation(format!(
                "Row {} is outside {} ({} rows)",
                row,
                table.name(),
                table.len()
            )));
        }
        Ok(())
    }

    pub async fn update_cell(&self, range: &str, row: usize, col: usize, value: &str) -> PortalResult<()> {
        let mut table = self.load(range).await?;
        Self::check_row(&table, row)?;
        table.set(row, col, value);
        self.save(&table).await?;
        info!("Updated {} row {} col {}", range, row, col);
        Ok(())
    }

    pub async fn update_row(&self, range: &str, row: usize, values: &[String]) -> PortalResult<()> {
        let mut table = self.load(range).await?;
        Self::check_row(&table, row)?;
        for (col, value) in values.iter().enumerate() {
            table.set(row, col, value);
        }
        self.save(&table).await
    }

    pub async fn append_row(&self, range: &str, values: &[String]) -> PortalResult<()> {
        let mut table = self.load(range).await?;
        table.push_row(values.iter().map(Cell::from).collect());
        self.save(&table).await?;
        info!("Added row to {}", range);
        Ok(())
    }

    pub async fn delete_row(&self, range: &str, row: usize) -> PortalResult<()> {
        let mut table = self.load(range).await?;
        Self::check_row(&table, row)?;
        table.remove_row(row);
        self.save(&table).await?;
        info!("Deleted row {} from {}", row, range);
        Ok(())
    }

    /// Replace all rows of a range
    pub async fn replace_rows(&self, range: &str, rows: Vec<Row>) -> PortalResult<()> {
        let mut table = self.load(range).await?;
        *table.rows_mut() = rows;
        self.save(&table).await
    }

    async fn load_slots(&self, list: &SlotList) -> PortalResult<Table> {
        self.workbook
            .named_range(list.range)
            .await?
            .ok_or_else(|| list.missing())
    }

    /// Entries sorted and compacted to the top of the range
    pub async fn sorted_slots(&self, list: &SlotList) -> PortalResult<Vec<String>> {
        let mut table = self.load_slots(list).await?;
        let values = slot_values(&table);
        let values = compact(&mut table, values);
        self.save(&table).await?;
        Ok(values)
    }

    /// Non-blank entries with their 1-based slot numbers, in range order.
    ///
    /// `None` when the range does not exist.
    pub async fn filled_slots(&self, list: &SlotList) -> PortalResult<Option<Vec<(usize, String)>>> {
        let Some(table) = self.workbook.named_range(list.range).await? else {
            return Ok(None);
        };
        let entries = slot_values(&table)
            .into_iter()
            .enumerate()
            .map(|(idx, value)| (idx + 1, value))
            .collect();
        Ok(Some(entries))
    }

    /// Write `value` into the first free slot, then sort the range.
    ///
    /// Returns false when the range is full.
    pub async fn add_sorted(&self, list: &SlotList, value: &str) -> PortalResult<bool> {
        let mut table = self.load_slots(list).await?;
        let Some(slot) = Self::first_free(&table) else {
            return Ok(false);
        };
        table.set(slot, 0, value);
        let values = slot_values(&table);
        compact(&mut table, values);
        self.save(&table).await?;
        Ok(true)
    }

    /// Write `value` into the first free slot and return its 1-based number
    pub async fn fill_free_slot(&self, list: &SlotList, value: &str) -> PortalResult<Option<usize>> {
        let mut table = self.load_slots(list).await?;
        let Some(slot) = Self::first_free(&table) else {
            return Ok(None);
        };
        table.set(slot, 0, value);
        self.save(&table).await?;
        Ok(Some(slot + 1))
    }

    fn first_free(table: &Table) -> Option<usize> {
        (0..table.len()).find(|&slot| table.get(slot, 0).is_blank())
    }

    /// Overwrite a slot by its 1-based id; blank `value` clears it
    pub async fn set_slot(&self, list: &SlotList, id: Option<i64>, value: &str) -> PortalResult<()> {
        let mut table = self.load_slots(list).await?;
        let slot = match id {
            Some(id) if id >= 1 && (id as usize) <= table.len() => id as usize - 1,
            _ => return Err(list.invalid_id()),
        };
        let cell = if value.is_empty() { Cell::Empty } else { Cell::from(value) };
        table.set(slot, 0, cell);
        self.save(&table).await
    }
}
