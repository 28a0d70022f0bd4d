//! Dropdown repository
//!
//! Every dropdown list lives in one `Type | Value` sheet. The sheet is kept
//! sorted: types in a fixed order, values by a per-type rule.

use common::{Cell, Row, Table, Workbook};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info};

use crate::error::PortalResult;
use crate::models::fault::{Priority, Status};
use crate::models::resident::unit_digits;

pub const DROPDOWNS_SHEET: &str = "Dropdowns";

/// Dropdown type names
pub mod kinds {
    pub const STATUS: &str = "Status";
    pub const PRIORITY: &str = "Priority";
    pub const CATEGORY: &str = "Category";
    pub const SUB_CATEGORY: &str = "Sub-Category";
    pub const ASSIGNED_TO: &str = "Assigned To";
    pub const UNIT_NUMBER: &str = "Unit Number";
    pub const REPORTED_BY: &str = "Reported By";
}

/// Types maintained from the maintenance portal, in sheet order
pub const PORTAL_TYPES: [&str; 5] = [
    kinds::STATUS,
    kinds::PRIORITY,
    kinds::CATEGORY,
    kinds::SUB_CATEGORY,
    kinds::ASSIGNED_TO,
];

/// Types maintained from the resident submission form
pub const SUBMISSION_TYPES: [&str; 2] = [kinds::UNIT_NUMBER, kinds::REPORTED_BY];

const HEADER: [&str; 2] = ["Type", "Value"];

/// One `Type | Value` row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropdownEntry {
    pub kind: String,
    pub value: String,
}

impl DropdownEntry {
    fn from_row(row: &[Cell]) -> Self {
        Self {
            kind: row.first().map(Cell::text).unwrap_or_default(),
            value: row.get(1).map(Cell::text).unwrap_or_default(),
        }
    }

    fn to_row(&self) -> Row {
        vec![Cell::from(&self.kind), Cell::from(&self.value)]
    }

    fn is_complete(&self) -> bool {
        !self.kind.is_empty() && !self.value.is_empty()
    }
}

/// Result of a change to the sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Done,
    Duplicate,
    Missing,
}

/// Result of deleting by trimmed match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    Removed(String),
    NotFound { available: Vec<String> },
}

/// Portal view of the dropdown lists
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalOptions {
    pub categories: Vec<String>,
    pub sub_categories: Vec<String>,
    pub priorities: Vec<String>,
    pub statuses: Vec<String>,
    pub assigned_to: Vec<String>,
}

/// Submission form view of the dropdown lists
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOptions {
    pub unit_numbers: Vec<String>,
    pub reported_by: Vec<String>,
}

/// Dropdown repository
#[derive(Clone)]
pub struct DropdownRepository {
    workbook: Workbook,
}

impl DropdownRepository {
    pub fn new(workbook: Workbook) -> Self {
        Self { workbook }
    }

    async fn sheet(&self) -> PortalResult<Table> {
        Ok(self.workbook.sheet_or_create(DROPDOWNS_SHEET, &HEADER).await?)
    }

    async fn save_sorted(&self, mut table: Table) -> PortalResult<()> {
        sort_rows(table.rows_mut());
        Ok(self.workbook.save(&table).await?)
    }

    /// Every data row, untrimmed
    pub async fn entries(&self) -> PortalResult<Vec<DropdownEntry>> {
        let table = self.sheet().await?;
        Ok(table
            .rows()
            .iter()
            .skip(1)
            .map(|row| DropdownEntry::from_row(row))
            .collect())
    }

    pub async fn portal_options(&self) -> PortalResult<PortalOptions> {
        let mut options = PortalOptions::default();
        for entry in self.entries().await?.into_iter().filter(DropdownEntry::is_complete) {
            let list = match entry.kind.as_str() {
                kinds::CATEGORY => &mut options.categories,
                kinds::SUB_CATEGORY => &mut options.sub_categories,
                kinds::PRIORITY => &mut options.priorities,
                kinds::STATUS => &mut options.statuses,
                kinds::ASSIGNED_TO => &mut options.assigned_to,
                _ => continue,
            };
            list.push(entry.value);
        }
        Ok(options)
    }

    /// Unit numbers and reporter names.
    ///
    /// With `trimmed` set, values are trimmed and `#REF` rows are skipped, as
    /// the public form expects.
    pub async fn submission_options(&self, trimmed: bool) -> PortalResult<SubmissionOptions> {
        let mut options = SubmissionOptions::default();
        for entry in self.entries().await? {
            let (kind, value) = if trimmed {
                (entry.kind.trim().to_string(), entry.value.trim().to_string())
            } else {
                (entry.kind, entry.value)
            };
            if kind.is_empty() || value.is_empty() {
                continue;
            }
            if trimmed && (kind == "#REF" || value == "#REF") {
                continue;
            }
            match kind.as_str() {
                kinds::UNIT_NUMBER => options.unit_numbers.push(value),
                kinds::REPORTED_BY => options.reported_by.push(value),
                _ => {}
            }
        }
        Ok(options)
    }

    /// Add a value unless the exact pair already exists, then re-sort
    pub async fn add(&self, kind: &str, value: &str) -> PortalResult<Mutation> {
        let mut table = self.sheet().await?;
        if position(&table, |e| e.kind == kind && e.value == value).is_some() {
            return Ok(Mutation::Duplicate);
        }

        table.push_row(
            DropdownEntry {
                kind: kind.to_string(),
                value: value.to_string(),
            }
            .to_row(),
        );
        self.save_sorted(table).await?;
        info!("Added dropdown value {} = {}", kind, value);
        Ok(Mutation::Done)
    }

    /// Rename the first matching value of a type, then re-sort
    pub async fn rename(&self, kind: &str, old_value: &str, new_value: &str) -> PortalResult<Mutation> {
        let mut table = self.sheet().await?;
        if old_value != new_value
            && position(&table, |e| e.kind == kind && e.value == new_value).is_some()
        {
            return Ok(Mutation::Duplicate);
        }

        let Some(row) = position(&table, |e| e.kind == kind && e.value == old_value) else {
            return Ok(Mutation::Missing);
        };
        table.set(row, 1, new_value);
        self.save_sorted(table).await?;
        Ok(Mutation::Done)
    }

    /// Delete the last exact match; the order of the rest is kept
    pub async fn remove_last(&self, kind: &str, value: &str) -> PortalResult<Mutation> {
        let mut table = self.sheet().await?;
        let found = (1..table.len()).rev().find(|&row| {
            let entry = DropdownEntry::from_row(&table.rows()[row]);
            entry.kind == kind && entry.value == value
        });

        match found {
            Some(row) => {
                table.remove_row(row);
                self.workbook.save(&table).await?;
                Ok(Mutation::Done)
            }
            None => Ok(Mutation::Missing),
        }
    }

    /// Delete the first row whose trimmed type and value match
    pub async fn remove_trimmed(&self, kind: &str, value: &str) -> PortalResult<Removal> {
        let mut table = self.sheet().await?;
        let found = position(&table, |e| e.kind.trim() == kind && e.value.trim() == value);

        match found {
            Some(row) => {
                let removed = table
                    .remove_row(row)
                    .map(|r| DropdownEntry::from_row(&r).value.trim().to_string())
                    .unwrap_or_default();
                self.workbook.save(&table).await?;
                Ok(Removal::Removed(removed))
            }
            None => {
                let available = table
                    .rows()
                    .iter()
                    .skip(1)
                    .map(|row| DropdownEntry::from_row(row))
                    .filter(|e| e.kind.trim() == kind)
                    .map(|e| e.value.trim().to_string())
                    .collect();
                Ok(Removal::NotFound { available })
            }
        }
    }

    /// Move a value to a new type and value, then re-sort.
    ///
    /// The row is found by trimmed match; the duplicate check skips it.
    pub async fn replace(
        &self,
        old_kind: &str,
        old_value: &str,
        new_kind: &str,
        new_value: &str,
    ) -> PortalResult<Mutation> {
        let mut table = self.sheet().await?;
        let Some(row) = position(&table, |e| e.kind.trim() == old_kind && e.value.trim() == old_value)
        else {
            return Ok(Mutation::Missing);
        };

        let duplicate = (1..table.len()).any(|other| {
            let entry = DropdownEntry::from_row(&table.rows()[other]);
            other != row && entry.kind == new_kind && entry.value == new_value
        });
        if duplicate {
            return Ok(Mutation::Duplicate);
        }

        table.set(row, 0, new_kind);
        table.set(row, 1, new_value);
        self.save_sorted(table).await?;
        Ok(Mutation::Done)
    }

    /// Replace every value of one type with `values`, then re-sort
    pub async fn replace_kind(&self, kind: &str, values: &[String]) -> PortalResult<()> {
        let mut table = self.sheet().await?;
        let header = table.rows().first().cloned().unwrap_or_default();
        let mut rows: Vec<Row> = table
            .rows()
            .iter()
            .skip(1)
            .filter(|row| DropdownEntry::from_row(row).kind != kind)
            .cloned()
            .collect();
        rows.extend(values.iter().map(|value| {
            DropdownEntry {
                kind: kind.to_string(),
                value: value.clone(),
            }
            .to_row()
        }));

        let all = table.rows_mut();
        all.clear();
        all.push(header);
        all.extend(rows);

        debug!("Replaced {} dropdown values of {}", values.len(), kind);
        self.save_sorted(table).await
    }
}

fn position(table: &Table, matches: impl Fn(&DropdownEntry) -> bool) -> Option<usize> {
    (1..table.len()).find(|&row| matches(&DropdownEntry::from_row(&table.rows()[row])))
}

/// Case-insensitive comparison with a case-sensitive tie break
pub fn text_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Lower-cased last word of a name
pub fn surname(name: &str) -> String {
    name.split_whitespace()
        .last()
        .unwrap_or_default()
        .to_lowercase()
}

fn type_rank(kind: &str) -> usize {
    PORTAL_TYPES
        .iter()
        .position(|t| *t == kind)
        .unwrap_or(PORTAL_TYPES.len())
}

fn value_cmp(kind: &str, a: &str, b: &str) -> Ordering {
    match kind {
        kinds::PRIORITY => {
            let rank = |v: &str| {
                Priority::parse(v)
                    .and_then(|p| Priority::ORDER.iter().position(|o| *o == p))
                    .unwrap_or(usize::MAX)
            };
            rank(a).cmp(&rank(b))
        }
        kinds::STATUS => {
            let rank = |v: &str| {
                Status::parse(v)
                    .and_then(|s| Status::ORDER.iter().position(|o| *o == s))
                    .unwrap_or(usize::MAX)
            };
            rank(a).cmp(&rank(b))
        }
        kinds::ASSIGNED_TO | kinds::REPORTED_BY => text_cmp(&surname(a), &surname(b)),
        kinds::UNIT_NUMBER => unit_digits(a).unwrap_or(0).cmp(&unit_digits(b).unwrap_or(0)),
        _ => text_cmp(a.trim(), b.trim()),
    }
}

/// Sort the data rows of a dropdown sheet, leaving the header in place
pub fn sort_rows(rows: &mut [Row]) {
    if rows.len() <= 2 {
        return;
    }
    rows[1..].sort_by(|a, b| {
        let a = DropdownEntry::from_row(a);
        let b = DropdownEntry::from_row(b);
        type_rank(&a.kind)
            .cmp(&type_rank(&b.kind))
            .then_with(|| text_cmp(&a.kind, &b.kind))
            .then_with(|| value_cmp(&a.kind, &a.value, &b.value))
    });
}
