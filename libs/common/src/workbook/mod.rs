//! Spreadsheet-shaped persistence
//!
//! A workbook is a set of named sheets and named ranges, each stored as a
//! plain list of rows. Handlers load a whole table, change it in memory and
//! save it back; there is no locking, so the last writer wins.

mod cell;
pub mod memory;
pub mod postgres;

pub use cell::{Cell, Row};

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use cell::EMPTY_CELL;

/// What a stored table represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKind {
    /// A sheet with a header row
    Sheet,
    /// A named range: a block of cells without a header
    NamedRange,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Sheet => "sheet",
            TableKind::NamedRange => "range",
        }
    }
}

/// Address of a table inside the workbook
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId {
    pub kind: TableKind,
    pub name: String,
}

impl TableId {
    pub fn sheet(name: impl Into<String>) -> Self {
        Self {
            kind: TableKind::Sheet,
            name: name.into(),
        }
    }

    pub fn range(name: impl Into<String>) -> Self {
        Self {
            kind: TableKind::NamedRange,
            name: name.into(),
        }
    }
}

/// A loaded sheet or named range
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    id: TableId,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(id: TableId, rows: Vec<Row>) -> Self {
        Self { id, rows }
    }

    pub fn id(&self) -> &TableId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row, which holds the column titles of a sheet
    pub fn header(&self) -> &[Cell] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Map from trimmed header text to column index.
    ///
    /// When a title repeats, the first column wins.
    pub fn column_map(&self) -> HashMap<String, usize> {
        let mut map = HashMap::new();
        for (idx, cell) in self.header().iter().enumerate() {
            let title = cell.trimmed();
            if !title.is_empty() {
                map.entry(title).or_insert(idx);
            }
        }
        map
    }

    /// Cell at `(row, col)`; positions outside the table read as empty
    pub fn get(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Write a cell, padding the row with empty cells as needed.
    ///
    /// Writing below the last row grows the table.
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<Cell>) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let target = &mut self.rows[row];
        if target.len() <= col {
            target.resize(col + 1, Cell::Empty);
        }
        target[col] = value.into();
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Insert a row before `index`; an index past the end appends
    pub fn insert_row(&mut self, index: usize, row: Row) {
        let index = index.min(self.rows.len());
        self.rows.insert(index, row);
    }

    pub fn remove_row(&mut self, index: usize) -> Option<Row> {
        (index < self.rows.len()).then(|| self.rows.remove(index))
    }
}

/// Backend holding the raw rows of every table
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Rows of a table, or `None` when it does not exist
    async fn load(&self, id: &TableId) -> StoreResult<Option<Vec<Row>>>;

    /// Replace the rows of a table, creating it when missing
    async fn save(&self, id: &TableId, rows: &[Row]) -> StoreResult<()>;

    /// Names of all tables of one kind
    async fn list(&self, kind: TableKind) -> StoreResult<Vec<String>>;

    async fn health_check(&self) -> StoreResult<bool>;
}

/// Serialized workbook content, used for seeding a store
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkbookSnapshot {
    #[serde(default)]
    pub sheets: BTreeMap<String, Vec<Row>>,
    #[serde(default)]
    pub ranges: BTreeMap<String, Vec<Row>>,
}

impl WorkbookSnapshot {
    pub fn from_json(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json).map_err(|e| StoreError::Seed(e.to_string()))
    }

    fn tables(self) -> impl Iterator<Item = (TableId, Vec<Row>)> {
        let sheets = self
            .sheets
            .into_iter()
            .map(|(name, rows)| (TableId::sheet(name), rows));
        let ranges = self
            .ranges
            .into_iter()
            .map(|(name, rows)| (TableId::range(name), rows));
        sheets.chain(ranges)
    }
}

/// Typed access to the sheets and named ranges of one workbook
#[derive(Clone)]
pub struct Workbook {
    store: Arc<dyn SheetStore>,
}

impl Workbook {
    pub fn new(store: Arc<dyn SheetStore>) -> Self {
        Self { store }
    }

    async fn load(&self, id: TableId) -> StoreResult<Option<Table>> {
        debug!(kind = id.kind.as_str(), name = %id.name, "Loading table");
        Ok(self
            .store
            .load(&id)
            .await?
            .map(|rows| Table::new(id, rows)))
    }

    /// Sheet by name, if it exists
    pub async fn sheet(&self, name: &str) -> StoreResult<Option<Table>> {
        self.load(TableId::sheet(name)).await
    }

    /// Sheet by name, failing with `"<name> sheet not found"`
    pub async fn require_sheet(&self, name: &str) -> StoreResult<Table> {
        self.sheet(name)
            .await?
            .ok_or_else(|| StoreError::SheetNotFound(name.to_string()))
    }

    /// Named range by name, if it exists
    pub async fn named_range(&self, name: &str) -> StoreResult<Option<Table>> {
        self.load(TableId::range(name)).await
    }

    /// Named range by name, failing with `"Named range '<name>' not found"`
    pub async fn require_range(&self, name: &str) -> StoreResult<Table> {
        self.named_range(name)
            .await?
            .ok_or_else(|| StoreError::RangeNotFound(name.to_string()))
    }

    /// Sheet by name, created with the given header row when missing
    pub async fn sheet_or_create(&self, name: &str, headers: &[&str]) -> StoreResult<Table> {
        if let Some(table) = self.sheet(name).await? {
            return Ok(table);
        }

        info!("Creating sheet {}", name);
        let header: Row = headers.iter().map(|h| Cell::from(*h)).collect();
        let table = Table::new(TableId::sheet(name), vec![header]);
        self.save(&table).await?;
        Ok(table)
    }

    /// Persist a table, replacing whatever was stored before
    pub async fn save(&self, table: &Table) -> StoreResult<()> {
        self.store.save(&table.id, &table.rows).await
    }

    /// Append one row to an existing sheet
    pub async fn append_row(&self, sheet: &str, row: Row) -> StoreResult<()> {
        let mut table = self.require_sheet(sheet).await?;
        table.push_row(row);
        self.save(&table).await
    }

    pub async fn sheet_names(&self) -> StoreResult<Vec<String>> {
        self.store.list(TableKind::Sheet).await
    }

    pub async fn range_names(&self) -> StoreResult<Vec<String>> {
        self.store.list(TableKind::NamedRange).await
    }

    pub async fn health_check(&self) -> StoreResult<bool> {
        self.store.health_check().await
    }

    /// True when the store holds no sheet and no range
    pub async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.sheet_names().await?.is_empty() && self.range_names().await?.is_empty())
    }

    /// Write every table of a snapshot into the store
    pub async fn import(&self, snapshot: WorkbookSnapshot) -> StoreResult<usize> {
        let mut count = 0;
        for (id, rows) in snapshot.tables() {
            self.store.save(&id, &rows).await?;
            count += 1;
        }
        info!("Imported {} workbook tables", count);
        Ok(count)
    }
}
