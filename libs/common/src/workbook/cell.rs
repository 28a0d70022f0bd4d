//! Spreadsheet cell values

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single spreadsheet cell.
///
/// Cells keep the loose typing of a sheet: a value read back may be a number
/// where text was written, so callers compare through [`Cell::text`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

/// A row of cells
pub type Row = Vec<Cell>;

pub(crate) static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    /// Render the cell the way a sheet displays it.
    ///
    /// Integral numbers drop the fractional part so `12.0` reads as `12`.
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Bool(true) => "TRUE".to_string(),
            Cell::Bool(false) => "FALSE".to_string(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Cell::Text(s) => s.clone(),
        }
    }

    /// Trimmed text of the cell
    pub fn trimmed(&self) -> String {
        self.text().trim().to_string()
    }

    /// True for empty cells and whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Truthiness as a sheet formula would see it
    pub fn truthy(&self) -> bool {
        match self {
            Cell::Empty => false,
            Cell::Bool(b) => *b,
            Cell::Number(n) => *n != 0.0,
            Cell::Text(s) => !s.is_empty(),
        }
    }

    /// Boolean value of a checkbox cell or a `TRUE`/`FALSE` text cell
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Cell::Bool(b) => Some(*b),
            Cell::Text(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Cell::Text(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    /// Numeric value of a number cell or numeric text
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }
}

impl From<&String> for Cell {
    fn from(value: &String) -> Self {
        Cell::from(value.as_str())
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}
