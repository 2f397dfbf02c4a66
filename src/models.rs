use chrono::NaiveDateTime;

use crate::fmt::{date_text, number_text};

/// A single untyped spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

impl CellValue {
    pub fn text(s: &str) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }

    /// A whitespace-only text cell counts as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// String form used for marker matching, labels and previews.
    pub fn to_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => number_text(*n),
            Self::Date(d) => date_text(d),
        }
    }
}

/// Raw decoded worksheet. Rows may be ragged; missing cells read as empty.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    rows: Vec<Vec<CellValue>>,
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl Grid {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Row `row` padded or truncated to `width` cells.
    pub fn row_padded(&self, row: usize, width: usize) -> Vec<CellValue> {
        (0..width).map(|col| self.cell(row, col).clone()).collect()
    }
}

/// Where inside the grid the usable ledger lives. `data_end_row` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRegion {
    pub header_row_index: usize,
    pub data_start_row: usize,
    pub data_end_row: usize,
    pub key_column_index: usize,
}

/// Labelled rectangular table; every row is as wide as `columns`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    pub fn column(&self, idx: usize) -> impl Iterator<Item = &CellValue> {
        self.rows.iter().map(move |r| &r[idx])
    }

    pub fn insert_column(&mut self, at: usize, label: String, values: Vec<CellValue>) {
        debug_assert_eq!(values.len(), self.rows.len());
        self.columns.insert(at, label);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.insert(at, value);
        }
    }

    pub fn push_column(&mut self, label: String, values: Vec<CellValue>) {
        let at = self.columns.len();
        self.insert_column(at, label, values);
    }

    pub fn remove_column(&mut self, idx: usize) -> Vec<CellValue> {
        self.columns.remove(idx);
        self.rows.iter_mut().map(|r| r.remove(idx)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    CurrencyCode,
    CurrencyAmount,
    Quantity,
    Unclassified,
}

/// One category rule row: `debit;credit;sign;label`.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRule {
    pub debit_account: i64,
    pub credit_account: i64,
    pub sign: char,
    pub operation_label: String,
}
