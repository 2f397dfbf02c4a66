use crate::error::{LedgerError, Result};
use crate::models::{CellValue, ColumnRole, Table};
use crate::pairer::PairedTables;

/// Outcome of coercing one cell to a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Value(f64),
    NotNumeric,
}

/// Coerce a cell to a number. Text accepts grouping spaces (including NBSP)
/// and a comma as decimal separator, as 1C writes amounts.
pub fn try_numeric(cell: &CellValue) -> Numeric {
    match cell {
        CellValue::Number(n) => Numeric::Value(*n),
        CellValue::Text(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
                .map(|c| if c == ',' { '.' } else { c })
                .collect();
            match cleaned.parse::<f64>() {
                Ok(v) if v.is_finite() => Numeric::Value(v),
                _ => Numeric::NotNumeric,
            }
        }
        CellValue::Empty | CellValue::Date(_) => Numeric::NotNumeric,
    }
}

pub fn numeric_value(cell: &CellValue) -> Option<f64> {
    match try_numeric(cell) {
        Numeric::Value(v) => Some(v),
        Numeric::NotNumeric => None,
    }
}

/// Non-empty values of a column, leaving out the last row (a possible total line)
/// when the table has more than one row.
fn body_values(table: &Table, col: usize) -> Vec<&CellValue> {
    let take = if table.len() > 1 { table.len() - 1 } else { table.len() };
    table
        .rows
        .iter()
        .take(take)
        .map(|r| &r[col])
        .filter(|c| !c.is_empty())
        .collect()
}

fn is_exclusion_token(cell: &CellValue, exclusions: &[String]) -> bool {
    let value = cell.to_text().trim().to_lowercase();
    exclusions.iter().any(|x| x.trim().to_lowercase() == value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ContentKind {
    Blank,
    Numeric,
    Code,
    Unit,
}

fn content_kind(table: &Table, col: usize, exclusions: &[String]) -> ContentKind {
    let values = body_values(table, col);
    if values.is_empty() {
        return ContentKind::Blank;
    }
    if values.iter().all(|c| matches!(try_numeric(c), Numeric::Value(_))) {
        return ContentKind::Numeric;
    }
    if values.iter().any(|c| is_exclusion_token(c, exclusions)) {
        ContentKind::Unit
    } else {
        ContentKind::Code
    }
}

/// Assign a role to every column of the secondary table from its content alone.
pub fn classify_secondary(secondary: &Table, exclusions: &[String]) -> Vec<ColumnRole> {
    let kinds: Vec<ContentKind> = (0..secondary.width())
        .map(|col| content_kind(secondary, col, exclusions))
        .collect();

    kinds
        .iter()
        .enumerate()
        .map(|(col, kind)| match kind {
            ContentKind::Numeric if col > 0 && kinds[col - 1] == ContentKind::Unit => {
                ColumnRole::Quantity
            }
            ContentKind::Numeric => ColumnRole::CurrencyAmount,
            ContentKind::Code => ColumnRole::CurrencyCode,
            ContentKind::Unit | ContentKind::Blank => ColumnRole::Unclassified,
        })
        .collect()
}

fn is_account_column(primary: &Table, col: usize) -> bool {
    let values = body_values(primary, col);
    !values.is_empty()
        && values.iter().all(|c| match try_numeric(c) {
            Numeric::Value(v) => v.fract() == 0.0,
            Numeric::NotNumeric => false,
        })
}

/// The first two integer-valued primary columns, left to right: (debit, credit).
pub fn find_account_columns(primary: &Table) -> Result<(usize, usize)> {
    let found: Vec<usize> = (0..primary.width())
        .filter(|&col| is_account_column(primary, col))
        .take(2)
        .collect();
    match found.as_slice() {
        [debit, credit] => Ok((*debit, *credit)),
        _ => Err(LedgerError::ColumnClassification(format!(
            "expected two integer account columns, found {}",
            found.len()
        ))),
    }
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub roles: Vec<ColumnRole>,
    pub debit_column: usize,
    pub credit_column: usize,
}

pub fn classify(paired: &PairedTables, exclusions: &[String]) -> Result<Classification> {
    let (debit_column, credit_column) = find_account_columns(&paired.primary)?;
    let roles = classify_secondary(&paired.secondary, exclusions);
    tracing::debug!(debit_column, credit_column, ?roles, "classified columns");
    Ok(Classification {
        roles,
        debit_column,
        credit_column,
    })
}
