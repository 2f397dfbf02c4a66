use std::collections::{BTreeSet, HashSet};

use crate::models::{CellValue, Grid, Table, TableRegion};

/// Row-aligned halves of the ledger: `primary.rows[i]` and `secondary.rows[i]`
/// are the two physical lines of transaction `i`.
#[derive(Debug, Clone)]
pub struct PairedTables {
    pub primary: Table,
    pub secondary: Table,
    /// Blank secondary rows inserted to restore alternation.
    pub synthesized: usize,
}

pub fn header_labels(grid: &Grid, header_row: usize, width: usize) -> Vec<String> {
    (0..width)
        .map(|col| grid.cell(header_row, col).to_text().trim().to_string())
        .collect()
}

/// Offsets of rows that need a blank row inserted after them: rows with a key value
/// that are not immediately followed by an empty key cell.
fn missing_secondary_rows(rows: &[Vec<CellValue>], key_col: usize) -> BTreeSet<usize> {
    let with_key: BTreeSet<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| !r[key_col].is_empty())
        .map(|(i, _)| i)
        .collect();
    let before_blank: HashSet<usize> = (0..rows.len().saturating_sub(1))
        .filter(|&i| rows[i + 1][key_col].is_empty())
        .collect();
    with_key
        .into_iter()
        .filter(|i| !before_blank.contains(i))
        .collect()
}

pub fn pair_rows(grid: &Grid, region: &TableRegion) -> PairedTables {
    let width = grid.col_count();
    let columns = header_labels(grid, region.header_row_index, width);
    let key_col = region.key_column_index;

    let sliced: Vec<Vec<CellValue>> = (region.data_start_row..=region.data_end_row)
        .map(|row| grid.row_padded(row, width))
        .collect();

    let missing = missing_secondary_rows(&sliced, key_col);
    let mut healed = Vec::with_capacity(sliced.len() + missing.len());
    for (i, row) in sliced.into_iter().enumerate() {
        healed.push(row);
        if missing.contains(&i) {
            healed.push(vec![CellValue::Empty; width]);
        }
    }

    let mut primary = Table::new(columns.clone());
    let mut secondary = Table::new(columns);
    for (i, row) in healed.into_iter().enumerate() {
        if i % 2 == 0 {
            primary.rows.push(row);
        } else {
            secondary.rows.push(row);
        }
    }
    while secondary.len() < primary.len() {
        secondary.rows.push(vec![CellValue::Empty; width]);
    }

    if !missing.is_empty() {
        tracing::debug!(
            inserted = missing.len(),
            "inserted blank secondary rows for transactions without one"
        );
    }

    PairedTables {
        primary,
        secondary,
        synthesized: missing.len(),
    }
}
