use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::{LedgerError, Result};
use crate::fmt::excel_serial_to_datetime;
use crate::models::{CellValue, Grid};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["xls", "xlsx", "xlsb", "ods"];

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::text(if *b { "TRUE" } else { "FALSE" }),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(CellValue::Date)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s),
        Data::Error(_) => CellValue::Empty,
    }
}

/// Decode the first worksheet of any calamine-supported workbook into a grid.
/// Grid coordinates equal sheet coordinates even when the used range starts below A1.
pub fn load_grid(path: &Path) -> Result<Grid> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| LedgerError::Workbook(format!("failed to open {}: {e}", path.display())))?;

    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return Err(LedgerError::Workbook(format!(
            "{} contains no worksheets",
            path.display()
        )));
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| LedgerError::Workbook(format!("failed to read sheet '{sheet_name}': {e}")))?;

    let (start_row, start_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); start_row];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col];
        cells.extend(row.iter().map(convert_cell));
        rows.push(cells);
    }

    let grid = Grid::new(rows);
    tracing::debug!(
        sheet = %sheet_name,
        rows = grid.row_count(),
        cols = grid.col_count(),
        "loaded grid"
    );
    Ok(grid)
}
