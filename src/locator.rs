use crate::error::{LedgerError, Result};
use crate::fmt::parse_date;
use crate::models::{CellValue, Grid, TableRegion};
use crate::settings::Settings;

/// Rows inspected when looking for the header marker and the first transaction date.
pub const SCAN_WINDOW_ROWS: usize = 30;
/// Trailing key-column values inspected when looking for the last transaction date.
pub const TAIL_WINDOW_ROWS: usize = 10;

pub fn is_date(cell: &CellValue) -> bool {
    match cell {
        CellValue::Date(_) => true,
        CellValue::Text(s) => parse_date(s).is_some(),
        _ => false,
    }
}

struct Anchors {
    header_row: Option<usize>,
    key: Option<(usize, usize)>,
    // First date hit below the header outside the preferred columns.
    fallback_key: Option<(usize, usize)>,
}

fn is_preferred_column(grid: &Grid, header_row: usize, col: usize, preferred: &[String]) -> bool {
    if preferred.is_empty() {
        return true;
    }
    let label = grid.cell(header_row, col).to_text();
    preferred.iter().any(|p| p == label.trim())
}

/// Scan the prefix window for the header marker and the key-column date.
/// Returns as soon as both are settled.
fn scan_anchors(grid: &Grid, settings: &Settings) -> Anchors {
    let marker = settings.header_detector.as_str();
    let preferred = settings.date_column_in.as_slice();
    let mut anchors = Anchors {
        header_row: None,
        key: None,
        fallback_key: None,
    };
    let width = grid.col_count();

    for row in 0..grid.row_count().min(SCAN_WINDOW_ROWS) {
        for col in 0..width {
            let cell = grid.cell(row, col);

            if anchors.header_row.is_none() && cell.to_text().trim() == marker {
                anchors.header_row = Some(row);
                tracing::debug!(header_row = row, "found header marker");
                // A date seen before the header belongs to the report title, not the ledger.
                if let Some(key) = anchors.key.take() {
                    tracing::debug!(?key, "discarding date hit above the header");
                }
                continue;
            }

            if anchors.key.is_none() && is_date(cell) {
                match anchors.header_row {
                    None => anchors.key = Some((row, col)),
                    Some(h) if row > h => {
                        if is_preferred_column(grid, h, col, preferred) {
                            anchors.key = Some((row, col));
                            tracing::debug!(row, col, "found key column date");
                        } else if anchors.fallback_key.is_none() {
                            anchors.fallback_key = Some((row, col));
                        }
                    }
                    Some(_) => {}
                }
            }

            if anchors.header_row.is_some() && anchors.key.is_some() {
                return anchors;
            }
        }
    }
    anchors
}

/// Last data row (inclusive): the last key-column date among the trailing rows,
/// extended by one when the next key cell exists and is empty.
fn find_end_row(grid: &Grid, key_col: usize, data_start: usize) -> Option<usize> {
    let n = grid.row_count();
    for offset in 1..=TAIL_WINDOW_ROWS.min(n) {
        let row = n - offset;
        if row < data_start {
            break;
        }
        if is_date(grid.cell(row, key_col)) {
            let trailing_secondary = row + 1 < n && grid.cell(row + 1, key_col).is_empty();
            return Some(if trailing_secondary { row + 1 } else { row });
        }
    }
    None
}

pub fn locate_region(grid: &Grid, settings: &Settings) -> Result<TableRegion> {
    let anchors = scan_anchors(grid, settings);

    let header_row = anchors.header_row.ok_or_else(|| {
        LedgerError::RegionNotFound(format!(
            "header marker '{}' not found in the first {SCAN_WINDOW_ROWS} rows",
            settings.header_detector
        ))
    })?;
    let (data_start, key_col) = anchors.key.or(anchors.fallback_key).ok_or_else(|| {
        LedgerError::RegionNotFound(format!(
            "no date below the header in the first {SCAN_WINDOW_ROWS} rows"
        ))
    })?;
    let data_end = find_end_row(grid, key_col, data_start).ok_or_else(|| {
        LedgerError::RegionNotFound(format!(
            "no date among the last {TAIL_WINDOW_ROWS} values of column {key_col}"
        ))
    })?;

    let region = TableRegion {
        header_row_index: header_row,
        data_start_row: data_start,
        data_end_row: data_end,
        key_column_index: key_col,
    };
    tracing::debug!(?region, "located table region");
    Ok(region)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> CellValue {
        CellValue::text(s)
    }

    fn n(v: f64) -> CellValue {
        CellValue::Number(v)
    }

    fn settings() -> Settings {
        Settings {
            header_detector: "Документ".to_string(),
            date_column_in: vec!["Дата".to_string()],
            ..Settings::default()
        }
    }

    #[test]
    fn test_locates_six_row_ledger() {
        let grid = Grid::new(vec![
            vec![t("Дата"), t("Дебет"), t("Кредит"), t("Документ"), t("Сальдо")],
            vec![t("01.02.2024"), n(201.0), n(632.0), t("Накладна 1"), n(10.0)],
            vec![t(""), t(""), t(""), t(""), n(0.0)],
            vec![t("02.02.2024"), n(301.0), n(201.0), t("Платіж"), n(20.0)],
            vec![t(""), t(""), t(""), t(""), n(0.0)],
            vec![t("03.02.2024"), n(201.0), n(632.0), t("Накладна 2"), n(30.0)],
        ]);
        let region = locate_region(&grid, &settings()).unwrap();
        assert_eq!(region.header_row_index, 0);
        assert_eq!(region.data_start_row, 1);
        assert_eq!(region.key_column_index, 0);
        assert_eq!(region.data_end_row, 5);
    }

    #[test]
    fn test_skips_title_date_above_header() {
        let grid = Grid::new(vec![
            vec![t("Картка рахунку 201 за 01.01.2024")],
            vec![t("01.01.2024"), t("")],
            vec![t("Період"), t("Документ")],
            vec![t("05.01.2024"), t("Рахунок")],
            vec![t(""), t("")],
        ]);
        let s = Settings {
            date_column_in: vec![],
            ..settings()
        };
        let region = locate_region(&grid, &s).unwrap();
        assert_eq!(region.header_row_index, 2);
        assert_eq!(region.data_start_row, 3);
        assert_eq!(region.data_end_row, 4);
    }

    #[test]
    fn test_prefers_date_in_named_column() {
        let grid = Grid::new(vec![
            vec![t("Документ"), t("Створено"), t("Дата")],
            vec![t("Рахунок"), t("01.01.2024"), t("")],
            vec![t(""), t(""), t("")],
            vec![t("Акт"), t("02.01.2024"), t("03.01.2024")],
            vec![t(""), t(""), t("")],
        ]);
        let region = locate_region(&grid, &settings()).unwrap();
        assert_eq!(region.data_start_row, 3);
        assert_eq!(region.key_column_index, 2);
    }

    #[test]
    fn test_falls_back_to_unpreferred_date_column() {
        let grid = Grid::new(vec![
            vec![t("Документ"), t("Створено")],
            vec![t("Рахунок"), t("01.01.2024")],
            vec![t(""), t("")],
        ]);
        let region = locate_region(&grid, &settings()).unwrap();
        assert_eq!(region.data_start_row, 1);
        assert_eq!(region.key_column_index, 1);
        assert_eq!(region.data_end_row, 2);
    }

    #[test]
    fn test_end_row_ignores_footer() {
        let mut rows = vec![vec![t("Дата"), t("Документ")]];
        for day in 1..=3 {
            rows.push(vec![t(&format!("0{day}.03.2024")), t("Акт")]);
            rows.push(vec![t(""), t("")]);
        }
        rows.push(vec![t("Разом"), n(100.0)]);
        rows.push(vec![t("Сальдо на кінець"), n(50.0)]);
        let grid = Grid::new(rows);
        let region = locate_region(&grid, &settings()).unwrap();
        assert_eq!(region.data_start_row, 1);
        assert_eq!(region.data_end_row, 6);
    }

    #[test]
    fn test_end_row_stops_at_date_before_footer() {
        let grid = Grid::new(vec![
            vec![t("Дата"), t("Документ")],
            vec![t("01.03.2024"), t("Акт")],
            vec![t(""), t("")],
            vec![t("02.03.2024"), t("Акт")],
            vec![t("Разом"), n(100.0)],
        ]);
        let region = locate_region(&grid, &settings()).unwrap();
        assert_eq!(region.data_start_row, 1);
        assert_eq!(region.data_end_row, 3);
    }

    #[test]
    fn test_date_cells_count_as_dates() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(is_date(&CellValue::Date(date)));
        assert!(!is_date(&n(45000.0)));
    }

    #[test]
    fn test_missing_header_is_region_error() {
        let grid = Grid::new(vec![vec![t("01.01.2024")], vec![t("")]]);
        let err = locate_region(&grid, &settings()).unwrap_err();
        assert!(matches!(err, LedgerError::RegionNotFound(_)));
    }

    #[test]
    fn test_missing_date_is_region_error() {
        let grid = Grid::new(vec![vec![t("Документ")], vec![t("Акт")]]);
        let err = locate_region(&grid, &settings()).unwrap_err();
        assert!(matches!(err, LedgerError::RegionNotFound(_)));
    }

    #[test]
    fn test_header_outside_scan_window_is_not_found() {
        let mut rows: Vec<Vec<CellValue>> = (0..SCAN_WINDOW_ROWS).map(|_| vec![t("x")]).collect();
        rows.push(vec![t("Документ")]);
        rows.push(vec![t("01.01.2024")]);
        let grid = Grid::new(rows);
        assert!(locate_region(&grid, &settings()).is_err());
    }
}
