use crate::models::{CellValue, Table};

fn has_line_break(cell: &CellValue) -> bool {
    matches!(cell, CellValue::Text(s) if s.contains('\n'))
}

fn parts_of(cell: &CellValue) -> Vec<CellValue> {
    match cell {
        CellValue::Text(s) => s
            .replace("\r\n", "\n")
            .split('\n')
            .map(CellValue::text)
            .collect(),
        other => vec![other.clone()],
    }
}

/// Replace every column holding multi-line text with `<label>_0 .. <label>_{N-1}`.
/// Returns the number of columns split.
pub fn split_multiline_cells(table: &mut Table) -> usize {
    let mut split = 0;
    let mut col = 0;
    while col < table.width() {
        if !table.column(col).any(has_line_break) {
            col += 1;
            continue;
        }

        let label = table.columns[col].clone();
        let parts: Vec<Vec<CellValue>> = table.remove_column(col).iter().map(parts_of).collect();
        let count = parts.iter().map(Vec::len).max().unwrap_or(1);
        for k in 0..count {
            let values = parts
                .iter()
                .map(|p| p.get(k).cloned().unwrap_or_default())
                .collect();
            table.insert_column(col + k, format!("{label}_{k}"), values);
        }
        tracing::debug!(column = %label, parts = count, "split multi-line column");

        split += 1;
        col += count;
    }
    split
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> CellValue {
        CellValue::text(s)
    }

    #[test]
    fn test_splits_line_breaks_into_aligned_columns() {
        let mut table = Table {
            columns: vec!["N".into(), "Документ".into(), "Сума".into()],
            rows: vec![
                vec![CellValue::Number(1.0), t("a\nb"), CellValue::Number(5.0)],
                vec![CellValue::Number(2.0), t("c"), CellValue::Number(6.0)],
            ],
        };
        assert_eq!(split_multiline_cells(&mut table), 1);
        assert_eq!(table.columns, vec!["N", "Документ_0", "Документ_1", "Сума"]);
        assert_eq!(table.column(1).cloned().collect::<Vec<_>>(), vec![t("a"), t("c")]);
        assert_eq!(
            table.column(2).cloned().collect::<Vec<_>>(),
            vec![t("b"), CellValue::Empty]
        );
        assert_eq!(table.rows[1][3], CellValue::Number(6.0));
    }

    #[test]
    fn test_crlf_is_normalized() {
        let mut table = Table {
            columns: vec!["x".into()],
            rows: vec![vec![t("one\r\ntwo\r\nthree")]],
        };
        split_multiline_cells(&mut table);
        assert_eq!(table.columns, vec!["x_0", "x_1", "x_2"]);
        assert_eq!(table.rows[0][1], t("two"));
    }

    #[test]
    fn test_non_text_cells_stay_in_first_part() {
        let mut table = Table {
            columns: vec!["x".into()],
            rows: vec![vec![t("a\nb")], vec![CellValue::Number(3.0)]],
        };
        split_multiline_cells(&mut table);
        assert_eq!(table.rows[1], vec![CellValue::Number(3.0), CellValue::Empty]);
    }

    #[test]
    fn test_single_line_table_untouched() {
        let mut table = Table {
            columns: vec!["x".into()],
            rows: vec![vec![t("a")]],
        };
        let before = table.clone();
        assert_eq!(split_multiline_cells(&mut table), 0);
        assert_eq!(table, before);
    }
}
