use std::ops::Range;

use crate::classifier::{numeric_value, Classification};
use crate::models::{CellValue, ColumnRole, Table, TableRegion};
use crate::pairer::PairedTables;
use crate::settings::{ColumnNames, Settings};

/// Foreign-currency or quantity data found on the secondary line of one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Companion {
    Currency { code: usize, amount: usize },
    Quantity(usize),
}

/// Column layout of one side (debit or credit) of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideLayout {
    pub account: usize,
    pub local_amount: Option<usize>,
    pub companion: Option<Companion>,
}

impl SideLayout {
    fn anchor(&self) -> usize {
        self.local_amount.unwrap_or(self.account)
    }
}

fn is_amount_column(primary: &Table, col: usize) -> bool {
    let mut values = primary.column(col).filter(|c| !c.is_empty()).peekable();
    values.peek().is_some() && values.all(|c| numeric_value(c).is_some())
}

fn find_companion(roles: &[ColumnRole], span: &Range<usize>) -> Option<Companion> {
    let pair = span.clone().find(|&k| {
        k + 1 < span.end
            && roles[k] == ColumnRole::CurrencyCode
            && roles[k + 1] == ColumnRole::CurrencyAmount
    });
    if let Some(code) = pair {
        return Some(Companion::Currency {
            code,
            amount: code + 1,
        });
    }
    span.clone()
        .find(|&k| roles[k] == ColumnRole::Quantity)
        .map(Companion::Quantity)
}

/// A side owns the columns strictly between its account column and `end`.
pub fn side_layout(primary: &Table, roles: &[ColumnRole], account: usize, end: usize) -> SideLayout {
    let span = (account + 1)..end.max(account + 1);
    SideLayout {
        account,
        local_amount: span.clone().find(|&col| is_amount_column(primary, col)),
        companion: find_companion(roles, &span),
    }
}

fn insert_companion(
    table: &mut Table,
    secondary: &Table,
    side: &SideLayout,
    labels: (&str, &str, &str),
) {
    let (code_label, amount_label, quantity_label) = labels;
    let at = side.anchor() + 1;
    let take = |col: usize| -> Vec<CellValue> { secondary.column(col).cloned().collect() };
    match side.companion {
        Some(Companion::Currency { code, amount }) => {
            table.insert_column(at, amount_label.to_string(), take(amount));
            table.insert_column(at, code_label.to_string(), take(code));
        }
        Some(Companion::Quantity(col)) => {
            table.insert_column(at, quantity_label.to_string(), take(col));
        }
        None => {}
    }
}

fn drop_columns(table: &mut Table, to_delete: &[String]) {
    let mut col = 0;
    while col < table.width() {
        let listed = to_delete.iter().any(|d| d == &table.columns[col]);
        let blank = table.column(col).all(CellValue::is_empty);
        if listed || blank {
            tracing::debug!(column = %table.columns[col], listed, blank, "dropping column");
            table.remove_column(col);
        } else {
            col += 1;
        }
    }
}

fn rename(table: &mut Table, col: usize, label: &str) {
    table.columns[col] = label.to_string();
}

/// Merge the paired tables into the normalized report: one row per transaction.
pub fn assemble(
    paired: &PairedTables,
    classification: &Classification,
    region: &TableRegion,
    settings: &Settings,
) -> Table {
    let names: &ColumnNames = &settings.column_names;
    let primary = &paired.primary;
    let secondary = &paired.secondary;
    let width = primary.width();
    let last = width.saturating_sub(1);

    let debit = side_layout(
        primary,
        &classification.roles,
        classification.debit_column,
        classification.credit_column,
    );
    let credit = side_layout(primary, &classification.roles, classification.credit_column, last);
    tracing::debug!(?debit, ?credit, "side layouts");

    let mut table = primary.clone();
    rename(&mut table, region.key_column_index, &names.date);
    rename(&mut table, debit.account, &names.debit_account);
    rename(&mut table, credit.account, &names.credit_account);
    if let Some(col) = debit.local_amount {
        rename(&mut table, col, &names.local_debit);
    }
    if let Some(col) = credit.local_amount {
        rename(&mut table, col, &names.local_credit);
    }

    // Credit first so the debit anchor index stays valid.
    insert_companion(
        &mut table,
        secondary,
        &credit,
        (&names.currency_credit, &names.currency_amount_credit, &names.quantity_credit),
    );
    insert_companion(
        &mut table,
        secondary,
        &debit,
        (&names.currency_debit, &names.currency_amount_debit, &names.quantity_debit),
    );

    table.push_column(
        names.balance_foreign.clone(),
        secondary.column(last).cloned().collect(),
    );
    let local_balance = table.width() - 2;
    rename(&mut table, local_balance, &names.balance_local);

    let sequence = (1..=table.len()).map(|i| CellValue::Number(i as f64)).collect();
    table.insert_column(0, names.sequence.clone(), sequence);

    drop_columns(&mut table, &settings.columns_to_delete);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::locator::locate_region;
    use crate::models::Grid;
    use crate::pairer::pair_rows;

    fn t(s: &str) -> CellValue {
        CellValue::text(s)
    }

    fn n(v: f64) -> CellValue {
        CellValue::Number(v)
    }

    fn run(grid: &Grid, settings: &Settings) -> Table {
        let region = locate_region(grid, settings).unwrap();
        let paired = pair_rows(grid, &region);
        let classification = classify(&paired, &settings.columns_not_currency).unwrap();
        assemble(&paired, &classification, &region, settings)
    }

    #[test]
    fn test_six_row_grid_yields_three_records() {
        let grid = Grid::new(vec![
            vec![t("Дата"), t("Дт"), t("Кт"), t("Документ"), t("Сальдо")],
            vec![t("01.02.2024"), n(201.0), n(632.0), t("Накладна 1"), n(10.5)],
            vec![t(""), t(""), t(""), t(""), t("")],
            vec![t("02.02.2024"), n(301.0), n(201.0), t("Платіж"), n(20.5)],
            vec![t(""), t(""), t(""), t(""), t("")],
            vec![t("03.02.2024"), n(201.0), n(632.0), t("Накладна 2"), n(30.5)],
        ]);
        let table = run(&grid, &Settings::default());
        assert_eq!(table.len(), 3);
        assert_eq!(table.columns[0], "N");
        let seq: Vec<&CellValue> = table.column(0).collect();
        assert_eq!(seq, vec![&n(1.0), &n(2.0), &n(3.0)]);
        assert_eq!(table.column_index("Дебет"), Some(2));
        assert_eq!(table.column_index("Кредит"), Some(3));
        assert_eq!(table.column_index("Сальдо в грн"), Some(5));
        // all-empty foreign balance column is dropped
        assert_eq!(table.column_index("Сальдо у валюті"), None);
    }

    fn row(cells: &[&str]) -> Vec<CellValue> {
        cells
            .iter()
            .map(|c| match c.parse::<f64>() {
                Ok(v) => n(v),
                Err(_) => t(c),
            })
            .collect()
    }

    fn currency_grid() -> Grid {
        Grid::new(vec![
            row(&["Картка рахунку 2222"]),
            row(&["Період", "Документ", "Показник", "Дебет", "Сума", "", "Кредит", "Сума", "", "Сальдо"]),
            row(&["10.01.2024", "Виписка 1", "БО", "2222", "4000.5", "", "311", "4000.5", "", "4000.5"]),
            row(&["", "", "Вал.", "", "USD", "100", "", "USD", "100", "100"]),
            row(&["11.01.2024", "Виписка 2", "БО", "311", "-1200.25", "", "2222", "1200.25", "", "2800.25"]),
            row(&["", "", "Вал.", "", "", "", "", "EUR", "30", "70"]),
            row(&["12.01.2024", "Акт", "БО", "361", "10.75", "", "702", "10.75", "", "2811"]),
            row(&["", "", "Вал.", "", "", "", "", "", "", ""]),
            row(&["Разом", "", "", "", "2811"]),
        ])
    }

    #[test]
    fn test_currency_columns_interleaved_after_local_amounts() {
        let table = run(&currency_grid(), &Settings::default());
        assert_eq!(
            table.columns,
            vec![
                "N",
                "Дата",
                "Документ",
                "Дебет",
                "Сума в грн дебет",
                "Валюта дебет",
                "Сума у вал. дебет",
                "Кредит",
                "Сума в грн кредит",
                "Валюта кредит",
                "Сума у вал. кредит",
                "Сальдо в грн",
                "Сальдо у валюті",
            ]
        );
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[0][5], t("USD"));
        assert_eq!(table.rows[0][6], n(100.0));
        assert_eq!(table.rows[1][9], t("EUR"));
        assert_eq!(table.rows[1][12], n(70.0));
    }

    #[test]
    fn test_quantity_column_for_unit_pairs() {
        let grid = Grid::new(vec![
            row(&["Дата", "Документ", "Дт", "Сума", "", "Кт", "Сальдо"]),
            row(&["01.03.2024", "Накладна", "281", "500.5", "", "631", "500.5"]),
            row(&["", "", "", "шт", "5", "", ""]),
            row(&["02.03.2024", "Накладна", "281", "300.25", "", "631", "800.75"]),
            row(&["", "", "", "шт", "3", "", ""]),
        ]);
        let table = run(&grid, &Settings::default());
        let qty = table.column_index("Кількість дебет").unwrap();
        assert_eq!(qty, table.column_index("Сума в грн дебет").unwrap() + 1);
        assert_eq!(table.rows[1][qty], n(3.0));
        assert_eq!(table.column_index("Валюта дебет"), None);
    }

    #[test]
    fn test_side_layout_without_local_amount_anchors_on_account() {
        let primary = Table {
            columns: vec!["a".into(), "b".into()],
            rows: vec![vec![n(201.0), n(632.0)]],
        };
        let roles = vec![ColumnRole::Unclassified, ColumnRole::Unclassified];
        let side = side_layout(&primary, &roles, 0, 1);
        assert_eq!(side.local_amount, None);
        assert_eq!(side.anchor(), 0);
    }
}
