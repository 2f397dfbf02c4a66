use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::rules::load_configured_rules;
use crate::cli::settings_from;
use crate::error::Result;
use crate::models::ColumnRole;
use crate::pipeline::transform_file;
use crate::settings::shellexpand_path;
use crate::workspace::clean_workspaces;

fn role_label(role: ColumnRole) -> &'static str {
    match role {
        ColumnRole::CurrencyCode => "currency code",
        ColumnRole::CurrencyAmount => "currency amount",
        ColumnRole::Quantity => "quantity",
        ColumnRole::Unclassified => "-",
    }
}

pub fn run(config: Option<&str>, file: &str, rows: usize) -> Result<()> {
    let settings = settings_from(config)?;
    let rules = load_configured_rules(&settings)?;
    let source = shellexpand_path(file);
    let tmp_root = shellexpand_path(&settings.tmp_dir);

    let result = transform_file(&source, &tmp_root, &rules, &settings);
    clean_workspaces(&tmp_root, std::slice::from_ref(&source));
    let transformed = result.map_err(|(stage, e)| {
        tracing::error!(%stage, "inspect failed");
        e
    })?;

    let region = &transformed.region;
    println!("{}", display_name(&source).bold());
    println!(
        "  header row {}, data rows {}..={}, key column {}",
        region.header_row_index + 1,
        region.data_start_row + 1,
        region.data_end_row + 1,
        region.key_column_index + 1
    );
    let class = &transformed.classification;
    println!(
        "  account columns: debit {}, credit {}",
        class.debit_column + 1,
        class.credit_column + 1
    );
    let roles: Vec<String> = class
        .roles
        .iter()
        .enumerate()
        .filter(|(_, r)| **r != ColumnRole::Unclassified)
        .map(|(i, r)| format!("{}={}", i + 1, role_label(*r)))
        .collect();
    if !roles.is_empty() {
        println!("  secondary columns: {}", roles.join(", "));
    }
    if transformed.synthesized > 0 {
        println!("  inserted {} blank secondary rows", transformed.synthesized);
    }
    let cats = transformed.categories;
    println!(
        "  operations: {} resolved, {} fallback, {} unresolved",
        cats.resolved, cats.fallback, cats.unresolved
    );
    if transformed.split_columns > 0 {
        println!("  split {} multi-line columns", transformed.split_columns);
    }

    let report = &transformed.table;
    let mut table = Table::new();
    table.set_header(report.columns.clone());
    for row in report.rows.iter().take(rows) {
        table.add_row(row.iter().map(|c| Cell::new(c.to_text())).collect::<Vec<_>>());
    }
    println!("{table}");
    if report.len() > rows {
        println!("  ... {} more records", report.len() - rows);
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
