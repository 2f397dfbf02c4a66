use comfy_table::{Cell, Table};

use crate::categorizer::{load_rules, RuleTable};
use crate::cli::settings_from;
use crate::error::Result;
use crate::settings::{shellexpand_path, Settings};

pub(crate) fn load_configured_rules(settings: &Settings) -> Result<RuleTable> {
    load_rules(&shellexpand_path(&settings.rules_file))
}

pub fn list(config: Option<&str>) -> Result<()> {
    let settings = settings_from(config)?;
    let rules = load_configured_rules(&settings)?;

    if rules.is_empty() {
        println!("No category rules in {}.", settings.rules_file);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Debit", "Credit", "Sign", "Operation"]);
    for rule in rules.rules() {
        table.add_row(vec![
            Cell::new(rule.debit_account),
            Cell::new(rule.credit_account),
            Cell::new(rule.sign),
            Cell::new(&rule.operation_label),
        ]);
    }
    println!("Category rules ({})\n{table}", rules.len());
    Ok(())
}
