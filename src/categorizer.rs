use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::classifier::numeric_value;
use crate::error::Result;
use crate::models::{CategoryRule, CellValue, Table};
use crate::settings::Settings;

/// Category rules keyed by `(debit, credit, sign)`, keeping the first rule per key.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<CategoryRule>,
    index: HashMap<(i64, i64, char), usize>,
}

impl RuleTable {
    pub fn from_rules(rules: Vec<CategoryRule>) -> Self {
        let mut index = HashMap::new();
        for (i, rule) in rules.iter().enumerate() {
            let key = (rule.debit_account, rule.credit_account, rule.sign);
            if index.contains_key(&key) {
                tracing::debug!(?key, label = %rule.operation_label, "duplicate rule ignored");
                continue;
            }
            index.insert(key, i);
        }
        Self { rules, index }
    }

    pub fn lookup(&self, debit: i64, credit: i64, sign: char) -> Option<&CategoryRule> {
        self.index.get(&(debit, credit, sign)).map(|&i| &self.rules[i])
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn parse_account(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

fn parse_rule(record: &csv::StringRecord) -> Option<CategoryRule> {
    if record.len() < 4 {
        return None;
    }
    let sign = match record[2].trim() {
        "+" => '+',
        "-" => '-',
        _ => return None,
    };
    Some(CategoryRule {
        debit_account: parse_account(&record[0])?,
        credit_account: parse_account(&record[1])?,
        sign,
        operation_label: record[3].trim().to_string(),
    })
}

/// Read `debit;credit;sign;label` lines. Malformed lines are skipped with a warning.
pub fn read_rules<R: Read>(reader: R) -> Result<RuleTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b';')
        .flexible(true)
        .from_reader(reader);
    let mut rules = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        match parse_rule(&record) {
            Some(rule) => rules.push(rule),
            None => {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                tracing::warn!(line, record = ?record, "skipping malformed category rule");
            }
        }
    }
    Ok(RuleTable::from_rules(rules))
}

pub fn load_rules(path: &Path) -> Result<RuleTable> {
    let file = std::fs::File::open(path)?;
    let table = read_rules(std::io::BufReader::new(file))?;
    tracing::info!(rules = table.len(), path = %path.display(), "loaded category rules");
    Ok(table)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    pub resolved: usize,
    pub fallback: usize,
    pub unresolved: usize,
}

fn account_value(cell: &CellValue) -> Option<i64> {
    numeric_value(cell)
        .filter(|v| v.fract() == 0.0)
        .map(|v| v as i64)
}

fn sign_of(cell: Option<&CellValue>) -> char {
    match cell.and_then(numeric_value) {
        Some(v) if v < 0.0 => '-',
        _ => '+',
    }
}

/// Append the operation column: rule join on (debit, credit, sign), then the
/// special-account fallback. Unmatched records keep an empty label.
pub fn resolve_categories(table: &mut Table, rules: &RuleTable, settings: &Settings) -> ResolveSummary {
    let names = &settings.column_names;
    let debit_col = table.column_index(&names.debit_account);
    let credit_col = table.column_index(&names.credit_account);
    let amount_col = table.column_index(&names.local_debit);

    let mut summary = ResolveSummary::default();
    let mut labels = Vec::with_capacity(table.len());

    for (i, row) in table.rows.iter().enumerate() {
        let debit = debit_col.and_then(|c| account_value(&row[c]));
        let credit = credit_col.and_then(|c| account_value(&row[c]));
        let sign = sign_of(amount_col.map(|c| &row[c]));

        let matched = match (debit, credit) {
            (Some(d), Some(c)) => rules.lookup(d, c, sign).map(|r| r.operation_label.clone()),
            _ => None,
        };
        let label = match matched {
            Some(label) => {
                summary.resolved += 1;
                Some(label)
            }
            None => {
                let special = settings
                    .special_account
                    .is_some_and(|s| debit == Some(s) || credit == Some(s));
                if special {
                    summary.fallback += 1;
                    Some(settings.account_not_found_label.clone())
                } else {
                    summary.unresolved += 1;
                    tracing::debug!(record = i + 1, ?debit, ?credit, %sign, "no category rule");
                    None
                }
            }
        };
        labels.push(label.map(CellValue::Text).unwrap_or_default());
    }

    table.push_column(names.operation.clone(), labels);
    summary
}
