use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Canonical labels for the columns the assembler synthesizes or renames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub sequence: String,
    pub date: String,
    pub debit_account: String,
    pub credit_account: String,
    pub local_debit: String,
    pub local_credit: String,
    pub currency_debit: String,
    pub currency_credit: String,
    pub currency_amount_debit: String,
    pub currency_amount_credit: String,
    pub quantity_debit: String,
    pub quantity_credit: String,
    pub balance_local: String,
    pub balance_foreign: String,
    pub operation: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            sequence: "N".to_string(),
            date: "Дата".to_string(),
            debit_account: "Дебет".to_string(),
            credit_account: "Кредит".to_string(),
            local_debit: "Сума в грн дебет".to_string(),
            local_credit: "Сума в грн кредит".to_string(),
            currency_debit: "Валюта дебет".to_string(),
            currency_credit: "Валюта кредит".to_string(),
            currency_amount_debit: "Сума у вал. дебет".to_string(),
            currency_amount_credit: "Сума у вал. кредит".to_string(),
            quantity_debit: "Кількість дебет".to_string(),
            quantity_credit: "Кількість кредит".to_string(),
            balance_local: "Сальдо в грн".to_string(),
            balance_foreign: "Сальдо у валюті".to_string(),
            operation: "Операція".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_header_detector")]
    pub header_detector: String,
    #[serde(default = "default_date_column_in")]
    pub date_column_in: Vec<String>,
    #[serde(default = "default_columns_to_delete")]
    pub columns_to_delete: Vec<String>,
    #[serde(default = "default_columns_not_currency")]
    pub columns_not_currency: Vec<String>,
    #[serde(default)]
    pub column_names: ColumnNames,
    #[serde(default)]
    pub special_account: Option<i64>,
    #[serde(default = "default_account_not_found_label")]
    pub account_not_found_label: String,
    #[serde(default = "default_true")]
    pub move_processed: bool,
    #[serde(default = "default_source_dir")]
    pub source_dir: String,
    #[serde(default = "default_result_dir")]
    pub result_dir: String,
    #[serde(default = "default_converted_dir")]
    pub converted_dir: String,
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: String,
    #[serde(default = "default_rules_file")]
    pub rules_file: String,
    #[serde(default = "default_max_write_attempts")]
    pub max_write_attempts: u32,
}

fn default_header_detector() -> String {
    "Документ".to_string()
}

fn default_date_column_in() -> Vec<String> {
    ["Дата", "Период", "Період"].iter().map(|s| s.to_string()).collect()
}

fn default_columns_to_delete() -> Vec<String> {
    ["Показник", "Показатель"].iter().map(|s| s.to_string()).collect()
}

fn default_columns_not_currency() -> Vec<String> {
    ["шт", "кг", "л", "м", "т", "пог.м"].iter().map(|s| s.to_string()).collect()
}

fn default_account_not_found_label() -> String {
    "Рахунок не знайдено".to_string()
}

fn default_true() -> bool {
    true
}

fn default_source_dir() -> String {
    "source_files".to_string()
}

fn default_result_dir() -> String {
    "result_files".to_string()
}

fn default_converted_dir() -> String {
    "converted_files".to_string()
}

fn default_tmp_dir() -> String {
    "tmp".to_string()
}

fn default_rules_file() -> String {
    "categories.csv".to_string()
}

fn default_max_write_attempts() -> u32 {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            header_detector: default_header_detector(),
            date_column_in: default_date_column_in(),
            columns_to_delete: default_columns_to_delete(),
            columns_not_currency: default_columns_not_currency(),
            column_names: ColumnNames::default(),
            special_account: None,
            account_not_found_label: default_account_not_found_label(),
            move_processed: default_true(),
            source_dir: default_source_dir(),
            result_dir: default_result_dir(),
            converted_dir: default_converted_dir(),
            tmp_dir: default_tmp_dir(),
            rules_file: default_rules_file(),
            max_write_attempts: default_max_write_attempts(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("reledger")
}

pub fn default_settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Load settings from `path`, falling back to defaults when the file does not exist.
/// A file that exists but does not parse is an error rather than a silent reset.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "settings file not found, using defaults");
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| LedgerError::Settings(format!("{}: {e}", path.display())))
}

pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| LedgerError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> PathBuf {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return PathBuf::from(path.replacen('~', &home.to_string_lossy(), 1));
        }
    }
    PathBuf::from(path)
}
