use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("XLSX writer error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Table region not found: {0}")]
    RegionNotFound(String),

    #[error("Column classification failed: {0}")]
    ColumnClassification(String),

    #[error("Output file is locked by another process: {}", .0.display())]
    OutputWriteConflict(PathBuf),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
