use std::io;
use std::path::Path;

use dialoguer::Confirm;
use rust_xlsxwriter::{Format, Workbook};

use crate::error::{LedgerError, Result};
use crate::fmt::datetime_to_excel_serial;
use crate::models::{CellValue, Table};

const DATE_FORMAT: &str = "dd.mm.yyyy";

/// Asked whether to try again after the output file turned out to be locked.
pub trait ConflictPrompt {
    fn retry(&mut self, path: &Path) -> bool;
}

impl<F: FnMut(&Path) -> bool> ConflictPrompt for F {
    fn retry(&mut self, path: &Path) -> bool {
        self(path)
    }
}

/// Terminal confirmation. A failed interaction counts as "no".
pub struct DialoguerPrompt;

impl ConflictPrompt for DialoguerPrompt {
    fn retry(&mut self, path: &Path) -> bool {
        Confirm::new()
            .with_prompt(format!(
                "{} is open in another program. Close it and retry?",
                path.display()
            ))
            .default(true)
            .interact()
            .unwrap_or(false)
    }
}

fn cell_pos(row: usize, col: usize) -> Result<(u32, u16)> {
    let row = u32::try_from(row).map_err(|_| LedgerError::Workbook(format!("row {row} out of range")))?;
    let col = u16::try_from(col).map_err(|_| LedgerError::Workbook(format!("column {col} out of range")))?;
    Ok((row, col))
}

/// Render the table as a single-sheet workbook. The header row is always written.
pub fn render_report(table: &Table) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(DATE_FORMAT);
    let sheet = workbook.add_worksheet();

    for (col, label) in table.columns.iter().enumerate() {
        let (r, c) = cell_pos(0, col)?;
        sheet.write_string_with_format(r, c, label, &header_format)?;
    }

    for (i, row) in table.rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            let (r, c) = cell_pos(i + 1, col)?;
            match cell {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    sheet.write_string(r, c, s)?;
                }
                CellValue::Number(n) => {
                    sheet.write_number(r, c, *n)?;
                }
                CellValue::Date(d) => {
                    sheet.write_number_with_format(r, c, datetime_to_excel_serial(d), &date_format)?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(windows)]
const LOCK_OS_ERRORS: &[i32] = &[32, 33]; // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
#[cfg(not(windows))]
const LOCK_OS_ERRORS: &[i32] = &[];

/// A write refused because another process holds the file.
pub fn is_locked(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::PermissionDenied
        || e.raw_os_error().is_some_and(|code| LOCK_OS_ERRORS.contains(&code))
}

fn write_with_retry<W, P>(
    bytes: &[u8],
    path: &Path,
    mut write: W,
    prompt: &mut P,
    max_attempts: u32,
) -> Result<()>
where
    W: FnMut(&Path, &[u8]) -> io::Result<()>,
    P: ConflictPrompt + ?Sized,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match write(path, bytes) {
            Ok(()) => return Ok(()),
            Err(e) if is_locked(&e) => {
                tracing::warn!(path = %path.display(), attempt, max_attempts, "output file is locked");
                if attempt >= max_attempts || !prompt.retry(path) {
                    return Err(LedgerError::OutputWriteConflict(path.to_path_buf()));
                }
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Write the report to `path`, asking `prompt` before each retry while the
/// file is locked. Gives up after `max_attempts` writes.
pub fn write_report<P>(table: &Table, path: &Path, prompt: &mut P, max_attempts: u32) -> Result<()>
where
    P: ConflictPrompt + ?Sized,
{
    let bytes = render_report(table)?;
    write_with_retry(&bytes, path, |p, b| std::fs::write(p, b), prompt, max_attempts)?;
    tracing::info!(path = %path.display(), rows = table.len(), "wrote report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Data, Reader};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample() -> Table {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Table {
            columns: vec!["N".into(), "Дата".into(), "Документ".into(), "Операція".into()],
            rows: vec![vec![
                CellValue::Number(1.0),
                CellValue::Date(date),
                CellValue::text("Накладна"),
                CellValue::Empty,
            ]],
        }
    }

    fn locked() -> io::Error {
        io::Error::new(io::ErrorKind::PermissionDenied, "locked")
    }

    #[test]
    fn test_write_report_readable_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");
        let mut never = |_: &Path| false;
        write_report(&sample(), &path, &mut never, 3).unwrap();

        let mut wb = open_workbook_auto(&path).unwrap();
        let range = wb.worksheet_range_at(0).unwrap().unwrap();
        assert_eq!(range.get_value((0, 1)), Some(&Data::String("Дата".into())));
        assert_eq!(range.get_value((1, 0)), Some(&Data::Float(1.0)));
        assert_eq!(range.get_value((1, 2)), Some(&Data::String("Накладна".into())));
        assert_eq!(range.height(), 2);
    }

    #[test]
    fn test_empty_table_still_has_header() {
        let table = Table::new(vec!["N".into()]);
        let bytes = render_report(&table).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_retries_until_write_succeeds() {
        let mut failures = 2;
        let mut asked = 0;
        let mut prompt = |_: &Path| {
            asked += 1;
            true
        };
        let writer = |_: &Path, _: &[u8]| {
            if failures > 0 {
                failures -= 1;
                Err(locked())
            } else {
                Ok(())
            }
        };
        write_with_retry(b"x", Path::new("out.xlsx"), writer, &mut prompt, 5).unwrap();
        assert_eq!(asked, 2);
    }

    #[test]
    fn test_declined_retry_is_conflict() {
        let mut prompt = |_: &Path| false;
        let err = write_with_retry(b"x", Path::new("out.xlsx"), |_, _| Err(locked()), &mut prompt, 5)
            .unwrap_err();
        assert!(matches!(err, LedgerError::OutputWriteConflict(_)));
    }

    #[test]
    fn test_attempts_are_bounded() {
        let mut writes = 0;
        let mut prompt = |_: &Path| true;
        let err = write_with_retry(
            b"x",
            Path::new("out.xlsx"),
            |_, _| {
                writes += 1;
                Err(locked())
            },
            &mut prompt,
            3,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::OutputWriteConflict(_)));
        assert_eq!(writes, 3);
    }

    #[test]
    fn test_is_locked() {
        assert!(is_locked(&locked()));
        assert!(!is_locked(&io::Error::new(io::ErrorKind::NotFound, "gone")));
    }

    #[cfg(windows)]
    #[test]
    fn test_sharing_violation_is_retried() {
        assert!(is_locked(&io::Error::from_raw_os_error(32)));
        assert!(is_locked(&io::Error::from_raw_os_error(33)));

        let mut failures = 1;
        let mut prompt = |_: &Path| true;
        let writer = |_: &Path, _: &[u8]| {
            if failures > 0 {
                failures -= 1;
                Err(io::Error::from_raw_os_error(32))
            } else {
                Ok(())
            }
        };
        write_with_retry(b"x", Path::new("out.xlsx"), writer, &mut prompt, 3).unwrap();
    }

    #[cfg(not(windows))]
    #[test]
    fn test_unix_errno_32_is_not_a_lock() {
        // EPIPE on unix
        assert!(!is_locked(&io::Error::from_raw_os_error(32)));
    }

    #[test]
    fn test_other_io_errors_are_not_retried() {
        let mut prompt = |_: &Path| -> bool { panic!("should not prompt") };
        let err = write_with_retry(
            b"x",
            Path::new("out.xlsx"),
            |_, _| Err(io::Error::new(io::ErrorKind::NotFound, "gone")),
            &mut prompt,
            3,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Io(_)));
    }
}
