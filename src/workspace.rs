use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::Result;

/// Scratch directory owned by exactly one source file.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
}

/// Directory name for a source file: its file name with spaces replaced.
/// The extension is kept so `report.xls` and `report.xlsx` never share a directory.
pub fn workspace_name(source: &Path) -> String {
    source
        .file_name()
        .map(|n| n.to_string_lossy().replace(' ', "_"))
        .unwrap_or_else(|| "unnamed".to_string())
}

impl Workspace {
    /// Create (or reset) `tmp_root/<workspace_name>`.
    pub fn for_source(tmp_root: &Path, source: &Path) -> Result<Self> {
        let dir = tmp_root.join(workspace_name(source));
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the grid loader should read: a repaired copy for xlsx, the source itself otherwise.
    pub fn prepare(&self, source: &Path) -> Result<PathBuf> {
        let is_xlsx = source
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
        if !is_xlsx {
            return Ok(source.to_path_buf());
        }
        let target = self
            .dir
            .join(source.file_name().unwrap_or(OsStr::new("source.xlsx")));
        repair_xlsx(source, &target)?;
        Ok(target)
    }
}

fn merge_cells_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<mergeCells\b[^>]*/>|<mergeCells\b[^>]*>.*?</mergeCells>")
            .expect("static regex")
    })
}

fn is_worksheet_entry(name: &str) -> bool {
    name.starts_with("xl/worksheets/") && name.ends_with(".xml")
}

/// Rewrite a 1C xlsx so calamine can read it: fix the shared strings part name
/// and drop merged-cell declarations.
pub fn repair_xlsx(source: &Path, target: &Path) -> Result<()> {
    let mut archive = ZipArchive::new(BufReader::new(File::open(source)?))?;
    let mut writer = ZipWriter::new(BufWriter::new(File::create(target)?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut renamed = false;
    let mut stripped = 0usize;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if entry.is_dir() {
            writer.add_directory(name, options)?;
            continue;
        }
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;

        let name = if name == "xl/SharedStrings.xml" {
            renamed = true;
            "xl/sharedStrings.xml".to_string()
        } else {
            name
        };

        if is_worksheet_entry(&name) {
            let xml = String::from_utf8_lossy(&data);
            if merge_cells_re().is_match(&xml) {
                data = merge_cells_re().replace_all(&xml, "").into_owned().into_bytes();
                stripped += 1;
            }
        }

        writer.start_file(name, options)?;
        writer.write_all(&data)?;
    }
    writer.finish()?.flush()?;

    tracing::debug!(
        source = %source.display(),
        target = %target.display(),
        renamed_shared_strings = renamed,
        sheets_without_merges = stripped,
        "repaired xlsx container"
    );
    Ok(())
}

/// Remove the workspaces of `sources` below `tmp_root`. Anything else in the
/// directory is left alone. Failures are logged.
pub fn clean_workspaces(tmp_root: &Path, sources: &[PathBuf]) {
    tracing::info!("Clean tmp dir {}", tmp_root.display());
    for source in sources {
        let dir = tmp_root.join(workspace_name(source));
        if !dir.exists() {
            continue;
        }
        if let Err(e) = std::fs::remove_dir_all(&dir) {
            tracing::error!("Failed to delete {}: {e}", dir.display());
        }
    }
}
