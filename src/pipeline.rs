use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::assembler::assemble;
use crate::categorizer::{resolve_categories, ResolveSummary, RuleTable};
use crate::classifier::{classify, Classification};
use crate::error::{LedgerError, Result};
use crate::loader::{is_supported, load_grid};
use crate::locator::locate_region;
use crate::models::{Table, TableRegion};
use crate::pairer::pair_rows;
use crate::settings::{shellexpand_path, Settings};
use crate::splitter::split_multiline_cells;
use crate::workspace::{clean_workspaces, Workspace};
use crate::writer::{write_report, ConflictPrompt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Workspace,
    Load,
    Locate,
    Classify,
    Write,
    Move,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Workspace => "workspace",
            Stage::Load => "load",
            Stage::Locate => "locate",
            Stage::Classify => "classify",
            Stage::Write => "write",
            Stage::Move => "move",
        };
        f.write_str(name)
    }
}

type StageResult<T> = std::result::Result<T, (Stage, LedgerError)>;

fn at(stage: Stage) -> impl FnOnce(LedgerError) -> (Stage, LedgerError) {
    move |e| (stage, e)
}

/// Everything the pipeline learned about one file before writing it.
#[derive(Debug)]
pub struct Transformed {
    pub region: TableRegion,
    pub classification: Classification,
    pub synthesized: usize,
    pub categories: ResolveSummary,
    pub split_columns: usize,
    pub table: Table,
}

/// Load one source and run it through every stage up to, but not including, the writer.
pub fn transform_file(
    source: &Path,
    tmp_root: &Path,
    rules: &RuleTable,
    settings: &Settings,
) -> StageResult<Transformed> {
    let workspace = Workspace::for_source(tmp_root, source).map_err(at(Stage::Workspace))?;
    let readable = workspace.prepare(source).map_err(at(Stage::Workspace))?;
    let grid = load_grid(&readable).map_err(at(Stage::Load))?;

    let region = locate_region(&grid, settings).map_err(at(Stage::Locate))?;
    let paired = pair_rows(&grid, &region);
    let classification =
        classify(&paired, &settings.columns_not_currency).map_err(at(Stage::Classify))?;

    let mut table = assemble(&paired, &classification, &region, settings);
    let categories = resolve_categories(&mut table, rules, settings);
    let split_columns = split_multiline_cells(&mut table);

    tracing::info!(
        records = table.len(),
        resolved = categories.resolved,
        fallback = categories.fallback,
        unresolved = categories.unresolved,
        "transformed"
    );

    Ok(Transformed {
        region,
        classification,
        synthesized: paired.synthesized,
        categories,
        split_columns,
        table,
    })
}

/// Directories and switches for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub source_dir: PathBuf,
    pub result_dir: PathBuf,
    pub converted_dir: PathBuf,
    pub tmp_dir: PathBuf,
    pub move_processed: bool,
}

impl BatchOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            source_dir: shellexpand_path(&settings.source_dir),
            result_dir: shellexpand_path(&settings.result_dir),
            converted_dir: shellexpand_path(&settings.converted_dir),
            tmp_dir: shellexpand_path(&settings.tmp_dir),
            move_processed: settings.move_processed,
        }
    }
}

#[derive(Debug)]
pub struct FileFailure {
    pub file: PathBuf,
    pub stage: Stage,
    pub error: LedgerError,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub converted: usize,
    pub failures: Vec<FileFailure>,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

fn stem_key(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Report path for every source. Sources sharing a stem keep their whole file name
/// (`card.xls` gives `card.xls.xlsx`); names still equal ignoring case get a `_2`, `_3` suffix.
pub fn output_paths(result_dir: &Path, sources: &[PathBuf]) -> Vec<PathBuf> {
    let mut stems: HashMap<String, usize> = HashMap::new();
    for source in sources {
        *stems.entry(stem_key(source)).or_default() += 1;
    }

    let mut taken: HashSet<String> = HashSet::new();
    sources
        .iter()
        .map(|source| {
            let shared = stems.get(&stem_key(source)).copied().unwrap_or(0) > 1;
            let base = (if shared { source.file_name() } else { source.file_stem() })
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "report".to_string());
            let mut name = format!("{base}.xlsx");
            let mut n = 2;
            while !taken.insert(name.to_lowercase()) {
                name = format!("{base}_{n}.xlsx");
                n += 1;
            }
            if shared {
                tracing::debug!(source = %source.display(), %name, "stem shared with another source");
            }
            result_dir.join(name)
        })
        .collect()
}

/// Supported spreadsheets directly inside `dir`, sorted by name.
pub fn list_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if is_supported(&path) {
            files.push(path);
        } else {
            tracing::debug!(path = %path.display(), "skipping unsupported file");
        }
    }
    files.sort();
    Ok(files)
}

fn move_file(from: &Path, to_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(to_dir)?;
    let target = to_dir.join(from.file_name().unwrap_or_default());
    if std::fs::rename(from, &target).is_err() {
        std::fs::copy(from, &target)?;
        std::fs::remove_file(from)?;
    }
    Ok(target)
}

fn process_file<P>(
    source: &Path,
    output: &Path,
    options: &BatchOptions,
    rules: &RuleTable,
    settings: &Settings,
    prompt: &mut P,
) -> StageResult<()>
where
    P: ConflictPrompt + ?Sized,
{
    let transformed = transform_file(source, &options.tmp_dir, rules, settings)?;
    write_report(&transformed.table, output, prompt, settings.max_write_attempts)
        .map_err(at(Stage::Write))?;

    if options.move_processed {
        let moved = move_file(source, &options.converted_dir).map_err(at(Stage::Move))?;
        tracing::debug!(to = %moved.display(), "moved processed source");
    }
    Ok(())
}

/// Convert every supported file in the source directory. A failing file is logged
/// and recorded; the remaining files are still attempted.
pub fn run_batch<P>(
    options: &BatchOptions,
    rules: &RuleTable,
    settings: &Settings,
    prompt: &mut P,
) -> Result<BatchSummary>
where
    P: ConflictPrompt + ?Sized,
{
    if !options.source_dir.is_dir() {
        return Err(LedgerError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("source directory {} does not exist", options.source_dir.display()),
        )));
    }
    std::fs::create_dir_all(&options.result_dir)?;
    std::fs::create_dir_all(&options.tmp_dir)?;

    let sources = list_sources(&options.source_dir)?;
    tracing::info!(files = sources.len(), dir = %options.source_dir.display(), "starting batch");

    let outputs = output_paths(&options.result_dir, &sources);

    let mut summary = BatchSummary::default();
    for (source, output) in sources.iter().zip(&outputs) {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let span = tracing::info_span!("file", name = %name);
        let _enter = span.enter();

        match process_file(source, output, options, rules, settings, prompt) {
            Ok(()) => {
                tracing::info!(output = %output.display(), "converted");
                summary.converted += 1;
            }
            Err((stage, error)) => {
                tracing::error!(%stage, "{error}");
                summary.failures.push(FileFailure {
                    file: source.clone(),
                    stage,
                    error,
                });
            }
        }
    }

    clean_workspaces(&options.tmp_dir, &sources);
    Ok(summary)
}
