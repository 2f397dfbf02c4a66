use std::io::{BufRead, Write};

use colored::Colorize;

use crate::cli::rules::load_configured_rules;
use crate::cli::settings_from;
use crate::error::Result;
use crate::pipeline::{run_batch, BatchOptions};
use crate::settings::shellexpand_path;
use crate::writer::DialoguerPrompt;

pub struct RunArgs<'a> {
    pub config: Option<&'a str>,
    pub source: Option<&'a str>,
    pub result: Option<&'a str>,
    pub no_move: bool,
    pub wait: bool,
}

pub fn run(args: RunArgs<'_>) -> Result<()> {
    let settings = settings_from(args.config)?;
    let rules = load_configured_rules(&settings)?;

    let mut options = BatchOptions::from_settings(&settings);
    if let Some(dir) = args.source {
        options.source_dir = shellexpand_path(dir);
    }
    if let Some(dir) = args.result {
        options.result_dir = shellexpand_path(dir);
    }
    if args.no_move {
        options.move_processed = false;
    }

    let summary = run_batch(&options, &rules, &settings, &mut DialoguerPrompt)?;

    for failure in &summary.failures {
        let name = failure
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("  {} {name} [{}]: {}", "failed".red(), failure.stage, failure.error);
    }
    let converted = format!("{} converted", summary.converted);
    let failed = format!("{} failed", summary.failed());
    println!(
        "{}, {}",
        converted.green().bold(),
        if summary.failed() > 0 { failed.red().bold() } else { failed.normal() }
    );
    print!("\x07");
    std::io::stdout().flush()?;

    if args.wait {
        println!("Press ENTER to exit.");
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
    }
    Ok(())
}
