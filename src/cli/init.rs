use colored::Colorize;

use crate::cli::settings_path;
use crate::error::{LedgerError, Result};
use crate::settings::{save_settings, shellexpand_path, Settings};

pub fn run(config: Option<&str>, force: bool) -> Result<()> {
    let path = settings_path(config);
    if path.exists() && !force {
        return Err(LedgerError::Settings(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    let settings = Settings::default();
    save_settings(&settings, &path)?;
    println!("Wrote settings to {}", path.display());

    for dir in [
        &settings.source_dir,
        &settings.result_dir,
        &settings.converted_dir,
        &settings.tmp_dir,
    ] {
        let dir = shellexpand_path(dir);
        std::fs::create_dir_all(&dir)?;
        println!("  {} {}", "dir".dimmed(), dir.display());
    }

    let rules = shellexpand_path(&settings.rules_file);
    if !rules.exists() {
        std::fs::write(&rules, "")?;
        println!("  {} {}", "rules".dimmed(), rules.display());
    }

    println!("{}", "Ready. Put 1C exports into the source directory and run `reledger run`.".green());
    Ok(())
}
