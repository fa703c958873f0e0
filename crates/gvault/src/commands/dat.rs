use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::AppConfig;
use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use gvault_dat::{HashCatalog, ImportOptions};
use miette::Result;

pub struct RenameByHashArgs {
    pub input_dir: String,
    pub dat_dir: Option<String>,
    pub cache_file: Option<String>,
    pub generate_cache: bool,
    pub strict: bool,
}

pub fn rename_by_hash(args: RenameByHashArgs, config: &AppConfig) -> Result<()> {
    let input_dir = Utf8PathBuf::from(&args.input_dir);
    let dat_dir = args.dat_dir.map(Utf8PathBuf::from).or(config.dat_dir.clone());
    let cache_file = args
        .cache_file
        .map(Utf8PathBuf::from)
        .or(config.dat_cache_file.clone());
    let options = ImportOptions {
        strict: args.strict || config.exit_on_failure,
    };

    let catalog = load_catalog(
        dat_dir.as_deref(),
        cache_file.as_deref(),
        args.generate_cache,
        options,
    )?;

    println_pad!(
        "{} {}",
        "🔎 Renaming files in:".bright_blue().bold(),
        input_dir.as_str().bright_cyan().bold()
    );
    let report = catalog.rename_files(&input_dir).map_err(CliError::from)?;

    for (old, new) in &report.renamed {
        println_pad!(
            "   {} {} {} {}",
            "•".bright_cyan(),
            old.file_name().unwrap_or(old.as_str()).dimmed(),
            "->".bright_white(),
            new.file_name().unwrap_or(new.as_str()).bright_green()
        );
    }
    for collision in &report.collisions {
        println_pad!(
            "   {} {} {}",
            "•".bright_red(),
            collision.as_str().bright_yellow(),
            "(target name already taken)".dimmed()
        );
    }

    println_pad!(
        "{} {} renamed, {} already named, {} unknown, {} collisions",
        "✅ Done:".bright_green().bold(),
        report.renamed.len().to_string().bright_white().bold(),
        report.already_named.len(),
        report.unmatched.len(),
        report.collisions.len()
    );

    if config.exit_on_failure && !report.collisions.is_empty() {
        return Err(CliError::BatchFailed {
            failed: report.collisions.len(),
            total: report.renamed.len() + report.collisions.len(),
        }
        .into());
    }
    Ok(())
}

/// Load from the cache when possible, otherwise import DAT files.
fn load_catalog(
    dat_dir: Option<&Utf8Path>,
    cache_file: Option<&Utf8Path>,
    generate_cache: bool,
    options: ImportOptions,
) -> Result<HashCatalog> {
    if let Some(cache) = cache_file.filter(|path| path.is_file() && !generate_cache) {
        let catalog = HashCatalog::import_cache(cache).map_err(CliError::from)?;
        println_pad!(
            "{} {} records from {}",
            "📚 Loaded".bright_blue().bold(),
            catalog.len().to_string().bright_white().bold(),
            cache.as_str().bright_cyan()
        );
        return Ok(catalog);
    }

    let Some(dat_dir) = dat_dir else {
        return Err(CliError::NoDatSource.into());
    };

    let mut catalog = HashCatalog::new();
    let summary = catalog
        .import_directory(dat_dir, options)
        .map_err(CliError::from)?;
    println_pad!(
        "{} {} records from {} DAT files",
        "📚 Imported".bright_blue().bold(),
        summary.records.to_string().bright_white().bold(),
        summary.files
    );
    if summary.skipped_records > 0 {
        println_pad!(
            "   {} {} malformed records skipped",
            "•".bright_yellow(),
            summary.skipped_records
        );
    }
    for failed in &summary.failed_files {
        println_pad!(
            "   {} {} {}",
            "•".bright_red(),
            failed.as_str().bright_yellow(),
            "(unreadable)".dimmed()
        );
    }

    if generate_cache {
        if let Some(cache) = cache_file {
            catalog.export_cache(cache).map_err(CliError::from)?;
            println_pad!(
                "{} {}",
                "💾 Wrote cache:".bright_green(),
                cache.as_str().bright_white().bold()
            );
        }
    }
    Ok(catalog)
}
