use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::AppConfig;
use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use gvault_core::fs::replace_suffix;
use gvault_disc::{ChdManager, DiscKind};
use miette::Result;

fn manager(config: &AppConfig) -> ChdManager {
    ChdManager::new(config.toolbox())
}

pub fn create_container(
    chd: String,
    source: String,
    delete_source: bool,
    config: &AppConfig,
) -> Result<()> {
    let chd = Utf8PathBuf::from(chd);
    println_pad!(
        "{} {}",
        "💿 Creating container:".bright_blue().bold(),
        chd.as_str().bright_cyan().bold()
    );
    manager(config)
        .create(&chd, Utf8Path::new(&source), delete_source)
        .map_err(CliError::from)?;
    println_pad!("{}", "✅ Container created!".bright_green().bold());
    Ok(())
}

pub struct ExtractContainerArgs {
    pub chd: String,
    pub bin: Option<String>,
    pub toc: Option<String>,
    pub delete_container: bool,
}

pub fn extract_container(args: ExtractContainerArgs, config: &AppConfig) -> Result<()> {
    let chd = Utf8PathBuf::from(&args.chd);
    let bin = args
        .bin
        .map(Utf8PathBuf::from)
        .unwrap_or_else(|| chd.with_extension("bin"));
    let toc = args
        .toc
        .map(Utf8PathBuf::from)
        .unwrap_or_else(|| replace_suffix(&bin, ".bin", ".toc"));

    println_pad!(
        "{} {}",
        "📦 Extracting container:".bright_blue().bold(),
        chd.as_str().bright_cyan().bold()
    );
    manager(config)
        .extract(&chd, &bin, &toc, args.delete_container)
        .map_err(CliError::from)?;
    println_pad!(
        "{} {}",
        "📁 Wrote:".bright_yellow(),
        bin.as_str().bright_white().bold()
    );
    println_pad!("{}", "✅ Extraction complete!".bright_green().bold());
    Ok(())
}

/// Verify every container, reporting each result.
///
/// Stops at the first failure only when `exit_on_failure` is set.
pub fn verify_containers(chds: Vec<String>, config: &AppConfig) -> Result<()> {
    let manager = manager(config);
    let total = chds.len();
    let mut failed = 0;

    for chd in chds {
        let chd = Utf8PathBuf::from(chd);
        let outcome = manager.verify(&chd);
        match &outcome {
            Ok(true) => println_pad!("{} {}", "✓".bright_green(), chd.as_str().bright_white()),
            Ok(false) => println_pad!(
                "{} {} {}",
                "✗".bright_red(),
                chd.as_str().bright_white(),
                "(verification failed)".bright_yellow()
            ),
            Err(e) => println_pad!(
                "{} {} {}",
                "✗".bright_red(),
                chd.as_str().bright_white(),
                format!("({})", e).bright_yellow()
            ),
        }

        if !matches!(outcome, Ok(true)) {
            failed += 1;
            if config.exit_on_failure {
                return match outcome {
                    Err(e) => Err(CliError::from(e).into()),
                    _ => Err(CliError::BatchFailed { failed, total }.into()),
                };
            }
        }
    }

    if failed > 0 {
        return Err(CliError::BatchFailed { failed, total }.into());
    }
    println_pad!(
        "{} {} containers verified",
        "✅".bright_green(),
        total.to_string().bright_white().bold()
    );
    Ok(())
}

pub fn mount_container(chd: String, mount_dir: String, kind: DiscKind, config: &AppConfig) -> Result<()> {
    let chd = Utf8PathBuf::from(chd);
    let mount_dir = Utf8PathBuf::from(mount_dir);

    if ChdManager::is_mounted(&chd, &mount_dir) {
        println_pad!(
            "{} {}",
            "ℹ Already mounted at".bright_cyan(),
            mount_dir.as_str().bright_white().bold()
        );
        return Ok(());
    }

    println_pad!(
        "{} {} {}",
        "💿 Mounting".bright_blue().bold(),
        chd.as_str().bright_cyan().bold(),
        format!("({})", kind).dimmed()
    );
    manager(config)
        .mount(&chd, &mount_dir, kind)
        .map_err(CliError::from)?;
    println_pad!(
        "{} {}",
        "✅ Mounted at".bright_green().bold(),
        mount_dir.as_str().bright_white().bold()
    );
    Ok(())
}

pub fn unmount_container(chd: String, mount_dir: String, config: &AppConfig) -> Result<()> {
    let chd = Utf8PathBuf::from(chd);
    let mount_dir = Utf8PathBuf::from(mount_dir);
    manager(config)
        .unmount(&chd, &mount_dir)
        .map_err(CliError::from)?;
    println_pad!(
        "{} {}",
        "✅ Unmounted".bright_green().bold(),
        mount_dir.as_str().bright_white()
    );
    Ok(())
}

pub struct ArchiveContainerArgs {
    pub chd: String,
    pub zip: String,
    pub kind: DiscKind,
    pub delete_original: bool,
}

pub fn archive_container(args: ArchiveContainerArgs, config: &AppConfig) -> Result<()> {
    let chd = Utf8PathBuf::from(&args.chd);
    let zip = Utf8PathBuf::from(&args.zip);

    println_pad!(
        "{} {} {} {}",
        "🗜 Archiving".bright_blue().bold(),
        chd.as_str().bright_cyan().bold(),
        "->".bright_white(),
        zip.as_str().bright_cyan()
    );
    manager(config)
        .archive_to_zip(&chd, &zip, args.kind, args.delete_original)
        .map_err(CliError::from)?;
    println_pad!("{}", "✅ Archive written!".bright_green().bold());
    Ok(())
}
