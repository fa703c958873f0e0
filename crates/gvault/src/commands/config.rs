use crate::errors::CliError;
use crate::utils::config::{self, AppConfig};
use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use gvault_core::{Tool, ToolLocator};
use miette::Result;

/// Print a config path entry with status indicator
fn print_path_config(name: &str, path: Option<&Utf8Path>) {
    match path {
        Some(p) => {
            let status = if p.exists() {
                "✓".bright_green()
            } else {
                "✗".bright_red()
            };
            println!("  {} {} {}", format!("{}:", name).bright_white(), p, status);
        }
        None => {
            println!(
                "  {} {}",
                format!("{}:", name).bright_white(),
                "(not set)".bright_yellow()
            );
        }
    }
}

pub fn show_config() -> Result<()> {
    let cfg = config::load_config();
    let config_path = config::default_config_path()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    println!();
    println!("  {} {}", "config_file:".bright_white(), config_path);
    print_path_config("install_cache_dir", Some(cfg.install_cache_dir().as_path()));
    print_path_config("dat_dir", cfg.dat_dir.as_deref());
    print_path_config("dat_cache_file", cfg.dat_cache_file.as_deref());
    println!(
        "  {} {}",
        "exit_on_failure:".bright_white(),
        cfg.exit_on_failure
    );

    println!();
    println!("  {}", "tools:".bright_white());
    let locator = cfg.tool_locator();
    for tool in Tool::ALL {
        match locator.locate(tool) {
            Some(path) => println!("    {} {} {}", "✓".bright_green(), tool, path),
            None => println!(
                "    {} {} {}",
                "✗".bright_red(),
                tool,
                "(not found)".bright_yellow()
            ),
        }
    }

    println!();
    Ok(())
}

pub fn set_tool_path(tool: Tool, path: String) -> Result<()> {
    let path = Utf8PathBuf::from(path);
    if !path.is_file() {
        eprintln!(
            "  {} {}",
            "•".bright_red(),
            format!("'{}' is not a file", path).bright_yellow()
        );
        return Err(CliError::MissingInput { path }.into());
    }

    let mut cfg = config::load_config();
    cfg.tools.insert(tool.name().to_string(), path.clone());
    config::save_config(&cfg).map_err(|source| CliError::ConfigWrite { source })?;

    println!(
        "{}",
        format!("✓ {} path set successfully!", tool).bright_green().bold()
    );
    println!();
    println!(
        "  {} {}",
        "Path:".bright_white().bold(),
        path.as_str().bright_green()
    );
    Ok(())
}

pub fn reset_config() -> Result<()> {
    let config_path = config::default_config_path()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    config::save_config(&AppConfig::default())
        .map_err(|source| CliError::ConfigWrite { source })?;

    println!(
        "{}",
        "✓ Configuration reset to defaults".bright_green().bold()
    );
    println!();
    println!("  {} {}", "Config file:".bright_white().bold(), config_path);
    println!();
    Ok(())
}
