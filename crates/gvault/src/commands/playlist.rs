use crate::errors::CliError;
use crate::println_pad;
use camino::Utf8PathBuf;
use colored::Colorize;
use gvault_disc::{generate_local_playlists, generate_playlist, GenerateOptions};
use miette::Result;

pub struct GeneratePlaylistArgs {
    pub source_dir: String,
    pub output: String,
    pub extensions: Vec<String>,
    pub recursive: bool,
    pub ends_only: bool,
}

/// Accept `chd`, `.chd` and `*.chd` alike.
fn normalize_extensions(extensions: Vec<String>) -> Vec<String> {
    extensions
        .into_iter()
        .map(|ext| format!(".{}", ext.trim_start_matches('*').trim_start_matches('.')))
        .collect()
}

pub fn generate_playlist_file(args: GeneratePlaylistArgs) -> Result<()> {
    let source_dir = Utf8PathBuf::from(&args.source_dir);
    let output = Utf8PathBuf::from(&args.output);
    let options = GenerateOptions::new(normalize_extensions(args.extensions))
        .recursive(args.recursive)
        .ends_only(args.ends_only);

    let entries = generate_playlist(&source_dir, &output, &options).map_err(CliError::from)?;
    for entry in &entries {
        println_pad!("   {} {}", "•".bright_cyan(), entry.bright_white());
    }
    println_pad!(
        "{} {} {}",
        "✅ Wrote".bright_green().bold(),
        output.as_str().bright_cyan().bold(),
        format!("({} entries)", entries.len()).dimmed()
    );
    Ok(())
}

pub fn generate_playlist_tree(source_dir: String, extensions: Vec<String>) -> Result<()> {
    let source_dir = Utf8PathBuf::from(source_dir);
    let written = generate_local_playlists(&source_dir, &normalize_extensions(extensions))
        .map_err(CliError::from)?;

    for playlist in &written {
        println_pad!("   {} {}", "•".bright_cyan(), playlist.as_str().bright_white());
    }
    println_pad!(
        "{} {} playlists",
        "✅ Wrote".bright_green().bold(),
        written.len().to_string().bright_white().bold()
    );
    Ok(())
}
