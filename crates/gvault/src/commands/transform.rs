use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::AppConfig;
use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use gvault_transform::pipelines::ToolInstallImageBuilder;
use gvault_transform::{GameDescriptor, TransformDispatcher, TransformOptions, TransformOutput};
use miette::Result;
use std::sync::Arc;

pub struct TransformGameArgs {
    pub source_file: String,
    pub output_dir: String,
    pub game_json: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub keep_setup_files: bool,
}

/// Build the game description from a JSON file or from individual flags.
///
/// Without an explicit source directory the source file's directory is used.
fn resolve_game(args: &TransformGameArgs, source_file: &Utf8Path) -> Result<GameDescriptor> {
    if let Some(path) = &args.game_json {
        return GameDescriptor::load(Utf8Path::new(path)).map_err(|e| CliError::from(e).into());
    }

    let (Some(name), Some(category), Some(subcategory)) =
        (&args.name, &args.category, &args.subcategory)
    else {
        return Err(CliError::invalid_game("missing game name, category or subcategory").into());
    };
    let source_dir = source_file
        .parent()
        .map(Utf8Path::to_path_buf)
        .unwrap_or_default();
    Ok(
        GameDescriptor::new(name.as_str(), category.as_str(), subcategory.as_str(), source_dir)
            .with_source_file(source_file),
    )
}

pub fn transform_game(args: TransformGameArgs, config: &AppConfig) -> Result<()> {
    let source_file = Utf8PathBuf::from(&args.source_file);
    let output_dir = Utf8PathBuf::from(&args.output_dir);
    let game = resolve_game(&args, &source_file)?;

    let toolbox = config.toolbox();
    let installer = Arc::new(ToolInstallImageBuilder::new(toolbox.clone()));
    let dispatcher =
        TransformDispatcher::with_default_pipelines(toolbox, installer, config.install_cache_dir());

    println_pad!(
        "{} {} {}",
        "🎮 Transforming".bright_blue().bold(),
        game.name.bright_cyan().bold(),
        format!("({} / {})", game.category, game.subcategory).dimmed()
    );
    let options = TransformOptions {
        keep_setup_files: args.keep_setup_files,
    };
    let output = dispatcher
        .transform(&game, &source_file, &output_dir, options)
        .map_err(CliError::from)?;

    match output {
        TransformOutput::Transformed(path) => println_pad!(
            "{} {}",
            "✅ Transformed:".bright_green().bold(),
            path.as_str().bright_white().bold()
        ),
        TransformOutput::Unchanged(path) => println_pad!(
            "{} {}",
            "ℹ Nothing to transform, keeping".bright_cyan(),
            path.as_str().bright_white()
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gvault_transform::GameSubcategory;

    fn args() -> TransformGameArgs {
        TransformGameArgs {
            source_file: "roms/Game (USA)/Game (USA).chd".to_string(),
            output_dir: "out".to_string(),
            game_json: None,
            name: Some("Game (USA)".to_string()),
            category: Some("Microsoft".to_string()),
            subcategory: Some("Microsoft Xbox".to_string()),
            keep_setup_files: false,
        }
    }

    #[test]
    fn test_game_from_flags() {
        let args = args();
        let game = resolve_game(&args, Utf8Path::new(&args.source_file)).unwrap();
        assert_eq!(game.subcategory, GameSubcategory::Xbox);
        assert_eq!(game.source_dir, Utf8PathBuf::from("roms/Game (USA)"));
    }

    #[test]
    fn test_incomplete_flags() {
        let mut args = args();
        args.category = None;
        assert!(resolve_game(&args, Utf8Path::new("Game.chd")).is_err());
    }
}
