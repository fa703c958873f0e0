use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    archive_container, create_container, extract_container, generate_playlist_file,
    generate_playlist_tree, mount_container, rename_by_hash, reset_config, set_tool_path,
    show_config, transform_game, unmount_container, verify_containers, ArchiveContainerArgs,
    ExtractContainerArgs, GeneratePlaylistArgs, RenameByHashArgs, TransformGameArgs,
};
use gvault_core::Tool;
use gvault_disc::DiscKind;
use miette::Result;

mod commands;
mod errors;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Log debug output from every stage
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Stop batch commands at the first failure
    #[arg(long, global = true)]
    exit_on_failure: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Work with checksum databases
    Dat {
        #[command(subcommand)]
        command: DatCommands,
    },
    /// Create, verify and mount CHD disc containers
    Chd {
        #[command(subcommand)]
        command: ChdCommands,
    },
    /// Generate multi-disc playlists
    Playlist {
        #[command(subcommand)]
        command: PlaylistCommands,
    },
    /// Transform a game's source media into launchable files
    Transform {
        /// The source file of the game
        #[arg(long)]
        source_file: String,

        /// The directory to move the transformed files to
        #[arg(long)]
        output_dir: String,

        /// A JSON game description (name, category, subcategory, sourceDir)
        #[arg(long, conflicts_with_all = ["name", "category", "subcategory"])]
        game_json: Option<String>,

        /// The game name
        #[arg(long)]
        name: Option<String>,

        /// The game category, e.g. "Computer" or "Sony"
        #[arg(long)]
        category: Option<String>,

        /// The game subcategory, e.g. "Sony PlayStation 3"
        #[arg(long)]
        subcategory: Option<String>,

        /// Keep installer setup files in generated install images
        #[arg(long)]
        keep_setup_files: bool,
    },
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum DatCommands {
    /// Rename files to their canonical names by MD5
    Rename {
        /// The directory of files to rename
        input_dir: String,

        /// The directory of DAT files to import
        #[arg(long)]
        dat_dir: Option<String>,

        /// A catalog cache file to load instead of the DAT files
        #[arg(long)]
        cache_file: Option<String>,

        /// Import the DAT files and rewrite the cache file
        #[arg(long)]
        generate_cache: bool,

        /// Abort on the first malformed record or unreadable DAT file
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ChdCommands {
    /// Compress a disc image into a container
    Create {
        chd: String,
        source: String,
        #[arg(long)]
        delete_source: bool,
    },
    /// Decompress a container into a raw image and TOC
    Extract {
        chd: String,
        /// Defaults to the container path with a .bin extension
        #[arg(long)]
        bin: Option<String>,
        /// Defaults to the binary path with a .toc extension
        #[arg(long)]
        toc: Option<String>,
        #[arg(long)]
        delete_container: bool,
    },
    /// Run the integrity check of one or more containers
    Verify {
        #[arg(required = true)]
        chds: Vec<String>,
    },
    /// Extract the container's file system into a directory
    Mount {
        chd: String,
        mount_dir: String,
        #[arg(long, default_value = "iso9660")]
        kind: DiscKind,
    },
    /// Remove a mount directory
    Unmount { chd: String, mount_dir: String },
    /// Zip the container's file system
    Archive {
        chd: String,
        zip: String,
        #[arg(long, default_value = "iso9660")]
        kind: DiscKind,
        #[arg(long)]
        delete_original: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum PlaylistCommands {
    /// Write a playlist of the matching files in a directory
    Generate {
        source_dir: String,

        /// The playlist file to write
        #[arg(short, long)]
        output: String,

        /// File extensions to include
        #[arg(short, long = "extension", required = true)]
        extensions: Vec<String>,

        #[arg(long)]
        recursive: bool,

        /// Write bare file names instead of full paths
        #[arg(long)]
        ends_only: bool,
    },
    /// Write a playlist inside every subdirectory with matching files
    Tree {
        source_dir: String,

        /// File extensions to include
        #[arg(short, long = "extension", required = true)]
        extensions: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the current configuration and tool discovery
    Show,
    /// Set the program path of an external tool
    SetTool { tool: Tool, path: String },
    /// Reset the configuration to defaults
    Reset,
}

fn parse_args() -> Result<Args> {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).map_err(|e| miette::miette!("{}", e))
}

fn main() -> Result<()> {
    let args = parse_args()?;
    utils::logging::init_logging(args.verbose);

    let mut config = utils::config::load_config();
    config.exit_on_failure |= args.exit_on_failure;

    match args.command {
        Commands::Dat {
            command:
                DatCommands::Rename {
                    input_dir,
                    dat_dir,
                    cache_file,
                    generate_cache,
                    strict,
                },
        } => rename_by_hash(
            RenameByHashArgs {
                input_dir,
                dat_dir,
                cache_file,
                generate_cache,
                strict,
            },
            &config,
        ),
        Commands::Chd { command } => match command {
            ChdCommands::Create {
                chd,
                source,
                delete_source,
            } => create_container(chd, source, delete_source, &config),
            ChdCommands::Extract {
                chd,
                bin,
                toc,
                delete_container,
            } => extract_container(
                ExtractContainerArgs {
                    chd,
                    bin,
                    toc,
                    delete_container,
                },
                &config,
            ),
            ChdCommands::Verify { chds } => verify_containers(chds, &config),
            ChdCommands::Mount {
                chd,
                mount_dir,
                kind,
            } => mount_container(chd, mount_dir, kind, &config),
            ChdCommands::Unmount { chd, mount_dir } => unmount_container(chd, mount_dir, &config),
            ChdCommands::Archive {
                chd,
                zip,
                kind,
                delete_original,
            } => archive_container(
                ArchiveContainerArgs {
                    chd,
                    zip,
                    kind,
                    delete_original,
                },
                &config,
            ),
        },
        Commands::Playlist { command } => match command {
            PlaylistCommands::Generate {
                source_dir,
                output,
                extensions,
                recursive,
                ends_only,
            } => generate_playlist_file(GeneratePlaylistArgs {
                source_dir,
                output,
                extensions,
                recursive,
                ends_only,
            }),
            PlaylistCommands::Tree {
                source_dir,
                extensions,
            } => generate_playlist_tree(source_dir, extensions),
        },
        Commands::Transform {
            source_file,
            output_dir,
            game_json,
            name,
            category,
            subcategory,
            keep_setup_files,
        } => transform_game(
            TransformGameArgs {
                source_file,
                output_dir,
                game_json,
                name,
                category,
                subcategory,
                keep_setup_files,
            },
            &config,
        ),
        Commands::Config { command } => match command {
            ConfigCommands::Show => show_config(),
            ConfigCommands::SetTool { tool, path } => set_tool_path(tool, path),
            ConfigCommands::Reset => reset_config(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_nested_command() {
        let args = Args::try_parse_from([
            "gvault",
            "chd",
            "mount",
            "Game.chd",
            "mnt",
            "--kind",
            "hybrid",
            "--exit-on-failure",
        ])
        .unwrap();
        assert!(args.exit_on_failure);
        assert!(matches!(
            args.command,
            Commands::Chd {
                command: ChdCommands::Mount {
                    kind: DiscKind::Hybrid,
                    ..
                }
            }
        ));
    }

    #[test]
    fn test_parse_tool_name() {
        let args = Args::try_parse_from(["gvault", "config", "set-tool", "7z", "/usr/bin/7zz"]).unwrap();
        assert!(matches!(
            args.command,
            Commands::Config {
                command: ConfigCommands::SetTool {
                    tool: Tool::SevenZip,
                    ..
                }
            }
        ));
    }
}
