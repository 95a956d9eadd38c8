use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelname")]
#[command(author, version, about = "Rename TV episodes and movies from metadata sources")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match and rename the media files under a path
    Rename {
        /// File or directory to rename
        #[arg(required = true)]
        path: PathBuf,
    },

    /// Manage the configuration file (defaults to `edit`)
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Probe a media file and display the facts used in templates
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,
}

#[derive(Subcommand, Clone, Copy)]
pub enum ConfigAction {
    /// Print the config file location
    Path,
    /// Write the default config file if it does not exist
    Init,
    /// Open the config file in $VISUAL or $EDITOR
    Edit,
    /// Check that the config file parses and its templates compile
    Validate,
}
