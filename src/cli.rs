// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use ocirootfs::backend::BackendKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ocirootfs")]
#[command(about = "Turn OCI images into ext4 root filesystem images for microVMs")]
#[command(version)]
pub struct Cli {
    /// Show debug logs, including every external command
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: ocirootfs.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pull an image and write it as an ext4 filesystem image
    Build {
        /// Image reference, e.g. docker.io/library/alpine:3.20
        image: String,

        /// Path of the ext4 image to create
        output: PathBuf,

        /// Registry username
        #[arg(short, long, requires = "password_env")]
        username: Option<String>,

        /// Environment variable holding the registry password
        #[arg(long, requires = "username")]
        password_env: Option<String>,

        /// Use this backend instead of auto-detecting one
        #[arg(short, long, value_enum)]
        backend: Option<BackendKind>,
    },

    /// Show which tools are installed and which backend would be used
    Probe,

    /// Initialize a new ocirootfs.yml configuration file
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },
}
