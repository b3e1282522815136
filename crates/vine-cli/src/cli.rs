use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vine",
    about = "Vine: one filesystem view over many users' versioned trees",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// State directory (defaults to .vine, or base_dir from --config)
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Paths are absolute within the filesystem: `/` lists branches and
/// `/<user id>/...` addresses a branch. With `--merged`, paths are relative
/// to the branch roots and every branch contributes.
#[derive(Subcommand)]
pub enum Command {
    /// Create the state directory and the local branch
    Init,
    /// Print the local user id
    Whoami,
    /// List a directory
    Ls(LsArgs),
    /// Show whether a path is a file or a directory
    Stat(PathArgs),
    /// Print a file
    Cat(CatArgs),
    /// Write text or a local file's contents into a file
    Write(WriteArgs),
    /// Create an empty file
    Touch(PathArgs),
    /// Create a directory
    Mkdir(PathArgs),
    /// Remove a file
    Rm(PathArgs),
    /// Remove an empty directory
    Rmdir(PathArgs),
    /// Resize a file
    Truncate(TruncateArgs),
    /// Copy a directory another user has into the local branch
    Fork(PathArgs),
}

#[derive(Args)]
pub struct PathArgs {
    pub path: String,
}

#[derive(Args)]
pub struct LsArgs {
    #[arg(default_value = "/")]
    pub path: String,
    /// List the union of every branch's entries
    #[arg(long)]
    pub merged: bool,
}

#[derive(Args)]
pub struct CatArgs {
    pub path: String,
    /// Read through the merged view of every branch
    #[arg(long)]
    pub merged: bool,
}

#[derive(Args)]
pub struct WriteArgs {
    pub path: String,
    /// Text to write
    #[arg(conflicts_with = "from", required_unless_present = "from")]
    pub text: Option<String>,
    /// Local file whose contents are written
    #[arg(long)]
    pub from: Option<PathBuf>,
    #[arg(long, default_value = "0")]
    pub offset: u64,
}

#[derive(Args)]
pub struct TruncateArgs {
    pub path: String,
    pub size: u64,
}
