use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::artifact::DEFAULT_ARTIFACT_DIR;
use crate::build::{BuildOptions, DEFAULT_DIST_DIR};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pre-generate Markdown for statically rendered pages.
    Build(BuildArgs),
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Project root.
    #[arg(long, default_value = ".")]
    pub cwd: PathBuf,

    /// Framework build output directory, relative to `--cwd`.
    #[arg(long, default_value = DEFAULT_DIST_DIR)]
    pub dist_dir: PathBuf,

    /// Where to write `.md` files, relative to `--cwd`.
    #[arg(long, default_value = DEFAULT_ARTIFACT_DIR)]
    pub out_dir: PathBuf,

    /// Extra tag name to strip before conversion (repeatable).
    #[arg(long = "strip-selector", value_name = "TAG")]
    pub strip_selectors: Vec<String>,
}

impl From<BuildArgs> for BuildOptions {
    fn from(args: BuildArgs) -> Self {
        Self {
            cwd: args.cwd,
            dist_dir: args.dist_dir,
            out_dir: args.out_dir,
            strip_selectors: args.strip_selectors,
        }
    }
}
