use crate::{cat::CatCmd, ls::LsCmd, stat::StatCmd, streams::StreamsCmd};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the `.cim` image's primary (filesystem) file.
    pub image: std::path::PathBuf,

    /// Reject an image whose link tables are not sorted, instead of
    /// trusting the writer's contract.
    #[arg(long)]
    pub strict_link_tables: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lists a directory's entries.
    Ls(LsCmd),
    /// Prints a file's default stream to stdout.
    Cat(CatCmd),
    /// Prints a file's size, attributes, and timestamps.
    Stat(StatCmd),
    /// Lists a file's alternate stream names.
    Streams(StreamsCmd),
}

impl Cli {
    pub fn open_options(&self) -> cim::OpenOptions {
        cim::OpenOptions {
            strict_link_tables: self.strict_link_tables,
        }
    }
}
