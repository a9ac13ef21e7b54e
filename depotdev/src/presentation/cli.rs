use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "depotdev CLI (alpha)", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode one chunk frame (VZa, VSZa or zip) to a file
    Decode { frame: PathBuf, out: PathBuf },

    /// Materialize every file of one or more JSON manifests
    Download {
        #[arg(required = true)]
        manifests: Vec<PathBuf>,

        /// Directory holding frames as <depot_id>/<chunk id hex>
        #[arg(long)]
        chunks: PathBuf,

        /// Destination root
        #[arg(long)]
        dest: PathBuf,

        #[arg(long, default_value_t = depot_core::materialize::DEFAULT_CONCURRENCY)]
        concurrency: usize,

        /// JSON map of depot id to hex key, consulted for encrypted manifests
        #[arg(long)]
        keys: Option<PathBuf>,

        /// Fetch every chunk reference instead of sharing decoded chunks
        #[arg(long)]
        no_cache: bool,
    },
}
