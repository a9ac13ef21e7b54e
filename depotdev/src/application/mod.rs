pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use depot_core::error::Result;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Decode { frame, out } => handlers::handle_decode(frame, out),
        Commands::Download {
            manifests,
            chunks,
            dest,
            concurrency,
            keys,
            no_cache,
        } => handlers::handle_download(manifests, chunks, dest, concurrency, keys, no_cache),
    }
}
