use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::ServeOverrides;

/// Coffee Corner LINE bot: retrieval augmented answers about the shop.
#[derive(Debug, Parser)]
#[command(name = "cafebot", version, about)]
pub struct Cli {
    /// Directory containing default.toml and an optional local.toml
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the webhook server
    Serve(ServeArgs),
    /// Download the embedding model into the local cache
    Prefetch,
    /// Create the index, upload the knowledge file and check the result
    Setup {
        /// Knowledge file; defaults to vector_store.seed_file
        #[arg(long, value_name = "FILE")]
        data: Option<PathBuf>,
        /// Skip the probe queries after uploading
        #[arg(long)]
        skip_verify: bool,
    },
    /// Answer a fixed set of sample questions and print the results
    Selftest,
    /// Chat with a running server from the terminal
    Chat {
        /// Server base URL; defaults to the configured host and port
        #[arg(long)]
        url: Option<String>,
    },
}

#[derive(Debug, Args, Default)]
pub struct ServeArgs {
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
    /// Server processes (must be 1)
    #[arg(long)]
    pub workers: Option<usize>,
    /// Runtime threads and concurrent message limit
    #[arg(long)]
    pub threads: Option<usize>,
}

impl From<ServeArgs> for ServeOverrides {
    fn from(args: ServeArgs) -> Self {
        ServeOverrides {
            host: args.host,
            port: args.port,
            workers: args.workers,
            threads: args.threads,
        }
    }
}
