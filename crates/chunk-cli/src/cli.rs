use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "chunkstore",
    about = "Transactional content-addressed chunk store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the chunk hash of each file
    Hash(HashArgs),
    /// Put files into a store as chunks and commit them
    Put(PutArgs),
    /// Race concurrent writers against one root
    Race(RaceArgs),
}

#[derive(Args)]
pub struct HashArgs {
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Args)]
pub struct PutArgs {
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    #[arg(short, long, default_value = "default")]
    pub namespace: String,
    /// TOML store config
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct RaceArgs {
    #[arg(short, long, default_value = "4")]
    pub writers: usize,
    #[arg(short, long, default_value = "100")]
    pub rounds: usize,
}
