use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "docseg",
    version,
    about = "TOC-driven PDF section extraction and query tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Locate(LocateArgs),
    Extract(ExtractArgs),
    Query(QueryArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct LocateArgs {
    #[arg(long)]
    pub pdf: PathBuf,

    #[arg(long, default_value_t = 10)]
    pub fallback_pages: usize,

    #[arg(long, default_value_t = 5)]
    pub min_matches_first_page: usize,

    #[arg(long, default_value_t = 1)]
    pub min_matches_next_page: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long)]
    pub pdf: PathBuf,

    #[arg(long, default_value = ".cache/docseg")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    /// External program that turns TOC pages into the outline payload.
    #[arg(long)]
    pub structuring_oracle: Option<PathBuf>,

    /// Prepared outline payload on disk, bypassing the structuring oracle.
    #[arg(long)]
    pub outline_json: Option<PathBuf>,

    /// External program that confirms conclusive boundary headings.
    #[arg(long)]
    pub boundary_oracle: Option<PathBuf>,

    #[arg(long, default_value_t = 10)]
    pub fallback_pages: usize,

    #[arg(long, default_value_t = 5)]
    pub min_matches_first_page: usize,

    #[arg(long, default_value_t = 1)]
    pub min_matches_next_page: usize,

    #[arg(long)]
    pub max_pages: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[arg(long)]
    pub artifact: PathBuf,

    #[arg(long)]
    pub key: Option<String>,

    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/docseg")]
    pub cache_root: PathBuf,
}
