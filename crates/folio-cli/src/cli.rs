use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "folio",
    about = "Folio: an in-memory CMIS-style content repository",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Repository configuration (TOML). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

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
    /// Run a scripted session: folders, documents, checkout and checkin
    Demo(DemoArgs),
    /// Register types from a JSON file and print the type hierarchy
    Types(TypesArgs),
    /// Print the effective configuration
    Config,
    /// Print the folder tree of a freshly seeded repository
    Tree(TreeArgs),
}

#[derive(Args)]
pub struct DemoArgs {
    /// Principal the session runs as.
    #[arg(long, default_value = "demo")]
    pub principal: String,
}

#[derive(Args)]
pub struct TypesArgs {
    /// JSON file holding an array of type definitions.
    pub file: PathBuf,
    /// Include property definitions in the output.
    #[arg(long)]
    pub properties: bool,
}

#[derive(Args)]
pub struct TreeArgs {
    /// Seed the repository with the demo content first.
    #[arg(long)]
    pub seed: bool,
    /// Show version labels next to documents.
    #[arg(long)]
    pub versions: bool,
}
