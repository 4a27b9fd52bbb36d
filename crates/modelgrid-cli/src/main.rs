//! modelgrid: command-line front end for template selection and model
//! resolution against a local redb object store.
//!
//! # Usage
//!
//! ```text
//! modelgrid --store ./state.redb seed fixtures.json
//! modelgrid select --namespace team-a --model llama-3-8b --gpu MI300X
//! modelgrid resolve --namespace team-a --workload chat --image rocm/vllm:0.6.3
//! modelgrid derive-name image ghcr.io/org/llama:v1
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::CommandContext;

#[derive(Parser)]
#[command(
    name = "modelgrid",
    about = "ModelGrid: inference template selection and model resolution",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to modelgrid.toml (default: ./modelgrid.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Object store file; overrides [store].path.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load templates, models and nodes from a JSON snapshot.
    Seed {
        /// Snapshot file with `templates`, `models` and `nodes` arrays.
        file: PathBuf,
    },
    /// Choose the template serving a model.
    Select(commands::select::SelectArgs),
    /// Resolve a workload's model, creating one when needed.
    Resolve(commands::resolve::ResolveArgs),
    /// Print a deterministic derived name.
    DeriveName {
        #[command(subcommand)]
        kind: commands::name::NameKind,
    },
    /// Print the effective configuration.
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let ctx = CommandContext::load(cli.config.as_deref(), cli.store)?;
    match cli.command {
        Command::Seed { file } => commands::seed::seed(&ctx, &file),
        Command::Select(args) => commands::select::select(&ctx, &args),
        Command::Resolve(args) => commands::resolve::resolve(&ctx, &args),
        Command::DeriveName { kind } => commands::name::derive_name(&ctx, &kind),
        Command::Config => {
            print!("{}", ctx.config.to_toml_string()?);
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,modelgrid=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
