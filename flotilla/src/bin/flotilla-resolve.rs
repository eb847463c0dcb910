//! A command line tool to inspect how [`flotilla`] resolves a document.
//!
//! This binary will typically only be useful to developers of this crate.
#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use clap::Parser;
use clap::ValueEnum;
use clap_verbosity_flag::Verbosity;
use flotilla::Engine;
use flotilla::Settings;
use flotilla::config::FailurePolicy;
use tracing::info;
use tracing_log::AsTrace;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum Format {
    /// YAML.
    #[default]
    Yaml,

    /// JSON.
    Json,
}

#[derive(clap::Parser)]
struct Args {
    /// The document to resolve.
    document: PathBuf,

    /// Additional settings files (loaded after the default sources).
    #[arg(short, long = "settings", value_name = "PATH")]
    settings: Vec<PathBuf>,

    /// Skips failing run-list entries instead of aborting.
    #[arg(long, default_value_t = false)]
    skip_failed: bool,

    /// The format in which to print the runs.
    #[arg(short, long, value_enum, default_value_t)]
    format: Format,

    #[command(flatten)]
    verbose: Verbosity,
}

fn settings(args: &Args) -> Result<Settings> {
    let settings = Settings::load_with_paths(&args.settings).context("loading settings")?;

    if args.skip_failed {
        return Ok(settings.with_failure_policy(FailurePolicy::SkipEntry));
    }

    Ok(settings)
}

fn run(args: &Args) -> Result<()> {
    let settings = settings(args)?;

    let text = std::fs::read_to_string(&args.document)
        .with_context(|| format!("reading `{}`", args.document.display()))?;

    let resolution = Engine::default()
        .with_settings(settings)
        .resolve_str(&text)
        .with_context(|| format!("resolving `{}`", args.document.display()))?;

    for skipped in resolution.skipped() {
        eprintln!(
            "skipped entry {} (`{}`): {}",
            skipped.entry(),
            skipped.benchmark(),
            skipped.error()
        );
    }

    info!(
        "resolved {} run(s) from `{}`",
        resolution.runs().len(),
        args.document.display()
    );

    match args.format {
        Format::Yaml => print!("{}", serde_yaml::to_string(resolution.runs())?),
        Format::Json => println!("{}", serde_json::to_string_pretty(resolution.runs())?),
    }

    if !resolution.is_complete() {
        bail!("{} run-list entries were skipped", resolution.skipped().len());
    }

    Ok(())
}

pub fn main() -> Result<()> {
    let args = Args::parse();

    match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(args.verbose.log_level_filter().as_trace())
            .with_writer(std::io::stderr)
            .init(),
    };

    run(&args)
}
