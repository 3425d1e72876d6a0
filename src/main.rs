//! fabricdraw - network fabric topology diagrams
//!
//! Reads raw adjacency dumps (corp NAP / DSN `.attr`, SwitchBuilder
//! brick JSON, fabric ROOT JSON), collapses redundant devices and
//! links, and writes a draw.io diagram centered on one site.
//!
//! Usage: fabricdraw --site bjs11-11 --format brick -i brick.json
//! Pipe:  cat nap.attr | fabricdraw --site bjs11-11 --format attr

mod config;
mod error;
mod fabric;
mod types;

use anyhow::{bail, Context, Result};
use clap::Parser;
use config::Config;
use fabric::{ExtractContext, RunOptions, SourceFormat};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Build a draw.io topology diagram for one site
#[derive(Parser)]
#[command(name = "fabricdraw")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Normalize raw fabric adjacency records into a draw.io topology diagram")]
#[command(long_about = r#"
Reads raw adjacency records, collapses redundant pair members and
duplicate links, keeps the target site plus its direct neighbors and
lays everything out on a fixed grid.

Formats:
  attr          corp NAP .attr (HOSTNAME / CUSTOMERLAG / RINGLAG / PEER)
  dsn           DSN .attr (PARENT-CHILD-INTF / IBGP-NEIGH / SWITCH INTF)
  brick         SwitchBuilder brick JSON
  fabric-root   fabric ROOT YAML or JSON (root defaults to <site>-es-c1)

Examples:
  fabricdraw --site bjs11-11 --format brick -i brick.json
  fabricdraw --site bjs11-11 --format attr -i r1.attr -i r2.attr --no-filter
  fabricdraw --site nrt12-12 --format fabric-root -i root.yaml
  fabricdraw --init-config
"#)]
struct Cli {
    /// Target site, e.g. bjs11-11
    #[arg(short, long, required_unless_present = "init_config")]
    site: Option<String>,

    /// Source format: attr, dsn, brick, fabric-root
    #[arg(short, long, required_unless_present = "init_config")]
    format: Option<SourceFormat>,

    /// Input file; repeatable, "-" reads stdin (default)
    #[arg(short, long = "input")]
    inputs: Vec<PathBuf>,

    /// Current device for line sources, root device for fabric-root
    #[arg(long)]
    hostname: Option<String>,

    /// Output diagram (default: <site>-topology.drawio)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep every group instead of the target site and its neighbors
    #[arg(long)]
    no_filter: bool,

    /// Keep one connection per group pair and category
    #[arg(long)]
    by_category: bool,

    /// Also write a JSON analysis report
    #[arg(long)]
    analysis: Option<PathBuf>,

    /// Config file (default: ~/.config/fabricdraw/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the default config file and exit
    #[arg(long)]
    init_config: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("fabricdraw={},warn", log_level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    if let Err(e) = run_cli(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn run_cli(cli: &Cli) -> Result<()> {
    if cli.init_config {
        return init_config(cli.config.as_deref());
    }

    let config = Config::load(cli.config.as_deref())?;

    let (Some(site), Some(format)) = (cli.site.as_deref(), cli.format) else {
        bail!("--site and --format are required");
    };

    let target = types::SiteId::parse(site)?;
    let ctx = ExtractContext::for_source(format, &target, cli.hostname.as_deref());

    let contents = read_inputs(&cli.inputs)?;
    let extraction = fabric::extract_all(format, contents.iter().map(String::as_str), &ctx);

    let options = RunOptions {
        filter: !cli.no_filter,
        by_category: cli.by_category.then_some(true),
    };
    let outcome = fabric::run(site, &extraction, &config, &options)?;

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}-topology.drawio", site)));
    fs::write(&output, outcome.document.to_xml())
        .with_context(|| format!("Failed to write diagram to {:?}", output))?;
    info!(path = %output.display(), "wrote diagram");

    if let Some(path) = &cli.analysis {
        let json = serde_json::to_string_pretty(&outcome.analysis())
            .context("Failed to serialize analysis")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write analysis to {:?}", path))?;
        info!(path = %path.display(), "wrote analysis");
    }

    println!("{}", outcome.summary);
    println!("Output:           {}", output.display());
    Ok(())
}

/// Reads every input in order. No inputs (or "-") means stdin.
fn read_inputs(inputs: &[PathBuf]) -> Result<Vec<String>> {
    if inputs.is_empty() {
        return Ok(vec![read_stdin()?]);
    }

    inputs
        .iter()
        .map(|path| {
            if path.as_os_str() == "-" {
                read_stdin()
            } else {
                fs::read_to_string(path)
                    .with_context(|| format!("Failed to read input {:?}", path))
            }
        })
        .collect()
}

fn read_stdin() -> Result<String> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read stdin")?;
    Ok(input)
}

fn init_config(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => Config::path()?,
    };
    if path.exists() {
        bail!("Config already exists at {:?}", path);
    }
    Config::default().save(&path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
