use anyhow::{bail, Context, Result};
use busgen::{relative_to, write_proxies, Config, Orchestrator};
use busgen_verification::GoTestProber;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "busgen")]
#[command(about = "Generate Go D-Bus client proxies from the objects a service exports", long_about = None)]
struct Cli {
    /// Directory to analyze (defaults to the current directory)
    #[arg(long, value_name = "PATH")]
    file_path: Option<PathBuf>,

    /// Generate client proxy source
    #[arg(long)]
    write_go: bool,

    /// Run the introspection probe in every package with exported objects
    #[arg(long)]
    write_xml: bool,

    /// Write `<package>_proxy.go` files here instead of printing them
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Print the resolved model as JSON
    #[arg(long)]
    dump_model: bool,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug {
        tracing::Level::TRACE
    } else if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    // Generated source goes to stdout
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(cli.debug)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if cli.file_path.is_some() {
        config.file_path = cli.file_path.clone();
    }
    if cli.output_dir.is_some() {
        config.output_dir = cli.output_dir.clone();
    }
    config.write_go |= cli.write_go;
    config.write_xml |= cli.write_xml;

    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let root = relative_to(
        config.file_path.as_deref().unwrap_or_else(|| Path::new(".")),
        &cwd,
    );

    let mut orchestrator = Orchestrator::new(config.codegen.clone()).with_proxies(config.write_go);
    if config.write_xml {
        let prober = match &config.probe.go_binary {
            Some(binary) => GoTestProber::with_binary(binary),
            None => GoTestProber::new().context("--write-xml needs the go tool")?,
        };
        orchestrator = orchestrator.with_prober(Box::new(prober));
    }

    info!("Analyzing {}", root.display());
    let mut report = orchestrator.run(&root)?;

    if config.write_go {
        match &config.output_dir {
            Some(out_dir) => {
                let written = write_proxies(&mut report, &root, out_dir);
                info!("Wrote {} proxy file(s) to {}", written.len(), out_dir.display());
            }
            None => {
                for source in report.units.iter().filter_map(|u| u.generated.as_deref()) {
                    print!("{}", source);
                }
            }
        }
    }

    if cli.dump_model {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize the model")?;
        println!("{}", json);
    }

    for skipped in &report.skipped {
        error!("{}: {}", skipped.path.display(), skipped.reason);
    }
    for unit in report.failed_units() {
        for failure in &unit.failures {
            error!("{} ({}): {}", unit.package, unit.dir.display(), failure);
        }
    }
    if !report.is_success() {
        bail!(
            "{} of {} package(s) failed, {} file(s) skipped",
            report.failed_units().count(),
            report.units.len(),
            report.skipped.len()
        );
    }
    Ok(())
}
