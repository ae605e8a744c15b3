use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use runbox::{Location, Pipeline, PipelineConfig, Variant};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "runbox")]
#[command(about = "Compile, link and run a C or LLVM IR program in WebAssembly sandboxes", long_about = None)]
struct Cli {
    /// Source file path or URL
    source: String,

    /// JSON pipeline configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured source language
    #[arg(long, value_enum)]
    variant: Option<VariantArg>,

    /// Sysroot archive path or URL (IR variant)
    #[arg(long, value_name = "PATH|URL")]
    sysroot: Option<String>,

    /// Base URL or directory for relative sysroot locations
    #[arg(long)]
    base_url: Option<String>,

    /// Arguments passed to the compiled program
    #[arg(last = true)]
    program_args: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    C,
    Ir,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::C => Variant::C,
            VariantArg::Ir => Variant::Ir,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("runbox=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(variant) = cli.variant {
        config.variant = variant.into();
    }
    if let Some(sysroot) = cli.sysroot {
        config.sysroot = Some(sysroot);
    }
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if !cli.program_args.is_empty() {
        config.program_args = cli.program_args;
    }

    let pipeline = Pipeline::new(config)?;

    let source = match Location::parse(&cli.source) {
        Location::Url(url) => pipeline.fetch_source(&url).await?,
        Location::Path(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path))?,
    };

    let report = pipeline.compile_and_run_detailed(&source).await?;

    std::io::stdout().write_all(&report.output.stdout)?;
    std::io::stderr().write_all(&report.output.stderr)?;
    std::io::stdout().flush()?;

    if !report.output.success() {
        std::process::exit(report.output.exit_code);
    }
    Ok(())
}
