//! Sharetext CLI - extract text and structure from document dumps
//!
//! ```text
//! sharetext extract report.docx --format json
//! sharetext detect *.doc *.msg
//! sharetext units deck.pptx
//! ```

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sharetext::{Content, ExtractionConfig, detect_file, read_file_with_config};
use tracing_subscriber::EnvFilter;

/// Separator written between units by `sharetext units`.
const UNIT_SEPARATOR: &str = "\u{000C}\n";

#[derive(Parser, Debug)]
#[command(
    name = "sharetext",
    version,
    about = "Extract text and structure from Office, OpenDocument, PDF and email files",
    after_help = "EXAMPLES:\n  \
                  sharetext extract report.docx --format text\n  \
                  sharetext extract deck.pptx --format json --no-images\n  \
                  sharetext detect exports/*\n  \
                  sharetext units workbook.xlsx\n\n\
                  Set RUST_LOG to override the log filter."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract a document and print its text or JSON structure
    Extract {
        /// Document to extract
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Config file (.toml or .json); defaults to a discovered sharetext.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Skip embedded image payloads
        #[arg(long)]
        no_images: bool,
    },

    /// Print the detected format tag and MIME type of each file
    Detect {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Print a document's units (pages, slides, sheets, messages) separated by form feeds
    Units {
        path: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match run(cli.command, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!("{:?}", err);
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "sharetext=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // A second init (tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run(command: Commands, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Extract {
            path,
            format,
            config,
            no_images,
        } => {
            let mut config = load_config(config.as_deref())?;
            if no_images {
                config.extract_images = false;
            }
            extract(&path, format, &config, out)
        }
        Commands::Detect { paths } => detect(&paths, out),
        Commands::Units { path, config } => {
            let config = load_config(config.as_deref())?;
            units(&path, &config, out)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ExtractionConfig> {
    match path {
        Some(path) => ExtractionConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(ExtractionConfig::discover()?.unwrap_or_default()),
    }
}

fn extract(path: &Path, format: OutputFormat, config: &ExtractionConfig, out: &mut impl Write) -> Result<()> {
    let content =
        read_file_with_config(path, config).with_context(|| format!("Failed to extract {}", path.display()))?;
    match format {
        OutputFormat::Text => writeln!(out, "{}", content.full_text())?,
        OutputFormat::Json => writeln!(out, "{}", content.to_json().context("Failed to serialize content")?)?,
    }
    Ok(())
}

/// One line per file. Files that cannot be read are reported and skipped; the
/// command fails at the end if any were.
fn detect(paths: &[PathBuf], out: &mut impl Write) -> Result<()> {
    let mut failures = 0usize;
    for path in paths {
        match detect_file(path) {
            Ok((tag, mime)) => writeln!(out, "{}\t{}\t{}", path.display(), tag, mime)?,
            Err(err) => {
                tracing::warn!("Skipping {}: {}", path.display(), err);
                failures += 1;
            }
        }
    }
    if failures > 0 {
        anyhow::bail!("{} of {} files could not be read", failures, paths.len());
    }
    Ok(())
}

fn units(path: &Path, config: &ExtractionConfig, out: &mut impl Write) -> Result<()> {
    let content =
        read_file_with_config(path, config).with_context(|| format!("Failed to extract {}", path.display()))?;
    for (idx, unit) in content.units().enumerate() {
        if idx > 0 {
            out.write_all(UNIT_SEPARATOR.as_bytes())?;
        }
        writeln!(out, "{}", unit)?;
    }
    Ok(())
}
