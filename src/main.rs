//! lte-extract - LTE Publication Metadata Extraction
//!
//! Turns scientific PDFs about agricultural long-term experiments into
//! validated citation and dataset metadata using an LLM completion endpoint.
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! lte-extract normalize ./pdfs --output ./markdown
//! lte-extract extract ./pdfs --output ./metadata --format jsonld
//! lte-extract enrich --record paper.json --scopus scopus.json
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! lte-extract serve --port 5000
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lte_extract::{
    completion::ChatCompletionClient,
    config::Config,
    debug_log::DebugSink,
    enrichment, export,
    export::ExtractionSummary,
    normalizer,
    pipeline::ExtractionPipeline,
    schema, server,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// LTE Publication Metadata Extraction
#[derive(Parser)]
#[command(name = "lte-extract")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// Validated record as plain JSON
    Json,
    /// Schema.org JSON-LD
    Jsonld,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Jsonld => "jsonld",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run as HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "5000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Convert PDFs to cleaned, heading-annotated Markdown text
    Normalize {
        /// A PDF file or a directory of PDFs
        input: PathBuf,

        /// Output directory (prints to stdout for a single file when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract metadata records from PDFs
    Extract {
        /// A PDF file or a directory of PDFs
        input: PathBuf,

        /// Output directory for records and the CSV summary
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Record format
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Fill empty citation fields of a record from a saved Scopus response
    Enrich {
        /// Extraction record (JSON)
        #[arg(long)]
        record: PathBuf,

        /// Scopus abstract-retrieval response (JSON)
        #[arg(long)]
        scopus: PathBuf,

        /// Where to write the enriched record (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if cli.json_logs {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .init();
    }

    match cli.command {
        Commands::Serve { port, host } => {
            let pipeline = build_pipeline()?;
            info!(host = %host, port = port, "Starting HTTP server");
            server::run_server(&host, port, pipeline).await
        }
        Commands::Normalize { input, output } => run_normalize(&input, output.as_deref()),
        Commands::Extract { input, output, format } => run_extract(&input, &output, format).await,
        Commands::Enrich { record, scopus, output } => run_enrich(&record, &scopus, output.as_deref()),
    }
}

/// Configuration errors abort here, before any work starts.
fn build_pipeline() -> Result<ExtractionPipeline> {
    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        model = %config.llm.model,
        endpoint = %config.llm.base_url,
        stream = config.llm.stream,
        "Completion endpoint configured"
    );

    let client = ChatCompletionClient::new(config.llm)?;
    Ok(ExtractionPipeline::new(
        Arc::new(client),
        DebugSink::new(config.debug_dir),
    ))
}

fn pdf_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_dir() {
        let pdfs = normalizer::list_pdfs(input)
            .with_context(|| format!("Failed to list {}", input.display()))?;
        if pdfs.is_empty() {
            warn!(input = %input.display(), "No PDF files found");
        }
        Ok(pdfs)
    } else if input.is_file() {
        Ok(vec![input.to_path_buf()])
    } else {
        bail!("Input not found: {}", input.display())
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Normalization
// ============================================================================

fn run_normalize(input: &Path, output: Option<&Path>) -> Result<()> {
    if input.is_dir() {
        let output = output.unwrap_or_else(|| Path::new("./output"));
        let report = normalizer::normalize_dir(input, output)?;
        println!(
            "Normalized {} PDF(s), {} failed. Log: {}",
            report.written.len(),
            report.failed.len(),
            output.join(normalizer::PROCESSING_LOG).display()
        );
        return Ok(());
    }

    let text = normalizer::normalize_pdf(input)
        .with_context(|| format!("Failed to normalize {}", input.display()))?;
    match output {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let target = dir.join(normalizer::markdown_name(input));
            std::fs::write(&target, text)?;
            println!("Saved: {:?}", target);
        }
        None => println!("{}", text),
    }
    Ok(())
}

// ============================================================================
// Extraction
// ============================================================================

async fn run_extract(input: &Path, output: &Path, format: OutputFormat) -> Result<()> {
    let pipeline = build_pipeline()?;
    let pdfs = pdf_inputs(input)?;
    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    info!(count = pdfs.len(), format = ?format, "Extracting metadata");

    let mut summary = Vec::with_capacity(pdfs.len());
    for (idx, pdf) in pdfs.iter().enumerate() {
        let label = file_label(pdf);
        info!(idx = idx + 1, total = pdfs.len(), file = %label, "Processing");

        let text = match normalizer::normalize_pdf(pdf) {
            Ok(text) => text,
            Err(e) => {
                error!(file = %label, error = %e, "Failed to read PDF");
                summary.push(ExtractionSummary::failure(&label, &e.to_string()));
                continue;
            }
        };

        match pipeline.run(&text).await {
            Ok(record) => {
                let document = match format {
                    OutputFormat::Json => serde_json::to_value(&record)?,
                    OutputFormat::Jsonld => export::to_json_ld(&record),
                };
                let stem = pdf
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| format!("record_{}", idx + 1));
                let target = output.join(format!("{}.{}", stem, format.extension()));
                std::fs::write(&target, serde_json::to_string_pretty(&document)?)
                    .with_context(|| format!("Failed to write {}", target.display()))?;
                summary.push(ExtractionSummary::success(&label, &record));
            }
            Err(e) => {
                error!(file = %label, stage = %e.stage, error = %e, "Extraction failed");
                summary.push(ExtractionSummary::failure(&label, &e.to_string()));
            }
        }
    }

    let summary_path = output.join("extraction_summary.csv");
    export::save_csv(&summary_path, &summary)?;

    let failed = summary.iter().filter(|row| row.status != "success").count();
    println!(
        "Extracted {} of {} PDF(s). Summary: {}",
        summary.len() - failed,
        summary.len(),
        summary_path.display()
    );
    Ok(())
}

// ============================================================================
// Enrichment
// ============================================================================

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn run_enrich(record_path: &Path, scopus_path: &Path, output: Option<&Path>) -> Result<()> {
    let mut record = schema::validate(&read_json(record_path)?)
        .with_context(|| format!("Record {} is not a valid extraction record", record_path.display()))?;
    let scopus = read_json(scopus_path)?;

    let filled = enrichment::enrich_citation(&mut record.citation, &scopus);
    info!(fields = ?filled, "Enriched citation");

    let rendered = serde_json::to_string_pretty(&record)?;
    match output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            println!("Saved: {:?} ({} field(s) filled)", path, filled.len());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
