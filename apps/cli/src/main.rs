//! Batch front end for the normalization engine
//!
//! Reads one CDA or FHIR document, runs the full extraction pipeline
//! against a JSON catalogue, and prints the normalized result plus its
//! quality score. Useful for smoke-testing catalogues and source documents
//! without standing up a viewer.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use salus_pipeline::{assess, SectionPipeline};
use salus_sections::DataSource;
use salus_terminology::{EngineConfig, InMemoryConceptStore, TerminologyResolver};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Cda,
    Fhir,
}

#[derive(Parser, Debug)]
#[command(name = "salus", about = "Normalize clinical documents into canonical sections")]
struct Args {
    /// Source document to process
    input: PathBuf,

    /// Wire format of the source document (never auto-detected)
    #[arg(long, value_enum)]
    format: Format,

    /// JSON terminology catalogue to resolve against
    #[arg(long)]
    catalogue: Option<PathBuf>,

    /// Target language for display text
    #[arg(long, default_value = "en")]
    language: String,

    /// Optional target country refinement
    #[arg(long)]
    country: Option<String>,
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "salus=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let store = match &args.catalogue {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading catalogue {}", path.display()))?;
            InMemoryConceptStore::from_json(&raw).context("parsing catalogue")?
        }
        None => InMemoryConceptStore::new(),
    };

    let config = EngineConfig::for_locale(args.language.clone(), args.country.clone());
    let resolver = Arc::new(TerminologyResolver::new(Arc::new(store), config));
    let pipeline = SectionPipeline::new(resolver);

    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading document {}", args.input.display()))?;
    let source_type = match args.format {
        Format::Cda => DataSource::Cda,
        Format::Fhir => DataSource::Fhir,
    };

    let result = pipeline.process(&raw, source_type).await;
    let quality = assess(&result);

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "result": result,
            "quality": quality,
        }))?
    );

    Ok(())
}
