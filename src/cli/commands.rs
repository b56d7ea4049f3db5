//! CLI commands implementation.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;

use crate::config::{load_settings, Settings};
use crate::extract::pdf::{ConverterRegistry, PdfExtractor};
use crate::llm::{LlmClient, LlmOverrides};
use crate::models::{DocumentReference, ExtractionSelector};
use crate::parser::DocumentParser;

use super::serve::cmd_serve;

#[derive(Parser)]
#[command(name = "uniparse")]
#[command(about = "Extract markdown from PDF, Office, CSV, HTML and text documents")]
#[command(version)]
pub struct Cli {
    /// Data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Provider settings that replace the configured defaults for one run.
#[derive(clap::Args, Debug, Default)]
struct ProviderArgs {
    /// Provider (openai_compatible or bedrock)
    #[arg(long)]
    provider: Option<String>,
    /// Base URL of an OpenAI-compatible server
    #[arg(long)]
    base_url: Option<String>,
    /// Bearer credential
    #[arg(long)]
    api_key: Option<String>,
    /// Model identifier
    #[arg(long)]
    model: Option<String>,
    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f64>,
    /// Maximum tokens in the response
    #[arg(long)]
    max_output_tokens: Option<u32>,
}

impl From<ProviderArgs> for LlmOverrides {
    fn from(args: ProviderArgs) -> Self {
        Self {
            provider: args.provider,
            base_url: args.base_url,
            api_key: args.api_key,
            model: args.model,
            temperature: args.temperature,
            max_output_tokens: args.max_output_tokens,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract markdown from a document and print it
    Parse {
        /// Document to parse
        file: PathBuf,
        /// 1-based PDF page
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..), conflicts_with_all = ["sheet", "slide"])]
        page: Option<u32>,
        /// Worksheet name
        #[arg(long, conflicts_with = "slide")]
        sheet: Option<String>,
        /// 1-based slide number
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        slide: Option<u32>,
        /// Declared content type (guessed from the extension by default)
        #[arg(long)]
        content_type: Option<String>,
        /// Rewrite the extracted text with the configured LLM provider
        #[arg(long)]
        refine: bool,
        #[command(flatten)]
        provider: ProviderArgs,
    },

    /// List worksheet names of a spreadsheet
    Sheets {
        /// Spreadsheet file
        file: PathBuf,
    },

    /// List slide numbers of a presentation
    Slides {
        /// Presentation file
        file: PathBuf,
    },

    /// Print the page count of a PDF
    Pages {
        /// PDF file
        file: PathBuf,
    },

    /// Start the HTTP server
    Serve {
        /// Address to bind (port, host, or host:port)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Show configured PDF converters and whether they can run
    Converters,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.data_dir).await;

    match cli.command {
        Commands::Parse {
            file,
            page,
            sheet,
            slide,
            content_type,
            refine,
            provider,
        } => {
            let selector = ExtractionSelector { page, sheet, slide };
            cmd_parse(
                &settings,
                &file,
                content_type.as_deref(),
                &selector,
                refine.then(|| provider.into()),
            )
            .await
        }
        Commands::Sheets { file } => cmd_sheets(&settings, &file),
        Commands::Slides { file } => cmd_slides(&settings, &file),
        Commands::Pages { file } => cmd_pages(&settings, &file),
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.bind.clone());
            cmd_serve(&settings, build_parser(&settings), &bind).await
        }
        Commands::Converters => cmd_converters(&settings),
    }
}

/// Parser wired to the configured converters and provider defaults.
pub fn build_parser(settings: &Settings) -> DocumentParser {
    let registry = ConverterRegistry::from_configs(&settings.pdf_converters);
    DocumentParser::new(
        settings.llm.clone(),
        PdfExtractor::new(registry),
        LlmClient::new(),
    )
}

fn local_document(file: &Path, content_type: Option<&str>) -> anyhow::Result<DocumentReference> {
    if !file.is_file() {
        anyhow::bail!("File not found: {}", file.display());
    }
    Ok(DocumentReference::from_path(file, content_type))
}

async fn cmd_parse(
    settings: &Settings,
    file: &Path,
    content_type: Option<&str>,
    selector: &ExtractionSelector,
    refine: Option<LlmOverrides>,
) -> anyhow::Result<()> {
    let doc = local_document(file, content_type)?;
    let parser = build_parser(settings);

    let outcome = match refine {
        Some(overrides) => parser.refine(&doc, selector, &overrides).await,
        None => parser.extract(&doc, selector),
    }
    .with_context(|| format!("Failed to parse {}", file.display()))?;

    if let Some(sheet) = outcome.applied.sheet() {
        if selector.sheet_name() != Some(sheet) {
            eprintln!(
                "{} Sheet {:?} not found, showing {:?}",
                style("!").yellow(),
                selector.sheet_name().unwrap_or_default(),
                sheet
            );
        }
    }
    println!("{}", outcome.markdown);
    Ok(())
}

fn cmd_sheets(settings: &Settings, file: &Path) -> anyhow::Result<()> {
    let doc = local_document(file, None)?;
    for name in build_parser(settings).list_sheets(&doc)? {
        println!("{}", name);
    }
    Ok(())
}

fn cmd_slides(settings: &Settings, file: &Path) -> anyhow::Result<()> {
    let doc = local_document(file, None)?;
    let slides = build_parser(settings).list_slides(&doc)?;
    println!(
        "{} {} slide{}",
        style("→").cyan(),
        slides.len(),
        if slides.len() == 1 { "" } else { "s" }
    );
    for n in slides {
        println!("  {}", n);
    }
    Ok(())
}

fn cmd_pages(settings: &Settings, file: &Path) -> anyhow::Result<()> {
    let doc = local_document(file, Some("application/pdf"))?;
    if !doc.is_pdf() {
        anyhow::bail!("Not a PDF: {}", file.display());
    }
    println!("{}", build_parser(settings).page_count(&doc)?);
    Ok(())
}

fn cmd_converters(settings: &Settings) -> anyhow::Result<()> {
    let registry = ConverterRegistry::from_configs(&settings.pdf_converters);

    println!("\n{}", style("PDF Converters").bold());
    println!("{}", "-".repeat(50));

    if registry.converters().is_empty() {
        println!("  {}", style("none configured, raw page text only").dim());
    }
    for converter in registry.converters() {
        let status = if converter.is_available() {
            style("✓ available").green()
        } else {
            style("✗ not available").red()
        };
        println!(
            "  {:<15} {:<15} {}",
            converter.name(),
            converter.shape().as_str(),
            status
        );
        if !converter.is_available() {
            println!(
                "                  {}",
                style(converter.availability_hint()).dim()
            );
        }
    }
    println!(
        "  {:<15} {:<15} {}",
        "raw",
        "per_page",
        style("✓ always").green()
    );
    Ok(())
}
