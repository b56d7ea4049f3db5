//! Document to markdown extraction.
//!
//! A stored document is classified by extension and declared content type,
//! routed to a format-specific extractor and returned as markdown. PDFs try
//! external semantic converters before falling back to raw page text. Other
//! formats are capped at a configured length and may optionally be rewritten
//! by a remote language model.
//!
//! ```no_run
//! use uniparse::extract::PdfExtractor;
//! use uniparse::llm::{LlmClient, LlmConfig};
//! use uniparse::models::{DocumentReference, ExtractionSelector};
//! use uniparse::parser::DocumentParser;
//!
//! let parser = DocumentParser::new(LlmConfig::default(), PdfExtractor::raw_only(), LlmClient::new());
//! let doc = DocumentReference::from_path("report.docx", None);
//! let outcome = parser.extract(&doc, &ExtractionSelector::default())?;
//! println!("{}", outcome.markdown);
//! # Ok::<(), uniparse::parser::ParseError>(())
//! ```

pub mod cli;
pub mod config;
pub mod extract;
pub mod llm;
pub mod models;
pub mod parser;
pub mod server;
pub mod storage;
