//! Semantic PDF-to-markdown converters.
//!
//! A converter is an external program that understands PDF layout well
//! enough to produce real markdown. Converters may or may not be installed
//! and differ in how they accept a page restriction, so each one declares a
//! [`CallShape`] and an availability check, and the [`ConverterRegistry`]
//! walks them in order until one produces output.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::extract::ExtractionError;

/// How a converter accepts a page restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    /// Converts the whole document only; cannot honour a page selector.
    WholeDocument,
    /// Takes a list of zero-based page indices.
    PageList,
    /// Takes a single 1-based page number.
    PageNumber,
}

impl CallShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WholeDocument => "whole-document",
            Self::PageList => "page-list",
            Self::PageNumber => "page-number",
        }
    }

    pub fn supports_pages(&self) -> bool {
        !matches!(self, Self::WholeDocument)
    }
}

impl std::fmt::Display for CallShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A PDF-to-markdown converter.
pub trait SemanticConverter: Send + Sync {
    /// Name used in logs and listings.
    fn name(&self) -> &str;

    fn shape(&self) -> CallShape;

    /// Whether the converter can run on this machine.
    fn is_available(&self) -> bool;

    /// Hint shown when the converter is unavailable.
    fn availability_hint(&self) -> String;

    /// Convert the document, or only `page` (1-based) when given.
    fn convert(&self, path: &Path, page: Option<u32>) -> Result<String, ExtractionError>;
}

/// Configuration for a command-line converter.
///
/// `args` may contain `{file}`, `{pages}` (JSON list of zero-based indices)
/// and `{page}` (1-based number). Arguments holding a page placeholder are
/// dropped when no page is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Arguments for a quick invocation that must succeed for the converter
    /// to count as available.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub probe: Vec<String>,
    /// Seconds a conversion may run before it is killed.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    300
}

const PYMUPDF4LLM_SCRIPT: &str = "import json, sys\n\
import pymupdf4llm\n\
pages = json.loads(sys.argv[2]) if len(sys.argv) > 2 else None\n\
sys.stdout.write(pymupdf4llm.to_markdown(sys.argv[1], pages=pages))\n";

/// Converters tried when configuration does not name any.
pub fn default_converters() -> Vec<ConverterConfig> {
    vec![
        ConverterConfig {
            name: "pymupdf4llm".to_string(),
            command: "python3".to_string(),
            args: vec![
                "-c".to_string(),
                PYMUPDF4LLM_SCRIPT.to_string(),
                "{file}".to_string(),
                "{pages}".to_string(),
            ],
            probe: vec!["-c".to_string(), "import pymupdf4llm".to_string()],
            timeout_secs: default_timeout_secs(),
        },
        ConverterConfig {
            name: "markitdown".to_string(),
            command: "markitdown".to_string(),
            args: vec!["{file}".to_string()],
            probe: Vec::new(),
            timeout_secs: default_timeout_secs(),
        },
    ]
}

/// Converter backed by an external command writing markdown to stdout.
pub struct CommandConverter {
    config: ConverterConfig,
    shape: CallShape,
    available: OnceLock<bool>,
}

impl CommandConverter {
    pub fn new(config: ConverterConfig) -> Self {
        let shape = shape_of(&config.args);
        Self {
            config,
            shape,
            available: OnceLock::new(),
        }
    }

    /// Concrete argument list for one invocation.
    fn build_args(&self, path: &Path, page: Option<u32>) -> Vec<String> {
        let file = path.display().to_string();
        self.config
            .args
            .iter()
            .filter_map(|arg| {
                let paged = arg.contains("{pages}") || arg.contains("{page}");
                match (paged, page) {
                    (true, None) => None,
                    (true, Some(n)) => Some(
                        arg.replace("{pages}", &format!("[{}]", n.saturating_sub(1)))
                            .replace("{page}", &n.to_string())
                            .replace("{file}", &file),
                    ),
                    (false, _) => Some(arg.replace("{file}", &file)),
                }
            })
            .collect()
    }

    fn probe(&self) -> bool {
        if which::which(&self.config.command).is_err() {
            return false;
        }
        if self.config.probe.is_empty() {
            return true;
        }
        Command::new(&self.config.command)
            .args(&self.config.probe)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

/// Call shape implied by the placeholders present, checked in fixed order.
fn shape_of(args: &[String]) -> CallShape {
    if args.iter().any(|a| a.contains("{pages}")) {
        CallShape::PageList
    } else if args.iter().any(|a| a.contains("{page}")) {
        CallShape::PageNumber
    } else {
        CallShape::WholeDocument
    }
}

/// Run a command to completion, killing it once `timeout` has passed.
///
/// Pipes are drained on their own threads so a chatty child cannot block
/// on a full pipe while we wait for it.
fn output_with_deadline(command: &mut Command, timeout: Duration) -> std::io::Result<Output> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let drain = |pipe: Option<Box<dyn Read + Send>>| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut pipe) = pipe {
                let _ = pipe.read_to_end(&mut buf);
            }
            buf
        })
    };
    let stdout = drain(child.stdout.take().map(|p| Box::new(p) as Box<dyn Read + Send>));
    let stderr = drain(child.stderr.take().map(|p| Box::new(p) as Box<dyn Read + Send>));

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("timed out after {}s", timeout.as_secs()),
            ));
        }
        thread::sleep(Duration::from_millis(50));
    };

    Ok(Output {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

/// Stdout of a finished command, or an error naming the converter.
fn handle_cmd_output(
    result: std::io::Result<std::process::Output>,
    tool_name: &str,
) -> Result<String, ExtractionError> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ExtractionError::Failed(format!(
                    "{} exited with {}: {}",
                    tool_name,
                    output.status,
                    stderr.trim()
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
            Err(ExtractionError::Failed(format!("{} {}", tool_name, e)))
        }
        Err(e) => Err(ExtractionError::Failed(format!(
            "{} could not be started: {}",
            tool_name, e
        ))),
    }
}

impl SemanticConverter for CommandConverter {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn shape(&self) -> CallShape {
        self.shape
    }

    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| self.probe())
    }

    fn availability_hint(&self) -> String {
        if self.config.probe.is_empty() {
            format!("install {} and make sure it is on PATH", self.config.command)
        } else {
            format!(
                "`{} {}` must succeed",
                self.config.command,
                self.config.probe.join(" ")
            )
        }
    }

    fn convert(&self, path: &Path, page: Option<u32>) -> Result<String, ExtractionError> {
        let args = self.build_args(path, page);
        debug!("running {} {:?}", self.config.command, args);
        let result = output_with_deadline(
            Command::new(&self.config.command).args(&args),
            Duration::from_secs(self.config.timeout_secs),
        );
        handle_cmd_output(result, &self.config.name)
    }
}

/// Ordered set of converters tried before the raw fallback.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn SemanticConverter>>,
}

impl ConverterRegistry {
    pub fn new(converters: Vec<Arc<dyn SemanticConverter>>) -> Self {
        Self { converters }
    }

    /// Registry of command converters built from configuration.
    pub fn from_configs(configs: &[ConverterConfig]) -> Self {
        let converters = configs
            .iter()
            .cloned()
            .map(|c| Arc::new(CommandConverter::new(c)) as Arc<dyn SemanticConverter>)
            .collect();
        Self { converters }
    }

    /// Registry with no converters; every PDF goes straight to the fallback.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn converters(&self) -> &[Arc<dyn SemanticConverter>] {
        &self.converters
    }

    /// Markdown from the first converter that produces any.
    ///
    /// With a page selector, converters that cannot take one are skipped
    /// silently. Unavailable converters, failures and blank output move on
    /// to the next converter. `None` means the raw fallback should run.
    pub fn convert(&self, path: &Path, page: Option<u32>) -> Option<String> {
        for converter in &self.converters {
            if page.is_some() && !converter.shape().supports_pages() {
                debug!(
                    "{} cannot convert a single page, skipping",
                    converter.name()
                );
                continue;
            }
            if !converter.is_available() {
                debug!(
                    "{} not available ({})",
                    converter.name(),
                    converter.availability_hint()
                );
                continue;
            }

            match converter.convert(path, page) {
                Ok(markdown) if !markdown.trim().is_empty() => {
                    info!("converted {} with {}", path.display(), converter.name());
                    return Some(markdown);
                }
                Ok(_) => warn!("{} produced no output, trying next", converter.name()),
                Err(e) => warn!("{} failed: {}, trying next", converter.name(), e),
            }
        }
        None
    }
}
