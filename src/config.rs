//! Configuration management.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::extract::pdf::{default_converters, ConverterConfig};
use crate::llm::LlmConfig;

/// Default documents subdirectory name.
const DOCUMENTS_SUBDIR: &str = "documents";

/// Default bind address for the HTTP server.
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Default request body ceiling for uploads (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Directory for stored uploads.
    pub documents_dir: PathBuf,
    /// Origins allowed by CORS; `*` allows any.
    pub allowed_origins: Vec<String>,
    /// Largest accepted request body in bytes.
    pub max_upload_bytes: usize,
    /// Address the server binds to when none is given.
    pub bind: String,
    /// Process-wide refinement defaults.
    pub llm: LlmConfig,
    /// PDF converters, tried in order.
    pub pdf_converters: Vec<ConverterConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("uniparse");

        Self {
            documents_dir: data_dir.join(DOCUMENTS_SUBDIR),
            data_dir,
            allowed_origins: vec!["*".to_string()],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            bind: DEFAULT_BIND.to_string(),
            llm: LlmConfig::default(),
            pdf_converters: default_converters(),
        }
    }
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            documents_dir: data_dir.join(DOCUMENTS_SUBDIR),
            data_dir,
            ..Default::default()
        }
    }

    pub fn set_data_dir(&mut self, data_dir: PathBuf) {
        self.documents_dir = data_dir.join(DOCUMENTS_SUBDIR);
        self.data_dir = data_dir;
    }

    /// Whether CORS should accept any origin.
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }

    /// Ensure all directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.documents_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create documents directory '{}': {}",
                    self.documents_dir.display(),
                    e
                ),
            )
        })
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `UP_DATA_DIR`: data directory (`~` is expanded)
    /// - `UP_ALLOWED_ORIGINS`: comma-separated CORS origins
    /// - `UP_MAX_UPLOAD_BYTES`: request body ceiling
    /// - every `UP_LLM_*` variable understood by [`LlmConfig`]
    pub fn with_env_overrides(self) -> Self {
        self.with_vars(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_vars<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("UP_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            self.set_data_dir(PathBuf::from(shellexpand::tilde(dir.trim()).as_ref()));
        }
        if let Some(origins) = lookup("UP_ALLOWED_ORIGINS") {
            let parsed = parse_origins(&origins);
            self.allowed_origins = if parsed.is_empty() {
                vec!["*".to_string()]
            } else {
                parsed
            };
        }
        if let Some(limit) = lookup("UP_MAX_UPLOAD_BYTES") {
            match limit.trim().parse() {
                Ok(n) => self.max_upload_bytes = n,
                Err(_) => warn!("ignoring invalid UP_MAX_UPLOAD_BYTES={:?}", limit),
            }
        }
        self.llm = self.llm.with_vars(&lookup);
        self
    }
}

/// PDF section of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfConfig {
    /// Converters replacing the built-in list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converters: Option<Vec<ConverterConfig>>,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// CORS origins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<Vec<String>>,
    /// Request body ceiling in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes: Option<usize>,
    /// Server bind address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    /// Refinement defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
    /// PDF converter settings.
    #[serde(default)]
    pub pdf: PdfConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers uniparse config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("uniparse").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            warn!("{}", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            Err(_) => {
                debug!("no uniparse config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration text in the format named by `ext`.
    pub fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "toml" => {
                toml::from_str(contents).map_err(|e| format!("Failed to parse TOML config: {}", e))
            }
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.set_data_dir(self.resolve_path(data_dir, base_dir));
        }
        if let Some(ref origins) = self.allowed_origins {
            settings.allowed_origins = origins.clone();
        }
        if let Some(limit) = self.max_upload_bytes {
            settings.max_upload_bytes = limit;
        }
        if let Some(ref bind) = self.bind {
            settings.bind = bind.clone();
        }
        if let Some(ref llm) = self.llm {
            settings.llm = llm.clone();
        }
        if let Some(ref converters) = self.pdf.converters {
            settings.pdf_converters = converters.clone();
        }
    }
}

/// Build settings from defaults, the discovered config file and the
/// environment, in that order. `data_dir` wins over all of them.
pub async fn load_settings(data_dir: Option<PathBuf>) -> Settings {
    let config = Config::load().await;
    let base_dir = config
        .base_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    let mut settings = settings.with_env_overrides();
    if let Some(dir) = data_dir {
        settings.set_data_dir(dir);
    }
    settings
}
