// Application settings
// Loaded from ~/.config/peoplesay/settings.json (or $PEOPLESAY_CONFIG)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use peoplesay_engine::{AnalysisType, CitationPolicy};

/// Overrides the settings file location.
pub const CONFIG_ENV: &str = "PEOPLESAY_CONFIG";

/// Language-model provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// AI features disabled
    None,
    /// Google Gemini (generateContent)
    #[default]
    Gemini,
    /// OpenAI (chat/completions)
    #[serde(rename = "openai")]
    OpenAI,
}

/// Gemini models offered by `ai doctor`, most capable first.
pub const GEMINI_MODELS: &[(&str, &str)] = &[
    ("models/gemini-2.5-flash", "Most intelligent (Gemini 2.5 Flash)"),
    ("models/gemini-2.0-flash", "Balanced (Gemini 2.0 Flash)"),
    ("models/gemini-1.5-flash", "Fastest (Gemini 1.5 Flash)"),
];

impl LlmProvider {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, LlmProvider::None)
    }

    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::None => "none",
            LlmProvider::Gemini => "gemini",
            LlmProvider::OpenAI => "openai",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::None => "",
            LlmProvider::Gemini => GEMINI_MODELS[0].0,
            LlmProvider::OpenAI => "gpt-4o-mini",
        }
    }

    /// Base URL used when `ai.endpoint` is unset.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            LlmProvider::None => "",
            LlmProvider::Gemini => "https://generativelanguage.googleapis.com",
            LlmProvider::OpenAI => "https://api.openai.com/v1",
        }
    }

    /// Models listed by `ai doctor`, as `(id, description)`.
    pub fn known_models(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            LlmProvider::Gemini => GEMINI_MODELS,
            LlmProvider::OpenAI => &[("gpt-4o-mini", "Fast and inexpensive"), ("gpt-4o", "Most capable")],
            LlmProvider::None => &[],
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAI),
            other => Err(format!("unknown provider '{other}' (expected none, gemini, or openai)")),
        }
    }
}

/// Language-model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmProvider,

    /// Model identifier. Empty = provider default.
    pub model: String,

    /// Base URL override (proxies, test servers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    pub timeout_secs: u64,

    pub temperature: f32,

    /// Check the key against the provider before running a question.
    pub verify_key: bool,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: String::new(),
            endpoint: None,
            timeout_secs: 60,
            temperature: 0.2,
            verify_key: true,
        }
    }
}

impl LlmSettings {
    /// User-specified model or the provider default
    pub fn effective_model(&self) -> &str {
        if self.model.is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }

    pub fn effective_endpoint(&self) -> &str {
        match self.endpoint.as_deref() {
            Some(endpoint) if !endpoint.trim().is_empty() => endpoint.trim_end_matches('/'),
            _ => self.provider.default_endpoint(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// peoplesay.db location. None = `<data_dir>/peoplesay/peoplesay.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl DatabaseSettings {
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("peoplesay")
            .join("peoplesay.db")
    }

    pub fn effective_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(Self::default_path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    pub citations: CitationPolicy,
    pub default_analysis: AnalysisType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub ai: LlmSettings,
    pub synthesis: SynthesisSettings,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Serialize(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "settings I/O error: {}", msg),
            ConfigError::Serialize(msg) => write!(f, "settings serialization error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

const DEFAULT_FILE: &str = r#"{
    // Excerpt database (built with `peoplesay init-db`)
    // "database": { "path": "/path/to/peoplesay.db" },

    // Language model
    // Provider options: "gemini", "openai", "none"
    // Keys are read from PEOPLESAY_GEMINI_KEY / GOOGLE_API_KEY or
    // PEOPLESAY_OPENAI_KEY / OPENAI_API_KEY, never from this file
    "ai": {
        "provider": "gemini",
        "model": "",
        "timeout_secs": 60,
        "temperature": 0.2,
        "verify_key": true
    },

    // Summaries
    // citations: "report" flags unknown source ids, "strict" fails the run
    // default_analysis: "thematic", "narrative", "demographic_comparison", "policy_implications"
    "synthesis": {
        "citations": "report",
        "default_analysis": "thematic"
    }
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("peoplesay")
            .join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`, writing the commented default file if it is missing.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            Self::create_default_file(path);
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                log::warn!("error parsing {}: {}; using default settings", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                log::warn!("error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON, ignoring lines that start with `//`.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::write(path, json).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Create default settings file with comments
    fn create_default_file(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("error creating config directory: {}", e);
                return;
            }
        }
        match fs::write(path, DEFAULT_FILE) {
            Ok(()) => log::info!("wrote default settings to {}", path.display()),
            Err(e) => log::warn!("error writing default settings.json: {}", e),
        }
    }
}
