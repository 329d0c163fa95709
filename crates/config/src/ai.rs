// Credential lookup and resolved language-model configuration
//
// API keys come from, in order:
// 1. An explicit value (the --api-key flag)
// 2. System keychain (read-only, `keychain` feature)
// 3. Environment variables
//
// Keys are NEVER stored in settings.json and never written anywhere.

use std::env;
use std::fmt;

use crate::settings::{LlmProvider, LlmSettings};

/// Service name for keychain lookup
#[cfg(feature = "keychain")]
const KEYCHAIN_SERVICE: &str = "peoplesay";

/// Source of an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Passed on the command line
    Flag,
    /// Key retrieved from system keychain
    Keychain,
    /// Key retrieved from environment variable
    Environment,
    /// No key found
    None,
}

impl KeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySource::Flag => "flag",
            KeySource::Keychain => "keychain",
            KeySource::Environment => "environment",
            KeySource::None => "none",
        }
    }
}

/// Result of key lookup
#[derive(Clone)]
pub struct KeyLookup {
    pub key: Option<String>,
    pub source: KeySource,
    /// Environment variable the key came from, if any
    pub variable: Option<String>,
}

impl fmt::Debug for KeyLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyLookup")
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("source", &self.source)
            .field("variable", &self.variable)
            .finish()
    }
}

/// Environment variables checked for a provider, most specific first.
pub fn env_var_names(provider: LlmProvider) -> Vec<String> {
    let mut names = vec![format!("PEOPLESAY_{}_KEY", provider.name().to_uppercase())];
    match provider {
        LlmProvider::Gemini => names.push("GOOGLE_API_KEY".to_string()),
        LlmProvider::OpenAI => names.push("OPENAI_API_KEY".to_string()),
        LlmProvider::None => {}
    }
    names
}

#[cfg(feature = "keychain")]
fn keychain_account(provider: LlmProvider) -> String {
    format!("ai/{}", provider.name())
}

/// Get an API key for `provider` from the process environment.
pub fn get_api_key(provider: LlmProvider, explicit: Option<&str>) -> KeyLookup {
    lookup_key(provider, explicit, |name| env::var(name).ok())
}

/// Key lookup with an injectable environment.
pub fn lookup_key<F>(provider: LlmProvider, explicit: Option<&str>, env_lookup: F) -> KeyLookup
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = explicit.map(str::trim).filter(|k| !k.is_empty()) {
        return KeyLookup { key: Some(key.to_string()), source: KeySource::Flag, variable: None };
    }

    #[cfg(feature = "keychain")]
    {
        if let Ok(entry) = keyring::Entry::new(KEYCHAIN_SERVICE, &keychain_account(provider)) {
            if let Ok(key) = entry.get_password() {
                return KeyLookup { key: Some(key), source: KeySource::Keychain, variable: None };
            }
        }
    }

    for name in env_var_names(provider) {
        if let Some(key) = env_lookup(&name).filter(|k| !k.trim().is_empty()) {
            return KeyLookup {
                key: Some(key.trim().to_string()),
                source: KeySource::Environment,
                variable: Some(name),
            };
        }
    }

    KeyLookup { key: None, source: KeySource::None, variable: None }
}

/// Check if keychain support is available
pub fn keychain_available() -> bool {
    #[cfg(feature = "keychain")]
    {
        keyring::Entry::new(KEYCHAIN_SERVICE, "probe").is_ok()
    }
    #[cfg(not(feature = "keychain"))]
    {
        false
    }
}

// ============================================================================
// Resolved configuration (single source of truth)
// ============================================================================

/// Status of the resolved configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmConfigStatus {
    /// provider = none
    Disabled,
    Ready,
    MissingKey,
}

impl LlmConfigStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Ready => "ready",
            Self::MissingKey => "missing_key",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// The effective language-model configuration, fully resolved from all
/// sources. Every provider call is built from one of these.
#[derive(Clone)]
pub struct ResolvedLlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    /// Base URL, trailing slash removed
    pub endpoint: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub verify_key: bool,
    pub api_key: Option<String>,
    pub key_source: KeySource,
    pub key_variable: Option<String>,
    pub status: LlmConfigStatus,
    /// Human-readable reason if not ready
    pub blocking_reason: Option<String>,
}

impl ResolvedLlmConfig {
    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self::resolve(settings, None)
    }

    /// Resolve with an explicit key taking precedence over every other source.
    pub fn resolve(settings: &LlmSettings, explicit_key: Option<&str>) -> Self {
        let lookup = if settings.provider.is_enabled() {
            get_api_key(settings.provider, explicit_key)
        } else {
            KeyLookup { key: None, source: KeySource::None, variable: None }
        };
        Self::with_lookup(settings, lookup)
    }

    pub fn with_lookup(settings: &LlmSettings, lookup: KeyLookup) -> Self {
        let provider = settings.provider;

        if !provider.is_enabled() {
            return Self {
                provider,
                model: String::new(),
                endpoint: String::new(),
                timeout_secs: settings.timeout_secs,
                temperature: settings.temperature,
                verify_key: settings.verify_key,
                api_key: None,
                key_source: KeySource::None,
                key_variable: None,
                status: LlmConfigStatus::Disabled,
                blocking_reason: Some("AI provider is set to none".to_string()),
            };
        }

        let (status, blocking_reason) = if lookup.key.is_some() {
            (LlmConfigStatus::Ready, None)
        } else {
            (
                LlmConfigStatus::MissingKey,
                Some(format!(
                    "No API key found. Pass --api-key or set {}",
                    env_var_names(provider).join(" or ")
                )),
            )
        };

        Self {
            provider,
            model: settings.effective_model().to_string(),
            endpoint: settings.effective_endpoint().to_string(),
            timeout_secs: settings.timeout_secs,
            temperature: settings.temperature,
            verify_key: settings.verify_key,
            api_key: lookup.key,
            key_source: lookup.source,
            key_variable: lookup.variable,
            status,
            blocking_reason,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

impl fmt::Debug for ResolvedLlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedLlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("verify_key", &self.verify_key)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("key_source", &self.key_source)
            .field("status", &self.status)
            .finish()
    }
}

// ============================================================================
// Diagnostics (for `ai doctor`)
// ============================================================================

#[derive(Debug)]
pub struct LlmDiagnostics {
    pub provider: String,
    pub model: String,
    pub endpoint: String,
    pub status: LlmConfigStatus,
    pub key_present: bool,
    pub key_source: KeySource,
    pub key_variable: Option<String>,
    pub keychain_available: bool,
    pub timeout_secs: u64,
    pub verify_key: bool,
    pub blocking_reason: Option<String>,
}

impl LlmDiagnostics {
    pub fn from_resolved(config: &ResolvedLlmConfig) -> Self {
        Self {
            provider: config.provider.name().to_string(),
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            status: config.status,
            key_present: config.api_key.is_some(),
            key_source: config.key_source,
            key_variable: config.key_variable.clone(),
            keychain_available: keychain_available(),
            timeout_secs: config.timeout_secs,
            verify_key: config.verify_key,
            blocking_reason: config.blocking_reason.clone(),
        }
    }
}

impl fmt::Display for LlmDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "AI Configuration")?;
        writeln!(f, "──────────────────────────────")?;
        writeln!(f, "Provider:          {}", self.provider)?;
        writeln!(f, "Status:            {}", self.status.as_str())?;
        if !self.model.is_empty() {
            writeln!(f, "Model:             {}", self.model)?;
        }
        if !self.endpoint.is_empty() {
            writeln!(f, "Endpoint:          {}", self.endpoint)?;
        }
        writeln!(f, "Key present:       {}", if self.key_present { "yes" } else { "no" })?;
        match &self.key_variable {
            Some(var) => writeln!(f, "Key source:        {} ({})", self.key_source.as_str(), var)?,
            None => writeln!(f, "Key source:        {}", self.key_source.as_str())?,
        }
        writeln!(f, "Keychain available:{}", if self.keychain_available { "yes" } else { "no" })?;
        writeln!(f, "Timeout:           {}s", self.timeout_secs)?;
        writeln!(f, "Verify key:        {}", if self.verify_key { "yes" } else { "no" })?;
        if let Some(reason) = &self.blocking_reason {
            writeln!(f, "Blocking:          {}", reason)?;
        }
        Ok(())
    }
}
