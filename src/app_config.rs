/*!
 * Application configuration.
 *
 * Settings live in a JSON file (`conf.json` by default) that is created with
 * defaults when missing. Every field has a serde default so that partial
 * files keep working across versions.
 */

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::extract::RunDetectionConfig;
use crate::translation::batch::ScopeOptions;
use crate::translation::glossary::Glossary;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "conf.json";

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO), or "auto"
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Deck processing options
    #[serde(default)]
    pub deck: DeckConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    #[default]
    Ollama,
    OpenAI,
    Anthropic,
    /// LM Studio local server, OpenAI-compatible
    LMStudio,
}

impl TranslationProvider {
    pub const ALL: [TranslationProvider; 4] = [Self::Ollama, Self::OpenAI, Self::Anthropic, Self::LMStudio];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    /// Identifier used in the config file
    pub fn id(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::LMStudio => "lmstudio",
        }
    }

    /// Whether the provider refuses requests without an API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }

    fn default_model(&self) -> &'static str {
        match self {
            Self::Ollama => "llama3.2:3b",
            Self::OpenAI => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-haiku-latest",
            Self::LMStudio => "local-model",
        }
    }

    fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Ollama => "http://localhost:11434",
            Self::OpenAI => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com",
            Self::LMStudio => "http://localhost:1234/v1",
        }
    }

    /// Requests per minute; local servers are not limited
    fn default_rate_limit(&self) -> Option<u32> {
        match self {
            Self::Ollama | Self::LMStudio => None,
            Self::OpenAI => Some(60),
            // Slightly below the 50 rpm tier limit
            Self::Anthropic => Some(45),
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.id() == lowered)
            .ok_or_else(|| anyhow!("Invalid provider type: {}", s))
    }
}

/// Settings for one provider
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub provider_type: String,

    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub endpoint: String,

    /// Chunks translated in parallel
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Requests per minute, `None` or 0 to disable
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl ProviderConfig {
    /// Provider config with defaults
    pub fn new(provider: TranslationProvider) -> Self {
        Self {
            provider_type: provider.id().to_string(),
            model: provider.default_model().to_string(),
            api_key: String::new(),
            endpoint: provider.default_endpoint().to_string(),
            concurrent_requests: default_concurrent_requests(),
            timeout_secs: default_timeout_secs(),
            rate_limit: provider.default_rate_limit(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Settings shared by all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound for completion tokens per chunk
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Options that shape how a deck is extracted and rewritten
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DeckConfig {
    /// Glossary in `Term=Translation` lines
    #[serde(default)]
    pub glossary: String,

    /// Shapes and groups whose name matches are skipped, empty for none
    #[serde(default)]
    pub exclude_pattern: String,

    /// Join paragraphs with line breaks rather than spaces
    #[serde(default = "default_true")]
    pub keep_line_breaks: bool,

    #[serde(default)]
    pub fit_to_length: bool,

    /// Percentage, 0 to 100
    #[serde(default = "default_fit_to_length_strength")]
    pub fit_to_length_strength: u8,

    #[serde(default = "default_true")]
    pub reapply_underline: bool,

    /// Text length from which run detection switches to bisection
    #[serde(default = "default_scan_threshold")]
    pub scan_threshold: usize,

    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    #[serde(default = "default_max_chunk_items")]
    pub max_chunk_items: usize,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            glossary: String::new(),
            exclude_pattern: String::new(),
            keep_line_breaks: true,
            fit_to_length: false,
            fit_to_length_strength: default_fit_to_length_strength(),
            reapply_underline: true,
            scan_threshold: default_scan_threshold(),
            max_chunk_chars: default_max_chunk_chars(),
            max_chunk_items: default_max_chunk_items(),
        }
    }
}

impl DeckConfig {
    /// Compiled exclusion pattern, `None` when empty
    pub fn exclusion_regex(&self) -> Result<Option<Regex>> {
        if self.exclude_pattern.trim().is_empty() {
            return Ok(None);
        }
        Regex::new(&self.exclude_pattern)
            .map(Some)
            .with_context(|| format!("Invalid exclude pattern: {}", self.exclude_pattern))
    }

    pub fn run_detection(&self) -> RunDetectionConfig {
        RunDetectionConfig {
            scan_threshold: self.scan_threshold,
            ..RunDetectionConfig::default()
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "fr".to_string()
}

fn default_concurrent_requests() -> usize {
    3
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_true() -> bool {
    true
}

fn default_fit_to_length_strength() -> u8 {
    50
}

fn default_scan_threshold() -> usize {
    1500
}

fn default_max_chunk_chars() -> usize {
    12_000
}

fn default_max_chunk_items() -> usize {
    60
}

impl Config {
    /// Load the config file, or write and return the defaults when missing
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            return serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()));
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        fs::write(path, json).with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if !crate::language_utils::is_auto(&self.source_language) {
            crate::language_utils::validate_language_code(&self.source_language)
                .context("Invalid source language")?;
        }
        crate::language_utils::validate_language_code(&self.target_language)
            .context("Invalid target language")?;

        let provider = self.translation.provider;
        if provider.requires_api_key() && self.translation.get_api_key().is_empty() {
            return Err(anyhow!(
                "Translation API key is required for {} provider",
                provider.display_name()
            ));
        }

        self.deck.exclusion_regex()?;

        if self.deck.fit_to_length_strength > 100 {
            return Err(anyhow!(
                "fit_to_length_strength must be between 0 and 100, got {}",
                self.deck.fit_to_length_strength
            ));
        }
        if self.deck.max_chunk_chars == 0 || self.deck.max_chunk_items == 0 {
            return Err(anyhow!("Chunk limits must be greater than zero"));
        }

        Ok(())
    }

    /// Immutable options for one translate scope
    pub fn scope_options(&self) -> ScopeOptions {
        ScopeOptions {
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
            glossary: Glossary::parse(&self.deck.glossary),
            fit_to_length: self
                .deck
                .fit_to_length
                .then_some(self.deck.fit_to_length_strength.min(100)),
            keep_line_breaks: self.deck.keep_line_breaks,
            reapply_underline: self.deck.reapply_underline,
            max_chunk_chars: self.deck.max_chunk_chars,
            max_chunk_items: self.deck.max_chunk_items,
            concurrency: self.translation.concurrent_requests(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            translation: TranslationConfig::default(),
            deck: DeckConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

/// Pick the config file to use.
///
/// An explicit path always wins. The default `conf.json` falls back to the
/// user config directory when it is absent from the working directory but
/// present there.
pub fn resolve_config_path(requested: &str) -> PathBuf {
    let requested_path = PathBuf::from(requested);
    if requested != DEFAULT_CONFIG_FILE || requested_path.exists() {
        return requested_path;
    }
    dirs::config_dir()
        .map(|dir| dir.join("slidelingo").join(DEFAULT_CONFIG_FILE))
        .filter(|candidate| candidate.exists())
        .unwrap_or(requested_path)
}

impl TranslationConfig {
    /// Get the active provider configuration
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(self.provider)
    }

    pub fn get_provider_config(&self, provider: TranslationProvider) -> Option<&ProviderConfig> {
        self.available_providers.iter().find(|p| p.provider_type == provider.id())
    }

    /// Mutable access to a provider entry, created with defaults when absent
    pub fn provider_config_mut(&mut self, provider: TranslationProvider) -> &mut ProviderConfig {
        let position = self
            .available_providers
            .iter()
            .position(|p| p.provider_type == provider.id());
        let index = match position {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(provider));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    pub fn get_model(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.model.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    pub fn get_endpoint(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.endpoint.clone())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| self.provider.default_endpoint().to_string())
    }

    pub fn get_rate_limit(&self) -> Option<u32> {
        match self.get_active_provider_config() {
            Some(p) => p.rate_limit,
            None => self.provider.default_rate_limit(),
        }
    }

    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .unwrap_or_else(default_timeout_secs)
    }

    pub fn concurrent_requests(&self) -> usize {
        self.get_active_provider_config()
            .map(|p| p.concurrent_requests)
            .unwrap_or_else(default_concurrent_requests)
            .max(1)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: TranslationProvider::ALL.into_iter().map(ProviderConfig::new).collect(),
            common: TranslationCommonConfig::default(),
        }
    }
}
