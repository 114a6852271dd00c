//! Configuration management for LexChat.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (.lexchat/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Everything the retriever and generator adapters need (model identifiers,
//! index location, retrieval `k`, prompt template, timeouts) is resolved here
//! and injected at construction time. Nothing reads global state afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Providers that can generate answers.
pub const GENERATION_PROVIDERS: [&str; 2] = ["gemini", "ollama"];

/// Providers that can embed queries.
pub const EMBEDDING_PROVIDERS: [&str; 3] = ["gemini", "ollama", "mock"];

/// Environment variable consulted for Gemini when no `apiKeyEnv` is configured.
pub const DEFAULT_GEMINI_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .lexchat/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Generation provider (e.g., "gemini", "ollama")
    pub provider: String,

    /// Generation model identifier
    pub model: String,

    /// API key override for the generation provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Provider table from config.yaml
    pub llm: Option<LlmConfig>,

    /// Retrieval settings
    pub retrieval: RetrievalConfig,

    /// Prompt assembly and generation settings
    pub prompt: PromptConfig,

    /// Timeout and retry policy for external calls
    pub resilience: ResilienceConfig,

    /// Terminal display settings
    pub display: DisplayConfig,

    /// Replacement canned-reply table (trigger -> reply)
    pub canned_replies: Option<BTreeMap<String, String>>,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(rename = "activeEmbeddingProvider")]
    pub active_embedding_provider: Option<String>,

    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Provider table from config.yaml. Each key selects its own settings type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProvidersConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<GeminiProviderConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ollama: Option<OllamaProviderConfig>,
}

/// Settings under `llm.providers.gemini`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiProviderConfig {
    /// Environment variable holding the API key (default `GOOGLE_API_KEY`)
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub embedding_model: Option<String>,
    pub endpoint: Option<String>,
}

impl GeminiProviderConfig {
    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(DEFAULT_GEMINI_KEY_ENV)
    }
}

/// Settings under `llm.providers.ollama`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OllamaProviderConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub embedding_model: Option<String>,

    /// Per-request timeout in seconds
    pub timeout: Option<u64>,
}

impl ProvidersConfig {
    /// Generation model configured for `provider`.
    pub fn model(&self, provider: &str) -> Option<&str> {
        match provider {
            "gemini" => self.gemini.as_ref().and_then(|p| p.model.as_deref()),
            "ollama" => self.ollama.as_ref().and_then(|p| p.model.as_deref()),
            _ => None,
        }
    }

    /// Embedding model configured for `provider`.
    pub fn embedding_model(&self, provider: &str) -> Option<&str> {
        match provider {
            "gemini" => self.gemini.as_ref().and_then(|p| p.embedding_model.as_deref()),
            "ollama" => self.ollama.as_ref().and_then(|p| p.embedding_model.as_deref()),
            _ => None,
        }
    }

    /// Custom endpoint configured for `provider`.
    pub fn endpoint(&self, provider: &str) -> Option<&str> {
        match provider {
            "gemini" => self.gemini.as_ref().and_then(|p| p.endpoint.as_deref()),
            "ollama" => self.ollama.as_ref().and_then(|p| p.endpoint.as_deref()),
            _ => None,
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalConfig {
    /// Location of the pre-built index store (relative paths resolve against the workspace)
    pub index_path: PathBuf,

    /// Number of neighbours requested per query
    pub top_k: usize,

    /// Drop chunks scoring below this value
    pub min_score: Option<f32>,

    /// Embedding provider ("gemini", "ollama", "mock")
    pub embedding_provider: String,

    /// Embedding model identifier
    pub embedding_model: String,

    /// Embedding vector dimensions
    pub embedding_dimensions: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from(".lexchat/index.sqlite"),
            top_k: 8,
            min_score: None,
            embedding_provider: "gemini".to_string(),
            embedding_model: "models/embedding-001".to_string(),
            embedding_dimensions: 768,
        }
    }
}

/// Prompt assembly and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PromptConfig {
    /// Prompt definition id looked up under .lexchat/prompts/
    pub template_id: String,

    /// Inline system template; takes precedence over `template_id`
    pub template: Option<String>,

    /// Cap on the context block length in characters
    pub max_context_chars: Option<usize>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Collect the answer from a streaming response
    pub stream: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            template_id: "rag.system.default".to_string(),
            template: None,
            max_context_chars: None,
            temperature: None,
            max_tokens: None,
            stream: false,
        }
    }
}

/// Timeout and retry policy applied to embedder, index and generator calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ResilienceConfig {
    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,

    /// Extra attempts after the first failure
    pub retries: u32,

    /// Initial backoff between attempts in milliseconds (doubles each retry)
    pub backoff_ms: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retries: 1,
            backoff_ms: 250,
        }
    }
}

impl ResilienceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Terminal display settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplayConfig {
    /// Render answers with a typing effect
    pub typing: bool,

    /// Delay between fragments in milliseconds
    pub typing_delay_ms: u64,

    /// Grapheme clusters printed per fragment
    pub graphemes_per_fragment: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            typing: true,
            typing_delay_ms: 20,
            graphemes_per_fragment: 1,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    retrieval: Option<RetrievalSection>,
    prompt: Option<PromptConfig>,
    resilience: Option<ResilienceConfig>,
    display: Option<DisplayConfig>,
    canned_replies: Option<BTreeMap<String, String>>,
}

/// `retrieval` section as written; only the keys present override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalSection {
    index_path: Option<PathBuf>,
    top_k: Option<usize>,
    min_score: Option<f32>,
    embedding_provider: Option<String>,
    embedding_model: Option<String>,
    embedding_dimensions: Option<usize>,
}

impl RetrievalSection {
    fn apply(self, retrieval: &mut RetrievalConfig) {
        if let Some(index_path) = self.index_path {
            retrieval.index_path = index_path;
        }
        if let Some(top_k) = self.top_k {
            retrieval.top_k = top_k;
        }
        if self.min_score.is_some() {
            retrieval.min_score = self.min_score;
        }
        if let Some(provider) = self.embedding_provider {
            retrieval.embedding_provider = provider;
        }
        if let Some(model) = self.embedding_model {
            retrieval.embedding_model = model;
        }
        if let Some(dimensions) = self.embedding_dimensions {
            retrieval.embedding_dimensions = dimensions;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "gemini".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            retrieval: RetrievalConfig::default(),
            prompt: PromptConfig::default(),
            resilience: ResilienceConfig::default(),
            display: DisplayConfig::default(),
            canned_replies: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and environment variables.
    ///
    /// Environment variables:
    /// - `LEXCHAT_WORKSPACE`: Override workspace path
    /// - `LEXCHAT_CONFIG`: Path to config file
    /// - `LEXCHAT_PROVIDER`: Generation provider
    /// - `LEXCHAT_MODEL`: Generation model identifier
    /// - `LEXCHAT_API_KEY`: API key
    /// - `LEXCHAT_INDEX`: Index store location
    /// - `LEXCHAT_TOP_K`: Retrieval `k`
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use lexchat_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Index: {:?}", config.index_path());
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Load configuration, with an explicit workspace and config file taking
    /// precedence over `LEXCHAT_WORKSPACE` and `LEXCHAT_CONFIG`.
    pub fn load_with(
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
    ) -> AppResult<Self> {
        let mut config = Self::default();

        let workspace =
            workspace.or_else(|| std::env::var("LEXCHAT_WORKSPACE").ok().map(PathBuf::from));
        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var("LEXCHAT_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.lexchat_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("LEXCHAT_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("LEXCHAT_MODEL") {
            config.model = model;
        }

        if let Ok(index) = std::env::var("LEXCHAT_INDEX") {
            config.retrieval.index_path = PathBuf::from(index);
        }

        if let Ok(top_k) = std::env::var("LEXCHAT_TOP_K") {
            config.retrieval.top_k = top_k.parse().map_err(|e| {
                AppError::Config(format!("Invalid LEXCHAT_TOP_K '{}': {}", top_k, e))
            })?;
        }

        config.api_key = std::env::var("LEXCHAT_API_KEY").ok();

        if config.log_level.is_none() {
            config.log_level = std::env::var("RUST_LOG").ok();
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        tracing::debug!("Merging config file {:?}", path);

        Ok(self.merge(config_file))
    }

    fn merge(mut self, file: ConfigFile) -> Self {
        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            self.workspace = PathBuf::from(path);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }

        if let Some(llm) = file.llm {
            self.provider = llm.active_provider.clone();

            if let Some(model) = llm.providers.model(&llm.active_provider) {
                self.model = model.to_string();
            }

            if let Some(ref embedding_provider) = llm.active_embedding_provider {
                self.retrieval.embedding_provider = embedding_provider.clone();

                if let Some(model) = llm.providers.embedding_model(embedding_provider) {
                    self.retrieval.embedding_model = model.to_string();
                }
            }

            self.llm = Some(llm);
        }

        // Explicit retrieval keys win over `llm.activeEmbeddingProvider`
        if let Some(retrieval) = file.retrieval {
            retrieval.apply(&mut self.retrieval);
        }

        if let Some(prompt) = file.prompt {
            self.prompt = prompt;
        }

        if let Some(resilience) = file.resilience {
            self.resilience = resilience;
        }

        if let Some(display) = file.display {
            self.display = display;
        }

        if let Some(canned) = file.canned_replies {
            self.canned_replies = Some(canned);
        }

        self
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and
    /// the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .lexchat directory.
    pub fn lexchat_dir(&self) -> PathBuf {
        self.workspace.join(".lexchat")
    }

    /// Resolve the index store location against the workspace.
    pub fn index_path(&self) -> PathBuf {
        if self.retrieval.index_path.is_absolute() {
            self.retrieval.index_path.clone()
        } else {
            self.workspace.join(&self.retrieval.index_path)
        }
    }

    /// Provider table from the config file, if any.
    pub fn providers(&self) -> Option<&ProvidersConfig> {
        self.llm.as_ref().map(|llm| &llm.providers)
    }

    /// Custom endpoint for a provider, if configured.
    pub fn resolve_endpoint(&self, provider: &str) -> Option<String> {
        self.providers()
            .and_then(|p| p.endpoint(provider))
            .map(str::to_string)
    }

    /// Environment variable consulted for the Gemini API key.
    pub fn gemini_key_env(&self) -> &str {
        self.providers()
            .and_then(|p| p.gemini.as_ref())
            .map_or(DEFAULT_GEMINI_KEY_ENV, GeminiProviderConfig::api_key_env)
    }

    /// Resolve the API key for a provider.
    ///
    /// Order: `LEXCHAT_API_KEY` / explicit key, then for Gemini the
    /// configured `apiKeyEnv` (default `GOOGLE_API_KEY`).
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match provider {
            "gemini" => std::env::var(self.gemini_key_env()).ok(),
            _ => None,
        }
    }

    /// Per-call timeout configured for a provider (Ollama `timeout` field).
    pub fn provider_timeout(&self, provider: &str) -> Option<Duration> {
        match provider {
            "ollama" => self
                .providers()
                .and_then(|p| p.ollama.as_ref())
                .and_then(|o| o.timeout)
                .map(Duration::from_secs),
            _ => None,
        }
    }

    /// Validate the configuration before building the pipeline.
    pub fn validate(&self) -> AppResult<()> {
        if !GENERATION_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                GENERATION_PROVIDERS.join(", ")
            )));
        }

        let embedding_provider = self.retrieval.embedding_provider.as_str();
        if !EMBEDDING_PROVIDERS.contains(&embedding_provider) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                embedding_provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        for provider in [self.provider.as_str(), embedding_provider] {
            if provider == "gemini" && self.resolve_api_key(provider).is_none() {
                return Err(AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    self.gemini_key_env()
                )));
            }
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "retrieval.topK must be at least 1".to_string(),
            ));
        }

        if self.retrieval.embedding_dimensions == 0 {
            return Err(AppError::Config(
                "retrieval.embeddingDimensions must be at least 1".to_string(),
            ));
        }

        if self.resilience.timeout_secs == 0 {
            return Err(AppError::Config(
                "resilience.timeoutSecs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn ollama_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.provider = "ollama".to_string();
        config.retrieval.embedding_provider = "mock".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "gemini");
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.retrieval.embedding_model, "models/embedding-001");
        assert_eq!(config.resilience.retries, 1);
        assert!(!config.verbose);
        assert!(!config.no_color);
    }

    #[test]
    fn test_index_path_resolution() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/srv/lexchat");
        assert_eq!(
            config.index_path(),
            PathBuf::from("/srv/lexchat/.lexchat/index.sqlite")
        );

        config.retrieval.index_path = PathBuf::from("/data/law.sqlite");
        assert_eq!(config.index_path(), PathBuf::from("/data/law.sqlite"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "ollama");
        assert_eq!(overridden.model, "llama3.2");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(
            &path,
            r#"
llm:
  activeProvider: ollama
  activeEmbeddingProvider: ollama
  providers:
    ollama:
      endpoint: http://localhost:11434
      model: llama3.2
      embeddingModel: nomic-embed-text
retrieval:
  topK: 4
  embeddingDimensions: 768
resilience:
  timeoutSecs: 10
cannedReplies:
  good morning: Good morning! What can I look up for you?
"#,
        )
        .unwrap();

        let config = AppConfig::default().merge_yaml(&path).unwrap();

        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.retrieval.embedding_provider, "ollama");
        assert_eq!(config.retrieval.embedding_model, "nomic-embed-text");
        assert_eq!(config.resilience.timeout_secs, 10);
        assert_eq!(config.resilience.retries, 1);
        assert_eq!(
            config.resolve_endpoint("ollama"),
            Some("http://localhost:11434".to_string())
        );
        assert!(config
            .canned_replies
            .as_ref()
            .is_some_and(|c| c.contains_key("good morning")));
    }

    #[test]
    fn test_merge_invalid_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "retrieval: [not, a, map").unwrap();

        assert!(AppConfig::default().merge_yaml(&path).is_err());
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = ollama_config();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama() {
        let config = ollama_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_top_k() {
        let mut config = ollama_config();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_gemini_missing_key() {
        let mut config = AppConfig::default();
        config.retrieval.embedding_provider = "mock".to_string();
        config.llm = Some(LlmConfig {
            active_provider: "gemini".to_string(),
            active_embedding_provider: None,
            providers: ProvidersConfig {
                gemini: Some(GeminiProviderConfig {
                    api_key_env: Some("LEXCHAT_TEST_KEY_THAT_IS_NEVER_SET".to_string()),
                    model: Some("gemini-1.5-flash".to_string()),
                    ..Default::default()
                }),
                ollama: None,
            },
        });

        let err = config.validate().unwrap_err();
        assert!(err
            .to_string()
            .contains("LEXCHAT_TEST_KEY_THAT_IS_NEVER_SET"));

        config.api_key = Some("explicit".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(config.resolve_api_key("gemini"), Some("explicit".to_string()));
    }

    fn write_config(temp: &TempDir, yaml: &str) -> PathBuf {
        let path = temp.path().join("config.yaml");
        fs::write(&path, yaml).unwrap();
        path
    }

    #[test]
    fn test_gemini_entry_without_api_key_env() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            &temp,
            r#"
llm:
  activeProvider: gemini
  providers:
    gemini:
      model: gemini-1.5-pro
"#,
        );

        let config = AppConfig::default().merge_yaml(&path).unwrap();

        assert_eq!(config.provider, "gemini");
        assert_eq!(config.model, "gemini-1.5-pro");
        assert_eq!(config.gemini_key_env(), DEFAULT_GEMINI_KEY_ENV);
        assert_eq!(config.resolve_endpoint("gemini"), None);
    }

    #[test]
    fn test_gemini_entry_with_custom_endpoint_stays_gemini() {
        std::env::set_var("LEXCHAT_TEST_PROXY_GEMINI_KEY", "proxy-key");

        let temp = TempDir::new().unwrap();
        let path = write_config(
            &temp,
            r#"
llm:
  activeProvider: gemini
  providers:
    gemini:
      model: gemini-1.5-flash
      endpoint: https://proxy.example
      apiKeyEnv: LEXCHAT_TEST_PROXY_GEMINI_KEY
retrieval:
  embeddingProvider: mock
"#,
        );

        let config = AppConfig::default().merge_yaml(&path).unwrap();
        let providers = config.providers().unwrap();

        assert!(providers.gemini.is_some());
        assert!(providers.ollama.is_none());
        assert_eq!(
            config.resolve_endpoint("gemini"),
            Some("https://proxy.example".to_string())
        );
        assert_eq!(config.resolve_api_key("gemini"), Some("proxy-key".to_string()));
        assert_eq!(config.provider_timeout("gemini"), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ollama_entry_needs_no_endpoint() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            &temp,
            r#"
llm:
  activeProvider: ollama
  providers:
    ollama:
      model: llama3.2
      timeout: 90
"#,
        );

        let config = AppConfig::default().merge_yaml(&path).unwrap();

        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.resolve_endpoint("ollama"), None);
        assert_eq!(config.resolve_api_key("ollama"), None);
        assert_eq!(config.provider_timeout("ollama"), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_retrieval_section_wins_over_active_embedding_provider() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            &temp,
            r#"
llm:
  activeProvider: ollama
  activeEmbeddingProvider: ollama
  providers:
    ollama:
      model: llama3.2
      embeddingModel: nomic-embed-text
retrieval:
  embeddingProvider: gemini
  embeddingModel: models/text-embedding-004
"#,
        );

        let config = AppConfig::default().merge_yaml(&path).unwrap();

        assert_eq!(config.retrieval.embedding_provider, "gemini");
        assert_eq!(config.retrieval.embedding_model, "models/text-embedding-004");
        // Keys the section leaves out keep their defaults
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.retrieval.embedding_dimensions, 768);
    }
}
