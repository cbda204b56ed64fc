use crate::error::{CerebroError, Result};
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CerebroConfig {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_web_port")]
    pub port: u16,
    #[serde(default = "default_web_host")]
    pub host: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: default_web_port(),
            host: default_web_host(),
        }
    }
}

/// Hosted identity service that issues and verifies bearer tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub url: Option<String>,
    /// Service-role key the server presents when verifying tokens.
    #[serde(default)]
    pub service_key: Option<String>,
    /// Public key used by clients when signing in.
    #[serde(default)]
    pub anon_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Custom path for the SQLite database. Defaults to `~/.config/cerebro/cerebro.db`.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub env_var: Option<String>,
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: usize,
    /// Request timeout. `None` leaves the HTTP client's default in place.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            api_key: None,
            base_url: None,
            env_var: None,
            temperature: default_llm_temperature(),
            max_tokens: default_llm_max_tokens(),
            timeout_secs: None,
        }
    }
}

/// Settings for the terminal client talking to a running server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
        }
    }
}

/// Valid LLM provider names.
pub const VALID_LLM_PROVIDERS: &[&str] = &["github", "openai"];

// -- Defaults --

fn default_web_port() -> u16 {
    5000
}
fn default_web_host() -> String {
    "0.0.0.0".to_string()
}
fn default_llm_provider() -> String {
    "github".to_string()
}
fn default_llm_model() -> String {
    "openai/gpt-4o".to_string()
}
fn default_llm_temperature() -> f32 {
    0.6
}
fn default_llm_max_tokens() -> usize {
    1500
}
fn default_server_url() -> String {
    "http://localhost:5000/api".to_string()
}

impl CerebroConfig {
    /// Load configuration with three-layer TOML merge, then environment:
    /// 1. ~/.config/cerebro/config.toml (global)
    /// 2. .cerebro/config.toml (project)
    /// 3. .cerebro/config.local.toml (local, gitignored)
    /// 4. process environment (`PORT`, `SUPABASE_URL`, ...)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        // Layer 1: Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        // Layer 2: Project config
        if let Some(dir) = project_dir {
            let project_config = dir.join(".cerebro").join("config.toml");
            if project_config.exists() {
                builder = builder.add_source(File::from(project_config).required(false));
            }

            // Layer 3: Local config (gitignored)
            let local_config = dir.join(".cerebro").join("config.local.toml");
            if local_config.exists() {
                builder = builder.add_source(File::from(local_config).required(false));
            }
        }

        let config = builder
            .build()
            .map_err(|e| CerebroError::Config(e.to_string()))?;

        let mut cfg: Self = config
            .try_deserialize()
            .map_err(|e| CerebroError::Config(e.to_string()))?;

        Ok(cfg.finalize())
    }

    /// Like [`CerebroConfig::load`], but unreadable config files fall back
    /// to the defaults. The environment and validation still apply.
    pub fn load_or_default(project_dir: Option<&Path>) -> Self {
        Self::load(project_dir).unwrap_or_else(|e| {
            tracing::warn!("failed to load config files, using defaults: {e}");
            Self::default_config().finalize()
        })
    }

    /// Overlay the process environment, then validate.
    pub fn finalize(self) -> Self {
        self.finalize_with(|name| std::env::var(name).ok())
    }

    pub fn finalize_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        self.apply_env_with(lookup);
        self.validate();
        self
    }

    /// Parse a single TOML document on top of the defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Config::builder()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| CerebroError::Config(e.to_string()))
    }

    /// Load with defaults only (no files).
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Overlay environment values read through `lookup`. Empty values are ignored.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT") {
            match port.parse() {
                Ok(p) => self.web.port = p,
                Err(_) => tracing::warn!("config: ignoring non-numeric PORT '{port}'"),
            }
        }
        if let Some(url) = get("SUPABASE_URL") {
            self.identity.url = Some(url);
        }
        if let Some(key) = get("SUPABASE_SERVICE_ROLE_KEY") {
            self.identity.service_key = Some(key);
        }
        if let Some(key) = get("SUPABASE_ANON_KEY") {
            self.identity.anon_key = Some(key);
        }
        if let Some(path) = get("DATABASE_URL") {
            self.storage.path = Some(path.trim_start_matches("sqlite://").to_string());
        }
        if let Some(url) = get("MODEL_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Some(model) = get("MODEL_NAME") {
            self.llm.model = model;
        }
        if let Some(url) = get("CEREBRO_SERVER_URL") {
            self.client.server_url = url;
        }
    }

    /// Validate config values, clamping out-of-range values and logging warnings.
    /// Lenient: bad values are fixed rather than rejected.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !VALID_LLM_PROVIDERS.contains(&self.llm.provider.as_str()) {
            warnings.push(format!(
                "unknown LLM provider '{}', valid: {}",
                self.llm.provider,
                VALID_LLM_PROVIDERS.join(", ")
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            warnings.push(format!(
                "llm.temperature = {} out of range [0.0, 2.0], clamping",
                self.llm.temperature
            ));
            self.llm.temperature = self.llm.temperature.clamp(0.0, 2.0);
        }

        if self.llm.max_tokens == 0 {
            warnings.push("llm.max_tokens = 0, setting to 256".to_string());
            self.llm.max_tokens = 256;
        }

        if self.llm.timeout_secs == Some(0) {
            warnings.push("llm.timeout_secs = 0, using client default".to_string());
            self.llm.timeout_secs = None;
        }

        for w in &warnings {
            tracing::warn!("config: {}", w);
        }

        warnings
    }

    /// Settings the server cannot start without. A missing identity URL is fatal.
    pub fn require_server_settings(&self) -> Result<()> {
        match self.identity.url.as_deref() {
            Some(url) if !url.trim().is_empty() => Ok(()),
            _ => Err(CerebroError::Config(
                "SUPABASE_URL missing (set identity.url or SUPABASE_URL)".to_string(),
            )),
        }
    }

    /// Resolved SQLite path: configured path, else `~/.config/cerebro/cerebro.db`.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.storage.path {
            Some(p) => Ok(PathBuf::from(p)),
            None => dirs::config_dir()
                .map(|p| p.join("cerebro").join("cerebro.db"))
                .ok_or_else(|| {
                    CerebroError::Config("cannot determine config directory".to_string())
                }),
        }
    }
}

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("cerebro").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = CerebroConfig::default_config();
        assert_eq!(config.web.port, 5000);
        assert_eq!(config.llm.provider, "github");
        assert_eq!(config.llm.model, "openai/gpt-4o");
        assert!((config.llm.temperature - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.llm.max_tokens, 1500);
        assert!(config.llm.timeout_secs.is_none());
        assert!(config.identity.url.is_none());
    }

    #[test]
    fn test_load_config_no_files() {
        let config = CerebroConfig::load(Some(Path::new("/nonexistent/path"))).unwrap();
        assert_eq!(config.llm.max_tokens, 1500);
    }

    #[test]
    fn test_toml_parsing() {
        let config = CerebroConfig::from_toml_str(
            r#"
[web]
port = 8080

[identity]
url = "https://project.supabase.co"

[llm]
provider = "openai"
model = "gpt-4o-mini"
temperature = 0.3
"#,
        )
        .unwrap();
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(
            config.identity.url.as_deref(),
            Some("https://project.supabase.co")
        );
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.max_tokens, 1500);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = CerebroConfig::default_config();
        config.apply_env_with(env(&[
            ("PORT", "7000"),
            ("SUPABASE_URL", "https://id.example.com"),
            ("SUPABASE_SERVICE_ROLE_KEY", "service"),
            ("DATABASE_URL", "sqlite:///tmp/cerebro.db"),
            ("MODEL_BASE_URL", "http://localhost:9999"),
        ]));
        assert_eq!(config.web.port, 7000);
        assert_eq!(config.identity.url.as_deref(), Some("https://id.example.com"));
        assert_eq!(config.identity.service_key.as_deref(), Some("service"));
        assert_eq!(config.storage.path.as_deref(), Some("/tmp/cerebro.db"));
        assert_eq!(config.llm.base_url.as_deref(), Some("http://localhost:9999"));
    }

    #[test]
    fn test_env_ignores_bad_port_and_blank_values() {
        let mut config = CerebroConfig::default_config();
        config.apply_env_with(env(&[("PORT", "eighty"), ("SUPABASE_URL", "  ")]));
        assert_eq!(config.web.port, 5000);
        assert!(config.identity.url.is_none());
    }

    #[test]
    fn test_missing_identity_url_is_fatal() {
        let config = CerebroConfig::default_config();
        let err = config.require_server_settings().unwrap_err();
        assert!(err.to_string().contains("SUPABASE_URL missing"));

        let mut config = CerebroConfig::default_config();
        config.identity.url = Some("https://id.example.com".into());
        assert!(config.require_server_settings().is_ok());
    }

    #[test]
    fn test_validate_clamps() {
        let mut config = CerebroConfig::default_config();
        config.llm.temperature = 5.0;
        config.llm.max_tokens = 0;
        config.llm.timeout_secs = Some(0);
        config.llm.provider = "banana".into();
        let warnings = config.validate();
        assert_eq!(warnings.len(), 4);
        assert!((config.llm.temperature - 2.0).abs() < f32::EPSILON);
        assert_eq!(config.llm.max_tokens, 256);
        assert!(config.llm.timeout_secs.is_none());
    }

    #[test]
    fn test_finalize_applies_env_and_clamps() {
        let mut config = CerebroConfig::default_config();
        config.llm.temperature = 5.0;
        config.llm.max_tokens = 0;
        let config = config.finalize_with(env(&[("PORT", "7001")]));
        assert_eq!(config.web.port, 7001);
        assert!((config.llm.temperature - 2.0).abs() < f32::EPSILON);
        assert_eq!(config.llm.max_tokens, 256);
    }

    #[test]
    fn test_validate_clean_config_has_no_warnings() {
        let mut config = CerebroConfig::default_config();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_database_path_prefers_config() {
        let mut config = CerebroConfig::default_config();
        config.storage.path = Some("/var/lib/cerebro.db".into());
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/var/lib/cerebro.db")
        );
    }
}
