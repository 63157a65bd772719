//! Configuration types and loading.
//!
//! Config is loaded from an optional JSON file (e.g. `~/.linebridge/config.json`) and environment.
//! The three secrets normally come from the environment; the file only carries bind settings and
//! upstream base URLs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const LINE_ACCESS_TOKEN_ENV: &str = "LINE_ACCESS_TOKEN";
pub const LINE_SECRET_ENV: &str = "LINE_SECRET";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Webhook server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Messaging platform settings.
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Completion backend settings.
    #[serde(default)]
    pub agents: AgentsConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for the webhook endpoint (default 3000).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub line: LineChannelConfig,
}

/// LINE Messaging API config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineChannelConfig {
    /// Channel access token. Overridden by LINE_ACCESS_TOKEN env when set.
    pub channel_access_token: Option<String>,
    /// Channel secret used to verify x-line-signature. Overridden by LINE_SECRET env when set.
    pub channel_secret: Option<String>,
    /// Messaging API base (default https://api.line.me). Reply calls go here.
    pub api_base: Option<String>,
    /// Content API base (default https://api-data.line.me). Image downloads go here.
    pub data_api_base: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentsConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// Gemini generateContent config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiConfig {
    /// API key. Overridden by GEMINI_API_KEY env when set.
    pub api_key: Option<String>,
    /// Model id (default "gemini-1.5-flash").
    pub model: Option<String>,
    /// API base including version (default https://generativelanguage.googleapis.com/v1beta).
    pub api_base: Option<String>,
}

/// Secrets resolved once at startup and shared read-only by every request.
#[derive(Clone)]
pub struct Credentials {
    pub channel_access_token: String,
    pub channel_secret: String,
    pub gemini_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

/// Env value wins over the configured value; blank values count as unset.
fn pick_secret(env_value: Option<String>, configured: Option<&String>) -> Option<String> {
    env_value
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            configured
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the LINE channel access token: env LINE_ACCESS_TOKEN overrides config.
pub fn resolve_line_access_token(config: &Config) -> Option<String> {
    pick_secret(
        std::env::var(LINE_ACCESS_TOKEN_ENV).ok(),
        config.channels.line.channel_access_token.as_ref(),
    )
}

/// Resolve the LINE channel secret: env LINE_SECRET overrides config.
pub fn resolve_line_secret(config: &Config) -> Option<String> {
    pick_secret(
        std::env::var(LINE_SECRET_ENV).ok(),
        config.channels.line.channel_secret.as_ref(),
    )
}

/// Resolve the Gemini API key: env GEMINI_API_KEY overrides config.
pub fn resolve_gemini_api_key(config: &Config) -> Option<String> {
    pick_secret(
        std::env::var(GEMINI_API_KEY_ENV).ok(),
        config.agents.gemini.api_key.as_ref(),
    )
}

/// Resolve all three secrets. Fails naming the first one that is missing.
pub fn resolve_credentials(config: &Config) -> Result<Credentials> {
    let channel_access_token = resolve_line_access_token(config)
        .with_context(|| format!("{} is not set", LINE_ACCESS_TOKEN_ENV))?;
    let channel_secret =
        resolve_line_secret(config).with_context(|| format!("{} is not set", LINE_SECRET_ENV))?;
    let gemini_api_key = resolve_gemini_api_key(config)
        .with_context(|| format!("{} is not set", GEMINI_API_KEY_ENV))?;
    Ok(Credentials {
        channel_access_token,
        channel_secret,
        gemini_api_key,
    })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("LINEBRIDGE_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".linebridge").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, or the default path (or LINEBRIDGE_CONFIG_PATH). Missing file => default config.
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(default_config_path);
    if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        return Ok(Config::default());
    }
    let s = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let config = serde_json::from_str(&s)
        .with_context(|| format!("parsing config from {}", path.display()))?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gateway_port_and_bind() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 3000);
        assert_eq!(g.bind, "127.0.0.1");
    }

    #[test]
    fn parses_camel_case_file() {
        let config: Config = serde_json::from_str(
            r#"{
                "gateway": { "port": 8080 },
                "channels": { "line": { "apiBase": "http://localhost:1", "channelSecret": "s" } },
                "agents": { "gemini": { "model": "gemini-2.0-flash" } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.bind, "127.0.0.1");
        assert_eq!(config.channels.line.api_base.as_deref(), Some("http://localhost:1"));
        assert_eq!(config.channels.line.channel_secret.as_deref(), Some("s"));
        assert_eq!(config.agents.gemini.model.as_deref(), Some("gemini-2.0-flash"));
    }

    #[test]
    fn env_secret_overrides_config() {
        let configured = "from-file".to_string();
        assert_eq!(
            pick_secret(Some(" from-env ".to_string()), Some(&configured)).as_deref(),
            Some("from-env")
        );
    }

    #[test]
    fn blank_env_secret_falls_back_to_config() {
        let configured = "from-file".to_string();
        assert_eq!(
            pick_secret(Some("   ".to_string()), Some(&configured)).as_deref(),
            Some("from-file")
        );
        assert_eq!(pick_secret(None, Some(&"  ".to_string())), None);
        assert_eq!(pick_secret(None, None), None);
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let path = std::env::temp_dir().join("linebridge-config-test-does-not-exist.json");
        let config = load_config(Some(path)).unwrap();
        assert_eq!(config.gateway.port, 3000);
        assert!(config.channels.line.api_base.is_none());
    }

    #[test]
    fn credentials_debug_hides_secrets() {
        let creds = Credentials {
            channel_access_token: "token".to_string(),
            channel_secret: "secret".to_string(),
            gemini_api_key: "key".to_string(),
        };
        assert_eq!(format!("{:?}", creds), "Credentials { .. }");
    }
}
