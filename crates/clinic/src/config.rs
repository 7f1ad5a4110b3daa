use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

pub const ENV_API_URL: &str = "CLINIC_API_URL";
pub const ENV_SESSION_COOKIE: &str = "CLINIC_SESSION_COOKIE";
pub const ENV_ROLE: &str = "CLINIC_ROLE";

pub const KEYS: [&str; 4] = ["api_url", "session_cookie", "timeout_secs", "role"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub user: UserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_cookie: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            session_cookie: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Doctor,
    #[default]
    Secretary,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Secretary => "secretary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "doctor" => Some(Role::Doctor),
            "secretary" => Some(Role::Secretary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub role: Role,
}

fn mask(secret: Option<&str>) -> &'static str {
    secret.map(|_| "****").unwrap_or_default()
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "clinic", "clinic")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    /// Directory for the TUI log file
    pub fn cache_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "clinic", "clinic")
            .ok_or_else(|| anyhow::anyhow!("Could not determine cache directory"))?;

        let cache_dir = proj_dirs.cache_dir();
        std::fs::create_dir_all(cache_dir)?;

        Ok(cache_dir.to_path_buf())
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Overlay `CLINIC_*` environment variables (a `.env` file counts)
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = lookup(ENV_API_URL) {
            self.api.base_url = url;
        }
        if let Some(cookie) = lookup(ENV_SESSION_COOKIE) {
            self.api.session_cookie = Some(cookie);
        }
        if let Some(role) = lookup(ENV_ROLE).as_deref().and_then(Role::parse) {
            self.user.role = role;
        }
    }

    pub fn is_doctor(&self) -> bool {
        self.user.role == Role::Doctor
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs.max(1))
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<()> {
        match key {
            "api_url" => {
                url::Url::parse(&value)?;
                self.api.base_url = value;
            }
            "session_cookie" => self.api.session_cookie = Some(value).filter(|v| !v.is_empty()),
            "timeout_secs" => self.api.timeout_secs = value.parse()?,
            "role" => {
                self.user.role = Role::parse(&value)
                    .ok_or_else(|| anyhow::anyhow!("Unknown role: {}. Valid roles: doctor, secretary", value))?
            }
            _ => anyhow::bail!("Unknown config key: {}. Valid keys: {}", key, KEYS.join(", ")),
        }
        Ok(())
    }

    /// Display value of a key; the cookie is masked
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "api_url" => self.api.base_url.clone(),
            "session_cookie" => mask(self.api.session_cookie.as_deref()).to_string(),
            "timeout_secs" => self.api.timeout_secs.to_string(),
            "role" => self.user.role.as_str().to_string(),
            _ => anyhow::bail!("Unknown config key: {}", key),
        };
        Ok(value)
    }
}
