/// Configuration resolution module
///
/// This module handles:
/// - Reading the optional TOML config file
/// - Applying environment and CLI overrides
/// - Validating layout, command words and sheet names
/// - Checking delivery credentials when the channel is used
use crate::cli::{self, CliArgs};
use crate::command::CommandWords;
use crate::layout::LayoutConfig;
use crate::store::{PROFILE_SHEET, TICKET_SHEET};
use log::{debug, warn};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_LINE_TOKEN: &str = "LINE_CHANNEL_ACCESS_TOKEN";
pub const ENV_LINE_SECRET: &str = "LINE_CHANNEL_SECRET";
pub const ENV_IMGBB_KEY: &str = "IMGBB_API_KEY";
pub const ENV_STORE: &str = "TICKET_BOARD_STORE";
pub const ENV_FONT: &str = "TICKET_BOARD_FONT";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    pub channel_access_token: Option<String>,
    pub channel_secret: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImgbbConfig {
    pub api_key: Option<String>,
    /// Upload URL override; `None` means the public imgbb API
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Workbook file; `None` means the platform data directory
    pub path: Option<PathBuf>,
    pub ticket_sheet: String,
    pub profile_sheet: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig { path: None, ticket_sheet: TICKET_SHEET.to_string(), profile_sheet: PROFILE_SHEET.to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig { timeout_secs: 30 }
    }
}

/// Everything the binary needs, resolved once at startup
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub line: LineConfig,
    pub imgbb: ImgbbConfig,
    pub store: StoreConfig,
    pub layout: LayoutConfig,
    pub commands: CommandWords,
    pub font: FontConfig,
    pub http: HttpConfig,
}

/// Credentials for uploading and replying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryCredentials<'a> {
    pub channel_access_token: &'a str,
    pub channel_secret: &'a str,
    pub imgbb_api_key: &'a str,
}

impl AppConfig {
    /// Parse a TOML document; missing sections keep their defaults
    pub fn from_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("Invalid config file: {}", e))
    }

    /// Apply overrides from an environment lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_LINE_TOKEN) {
            self.line.channel_access_token = Some(v);
        }
        if let Some(v) = get(ENV_LINE_SECRET) {
            self.line.channel_secret = Some(v);
        }
        if let Some(v) = get(ENV_IMGBB_KEY) {
            self.imgbb.api_key = Some(v);
        }
        if let Some(v) = get(ENV_STORE) {
            self.store.path = Some(PathBuf::from(v));
        }
        if let Some(v) = get(ENV_FONT) {
            self.font.path = Some(PathBuf::from(v));
        }
    }

    /// Apply `--store` and `--font`
    pub fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(ref store) = args.store {
            self.store.path = Some(store.clone());
        }
        if let Some(ref font) = args.font {
            self.font.path = Some(font.clone());
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.layout.validate()?;
        self.commands.validate()?;

        if self.store.ticket_sheet.trim().is_empty() || self.store.profile_sheet.trim().is_empty() {
            return Err("store.ticket_sheet and store.profile_sheet must not be empty".to_string());
        }
        if self.store.ticket_sheet == self.store.profile_sheet {
            return Err("store.ticket_sheet and store.profile_sheet must differ".to_string());
        }
        if let Some(ref endpoint) = self.imgbb.endpoint
            && !endpoint.starts_with("http://")
            && !endpoint.starts_with("https://")
        {
            return Err(format!("imgbb.endpoint must be an http(s) URL, got '{}'", endpoint));
        }
        if self.http.timeout_secs == 0 {
            return Err("http.timeout_secs must be positive".to_string());
        }

        Ok(())
    }

    /// Credentials for the channel and image host, or the list of what is missing
    pub fn require_delivery(&self) -> Result<DeliveryCredentials<'_>, String> {
        let token = self.line.channel_access_token.as_deref();
        let secret = self.line.channel_secret.as_deref();
        let key = self.imgbb.api_key.as_deref();

        match (token, secret, key) {
            (Some(channel_access_token), Some(channel_secret), Some(imgbb_api_key)) => {
                Ok(DeliveryCredentials { channel_access_token, channel_secret, imgbb_api_key })
            }
            _ => {
                let missing: Vec<&str> = [(token, ENV_LINE_TOKEN), (secret, ENV_LINE_SECRET), (key, ENV_IMGBB_KEY)]
                    .iter()
                    .filter(|(value, _)| value.is_none())
                    .map(|(_, name)| *name)
                    .collect();
                Err(format!("Missing delivery credentials: {} (or use --no-deliver)", missing.join(", ")))
            }
        }
    }

    /// API key for the image host alone (local commands that upload but never reply)
    pub fn require_image_host(&self) -> Result<&str, String> {
        self.imgbb
            .api_key
            .as_deref()
            .ok_or_else(|| format!("Missing image host key: {} (or use --no-deliver)", ENV_IMGBB_KEY))
    }

    /// Workbook path, falling back to the platform data directory
    pub fn store_path(&self) -> PathBuf {
        self.store.path.clone().unwrap_or_else(default_store_path)
    }

    /// True when no workbook was named in the file, the environment or on the command line
    pub fn uses_default_store(&self) -> bool {
        self.store.path.is_none()
    }

    pub fn font_path(&self) -> Option<&Path> {
        self.font.path.as_deref()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }
}

/// Default workbook location
pub fn default_store_path() -> PathBuf {
    cli::default_data_dir().join("workbook.json")
}

/// Resolve the configuration: defaults, then the config file, then the
/// environment, then CLI flags.
pub fn load_config(args: &CliArgs) -> Result<AppConfig, String> {
    let mut config = match args.config {
        Some(ref path) => {
            debug!("Reading config file {}", path.display());
            let text =
                fs::read_to_string(path).map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
            AppConfig::from_toml(&text)?
        }
        None => AppConfig::default(),
    };

    config.apply_env(|key| env::var(key).ok());
    config.apply_cli(args);
    config.validate()?;

    if config.uses_default_store() {
        warn!(
            "No workbook configured ([store] path, {} or --store); using default {}",
            ENV_STORE,
            config.store_path().display()
        );
    } else {
        debug!("Using workbook {}", config.store_path().display());
    }
    Ok(config)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
