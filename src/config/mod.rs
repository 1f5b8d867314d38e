use anyhow::{Context, Result};
use aws_types::region::Region;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ExtractorError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Object storage settings
    pub storage: StorageConfig,

    /// yt-dlp invocation settings
    pub extractor: ExtractorConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub bind_address: String,

    /// Shared secret expected in the `X-API-Key` header
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// S3-compatible endpoint, e.g. `https://<account>.r2.cloudflarestorage.com`
    pub endpoint: String,

    /// Bucket receiving the audio files
    pub bucket: String,

    pub access_key_id: String,

    pub secret_access_key: String,

    /// Public base URL of the bucket, e.g. `https://pub-xxx.r2.dev`
    pub public_url: String,

    /// Signing region; R2 accepts `auto`
    pub region: String,

    /// First path segment of every object key
    pub key_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// yt-dlp executable name or path
    pub ytdlp_path: String,

    /// Netscape cookie file handed to yt-dlp when it exists
    pub cookie_path: PathBuf,

    /// Proxy URL passed through to yt-dlp
    pub proxy_url: Option<String>,

    /// Browser impersonation target (requires curl_cffi in the yt-dlp install)
    pub impersonate: Option<String>,

    /// Hard limit on a single yt-dlp run
    pub timeout_secs: u64,

    pub retries: u32,

    pub fragment_retries: u32,

    /// Additional flags appended verbatim before the URL
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Parent directory for per-request working directories
    pub temp_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            api_key: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            bucket: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            public_url: String::new(),
            region: "auto".to_string(),
            key_prefix: "fretwise".to_string(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
            cookie_path: PathBuf::from("/config/cookies.txt"),
            proxy_url: None,
            impersonate: None,
            timeout_secs: 600,
            retries: 10,
            fragment_retries: 10,
            extra_args: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from an optional YAML file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) => {
                tracing::debug!("Loading config file: {}", path.display());
                let content = fs_err::read_to_string(&path)
                    .context("Failed to read config file")?;
                serde_yaml::from_str(&content).context("Failed to parse config file")?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Locate the configuration file, if any
    fn config_path() -> Option<PathBuf> {
        if let Ok(explicit) = std::env::var("CONFIG_PATH") {
            return Some(PathBuf::from(explicit));
        }

        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir()
            .map(|dir| dir.join("audio-extractor").join("config.yaml"))
            .filter(|path| path.exists())
    }

    /// Override settings from environment-style lookups
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = get("API_KEY") {
            self.server.api_key = Some(value);
        }

        if let Some(value) = get("R2_ENDPOINT") {
            self.storage.endpoint = value;
        }
        if let Some(value) = get("R2_BUCKET_NAME") {
            self.storage.bucket = value;
        }
        if let Some(value) = get("R2_ACCESS_KEY_ID") {
            self.storage.access_key_id = value;
        }
        if let Some(value) = get("R2_SECRET_ACCESS_KEY") {
            self.storage.secret_access_key = value;
        }
        if let Some(value) = get("R2_PUBLIC_URL") {
            self.storage.public_url = value;
        }
        if let Some(value) = get("R2_REGION") {
            self.storage.region = value;
        }
        if let Some(value) = get("R2_KEY_PREFIX") {
            self.storage.key_prefix = value;
        }

        if let Some(value) = get("YTDLP_PATH") {
            self.extractor.ytdlp_path = value;
        }
        if let Some(value) = get("COOKIE_PATH") {
            self.extractor.cookie_path = PathBuf::from(value);
        }
        if let Some(value) = get("PROXY_URL") {
            self.extractor.proxy_url = Some(value);
        }
        if let Some(value) = get("YTDLP_IMPERSONATE") {
            self.extractor.impersonate = Some(value);
        }
        if let Some(value) = get("EXTRACT_TIMEOUT_SECS") {
            self.extractor.timeout_secs = value
                .trim()
                .parse()
                .with_context(|| format!("EXTRACT_TIMEOUT_SECS is not a number: {}", value))?;
        }

        if let Some(value) = get("TEMP_DIR") {
            self.app.temp_dir = Some(PathBuf::from(value));
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("R2_ENDPOINT", &self.storage.endpoint),
            ("R2_BUCKET_NAME", &self.storage.bucket),
            ("R2_ACCESS_KEY_ID", &self.storage.access_key_id),
            ("R2_SECRET_ACCESS_KEY", &self.storage.secret_access_key),
            ("R2_PUBLIC_URL", &self.storage.public_url),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(ExtractorError::Config(format!(
                "storage settings missing: {}",
                missing.join(", ")
            ))
            .into());
        }

        if self.extractor.timeout_secs == 0 {
            return Err(ExtractorError::Config(
                "extraction timeout must be greater than zero".to_string(),
            )
            .into());
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Bind Address: {}", self.server.bind_address);
        println!("  API Key: {}", mask(self.server.api_key.as_deref()));
        println!("  Storage Endpoint: {}", self.storage.endpoint);
        println!("  Bucket: {}", self.storage.bucket);
        println!("  Access Key ID: {}", mask(Some(self.storage.access_key_id.as_str())));
        println!("  Public URL: {}", self.storage.public_url);
        println!("  Key Prefix: {}", self.storage.key_prefix);
        println!("  yt-dlp: {}", self.extractor.ytdlp_path);
        println!("  Cookie File: {}", self.extractor.cookie_path.display());
        if let Some(proxy) = &self.extractor.proxy_url {
            println!("  Proxy: {}", proxy);
        }
        println!("  Timeout: {}s", self.extractor.timeout_secs);
    }

    /// Get storage region
    pub fn storage_region(&self) -> Region {
        Region::new(self.storage.region.clone())
    }
}

fn mask(secret: Option<&str>) -> String {
    match secret {
        Some(value) if !value.is_empty() => "********".to_string(),
        _ => "(not set)".to_string(),
    }
}
