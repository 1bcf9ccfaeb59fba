// src/config.rs

use std::{env, fmt, path::PathBuf};

use dotenvy::dotenv;

/// Signing secret and lifetime for one kind of token.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub expiry_seconds: u64,
}

/// Where uploaded media ends up.
#[derive(Debug, Clone)]
pub enum MediaConfig {
    Cloudinary {
        cloud_name: String,
        api_key: String,
        api_secret: String,
    },
    /// Files are copied into `dir` and served back under `public_url`.
    Local { dir: PathBuf, public_url: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Base URI of the database server; the database name is appended.
    pub database_uri: String,
    pub cors_origin: String,
    pub access_token: TokenSettings,
    pub refresh_token: TokenSettings,
    pub temp_dir: PathBuf,
    pub media: MediaConfig,
    pub rust_log: String,
    pub log_dir: String,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => write!(f, "{} has an invalid value: {:?}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Longest token lifetime accepted from the environment (100 years).
pub const MAX_EXPIRY_SECONDS: u64 = 100 * 366 * 24 * 60 * 60;

/// Parses a lifetime such as `3600`, `15m`, `12h` or `10d` into seconds.
pub fn parse_expiry(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let (digits, multiplier) = match raw.chars().last()? {
        's' => (&raw[..raw.len() - 1], 1),
        'm' => (&raw[..raw.len() - 1], 60),
        'h' => (&raw[..raw.len() - 1], 60 * 60),
        'd' => (&raw[..raw.len() - 1], 24 * 60 * 60),
        c if c.is_ascii_digit() => (raw, 1),
        _ => return None,
    };
    digits
        .parse::<u64>()
        .ok()?
        .checked_mul(multiplier)
        .filter(|seconds| *seconds <= MAX_EXPIRY_SECONDS)
}

fn expiry(key: &'static str, default: &str) -> Result<u64, ConfigError> {
    let value = optional(key).unwrap_or_else(|| default.to_string());
    parse_expiry(&value).ok_or(ConfigError::Invalid { key, value })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let port = match optional("PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value })?,
            None => 8000,
        };

        let media = match (
            optional("CLOUDINARY_CLOUD_NAME"),
            optional("CLOUDINARY_API_KEY"),
            optional("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => MediaConfig::Cloudinary {
                cloud_name,
                api_key,
                api_secret,
            },
            _ => MediaConfig::Local {
                dir: PathBuf::from(optional("MEDIA_DIR").unwrap_or_else(|| "./public/media".into())),
                public_url: optional("MEDIA_PUBLIC_URL")
                    .unwrap_or_else(|| format!("http://localhost:{}/media", port)),
            },
        };

        Ok(Self {
            port,
            database_uri: required("DATABASE_URI")?,
            cors_origin: optional("CORS_ORIGIN").unwrap_or_else(|| "*".to_string()),
            access_token: TokenSettings {
                secret: required("ACCESS_TOKEN_SECRET")?,
                expiry_seconds: expiry("ACCESS_TOKEN_EXPIRY", "1d")?,
            },
            refresh_token: TokenSettings {
                secret: required("REFRESH_TOKEN_SECRET")?,
                expiry_seconds: expiry("REFRESH_TOKEN_EXPIRY", "10d")?,
            },
            temp_dir: PathBuf::from(
                optional("TEMP_UPLOAD_DIR").unwrap_or_else(|| "./public/temp".to_string()),
            ),
            media,
            rust_log: optional("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            log_dir: optional("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
        })
    }
}
