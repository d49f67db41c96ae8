//! Runtime configuration loaded from the environment (and `.env`).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Which artifacts are emailed once the contract is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Filled `.docx` plus the raw uploads as separate attachments.
    Docx,
    /// Everything converted and merged into one PDF.
    Pdf,
}

impl FromStr for DeliveryMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "docx" => Ok(Self::Docx),
            "pdf" => Ok(Self::Pdf),
            other => Err(ConfigError::InvalidValue {
                key: "DELIVERY_MODE",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Recipient of every generated contract. Falls back to `user`.
    pub recipient: Option<String>,
}

impl SmtpConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let user = non_empty_var("SMTP_USER");
        let recipient = non_empty_var("EMAIL_DESTINO").or_else(|| user.clone());

        Ok(Self {
            host: non_empty_var("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            port: parse_var("SMTP_PORT", DEFAULT_SMTP_PORT)?,
            user,
            password: non_empty_var("SMTP_PASSWORD"),
            recipient,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub template_path: PathBuf,
    pub template_strict: bool,
    pub delivery_mode: DeliveryMode,
    pub soffice_bin: String,
    pub vehicle_catalog_path: Option<PathBuf>,
    pub allowed_origins: Vec<String>,
    pub smtp: SmtpConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let allowed_origins = non_empty_var("ALLOWED_ORIGINS")
            .map(|value| {
                value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_addr: non_empty_var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var("PORT", 8080)?,
            upload_dir: path_var("UPLOAD_DIR", "./uploads"),
            output_dir: path_var("OUTPUT_DIR", "./outputs"),
            template_path: path_var("TEMPLATE_DOCX", "./contrato_template.docx"),
            template_strict: parse_bool("TEMPLATE_STRICT", false)?,
            delivery_mode: match non_empty_var("DELIVERY_MODE") {
                Some(value) => value.parse()?,
                None => DeliveryMode::Docx,
            },
            soffice_bin: non_empty_var("SOFFICE_BIN").unwrap_or_else(|| "soffice".to_string()),
            vehicle_catalog_path: non_empty_var("VEHICLE_CATALOG_PATH").map(PathBuf::from),
            allowed_origins,
            smtp: SmtpConfig::from_env()?,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn path_var(key: &str, default: &str) -> PathBuf {
    PathBuf::from(non_empty_var(key).unwrap_or_else(|| default.to_string()))
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

fn parse_bool(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match non_empty_var(key) {
        Some(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { key, value }),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_mode_parsing() {
        assert_eq!("docx".parse::<DeliveryMode>().unwrap(), DeliveryMode::Docx);
        assert_eq!(" PDF ".parse::<DeliveryMode>().unwrap(), DeliveryMode::Pdf);
        assert!("odt".parse::<DeliveryMode>().is_err());
    }

    #[test]
    fn test_invalid_value_message() {
        let err = ConfigError::InvalidValue {
            key: "SMTP_PORT",
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value for SMTP_PORT: abc");
    }
}
