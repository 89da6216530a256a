use std::collections::HashMap;
use std::env;

use config::{Config as Cfg, File};
use secrecy::Secret;
use serde::Deserialize;

use crate::error::AppError;

/// Canonical region codes; the container maps always carry all of them.
pub const REGIONS: [&str; 3] = ["cn", "hk", "en"];

/// Azurite development-storage account, used when no connection string is
/// configured outside production. The key is the public emulator default.
const DEV_CONNECTION_STRING: &str = "DefaultEndpointsProtocol=http;\
AccountName=devstoreaccount1;\
AccountKey=Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==;\
BlobEndpoint=http://127.0.0.1:10000/devstoreaccount1";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl ServerConfig {
    fn load() -> Result<Self, AppError> {
        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Storage account credential parsed from an Azure-style connection string.
#[derive(Debug, Clone)]
pub struct StorageAccount {
    pub account_name: String,
    pub account_key: Secret<String>,
    /// Base URL the container/object path is appended to. Derived from the
    /// account name and endpoint suffix unless `BlobEndpoint` overrides it.
    pub blob_endpoint: String,
}

impl StorageAccount {
    pub fn from_connection_string(conn_str: &str) -> Result<Self, AppError> {
        let mut parts: HashMap<&str, &str> = HashMap::new();
        for piece in conn_str.split(';') {
            if let Some((key, value)) = piece.split_once('=') {
                parts.insert(key.trim(), value);
            }
        }

        let account_name = parts
            .get("AccountName")
            .ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("connection string missing AccountName"))
            })?
            .to_string();
        let account_key = parts
            .get("AccountKey")
            .ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("connection string missing AccountKey"))
            })?
            .to_string();
        let endpoint_suffix = parts.get("EndpointSuffix").copied().unwrap_or("core.windows.net");

        let blob_endpoint = match parts.get("BlobEndpoint") {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.blob.{}", account_name, endpoint_suffix),
        };

        Ok(Self {
            account_name,
            account_key: Secret::new(account_key),
            blob_endpoint,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub dir: String,
    pub level: String,
    pub retention_days: usize,
}

#[derive(Debug, Clone)]
pub struct SasConfig {
    pub server: ServerConfig,
    pub storage: StorageAccount,
    /// Signed-URL lifetime in minutes.
    pub sas_ttl_min: i64,
    /// PEM public key for token verification. The file may be absent; the
    /// service still starts with verification disabled.
    pub jwt_public_key_path: String,
    pub report_containers: HashMap<String, String>,
    pub certificate_containers: HashMap<String, String>,
    pub default_region: String,
    pub log: LogConfig,
}

impl SasConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let server = ServerConfig::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let conn_str = get_env(
            "AZURE_BLOB_CONNECTION_STRING",
            Some(DEV_CONNECTION_STRING),
            is_prod,
        )?;
        let storage = StorageAccount::from_connection_string(&conn_str)?;

        let sas_ttl_min = get_env("SAS_TTL_MIN", Some("5"), is_prod)?
            .parse::<i64>()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("SAS_TTL_MIN must be an integer: {}", e))
            })?;

        let report_containers = HashMap::from([
            (
                "cn".to_string(),
                get_env("AZURE_BLOB_REPORT_CONTAINER_CN", Some("reports-cn"), is_prod)?,
            ),
            (
                "hk".to_string(),
                get_env("AZURE_BLOB_REPORT_CONTAINER_HK", Some("reports-hk"), is_prod)?,
            ),
            (
                "en".to_string(),
                get_env("AZURE_BLOB_REPORT_CONTAINER_EN", Some("reports-en"), is_prod)?,
            ),
        ]);

        let certificate_containers = HashMap::from([
            (
                "cn".to_string(),
                get_env("AZURE_BLOB_CERT_CONTAINER_CN", Some("certificates-cn"), is_prod)?,
            ),
            (
                "hk".to_string(),
                get_env("AZURE_BLOB_CERT_CONTAINER_HK", Some("certificates-hk"), is_prod)?,
            ),
            (
                "en".to_string(),
                get_env("AZURE_BLOB_CERT_CONTAINER_EN", Some("certificates-en"), is_prod)?,
            ),
        ]);

        let default_region =
            normalize_default_region(&get_env("DEFAULT_REGION", Some("cn"), is_prod)?);

        Ok(SasConfig {
            server,
            storage,
            sas_ttl_min,
            jwt_public_key_path: get_env("JWT_PUBLIC_KEY_PATH", Some("./public.pem"), is_prod)?,
            report_containers,
            certificate_containers,
            default_region,
            log: LogConfig {
                dir: get_env("LOG_DIR", Some("./logs"), is_prod)?,
                level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
                retention_days: get_env("LOG_RETENTION_DAYS", Some("14"), is_prod)?
                    .parse::<usize>()
                    .map_err(|e| {
                        AppError::ConfigError(anyhow::anyhow!(
                            "LOG_RETENTION_DAYS must be an integer: {}",
                            e
                        ))
                    })?,
            },
        })
    }
}

/// A misspelled default region must not propagate into container lookups;
/// coerce anything outside the canonical set back to `cn`.
fn normalize_default_region(region: &str) -> String {
    let region = region.to_lowercase();
    if REGIONS.contains(&region.as_str()) {
        region
    } else {
        tracing::warn!(
            "Unrecognized DEFAULT_REGION '{}'; falling back to 'cn'",
            region
        );
        "cn".to_string()
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}
