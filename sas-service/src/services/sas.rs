use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;

use crate::config::StorageAccount;
use crate::error::AppError;
use crate::services::resolver::{DispositionMode, ResourceLocator};

type HmacSha256 = Hmac<Sha256>;

/// Service version the signature is computed against. The string-to-sign
/// layout below is only valid for this version.
const SIGNED_VERSION: &str = "2021-08-06";

/// Read-only, single blob.
const SIGNED_PERMISSIONS: &str = "r";
const SIGNED_RESOURCE: &str = "b";
const SIGNED_PROTOCOL: &str = "https";

/// Links become valid slightly in the past so clients with lagging clocks
/// are not rejected by the storage endpoint.
const START_SKEW_MINUTES: i64 = 5;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Mints service SAS URLs for single blobs, signed locally with the
/// storage account key. Signing never talks to the network.
#[derive(Clone)]
pub struct SasSigner {
    account_name: String,
    account_key: Secret<String>,
    blob_endpoint: String,
    ttl_minutes: i64,
}

impl SasSigner {
    pub fn new(storage: &StorageAccount, ttl_minutes: i64) -> Self {
        Self {
            account_name: storage.account_name.clone(),
            account_key: storage.account_key.clone(),
            blob_endpoint: storage.blob_endpoint.clone(),
            ttl_minutes,
        }
    }

    /// Produce a signed download URL for the located object, valid from
    /// a few minutes ago until the configured TTL from now.
    pub fn sign(&self, locator: &ResourceLocator) -> Result<String, AppError> {
        self.sign_at(locator, Utc::now())
    }

    fn sign_at(&self, locator: &ResourceLocator, now: DateTime<Utc>) -> Result<String, AppError> {
        let start = (now - Duration::minutes(START_SKEW_MINUTES))
            .format(TIME_FORMAT)
            .to_string();
        let expiry = (now + Duration::minutes(self.ttl_minutes))
            .format(TIME_FORMAT)
            .to_string();

        let canonicalized_resource = format!(
            "/blob/{}/{}/{}",
            self.account_name, locator.container, locator.object_name
        );
        let disposition = content_disposition(locator.disposition, &locator.display_filename);

        // Field order is fixed by the signed version; empty slots are the
        // identifier, IP range, snapshot, encryption scope, cache control,
        // content encoding, and content language.
        let string_to_sign = [
            SIGNED_PERMISSIONS,
            start.as_str(),
            expiry.as_str(),
            canonicalized_resource.as_str(),
            "",
            "",
            SIGNED_PROTOCOL,
            SIGNED_VERSION,
            SIGNED_RESOURCE,
            "",
            "",
            "",
            disposition.as_str(),
            "",
            "",
            locator.content_type.as_str(),
        ]
        .join("\n");

        let key = BASE64
            .decode(self.account_key.expose_secret())
            .map_err(|e| anyhow::anyhow!("Account key is not valid base64: {}", e))?;
        let mut mac = HmacSha256::new_from_slice(&key)
            .map_err(|e| anyhow::anyhow!("Account key rejected by HMAC: {}", e))?;
        mac.update(string_to_sign.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        let query = [
            ("sp", SIGNED_PERMISSIONS),
            ("st", start.as_str()),
            ("se", expiry.as_str()),
            ("spr", SIGNED_PROTOCOL),
            ("sv", SIGNED_VERSION),
            ("sr", SIGNED_RESOURCE),
            ("rscd", disposition.as_str()),
            ("rsct", locator.content_type.as_str()),
            ("sig", signature.as_str()),
        ]
        .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
        .join("&");

        Ok(format!(
            "{}/{}/{}?{}",
            self.blob_endpoint, locator.container, locator.object_name, query
        ))
    }
}

/// Builds the `Content-Disposition` override in dual form so both plain
/// and extended-filename clients pick a sensible name.
fn content_disposition(mode: DispositionMode, filename: &str) -> String {
    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        mode.as_str(),
        ascii_fallback(filename),
        urlencoding::encode(filename),
    )
}

/// Strips the filename down to ASCII for the plain `filename=` parameter.
/// When nothing usable survives, falls back to `download` with the
/// original extension.
fn ascii_fallback(filename: &str) -> String {
    let stripped: String = filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control() && *c != '"' && *c != '\\')
        .collect();

    let (stem, extension) = match stripped.rsplit_once('.') {
        Some((stem, extension)) => (stem, Some(extension.to_string())),
        None => (stripped.as_str(), None),
    };
    if !stem.is_empty() {
        return stripped;
    }
    match extension {
        Some(extension) if !extension.is_empty() => format!("download.{}", extension),
        _ => "download".to_string(),
    }
}
