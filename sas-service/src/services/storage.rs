use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppError;
use crate::services::resolver::{DispositionMode, ResourceLocator};
use crate::services::sas::SasSigner;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Existence checks against the backing object store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// True when the object is present and readable. Transport errors,
    /// timeouts, and non-success statuses all read as absent.
    async fn exists(&self, container: &str, object_name: &str) -> bool;
}

/// Probes Azure Blob Storage over plain HTTP: mints a short-lived read
/// link with the account key and issues a HEAD against it. Works against
/// the emulator as well since the endpoint comes from configuration.
pub struct AzureBlobStore {
    client: reqwest::Client,
    signer: SasSigner,
}

impl AzureBlobStore {
    pub fn new(signer: SasSigner) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build storage HTTP client: {}", e))?;
        Ok(Self { client, signer })
    }

    fn probe_locator(container: &str, object_name: &str) -> ResourceLocator {
        ResourceLocator {
            container: container.to_string(),
            object_name: object_name.to_string(),
            content_type: "application/octet-stream".to_string(),
            disposition: DispositionMode::Attachment,
            display_filename: "probe".to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn exists(&self, container: &str, object_name: &str) -> bool {
        let locator = Self::probe_locator(container, object_name);
        let url = match self.signer.sign(&locator) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Failed to sign existence probe: {}", e);
                return false;
            }
        };

        match self.client.head(&url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::info!(
                    "Blob {}/{} not readable: {}",
                    container,
                    object_name,
                    response.status()
                );
                false
            }
            Err(e) => {
                tracing::error!(
                    "Existence probe for {}/{} failed: {}",
                    container,
                    object_name,
                    e
                );
                false
            }
        }
    }
}
