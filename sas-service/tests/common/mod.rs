#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::head;
use axum::Router;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::EncodePublicKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use secrecy::Secret;
use serde_json::{json, Value};
use tempfile::NamedTempFile;

use sas_service::config::{LogConfig, SasConfig, ServerConfig, StorageAccount};
use sas_service::startup::Application;

/// Azurite's published development account key; any valid base64 works.
pub const TEST_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

pub struct TestKeys {
    pub encoding: EncodingKey,
    pub public_pem: String,
}

/// RSA keypair shared by every test in the binary. Generation is slow, so
/// it happens once.
pub fn test_keys() -> &'static TestKeys {
    static KEYS: OnceLock<TestKeys> = OnceLock::new();
    KEYS.get_or_init(|| {
        let private =
            RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("generate RSA key");
        let private_pem = private
            .to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
            .expect("encode private key");
        let public_pem = RsaPublicKey::from(&private)
            .to_public_key_pem(rsa::pkcs8::LineEnding::LF)
            .expect("encode public key");
        TestKeys {
            encoding: EncodingKey::from_rsa_pem(private_pem.as_bytes())
                .expect("load private key"),
            public_pem,
        }
    })
}

pub fn write_public_key_pem() -> NamedTempFile {
    let file = NamedTempFile::new().expect("create temp key file");
    std::fs::write(file.path(), test_keys().public_pem.as_bytes()).expect("write public key");
    file
}

pub fn mint_token(claims: &Value) -> String {
    encode(&Header::new(Algorithm::RS256), claims, &test_keys().encoding).expect("sign token")
}

pub fn valid_claims(entity_id: Value) -> Value {
    let now = chrono::Utc::now().timestamp();
    json!({
        "userId": "user_id_here",
        "characterId": entity_id,
        "exp": now + 3600,
        "iat": now,
        "iss": "Game Server",
        "aud": "game-clients",
    })
}

pub fn valid_token(entity_id: &str) -> String {
    mint_token(&valid_claims(json!(entity_id)))
}

async fn probe(
    State(objects): State<Arc<HashSet<(String, String)>>>,
    Path((container, object_name)): Path<(String, String)>,
) -> StatusCode {
    if objects.contains(&(container, object_name)) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Stand-in blob endpoint: answers HEAD per the seeded object list.
pub async fn spawn_blob_stub(existing: &[(&str, &str)]) -> String {
    let objects: Arc<HashSet<(String, String)>> = Arc::new(
        existing
            .iter()
            .map(|(container, object)| (container.to_string(), object.to_string()))
            .collect(),
    );
    let app = Router::new()
        .route("/:container/:object_name", head(probe))
        .with_state(objects);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind blob stub");
    let address = listener.local_addr().expect("blob stub address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve blob stub");
    });

    format!("http://{}", address)
}

pub fn region_map(prefix: &str) -> HashMap<String, String> {
    ["cn", "hk", "en"]
        .into_iter()
        .map(|region| (region.to_string(), format!("{}-{}", prefix, region)))
        .collect()
}

/// Configuration pointing at the stub endpoint. Built directly rather than
/// through environment variables so parallel tests cannot race.
pub fn test_config(blob_endpoint: &str, public_key_path: &std::path::Path) -> SasConfig {
    SasConfig {
        server: ServerConfig { port: 0 },
        storage: StorageAccount {
            account_name: "devstoreaccount1".to_string(),
            account_key: Secret::new(TEST_ACCOUNT_KEY.to_string()),
            blob_endpoint: blob_endpoint.trim_end_matches('/').to_string(),
        },
        sas_ttl_min: 5,
        jwt_public_key_path: public_key_path.display().to_string(),
        report_containers: region_map("reports"),
        certificate_containers: region_map("certificates"),
        default_region: "cn".to_string(),
        log: LogConfig {
            dir: "./logs".to_string(),
            level: "info".to_string(),
            retention_days: 14,
        },
    }
}

pub struct TestApp {
    pub address: String,
    pub blob_endpoint: String,
    pub client: reqwest::Client,
    _public_key: NamedTempFile,
}

impl TestApp {
    /// Boot the full service against a fresh blob stub seeded with
    /// `existing` (container, object) pairs.
    pub async fn spawn(existing: &[(&str, &str)]) -> Self {
        let blob_endpoint = spawn_blob_stub(existing).await;
        let public_key = write_public_key_pem();
        let config = test_config(&blob_endpoint, public_key.path());

        let application = Application::build(config)
            .await
            .expect("build test application");
        let port = application.port();
        tokio::spawn(async move {
            application.run_until_stopped().await.ok();
        });

        let address = format!("http://127.0.0.1:{}", port);
        let client = reqwest::Client::new();

        // Wait for the server to come up.
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            blob_endpoint,
            client,
            _public_key: public_key,
        }
    }

    pub async fn get(&self, path_and_query: &str) -> reqwest::Response {
        self.get_with_headers(path_and_query, &[]).await
    }

    pub async fn get_authed(&self, path_and_query: &str, token: &str) -> reqwest::Response {
        self.get_with_headers(path_and_query, &[("Authentication", token)])
            .await
    }

    pub async fn get_with_headers(
        &self,
        path_and_query: &str,
        headers: &[(&str, &str)],
    ) -> reqwest::Response {
        let mut builder = self
            .client
            .get(format!("{}{}", self.address, path_and_query));
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.send().await.expect("request failed")
    }
}

/// Splits a response into (status, parsed envelope).
pub async fn read_envelope(response: reqwest::Response) -> (u16, Value) {
    let status = response.status().as_u16();
    let body = response.json().await.expect("response body is JSON");
    (status, body)
}

/// Percent-decoded query parameters of a signed URL.
pub fn query_params(url: &str) -> HashMap<String, String> {
    let Some((_, query)) = url.split_once('?') else {
        return HashMap::new();
    };
    query
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let value = urlencoding::decode(value).ok()?;
            Some((key.to_string(), value.into_owned()))
        })
        .collect()
}
