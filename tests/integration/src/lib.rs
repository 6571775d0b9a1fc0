//! Integration tests for the Keyward server.
//!
//! Each [`TestServer`] runs the real router, SQLite data key store and
//! authentication chain on an ephemeral local port and is driven over HTTP.

// Allow unwrap() in tests - panics are acceptable for test assertions
#![allow(clippy::disallowed_methods)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use keyward_api::AppState;
use keyward_auth::{hash_root_token, Authenticator, JwtBackend, JwtConfig, RootTokenBackend};
use keyward_crypto::random;
use keyward_envelope::EnvelopeService;
use keyward_kms::{parse_master_keys, MasterKeyStore};
use keyward_storage_sqlite::SqliteDataKeyStore;

/// Root token accepted by every test server.
pub const ROOT_TOKEN: &str = "integration-root-token";

const JWT_SECRET: &str = "integration-secret-at-least-32-bytes!";
const JWT_ISSUER: &str = "https://id.keyward.test";
const JWT_AUDIENCE: &str = "keyward";

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_master_key_id: String,
    pub master_key_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct GenerateDataKeyResponse {
    pub dek_record_id: String,
    pub master_key_id: String,
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    sub: &'a str,
    role: &'a str,
    iat: u64,
    exp: u64,
    iss: &'a str,
    aud: &'a str,
}

// ============================================================================
// Test Server
// ============================================================================

/// Builds a master key list of fresh random keys, e.g. `k0:...,k1:...`.
pub fn master_key_list(ids: &[&str]) -> String {
    ids.iter()
        .map(|id| {
            let key = random::generate_key().unwrap();
            format!("{id}:{}", BASE64.encode(key.as_slice()))
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// An in-process server listening on `127.0.0.1:<ephemeral>`.
pub struct TestServer {
    pub base_url: String,
    data_path: PathBuf,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    _data_dir: Option<TempDir>,
}

impl TestServer {
    /// Starts a server with a single master key `k0` and a fresh data directory.
    pub async fn start() -> Result<Self> {
        let data_dir = TempDir::new().context("Failed to create temp dir")?;
        let mut server = Self::start_in(data_dir.path(), &master_key_list(&["k0"])).await?;
        server._data_dir = Some(data_dir);
        Ok(server)
    }

    /// Starts a server over an existing data directory with the given master keys.
    pub async fn start_in(data_path: &Path, master_keys: &str) -> Result<Self> {
        let master_keys = Arc::new(MasterKeyStore::new(parse_master_keys(master_keys)?)?);
        let store = SqliteDataKeyStore::open(data_path, "keyward").await?;
        let service = EnvelopeService::new(master_keys, Arc::new(store));

        let authenticator = Authenticator::new()
            .with_backend(Arc::new(JwtBackend::new(JwtConfig {
                secret: JWT_SECRET.to_string(),
                issuer: JWT_ISSUER.to_string(),
                audience: JWT_AUDIENCE.to_string(),
            })?))
            .with_backend(Arc::new(RootTokenBackend::with_static_hash(
                hash_root_token(ROOT_TOKEN)?,
            )?));

        let app = keyward_api::router(AppState::new(Arc::new(service), authenticator));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind test listener")?;
        let base_url = format!("http://{}", listener.local_addr()?);

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await;
        });

        let server = Self {
            base_url,
            data_path: data_path.to_path_buf(),
            shutdown: Some(tx),
            handle: Some(handle),
            _data_dir: None,
        };

        server.wait_for_ready().await?;

        Ok(server)
    }

    /// Wait for the server to be ready to accept connections.
    async fn wait_for_ready(&self) -> Result<()> {
        let client = Client::new();
        let url = format!("{}/v1/sys/health", self.base_url);

        for _ in 0..50 {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                _ => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }

        bail!("Server failed to start within 5 seconds")
    }

    /// Stops the server and waits for it to finish, keeping the data directory.
    pub async fn stop(mut self) -> Option<TempDir> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        self._data_dir.take()
    }

    /// Path of the SQLite data directory.
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Client authenticated with the root token (ADMIN).
    pub fn root_client(&self) -> KeywardClient {
        KeywardClient::new(&self.base_url).with_token(ROOT_TOKEN)
    }

    /// Client authenticated with a JWT for `principal` holding `role`.
    pub fn client_as(&self, principal: &str, role: &str) -> KeywardClient {
        KeywardClient::new(&self.base_url).with_token(&mint_jwt(principal, role, 3600))
    }

    /// Client without credentials.
    pub fn anonymous_client(&self) -> KeywardClient {
        KeywardClient::new(&self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before epoch")
        .as_secs()
}

/// Mints an HS256 JWT accepted by test servers. Negative `ttl_secs` yields
/// an already expired token.
pub fn mint_jwt(principal: &str, role: &str, ttl_secs: i64) -> String {
    mint_jwt_with_issuer(principal, role, ttl_secs, JWT_ISSUER)
}

/// Like [`mint_jwt`] with an explicit issuer.
pub fn mint_jwt_with_issuer(principal: &str, role: &str, ttl_secs: i64, issuer: &str) -> String {
    let now = now();
    let exp = now.saturating_add_signed(ttl_secs);
    let claims = JwtClaims {
        sub: principal,
        role,
        iat: now,
        exp,
        iss: issuer,
        aud: JWT_AUDIENCE,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to encode JWT")
}

// ============================================================================
// Test Client
// ============================================================================

/// HTTP client for testing the Keyward API.
#[derive(Clone)]
pub struct KeywardClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl KeywardClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a request and returns the status and JSON body (`Null` if empty).
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut req = self.client.request(method, self.url(path));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }

    async fn expect_ok(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let (status, value) = self.send(method, path, body).await?;
        if !status.is_success() {
            bail!("{path} failed ({status}): {value}");
        }
        Ok(value)
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let value = self.expect_ok(Method::GET, "/v1/sys/health", None).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn generate_data_key(&self) -> Result<GenerateDataKeyResponse> {
        let value = self.expect_ok(Method::POST, "/v1/data-keys", None).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn encrypt(&self, dek_record_id: &str, plaintext: &[u8]) -> Result<String> {
        let value = self
            .expect_ok(
                Method::POST,
                "/v1/encrypt",
                Some(json!({
                    "dek_record_id": dek_record_id,
                    "plaintext": BASE64.encode(plaintext),
                })),
            )
            .await?;
        value["ciphertext"]
            .as_str()
            .map(str::to_string)
            .context("missing ciphertext")
    }

    pub async fn decrypt(&self, dek_record_id: &str, ciphertext: &str) -> Result<Vec<u8>> {
        let value = self
            .expect_ok(
                Method::POST,
                "/v1/decrypt",
                Some(json!({
                    "dek_record_id": dek_record_id,
                    "ciphertext": ciphertext,
                })),
            )
            .await?;
        let plaintext = value["plaintext"].as_str().context("missing plaintext")?;
        Ok(BASE64.decode(plaintext)?)
    }

    pub async fn rotate_master_key(&self) -> Result<String> {
        let value = self
            .expect_ok(Method::POST, "/v1/master-keys/rotate", None)
            .await?;
        value["new_master_key_id"]
            .as_str()
            .map(str::to_string)
            .context("missing new_master_key_id")
    }

    pub async fn delete_data_key(&self, dek_record_id: &str) -> Result<()> {
        self.expect_ok(
            Method::DELETE,
            &format!("/v1/data-keys/{dek_record_id}"),
            None,
        )
        .await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_health() {
        let server = TestServer::start().await.unwrap();

        let health = server.anonymous_client().health().await.unwrap();

        assert_eq!(health.status, "ok");
        assert!(!health.version.is_empty());
        assert_eq!(health.active_master_key_id, "k0");
        assert_eq!(health.master_key_count, 1);
    }

    #[tokio::test]
    async fn test_end_to_end_rotation() {
        let server = TestServer::start().await.unwrap();
        let service = server.client_as("svc-billing", "SERVICE");
        let admin = server.root_client();
        let payload = br#"{"x":1}"#;

        // 1. Generate a data key under k0
        let dek = service.generate_data_key().await.unwrap();
        assert_eq!(dek.master_key_id, "k0");

        // 2. Encrypt
        let ciphertext = service.encrypt(&dek.dek_record_id, payload).await.unwrap();

        // 3. Rotate
        let new_id = admin.rotate_master_key().await.unwrap();
        assert_ne!(new_id, "k0");

        let health = admin.health().await.unwrap();
        assert_eq!(health.active_master_key_id, new_id);
        assert_eq!(health.master_key_count, 2);

        // 4. Old data key still decrypts
        let plaintext = service.decrypt(&dek.dek_record_id, &ciphertext).await.unwrap();
        assert_eq!(plaintext, payload);

        // 5. New data keys use the new master key
        let dek2 = service.generate_data_key().await.unwrap();
        assert_eq!(dek2.master_key_id, new_id);
    }

    #[tokio::test]
    async fn test_role_matrix_over_http() {
        let server = TestServer::start().await.unwrap();
        let admin = server.root_client();
        let dek = admin.generate_data_key().await.unwrap();
        let id = dek.dek_record_id.as_str();
        let ciphertext = admin.encrypt(id, b"data").await.unwrap();

        let requests = |id: &str, ciphertext: &str| {
            vec![
                (Method::POST, "/v1/data-keys".to_string(), None),
                (
                    Method::POST,
                    "/v1/encrypt".to_string(),
                    Some(json!({"dek_record_id": id, "plaintext": "ZGF0YQ=="})),
                ),
                (
                    Method::POST,
                    "/v1/decrypt".to_string(),
                    Some(json!({"dek_record_id": id, "ciphertext": ciphertext})),
                ),
                (Method::POST, "/v1/master-keys/rotate".to_string(), None),
                (Method::DELETE, format!("/v1/data-keys/{id}"), None),
            ]
        };

        let expectations: &[(&str, [bool; 5])] = &[
            ("SERVICE", [true, true, true, false, false]),
            ("AUDITOR", [false, false, false, false, false]),
            ("SUPERUSER", [false, false, false, false, false]),
        ];

        for (role, allowed) in expectations {
            let client = server.client_as("tester", role);
            for ((method, path, body), allowed) in requests(id, &ciphertext).into_iter().zip(allowed) {
                let (status, _) = client.send(method.clone(), &path, body).await.unwrap();
                if *allowed {
                    assert!(status.is_success(), "{role} {method} {path}: {status}");
                } else {
                    assert_eq!(status, StatusCode::FORBIDDEN, "{role} {method} {path}");
                }
            }
        }

        // ADMIN may do everything, delete last.
        let admin_jwt = server.client_as("alice", "ADMIN");
        for (method, path, body) in requests(id, &ciphertext) {
            let (status, _) = admin_jwt.send(method.clone(), &path, body).await.unwrap();
            assert!(status.is_success(), "ADMIN {method} {path}: {status}");
        }
    }

    #[tokio::test]
    async fn test_authentication_required() {
        let server = TestServer::start().await.unwrap();

        let result = server.anonymous_client().generate_data_key().await;
        assert!(result.is_err());

        let (status, body) = server
            .anonymous_client()
            .send(Method::POST, "/v1/data-keys", None)
            .await
            .unwrap();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_invalid_tokens_rejected() {
        let server = TestServer::start().await.unwrap();

        let tokens = [
            "invalid-token".to_string(),
            mint_jwt("svc", "SERVICE", -3600),
            mint_jwt_with_issuer("svc", "SERVICE", 3600, "https://evil.example"),
        ];

        for token in tokens {
            let client = KeywardClient::new(&server.base_url).with_token(&token);
            let (status, _) = client
                .send(Method::POST, "/v1/data-keys", None)
                .await
                .unwrap();
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_delete_data_key_lifecycle() {
        let server = TestServer::start().await.unwrap();
        let admin = server.root_client();

        let dek = admin.generate_data_key().await.unwrap();
        let ciphertext = admin.encrypt(&dek.dek_record_id, b"secret").await.unwrap();

        admin.delete_data_key(&dek.dek_record_id).await.unwrap();

        let (status, _) = admin
            .send(
                Method::POST,
                "/v1/decrypt",
                Some(json!({"dek_record_id": dek.dek_record_id, "ciphertext": ciphertext})),
            )
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = admin
            .send(
                Method::DELETE,
                &format!("/v1/data-keys/{}", dek.dek_record_id),
                None,
            )
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tampered_ciphertext_rejected() {
        let server = TestServer::start().await.unwrap();
        let client = server.client_as("svc", "SERVICE");

        let dek = client.generate_data_key().await.unwrap();
        let ciphertext = client.encrypt(&dek.dek_record_id, b"payload").await.unwrap();

        let mut raw = BASE64.decode(&ciphertext).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x80;

        let (status, body) = client
            .send(
                Method::POST,
                "/v1/decrypt",
                Some(json!({"dek_record_id": dek.dek_record_id, "ciphertext": BASE64.encode(&raw)})),
            )
            .await
            .unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "cryptographic operation failed");
    }

    #[tokio::test]
    async fn test_data_keys_survive_restart() {
        let keys = master_key_list(&["k0"]);
        let data_dir = TempDir::new().unwrap();

        let server = TestServer::start_in(data_dir.path(), &keys).await.unwrap();
        let client = server.root_client();
        let dek = client.generate_data_key().await.unwrap();
        let ciphertext = client.encrypt(&dek.dek_record_id, b"durable").await.unwrap();
        server.stop().await;

        // Same master keys: the stored wrapped key unwraps again.
        let server = TestServer::start_in(data_dir.path(), &keys).await.unwrap();
        let plaintext = server
            .root_client()
            .decrypt(&dek.dek_record_id, &ciphertext)
            .await
            .unwrap();
        assert_eq!(plaintext, b"durable");
        server.stop().await;

        // Master keys are not persisted: without k0 the record is unusable.
        let server = TestServer::start_in(data_dir.path(), &master_key_list(&["k1"]))
            .await
            .unwrap();
        let (status, _) = server
            .root_client()
            .send(
                Method::POST,
                "/v1/decrypt",
                Some(json!({"dek_record_id": dek.dek_record_id, "ciphertext": ciphertext})),
            )
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_clients_during_rotation() {
        let server = TestServer::start().await.unwrap();
        let admin = server.root_client();

        let mut tasks = Vec::new();
        for i in 0..16 {
            let client = server.client_as(&format!("svc-{i}"), "SERVICE");
            tasks.push(tokio::spawn(async move {
                let dek = client.generate_data_key().await.unwrap();
                let payload = format!("message-{i}");
                let ct = client.encrypt(&dek.dek_record_id, payload.as_bytes()).await.unwrap();
                (client, dek, payload, ct)
            }));
        }

        for _ in 0..4 {
            admin.rotate_master_key().await.unwrap();
        }

        for task in tasks {
            let (client, dek, payload, ct) = task.await.unwrap();
            let pt = client.decrypt(&dek.dek_record_id, &ct).await.unwrap();
            assert_eq!(pt, payload.as_bytes());
        }

        assert_eq!(admin.health().await.unwrap().master_key_count, 5);
    }
}
