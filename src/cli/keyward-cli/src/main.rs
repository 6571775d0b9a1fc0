//! Keyward CLI - Command line interface.

use std::io::{self, Read, Write};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use clap::{Parser, Subcommand};
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "keyward")]
#[command(about = "Keyward CLI - Manage data keys and envelope encryption")]
#[command(version)]
struct Cli {
    /// Keyward server address
    #[arg(long, default_value = "http://localhost:8443", env = "KEYWARD_ADDR")]
    addr: String,

    /// Bearer token (JWT or root token)
    #[arg(long, env = "KEYWARD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server status
    Status {
        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },
    /// Data key management
    DataKey {
        #[command(subcommand)]
        command: DataKeyCommands,
    },
    /// Master key management
    MasterKey {
        #[command(subcommand)]
        command: MasterKeyCommands,
    },
    /// Encrypt data under a stored data key; prints base64 ciphertext
    Encrypt {
        /// Data key record id
        dek_record_id: String,
        /// Plaintext (read from stdin if not provided)
        plaintext: Option<String>,
    },
    /// Decrypt base64 ciphertext under a stored data key; writes raw plaintext
    Decrypt {
        /// Data key record id
        dek_record_id: String,
        /// Base64 ciphertext (read from stdin if not provided)
        ciphertext: Option<String>,
    },
    /// Root token helpers (offline)
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

#[derive(Subcommand)]
enum DataKeyCommands {
    /// Generate and store a new data key
    Generate,
    /// Delete a stored data key
    Delete {
        /// Data key record id
        dek_record_id: String,
    },
}

#[derive(Subcommand)]
enum MasterKeyCommands {
    /// Rotate the active master key
    Rotate,
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Hash a root token for KEYWARD_ROOT_TOKEN_HASH
    Hash {
        /// Root token (read from stdin if not provided)
        token: Option<String>,
    },
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
    active_master_key_id: String,
    master_key_count: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Deserialize)]
struct GenerateDataKeyResponse {
    dek_record_id: String,
    master_key_id: String,
}

#[derive(Serialize)]
struct EncryptRequest<'a> {
    dek_record_id: &'a str,
    plaintext: String,
}

#[derive(Debug, Deserialize)]
struct EncryptResponse {
    ciphertext: String,
}

#[derive(Serialize)]
struct DecryptRequest<'a> {
    dek_record_id: &'a str,
    ciphertext: &'a str,
}

#[derive(Debug, Deserialize)]
struct DecryptResponse {
    plaintext: String,
}

#[derive(Debug, Deserialize)]
struct RotateMasterKeyResponse {
    new_master_key_id: String,
}

// ============================================================================
// HTTP Client
// ============================================================================

struct KeywardClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl KeywardClient {
    fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        let token = self
            .token
            .as_ref()
            .context("Authentication token required. Set KEYWARD_TOKEN or use --token")?;
        Ok(req.bearer_auth(token))
    }

    async fn parse<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
        if !resp.status().is_success() {
            let status = resp.status();
            let error: ErrorResponse = resp.json().await.unwrap_or(ErrorResponse {
                error: "Unknown error".into(),
            });
            bail!("{what} failed ({status}): {}", error.error);
        }

        resp.json().await.context("Failed to parse response")
    }

    async fn get_health(&self) -> Result<HealthResponse> {
        let resp = self
            .client
            .get(self.url("/v1/sys/health"))
            .send()
            .await
            .context("Failed to connect to server")?;

        Self::parse(resp, "Status").await
    }

    async fn generate_data_key(&self) -> Result<GenerateDataKeyResponse> {
        let resp = self
            .authorized(self.client.post(self.url("/v1/data-keys")))?
            .send()
            .await
            .context("Failed to connect to server")?;

        Self::parse(resp, "Generate data key").await
    }

    async fn delete_data_key(&self, dek_record_id: &str) -> Result<()> {
        let resp = self
            .authorized(
                self.client
                    .delete(self.url(&format!("/v1/data-keys/{dek_record_id}"))),
            )?
            .send()
            .await
            .context("Failed to connect to server")?;

        let _: serde_json::Value = Self::parse(resp, "Delete data key").await?;
        Ok(())
    }

    async fn encrypt(&self, dek_record_id: &str, plaintext: &[u8]) -> Result<EncryptResponse> {
        let req = EncryptRequest {
            dek_record_id,
            plaintext: BASE64.encode(plaintext),
        };

        let resp = self
            .authorized(self.client.post(self.url("/v1/encrypt")))?
            .json(&req)
            .send()
            .await
            .context("Failed to connect to server")?;

        Self::parse(resp, "Encrypt").await
    }

    async fn decrypt(&self, dek_record_id: &str, ciphertext: &str) -> Result<DecryptResponse> {
        let req = DecryptRequest {
            dek_record_id,
            ciphertext,
        };

        let resp = self
            .authorized(self.client.post(self.url("/v1/decrypt")))?
            .json(&req)
            .send()
            .await
            .context("Failed to connect to server")?;

        Self::parse(resp, "Decrypt").await
    }

    async fn rotate_master_key(&self) -> Result<RotateMasterKeyResponse> {
        let resp = self
            .authorized(self.client.post(self.url("/v1/master-keys/rotate")))?
            .send()
            .await
            .context("Failed to connect to server")?;

        Self::parse(resp, "Rotate master key").await
    }
}

// ============================================================================
// Command Handlers
// ============================================================================

fn read_stdin() -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    io::stdin()
        .lock()
        .read_to_end(&mut buf)
        .context("Failed to read stdin")?;
    Ok(buf)
}

fn arg_or_stdin(arg: Option<String>) -> Result<String> {
    match arg {
        Some(value) => Ok(value),
        None => {
            let bytes = read_stdin()?;
            let text = String::from_utf8(bytes).context("stdin is not valid UTF-8")?;
            Ok(text.trim().to_string())
        },
    }
}

async fn cmd_status(client: &KeywardClient, json: bool) -> Result<()> {
    let health = client.get_health().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&health)?);
        return Ok(());
    }

    println!("Keyward server status:");
    println!("  Status:            {}", health.status);
    println!("  Version:           {}", health.version);
    println!("  Active master key: {}", health.active_master_key_id);
    println!("  Master keys:       {}", health.master_key_count);

    Ok(())
}

async fn cmd_data_key_generate(client: &KeywardClient) -> Result<()> {
    let result = client.generate_data_key().await?;

    println!("Data key: {}", result.dek_record_id);
    println!("Wrapped under master key: {}", result.master_key_id);

    Ok(())
}

async fn cmd_data_key_delete(client: &KeywardClient, dek_record_id: &str) -> Result<()> {
    client.delete_data_key(dek_record_id).await?;
    println!("Data key '{}' deleted", dek_record_id);
    Ok(())
}

async fn cmd_encrypt(
    client: &KeywardClient,
    dek_record_id: &str,
    plaintext: Option<String>,
) -> Result<()> {
    let plaintext = match plaintext {
        Some(text) => text.into_bytes(),
        None => read_stdin()?,
    };

    let result = client.encrypt(dek_record_id, &plaintext).await?;
    println!("{}", result.ciphertext);

    Ok(())
}

async fn cmd_decrypt(
    client: &KeywardClient,
    dek_record_id: &str,
    ciphertext: Option<String>,
) -> Result<()> {
    let ciphertext = arg_or_stdin(ciphertext)?;

    let result = client.decrypt(dek_record_id, &ciphertext).await?;
    let plaintext = BASE64
        .decode(&result.plaintext)
        .context("Server returned invalid base64")?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&plaintext)?;
    stdout.flush()?;

    Ok(())
}

async fn cmd_master_key_rotate(client: &KeywardClient) -> Result<()> {
    let result = client.rotate_master_key().await?;
    println!("Active master key is now: {}", result.new_master_key_id);
    Ok(())
}

fn cmd_token_hash(token: Option<String>) -> Result<()> {
    let token = arg_or_stdin(token)?;
    if token.is_empty() {
        bail!("Root token cannot be empty");
    }

    let hash = keyward_auth::hash_root_token(&token)?;
    println!("{hash}");

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = KeywardClient::new(&cli.addr, cli.token)?;

    match cli.command {
        Commands::Status { json } => cmd_status(&client, json).await,
        Commands::DataKey { command } => match command {
            DataKeyCommands::Generate => cmd_data_key_generate(&client).await,
            DataKeyCommands::Delete { dek_record_id } => {
                cmd_data_key_delete(&client, &dek_record_id).await
            },
        },
        Commands::MasterKey { command } => match command {
            MasterKeyCommands::Rotate => cmd_master_key_rotate(&client).await,
        },
        Commands::Encrypt {
            dek_record_id,
            plaintext,
        } => cmd_encrypt(&client, &dek_record_id, plaintext).await,
        Commands::Decrypt {
            dek_record_id,
            ciphertext,
        } => cmd_decrypt(&client, &dek_record_id, ciphertext).await,
        Commands::Token { command } => match command {
            TokenCommands::Hash { token } => cmd_token_hash(token),
        },
    }
}
