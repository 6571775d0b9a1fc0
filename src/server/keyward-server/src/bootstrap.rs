//! Builds the running service from configuration.

use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{info, warn};

use keyward_api::AppState;
use keyward_auth::{hash_root_token, Authenticator, JwtBackend, JwtConfig, RootTokenBackend};
use keyward_crypto::{random, MasterKey};
use keyward_envelope::EnvelopeService;
use keyward_kms::{parse_master_keys, MasterKeyStore};
use keyward_storage::{DataKeyStore, MemoryDataKeyStore};
use keyward_storage_sqlite::SqliteDataKeyStore;

use crate::config::Cli;

/// Name of the SQLite store under the data directory.
const STORE_NAME: &str = "keyward";

/// Id of the master key generated in dev mode.
const DEV_MASTER_KEY_ID: &str = "dev-0";

/// Assembles handler state: master keys, data key store, envelope service
/// and authenticator.
pub async fn build_state(cli: &Cli) -> anyhow::Result<AppState> {
    let master_keys = Arc::new(
        MasterKeyStore::new(master_keys(cli)?).context("invalid master key configuration")?,
    );
    info!(
        active = %master_keys.active_key_id()?,
        count = master_keys.len()?,
        "Master keys loaded"
    );

    let store = data_key_store(cli).await?;
    let service = EnvelopeService::new(master_keys, store);
    let authenticator = authenticator(cli)?;

    info!(backends = ?authenticator.backend_names(), "Authentication configured");

    Ok(AppState::new(Arc::new(service), authenticator))
}

/// Resolves the configured master keys, generating one in dev mode.
pub fn master_keys(cli: &Cli) -> anyhow::Result<Vec<MasterKey>> {
    match &cli.master_keys {
        Some(input) => Ok(parse_master_keys(input)?),
        None if cli.dev => {
            warn!(id = DEV_MASTER_KEY_ID, "No master keys configured, generated an ephemeral key");
            Ok(vec![MasterKey::generate(DEV_MASTER_KEY_ID)?])
        },
        None => bail!("no master keys configured (set KEYWARD_MASTER_KEYS)"),
    }
}

/// Opens the data key store: in memory in dev mode, SQLite otherwise.
pub async fn data_key_store(cli: &Cli) -> anyhow::Result<Arc<dyn DataKeyStore>> {
    if cli.dev && cli.data_dir.is_none() {
        info!("Using in-memory data key store");
        return Ok(Arc::new(MemoryDataKeyStore::new()));
    }

    let Some(dir) = &cli.data_dir else {
        bail!("no data directory configured (set KEYWARD_DATA_DIR)");
    };

    let store = SqliteDataKeyStore::open(dir, STORE_NAME)
        .await
        .with_context(|| format!("failed to open data key store in {}", dir.display()))?;
    Ok(Arc::new(store))
}

/// Builds the authenticator chain from the configured backends.
///
/// JWT is tried before the root token so signed tokens never pay for an
/// Argon2 verification.
///
/// In dev mode with nothing configured, a root token is generated and
/// logged once.
pub fn authenticator(cli: &Cli) -> anyhow::Result<Authenticator> {
    let mut authenticator = Authenticator::new();

    if let Some(secret) = &cli.jwt_secret {
        let Some(issuer) = &cli.jwt_issuer else {
            bail!("KEYWARD_JWT_ISSUER is required when a JWT secret is set");
        };
        let backend = JwtBackend::new(JwtConfig {
            secret: secret.clone(),
            issuer: issuer.clone(),
            audience: cli.jwt_audience.clone(),
        })
        .context("invalid JWT configuration")?;
        authenticator = authenticator.with_backend(Arc::new(backend));
    }

    if let Some(hash) = &cli.root_token_hash {
        let backend = RootTokenBackend::with_static_hash(hash.clone())
            .context("invalid root token hash")?;
        authenticator = authenticator.with_backend(Arc::new(backend));
    }

    if authenticator.backend_names().is_empty() {
        if !cli.dev {
            bail!("no authentication backend configured (set KEYWARD_ROOT_TOKEN_HASH or KEYWARD_JWT_SECRET)");
        }

        let token = random::generate_token(32)?;
        let backend = RootTokenBackend::with_static_hash(hash_root_token(&token)?)?;
        warn!(root_token = %token, "Generated development root token");
        authenticator = authenticator.with_backend(Arc::new(backend));
    }

    Ok(authenticator)
}
