//! Command-line and environment configuration.

use std::path::PathBuf;

use clap::Parser;

/// Default bind address.
pub const DEFAULT_BIND: &str = "0.0.0.0:8443";

#[derive(Parser, Debug, Clone)]
#[command(name = "keyward-server")]
#[command(about = "Keyward - envelope encryption key management server")]
#[command(version)]
pub struct Cli {
    /// Server bind address
    #[arg(long, default_value = DEFAULT_BIND, env = "KEYWARD_BIND_ADDRESS")]
    pub bind: String,

    /// Master keys as `id:base64key,...`; the first is active
    #[arg(long, env = "KEYWARD_MASTER_KEYS", hide_env_values = true)]
    pub master_keys: Option<String>,

    /// Directory for the SQLite data key store
    #[arg(long, env = "KEYWARD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable development mode (in-memory storage, generated keys and root token)
    #[arg(long, env = "KEYWARD_DEV_MODE")]
    pub dev: bool,

    /// HS256 secret for validating JWT bearer tokens
    #[arg(long, env = "KEYWARD_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Expected JWT issuer
    #[arg(long, env = "KEYWARD_JWT_ISSUER")]
    pub jwt_issuer: Option<String>,

    /// Expected JWT audience
    #[arg(long, default_value = "keyward", env = "KEYWARD_JWT_AUDIENCE")]
    pub jwt_audience: String,

    /// Argon2id hash of the root token (see `keyward token hash`)
    #[arg(long, env = "KEYWARD_ROOT_TOKEN_HASH", hide_env_values = true)]
    pub root_token_hash: Option<String>,
}
