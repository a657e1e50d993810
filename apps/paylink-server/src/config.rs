// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into explicit
//! structs that are handed to [`AppState`](crate::state::AppState).
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory of the redb database | `./data` |
//! | `PUBLIC_BASE_URL` | Base of generated payment link URLs | `http://localhost:3000` |
//! | `STRIPE_SECRET_KEY` | Stripe API secret key | Required |
//! | `STRIPE_WEBHOOK_SECRET` | Webhook endpoint secret | Optional (webhook disabled) |
//! | `STRIPE_API_BASE_URL` | Stripe API base | `https://api.stripe.com` |
//! | `BLOCKRADAR_API_KEY` | Blockradar API key | Required |
//! | `BLOCKRADAR_WALLET_ID` | Master wallet for custodial addresses | Optional |
//! | `BLOCKRADAR_API_BASE_URL` | Blockradar API base | `https://api.blockradar.co/v1` |
//! | `CHAIN_NETWORK` | `base` or `base-sepolia` | `base-sepolia` |
//! | `CHAIN_RPC_URL` | RPC endpoint | Network default |
//! | `MIN_CONFIRMATIONS` | Confirmations required to verify a payment | `1` |
//! | `SIWE_DOMAIN` | Domain expected in SIWE messages | `localhost:3000` |
//! | `SESSION_SECRET` | HS256 key for session tokens | Required |
//! | `SESSION_TTL_SECS` | Session lifetime | `86400` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;

use crate::blockchain::{NetworkConfig, BASE_SEPOLIA};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_STRIPE_API_BASE_URL: &str = "https://api.stripe.com";
const DEFAULT_BLOCKRADAR_API_BASE_URL: &str = "https://api.blockradar.co/v1";
const DEFAULT_MIN_CONFIRMATIONS: u64 = 1;
const DEFAULT_SIWE_DOMAIN: &str = "localhost:3000";
const DEFAULT_SESSION_TTL_SECS: i64 = 86_400;

/// Minimum length of `SESSION_SECRET` in bytes.
const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: Option<String>,
    pub api_base_url: String,
}

#[derive(Debug, Clone)]
pub struct BlockradarConfig {
    pub api_key: String,
    pub wallet_id: Option<String>,
    pub api_base_url: String,
}

#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub network: NetworkConfig,
    pub rpc_url: String,
    pub min_confirmations: u64,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub siwe_domain: String,
    pub session_secret: String,
    pub session_ttl_secs: i64,
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub public_base_url: String,
    pub stripe: StripeConfig,
    pub blockradar: BlockradarConfig,
    pub chain: ChainConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let network_id = env.or_default("CHAIN_NETWORK", BASE_SEPOLIA.id);
        let network = NetworkConfig::from_id(&network_id).ok_or_else(|| ConfigError::Invalid {
            name: "CHAIN_NETWORK",
            message: format!("unknown network `{network_id}` (expected base or base-sepolia)"),
        })?;
        let rpc_url = env.or_default("CHAIN_RPC_URL", network.rpc_url);

        let session_secret = env.required("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: "SESSION_SECRET",
                message: format!("must be at least {MIN_SESSION_SECRET_LEN} bytes"),
            });
        }

        Ok(Self {
            host: env.or_default("HOST", DEFAULT_HOST),
            port: env.parsed("PORT", DEFAULT_PORT)?,
            data_dir: PathBuf::from(env.or_default("DATA_DIR", DEFAULT_DATA_DIR)),
            public_base_url: env
                .or_default("PUBLIC_BASE_URL", DEFAULT_PUBLIC_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            stripe: StripeConfig {
                secret_key: env.required("STRIPE_SECRET_KEY")?,
                webhook_secret: env.optional("STRIPE_WEBHOOK_SECRET"),
                api_base_url: env.or_default("STRIPE_API_BASE_URL", DEFAULT_STRIPE_API_BASE_URL),
            },
            blockradar: BlockradarConfig {
                api_key: env.required("BLOCKRADAR_API_KEY")?,
                wallet_id: env.optional("BLOCKRADAR_WALLET_ID"),
                api_base_url: env
                    .or_default("BLOCKRADAR_API_BASE_URL", DEFAULT_BLOCKRADAR_API_BASE_URL),
            },
            chain: ChainConfig {
                network,
                rpc_url,
                min_confirmations: env.parsed("MIN_CONFIRMATIONS", DEFAULT_MIN_CONFIRMATIONS)?,
            },
            auth: AuthConfig {
                siwe_domain: env.or_default("SIWE_DOMAIN", DEFAULT_SIWE_DOMAIN),
                session_secret,
                session_ttl_secs: env.parsed("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?,
            },
        })
    }

    /// Socket address string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Public checkout URL for a payment link slug.
    pub fn payment_link_url(&self, slug: &str) -> String {
        format!("{}/pay/{}", self.public_base_url, slug)
    }
}

/// Trimmed, non-empty variable access over a lookup function.
struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                message: e.to_string(),
            }),
            None => Ok(default),
        }
    }
}
