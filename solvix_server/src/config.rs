use std::{env, time::Duration};

use log::*;
use solvix_common::{env_flag, Secret};

const DEFAULT_SOLVIX_HOST: &str = "127.0.0.1";
const DEFAULT_SOLVIX_PORT: u16 = 8380;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/solvix.db";
const DEFAULT_JWT_EXPIRY_HOURS: i64 = 24;
const DEFAULT_STRIPE_API_URL: &str = "https://api.stripe.com";
const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;
const DEFAULT_OUTBOX_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Apply outstanding database migrations on startup.
    pub auto_migrate: bool,
    pub auth: AuthConfig,
    pub stripe: StripeConfig,
    /// How often the dispatcher delivers notifications left in the outbox.
    pub outbox_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SOLVIX_HOST.to_string(),
            port: DEFAULT_SOLVIX_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auto_migrate: true,
            auth: AuthConfig::default(),
            stripe: StripeConfig::default(),
            outbox_interval: DEFAULT_OUTBOX_INTERVAL,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SOLVIX_HOST").ok().unwrap_or_else(|| DEFAULT_SOLVIX_HOST.into());
        let port = env::var("SOLVIX_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SOLVIX_PORT. {e} Using the default, {DEFAULT_SOLVIX_PORT}, \
                         instead."
                    );
                    DEFAULT_SOLVIX_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SOLVIX_PORT);
        let database_url = env::var("SOLVIX_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SOLVIX_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let auto_migrate = env_flag("SOLVIX_AUTO_MIGRATE", true);
        let outbox_interval = env::var("SOLVIX_OUTBOX_INTERVAL")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid SOLVIX_OUTBOX_INTERVAL ({s}). {e}. Using the default."))
                    .ok()
            })
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_OUTBOX_INTERVAL);
        Self {
            host,
            port,
            database_url,
            auto_migrate,
            auth: AuthConfig::from_env_or_default(),
            stripe: StripeConfig::from_env_or_default(),
            outbox_interval,
        }
    }
}

//----------------------------------------------   AuthConfig  ----------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// HS256 key used to sign and verify access tokens.
    pub jwt_secret: Secret<String>,
    pub token_expiry: chrono::Duration,
}

impl Default for AuthConfig {
    /// A random signing key. Tokens issued with it do not survive a restart.
    fn default() -> Self {
        let key: [u8; 32] = rand::random();
        Self { jwt_secret: Secret::new(hex::encode(key)), token_expiry: chrono::Duration::hours(DEFAULT_JWT_EXPIRY_HOURS) }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S, token_expiry: chrono::Duration) -> Self {
        Self { jwt_secret: Secret::new(secret.into()), token_expiry }
    }

    pub fn from_env_or_default() -> Self {
        let mut config = match env::var("SOLVIX_JWT_SECRET") {
            Ok(s) if !s.trim().is_empty() => {
                Self { jwt_secret: Secret::new(s), ..Default::default() }
            },
            _ => {
                warn!(
                    "🪛️ SOLVIX_JWT_SECRET is not set. A random signing key will be used for this session, so all access \
                     tokens are invalidated when the server restarts. Set SOLVIX_JWT_SECRET in production."
                );
                Self::default()
            },
        };
        if let Ok(s) = env::var("SOLVIX_JWT_EXPIRY_HOURS") {
            match s.parse::<i64>() {
                Ok(hours) if hours > 0 => config.token_expiry = chrono::Duration::hours(hours),
                _ => warn!("🪛️ Invalid SOLVIX_JWT_EXPIRY_HOURS ({s}). Tokens expire after {DEFAULT_JWT_EXPIRY_HOURS} hours."),
            }
        }
        config
    }
}

//----------------------------------------------   StripeConfig  ----------------------------------------------------
#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: Secret<String>,
    /// Handed to browsers so they can confirm card payments. Not a secret.
    pub publishable_key: Option<String>,
    pub webhook_secret: Secret<String>,
    pub api_url: String,
    /// If false, webhook signatures are not checked at all. Only ever do this in development.
    pub signature_checks: bool,
    /// Maximum age, in seconds, of a signed webhook.
    pub webhook_tolerance: i64,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: Secret::default(),
            publishable_key: None,
            webhook_secret: Secret::default(),
            api_url: DEFAULT_STRIPE_API_URL.to_string(),
            signature_checks: true,
            webhook_tolerance: DEFAULT_WEBHOOK_TOLERANCE_SECS,
        }
    }
}

impl StripeConfig {
    pub fn from_env_or_default() -> Self {
        let secret_key = Secret::new(env::var("SOLVIX_STRIPE_SECRET_KEY").unwrap_or_default());
        if !secret_key.is_set() {
            error!("🪛️ SOLVIX_STRIPE_SECRET_KEY is not set. Card payments will be unavailable.");
        }
        let publishable_key = env::var("SOLVIX_STRIPE_PUBLISHABLE_KEY").ok().filter(|s| !s.trim().is_empty());
        if publishable_key.is_none() {
            warn!("🪛️ SOLVIX_STRIPE_PUBLISHABLE_KEY is not set. Clients will not be able to load the payment form.");
        }
        let webhook_secret = Secret::new(env::var("SOLVIX_STRIPE_WEBHOOK_SECRET").unwrap_or_default());
        let signature_checks = env_flag("SOLVIX_WEBHOOK_SIGNATURE_CHECKS", true);
        if !signature_checks {
            warn!("🚨️ Stripe webhook signature checks are DISABLED. Anyone can fake a payment. Never do this in production.");
        } else if !webhook_secret.is_set() {
            error!("🪛️ SOLVIX_STRIPE_WEBHOOK_SECRET is not set. Every Stripe webhook will be rejected.");
        }
        let api_url = env::var("SOLVIX_STRIPE_API_URL").ok().unwrap_or_else(|| DEFAULT_STRIPE_API_URL.to_string());
        let webhook_tolerance = env::var("SOLVIX_WEBHOOK_TOLERANCE_SECS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|&secs| secs > 0)
            .unwrap_or(DEFAULT_WEBHOOK_TOLERANCE_SECS);
        Self { secret_key, publishable_key, webhook_secret, api_url, signature_checks, webhook_tolerance }
    }
}
