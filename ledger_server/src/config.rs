use std::{env, str::FromStr};

use chrono::Duration;
use ledger_common::{
    helpers::{env_flag, env_parse},
    Amount,
    Secret,
};
use ledger_engine::RiskPolicy;
use log::*;

const DEFAULT_LPG_HOST: &str = "127.0.0.1";
const DEFAULT_LPG_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/ledger_store.db";
const DEFAULT_STALE_TRANSACTION_TIMEOUT: Duration = Duration::hours(24);
const DEFAULT_EXPIRY_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(300);
const DEFAULT_RISK_WINDOW_MINUTES: i64 = 15;
const DEFAULT_LARGE_AMOUNT_THRESHOLD: i64 = 50_000;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Shared secret for the admin API, supplied in the `X-Api-Key` header. When empty, the admin API rejects every
    /// request.
    pub admin_api_key: Secret<String>,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// Pending and processing transactions older than this are expired by the expiry worker.
    pub stale_transaction_timeout: Duration,
    /// How often the expiry worker runs.
    pub expiry_sweep_interval: std::time::Duration,
    /// Audit risk scoring parameters.
    pub risk_policy: RiskPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_LPG_HOST.to_string(),
            port: DEFAULT_LPG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            admin_api_key: Secret::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            stale_transaction_timeout: DEFAULT_STALE_TRANSACTION_TIMEOUT,
            expiry_sweep_interval: DEFAULT_EXPIRY_SWEEP_INTERVAL,
            risk_policy: RiskPolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("LPG_HOST").ok().unwrap_or_else(|| DEFAULT_LPG_HOST.into());
        let port = env_or_default("LPG_PORT", DEFAULT_LPG_PORT);
        let database_url = env::var("LPG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ LPG_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let admin_api_key = Secret::new(env::var("LPG_ADMIN_API_KEY").ok().unwrap_or_default());
        if admin_api_key.is_empty() {
            warn!("🚨️ LPG_ADMIN_API_KEY is not set. The admin API will reject every request until it is configured.");
        }
        let use_x_forwarded_for = env_flag("LPG_USE_X_FORWARDED_FOR", false);
        let use_forwarded = env_flag("LPG_USE_FORWARDED", false);
        let stale_transaction_timeout = duration_or_default(
            "LPG_STALE_TRANSACTION_TIMEOUT",
            DEFAULT_STALE_TRANSACTION_TIMEOUT.num_hours(),
            "hrs",
            Duration::try_hours,
        );
        let sweep_secs =
            positive_or_default("LPG_EXPIRY_SWEEP_INTERVAL", DEFAULT_EXPIRY_SWEEP_INTERVAL.as_secs() as i64, "s");
        let expiry_sweep_interval = std::time::Duration::from_secs(sweep_secs.unsigned_abs());
        let failure_window =
            duration_or_default("LPG_RISK_WINDOW", DEFAULT_RISK_WINDOW_MINUTES, "min", Duration::try_minutes);
        let large_amount_threshold =
            env_or_default("LPG_LARGE_AMOUNT_THRESHOLD", Amount::from_units(DEFAULT_LARGE_AMOUNT_THRESHOLD));
        let risk_policy = RiskPolicy { failure_window, large_amount_threshold };
        Self {
            host,
            port,
            database_url,
            admin_api_key,
            use_x_forwarded_for,
            use_forwarded,
            stale_transaction_timeout,
            expiry_sweep_interval,
            risk_policy,
        }
    }
}

fn env_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env_parse::<T>(key) {
        Ok(Some(v)) => v,
        Ok(None) => {
            info!("🪛️ {key} is not set. Using the default value of {default}.");
            default
        },
        Err(e) => {
            warn!("🪛️ {e} Using the default value of {default} instead.");
            default
        },
    }
}

fn positive_or_default(key: &str, default: i64, unit: &str) -> i64 {
    match env_or_default(key, default) {
        v if v > 0 => v,
        v => {
            warn!("🪛️ {key} must be positive, but is {v}. Using the default value of {default} {unit} instead.");
            default
        },
    }
}

/// A positive number of `unit`s, converted by `convert`. Values that do not fit in a [`Duration`] fall back to the
/// default, as do non-positive ones.
fn duration_or_default(key: &str, default: i64, unit: &str, convert: fn(i64) -> Option<Duration>) -> Duration {
    let value = positive_or_default(key, default, unit);
    match convert(value).or_else(|| {
        warn!("🪛️ {key} is too large at {value} {unit}. Using the default value of {default} {unit} instead.");
        convert(default)
    }) {
        Some(d) => d,
        None => {
            error!("🪛️ The default of {default} {unit} for {key} cannot be represented. Using zero.");
            Duration::zero()
        },
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
