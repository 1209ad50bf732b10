//! Server configuration.
//!
//! Everything is read from `LPG_*` environment variables. Invalid values are logged and replaced with their defaults,
//! so that a typo never stops the server from starting.
use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use loyalty_engine::SchedulerConfig;
use lpg_common::{
    helpers::{parse_boolean_flag, parse_env_var},
    Secret,
};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/loyalty_store.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACCRUAL_ADDRESS: &str = "http://localhost:3000";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_BATCH_SIZE: u32 = 20;
const DEFAULT_ORDER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: Secret<String>,
    pub max_connections: u32,
    /// If true, the database is dropped and recreated before migrations run. **All data is lost.**
    pub reinit_database: bool,
    pub accrual: AccrualConfig,
}

#[derive(Clone, Debug)]
pub struct AccrualConfig {
    /// Base URL of the accrual system, e.g. `http://localhost:3000`
    pub address: String,
    pub poll_interval: Duration,
    pub batch_size: u32,
    /// Deadline for the accrual request and database work of a single order
    pub order_timeout: Duration,
    pub worker_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: Secret::new(DEFAULT_DATABASE_URL.to_string()),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            reinit_database: false,
            accrual: AccrualConfig::default(),
        }
    }
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ACCRUAL_ADDRESS.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            order_timeout: DEFAULT_ORDER_TIMEOUT,
            worker_enabled: true,
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let database_url = env::var("LPG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ LPG_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = env_or_default("LPG_DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let reinit_database = parse_boolean_flag(env::var("LPG_REINIT_DATABASE").ok(), false);
        if reinit_database {
            warn!("🪛️ LPG_REINIT_DATABASE is set. The database will be wiped on start-up.");
        }
        let accrual = AccrualConfig::from_env_or_default();
        Self { database_url: Secret::new(database_url), max_connections, reinit_database, accrual }
    }
}

impl AccrualConfig {
    pub fn from_env_or_default() -> Self {
        let address = env::var("LPG_ACCRUAL_SYSTEM_ADDRESS").ok().unwrap_or_else(|| {
            info!("🪛️ LPG_ACCRUAL_SYSTEM_ADDRESS is not set. Using the default, {DEFAULT_ACCRUAL_ADDRESS}.");
            DEFAULT_ACCRUAL_ADDRESS.to_string()
        });
        let poll_interval =
            Duration::from_secs(env_or_default("LPG_ACCRUAL_POLL_INTERVAL", DEFAULT_POLL_INTERVAL.as_secs()));
        let batch_size = env_or_default("LPG_ACCRUAL_BATCH_SIZE", DEFAULT_BATCH_SIZE);
        let order_timeout =
            Duration::from_secs(env_or_default("LPG_ACCRUAL_ORDER_TIMEOUT", DEFAULT_ORDER_TIMEOUT.as_secs()));
        let worker_enabled = parse_boolean_flag(env::var("LPG_ACCRUAL_WORKER_ENABLED").ok(), true);
        let mut result = Self { address, poll_interval, batch_size, order_timeout, worker_enabled };
        result.sanitize();
        result
    }

    /// Replaces zero values with the defaults. A zero poll interval would panic in `tokio::time::interval`.
    fn sanitize(&mut self) {
        if self.poll_interval.is_zero() {
            warn!("🪛️ The accrual poll interval cannot be zero. Using {}s.", DEFAULT_POLL_INTERVAL.as_secs());
            self.poll_interval = DEFAULT_POLL_INTERVAL;
        }
        if self.batch_size == 0 {
            warn!("🪛️ The accrual batch size cannot be zero. Using {DEFAULT_BATCH_SIZE}.");
            self.batch_size = DEFAULT_BATCH_SIZE;
        }
        if self.order_timeout.is_zero() {
            warn!("🪛️ The accrual order timeout cannot be zero. Using {}s.", DEFAULT_ORDER_TIMEOUT.as_secs());
            self.order_timeout = DEFAULT_ORDER_TIMEOUT;
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: self.poll_interval,
            batch_size: self.batch_size,
            order_timeout: self.order_timeout,
        }
    }
}

fn env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match parse_env_var::<T>(name) {
        Some(Ok(v)) => v,
        Some(Err(e)) => {
            error!("🪛️ {e} Using the default, {default}, instead.");
            default
        },
        None => default,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_values_fall_back_to_defaults() {
        let mut config = AccrualConfig {
            poll_interval: Duration::ZERO,
            batch_size: 0,
            order_timeout: Duration::ZERO,
            ..Default::default()
        };
        config.sanitize();
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.order_timeout, DEFAULT_ORDER_TIMEOUT);
    }

    #[test]
    fn scheduler_config_mirrors_the_accrual_settings() {
        let config = AccrualConfig {
            poll_interval: Duration::from_secs(7),
            batch_size: 3,
            order_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let scheduler = config.scheduler_config();
        assert_eq!(scheduler.interval, Duration::from_secs(7));
        assert_eq!(scheduler.batch_size, 3);
        assert_eq!(scheduler.order_timeout, Duration::from_secs(2));
    }

    #[test]
    fn database_url_is_not_printed() {
        let config = ServerConfig::default();
        assert!(!format!("{config:?}").contains("loyalty_store"));
    }
}
