use std::{env, time::Duration};

use crate::worker::EvictionSettings;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub redis_url: String,
    pub host: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub eviction_ttl: Duration,
    pub eviction_tick: Duration,
    pub eviction_queue_key: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        Ok(Self::from_lookup(database_url, |key| env::var(key).ok()))
    }

    fn from_lookup(database_url: String, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let redis_url =
            lookup("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string());
        let host = lookup("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("APP_PORT")
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let db_max_connections = lookup("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(10);
        let ttl_secs = lookup("EVICTION_TTL_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(300);
        let tick_ms = lookup("EVICTION_TICK_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(1000);
        let eviction_queue_key =
            lookup("EVICTION_QUEUE_KEY").unwrap_or_else(|| "cart:eviction".to_string());

        Self {
            database_url,
            redis_url,
            host,
            port,
            db_max_connections,
            eviction_ttl: Duration::from_secs(ttl_secs),
            eviction_tick: Duration::from_millis(tick_ms),
            eviction_queue_key,
        }
    }

    pub fn eviction_settings(&self) -> EvictionSettings {
        EvictionSettings {
            ttl: self.eviction_ttl,
            tick: self.eviction_tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup("postgres://localhost/carts".into(), |key| {
            vars.get(key).cloned()
        })
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_with(&[]);
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.port, 3000);
        assert_eq!(config.eviction_ttl, Duration::from_secs(300));
        assert_eq!(config.eviction_tick, Duration::from_secs(1));
        assert_eq!(config.eviction_queue_key, "cart:eviction");
    }

    #[test]
    fn unparseable_numbers_fall_back() {
        let config = config_with(&[
            ("APP_PORT", "not-a-port"),
            ("EVICTION_TTL_SECS", "0"),
            ("EVICTION_TICK_MS", "250"),
        ]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.eviction_ttl, Duration::from_secs(300));
        assert_eq!(config.eviction_tick, Duration::from_millis(250));
    }
}
