use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::units::to_minor;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    Postgres,
    InMemory,
}

/// Bot token and chat id of one Telegram channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramChannel {
    pub bot_token: String,
    pub chat_id: String,
}

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub store_type: StoreType,
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub credit_threshold_minor: i64,
    pub require_price_above_liters: bool,
    pub maintenance_km_tolerance: i64,
    pub maintenance_alert_interval_secs: u64,
    pub telegram_api_base: String,
    pub refuel_channel: Option<TelegramChannel>,
    pub credit_channel: Option<TelegramChannel>,
    pub maintenance_channel: Option<TelegramChannel>,
}

impl Config {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable lookup
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let store_type = match var("STORE_TYPE")
            .unwrap_or_else(|| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" => StoreType::Postgres,
            "inmemory" => StoreType::InMemory,
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORE_TYPE",
                    value: other.to_string(),
                })
            }
        };

        let database_url = var("DATABASE_URL");
        if store_type == StoreType::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_or("PORT", var("PORT"), 8095)?;

        let threshold: f64 = parse_or("STATION_CREDIT_THRESHOLD", var("STATION_CREDIT_THRESHOLD"), 5000.0)?;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Invalid {
                name: "STATION_CREDIT_THRESHOLD",
                value: threshold.to_string(),
            });
        }

        let require_price_above_liters = match var("REQUIRE_PRICE_ABOVE_LITERS") {
            None => true,
            Some(value) => parse_bool(&value).ok_or(ConfigError::Invalid {
                name: "REQUIRE_PRICE_ABOVE_LITERS",
                value,
            })?,
        };

        let maintenance_km_tolerance: i64 =
            parse_or("MAINTENANCE_KM_TOLERANCE", var("MAINTENANCE_KM_TOLERANCE"), 500)?;
        let maintenance_alert_interval_secs: u64 = parse_or(
            "MAINTENANCE_ALERT_INTERVAL_SECS",
            var("MAINTENANCE_ALERT_INTERVAL_SECS"),
            60,
        )?;
        if maintenance_alert_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "MAINTENANCE_ALERT_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        let telegram_api_base = var("TELEGRAM_API_BASE")
            .unwrap_or_else(|| "https://api.telegram.org".to_string())
            .trim_end_matches('/')
            .to_string();

        let channel = |token: &str, chat: &str| match (var(token), var(chat)) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramChannel { bot_token, chat_id }),
            _ => None,
        };

        Ok(Config {
            store_type,
            database_url,
            host,
            port,
            credit_threshold_minor: to_minor(threshold),
            require_price_above_liters,
            maintenance_km_tolerance,
            maintenance_alert_interval_secs,
            telegram_api_base,
            refuel_channel: channel("TELEGRAM_BOT_TOKEN", "TELEGRAM_CHAT_ID"),
            credit_channel: channel("TELEGRAM_CREDIT_BOT_TOKEN", "TELEGRAM_CREDIT_CHAT_ID"),
            maintenance_channel: channel(
                "TELEGRAM_MAINTENANCE_BOT_TOKEN",
                "TELEGRAM_MAINTENANCE_CHAT_ID",
            ),
        })
    }
}

fn parse_or<T: FromStr>(name: &'static str, value: Option<String>, default: T) -> ConfigResult<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_for_inmemory_store() {
        let config = Config::from_lookup(lookup(&[("STORE_TYPE", "inmemory")])).unwrap();

        assert_eq!(config.store_type, StoreType::InMemory);
        assert_eq!(config.port, 8095);
        assert_eq!(config.credit_threshold_minor, 500_000);
        assert!(config.require_price_above_liters);
        assert_eq!(config.maintenance_km_tolerance, 500);
        assert_eq!(config.maintenance_alert_interval_secs, 60);
        assert_eq!(config.telegram_api_base, "https://api.telegram.org");
        assert!(config.refuel_channel.is_none());
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = Config::from_lookup(lookup(&[("STORE_TYPE", "inmemory"), ("PORT", "http")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn test_channels_need_token_and_chat() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/fleet"),
            ("TELEGRAM_BOT_TOKEN", "abc"),
            ("TELEGRAM_CHAT_ID", "42"),
            ("TELEGRAM_CREDIT_BOT_TOKEN", "def"),
            ("STATION_CREDIT_THRESHOLD", "250.5"),
            ("REQUIRE_PRICE_ABOVE_LITERS", "false"),
        ]))
        .unwrap();

        assert_eq!(
            config.refuel_channel,
            Some(TelegramChannel {
                bot_token: "abc".to_string(),
                chat_id: "42".to_string()
            })
        );
        assert!(config.credit_channel.is_none());
        assert_eq!(config.credit_threshold_minor, 25_050);
        assert!(!config.require_price_above_liters);
    }
}
