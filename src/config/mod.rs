use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::error::ConfigError;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub backend: BackendConfig,
    pub push: PushConfig,
    pub payment: PaymentConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub rust_log: String,
}

// Адреса бэкенда
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub api_base_url: String,
    pub push_url: String,
    /// Готовый bearer-токен, передаётся как есть.
    pub access_token: Option<String>,
    pub request_timeout_secs: u64,
}

// Настройки push-канала блокировок мест
#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// 0 - переподключения отключены.
    pub max_reconnects: u32,
    pub reconnect_delay_ms: u64,
}

// Настройки оплаты
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    pub default_method: String,
}

// Настройки Circuit Breaker
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            app: AppConfig {
                environment: var_or("ENVIRONMENT", "development"),
                rust_log: var_or("RUST_LOG", "cinema_booking=debug"),
            },
            backend: BackendConfig {
                api_base_url: var_or("API_BASE_URL", "http://localhost:8080/api"),
                push_url: var_or("PUSH_URL", "ws://localhost:8080/ws/seats"),
                access_token: env::var("API_ACCESS_TOKEN").ok().filter(|t| !t.is_empty()),
                request_timeout_secs: parse_or("API_TIMEOUT_SECONDS", 15)?,
            },
            push: PushConfig {
                max_reconnects: parse_or("PUSH_MAX_RECONNECTS", 0)?,
                reconnect_delay_ms: parse_or("PUSH_RECONNECT_DELAY_MS", 1000)?,
            },
            payment: PaymentConfig {
                default_method: var_or("PAYMENT_METHOD", "VNPAY"),
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: parse_or("CIRCUIT_BREAKER_FAILURE_THRESHOLD", 5)?,
                timeout_seconds: parse_or("CIRCUIT_BREAKER_TIMEOUT_SECONDS", 30)?,
            },
        })
    }

    /// Конфигурация по умолчанию для заданных адресов (тесты, CLI-флаги).
    pub fn for_backend(api_base_url: impl Into<String>, push_url: impl Into<String>) -> Self {
        Config {
            app: AppConfig {
                environment: "test".to_string(),
                rust_log: "cinema_booking=debug".to_string(),
            },
            backend: BackendConfig {
                api_base_url: api_base_url.into(),
                push_url: push_url.into(),
                access_token: None,
                request_timeout_secs: 5,
            },
            push: PushConfig {
                max_reconnects: 0,
                reconnect_delay_ms: 100,
            },
            payment: PaymentConfig {
                default_method: "VNPAY".to_string(),
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: 5,
                timeout_seconds: 30,
            },
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_when_unset() {
        let value: u32 = parse_or("CINEMA_BOOKING_TEST_UNSET_KEY", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn parse_or_rejects_garbage() {
        env::set_var("CINEMA_BOOKING_TEST_GARBAGE", "seven");
        let err = parse_or::<u32>("CINEMA_BOOKING_TEST_GARBAGE", 7).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CINEMA_BOOKING_TEST_GARBAGE", .. }));
    }

    #[test]
    fn for_backend_disables_reconnects() {
        let config = Config::for_backend("http://api", "ws://push");
        assert_eq!(config.push.max_reconnects, 0);
        assert_eq!(config.backend.api_base_url, "http://api");
    }
}
