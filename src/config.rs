use std::env;
use std::time::Duration;

use dotenvy::dotenv;

use crate::constants::READ_TIMEOUT;
use crate::error::CustomError;

pub struct Config {
    pub jwt_private_key: String,
    pub jwt_public_key: String,
    pub database_url: String,
    pub bind_addr: String,
    pub token_ttl_secs: i64,
    pub read_timeout: Duration,
    pub payment_api_url: String,
    pub payment_secret_key: String,
    pub geo_lookup_url: String,
    pub restricted_country: String,
    pub dev_routes: bool,
    pub log_format: String,
}

fn required(key: &str) -> Result<String, CustomError> {
    env::var(key).map_err(|e| CustomError::EnvError(key.to_string(), e))
}

fn optional(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first
    /// when present.
    pub fn from_env() -> Result<Self, CustomError> {
        dotenv().ok();

        let token_ttl_secs = optional("TOKEN_TTL_SECS", "3600")
            .parse::<i64>()
            .map_err(|_| CustomError::EnvInvalid("TOKEN_TTL_SECS".to_string()))?;
        let read_timeout = match env::var("READ_TIMEOUT_SECS") {
            Ok(secs) => secs
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| CustomError::EnvInvalid("READ_TIMEOUT_SECS".to_string()))?,
            Err(_) => READ_TIMEOUT,
        };
        let dev_routes = match optional("DEV_ROUTES", "false").to_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" | "" => false,
            _ => return Err(CustomError::EnvInvalid("DEV_ROUTES".to_string())),
        };

        Ok(Config {
            jwt_private_key: required("JWT_PRIVATE_KEY")?,
            jwt_public_key: required("JWT_PUBLIC_KEY")?,
            database_url: required("DATABASE_URL")?,
            bind_addr: optional("BIND_ADDR", "127.0.0.1:7879"),
            token_ttl_secs,
            read_timeout,
            payment_api_url: optional("PAYMENT_API_URL", "https://api.flutterwave.com/v3"),
            payment_secret_key: optional("PAYMENT_SECRET_KEY", ""),
            geo_lookup_url: optional("GEO_LOOKUP_URL", "http://ip-api.com/json"),
            restricted_country: optional("RESTRICTED_COUNTRY", "nigeria"),
            dev_routes,
            log_format: optional("LOG_FORMAT", "pretty"),
        })
    }
}
