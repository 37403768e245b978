use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sqlx::AnyPool;
use tracing::debug;

use crate::error::CustomError;

/// Resolves the country an IP address is registered in.
#[async_trait]
pub trait GeoLocator: Send + Sync {
    /// `Ok(None)` when the lookup succeeded but the address is unknown.
    async fn country(&self, ip: &str) -> Result<Option<String>, CustomError>;
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    status: Option<String>,
    country: Option<String>,
}

/// Geolocation over an ip-api style JSON endpoint: `GET {base_url}/{ip}`.
pub struct HttpGeoLocator {
    client: Client,
    base_url: String,
}

impl HttpGeoLocator {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl GeoLocator for HttpGeoLocator {
    async fn country(&self, ip: &str) -> Result<Option<String>, CustomError> {
        let url = format!("{}/{}", self.base_url, ip);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(CustomError::Upstream)?;
        if !response.status().is_success() {
            return Err(CustomError::GeoLookup(format!(
                "lookup returned {}",
                response.status()
            )));
        }
        let body: LookupResponse = response.json().await.map_err(CustomError::Upstream)?;
        debug!(ip, status = ?body.status, country = ?body.country, "geo lookup");
        if body.status.as_deref() == Some("fail") {
            return Ok(None);
        }
        Ok(body.country)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrustedIp {
    pub name: String,
    pub ip: String,
}

/// Addresses from the restricted country that may still register.
pub struct TrustedIpRepository {
    pool: AnyPool,
}

impl TrustedIpRepository {
    pub fn new(pool: AnyPool) -> Self {
        TrustedIpRepository { pool }
    }

    pub async fn insert(&self, trusted: &TrustedIp) -> Result<(), CustomError> {
        sqlx::query("INSERT INTO trusted_ips (ip, name) VALUES ($1, $2)")
            .bind(&trusted.ip)
            .bind(&trusted.name)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(err) if err.is_unique_violation() => CustomError::IpExists,
                e => CustomError::DBError(e),
            })?;
        Ok(())
    }

    pub async fn contains(&self, ip: &str) -> Result<bool, CustomError> {
        let row = sqlx::query("SELECT ip FROM trusted_ips WHERE ip = $1")
            .bind(ip)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}
