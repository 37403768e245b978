use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::CustomError;

/// A payment confirmed by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPayment {
    pub amount: Decimal,
    pub reference: String,
}

#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    async fn verify(&self, transaction_id: &str) -> Result<VerifiedPayment, CustomError>;
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    amount: Decimal,
    tx_ref: String,
}

/// Flutterwave `GET /transactions/{id}/verify`.
pub struct FlutterwaveVerifier {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl FlutterwaveVerifier {
    pub fn new(base_url: String, secret_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key,
        }
    }
}

#[async_trait]
impl PaymentVerifier for FlutterwaveVerifier {
    async fn verify(&self, transaction_id: &str) -> Result<VerifiedPayment, CustomError> {
        if transaction_id.is_empty() || !transaction_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CustomError::Validation(
                "transaction_id is required".to_string(),
            ));
        }
        let url = format!("{}/transactions/{}/verify", self.base_url, transaction_id);

        info!(url = %url, "Verifying payment");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(CustomError::Upstream)?;

        if !response.status().is_success() {
            warn!(transaction_id, status = %response.status(), "payment verification rejected");
            return Err(CustomError::PaymentVerification(format!(
                "provider returned {}",
                response.status()
            )));
        }

        let body: VerifyResponse = response.json().await.map_err(CustomError::Upstream)?;
        let data = body.data.ok_or_else(|| {
            CustomError::PaymentVerification("response without data".to_string())
        })?;
        if data.status != "successful" {
            return Err(CustomError::PaymentVerification(format!(
                "payment status {}",
                data.status
            )));
        }

        Ok(VerifiedPayment {
            amount: data.amount,
            reference: data.tx_ref,
        })
    }
}
