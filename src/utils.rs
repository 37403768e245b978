use std::collections::HashMap;

use bcrypt::{hash, verify};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};

use crate::constants::{REFERENCE_LEN, WALLET_ADDRESS_LEN};
use crate::error::CustomError;

pub const BCRYPT_COST: u32 = 10;

pub fn des_from_str<T: for<'a> Deserialize<'a>>(body: &str) -> Result<T, CustomError> {
    serde_json::from_str(body).map_err(|e| CustomError::Validation(format!("invalid body: {}", e)))
}

pub fn ser_to_str<T: Serialize>(t: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(t)
}

/// `{"message": ...}` body used by every error and by plain acknowledgements.
pub fn message(text: &str) -> String {
    serde_json::json!({ "message": text }).to_string()
}

pub fn encrypt(value: &str) -> Result<String, CustomError> {
    hash(value, BCRYPT_COST).map_err(CustomError::HashError)
}

pub fn is_password_valid(value: &str, hashed: &str) -> bool {
    verify(value, hashed).unwrap_or(false)
}

/// [`encrypt`] on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String, CustomError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || encrypt(&password))
        .await
        .map_err(CustomError::BlockingTask)?
}

/// [`is_password_valid`] on the blocking pool.
pub async fn verify_password(password: &str, hashed: &str) -> Result<bool, CustomError> {
    let (password, hashed) = (password.to_string(), hashed.to_string());
    tokio::task::spawn_blocking(move || is_password_valid(&password, &hashed))
        .await
        .map_err(CustomError::BlockingTask)
}

/// Token from `Authorization: Bearer <t>`, falling back to the `auth-token`
/// header.
pub fn extract_token(headers: &HashMap<String, String>) -> Option<String> {
    if let Some(value) = headers.get("authorization") {
        let value = value.trim();
        return value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
    }
    headers
        .get("auth-token")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Upper-case reference code attached to ledger entries and withdrawals.
pub fn generate_reference() -> String {
    random_alphanumeric(REFERENCE_LEN).to_uppercase()
}

pub fn generate_wallet_address() -> String {
    random_alphanumeric(WALLET_ADDRESS_LEN)
}

/// Current time at the precision timestamps are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub fn to_db_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn from_db_time(column: &str, value: &str) -> Result<DateTime<Utc>, CustomError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| CustomError::CorruptRecord(format!("{}: {}", column, value)))
}
