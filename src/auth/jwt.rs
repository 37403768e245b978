use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use super::model::Claims;
use crate::account::model::AccountId;
use crate::error::CustomError;

/// RS256 signing and verification keys plus token lifetime.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    /// Keys in PEM form. Literal `\n` sequences (as found in single-line env
    /// values) are turned into newlines.
    pub fn from_pem(private_pem: &str, public_pem: &str, ttl_secs: i64) -> Result<Self, CustomError> {
        let encoding = EncodingKey::from_rsa_pem(private_pem.replace("\\n", "\n").as_bytes())
            .map_err(CustomError::EncodeError)?;
        let decoding = DecodingKey::from_rsa_pem(public_pem.replace("\\n", "\n").as_bytes())
            .map_err(CustomError::EncodeError)?;
        Ok(Self {
            encoding,
            decoding,
            ttl: Duration::seconds(ttl_secs),
        })
    }

    pub fn create_jwt(&self, account: AccountId) -> Result<String, CustomError> {
        let now = Utc::now();
        let claims = Claims {
            sub: account.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + self.ttl).timestamp() as usize,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding)
            .map_err(CustomError::EncodeError)
    }

    /// Account id carried by a valid, unexpired token.
    pub fn verify_jwt(&self, token: &str) -> Result<AccountId, CustomError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::RS256))
            .map_err(CustomError::InvalidToken)?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| {
            CustomError::InvalidToken(jsonwebtoken::errors::ErrorKind::InvalidSubject.into())
        })
    }
}
