use std::sync::Arc;

use sqlx::AnyPool;
use tracing::{info, warn};

use super::jwt::JwtKeys;
use super::model::{AuthResponse, LoginRequest, RegisterRequest};
use crate::account::model::{Account, AccountId, PublicUser};
use crate::account::repository::AccountRepository;
use crate::constants::MIN_PASSWORD_LEN;
use crate::error::CustomError;
use crate::geo::{GeoLocator, TrustedIp, TrustedIpRepository};
use crate::req::Request;
use crate::utils::{extract_token, generate_wallet_address, hash_password, verify_password};

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn validate_email(email: &str) -> Result<(), CustomError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(CustomError::Validation("\"email\" must be a valid email".to_string())),
    }
}

fn validate_registration(request: &RegisterRequest) -> Result<(), CustomError> {
    if request.name.trim().is_empty() {
        return Err(CustomError::Validation("\"name\" is not allowed to be empty".to_string()));
    }
    validate_email(request.email.trim())?;
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(CustomError::Validation(format!(
            "\"password\" length must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    if request.ip.trim().is_empty() {
        return Err(CustomError::Validation("\"ip\" is required".to_string()));
    }
    Ok(())
}

pub struct AuthService {
    accounts: AccountRepository,
    trusted_ips: TrustedIpRepository,
    keys: JwtKeys,
    geo: Arc<dyn GeoLocator>,
    restricted_country: String,
}

impl AuthService {
    pub fn new(
        pool: AnyPool,
        keys: JwtKeys,
        geo: Arc<dyn GeoLocator>,
        restricted_country: String,
    ) -> Self {
        AuthService {
            accounts: AccountRepository::new(pool.clone()),
            trusted_ips: TrustedIpRepository::new(pool),
            keys,
            geo,
            restricted_country: restricted_country.to_lowercase(),
        }
    }

    /// Accounts registering from the restricted country become internal
    /// (non-client) accounts and need their address on the trusted list.
    async fn screen(&self, ip: &str) -> Result<bool, CustomError> {
        let country = match self.geo.country(ip).await {
            Ok(Some(country)) => country,
            Ok(None) => return Err(CustomError::GeoLookup(format!("no country for {}", ip))),
            Err(e) => {
                warn!(ip, error = ?e, "geo lookup failed");
                return Err(CustomError::GeoLookup(e.to_string()));
            }
        };

        if country.to_lowercase() != self.restricted_country {
            return Ok(true);
        }
        if !self.trusted_ips.contains(ip).await? {
            warn!(ip, country = %country, "registration from untrusted address refused");
            return Err(CustomError::Forbidden);
        }
        Ok(false)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, CustomError> {
        validate_registration(request)?;
        let email = request.email.trim().to_lowercase();
        let phone = non_empty(request.phone.as_deref()).map(str::to_string);

        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(CustomError::EmailExists);
        }
        if let Some(phone) = &phone {
            if self.accounts.find_by_phone(phone).await?.is_some() {
                return Err(CustomError::PhoneExists);
            }
        }

        let ip = request.ip.trim();
        let is_client = self.screen(ip).await?;

        let account = Account::new(
            request.name.trim().to_string(),
            email,
            phone,
            hash_password(&request.password).await?,
            generate_wallet_address(),
            is_client,
        )
        .with_ip(ip);
        self.accounts.insert(&account).await?;

        let token = self.keys.create_jwt(account.id)?;
        info!(account = %account.id, is_client, "account registered");
        Ok(AuthResponse {
            token,
            user: PublicUser::from(&account),
        })
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, CustomError> {
        let account = if let Some(email) = non_empty(request.email.as_deref()) {
            self.accounts.find_by_email(&email.to_lowercase()).await?
        } else if let Some(phone) = non_empty(request.phone.as_deref()) {
            self.accounts.find_by_phone(phone).await?
        } else {
            return Err(CustomError::Validation("Please use email to login".to_string()));
        };

        let account = match account {
            Some(account) => account,
            None => {
                info!("login for unknown account");
                return Err(CustomError::InvalidCredentials);
            }
        };

        if !verify_password(&request.password, &account.password).await? {
            info!(account = %account.id, "wrong password");
            return Err(CustomError::InvalidCredentials);
        }
        if account.account_locked {
            return Err(CustomError::AccountLocked);
        }

        let token = self.keys.create_jwt(account.id)?;
        info!(account = %account.id, "succeed login");
        Ok(AuthResponse {
            token,
            user: PublicUser::from(&account),
        })
    }

    /// Account id behind the request's bearer token.
    pub fn authenticate(&self, request: &Request) -> Result<AccountId, CustomError> {
        let token = extract_token(&request.headers).ok_or(CustomError::MissingToken)?;
        self.keys.verify_jwt(&token)
    }

    pub async fn add_trusted_ip(&self, trusted: &TrustedIp) -> Result<(), CustomError> {
        let trusted = TrustedIp {
            name: trusted.name.trim().to_string(),
            ip: trusted.ip.trim().to_string(),
        };
        if trusted.ip.is_empty() {
            return Err(CustomError::Validation("\"ip\" is required".to_string()));
        }
        self.trusted_ips.insert(&trusted).await?;
        info!(ip = %trusted.ip, name = %trusted.name, "trusted ip added");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            phone: None,
            ip: "10.0.0.1".to_string(),
        }
    }

    #[test]
    fn registration_validation() {
        assert!(validate_registration(&request("Ada", "ada@example.com", "secret1")).is_ok());
        assert!(validate_registration(&request(" ", "ada@example.com", "secret1")).is_err());
        assert!(validate_registration(&request("Ada", "ada.example.com", "secret1")).is_err());
        assert!(validate_registration(&request("Ada", "ada@example.com", "short")).is_err());
    }

    #[test]
    fn email_needs_domain() {
        assert!(validate_email("a@b.io").is_ok());
        assert!(validate_email("@b.io").is_err());
        assert!(validate_email("a@localhost").is_err());
    }
}
