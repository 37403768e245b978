use sqlx::AnyPool;
use tracing::info;

use super::model::{AccountId, Profile, Recipient, UpdateUserRequest};
use super::repository::AccountRepository;
use crate::auth::service::validate_email;
use crate::error::CustomError;

fn provided(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub struct AccountService {
    accounts: AccountRepository,
}

impl AccountService {
    pub fn new(pool: AnyPool) -> Self {
        AccountService {
            accounts: AccountRepository::new(pool),
        }
    }

    pub async fn profile(&self, id: AccountId) -> Result<Profile, CustomError> {
        let account = self.accounts.get(id).await?;
        Ok(Profile::from(&account))
    }

    /// Resolve a wallet address to the account a transfer would go to.
    pub async fn recipient(&self, id: AccountId, wallet: &str) -> Result<Recipient, CustomError> {
        let wallet = wallet.trim();
        let recipient = self
            .accounts
            .find_by_wallet(wallet)
            .await?
            .ok_or(CustomError::WalletNotFound)?;
        if recipient.id == id {
            return Err(CustomError::SelfTransfer);
        }
        Ok(Recipient {
            id: recipient.id,
            user: recipient.name,
        })
    }

    /// Change any of name, email and phone. Blank fields are left alone.
    pub async fn update(&self, id: AccountId, request: &UpdateUserRequest) -> Result<(), CustomError> {
        let name = provided(&request.name);
        let email = provided(&request.email).map(|e| e.to_lowercase());
        let phone = provided(&request.phone);
        if name.is_none() && email.is_none() && phone.is_none() {
            return Err(CustomError::Validation("Nothing to update".to_string()));
        }

        let account = self.accounts.get(id).await?;

        if let Some(email) = &email {
            validate_email(email)?;
            if let Some(other) = self.accounts.find_by_email(email).await? {
                if other.id != id {
                    return Err(CustomError::EmailExists);
                }
            }
        }
        if let Some(phone) = &phone {
            if let Some(other) = self.accounts.find_by_phone(phone).await? {
                if other.id != id {
                    return Err(CustomError::PhoneExists);
                }
            }
        }

        let name = name.unwrap_or(account.name);
        let email = email.unwrap_or(account.email);
        let phone = phone.or(account.phone);
        self.accounts
            .update_contact(id, &name, &email, phone.as_deref())
            .await?;
        info!(account = %id, "profile updated");
        Ok(())
    }
}
