use std::{error::Error, fmt::Debug};

use crate::constants::{
    BAD_REQUEST, CONFLICT, FORBIDDEN, INTERNAL_ERROR, NOT_FOUND, UNAUTHORIZED,
};
use crate::money::Cents;

#[derive(thiserror::Error)]
pub enum CustomError {
    #[error("ENV '{0}' Not Found")]
    EnvError(String, #[source] std::env::VarError),

    #[error("ENV '{0}' is invalid")]
    EnvInvalid(String),

    #[error("Error encode private key")]
    EncodeError(#[source] jsonwebtoken::errors::Error),

    #[error("Invalid token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("Missing token")]
    MissingToken,

    #[error("Incorrect Credentials!!")]
    InvalidCredentials,

    #[error("Account is locked")]
    AccountLocked,

    #[error("Forbidden to Access this Page")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("Email is already in Use")]
    EmailExists,

    #[error("Phone Number is already in Use")]
    PhoneExists,

    #[error("This IP already exist. Please try another one")]
    IpExists,

    #[error("User not found")]
    UserNotFound,

    #[error("No User Found with that Wallet Address")]
    WalletNotFound,

    #[error("Insufficient Funds!!")]
    InsufficientFunds { balance: Cents, required: Cents },

    #[error("Can not transfer to same beneficiary")]
    SelfTransfer,

    #[error("Receiver is not permitted to receive transfers")]
    ReceiverNotPermitted,

    #[error("Sender is not permitted to send transfers")]
    SenderNotPermitted,

    #[error("Reference '{0}' already recorded")]
    DuplicateReference(String),

    #[error("Verification Failed!!")]
    PaymentVerification(String),

    #[error("We could not validate your information. Please try again!")]
    GeoLookup(String),

    #[error("Upstream request failed")]
    Upstream(#[source] reqwest::Error),

    #[error("Database")]
    DBError(#[source] sqlx::Error),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Hashing")]
    HashError(#[source] bcrypt::BcryptError),

    #[error("Blocking task failed")]
    BlockingTask(#[source] tokio::task::JoinError),
}

impl CustomError {
    /// Status line sent back for this error.
    pub fn status_line(&self) -> &'static str {
        match self {
            CustomError::MissingToken
            | CustomError::InvalidToken(_)
            | CustomError::InvalidCredentials => UNAUTHORIZED,
            CustomError::AccountLocked
            | CustomError::Forbidden
            | CustomError::ReceiverNotPermitted
            | CustomError::SenderNotPermitted => FORBIDDEN,
            CustomError::UserNotFound | CustomError::WalletNotFound => NOT_FOUND,
            CustomError::PaymentVerification(_) => NOT_FOUND,
            CustomError::DuplicateReference(_) => CONFLICT,
            CustomError::Validation(_)
            | CustomError::EmailExists
            | CustomError::PhoneExists
            | CustomError::IpExists
            | CustomError::InsufficientFunds { .. }
            | CustomError::SelfTransfer
            | CustomError::GeoLookup(_) => BAD_REQUEST,
            CustomError::EnvError(..)
            | CustomError::EnvInvalid(_)
            | CustomError::EncodeError(_)
            | CustomError::Upstream(_)
            | CustomError::DBError(_)
            | CustomError::CorruptRecord(_)
            | CustomError::HashError(_)
            | CustomError::BlockingTask(_) => INTERNAL_ERROR,
        }
    }

    /// Message safe to return to the client. Infrastructure failures are
    /// collapsed into a generic text.
    pub fn public_message(&self) -> String {
        if self.status_line() == INTERNAL_ERROR {
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<sqlx::Error> for CustomError {
    fn from(e: sqlx::Error) -> Self {
        CustomError::DBError(e)
    }
}

impl Debug for CustomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        if let Some(source) = self.source() {
            write!(f, " (Caused by: {})", source)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infrastructure_errors_hide_details() {
        let err = CustomError::CorruptRecord("accounts.id".to_string());
        assert_eq!(err.status_line(), INTERNAL_ERROR);
        assert_eq!(err.public_message(), "Internal Server Error");
    }

    #[test]
    fn reused_reference_is_a_conflict() {
        let err = CustomError::DuplicateReference("WD7Q2".to_string());
        assert_eq!(err.status_line(), CONFLICT);
        assert_eq!(err.public_message(), "Reference 'WD7Q2' already recorded");
    }

    #[test]
    fn domain_errors_keep_message() {
        let err = CustomError::InsufficientFunds {
            balance: 100,
            required: 200,
        };
        assert_eq!(err.status_line(), BAD_REQUEST);
        assert_eq!(err.public_message(), "Insufficient Funds!!");
        assert_eq!(CustomError::SelfTransfer.status_line(), BAD_REQUEST);
        assert_eq!(CustomError::WalletNotFound.status_line(), NOT_FOUND);
    }

    #[test]
    fn debug_includes_source() {
        let err = CustomError::DBError(sqlx::Error::RowNotFound);
        let printed = format!("{:?}", err);
        assert!(printed.starts_with("Database"));
        assert!(printed.contains("Caused by"));
    }
}
