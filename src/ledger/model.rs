use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::model::{AccountId, PlanTier};
use crate::error::CustomError;
use crate::money::{Cents, serialize_cents};
use crate::utils::now;

pub type EntryId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Transfer,
    Deposit,
    Withdrawal,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Transfer => "transfer",
            EntryKind::Deposit => "deposit",
            EntryKind::Withdrawal => "withdrawal",
        }
    }
}

impl FromStr for EntryKind {
    type Err = CustomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer" => Ok(EntryKind::Transfer),
            "deposit" => Ok(EntryKind::Deposit),
            "withdrawal" => Ok(EntryKind::Withdrawal),
            _ => Err(CustomError::CorruptRecord(format!("kind: {}", s))),
        }
    }
}

/// How an entry affects one particular account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
    Deposit,
    Withdrawal,
}

/// Immutable record of a balance-affecting operation. Deposits and
/// withdrawals reference the same account on both sides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    #[serde(serialize_with = "serialize_cents")]
    pub amount: Cents,
    pub kind: EntryKind,
    pub plan: Option<PlanTier>,
    pub reason: Option<String>,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    fn new(
        sender_id: AccountId,
        receiver_id: AccountId,
        amount: Cents,
        kind: EntryKind,
        reference: String,
    ) -> Result<Self, CustomError> {
        if amount <= 0 {
            return Err(CustomError::Validation(
                "Amount must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            amount,
            kind,
            plan: None,
            reason: None,
            reference,
            created_at: now(),
        })
    }

    pub fn transfer(
        sender_id: AccountId,
        receiver_id: AccountId,
        amount: Cents,
        plan: PlanTier,
        reference: String,
    ) -> Result<Self, CustomError> {
        let mut entry = Self::new(sender_id, receiver_id, amount, EntryKind::Transfer, reference)?;
        entry.plan = Some(plan);
        Ok(entry)
    }

    pub fn deposit(
        account_id: AccountId,
        amount: Cents,
        reference: String,
    ) -> Result<Self, CustomError> {
        Ok(Self::new(account_id, account_id, amount, EntryKind::Deposit, reference)?
            .with_reason("Self Deposit"))
    }

    pub fn withdrawal(
        account_id: AccountId,
        amount: Cents,
        reference: String,
    ) -> Result<Self, CustomError> {
        Ok(
            Self::new(account_id, account_id, amount, EntryKind::Withdrawal, reference)?
                .with_reason("Withdrawal"),
        )
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// `None` when the account takes no part in the entry.
    pub fn direction_for(&self, account: AccountId) -> Option<Direction> {
        match self.kind {
            EntryKind::Deposit if self.receiver_id == account => Some(Direction::Deposit),
            EntryKind::Withdrawal if self.sender_id == account => Some(Direction::Withdrawal),
            EntryKind::Transfer if self.sender_id == account => Some(Direction::Sent),
            EntryKind::Transfer if self.receiver_id == account => Some(Direction::Received),
            _ => None,
        }
    }
}

/// Ledger entry as seen by one account.
#[derive(Debug, Serialize)]
pub struct TransactionView {
    #[serde(flatten)]
    pub entry: LedgerEntry,
    pub direction: Direction,
    pub counterparty: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Processing,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Processing => "processing",
        }
    }
}

impl FromStr for WithdrawalStatus {
    type Err = CustomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(WithdrawalStatus::Processing),
            _ => Err(CustomError::CorruptRecord(format!("status: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub account_id: AccountId,
    #[serde(serialize_with = "serialize_cents")]
    pub amount: Cents,
    pub account_number: String,
    pub bank_name: String,
    pub routing_number: String,
    pub status: WithdrawalStatus,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub id: AccountId,
    pub amount: Decimal,
    pub plan: PlanTier,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DepositRequest {
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub amount: Decimal,
    pub account_number: String,
    pub bank_name: String,
    pub routing_number: String,
}
