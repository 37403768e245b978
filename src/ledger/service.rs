use std::sync::Arc;

use sqlx::AnyPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::model::{
    DepositRequest, LedgerEntry, TransactionView, TransferRequest, WithdrawRequest,
    WithdrawalRequest, WithdrawalStatus,
};
use super::repository::LedgerRepository;
use crate::account::model::{Account, AccountId, InvestmentPlan};
use crate::account::repository::AccountRepository;
use crate::error::CustomError;
use crate::money::{Cents, from_cents, to_cents};
use crate::notify::{Notification, NotificationPublisher};
use crate::payment::PaymentVerifier;
use crate::utils::generate_reference;

fn ensure_funds(account: &Account, amount: Cents) -> Result<(), CustomError> {
    if account.balance <= 0 || amount > account.balance {
        return Err(CustomError::InsufficientFunds {
            balance: account.balance,
            required: amount,
        });
    }
    Ok(())
}

fn required_field(name: &str, value: &str) -> Result<(), CustomError> {
    if value.trim().is_empty() {
        return Err(CustomError::Validation(format!("{} is required", name)));
    }
    Ok(())
}

/// Balance-moving operations. Every operation writes its account updates and
/// its ledger entry in one database transaction and publishes a notification
/// only after the commit.
pub struct LedgerService {
    accounts: AccountRepository,
    ledger: LedgerRepository,
    verifier: Arc<dyn PaymentVerifier>,
    publisher: NotificationPublisher,
}

impl LedgerService {
    pub fn new(
        pool: AnyPool,
        verifier: Arc<dyn PaymentVerifier>,
        publisher: NotificationPublisher,
    ) -> Self {
        LedgerService {
            accounts: AccountRepository::new(pool.clone()),
            ledger: LedgerRepository::new(pool),
            verifier,
            publisher,
        }
    }

    /// Move `amount` from the sender to the receiver and put the receiver on
    /// the requested plan.
    pub async fn transfer(
        &self,
        sender_id: AccountId,
        request: &TransferRequest,
    ) -> Result<LedgerEntry, CustomError> {
        let amount = to_cents(request.amount)?;
        if sender_id == request.id {
            return Err(CustomError::SelfTransfer);
        }

        let sender = self.accounts.get(sender_id).await?;
        let receiver = self.accounts.get(request.id).await?;

        if sender.account_locked {
            return Err(CustomError::AccountLocked);
        }
        if !sender.is_allow {
            return Err(CustomError::SenderNotPermitted);
        }
        if !receiver.is_client {
            return Err(CustomError::ReceiverNotPermitted);
        }
        ensure_funds(&sender, amount)?;

        let entry = LedgerEntry::transfer(
            sender.id,
            receiver.id,
            amount,
            request.plan,
            generate_reference(),
        )?;
        let plan = InvestmentPlan::start(request.plan, entry.created_at);

        let mut tx = self.ledger.begin().await?;
        if !AccountRepository::debit(&mut tx, sender.id, amount).await? {
            tx.rollback().await?;
            let current = self.accounts.get(sender.id).await?;
            warn!(account = %sender.id, balance = current.balance, amount, "transfer lost a race for funds");
            return Err(CustomError::InsufficientFunds {
                balance: current.balance,
                required: amount,
            });
        }
        AccountRepository::credit(&mut tx, receiver.id, amount).await?;
        AccountRepository::assign_plan(&mut tx, receiver.id, &plan).await?;
        LedgerRepository::insert_entry(&mut tx, &entry).await?;
        tx.commit().await?;

        info!(
            reference = %entry.reference,
            sender = %sender.id,
            receiver = %receiver.id,
            amount = %from_cents(amount),
            plan = %request.plan,
            "transfer committed"
        );
        self.publisher.publish(Notification::TransferCompleted {
            reference: entry.reference.clone(),
            sender_email: sender.email,
            receiver_email: receiver.email,
            amount,
            plan: request.plan.to_string(),
        });
        Ok(entry)
    }

    /// Credit the caller. Client accounts are credited with what the payment
    /// provider confirms; internal accounts are credited with the requested
    /// amount as-is.
    pub async fn deposit(
        &self,
        account_id: AccountId,
        request: &DepositRequest,
    ) -> Result<LedgerEntry, CustomError> {
        let account = self.accounts.get(account_id).await?;
        if account.account_locked {
            return Err(CustomError::AccountLocked);
        }

        let (amount, reference) = if account.is_client {
            let transaction_id = request
                .transaction_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| CustomError::Validation("transaction_id is required".to_string()))?;
            let payment = self.verifier.verify(transaction_id).await?;
            (to_cents(payment.amount)?, payment.reference)
        } else {
            let amount = request
                .amount
                .ok_or_else(|| CustomError::Validation("amount is required".to_string()))?;
            let amount = to_cents(amount)?;
            warn!(account = %account.id, amount = %from_cents(amount), "crediting unverified internal deposit");
            (amount, generate_reference())
        };

        let entry = LedgerEntry::deposit(account.id, amount, reference)?;

        let mut tx = self.ledger.begin().await?;
        LedgerRepository::insert_entry(&mut tx, &entry).await?;
        AccountRepository::credit(&mut tx, account.id, amount).await?;
        tx.commit().await?;

        info!(reference = %entry.reference, account = %account.id, amount = %from_cents(amount), "deposit committed");
        self.publisher.publish(Notification::DepositCredited {
            reference: entry.reference.clone(),
            email: account.email,
            amount,
        });
        Ok(entry)
    }

    /// Take funds out of the caller's balance and queue a bank payout.
    pub async fn withdraw(
        &self,
        account_id: AccountId,
        request: &WithdrawRequest,
    ) -> Result<WithdrawalRequest, CustomError> {
        let amount = to_cents(request.amount)?;
        required_field("account_number", &request.account_number)?;
        required_field("bank_name", &request.bank_name)?;
        required_field("routing_number", &request.routing_number)?;

        let account = self.accounts.get(account_id).await?;
        if account.account_locked {
            return Err(CustomError::AccountLocked);
        }
        ensure_funds(&account, amount)?;

        let reference = generate_reference();
        let entry = LedgerEntry::withdrawal(account.id, amount, reference.clone())?;
        let withdrawal = WithdrawalRequest {
            id: Uuid::new_v4(),
            account_id: account.id,
            amount,
            account_number: request.account_number.trim().to_string(),
            bank_name: request.bank_name.trim().to_string(),
            routing_number: request.routing_number.trim().to_string(),
            status: WithdrawalStatus::Processing,
            reference,
            created_at: entry.created_at,
        };

        let mut tx = self.ledger.begin().await?;
        if !AccountRepository::debit(&mut tx, account.id, amount).await? {
            tx.rollback().await?;
            let current = self.accounts.get(account.id).await?;
            return Err(CustomError::InsufficientFunds {
                balance: current.balance,
                required: amount,
            });
        }
        LedgerRepository::insert_entry(&mut tx, &entry).await?;
        LedgerRepository::insert_withdrawal(&mut tx, &withdrawal).await?;
        tx.commit().await?;

        info!(reference = %withdrawal.reference, account = %account.id, amount = %from_cents(amount), "withdrawal queued");
        self.publisher.publish(Notification::WithdrawalRequested {
            reference: withdrawal.reference.clone(),
            email: account.email,
            amount,
        });
        Ok(withdrawal)
    }

    pub async fn transactions(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<TransactionView>, CustomError> {
        let entries = self.ledger.entries_for(account_id).await?;
        Ok(entries
            .into_iter()
            .filter_map(|(entry, sender_name, receiver_name)| {
                let direction = entry.direction_for(account_id)?;
                let counterparty = if entry.sender_id == account_id {
                    receiver_name
                } else {
                    sender_name
                };
                Some(TransactionView {
                    entry,
                    direction,
                    counterparty,
                })
            })
            .collect())
    }

    pub async fn withdrawals(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<WithdrawalRequest>, CustomError> {
        self.ledger.withdrawals_for(account_id).await
    }
}
