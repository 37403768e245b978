use sqlx::any::AnyRow;
use sqlx::{Any, AnyConnection, AnyPool, Row, Transaction};
use uuid::Uuid;

use super::model::{LedgerEntry, WithdrawalRequest};
use crate::account::model::{AccountId, PlanTier};
use crate::error::CustomError;
use crate::utils::{from_db_time, to_db_time};

pub struct LedgerRepository {
    pool: AnyPool,
}

fn parse_uuid(column: &str, value: &str) -> Result<Uuid, CustomError> {
    Uuid::parse_str(value).map_err(|_| CustomError::CorruptRecord(format!("{}: {}", column, value)))
}

impl LedgerRepository {
    pub fn new(pool: AnyPool) -> Self {
        LedgerRepository { pool }
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Any>, CustomError> {
        Ok(self.pool.begin().await?)
    }

    /// Append an entry. A reused reference is reported as
    /// [`CustomError::DuplicateReference`].
    pub async fn insert_entry(
        conn: &mut AnyConnection,
        entry: &LedgerEntry,
    ) -> Result<(), CustomError> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (id, sender_id, receiver_id, amount, kind, plan_tier, reason, reference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.sender_id.to_string())
        .bind(entry.receiver_id.to_string())
        .bind(entry.amount)
        .bind(entry.kind.as_str())
        .bind(entry.plan.map(|p| p.as_str()))
        .bind(&entry.reason)
        .bind(&entry.reference)
        .bind(to_db_time(&entry.created_at))
        .execute(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(err) if err.is_unique_violation() => {
                CustomError::DuplicateReference(entry.reference.clone())
            }
            e => CustomError::DBError(e),
        })?;
        Ok(())
    }

    pub async fn insert_withdrawal(
        conn: &mut AnyConnection,
        withdrawal: &WithdrawalRequest,
    ) -> Result<(), CustomError> {
        sqlx::query(
            r#"
            INSERT INTO withdrawals (id, account_id, amount, account_number, bank_name, routing_number, status, reference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(withdrawal.id.to_string())
        .bind(withdrawal.account_id.to_string())
        .bind(withdrawal.amount)
        .bind(&withdrawal.account_number)
        .bind(&withdrawal.bank_name)
        .bind(&withdrawal.routing_number)
        .bind(withdrawal.status.as_str())
        .bind(&withdrawal.reference)
        .bind(to_db_time(&withdrawal.created_at))
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Entries touching `account`, newest first, each with the name of the
    /// account on the other side.
    pub async fn entries_for(
        &self,
        account: AccountId,
    ) -> Result<Vec<(LedgerEntry, String, String)>, CustomError> {
        let rows = sqlx::query(
            r#"
            SELECT e.id, e.sender_id, e.receiver_id, e.amount, e.kind, e.plan_tier, e.reason,
                   e.reference, e.created_at, s.name AS sender_name, r.name AS receiver_name
            FROM ledger_entries e
            JOIN accounts s ON s.id = e.sender_id
            JOIN accounts r ON r.id = e.receiver_id
            WHERE e.sender_id = $1 OR e.receiver_id = $1
            ORDER BY e.created_at DESC, e.id DESC
            "#,
        )
        .bind(account.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<(LedgerEntry, String, String), CustomError> {
                Ok((
                    row_to_entry(row)?,
                    row.try_get("sender_name")?,
                    row.try_get("receiver_name")?,
                ))
            })
            .collect()
    }

    pub async fn withdrawals_for(
        &self,
        account: AccountId,
    ) -> Result<Vec<WithdrawalRequest>, CustomError> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, amount, account_number, bank_name, routing_number, status, reference, created_at
            FROM withdrawals
            WHERE account_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(account.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_withdrawal).collect()
    }
}

fn row_to_entry(row: &AnyRow) -> Result<LedgerEntry, CustomError> {
    let id: String = row.try_get("id")?;
    let sender_id: String = row.try_get("sender_id")?;
    let receiver_id: String = row.try_get("receiver_id")?;
    let kind: String = row.try_get("kind")?;
    let plan: Option<String> = row.try_get("plan_tier")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(LedgerEntry {
        id: parse_uuid("ledger_entries.id", &id)?,
        sender_id: parse_uuid("ledger_entries.sender_id", &sender_id)?,
        receiver_id: parse_uuid("ledger_entries.receiver_id", &receiver_id)?,
        amount: row.try_get("amount")?,
        kind: kind.parse()?,
        plan: plan.map(|p| p.parse::<PlanTier>()).transpose()?,
        reason: row.try_get("reason")?,
        reference: row.try_get("reference")?,
        created_at: from_db_time("ledger_entries.created_at", &created_at)?,
    })
}

fn row_to_withdrawal(row: &AnyRow) -> Result<WithdrawalRequest, CustomError> {
    let id: String = row.try_get("id")?;
    let account_id: String = row.try_get("account_id")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(WithdrawalRequest {
        id: parse_uuid("withdrawals.id", &id)?,
        account_id: parse_uuid("withdrawals.account_id", &account_id)?,
        amount: row.try_get("amount")?,
        account_number: row.try_get("account_number")?,
        bank_name: row.try_get("bank_name")?,
        routing_number: row.try_get("routing_number")?,
        status: status.parse()?,
        reference: row.try_get("reference")?,
        created_at: from_db_time("withdrawals.created_at", &created_at)?,
    })
}
