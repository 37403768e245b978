use sqlx::any::AnyRow;
use sqlx::{AnyConnection, AnyPool, Row};
use uuid::Uuid;

use super::model::{Account, AccountId, Address, InvestmentPlan, PlanTier};
use crate::error::CustomError;
use crate::money::Cents;
use crate::utils::{from_db_time, to_db_time};

const ACCOUNT_COLUMNS: &str = "id, name, email, phone, password, balance, version, plan_tier, \
    plan_ends_at, plan_profit_bps, wallet_address, is_client, is_allow, account_locked, \
    ip_address, house_address, city, state, created_at";

fn unique_violation(e: sqlx::Error) -> CustomError {
    match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            if err.message().contains("phone") {
                CustomError::PhoneExists
            } else {
                CustomError::EmailExists
            }
        }
        e => CustomError::DBError(e),
    }
}

pub struct AccountRepository {
    pool: AnyPool,
}

impl AccountRepository {
    pub fn new(pool: AnyPool) -> Self {
        AccountRepository { pool }
    }

    pub async fn insert(&self, account: &Account) -> Result<(), CustomError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, email, phone, password, balance, version,
                wallet_address, is_client, is_allow, account_locked, ip_address, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.phone)
        .bind(&account.password)
        .bind(account.balance)
        .bind(account.version)
        .bind(&account.wallet_address)
        .bind(account.is_client as i64)
        .bind(account.is_allow as i64)
        .bind(account.account_locked as i64)
        .bind(&account.ip_address)
        .bind(to_db_time(&account.created_at))
        .execute(&self.pool)
        .await
        .map_err(unique_violation)?;
        Ok(())
    }

    async fn find_one(&self, column: &str, value: String) -> Result<Option<Account>, CustomError> {
        let sql = format!("SELECT {} FROM accounts WHERE {} = $1", ACCOUNT_COLUMNS, column);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_account).transpose()
    }

    pub async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, CustomError> {
        self.find_one("id", id.to_string()).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>, CustomError> {
        self.find_one("email", email.to_string()).await
    }

    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<Account>, CustomError> {
        self.find_one("phone", phone.to_string()).await
    }

    pub async fn find_by_wallet(&self, wallet: &str) -> Result<Option<Account>, CustomError> {
        self.find_one("wallet_address", wallet.to_string()).await
    }

    /// Fetch an account that must exist.
    pub async fn get(&self, id: AccountId) -> Result<Account, CustomError> {
        self.find_by_id(id).await?.ok_or(CustomError::UserNotFound)
    }

    pub async fn update_contact(
        &self,
        id: AccountId,
        name: &str,
        email: &str,
        phone: Option<&str>,
    ) -> Result<(), CustomError> {
        let result = sqlx::query("UPDATE accounts SET name = $1, email = $2, phone = $3 WHERE id = $4")
            .bind(name)
            .bind(email)
            .bind(phone)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(unique_violation)?;
        if result.rows_affected() == 0 {
            return Err(CustomError::UserNotFound);
        }
        Ok(())
    }

    /// Subtract `amount` only when the balance covers it. Returns `false`
    /// when the row was left untouched.
    pub async fn debit(
        conn: &mut AnyConnection,
        id: AccountId,
        amount: Cents,
    ) -> Result<bool, CustomError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = balance - $1, version = version + 1
            WHERE id = $2 AND balance >= $1 AND balance > 0
            "#,
        )
        .bind(amount)
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn credit(
        conn: &mut AnyConnection,
        id: AccountId,
        amount: Cents,
    ) -> Result<(), CustomError> {
        let result = sqlx::query(
            "UPDATE accounts SET balance = balance + $1, version = version + 1 WHERE id = $2",
        )
        .bind(amount)
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CustomError::UserNotFound);
        }
        Ok(())
    }

    pub async fn assign_plan(
        conn: &mut AnyConnection,
        id: AccountId,
        plan: &InvestmentPlan,
    ) -> Result<(), CustomError> {
        sqlx::query(
            "UPDATE accounts SET plan_tier = $1, plan_ends_at = $2, plan_profit_bps = $3 WHERE id = $4",
        )
        .bind(plan.tier.as_str())
        .bind(to_db_time(&plan.ends_at))
        .bind(plan.profit_bps)
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

fn row_to_account(row: &AnyRow) -> Result<Account, CustomError> {
    let id: String = row.try_get("id")?;
    let created_at: String = row.try_get("created_at")?;
    let plan_tier: Option<String> = row.try_get("plan_tier")?;
    let plan_ends_at: Option<String> = row.try_get("plan_ends_at")?;
    let plan_profit_bps: Option<i64> = row.try_get("plan_profit_bps")?;

    let investment_plan = match (plan_tier, plan_ends_at, plan_profit_bps) {
        (Some(tier), Some(ends_at), Some(profit_bps)) => Some(InvestmentPlan {
            tier: tier.parse::<PlanTier>()?,
            ends_at: from_db_time("plan_ends_at", &ends_at)?,
            profit_bps,
        }),
        _ => None,
    };

    Ok(Account {
        id: Uuid::parse_str(&id).map_err(|_| CustomError::CorruptRecord(format!("id: {}", id)))?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        password: row.try_get("password")?,
        balance: row.try_get("balance")?,
        version: row.try_get("version")?,
        investment_plan,
        wallet_address: row.try_get("wallet_address")?,
        is_client: row.try_get::<i64, _>("is_client")? != 0,
        is_allow: row.try_get::<i64, _>("is_allow")? != 0,
        account_locked: row.try_get::<i64, _>("account_locked")? != 0,
        ip_address: row.try_get("ip_address")?,
        address: Address {
            house_address: row.try_get("house_address")?,
            city: row.try_get("city")?,
            state: row.try_get("state")?,
        },
        created_at: from_db_time("created_at", &created_at)?,
    })
}
