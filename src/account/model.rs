use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CustomError;
use crate::money::{Cents, serialize_cents};
use crate::utils::now;

pub type AccountId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Bronze,
    Silver,
    Gold,
    Diamond,
}

/// Fixed terms attached to a plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanTerms {
    /// Profit rate in basis points (1/100 of a percent).
    pub profit_bps: i64,
    pub duration_hours: i64,
}

impl PlanTier {
    pub const ALL: [PlanTier; 4] = [
        PlanTier::Bronze,
        PlanTier::Silver,
        PlanTier::Gold,
        PlanTier::Diamond,
    ];

    pub fn terms(&self) -> PlanTerms {
        match self {
            PlanTier::Bronze => PlanTerms {
                profit_bps: 450,
                duration_hours: 8,
            },
            PlanTier::Silver => PlanTerms {
                profit_bps: 500,
                duration_hours: 24,
            },
            PlanTier::Gold => PlanTerms {
                profit_bps: 650,
                duration_hours: 48,
            },
            PlanTier::Diamond => PlanTerms {
                profit_bps: 700,
                duration_hours: 72,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Bronze => "bronze",
            PlanTier::Silver => "silver",
            PlanTier::Gold => "gold",
            PlanTier::Diamond => "diamond",
        }
    }
}

impl FromStr for PlanTier {
    type Err = CustomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        PlanTier::ALL
            .into_iter()
            .find(|tier| tier.as_str() == wanted)
            .ok_or_else(|| CustomError::CorruptRecord(format!("plan_tier: {}", s)))
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestmentPlan {
    pub tier: PlanTier,
    pub ends_at: DateTime<Utc>,
    pub profit_bps: i64,
}

impl InvestmentPlan {
    /// Plan starting at `now`, with rate and maturity taken from the tier.
    pub fn start(tier: PlanTier, now: DateTime<Utc>) -> Self {
        let terms = tier.terms();
        Self {
            tier,
            ends_at: now + Duration::hours(terms.duration_hours),
            profit_bps: terms.profit_bps,
        }
    }

    /// Profit rate as a fraction, e.g. `0.045` for bronze.
    pub fn profit_rate(&self) -> Decimal {
        Decimal::new(self.profit_bps, 4).normalize()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub house_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub balance: Cents,
    pub version: i64,
    pub investment_plan: Option<InvestmentPlan>,
    pub wallet_address: String,
    pub is_client: bool,
    pub is_allow: bool,
    pub account_locked: bool,
    pub ip_address: Option<String>,
    pub address: Address,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// New account with a zero balance. Internal (non-client) accounts are
    /// the ones allowed to send transfers.
    pub fn new(
        name: String,
        email: String,
        phone: Option<String>,
        password_hash: String,
        wallet_address: String,
        is_client: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            phone,
            password: password_hash,
            balance: 0,
            version: 0,
            investment_plan: None,
            wallet_address,
            is_client,
            is_allow: !is_client,
            account_locked: false,
            ip_address: None,
            address: Address::default(),
            created_at: now(),
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("")
    }
}

/// Account fields returned next to a token.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub wallet_address: String,
    pub is_client: bool,
}

impl From<&Account> for PublicUser {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            wallet_address: account.wallet_address.clone(),
            is_client: account.is_client,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(serialize_with = "serialize_cents")]
    pub account_balance: Cents,
    pub address: Address,
    pub wallet_address: String,
    pub is_client: bool,
    pub investment_plan: Option<PlanSummary>,
}

#[derive(Debug, Serialize)]
pub struct PlanSummary {
    pub tier: PlanTier,
    pub ends_at: DateTime<Utc>,
    pub profit_rate: Decimal,
}

impl From<&InvestmentPlan> for PlanSummary {
    fn from(plan: &InvestmentPlan) -> Self {
        Self {
            tier: plan.tier,
            ends_at: plan.ends_at,
            profit_rate: plan.profit_rate(),
        }
    }
}

impl From<&Account> for Profile {
    fn from(account: &Account) -> Self {
        Self {
            name: account.first_name().to_string(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            account_balance: account.balance,
            address: account.address.clone(),
            wallet_address: account.wallet_address.clone(),
            is_client: account.is_client,
            investment_plan: account.investment_plan.as_ref().map(PlanSummary::from),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecipientRequest {
    pub wallet: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Recipient {
    pub id: AccountId,
    pub user: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_table() {
        assert_eq!(PlanTier::Bronze.terms().profit_bps, 450);
        assert_eq!(PlanTier::Silver.terms().duration_hours, 24);
        assert_eq!(PlanTier::Gold.terms().profit_bps, 650);
        assert_eq!(PlanTier::Diamond.terms().duration_hours, 72);
    }

    #[test]
    fn plan_tier_parses_case_insensitive() {
        for tier in PlanTier::ALL {
            assert_eq!(tier.as_str().parse::<PlanTier>().unwrap(), tier);
        }
        assert_eq!("GOLD".parse::<PlanTier>().unwrap(), PlanTier::Gold);
        assert!("platinum".parse::<PlanTier>().is_err());
    }

    #[test]
    fn plan_end_date_follows_tier_duration() {
        let now = Utc::now();
        let plan = InvestmentPlan::start(PlanTier::Bronze, now);
        assert_eq!(plan.ends_at - now, Duration::hours(8));
        assert_eq!(plan.profit_rate(), Decimal::new(45, 3));
    }

    #[test]
    fn client_accounts_cannot_send_by_default() {
        let client = Account::new(
            "Ada Lovelace".into(),
            "ada@example.com".into(),
            None,
            "hash".into(),
            "wallet".into(),
            true,
        );
        assert!(!client.is_allow);
        assert_eq!(client.first_name(), "Ada");
        assert_eq!(client.balance, 0);

        let staff = Account::new(
            "Desk".into(),
            "desk@example.com".into(),
            None,
            "hash".into(),
            "wallet2".into(),
            false,
        );
        assert!(staff.is_allow);
    }
}
