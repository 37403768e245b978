#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use sqlx::{AnyPool, Row, any::install_default_drivers};
use tokio::sync::mpsc::UnboundedReceiver;

use tradevault::account::model::{Account, AccountId};
use tradevault::account::repository::AccountRepository;
use tradevault::account::service::AccountService;
use tradevault::auth::jwt::JwtKeys;
use tradevault::auth::service::AuthService;
use tradevault::constants::READ_TIMEOUT;
use tradevault::db::Database;
use tradevault::error::CustomError;
use tradevault::geo::GeoLocator;
use tradevault::ledger::model::LedgerEntry;
use tradevault::ledger::service::LedgerService;
use tradevault::notify::{Notification, NotificationPublisher};
use tradevault::payment::{PaymentVerifier, VerifiedPayment};
use tradevault::server::Services;
use tradevault::utils::{encrypt, generate_wallet_address};

pub const PASSWORD: &str = "password1";
pub const RESTRICTED_IP: &str = "41.58.0.1";
pub const TRUSTED_RESTRICTED_IP: &str = "41.58.0.2";
pub const CLIENT_IP: &str = "81.2.69.142";

const PRIVATE_PEM: &str = include_str!("../fixtures/jwt_private.pem");
const PUBLIC_PEM: &str = include_str!("../fixtures/jwt_public.pem");

pub async fn setup_test_db() -> AnyPool {
    install_default_drivers();
    let timestamp: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(7)
        .map(char::from)
        .collect();
    let db_name = format!("test_{}", timestamp);
    let database_url = format!("sqlite:file:{}?mode=memory&cache=shared", db_name);

    // Create the pool (which will internally use shared memory DB)
    let pool = AnyPool::connect(&database_url)
        .await
        .expect("Failed to create in-memory SQLite DB");

    Database::migrate(&pool)
        .await
        .expect("Failed to create test tables");

    pool
}

pub async fn count_entries(pool: &AnyPool) -> i64 {
    sqlx::query("SELECT COUNT(*) AS n FROM ledger_entries")
        .fetch_one(pool)
        .await
        .expect("count ledger entries")
        .try_get("n")
        .expect("count column")
}

pub fn test_keys() -> JwtKeys {
    JwtKeys::from_pem(PRIVATE_PEM, PUBLIC_PEM, 3600).expect("fixture keys")
}

pub fn password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| encrypt(PASSWORD).expect("hash"))
}

/// Payments known to the fake provider, keyed by transaction id.
#[derive(Default)]
pub struct StubVerifier {
    pub payments: HashMap<String, VerifiedPayment>,
}

#[async_trait]
impl PaymentVerifier for StubVerifier {
    async fn verify(&self, transaction_id: &str) -> Result<VerifiedPayment, CustomError> {
        self.payments
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| CustomError::PaymentVerification(transaction_id.to_string()))
    }
}

pub struct StubGeo;

#[async_trait]
impl GeoLocator for StubGeo {
    async fn country(&self, ip: &str) -> Result<Option<String>, CustomError> {
        match ip {
            RESTRICTED_IP | TRUSTED_RESTRICTED_IP => Ok(Some("Nigeria".to_string())),
            CLIENT_IP => Ok(Some("United Kingdom".to_string())),
            "0.0.0.0" => Ok(None),
            _ => Err(CustomError::GeoLookup("lookup service unavailable".to_string())),
        }
    }
}

pub fn stub_verifier() -> StubVerifier {
    let mut payments = HashMap::new();
    payments.insert(
        "1001".to_string(),
        VerifiedPayment {
            amount: Decimal::new(2500, 2),
            reference: "FLW-TX-1001".to_string(),
        },
    );
    payments.insert(
        "1002".to_string(),
        VerifiedPayment {
            amount: Decimal::new(1000, 2),
            reference: "FLW-TX-1001".to_string(),
        },
    );
    StubVerifier { payments }
}

pub struct TestApp {
    pub pool: AnyPool,
    pub services: Services,
    pub notifications: UnboundedReceiver<Notification>,
    pub keys: JwtKeys,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_dev_routes(false).await
    }

    pub async fn with_dev_routes(dev_routes: bool) -> Self {
        let pool = setup_test_db().await;
        let (publisher, notifications) = NotificationPublisher::channel();
        let services = Services {
            auth: AuthService::new(
                pool.clone(),
                test_keys(),
                Arc::new(StubGeo),
                "nigeria".to_string(),
            ),
            accounts: AccountService::new(pool.clone()),
            ledger: LedgerService::new(pool.clone(), Arc::new(stub_verifier()), publisher),
            dev_routes,
            read_timeout: READ_TIMEOUT,
        };
        TestApp {
            pool,
            services,
            notifications,
            keys: test_keys(),
        }
    }

    pub fn accounts(&self) -> AccountRepository {
        AccountRepository::new(self.pool.clone())
    }

    /// Insert an account directly, bypassing registration.
    pub async fn seed_account(&self, name: &str, is_client: bool, balance: i64) -> Account {
        let email = format!(
            "{}.{}@example.com",
            name.to_lowercase().replace(' ', "."),
            rand::thread_rng().gen_range(0..1_000_000)
        );
        let mut account = Account::new(
            name.to_string(),
            email,
            None,
            password_hash().to_string(),
            generate_wallet_address(),
            is_client,
        );
        account.balance = balance;
        self.accounts()
            .insert(&account)
            .await
            .expect("Failed to insert test account");
        account
    }

    pub async fn balance(&self, account: &Account) -> i64 {
        self.accounts()
            .get(account.id)
            .await
            .expect("account exists")
            .balance
    }

    pub async fn entry_count(&self) -> i64 {
        count_entries(&self.pool).await
    }

    /// Entry with `reference` as seen in `account`'s history.
    pub async fn find_entry(&self, account: AccountId, reference: &str) -> Option<LedgerEntry> {
        self.services
            .ledger
            .transactions(account)
            .await
            .expect("transactions")
            .into_iter()
            .map(|view| view.entry)
            .find(|entry| entry.reference == reference)
    }

    pub async fn lock_account(&self, id: AccountId) {
        sqlx::query("UPDATE accounts SET account_locked = 1 WHERE id = $1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .expect("lock account");
    }

    pub fn token(&self, account: &Account) -> String {
        self.keys.create_jwt(account.id).expect("token")
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        let mut events = Vec::new();
        while let Ok(event) = self.notifications.try_recv() {
            events.push(event);
        }
        events
    }
}
