use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::oneshot;
use tracing::{error, info};

use tradevault::account::service::AccountService;
use tradevault::auth::jwt::JwtKeys;
use tradevault::auth::service::AuthService;
use tradevault::config::Config;
use tradevault::db::Database;
use tradevault::geo::HttpGeoLocator;
use tradevault::ledger::service::LedgerService;
use tradevault::notify::{LogNotifier, NotificationPublisher, NotifierRegistry, spawn_dispatcher};
use tradevault::payment::FlutterwaveVerifier;
use tradevault::server::{Server, Services};
use tradevault::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load config")?;
    logging::init(&config.log_format);

    let pool = Database::new_pool(&config.database_url)
        .await
        .context("Failed to create DB pool")?;
    Database::migrate(&pool).await.context("Failed to migrate")?;
    Database::log_pool_stats(&pool);

    let keys = JwtKeys::from_pem(
        &config.jwt_private_key,
        &config.jwt_public_key,
        config.token_ttl_secs,
    )
    .context("Failed to load JWT keys")?;

    let (publisher, notifications) = NotificationPublisher::channel();
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));
    let dispatcher = spawn_dispatcher(notifications, registry);

    let services = Arc::new(Services {
        auth: AuthService::new(
            pool.clone(),
            keys,
            Arc::new(HttpGeoLocator::new(config.geo_lookup_url.clone())),
            config.restricted_country.clone(),
        ),
        accounts: AccountService::new(pool.clone()),
        ledger: LedgerService::new(
            pool.clone(),
            Arc::new(FlutterwaveVerifier::new(
                config.payment_api_url.clone(),
                config.payment_secret_key.clone(),
            )),
            publisher,
        ),
        dev_routes: config.dev_routes,
        read_timeout: config.read_timeout,
    });

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
        }
        let _ = shutdown_tx.send(());
    });

    let server = Server::new(Arc::clone(&services), config.bind_addr.clone());
    server.start(shutdown_rx).await?;

    drop(server);
    drop(services);
    let _ = dispatcher.await;
    pool.close().await;
    info!("bye");
    Ok(())
}
