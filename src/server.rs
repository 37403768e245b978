use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot::Receiver;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::account::model::{RecipientRequest, UpdateUserRequest};
use crate::account::service::AccountService;
use crate::auth::model::{LoginRequest, RegisterRequest};
use crate::auth::service::AuthService;
use crate::constants::{BAD_REQUEST, NOT_FOUND, REQUEST_TIMEOUT};
use crate::error::CustomError;
use crate::geo::TrustedIp;
use crate::ledger::model::{DepositRequest, TransferRequest, WithdrawRequest};
use crate::ledger::service::LedgerService;
use crate::req::Method::{GET, POST, PUT};
use crate::req::Request;
use crate::res::{Response, respond};
use crate::utils::{des_from_str, message};

/// Everything a request handler needs.
pub struct Services {
    pub auth: AuthService,
    pub accounts: AccountService,
    pub ledger: LedgerService,
    pub dev_routes: bool,
    /// Deadline for reading one request; also the shutdown grace period.
    pub read_timeout: Duration,
}

impl Services {
    pub async fn route(&self, request: &Request) -> Response {
        match (request.method, request.path.as_str()) {
            (POST, "/register") => respond(self.register(request).await),
            (POST, "/login") => respond(self.login(request).await),
            (GET, "/validate") => respond(
                self.auth
                    .authenticate(request)
                    .map(|id| json!({ "id": id })),
            ),
            (GET, "/") => respond(self.profile(request).await),
            (POST, "/recipient") => respond(self.recipient(request).await),
            (PUT, "/update-user") => respond(self.update_user(request).await),
            (PUT, "/transfer") => respond(self.transfer(request).await),
            (POST, "/deposit") => respond(self.deposit(request).await),
            (POST, "/withdraw") => respond(self.withdraw(request).await),
            (GET, "/transactions") => respond(self.transactions(request).await),
            (GET, "/withdrawals") => respond(self.withdrawals(request).await),
            (POST, "/add-ip") if self.dev_routes => respond(self.add_ip(request).await),
            _ => (NOT_FOUND.to_string(), message("404 Not Found")),
        }
    }

    async fn register(&self, request: &Request) -> Result<serde_json::Value, CustomError> {
        let body: RegisterRequest = des_from_str(&request.body)?;
        let response = self.auth.register(&body).await?;
        Ok(json!(response))
    }

    async fn login(&self, request: &Request) -> Result<serde_json::Value, CustomError> {
        let body: LoginRequest = des_from_str(&request.body)?;
        let response = self.auth.login(&body).await?;
        Ok(json!(response))
    }

    async fn profile(&self, request: &Request) -> Result<serde_json::Value, CustomError> {
        let id = self.auth.authenticate(request)?;
        let profile = self.accounts.profile(id).await?;
        Ok(json!({ "user": profile }))
    }

    async fn recipient(&self, request: &Request) -> Result<serde_json::Value, CustomError> {
        let id = self.auth.authenticate(request)?;
        let body: RecipientRequest = des_from_str(&request.body)?;
        let recipient = self.accounts.recipient(id, &body.wallet).await?;
        Ok(json!(recipient))
    }

    async fn update_user(&self, request: &Request) -> Result<serde_json::Value, CustomError> {
        let id = self.auth.authenticate(request)?;
        let body: UpdateUserRequest = des_from_str(&request.body)?;
        self.accounts.update(id, &body).await?;
        Ok(json!({ "message": "Saved Successfully" }))
    }

    async fn transfer(&self, request: &Request) -> Result<serde_json::Value, CustomError> {
        let id = self.auth.authenticate(request)?;
        let body: TransferRequest = des_from_str(&request.body)?;
        let entry = self.ledger.transfer(id, &body).await?;
        Ok(json!({ "message": "success", "entry": entry }))
    }

    async fn deposit(&self, request: &Request) -> Result<serde_json::Value, CustomError> {
        let id = self.auth.authenticate(request)?;
        let body: DepositRequest = des_from_str(&request.body)?;
        let entry = self.ledger.deposit(id, &body).await?;
        Ok(json!({ "message": "Success", "entry": entry }))
    }

    async fn withdraw(&self, request: &Request) -> Result<serde_json::Value, CustomError> {
        let id = self.auth.authenticate(request)?;
        let body: WithdrawRequest = des_from_str(&request.body)?;
        let withdrawal = self.ledger.withdraw(id, &body).await?;
        Ok(json!({ "message": "Processing", "withdrawal": withdrawal }))
    }

    async fn transactions(&self, request: &Request) -> Result<serde_json::Value, CustomError> {
        let id = self.auth.authenticate(request)?;
        let transactions = self.ledger.transactions(id).await?;
        Ok(json!({ "transactions": transactions }))
    }

    async fn withdrawals(&self, request: &Request) -> Result<serde_json::Value, CustomError> {
        let id = self.auth.authenticate(request)?;
        let withdrawals = self.ledger.withdrawals(id).await?;
        Ok(json!({ "withdrawals": withdrawals }))
    }

    async fn add_ip(&self, request: &Request) -> Result<serde_json::Value, CustomError> {
        let body: TrustedIp = des_from_str(&request.body)?;
        self.auth.add_trusted_ip(&body).await?;
        Ok(json!({ "message": "IP Added Successfully" }))
    }
}

pub struct Server {
    services: Arc<Services>,
    bind_addr: String,
}

impl Server {
    pub fn new(services: Arc<Services>, bind_addr: String) -> Self {
        Self {
            services,
            bind_addr,
        }
    }

    pub async fn start(&self, mut shutdown_rx: Receiver<()>) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.bind_addr)
            .await
            .with_context(|| format!("failed to bind {}", self.bind_addr))?;
        info!("Server running on http://{}", self.bind_addr);

        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                conn = listener.accept() => {
                    let (mut stream, peer) = match conn {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "unable to accept connection");
                            continue;
                        }
                    };

                    let services = Arc::clone(&self.services);

                    connections.spawn(async move {
                        let (reader, writer) = stream.split();
                        if let Err(e) = Self::handle_client(reader, writer, &services).await {
                            error!(peer = %peer, error = ?e, "Connection error");
                        }
                    });
                }
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "connection task failed");
                    }
                }
                // Shutdown signal check
                _ = &mut shutdown_rx => {
                    info!("Shutting down server...");
                    break;
                }
            }
        }

        // Open connections hold the services; let them finish, then cut them off.
        let grace = self.services.read_timeout;
        let drained = timeout(grace, async {
            while connections.join_next().await.is_some() {}
        })
        .await
        .is_ok();
        if !drained {
            warn!(open = connections.len(), "aborting connections after shutdown grace");
            connections.shutdown().await;
        }
        Ok(())
    }

    pub async fn handle_client<Reader, Writer>(
        reader: Reader,
        mut writer: Writer,
        services: &Services,
    ) -> Result<()>
    where
        Reader: AsyncRead + Unpin,
        Writer: AsyncWrite + Unpin,
    {
        let read = timeout(services.read_timeout, Request::new(reader)).await;
        let (status_line, content) = match read {
            Ok(Ok(request)) => {
                debug!(method = ?request.method, path = %request.path, "request");
                services.route(&request).await
            }
            Ok(Err(e)) => {
                debug!(error = %e, "malformed request");
                (BAD_REQUEST.to_string(), message("Bad Request"))
            }
            Err(_) => {
                debug!(timeout = ?services.read_timeout, "request read timed out");
                (REQUEST_TIMEOUT.to_string(), message("Request Timeout"))
            }
        };

        writer
            .write_all(format!("{}{}", status_line, content).as_bytes())
            .await
            .context("Failed to write")?;
        writer.flush().await.context("Failed to flush")
    }
}
