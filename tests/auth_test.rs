use common::{CLIENT_IP, PASSWORD, RESTRICTED_IP, TRUSTED_RESTRICTED_IP, TestApp};
use tradevault::account::model::{RecipientRequest, UpdateUserRequest};
use tradevault::auth::model::{LoginRequest, RegisterRequest};
use tradevault::constants::WALLET_ADDRESS_LEN;
use tradevault::error::CustomError;
use tradevault::geo::TrustedIp;
mod common;

fn registration(email: &str, ip: &str) -> RegisterRequest {
    RegisterRequest {
        name: "Ada Lovelace".to_string(),
        email: email.to_string(),
        password: PASSWORD.to_string(),
        phone: Some("+447700900123".to_string()),
        ip: ip.to_string(),
    }
}

fn login_with_email(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: Some(email.to_string()),
        phone: None,
        password: password.to_string(),
    }
}

#[tokio::test]
async fn register_client_returns_token_and_user() {
    let app = TestApp::new().await;

    let response = app
        .services
        .auth
        .register(&registration("Ada@Example.com", CLIENT_IP))
        .await
        .expect("registration succeeds");

    assert_eq!(response.user.email, "ada@example.com");
    assert!(response.user.is_client);
    assert_eq!(response.user.wallet_address.len(), WALLET_ADDRESS_LEN);
    assert_eq!(app.keys.verify_jwt(&response.token).unwrap(), response.user.id);

    let stored = app.accounts().get(response.user.id).await.unwrap();
    assert_eq!(stored.balance, 0);
    assert!(!stored.is_allow);
    assert_ne!(stored.password, PASSWORD);
    assert_eq!(stored.ip_address.as_deref(), Some(CLIENT_IP));
}

#[tokio::test]
async fn register_rejects_duplicates() {
    let app = TestApp::new().await;
    app.services
        .auth
        .register(&registration("ada@example.com", CLIENT_IP))
        .await
        .unwrap();

    let err = app
        .services
        .auth
        .register(&registration("ada@example.com", CLIENT_IP))
        .await
        .unwrap_err();
    assert!(matches!(err, CustomError::EmailExists));

    let err = app
        .services
        .auth
        .register(&registration("other@example.com", CLIENT_IP))
        .await
        .unwrap_err();
    assert!(matches!(err, CustomError::PhoneExists));
}

#[tokio::test]
async fn restricted_country_requires_trusted_ip() {
    let app = TestApp::new().await;

    let err = app
        .services
        .auth
        .register(&registration("desk@example.com", RESTRICTED_IP))
        .await
        .unwrap_err();
    assert!(matches!(err, CustomError::Forbidden));
    assert!(app.accounts().find_by_email("desk@example.com").await.unwrap().is_none());

    // Stored trimmed, so the padded entry matches the bare address.
    let padded = TrustedIp {
        name: "office".to_string(),
        ip: format!(" {}\n", TRUSTED_RESTRICTED_IP),
    };
    app.services.auth.add_trusted_ip(&padded).await.unwrap();
    let trusted = TrustedIp {
        name: "office".to_string(),
        ip: TRUSTED_RESTRICTED_IP.to_string(),
    };
    let err = app.services.auth.add_trusted_ip(&trusted).await.unwrap_err();
    assert!(matches!(err, CustomError::IpExists));

    let response = app
        .services
        .auth
        .register(&registration("desk@example.com", TRUSTED_RESTRICTED_IP))
        .await
        .expect("trusted address may register");
    assert!(!response.user.is_client);
    let stored = app.accounts().get(response.user.id).await.unwrap();
    assert!(stored.is_allow);
}

#[tokio::test]
async fn register_fails_when_location_is_unknown() {
    let app = TestApp::new().await;

    for ip in ["0.0.0.0", "192.0.2.1"] {
        let err = app
            .services
            .auth
            .register(&registration("ada@example.com", ip))
            .await
            .unwrap_err();
        assert!(matches!(err, CustomError::GeoLookup(_)), "{:?}", err);
    }
}

#[tokio::test]
async fn login_checks_credentials() {
    let app = TestApp::new().await;
    let account = app.seed_account("Ada Client", true, 0).await;

    let response = app
        .services
        .auth
        .login(&login_with_email(&account.email.to_uppercase(), PASSWORD))
        .await
        .expect("login succeeds");
    assert_eq!(response.user.id, account.id);
    assert_eq!(app.keys.verify_jwt(&response.token).unwrap(), account.id);

    let err = app
        .services
        .auth
        .login(&login_with_email(&account.email, "wrong password"))
        .await
        .unwrap_err();
    assert!(matches!(err, CustomError::InvalidCredentials));

    let err = app
        .services
        .auth
        .login(&login_with_email("nobody@example.com", PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, CustomError::InvalidCredentials));

    let err = app
        .services
        .auth
        .login(&LoginRequest {
            email: None,
            phone: None,
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CustomError::Validation(_)));
}

#[tokio::test]
async fn login_by_phone_and_locked_accounts() {
    let app = TestApp::new().await;
    let registered = app
        .services
        .auth
        .register(&registration("ada@example.com", CLIENT_IP))
        .await
        .unwrap();

    let by_phone = LoginRequest {
        email: None,
        phone: Some("+447700900123".to_string()),
        password: PASSWORD.to_string(),
    };
    let response = app.services.auth.login(&by_phone).await.unwrap();
    assert_eq!(response.user.id, registered.user.id);

    app.lock_account(registered.user.id).await;
    let err = app.services.auth.login(&by_phone).await.unwrap_err();
    assert!(matches!(err, CustomError::AccountLocked));
}

#[tokio::test]
async fn recipient_lookup_by_wallet() {
    let app = TestApp::new().await;
    let me = app.seed_account("Desk Sender", false, 0).await;
    let other = app.seed_account("Ada Client", true, 0).await;

    let found = app
        .services
        .accounts
        .recipient(me.id, &other.wallet_address)
        .await
        .unwrap();
    assert_eq!(found.id, other.id);
    assert_eq!(found.user, "Ada Client");

    let err = app
        .services
        .accounts
        .recipient(me.id, &me.wallet_address)
        .await
        .unwrap_err();
    assert!(matches!(err, CustomError::SelfTransfer));

    let unknown = RecipientRequest {
        wallet: "not-a-wallet".to_string(),
    };
    let err = app
        .services
        .accounts
        .recipient(me.id, &unknown.wallet)
        .await
        .unwrap_err();
    assert!(matches!(err, CustomError::WalletNotFound));
}

#[tokio::test]
async fn update_user_changes_only_given_fields() {
    let app = TestApp::new().await;
    let me = app.seed_account("Ada Client", true, 0).await;
    let other = app.seed_account("Bob Client", true, 0).await;

    app.services
        .accounts
        .update(
            me.id,
            &UpdateUserRequest {
                name: Some("Ada King".to_string()),
                email: Some(String::new()),
                phone: None,
            },
        )
        .await
        .unwrap();
    let stored = app.accounts().get(me.id).await.unwrap();
    assert_eq!(stored.name, "Ada King");
    assert_eq!(stored.email, me.email);

    let err = app
        .services
        .accounts
        .update(
            me.id,
            &UpdateUserRequest {
                email: Some(other.email.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CustomError::EmailExists));

    let err = app
        .services
        .accounts
        .update(me.id, &UpdateUserRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CustomError::Validation(_)));

    let profile = app.services.accounts.profile(me.id).await.unwrap();
    assert_eq!(profile.name, "Ada");
    assert_eq!(profile.account_balance, 0);
}
