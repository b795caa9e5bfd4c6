//! End-to-end flows over the auth core, without the HTTP layer.

use atesto::auth::{AuthConfig, AuthError, AuthService};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn service() -> AuthService {
    service_with(&AuthConfig::new())
}

fn service_with(config: &AuthConfig) -> AuthService {
    let key = SecretString::from("integration-signing-key".to_string());
    AuthService::new(&key, config).expect("service")
}

#[tokio::test]
async fn register_login_revoke_lifecycle() {
    let service = service();

    let first = service
        .register("u@e.com", "Secret123")
        .await
        .expect("register");
    let second = service.login("u@e.com", "Secret123").await.expect("login");

    // Two distinct issuances may differ, but both name the same account.
    assert_eq!(service.verify_token(&first).expect("claims").email, "u@e.com");
    assert_eq!(
        service.verify_token(&second).expect("claims").email,
        "u@e.com"
    );

    service.revoke(&second).expect("revoke");
    assert_eq!(
        service.login("u@e.com", "Secret123").await,
        Err(AuthError::InvalidCredentials)
    );
}

#[tokio::test]
async fn unknown_identifier_reads_like_wrong_secret() {
    let service = service();
    service
        .register("known@e.com", "Secret123")
        .await
        .expect("register");

    let miss = service.login("ghost@e.com", "whatever").await;
    let mismatch = service.login("known@e.com", "whatever").await;
    assert_eq!(miss, mismatch);
}

#[tokio::test]
async fn second_registration_rejected_once_first_is_visible() {
    let service = service();
    service
        .register("u@e.com", "Secret123")
        .await
        .expect("register");

    for secret in ["Secret123", "Entirely-Different"] {
        assert_eq!(
            service.register("u@e.com", secret).await,
            Err(AuthError::AlreadyExists)
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_registrations_leave_one_record() {
    let service = Arc::new(service());

    let first = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.register("a@x.com", "p1").await })
    };
    let second = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.register("a@x.com", "p2").await })
    };

    let outcomes = [
        first.await.expect("task"),
        second.await.expect("task"),
    ];
    let wins = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|outcome| **outcome == Err(AuthError::AlreadyExists))
        .count();

    assert_eq!(wins, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(service.store().len(), 1);

    // Exactly one stored secret survived; it belongs to the winner.
    let winner_secret = if outcomes[0].is_ok() { "p1" } else { "p2" };
    assert!(service.login("a@x.com", winner_secret).await.is_ok());
}

#[tokio::test]
async fn expired_tokens_stop_verifying() {
    let service = service_with(&AuthConfig::new().with_token_lifetime(Duration::ZERO));
    let token = service
        .register("u@e.com", "Secret123")
        .await
        .expect("register");
    assert_eq!(service.verify_token(&token), Err(AuthError::ExpiredToken));
    assert_eq!(service.revoke(&token), Err(AuthError::ExpiredToken));
}

#[tokio::test]
async fn tampered_tokens_are_rejected() {
    let service = service();
    let token = service
        .register("u@e.com", "Secret123")
        .await
        .expect("register");

    let dot = token.rfind('.').expect("signature separator");
    let mut tampered = token.clone();
    tampered.replace_range(
        dot + 1..dot + 2,
        if &token[dot + 1..dot + 2] == "A" { "B" } else { "A" },
    );
    assert_eq!(
        service.verify_token(&tampered),
        Err(AuthError::InvalidToken)
    );
}

#[tokio::test]
async fn cached_failure_short_circuits_without_changing_outcome() {
    let service = service_with(&AuthConfig::new().with_cache_ttl(Duration::from_secs(60)));
    service
        .register("u@e.com", "Secret123")
        .await
        .expect("register");

    let baseline = service.passwords().comparisons();
    let first = service.login("u@e.com", "bad-guess").await;
    let second = service.login("u@e.com", "bad-guess").await;

    assert_eq!(first, Err(AuthError::InvalidCredentials));
    assert_eq!(second, first);
    assert_eq!(service.passwords().comparisons(), baseline + 1);

    // The right secret is a different candidate: real comparison, success.
    assert!(service.login("u@e.com", "Secret123").await.is_ok());
    assert_eq!(service.passwords().comparisons(), baseline + 2);
}

#[tokio::test]
async fn deferred_mode_is_eventually_consistent() {
    let config = AuthConfig::new()
        .with_deferred_hashing(true)
        .with_hash_workers(2);
    let service = service_with(&config);

    let token = service
        .register("late@e.com", "Secret123")
        .await
        .expect("register");
    assert!(service.verify_token(&token).is_ok());

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        match service.login("late@e.com", "Secret123").await {
            Ok(_) => break,
            Err(AuthError::InvalidCredentials) if Instant::now() < deadline => {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            Err(err) => panic!("deferred registration never surfaced: {err}"),
        }
    }
}

#[tokio::test]
async fn revoked_account_can_register_again() {
    let service = service();
    let token = service
        .register("u@e.com", "Secret123")
        .await
        .expect("register");
    service.revoke(&token).expect("revoke");

    // The identifier is free again; a new secret takes over cleanly.
    service
        .register("u@e.com", "Fresh456")
        .await
        .expect("re-register");
    assert!(service.login("u@e.com", "Fresh456").await.is_ok());
    assert_eq!(
        service.login("u@e.com", "Secret123").await,
        Err(AuthError::InvalidCredentials)
    );
}
