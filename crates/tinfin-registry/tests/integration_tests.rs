//! Integration tests for tinfin-registry

use std::sync::Arc;

use tempfile::tempdir;
use time::{Duration, OffsetDateTime};
use tinfin::{
    Catalog, ResourceMeta, RevocationState, RevocationStore, SigningSecret, TokenCodec, TokenError,
    Verifier,
};
use tinfin_registry::storage::{FileSystemStorage, MemoryStore};
use tinfin_registry::*;

async fn sqlite_store(dir: &tempfile::TempDir) -> Arc<SqliteStorage> {
    let db_path = format!("sqlite:{}/test.db", dir.path().display());
    Arc::new(SqliteStorage::new(&db_path).await.unwrap())
}

fn codec() -> TokenCodec {
    TokenCodec::new(&SigningSecret::new("integration-secret").unwrap()).unwrap()
}

fn payment(id: &str, user_id: &str, status: PaymentStatus) -> PaymentRecord {
    PaymentRecord {
        id: id.to_string(),
        user_id: user_id.to_string(),
        status,
        amount: 4900,
        currency: "usd".to_string(),
        created_at: OffsetDateTime::now_utc(),
    }
}

fn record(user_id: &str, jti: &str, now: OffsetDateTime) -> TokenRecord {
    TokenRecord::new(user_id, DEFAULT_TOKEN_NAME, jti, "sha256:00", now, now + Duration::days(30))
}

#[tokio::test]
async fn test_sqlite_single_active_token() {
    let dir = tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    let now = OffsetDateTime::now_utc();

    store.insert_if_no_active(&record("u1", "a", now), now).await.unwrap();
    assert!(matches!(
        store.insert_if_no_active(&record("u1", "b", now), now).await,
        Err(RegistryError::ActiveTokenExists(_))
    ));

    // A different user is independent
    store.insert_if_no_active(&record("u2", "c", now), now).await.unwrap();

    // Once the first token has expired a new one may be issued
    let later = now + Duration::days(31);
    store.insert_if_no_active(&record("u1", "b", later), later).await.unwrap();
}

#[tokio::test]
async fn test_sqlite_concurrent_issuance_admits_one() {
    let dir = tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    let now = OffsetDateTime::now_utc();

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .insert_if_no_active(&record("u1", &format!("jti-{}", i), now), now)
                .await
        }));
    }

    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            inserted += 1;
        }
    }

    assert_eq!(inserted, 1);
    assert_eq!(store.list_unrevoked("u1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_sqlite_revocation_states() {
    let dir = tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    let now = OffsetDateTime::now_utc();
    let token = record("u1", "a", now);
    store.insert_if_no_active(&token, now).await.unwrap();

    assert_eq!(store.revocation_state("a").await.unwrap(), RevocationState::Active);
    assert_eq!(store.revocation_state("x").await.unwrap(), RevocationState::Unknown);

    // Revocation is scoped to the owner
    assert!(matches!(
        store.revoke_by_jti("u2", "a").await,
        Err(RegistryError::TokenNotFound(_))
    ));

    store.revoke_by_id("u1", &token.id).await.unwrap();
    store.revoke_by_jti("u1", "a").await.unwrap();
    assert_eq!(store.revocation_state("a").await.unwrap(), RevocationState::Revoked);

    let kept = store.get_by_jti("a").await.unwrap().unwrap();
    assert!(kept.revoked);
    assert_eq!(kept.id, token.id);
    assert_eq!(kept.expires_at.unix_timestamp(), token.expires_at.unix_timestamp());
    assert!(store.list_unrevoked("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sqlite_payments() {
    let dir = tempdir().unwrap();
    let store = sqlite_store(&dir).await;

    assert!(!store.has_paid("u1").await.unwrap());

    store.upsert_payment(&payment("order-1", "u1", PaymentStatus::Paid)).await.unwrap();
    assert!(store.has_paid("u1").await.unwrap());
    assert!(!store.has_paid("u2").await.unwrap());

    store.upsert_payment(&payment("order-1", "u1", PaymentStatus::Refunded)).await.unwrap();
    assert!(!store.has_paid("u1").await.unwrap());

    let payments = store.list_payments("u1").await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status, PaymentStatus::Refunded);
}

#[tokio::test]
async fn test_sqlite_persists_across_reopen() {
    let dir = tempdir().unwrap();
    let now = OffsetDateTime::now_utc();

    {
        let store = sqlite_store(&dir).await;
        store.insert_if_no_active(&record("u1", "a", now), now).await.unwrap();
    }

    let store = sqlite_store(&dir).await;
    assert_eq!(store.list_unrevoked("u1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_issue_verify_revoke_with_durable_policy() {
    let dir = tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    store.upsert_payment(&payment("order-1", "u1", PaymentStatus::Paid)).await.unwrap();

    let issuer = TokenIssuer::new(codec(), store.clone(), store.clone());
    let verifier = Verifier::new(codec(), store.clone());
    let now = OffsetDateTime::now_utc();

    let issued = issuer.issue("u1", "u1@example.com", DEFAULT_TOKEN_NAME, now).await.unwrap();
    let claims = verifier.verify(&issued.token, now.unix_timestamp()).await.unwrap();
    assert_eq!(claims.identifier, issued.record.jti);

    let listed = issuer.list_active("u1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].token_hash, issued.record.token_hash);

    issuer.revoke_by_jti("u1", &issued.claims.identifier).await.unwrap();
    assert_eq!(
        verifier.verify(&issued.token, now.unix_timestamp()).await,
        Err(TokenError::Revoked)
    );
}

#[tokio::test]
async fn test_token_from_another_deployment_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    let verifier = Verifier::new(codec(), store);

    let foreign = codec()
        .encode(&tinfin::Claims::pro("u1", OffsetDateTime::now_utc().unix_timestamp() + 60))
        .unwrap();

    assert_eq!(
        verifier.verify_now(&foreign).await,
        Err(TokenError::NotFound)
    );
}

#[tokio::test]
async fn test_filesystem_registry_import() {
    let dir = tempdir().unwrap();
    let seed = dir.path().join("seed");
    std::fs::create_dir_all(&seed).unwrap();
    std::fs::write(seed.join("auth-1.json"), br#"{"name":"auth-1"}"#).unwrap();
    std::fs::write(seed.join("auth-3.json"), br#"{"name":"auth-3"}"#).unwrap();
    std::fs::write(seed.join("notes.txt"), b"ignored").unwrap();

    let catalog = Catalog::new()
        .with_entry(ResourceMeta::new("auth-1"))
        .with_entry(ResourceMeta::new("auth-3").pro());
    let storage = FileSystemStorage::new(dir.path().join("registry")).await.unwrap();
    let registry = Registry::new(Arc::new(storage), catalog);

    let imported = registry.import_dir(&seed).await.unwrap();
    assert_eq!(imported, vec!["auth-1", "auth-3"]);

    let open = registry.fetch("auth-1.json").await.unwrap();
    let gated = registry.fetch("auth-3").await.unwrap();
    assert!(!open.gated);
    assert!(gated.gated);
    assert_eq!(gated.content, br#"{"name":"auth-3"}"#.to_vec());

    // Payloads survive a new storage handle on the same directory
    let reopened = Registry::new(
        Arc::new(FileSystemStorage::new(dir.path().join("registry")).await.unwrap()),
        Catalog::new(),
    );
    assert_eq!(reopened.resolve("auth-3").await.unwrap(), gated.digest);
}
