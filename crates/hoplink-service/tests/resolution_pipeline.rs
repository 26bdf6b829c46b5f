//! End-to-end tests of the resolution pipeline against in-process
//! backends: DashMap store, Moka cache, in-memory snapshot store.

use hoplink_cache::{MemoryByteStore, MokaRecordCache};
use hoplink_core::{ByteStore, NewUrlRecord, RecordCache, Repository, ShortCode};
use hoplink_filter::SNAPSHOT_KEY;
use hoplink_generator::RandomGenerator;
use hoplink_service::{ResolutionError, ResolutionService, ServiceConfig};
use hoplink_storage::InMemoryStore;
use jiff::{SignedDuration, Timestamp};
use std::time::Duration;

type Service = ResolutionService<InMemoryStore, MokaRecordCache, MemoryByteStore, RandomGenerator>;

fn service() -> Service {
    ResolutionService::new(
        InMemoryStore::new(),
        MokaRecordCache::new(),
        MemoryByteStore::new(),
        RandomGenerator::new(),
        ServiceConfig::default(),
    )
}

#[tokio::test]
async fn create_then_lookup_round_trips() {
    let service = service();

    let created = service
        .create("https://example.com", None, None)
        .await
        .unwrap();

    // Generated codes are 10 URL-safe characters.
    let code = created.short_code.as_str().to_string();
    assert_eq!(code.len(), 10);
    assert!(code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

    let resolved = service.lookup(&code).await.unwrap();
    assert_eq!(resolved.original_url, "https://example.com");
}

#[tokio::test]
async fn lookup_works_with_cold_cache() {
    let service = service();

    let created = service
        .create("https://example.com", None, None)
        .await
        .unwrap();
    let code = created.short_code.clone();

    // Drop the cache entry so the lookup has to go through the store.
    service.cache().del(&code).await.unwrap();
    assert!(service.cache().get(&code).await.unwrap().is_none());

    let resolved = service.lookup(code.as_str()).await.unwrap();
    assert_eq!(resolved.original_url, "https://example.com");

    // The miss refilled the cache.
    assert!(service.cache().get(&code).await.unwrap().is_some());
}

#[tokio::test]
async fn repeated_lookups_return_identical_records() {
    let service = service();

    let created = service
        .create("https://example.com", None, Some(600))
        .await
        .unwrap();
    let code = created.short_code.as_str();

    // First lookup may hit the cache, second definitely does; a cold one
    // comes from the store. All must agree.
    let warm = service.lookup(code).await.unwrap();
    service.cache().del(&created.short_code).await.unwrap();
    let cold = service.lookup(code).await.unwrap();
    let rewarmed = service.lookup(code).await.unwrap();

    assert_eq!(warm, created);
    assert_eq!(cold, created);
    assert_eq!(rewarmed, created);
}

#[tokio::test]
async fn duplicate_custom_code_is_rejected() {
    let service = service();

    service
        .create("https://a.com", Some("mine"), None)
        .await
        .unwrap();

    let err = service
        .create("https://b.com", Some("mine"), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "ALREADY_EXISTS");

    // The original mapping is untouched.
    let resolved = service.lookup("mine").await.unwrap();
    assert_eq!(resolved.original_url, "https://a.com");
}

#[tokio::test]
async fn unknown_code_fails_fast() {
    let service = service();

    let err = service.lookup("neverexisted").await.unwrap_err();
    assert_eq!(err.kind(), "NOT_FOUND");

    let err = service.delete("neverexisted").await.unwrap_err();
    assert_eq!(err.kind(), "NOT_FOUND");

    // Still not found afterwards; the failed delete registered nothing.
    let err = service.lookup("neverexisted").await.unwrap_err();
    assert_eq!(err.kind(), "NOT_FOUND");
}

#[tokio::test]
async fn delete_then_recreate_same_code() {
    let service = service();

    service
        .create("https://first.com", Some("reused"), None)
        .await
        .unwrap();
    assert!(service.delete("reused").await.unwrap());

    let err = service.lookup("reused").await.unwrap_err();
    assert_eq!(err.kind(), "NOT_FOUND");

    // The filter still reports "possibly present" for the deleted code,
    // but that only skips the fast-fail path; the store is free again.
    service
        .create("https://second.com", Some("reused"), None)
        .await
        .unwrap();

    let resolved = service.lookup("reused").await.unwrap();
    assert_eq!(resolved.original_url, "https://second.com");
}

#[tokio::test]
async fn update_changes_url_and_refreshes_cache() {
    let service = service();

    service
        .create("https://old.com", Some("mutable"), None)
        .await
        .unwrap();

    let updated = service
        .update("mutable", "https://new.com")
        .await
        .unwrap();
    assert_eq!(updated.original_url, "https://new.com");
    assert!(updated.updated_at >= updated.created_at);

    // Both the cached and the stored view serve the new URL.
    let resolved = service.lookup("mutable").await.unwrap();
    assert_eq!(resolved.original_url, "https://new.com");

    service
        .cache()
        .del(&ShortCode::new_unchecked("mutable"))
        .await
        .unwrap();
    let resolved = service.lookup("mutable").await.unwrap();
    assert_eq!(resolved.original_url, "https://new.com");
}

#[tokio::test]
async fn update_of_unknown_code_is_not_found() {
    let service = service();

    let err = service
        .update("missing", "https://example.com")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "NOT_FOUND");
}

#[tokio::test]
async fn expired_record_is_distinct_from_not_found() {
    let service = service();
    let expired_at = Timestamp::now() - SignedDuration::from_secs(1);

    // Plant an already-expired record directly in the store, then teach
    // the filter about it the way operations would: a full rebuild.
    service
        .store()
        .insert(NewUrlRecord {
            short_code: ShortCode::new_unchecked("lapsed"),
            original_url: "https://example.com".to_string(),
            expires_at: Some(expired_at),
        })
        .await
        .unwrap();
    service.rebuild_filter().await.unwrap();

    let err = service.lookup("lapsed").await.unwrap_err();
    assert_eq!(err.kind(), "EXPIRED");

    // Expired records cannot be updated or deleted either.
    let err = service
        .update("lapsed", "https://new.com")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "EXPIRED");

    let err = service.delete("lapsed").await.unwrap_err();
    assert_eq!(err.kind(), "EXPIRED");
}

#[tokio::test]
async fn expired_cache_entry_is_evicted_on_read() {
    let service = service();
    let code = ShortCode::new_unchecked("stale2");
    let expired_at = Timestamp::now() - SignedDuration::from_secs(1);

    service
        .store()
        .insert(NewUrlRecord {
            short_code: code.clone(),
            original_url: "https://example.com".to_string(),
            expires_at: Some(expired_at),
        })
        .await
        .unwrap();
    service.rebuild_filter().await.unwrap();

    // Simulate a cache entry that outlived the record's logical expiry.
    let record = service.store().find(&code).await.unwrap().unwrap();
    service
        .cache()
        .set(&code, &record, Duration::from_secs(3600))
        .await
        .unwrap();

    // The cached path reads as NOT_FOUND and evicts as a side effect.
    let err = service.lookup("stale2").await.unwrap_err();
    assert_eq!(err.kind(), "NOT_FOUND");
    assert!(service.cache().get(&code).await.unwrap().is_none());
}

#[tokio::test]
async fn ttl_expiry_boundary() {
    let service = service();

    let created = service
        .create("https://example.com", Some("briefly"), Some(1))
        .await
        .unwrap();
    assert!(created.expires_at.is_some());

    // Live immediately after creation.
    assert!(service.lookup("briefly").await.is_ok());

    tokio::time::sleep(Duration::from_secs(2)).await;

    // After the lifetime has elapsed the cached entry is evicted (Moka's
    // own TTL may already have dropped it) and the store path reports
    // EXPIRED.
    let err = service.lookup("briefly").await.unwrap_err();
    assert_eq!(err.kind(), "EXPIRED");
    assert!(service
        .cache()
        .get(&ShortCode::new_unchecked("briefly"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn bootstrap_restores_filter_from_snapshot() {
    let store = InMemoryStore::new();
    let snapshots = MemoryByteStore::new();

    let first = ResolutionService::new(
        store.clone(),
        MokaRecordCache::new(),
        snapshots.clone(),
        RandomGenerator::new(),
        ServiceConfig::default(),
    );
    first
        .create("https://example.com", Some("persisted"), None)
        .await
        .unwrap();

    // A second service over the same backends picks the snapshot up and
    // resolves without a rebuild.
    let second: Service = ResolutionService::bootstrap(
        store,
        MokaRecordCache::new(),
        snapshots,
        RandomGenerator::new(),
        ServiceConfig::default(),
    )
    .await
    .unwrap();

    let resolved = second.lookup("persisted").await.unwrap();
    assert_eq!(resolved.original_url, "https://example.com");
}

#[tokio::test]
async fn bootstrap_rebuilds_when_snapshot_missing() {
    let store = InMemoryStore::new();
    store
        .insert(NewUrlRecord {
            short_code: ShortCode::new_unchecked("recovered"),
            original_url: "https://example.com".to_string(),
            expires_at: None,
        })
        .await
        .unwrap();

    let snapshots = MemoryByteStore::new();
    let service: Service = ResolutionService::bootstrap(
        store,
        MokaRecordCache::new(),
        snapshots.clone(),
        RandomGenerator::new(),
        ServiceConfig::default(),
    )
    .await
    .unwrap();

    // The rebuild found the pre-existing code and persisted a snapshot.
    let resolved = service.lookup("recovered").await.unwrap();
    assert_eq!(resolved.original_url, "https://example.com");
    assert!(snapshots.get_bytes(SNAPSHOT_KEY).await.unwrap().is_some());
}

#[tokio::test]
async fn bootstrap_recovers_from_corrupt_snapshot() {
    let store = InMemoryStore::new();
    store
        .insert(NewUrlRecord {
            short_code: ShortCode::new_unchecked("survivor"),
            original_url: "https://example.com".to_string(),
            expires_at: None,
        })
        .await
        .unwrap();

    let snapshots = MemoryByteStore::new();
    snapshots
        .set_bytes(SNAPSHOT_KEY, b"definitely not json", None)
        .await
        .unwrap();

    let service: Service = ResolutionService::bootstrap(
        store,
        MokaRecordCache::new(),
        snapshots,
        RandomGenerator::new(),
        ServiceConfig::default(),
    )
    .await
    .unwrap();

    let resolved = service.lookup("survivor").await.unwrap();
    assert_eq!(resolved.original_url, "https://example.com");
}

#[tokio::test]
async fn rebuild_shrinks_false_positive_exposure() {
    let service = service();

    service
        .create("https://example.com", Some("shortlived"), None)
        .await
        .unwrap();
    service.delete("shortlived").await.unwrap();

    // Before the rebuild the filter still admits the deleted code.
    let rebuilt = service.rebuild_filter().await.unwrap();
    assert_eq!(rebuilt, 0);

    // After it, the fast-fail path denies the code again.
    let err = service.lookup("shortlived").await.unwrap_err();
    assert_eq!(err.kind(), "NOT_FOUND");
}

#[tokio::test]
async fn concurrent_creates_on_same_code_have_one_winner() {
    let service = service();
    let mut handles = vec![];

    for i in 0..8u64 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .create(&format!("https://example{i}.com"), Some("contended"), None)
                .await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(err) => assert_eq!(err.kind(), "ALREADY_EXISTS"),
        }
    }
    assert_eq!(winners, 1);

    // The winning record resolves.
    assert!(service.lookup("contended").await.is_ok());
}

#[tokio::test]
async fn cache_is_optional_for_correctness() {
    let service = service();

    let created = service
        .create("https://example.com", None, Some(300))
        .await
        .unwrap();
    let code = created.short_code.clone();

    // Dropping the cache entry at any point must not change results.
    for _ in 0..3 {
        service.cache().del(&code).await.unwrap();
        let resolved = service.lookup(code.as_str()).await.unwrap();
        assert_eq!(resolved, created);
    }
}

#[tokio::test]
async fn delete_removes_record_and_cache_entry() {
    let service = service();

    let created = service
        .create("https://example.com", Some("goner1"), None)
        .await
        .unwrap();
    let code = created.short_code.clone();
    assert!(service.cache().get(&code).await.unwrap().is_some());

    assert!(service.delete("goner1").await.unwrap());

    assert!(service.cache().get(&code).await.unwrap().is_none());
    assert!(service.store().find(&code).await.unwrap().is_none());

    let err = service.lookup("goner1").await.unwrap_err();
    assert!(matches!(err, ResolutionError::NotFound(_)));
}
