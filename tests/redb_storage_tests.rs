//! Embedded backend tests
//!
//! Exercises RedbStorage directly using temporary database files.

use chrono::{Duration, Utc};
use shortvault::errors::StoreError;
use shortvault::storage::{Entry, RedbStorage, Storage, Visitor};
use tempfile::TempDir;

/// 创建临时数据库的存储实例
fn create_temp_storage() -> (RedbStorage, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage =
        RedbStorage::open(temp_dir.path().join("test.db")).expect("Failed to create storage");
    (storage, temp_dir)
}

fn visitor_at(ip: &str, minutes_ago: i64) -> Visitor {
    let mut visitor = Visitor::new(ip);
    visitor.timestamp = Utc::now() - Duration::minutes(minutes_ago);
    visitor
}

#[tokio::test]
async fn test_create_and_get() {
    let (storage, _temp) = create_temp_storage();
    let entry = Entry::new("https://example.com").with_remote_addr("192.0.2.1");

    storage.create(&entry, "abcd", "").await.unwrap();

    let stored = storage.get_by_id("abcd").await.unwrap();
    assert_eq!(stored, entry);
}

#[tokio::test]
async fn test_create_duplicate() {
    let (storage, _temp) = create_temp_storage();

    storage
        .create(&Entry::new("https://example.com"), "abcd", "")
        .await
        .unwrap();
    let result = storage
        .create(&Entry::new("https://example.org"), "abcd", "")
        .await;

    assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
    let stored = storage.get_by_id("abcd").await.unwrap();
    assert_eq!(stored.public.url, "https://example.com");
}

#[tokio::test]
async fn test_missing_ids() {
    let (storage, _temp) = create_temp_storage();

    assert!(matches!(
        storage.get_by_id("nope").await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        storage.delete("nope").await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        storage.increase_visit_counter("nope").await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        storage
            .register_visitor("nope", "visit", &Visitor::new("10.0.0.1"))
            .await,
        Err(StoreError::NotFound(_))
    ));
    assert!(storage.get_visitors("nope").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_increase_visit_counter() {
    let (storage, _temp) = create_temp_storage();
    storage
        .create(&Entry::new("https://example.com"), "abcd", "")
        .await
        .unwrap();

    for _ in 0..3 {
        storage.increase_visit_counter("abcd").await.unwrap();
    }

    let entry = storage.get_by_id("abcd").await.unwrap();
    assert_eq!(entry.public.visit_count, 3);
    let last = entry.public.last_visit.unwrap();
    assert!(Utc::now() - last < Duration::minutes(1));
}

#[tokio::test]
async fn test_visitors_keep_registration_order() {
    let (storage, _temp) = create_temp_storage();
    storage
        .create(&Entry::new("https://example.com"), "abcd", "")
        .await
        .unwrap();

    // caller-supplied timestamps do not reorder the log
    storage
        .register_visitor("abcd", "a", &visitor_at("10.0.0.1", 10))
        .await
        .unwrap();
    storage
        .register_visitor("abcd", "b", &visitor_at("10.0.0.2", 1))
        .await
        .unwrap();
    storage
        .register_visitor("abcd", "c", &visitor_at("10.0.0.3", 5))
        .await
        .unwrap();

    let ips: Vec<String> = storage
        .get_visitors("abcd")
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.ip)
        .collect();
    assert_eq!(ips, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
}

#[tokio::test]
async fn test_visitors_with_same_timestamp_keep_order() {
    let (storage, _temp) = create_temp_storage();
    storage
        .create(&Entry::new("https://example.com"), "abcd", "")
        .await
        .unwrap();

    let now = Utc::now();
    let expected: Vec<String> = (0..20).map(|n| format!("10.0.0.{}", n)).collect();
    for (n, ip) in expected.iter().enumerate() {
        let mut visitor = Visitor::new(ip.clone());
        visitor.timestamp = now;
        storage
            .register_visitor("abcd", &format!("visit-{}", n), &visitor)
            .await
            .unwrap();
    }

    let ips: Vec<String> = storage
        .get_visitors("abcd")
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.ip)
        .collect();
    assert_eq!(ips, expected);
}

#[tokio::test]
async fn test_delete_cleans_up() {
    let (storage, _temp) = create_temp_storage();
    storage
        .create(&Entry::new("https://example.com"), "abcd", "githubalice")
        .await
        .unwrap();
    storage
        .register_visitor("abcd", "v1", &Visitor::new("10.0.0.1"))
        .await
        .unwrap();

    storage.delete("abcd").await.unwrap();

    assert!(matches!(
        storage.get_by_id("abcd").await,
        Err(StoreError::NotFound(_))
    ));
    assert!(storage.get_visitors("abcd").await.unwrap().is_empty());
    assert!(
        storage
            .get_entries_for_owner("githubalice")
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_owner_index() {
    let (storage, _temp) = create_temp_storage();
    storage
        .create(&Entry::new("https://a.example.com"), "aaaa", "githubalice")
        .await
        .unwrap();
    storage
        .create(&Entry::new("https://b.example.com"), "bbbb", "githubalice")
        .await
        .unwrap();
    storage
        .create(&Entry::new("https://c.example.com"), "cccc", "githubbob")
        .await
        .unwrap();

    let alice = storage.get_entries_for_owner("githubalice").await.unwrap();
    assert_eq!(alice.len(), 2);
    assert!(alice.contains_key("aaaa"));
    assert!(alice.contains_key("bbbb"));

    let all = storage.get_all_entries().await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("persist.db");

    {
        let storage = RedbStorage::open(&path).unwrap();
        storage
            .create(&Entry::new("https://example.com"), "abcd", "")
            .await
            .unwrap();
        storage.increase_visit_counter("abcd").await.unwrap();
        storage.close().await.unwrap();
    }

    let storage = RedbStorage::open(&path).unwrap();
    let entry = storage.get_by_id("abcd").await.unwrap();
    assert_eq!(entry.public.visit_count, 1);
    assert_eq!(storage.path(), path.as_path());
}

#[tokio::test]
async fn test_closed_storage_rejects_calls() {
    let (storage, _temp) = create_temp_storage();
    storage.close().await.unwrap();
    // closing twice is harmless
    storage.close().await.unwrap();

    assert!(matches!(
        storage.get_by_id("abcd").await,
        Err(StoreError::DatabaseConnection(_))
    ));
}
