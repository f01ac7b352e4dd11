//! Artifact registry integration tests
//!
//! Exercises the repository layer against an in-memory SQLite database with
//! the real migrations: insert/find round-trips, guarded transition
//! monotonicity, idempotent soft deletes, and bidirectional keyset
//! pagination stability.

use chrono::{DateTime, Duration, Utc};

use rao::database::Database;
use rao::database::repositories::{ArtifactNodeRepository, ArtifactRepository, ListCursor};
use rao::models::{Artifact, ArtifactNodePlacement, ArtifactStatus, ArtifactType, StorageLocation};

async fn test_repositories() -> (ArtifactRepository, ArtifactNodeRepository) {
    let database = Database::new_in_memory().await.expect("in-memory database");
    database.migrate().await.expect("migrations");
    (
        ArtifactRepository::new(database.connection.clone()),
        ArtifactNodeRepository::new(database.connection.clone()),
    )
}

fn micros_now() -> DateTime<Utc> {
    DateTime::from_timestamp_micros(Utc::now().timestamp_micros()).unwrap()
}

fn clip(hash: &str, internal_name: &str, created_at: DateTime<Utc>) -> Artifact {
    Artifact {
        artifact_hash: hash.to_string(),
        artifact_type: ArtifactType::Clip,
        internal_name: internal_name.to_string(),
        artifact_internal_name: format!("clip+{hash}"),
        stream_id: Some("stream-1".to_string()),
        tenant_id: Some("T1".to_string()),
        user_id: Some("U1".to_string()),
        status: ArtifactStatus::Requested,
        request_id: "req-1".to_string(),
        format: Some("mp4".to_string()),
        storage_location: StorageLocation::Pending,
        s3_url: None,
        size_bytes: Some(1024),
        manifest_path: None,
        error_message: None,
        started_at: None,
        ended_at: None,
        duration_seconds: Some(10),
        retention_until: Some(created_at + Duration::days(30)),
        frozen_at: None,
        created_at,
        updated_at: created_at,
    }
}

fn hash_n(n: usize) -> String {
    format!("{n:032x}")
}

#[tokio::test]
async fn insert_then_find_round_trips_every_field() {
    let (artifacts, _) = test_repositories().await;
    let original = clip(&hash_n(1), "live+foo", micros_now());

    artifacts.insert(&original).await.unwrap();
    let found = artifacts.find_by_hash(&original.artifact_hash).await.unwrap().unwrap();

    assert_eq!(found.artifact_hash, original.artifact_hash);
    assert_eq!(found.artifact_type, original.artifact_type);
    assert_eq!(found.internal_name, original.internal_name);
    assert_eq!(found.artifact_internal_name, original.artifact_internal_name);
    assert_eq!(found.tenant_id, original.tenant_id);
    assert_eq!(found.user_id, original.user_id);
    assert_eq!(found.status, original.status);
    assert_eq!(found.request_id, original.request_id);
    assert_eq!(found.format, original.format);
    assert_eq!(found.storage_location, original.storage_location);
    assert_eq!(found.size_bytes, original.size_bytes);
    assert_eq!(found.duration_seconds, original.duration_seconds);
    assert_eq!(found.retention_until, original.retention_until);
    assert_eq!(found.created_at, original.created_at);
}

#[tokio::test]
async fn supplied_hash_is_stored_verbatim() {
    let (artifacts, _) = test_repositories().await;
    let hash = "deadbeefdeadbeefdeadbeefdeadbeef";
    artifacts.insert(&clip(hash, "live+foo", micros_now())).await.unwrap();
    assert!(artifacts.find_by_hash(hash).await.unwrap().is_some());
}

#[tokio::test]
async fn guarded_transitions_never_move_backward() {
    let (artifacts, _) = test_repositories().await;
    let hash = hash_n(2);
    artifacts.insert(&clip(&hash, "live+foo", micros_now())).await.unwrap();

    // queued is not yet a legal predecessor of processing
    let moved = artifacts
        .transition_status(&hash, &[ArtifactStatus::Queued], ArtifactStatus::Processing)
        .await
        .unwrap();
    assert!(!moved);

    assert!(
        artifacts
            .transition_status(&hash, &[ArtifactStatus::Requested], ArtifactStatus::Queued)
            .await
            .unwrap()
    );
    assert!(
        artifacts
            .transition_status(&hash, &[ArtifactStatus::Queued], ArtifactStatus::Processing)
            .await
            .unwrap()
    );
    assert!(
        artifacts
            .transition_status(&hash, &[ArtifactStatus::Processing], ArtifactStatus::Ready)
            .await
            .unwrap()
    );

    // a duplicate (stale) report is a no-op
    let moved = artifacts
        .transition_status(&hash, &[ArtifactStatus::Queued], ArtifactStatus::Processing)
        .await
        .unwrap();
    assert!(!moved);
    let found = artifacts.find_by_hash(&hash).await.unwrap().unwrap();
    assert_eq!(found.status, ArtifactStatus::Ready);
}

#[tokio::test]
async fn mark_failed_skips_terminal_states() {
    let (artifacts, _) = test_repositories().await;
    let hash = hash_n(3);
    artifacts.insert(&clip(&hash, "live+foo", micros_now())).await.unwrap();

    assert!(artifacts.mark_failed(&hash, "node exploded").await.unwrap());
    let found = artifacts.find_by_hash(&hash).await.unwrap().unwrap();
    assert_eq!(found.status, ArtifactStatus::Failed);
    assert_eq!(found.error_message.as_deref(), Some("node exploded"));

    // failed is terminal for mark_failed
    assert!(!artifacts.mark_failed(&hash, "again").await.unwrap());
}

#[tokio::test]
async fn soft_delete_is_idempotent() {
    let (artifacts, _) = test_repositories().await;
    let hash = hash_n(4);
    artifacts.insert(&clip(&hash, "live+foo", micros_now())).await.unwrap();

    assert!(artifacts.soft_delete(&hash).await.unwrap());
    assert!(!artifacts.soft_delete(&hash).await.unwrap());

    let found = artifacts.find_by_hash(&hash).await.unwrap().unwrap();
    assert_eq!(found.status, ArtifactStatus::Deleted);
}

#[tokio::test]
async fn hard_delete_removes_the_row() {
    let (artifacts, placements) = test_repositories().await;
    let hash = hash_n(5);
    artifacts.insert(&clip(&hash, "live+foo", micros_now())).await.unwrap();
    placements
        .upsert(&ArtifactNodePlacement {
            artifact_hash: hash.clone(),
            node_id: "n1".to_string(),
            file_path: None,
            base_url: "http://n1:4242".to_string(),
            cached_at: micros_now(),
            last_seen_at: micros_now(),
            is_orphaned: false,
        })
        .await
        .unwrap();

    placements.delete_for_artifact(&hash).await.unwrap();
    assert!(artifacts.hard_delete(&hash).await.unwrap());
    assert!(artifacts.find_by_hash(&hash).await.unwrap().is_none());
}

#[tokio::test]
async fn placement_upsert_and_orphan_flag() {
    let (artifacts, placements) = test_repositories().await;
    let hash = hash_n(6);
    artifacts.insert(&clip(&hash, "live+foo", micros_now())).await.unwrap();

    let placement = ArtifactNodePlacement {
        artifact_hash: hash.clone(),
        node_id: "n1".to_string(),
        file_path: Some("/data/clips/a.mp4".to_string()),
        base_url: "http://n1:4242".to_string(),
        cached_at: micros_now(),
        last_seen_at: micros_now(),
        is_orphaned: false,
    };
    placements.upsert(&placement).await.unwrap();
    // second upsert on the same (hash, node) must not duplicate
    placements.upsert(&placement).await.unwrap();

    let rows = placements.placements_for(&hash).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].is_orphaned);

    assert!(placements.mark_orphaned(&hash, "n1").await.unwrap());
    let rows = placements.placements_for(&hash).await.unwrap();
    assert!(rows[0].is_orphaned);
}

#[tokio::test]
async fn forward_pagination_returns_disjoint_stable_pages() {
    let (artifacts, _) = test_repositories().await;
    let base = micros_now();
    for i in 0..25 {
        let created = base + Duration::seconds(i as i64);
        artifacts
            .insert(&clip(&hash_n(100 + i), "live+foo", created))
            .await
            .unwrap();
    }

    let mut seen: Vec<String> = Vec::new();
    let mut cursor: Option<ListCursor> = None;
    let mut page_sizes = Vec::new();

    for page_index in 0..3 {
        let page = artifacts
            .list_by_internal_name(
                ArtifactType::Clip,
                "live+foo",
                cursor.as_ref(),
                10,
                false,
                false,
            )
            .await
            .unwrap();
        page_sizes.push(page.items.len());
        assert_eq!(page.has_previous_page, page_index > 0);
        for item in &page.items {
            assert!(!seen.contains(&item.artifact_hash), "pages must not overlap");
            seen.push(item.artifact_hash.clone());
        }
        cursor = page.end_cursor.as_deref().map(|c| ListCursor::decode(c).unwrap());
    }

    assert_eq!(page_sizes, vec![10, 10, 5]);
    assert_eq!(seen.len(), 25);

    // rows come newest first
    let newest = hash_n(100 + 24);
    assert_eq!(seen.first(), Some(&newest));

    // feeding the final end_cursor back as a backward cursor returns the
    // ten rows immediately preceding it
    let last_cursor = cursor.unwrap();
    let page = artifacts
        .list_by_internal_name(
            ArtifactType::Clip,
            "live+foo",
            Some(&last_cursor),
            10,
            true,
            false,
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 10);
    assert!(page.has_next_page);
    let expected: Vec<String> = seen[14..24].to_vec();
    let got: Vec<String> = page.items.iter().map(|a| a.artifact_hash.clone()).collect();
    assert_eq!(got, expected);
}

#[tokio::test]
async fn listings_hide_deleted_rows() {
    let (artifacts, _) = test_repositories().await;
    let base = micros_now();
    for i in 0..3 {
        artifacts
            .insert(&clip(&hash_n(200 + i), "live+bar", base + Duration::seconds(i as i64)))
            .await
            .unwrap();
    }
    artifacts.soft_delete(&hash_n(201)).await.unwrap();

    let page = artifacts
        .list_by_internal_name(ArtifactType::Clip, "live+bar", None, 10, false, false)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(page.items.iter().all(|a| a.artifact_hash != hash_n(201)));
}

#[tokio::test]
async fn active_dvr_lookup_ignores_finished_sessions() {
    let (artifacts, _) = test_repositories().await;
    let mut finished = clip(&hash_n(300), "live+baz", micros_now());
    finished.artifact_type = ArtifactType::Dvr;
    finished.status = ArtifactStatus::Ready;
    artifacts.insert(&finished).await.unwrap();
    assert!(artifacts.find_active_dvr("live+baz").await.unwrap().is_none());

    let mut active = clip(&hash_n(301), "live+baz", micros_now() + Duration::seconds(1));
    active.artifact_type = ArtifactType::Dvr;
    active.status = ArtifactStatus::Recording;
    artifacts.insert(&active).await.unwrap();

    let found = artifacts.find_active_dvr("live+baz").await.unwrap().unwrap();
    assert_eq!(found.artifact_hash, hash_n(301));
}
