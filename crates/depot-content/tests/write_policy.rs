//! Write-eligibility enforcement

use depot_content::{ContentEngine, ContentError, TransferOperation};
use depot_model::ArtifactStore;
use depot_registry::StoreRegistry;
use depot_test_utils::{group, hosted_with, remote, stream, MemoryTransport};
use std::sync::Arc;

const RELEASE: &str = "org/example/app/1.0/app-1.0.jar";
const SNAPSHOT: &str = "org/example/app/1.0-SNAPSHOT/app-1.0-SNAPSHOT.jar";

fn setup(stores: Vec<ArtifactStore>) -> (Arc<MemoryTransport>, ContentEngine) {
    let registry = Arc::new(StoreRegistry::new());
    for store in stores {
        registry.put(store, false).unwrap();
    }
    let transport = Arc::new(MemoryTransport::new());
    let engine = ContentEngine::new(registry, transport.clone());
    (transport, engine)
}

#[tokio::test]
async fn hosted_store_accepts_allowed_release() {
    let target = hosted_with("releases", true, false, false);
    let (transport, engine) = setup(vec![target.clone()]);

    let transfer = engine
        .store(&target, RELEASE, stream(b"jar bytes"), TransferOperation::Upload)
        .await
        .unwrap();

    assert_eq!(&transfer.key, target.key());
    assert_eq!(
        transport.cached_content(target.key(), RELEASE).as_deref(),
        Some(b"jar bytes".as_slice())
    );
}

#[tokio::test]
async fn release_refused_when_releases_disallowed() {
    let target = hosted_with("snapshots-only", false, true, false);
    let (_transport, engine) = setup(vec![target.clone()]);

    let err = engine
        .store(&target, RELEASE, stream(b"jar"), TransferOperation::Upload)
        .await
        .unwrap_err();
    assert!(matches!(err, ContentError::WriteNotAllowed { key, .. } if &key == target.key()));
}

#[tokio::test]
async fn snapshot_refused_when_snapshots_disallowed() {
    let target = hosted_with("releases-only", true, false, false);
    let (_transport, engine) = setup(vec![target.clone()]);

    let err = engine
        .store(&target, SNAPSHOT, stream(b"jar"), TransferOperation::Upload)
        .await
        .unwrap_err();
    assert!(matches!(err, ContentError::WriteNotAllowed { .. }));
}

#[tokio::test]
async fn group_with_only_rejecting_member_fails_identically() {
    let member = hosted_with("snapshots-only", false, true, false);
    let g = group("public", &[&member]);
    let (_transport, engine) = setup(vec![member, g.clone()]);

    let err = engine
        .store(&g, RELEASE, stream(b"jar"), TransferOperation::Upload)
        .await
        .unwrap_err();
    // Same failure kind as the direct call, carrying the group key.
    assert!(matches!(err, ContentError::WriteNotAllowed { key, .. } if &key == g.key()));
}

#[tokio::test]
async fn group_selects_first_eligible_hosted_member() {
    let upstream = remote("central");
    let writable = hosted_with("writable", true, false, false);
    let rejecting = hosted_with("snapshots-only", false, true, false);
    let g = group("public", &[&upstream, &writable, &rejecting]);
    let (transport, engine) = setup(vec![
        upstream.clone(),
        writable.clone(),
        rejecting.clone(),
        g.clone(),
    ]);

    let transfer = engine
        .store(&g, RELEASE, stream(b"deployed"), TransferOperation::Upload)
        .await
        .unwrap();

    // The remote is passed over; the first eligible hosted member wins.
    assert_eq!(&transfer.key, writable.key());
    assert!(transport.cached(writable.key(), RELEASE));
    assert!(!transport.cached(rejecting.key(), RELEASE));
}

#[tokio::test]
async fn readonly_hosted_target_is_refused() {
    let frozen = hosted_with("frozen", true, true, true);
    let (_transport, engine) = setup(vec![frozen.clone()]);

    let err = engine
        .store(&frozen, RELEASE, stream(b"jar"), TransferOperation::Upload)
        .await
        .unwrap_err();
    assert!(matches!(err, ContentError::ReadOnly { key } if &key == frozen.key()));
}

#[tokio::test]
async fn readonly_members_are_skipped_in_group_selection() {
    let frozen = hosted_with("frozen", true, false, true);
    let writable = hosted_with("writable", true, false, false);
    let g = group("public", &[&frozen, &writable]);
    let (_transport, engine) = setup(vec![frozen, writable.clone(), g.clone()]);

    let transfer = engine
        .store(&g, RELEASE, stream(b"jar"), TransferOperation::Upload)
        .await
        .unwrap();
    assert_eq!(&transfer.key, writable.key());
}

#[tokio::test]
async fn remote_target_is_refused() {
    let upstream = remote("central");
    let (_transport, engine) = setup(vec![upstream.clone()]);

    let err = engine
        .store(&upstream, RELEASE, stream(b"jar"), TransferOperation::Upload)
        .await
        .unwrap_err();
    assert!(matches!(err, ContentError::WriteNotAllowed { .. }));
}

#[tokio::test]
async fn metadata_paths_bypass_artifact_classification() {
    // Unparseable as artifact coordinates; storable in any writable hosted.
    let target = hosted_with("snapshots-only", false, true, false);
    let (_transport, engine) = setup(vec![target.clone()]);

    let transfer = engine
        .store(
            &target,
            "org/example/app/maven-metadata.xml",
            stream(b"<metadata/>"),
            TransferOperation::Upload,
        )
        .await
        .unwrap();
    assert_eq!(&transfer.key, target.key());
}

#[tokio::test]
async fn store_any_picks_first_suitable_and_fails_when_none() {
    let rejecting = hosted_with("snapshots-only", false, true, false);
    let writable = hosted_with("writable", true, false, false);
    let (_transport, engine) = setup(vec![rejecting.clone(), writable.clone()]);

    let transfer = engine
        .store_any(
            &[rejecting.clone(), writable.clone()],
            RELEASE,
            stream(b"jar"),
            TransferOperation::Upload,
        )
        .await
        .unwrap();
    assert_eq!(&transfer.key, writable.key());

    let err = engine
        .store_any(
            std::slice::from_ref(&rejecting),
            RELEASE,
            stream(b"jar"),
            TransferOperation::Upload,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ContentError::NoSuitableStore { .. }));
}

#[tokio::test]
async fn transport_failure_on_the_write_target_is_fatal() {
    let target = hosted_with("releases", true, false, false);
    let (transport, engine) = setup(vec![target.clone()]);
    transport.fail_store(target.key());

    let err = engine
        .store(&target, RELEASE, stream(b"jar"), TransferOperation::Upload)
        .await
        .unwrap_err();
    assert!(matches!(err, ContentError::Transport(_)));
}

#[tokio::test]
async fn disabled_target_is_refused() {
    let target = hosted_with("releases", true, false, false).with_disabled(true);
    let (_transport, engine) = setup(vec![target.clone()]);

    let err = engine
        .store(&target, RELEASE, stream(b"jar"), TransferOperation::Upload)
        .await
        .unwrap_err();
    assert!(matches!(err, ContentError::WriteNotAllowed { .. }));
}
