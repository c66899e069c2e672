//! Save/get/delete behaviour of the facade over both record stores.

mod fixtures;

use domains::{AdId, AdType, AppError, ImageRef};
use fixtures::*;
use services::{AdFacade, AdStore, LocalAdStore, PersistenceEvent};

#[tokio::test]
async fn test_authenticated_save_resolves_embedded_images() {
    let harness = Harness::new();
    let facade = AdFacade::new(&signed_in(), &harness.backends);

    let saved = facade
        .save(ad("a1", AdType::Sale, &[JPEG, "https://storage/x.jpg"]))
        .await
        .unwrap();

    assert!(saved.images[0].starts_with("https://blobs.test/u1/"));
    assert_eq!(saved.images[1], "https://storage/x.jpg");
    assert!(saved.created_at.is_some());
    assert_eq!(saved.user_id, Some(user()));
    assert!(harness.blobs.contains_url(&saved.images[0]));

    let fetched = facade.get(&saved.id).await.unwrap().unwrap();
    assert_eq!(fetched.title, "2020 Sedan");
    assert_eq!(fetched.content, "Clean title, low miles.");
    assert_eq!(fetched.ad_type, AdType::Sale);
    assert!(fetched.images.iter().all(|img| !ImageRef::classify(img).is_embedded()));
}

#[tokio::test]
async fn test_created_at_is_stable_and_updated_at_increases() {
    for session in [anonymous(), signed_in()] {
        let harness = Harness::new();
        let facade = AdFacade::new(&session, &harness.backends);

        let first = facade.save(ad("a1", AdType::Item, &[])).await.unwrap();
        let mut edited = first.clone();
        edited.title = "2020 Sedan, price drop".into();
        let second = facade.save(edited).await.unwrap();
        let third = facade.save(second.clone()).await.unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert_eq!(second.created_at, third.created_at);
        assert!(second.updated_at > first.updated_at);
        assert!(third.updated_at > second.updated_at);
    }
}

#[tokio::test]
async fn test_anonymous_double_save_keeps_one_record() {
    let harness = Harness::new();
    let facade = AdFacade::new(&anonymous(), &harness.backends);

    facade.save(ad("a1", AdType::Sale, &[JPEG])).await.unwrap();
    facade.save(ad("a1", AdType::Sale, &[JPEG])).await.unwrap();

    let local = LocalAdStore::new(harness.backends.kv.clone(), profile());
    let records = local.list().await.unwrap();
    assert_eq!(records.len(), 1);
    // Nothing leaves the browser profile while anonymous.
    assert_eq!(harness.blobs.stored(), 0);
}

#[tokio::test]
async fn test_delete_then_get_and_second_delete() {
    for session in [anonymous(), signed_in()] {
        let harness = Harness::new();
        let facade = AdFacade::new(&session, &harness.backends);
        let id = AdId::new("a1").unwrap();

        facade.save(ad("a1", AdType::Item, &[JPEG])).await.unwrap();
        assert!(facade.delete(&id).await.unwrap().removed);
        assert!(facade.get(&id).await.unwrap().is_none());

        let again = facade.delete(&id).await.unwrap();
        assert!(!again.removed);
    }
}

#[tokio::test]
async fn test_remote_delete_removes_unshared_images_only() {
    let harness = Harness::new();
    let facade = AdFacade::new(&signed_in(), &harness.backends);

    let first = facade.save(ad("a1", AdType::Item, &[JPEG])).await.unwrap();
    let shared = first.images[0].clone();
    let mut copy = ad("a2", AdType::Item, &[]);
    copy.images = vec![shared.clone()];
    facade.save(copy).await.unwrap();
    let second = facade.save(ad("a3", AdType::Item, &[PNG])).await.unwrap();

    facade.delete(&AdId::new("a1").unwrap()).await.unwrap();
    assert!(harness.blobs.contains_url(&shared));

    facade.delete(&AdId::new("a3").unwrap()).await.unwrap();
    assert!(!harness.blobs.contains_url(&second.images[0]));
}

#[tokio::test]
async fn test_failed_upload_aborts_save_and_rolls_back() {
    let harness = Harness::new();
    harness.blobs.fail_on_put(2);
    let facade = AdFacade::new(&signed_in(), &harness.backends);

    let err = facade
        .save(ad("a1", AdType::Sale, &[JPEG, PNG]))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::UploadFailed { index: 1, .. }));
    assert_eq!(harness.blobs.stored(), 0);
    assert!(facade.get(&AdId::new("a1").unwrap()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_upload_many_preserves_order() {
    let harness = Harness::new();
    let images = vec![
        "https://storage/first.jpg".to_string(),
        JPEG.to_string(),
        "https://storage/third.jpg".to_string(),
    ];

    let urls = harness
        .backends
        .uploader
        .upload_many(&signed_in(), &images)
        .await
        .unwrap();

    assert_eq!(urls.len(), 3);
    assert_eq!(urls[0], images[0]);
    assert!(urls[1].starts_with(BLOB_BASE));
    assert_eq!(urls[2], images[2]);
}

#[tokio::test]
async fn test_uploader_refuses_anonymous_sessions() {
    let harness = Harness::new();
    let result = harness.backends.uploader.upload(&anonymous(), JPEG).await;
    assert!(matches!(result, Err(AppError::Unauthenticated(_))));
}

#[tokio::test]
async fn test_background_delete_reports_on_channel() {
    let harness = Harness::new();
    let facade = AdFacade::new(&signed_in(), &harness.backends);
    let saved = facade.save(ad("a1", AdType::Item, &[JPEG])).await.unwrap();
    let mut events = harness.backends.events.subscribe();

    let report = facade.spawn_delete(saved.id.clone()).await.unwrap().unwrap();
    assert!(report.removed);
    assert!(report.image_failures.is_empty());
    assert!(matches!(
        events.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn test_background_delete_failure_is_published() {
    let harness = Harness::new();
    let facade = AdFacade::new(&signed_in(), &harness.backends);
    let mut events = harness.backends.events.subscribe();

    let missing = facade
        .spawn_delete(AdId::new("a1").unwrap())
        .await
        .unwrap();
    // Unknown ids are not failures.
    assert!(!missing.unwrap().removed);
    assert!(events.try_recv().is_err());

    let saved = facade.save(ad("a2", AdType::Item, &[JPEG])).await.unwrap();
    harness.blobs.fail_deletes();
    let report = facade.spawn_delete(saved.id.clone()).await.unwrap().unwrap();
    assert!(report.removed);
    assert_eq!(report.image_failures.len(), 1);

    let event = events.recv().await.unwrap();
    assert!(matches!(event, PersistenceEvent::ImageCleanupFailed { ad_id, .. } if ad_id == saved.id));
}
