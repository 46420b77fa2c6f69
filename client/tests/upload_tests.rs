mod common;

use common::{TestSetup, BUCKET, PASSWORD, USERNAME};
use common_types::ImageInfo;
use pinboard_client::{
    api::mock::MockPinboardApi, auth::mock::MockAuthProvider,
    media_storage::mock::MockObjectStorage, status::RequestStatus, store,
};
use pretty_assertions::assert_eq;

fn setup_with_storage(storage: MockObjectStorage) -> TestSetup {
    TestSetup::with(
        MockPinboardApi::new(),
        MockAuthProvider::new(USERNAME, PASSWORD),
        storage,
    )
}

#[tokio::test]
async fn test_upload_stores_image_info() {
    let setup = TestSetup::new(MockPinboardApi::new());

    assert!(
        setup
            .store
            .upload_image("cat.png".to_string(), b"meow".to_vec())
            .await
    );

    assert_eq!(
        setup.store.request(),
        RequestStatus::success(store::IMAGE_UPLOADED)
    );
    assert_eq!(
        setup.store.image(),
        Some(ImageInfo {
            filename: "cat.png".to_string(),
            public_url: "https://storage.test/test-bucket/cat.png".to_string(),
        })
    );
    assert_eq!(setup.storage.object(BUCKET, "cat.png"), Some(b"meow".to_vec()));
    // Uploads never redirect
    assert!(setup.navigator.routes().is_empty());
}

#[tokio::test]
async fn test_upload_failure_shows_raw_error() {
    let setup = setup_with_storage(MockObjectStorage::default().failing_upload("bucket offline"));

    assert!(
        !setup
            .store
            .upload_image("cat.png".to_string(), b"meow".to_vec())
            .await
    );
    assert_eq!(
        setup.store.request(),
        RequestStatus::error("Upstream service error: bucket offline")
    );
    assert_eq!(setup.store.image(), None);
}

#[tokio::test]
async fn test_public_url_failure_replaces_success_message() {
    let setup = setup_with_storage(MockObjectStorage::default().failing_public_url("no url"));

    assert!(
        !setup
            .store
            .upload_image("cat.png".to_string(), b"meow".to_vec())
            .await
    );

    // The object was written even though its URL could not be resolved
    assert_eq!(setup.storage.object(BUCKET, "cat.png"), Some(b"meow".to_vec()));
    assert_eq!(
        setup.store.request(),
        RequestStatus::error("Upstream service error: no url")
    );
    assert_eq!(setup.store.image(), None);
}

#[tokio::test]
async fn test_duplicate_upload_keeps_previous_image() {
    let setup = TestSetup::new(MockPinboardApi::new());

    assert!(
        setup
            .store
            .upload_image("cat.png".to_string(), b"meow".to_vec())
            .await
    );
    let first = setup.store.image();

    assert!(
        !setup
            .store
            .upload_image("cat.png".to_string(), b"purr".to_vec())
            .await
    );
    assert_eq!(
        setup.store.request(),
        RequestStatus::error("Object already exists: cat.png")
    );
    assert_eq!(setup.store.image(), first);
    assert_eq!(setup.storage.object(BUCKET, "cat.png"), Some(b"meow".to_vec()));
}

#[tokio::test]
async fn test_new_upload_replaces_image() {
    let setup = TestSetup::new(MockPinboardApi::new());

    assert!(setup.store.upload_image("a.png".to_string(), vec![1]).await);
    assert!(setup.store.upload_image("b.png".to_string(), vec![2]).await);

    assert_eq!(setup.store.image().unwrap().filename, "b.png");
}

#[tokio::test]
async fn test_empty_filename_is_rejected() {
    let setup = TestSetup::new(MockPinboardApi::new());

    assert!(!setup.store.upload_image(String::new(), vec![1]).await);
    assert_eq!(
        setup.store.request(),
        RequestStatus::error("Invalid input: filename must not be empty")
    );
}

#[tokio::test]
async fn test_delete_uploaded_image() {
    let setup = TestSetup::new(MockPinboardApi::new());
    assert!(setup.store.upload_image("cat.png".to_string(), vec![1]).await);

    assert!(setup.store.delete_uploaded_image().await);
    assert_eq!(
        setup.store.request(),
        RequestStatus::success(store::IMAGE_DELETED)
    );
    assert_eq!(setup.store.image(), None);
    assert_eq!(setup.storage.object(BUCKET, "cat.png"), None);
}

#[tokio::test]
async fn test_delete_without_image() {
    let setup = TestSetup::new(MockPinboardApi::new());

    assert!(!setup.store.delete_uploaded_image().await);
    assert_eq!(setup.store.request(), RequestStatus::error(store::NO_IMAGE));
}
