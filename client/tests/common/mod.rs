// Not every helper is used in every test, so we allow dead code
#![allow(dead_code)]

pub mod canned_server;

use std::sync::Arc;
use std::time::Duration;

use common_types::Pin;
use pinboard_client::{
    api::mock::MockPinboardApi,
    auth::mock::MockAuthProvider,
    media_storage::mock::MockObjectStorage,
    navigation::mock::RecordingNavigator,
    Collaborators, PinboardStore, StoreConfig,
};

pub const BUCKET: &str = "test-bucket";
pub const CLEAR_DELAY: Duration = Duration::from_secs(5);
pub const USERNAME: &str = "ada";
pub const PASSWORD: &str = "lovelace";

/// A store wired to in-memory collaborators, plus handles to inspect them
pub struct TestSetup {
    pub store: PinboardStore,
    pub api: Arc<MockPinboardApi>,
    pub auth: Arc<MockAuthProvider>,
    pub storage: Arc<MockObjectStorage>,
    pub navigator: Arc<RecordingNavigator>,
}

impl TestSetup {
    pub fn new(api: MockPinboardApi) -> Self {
        Self::with(
            api,
            MockAuthProvider::new(USERNAME, PASSWORD),
            MockObjectStorage::default(),
        )
    }

    pub fn with(api: MockPinboardApi, auth: MockAuthProvider, storage: MockObjectStorage) -> Self {
        let api = Arc::new(api);
        let auth = Arc::new(auth);
        let storage = Arc::new(storage);
        let navigator = Arc::new(RecordingNavigator::default());

        let store = PinboardStore::new(
            Collaborators {
                api: api.clone(),
                auth: auth.clone(),
                storage: storage.clone(),
                navigator: navigator.clone(),
            },
            StoreConfig {
                bucket: BUCKET.to_string(),
                status_clear_delay: CLEAR_DELAY,
            },
        );

        Self {
            store,
            api,
            auth,
            storage,
            navigator,
        }
    }
}

pub fn pins(ids: &[i64]) -> Vec<Pin> {
    ids.iter().copied().map(Pin::with_id).collect()
}
