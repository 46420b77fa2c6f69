//! Client-side state of a pinboard session
//!
//! [`PinboardStore`] caches the pins, comments and last uploaded image, and
//! runs every action the UI can trigger. Each action makes its remote call,
//! reports the outcome through the status banner and, for some actions,
//! redirects on success. Failures never escape an action; they end up in
//! [`PinboardStore::request`].

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use aws_sdk_s3::Client as S3Client;
use common_types::{
    Comment, CommentId, CommentRequest, CreatePinRequest, ErrorField, ImageInfo, LikeRequest,
    LoginRequest, LoginResponse, Pin, PinId, RegisterRequest, User,
};
use tracing::{info, instrument, warn};

use crate::api::{build_http_client, PinboardApi, PinboardApiClient};
use crate::auth::{AuthProvider, LocalAuthClient, TokenStore};
use crate::media_storage::{MediaStorage, ObjectStorage};
use crate::navigation::{Navigator, Route};
use crate::status::{RequestStatus, StatusBanner};
use crate::types::{ClientError, ClientResult, Environment};

/// Shown after an account is created
pub const REGISTERED: &str = "Registration successful!";
/// Shown after a successful login
pub const LOGGED_IN: &str = "Login successful";
/// Shown after logging out
pub const LOGGED_OUT: &str = "Logout successful";
/// Shown after a pin is created
pub const PIN_CREATED: &str = "Pin created successfully";
/// Shown after a comment is posted
pub const COMMENT_CREATED: &str = "Comment created successfully";
/// Shown after a comment is deleted
pub const COMMENT_DELETED: &str = "Comment deleted successfully";
/// Shown after a pin is liked
pub const PIN_LIKED: &str = "Pin liked successfully";
/// Shown after a like is removed
pub const PIN_UNLIKED: &str = "Pin unliked successfully";
/// Shown once the image bytes are stored
pub const IMAGE_UPLOADED: &str = "Image uploaded successfully";
/// Shown after the uploaded image is removed
pub const IMAGE_DELETED: &str = "Image deleted successfully";
/// Error shown when there is no uploaded image to delete
pub const NO_IMAGE: &str = "No image uploaded";

/// The remote services a store talks to
pub struct Collaborators {
    /// Pinboard REST backend
    pub api: Arc<dyn PinboardApi>,
    /// Login and logout, plus the current session
    pub auth: Arc<dyn AuthProvider>,
    /// Where uploaded images go
    pub storage: Arc<dyn ObjectStorage>,
    /// Receives redirects
    pub navigator: Arc<dyn Navigator>,
}

/// Session-wide store settings
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Bucket uploaded images go to
    pub bucket: String,
    /// How long a status message stays up
    pub status_clear_delay: Duration,
}

impl StoreConfig {
    /// Settings for the given environment
    #[must_use]
    pub fn from_environment(environment: &Environment) -> Self {
        Self {
            bucket: environment.storage_bucket(),
            status_clear_delay: environment.status_clear_delay(),
        }
    }
}

/// State container for one application session
pub struct PinboardStore {
    image: RwLock<Option<ImageInfo>>,
    request: StatusBanner,
    pins: RwLock<Vec<Pin>>,
    comments: RwLock<Vec<Comment>>,
    bucket: String,
    api: Arc<dyn PinboardApi>,
    auth: Arc<dyn AuthProvider>,
    storage: Arc<dyn ObjectStorage>,
    navigator: Arc<dyn Navigator>,
}

#[allow(clippy::needless_pass_by_value)]
impl PinboardStore {
    /// Creates an empty store with no session
    #[must_use]
    pub fn new(collaborators: Collaborators, config: StoreConfig) -> Self {
        let Collaborators {
            api,
            auth,
            storage,
            navigator,
        } = collaborators;

        Self {
            image: RwLock::new(None),
            request: StatusBanner::new(config.status_clear_delay),
            pins: RwLock::new(Vec::new()),
            comments: RwLock::new(Vec::new()),
            bucket: config.bucket,
            api,
            auth,
            storage,
            navigator,
        }
    }

    /// Wires the HTTP, auth and storage clients described by `environment`
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Url` if the API base URL is invalid
    /// Returns `ClientError::Http` if the HTTP client cannot be created
    pub async fn from_environment(
        environment: &Environment,
        navigator: Arc<dyn Navigator>,
    ) -> ClientResult<Self> {
        let tokens = Arc::new(TokenStore::default());
        let http_client = build_http_client(environment.request_timeout())?;
        let base_url = environment.api_base_url();

        let api = PinboardApiClient::new(&base_url, http_client.clone(), Arc::clone(&tokens))?;
        let auth = LocalAuthClient::new(
            &base_url,
            environment.login_path(),
            environment.logout_path(),
            http_client,
            tokens,
        )?;

        let s3_client = Arc::new(S3Client::from_conf(environment.s3_client_config().await));
        let storage = MediaStorage::new(s3_client, environment.storage_public_base_url());

        Ok(Self::new(
            Collaborators {
                api: Arc::new(api),
                auth: Arc::new(auth),
                storage: Arc::new(storage),
                navigator,
            },
            StoreConfig::from_environment(environment),
        ))
    }

    /// Metadata of the last uploaded image
    #[must_use]
    pub fn image(&self) -> Option<ImageInfo> {
        read(&self.image).clone()
    }

    /// Outcome of the most recent action
    #[must_use]
    pub fn request(&self) -> RequestStatus {
        self.request.current()
    }

    /// Pins from the last successful fetch
    #[must_use]
    pub fn pins(&self) -> Vec<Pin> {
        read(&self.pins).clone()
    }

    /// The cached pin with identifier `id`
    #[must_use]
    pub fn single_pin(&self, id: PinId) -> Option<Pin> {
        read(&self.pins).iter().find(|pin| pin.id == id).cloned()
    }

    /// Comments from the last successful fetch
    #[must_use]
    pub fn comments(&self) -> Vec<Comment> {
        read(&self.comments).clone()
    }

    /// The logged-in user, if any
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.auth.user()
    }

    /// Clears the status banner now
    pub fn reset_request(&self) {
        self.request.reset();
    }

    /// Loads the data every session starts with
    pub async fn init(&self) -> bool {
        self.fetch_pins().await
    }

    /// Ends the session: pending status clears are dropped
    pub fn shutdown(&self) {
        self.request.shutdown();
    }

    /// Creates an account and redirects to the login page
    #[instrument(skip_all, fields(username = %payload.username))]
    pub async fn register(&self, payload: RegisterRequest) -> bool {
        match self.api.register(&payload).await {
            Ok(()) => {
                self.succeed(REGISTERED);
                self.navigator.navigate(Route::Login);
                true
            }
            Err(e) => self.fail(&e, ErrorField::Error),
        }
    }

    /// Logs in, keeps the session and redirects home.
    ///
    /// Failures show the server's `detail` text.
    #[instrument(skip_all, fields(username = %credentials.username))]
    pub async fn login(&self, credentials: LoginRequest) -> bool {
        match self.auth.login(&credentials).await {
            Ok(LoginResponse { user, tokens }) => {
                self.auth.set_user(user);
                self.auth.set_user_token(tokens.access, tokens.refresh);
                self.succeed(LOGGED_IN);
                self.navigator.navigate(Route::Home);
                true
            }
            Err(e) => self.fail(&e, ErrorField::Detail),
        }
    }

    /// Ends the session and redirects to the login page
    #[instrument(skip_all)]
    pub async fn logout(&self) -> bool {
        match self.auth.logout().await {
            Ok(()) => {
                self.succeed(LOGGED_OUT);
                self.navigator.navigate(Route::Login);
                true
            }
            Err(e) => self.fail(&e, ErrorField::Error),
        }
    }

    /// Replaces the cached pins with the server's list
    #[instrument(skip_all)]
    pub async fn fetch_pins(&self) -> bool {
        match self.api.list_pins().await {
            Ok(pins) => {
                info!(count = pins.len(), "Fetched pins");
                *write(&self.pins) = pins;
                true
            }
            Err(e) => self.fail(&e, ErrorField::Error),
        }
    }

    /// Replaces the cached comments with those of `pin`
    #[instrument(skip(self))]
    pub async fn fetch_comments(&self, pin: PinId) -> bool {
        match self.api.list_comments(pin).await {
            Ok(comments) => {
                info!(count = comments.len(), "Fetched comments");
                *write(&self.comments) = comments;
                true
            }
            Err(e) => self.fail(&e, ErrorField::Error),
        }
    }

    /// Creates a pin and redirects home
    #[instrument(skip_all)]
    pub async fn create_pin(&self, payload: CreatePinRequest) -> bool {
        match self.api.create_pin(&payload).await {
            Ok(()) => {
                self.succeed(PIN_CREATED);
                self.navigator.navigate(Route::Home);
                true
            }
            Err(e) => self.fail(&e, ErrorField::Error),
        }
    }

    /// Posts a comment on `payload.pin`
    #[instrument(skip_all, fields(pin = payload.pin))]
    pub async fn comment_pin(&self, payload: CommentRequest) -> bool {
        match self.api.create_comment(&payload).await {
            Ok(()) => {
                self.succeed(COMMENT_CREATED);
                true
            }
            Err(e) => self.fail(&e, ErrorField::Error),
        }
    }

    /// Deletes a comment from a pin
    #[instrument(skip(self))]
    pub async fn delete_comment(&self, pin: PinId, comment: CommentId) -> bool {
        match self.api.delete_comment(pin, comment).await {
            Ok(()) => {
                self.succeed(COMMENT_DELETED);
                true
            }
            Err(e) => self.fail(&e, ErrorField::Error),
        }
    }

    /// Likes `payload.id`
    #[instrument(skip_all, fields(pin = payload.id))]
    pub async fn like_pin(&self, payload: LikeRequest) -> bool {
        match self.api.like_pin(&payload).await {
            Ok(()) => {
                self.succeed(PIN_LIKED);
                true
            }
            Err(e) => self.fail(&e, ErrorField::Error),
        }
    }

    /// Unlike failures are shown as the raw error, not the server's text
    #[instrument(skip_all, fields(pin = payload.id))]
    pub async fn unlike_pin(&self, payload: LikeRequest) -> bool {
        match self.api.unlike_pin(&payload).await {
            Ok(()) => {
                self.succeed(PIN_UNLIKED);
                true
            }
            Err(e) => self.fail_raw(&e),
        }
    }

    /// Uploads an image, then looks up its public URL.
    ///
    /// The success message follows the upload alone; a failed URL lookup
    /// replaces it with an error and leaves `image` untouched.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_image(&self, filename: String, bytes: Vec<u8>) -> bool {
        let stored = match self.storage.upload(&self.bucket, &filename, bytes).await {
            Ok(stored) => stored,
            Err(e) => return self.fail_raw(&ClientError::from(e)),
        };
        self.succeed(IMAGE_UPLOADED);

        match self.storage.public_url(&self.bucket, &stored.key).await {
            Ok(public_url) => {
                info!(%public_url, "Image is public");
                *write(&self.image) = Some(ImageInfo {
                    filename: stored.key,
                    public_url,
                });
                true
            }
            Err(e) => self.fail_raw(&ClientError::from(e)),
        }
    }

    /// Removes the last uploaded image from storage
    #[instrument(skip_all)]
    pub async fn delete_uploaded_image(&self) -> bool {
        let Some(image) = self.image() else {
            warn!("No uploaded image to delete");
            self.request.set_error(NO_IMAGE);
            return false;
        };

        match self.storage.remove(&self.bucket, &image.filename).await {
            Ok(()) => {
                *write(&self.image) = None;
                self.succeed(IMAGE_DELETED);
                true
            }
            Err(e) => self.fail_raw(&ClientError::from(e)),
        }
    }

    fn succeed(&self, message: &str) {
        info!("{message}");
        self.request.set_success(message);
    }

    fn fail(&self, error: &ClientError, field: ErrorField) -> bool {
        warn!(%error, "Action failed");
        self.request.set_error(error.banner_message(field));
        false
    }

    fn fail_raw(&self, error: &ClientError) -> bool {
        warn!(%error, "Action failed");
        self.request.set_error(error.to_string());
        false
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
