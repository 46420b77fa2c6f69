//! Client for the pinboard REST API
mod response;

use std::sync::Arc;

use common_types::{
    Comment, CommentId, CommentRequest, CreatePinRequest, LikeRequest, Pin, PinId,
    RegisterRequest,
};
use reqwest::Method;
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;
use validator::Validate;

pub use response::{build_http_client, read_json};

use crate::auth::TokenStore;
use crate::types::ClientResult;

/// Endpoint paths, relative to the API base URL
pub mod paths {
    use common_types::{CommentId, PinId};

    /// Account creation
    pub const REGISTER: &str = "/users/register/";
    /// Pin listing
    pub const PINS: &str = "/pins/";
    /// Pin creation
    pub const CREATE_PIN: &str = "/pins/create/";

    /// Comments of `pin`: listing and creation
    #[must_use]
    pub fn comments(pin: PinId) -> String {
        format!("/pins/comment/{pin}/")
    }

    /// A single comment of `pin`
    #[must_use]
    pub fn comment(pin: PinId, comment: CommentId) -> String {
        format!("/pins/comment/{pin}/{comment}/")
    }

    /// Likes of `pin`: POST likes, DELETE unlikes
    #[must_use]
    pub fn like(pin: PinId) -> String {
        format!("/pins/like/{pin}/")
    }
}

/// Operations offered by the pinboard backend
#[async_trait::async_trait]
pub trait PinboardApi: Send + Sync {
    /// Creates an account
    async fn register(&self, payload: &RegisterRequest) -> ClientResult<()>;

    /// Lists every pin
    async fn list_pins(&self) -> ClientResult<Vec<Pin>>;

    /// Creates a pin
    async fn create_pin(&self, payload: &CreatePinRequest) -> ClientResult<()>;

    /// Lists the comments of a pin
    async fn list_comments(&self, pin: PinId) -> ClientResult<Vec<Comment>>;

    /// Adds a comment to `payload.pin`
    async fn create_comment(&self, payload: &CommentRequest) -> ClientResult<()>;

    /// Removes a comment from a pin
    async fn delete_comment(&self, pin: PinId, comment: CommentId) -> ClientResult<()>;

    /// Likes `payload.id`
    async fn like_pin(&self, payload: &LikeRequest) -> ClientResult<()>;

    /// Removes the like on `payload.id`
    async fn unlike_pin(&self, payload: &LikeRequest) -> ClientResult<()>;
}

/// HTTP implementation of [`PinboardApi`]
pub struct PinboardApiClient {
    base_url: String,
    http_client: ClientWithMiddleware,
    tokens: Arc<TokenStore>,
}

impl PinboardApiClient {
    /// Creates a client for the API rooted at `base_url`
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Url` if `base_url` is not an absolute URL
    pub fn new(
        base_url: &str,
        http_client: ClientWithMiddleware,
        tokens: Arc<TokenStore>,
    ) -> ClientResult<Self> {
        Url::parse(base_url)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            tokens,
        })
    }

    /// Sends a request, attaching the session's access token when there is one
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> ClientResult<Value> {
        let url = format!("{}{path}", self.base_url);
        debug!(%method, %url, "Calling pinboard API");

        let mut request = self.http_client.request(method, url);
        if let Some(tokens) = self.tokens.tokens() {
            request = request.bearer_auth(tokens.access);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        read_json(response).await
    }

    async fn send_validated<T>(&self, method: Method, path: &str, payload: &T) -> ClientResult<Value>
    where
        T: Serialize + Validate + Sync,
    {
        payload.validate()?;
        self.send(method, path, Some(serde_json::to_value(payload)?))
            .await
    }
}

#[async_trait::async_trait]
impl PinboardApi for PinboardApiClient {
    async fn register(&self, payload: &RegisterRequest) -> ClientResult<()> {
        self.send_validated(Method::POST, paths::REGISTER, payload)
            .await?;
        Ok(())
    }

    async fn list_pins(&self) -> ClientResult<Vec<Pin>> {
        let value = self.send(Method::GET, paths::PINS, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn create_pin(&self, payload: &CreatePinRequest) -> ClientResult<()> {
        self.send_validated(Method::POST, paths::CREATE_PIN, payload)
            .await?;
        Ok(())
    }

    async fn list_comments(&self, pin: PinId) -> ClientResult<Vec<Comment>> {
        let value = self
            .send(Method::GET, &paths::comments(pin), None)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn create_comment(&self, payload: &CommentRequest) -> ClientResult<()> {
        self.send_validated(Method::POST, &paths::comments(payload.pin), payload)
            .await?;
        Ok(())
    }

    async fn delete_comment(&self, pin: PinId, comment: CommentId) -> ClientResult<()> {
        self.send(Method::DELETE, &paths::comment(pin, comment), None)
            .await?;
        Ok(())
    }

    async fn like_pin(&self, payload: &LikeRequest) -> ClientResult<()> {
        self.send(
            Method::POST,
            &paths::like(payload.id),
            Some(serde_json::to_value(payload)?),
        )
        .await?;
        Ok(())
    }

    async fn unlike_pin(&self, payload: &LikeRequest) -> ClientResult<()> {
        self.send(
            Method::DELETE,
            &paths::like(payload.id),
            Some(serde_json::to_value(payload)?),
        )
        .await?;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! In-memory [`PinboardApi`] for tests
    use std::collections::HashMap;
    use std::sync::Mutex;

    use common_types::{
        ApiErrorBody, Comment, CommentId, CommentRequest, CreatePinRequest, LikeRequest, Pin,
        PinId, RegisterRequest,
    };
    use http::StatusCode;
    use serde_json::Value;
    use validator::Validate;

    use super::{paths, PinboardApi};
    use crate::types::{ClientError, ClientResult};

    /// Which backend operation a scripted failure applies to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Endpoint {
        /// `register`
        Register,
        /// `list_pins`
        ListPins,
        /// `create_pin`
        CreatePin,
        /// `list_comments`
        ListComments,
        /// `create_comment`
        CreateComment,
        /// `delete_comment`
        DeleteComment,
        /// `like_pin`
        LikePin,
        /// `unlike_pin`
        UnlikePin,
    }

    /// A failure the mock reproduces on every call to an endpoint
    #[derive(Debug, Clone)]
    pub enum Failure {
        /// Non-success status with the given JSON body
        Status(StatusCode, Value),
        /// Success status whose body carries an `error` field
        InBand(String),
        /// The request never got a response
        Transport(String),
    }

    impl Failure {
        fn to_error(&self) -> ClientError {
            match self {
                Self::Status(status, body) => ClientError::Api {
                    status: *status,
                    body: ApiErrorBody::from_value(body),
                },
                Self::InBand(message) => ClientError::Rejected(ApiErrorBody {
                    error: Some(message.clone()),
                    detail: None,
                }),
                Self::Transport(message) => ClientError::Http(
                    reqwest_middleware::Error::Middleware(anyhow::anyhow!(message.clone())),
                ),
            }
        }
    }

    /// A call the mock received
    #[derive(Debug, Clone, PartialEq)]
    pub struct ApiCall {
        /// Operation that was called
        pub endpoint: Endpoint,
        /// Path the HTTP client would have requested
        pub path: String,
        /// JSON body, if the operation sends one
        pub body: Option<Value>,
    }

    /// Scriptable in-memory backend
    #[derive(Default)]
    pub struct MockPinboardApi {
        pins: Mutex<Vec<Pin>>,
        comments: Mutex<HashMap<PinId, Vec<Comment>>>,
        failures: Mutex<HashMap<Endpoint, Failure>>,
        calls: Mutex<Vec<ApiCall>>,
    }

    impl MockPinboardApi {
        /// A backend with no pins, no comments and no failures
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Pins returned by `list_pins`
        #[must_use]
        pub fn with_pins(self, pins: Vec<Pin>) -> Self {
            *self.pins.lock().unwrap() = pins;
            self
        }

        /// Comments returned by `list_comments` for `pin`
        #[must_use]
        pub fn with_comments(self, pin: PinId, comments: Vec<Comment>) -> Self {
            self.comments.lock().unwrap().insert(pin, comments);
            self
        }

        /// Makes every call to `endpoint` fail
        #[must_use]
        pub fn failing(self, endpoint: Endpoint, failure: Failure) -> Self {
            self.failures.lock().unwrap().insert(endpoint, failure);
            self
        }

        /// Every call received so far, in order
        #[must_use]
        pub fn calls(&self) -> Vec<ApiCall> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, endpoint: Endpoint, path: String, body: Option<Value>) -> ClientResult<()> {
            self.calls.lock().unwrap().push(ApiCall {
                endpoint,
                path,
                body,
            });

            self.failures
                .lock()
                .unwrap()
                .get(&endpoint)
                .map_or(Ok(()), |failure| Err(failure.to_error()))
        }
    }

    #[async_trait::async_trait]
    impl PinboardApi for MockPinboardApi {
        async fn register(&self, payload: &RegisterRequest) -> ClientResult<()> {
            payload.validate()?;
            self.record(
                Endpoint::Register,
                paths::REGISTER.to_string(),
                Some(serde_json::to_value(payload)?),
            )
        }

        async fn list_pins(&self) -> ClientResult<Vec<Pin>> {
            self.record(Endpoint::ListPins, paths::PINS.to_string(), None)?;
            Ok(self.pins.lock().unwrap().clone())
        }

        async fn create_pin(&self, payload: &CreatePinRequest) -> ClientResult<()> {
            payload.validate()?;
            self.record(
                Endpoint::CreatePin,
                paths::CREATE_PIN.to_string(),
                Some(serde_json::to_value(payload)?),
            )
        }

        async fn list_comments(&self, pin: PinId) -> ClientResult<Vec<Comment>> {
            self.record(Endpoint::ListComments, paths::comments(pin), None)?;
            Ok(self
                .comments
                .lock()
                .unwrap()
                .get(&pin)
                .cloned()
                .unwrap_or_default())
        }

        async fn create_comment(&self, payload: &CommentRequest) -> ClientResult<()> {
            payload.validate()?;
            self.record(
                Endpoint::CreateComment,
                paths::comments(payload.pin),
                Some(serde_json::to_value(payload)?),
            )
        }

        async fn delete_comment(&self, pin: PinId, comment: CommentId) -> ClientResult<()> {
            self.record(Endpoint::DeleteComment, paths::comment(pin, comment), None)
        }

        async fn like_pin(&self, payload: &LikeRequest) -> ClientResult<()> {
            self.record(
                Endpoint::LikePin,
                paths::like(payload.id),
                Some(serde_json::to_value(payload)?),
            )
        }

        async fn unlike_pin(&self, payload: &LikeRequest) -> ClientResult<()> {
            self.record(
                Endpoint::UnlikePin,
                paths::like(payload.id),
                Some(serde_json::to_value(payload)?),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_paths() {
        assert_eq!(paths::comments(3), "/pins/comment/3/");
        assert_eq!(paths::comment(3, 9), "/pins/comment/3/9/");
        assert_eq!(paths::like(4), "/pins/like/4/");
    }

    #[test]
    fn rejects_relative_base_url() {
        let http_client = build_http_client(std::time::Duration::from_secs(1)).unwrap();
        assert!(PinboardApiClient::new("localhost/api", http_client, Arc::default()).is_err());
    }

    #[test]
    fn trims_trailing_slash() {
        let http_client = build_http_client(std::time::Duration::from_secs(1)).unwrap();
        let client =
            PinboardApiClient::new("http://localhost:8000/api/", http_client, Arc::default())
                .unwrap();
        assert_eq!(client.base_url, "http://localhost:8000/api");
    }
}
