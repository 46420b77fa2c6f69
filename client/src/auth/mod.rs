//! Session handling against the backend's token endpoints

use std::sync::{Arc, PoisonError, RwLock};

use common_types::{AuthTokens, LoginRequest, LoginResponse, User};
use reqwest_middleware::ClientWithMiddleware;
use tracing::{debug, info};
use url::Url;
use validator::Validate;

use crate::api::read_json;
use crate::types::ClientResult;

/// The logged-in user and their tokens, shared by every client that needs to
/// authenticate requests
#[derive(Debug, Default)]
pub struct TokenStore {
    user: RwLock<Option<User>>,
    tokens: RwLock<Option<AuthTokens>>,
}

impl TokenStore {
    /// The logged-in user
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The session's token pair
    #[must_use]
    pub fn tokens(&self) -> Option<AuthTokens> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remembers the logged-in user
    pub fn set_user(&self, user: User) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
    }

    /// Remembers the session's token pair
    pub fn set_tokens(&self, tokens: AuthTokens) {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
    }

    /// Forgets the user and the tokens
    pub fn clear(&self) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Whether a token pair is held
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.tokens().is_some()
    }
}

/// Exchanges credentials for a session and tears it down again
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    /// Authenticates; the session is not stored until the caller asks for it.
    /// Failures carry their text in the `detail` field.
    async fn login(&self, credentials: &LoginRequest) -> ClientResult<LoginResponse>;

    /// Invalidates the session on the server, then forgets it locally
    async fn logout(&self) -> ClientResult<()>;

    /// Stores the logged-in user
    fn set_user(&self, user: User);

    /// Stores the session's token pair
    fn set_user_token(&self, access: String, refresh: String);

    /// The logged-in user, if any
    fn user(&self) -> Option<User>;

    /// The session's token pair, if any
    fn tokens(&self) -> Option<AuthTokens>;
}

/// Auth provider talking to the backend's own token endpoints
pub struct LocalAuthClient {
    base_url: String,
    login_path: String,
    logout_path: Option<String>,
    http_client: ClientWithMiddleware,
    tokens: Arc<TokenStore>,
}

impl LocalAuthClient {
    /// Creates a new auth client
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Url` if `base_url` is not an absolute URL
    pub fn new(
        base_url: &str,
        login_path: String,
        logout_path: Option<String>,
        http_client: ClientWithMiddleware,
        tokens: Arc<TokenStore>,
    ) -> ClientResult<Self> {
        Url::parse(base_url)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            login_path,
            logout_path,
            http_client,
            tokens,
        })
    }
}

#[async_trait::async_trait]
impl AuthProvider for LocalAuthClient {
    async fn login(&self, credentials: &LoginRequest) -> ClientResult<LoginResponse> {
        credentials.validate()?;

        let url = format!("{}{}", self.base_url, self.login_path);
        debug!(%url, username = %credentials.username, "Logging in");

        let response = self.http_client.post(url).json(credentials).send().await?;
        let value = read_json(response).await?;

        Ok(serde_json::from_value(value)?)
    }

    async fn logout(&self) -> ClientResult<()> {
        let server_logout = match (&self.logout_path, self.tokens.tokens()) {
            (Some(path), Some(tokens)) => Some((path, tokens)),
            _ => None,
        };

        let result: ClientResult<()> = match server_logout {
            Some((path, tokens)) => {
                let url = format!("{}{path}", self.base_url);
                debug!(%url, "Logging out");

                match self
                    .http_client
                    .post(url)
                    .bearer_auth(&tokens.access)
                    .json(&serde_json::json!({ "refresh": tokens.refresh }))
                    .send()
                    .await
                {
                    Ok(response) => read_json(response).await.map(|_| ()),
                    Err(e) => Err(e.into()),
                }
            }
            None => Ok(()),
        };

        self.tokens.clear();
        info!("Session cleared");
        result
    }

    fn set_user(&self, user: User) {
        self.tokens.set_user(user);
    }

    fn set_user_token(&self, access: String, refresh: String) {
        self.tokens.set_tokens(AuthTokens { access, refresh });
    }

    fn user(&self) -> Option<User> {
        self.tokens.user()
    }

    fn tokens(&self) -> Option<AuthTokens> {
        self.tokens.tokens()
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! In-memory [`AuthProvider`] for tests
    use std::sync::{Arc, Mutex};

    use common_types::{
        ApiErrorBody, AuthTokens, LoginRequest, LoginResponse, User,
    };
    use http::StatusCode;
    use serde_json::{Map, Value};
    use validator::Validate;

    use super::{AuthProvider, TokenStore};
    use crate::types::{ClientError, ClientResult};

    /// Auth provider accepting a single username/password pair
    pub struct MockAuthProvider {
        username: String,
        password: String,
        tokens: Arc<TokenStore>,
        fail_logout: Option<Value>,
        in_band_login_error: Option<String>,
        logins: Mutex<u32>,
    }

    impl MockAuthProvider {
        /// Accepts `username` with `password` and nothing else
        #[must_use]
        pub fn new(username: &str, password: &str) -> Self {
            Self {
                username: username.to_string(),
                password: password.to_string(),
                tokens: Arc::default(),
                fail_logout: None,
                in_band_login_error: None,
                logins: Mutex::new(0),
            }
        }

        /// Logout answers with a 500 and this body
        #[must_use]
        pub fn failing_logout(mut self, body: Value) -> Self {
            self.fail_logout = Some(body);
            self
        }

        /// Login answers with success carrying this `error`
        #[must_use]
        pub fn in_band_login_error(mut self, message: &str) -> Self {
            self.in_band_login_error = Some(message.to_string());
            self
        }

        /// Shared session, for assertions
        #[must_use]
        pub fn token_store(&self) -> Arc<TokenStore> {
            Arc::clone(&self.tokens)
        }

        /// Number of login attempts that reached the provider
        #[must_use]
        pub fn login_attempts(&self) -> u32 {
            *self.logins.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl AuthProvider for MockAuthProvider {
        async fn login(&self, credentials: &LoginRequest) -> ClientResult<LoginResponse> {
            credentials.validate()?;
            *self.logins.lock().unwrap() += 1;

            if let Some(message) = &self.in_band_login_error {
                return Err(ClientError::Rejected(ApiErrorBody {
                    error: Some(message.clone()),
                    detail: None,
                }));
            }

            if credentials.username != self.username || credentials.password != self.password {
                return Err(ClientError::Api {
                    status: StatusCode::UNAUTHORIZED,
                    body: ApiErrorBody {
                        error: None,
                        detail: Some(
                            "No active account found with the given credentials".to_string(),
                        ),
                    },
                });
            }

            Ok(LoginResponse {
                user: User {
                    id: Some(1),
                    username: self.username.clone(),
                    email: None,
                    extra: Map::new(),
                },
                tokens: AuthTokens {
                    access: format!("access-{}", self.username),
                    refresh: format!("refresh-{}", self.username),
                },
            })
        }

        async fn logout(&self) -> ClientResult<()> {
            self.tokens.clear();
            self.fail_logout.as_ref().map_or(Ok(()), |body| {
                Err(ClientError::Api {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: ApiErrorBody::from_value(body),
                })
            })
        }

        fn set_user(&self, user: User) {
            self.tokens.set_user(user);
        }

        fn set_user_token(&self, access: String, refresh: String) {
            self.tokens.set_tokens(AuthTokens { access, refresh });
        }

        fn user(&self) -> Option<User> {
            self.tokens.user()
        }

        fn tokens(&self) -> Option<AuthTokens> {
            self.tokens.tokens()
        }
    }
}
