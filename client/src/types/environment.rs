//! Environment configuration for different deployment stages

use std::env;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};
use tracing::Level;

/// Default time a status banner stays visible
const DEFAULT_STATUS_CLEAR_DELAY: Duration = Duration::from_secs(5);
/// Default request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (local backend, `LocalStack` storage)
    Development {
        /// Optional override for the status banner delay in milliseconds
        status_clear_override: Option<u64>,
    },
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => {
                let status_clear_override = env::var("STATUS_CLEAR_DELAY_MS")
                    .ok()
                    .and_then(|val| val.parse::<u64>().ok());

                Self::Development {
                    status_clear_override,
                }
            }
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Base URL of the pinboard REST API, without a trailing slash
    ///
    /// # Panics
    ///
    /// Panics if `PINBOARD_API_URL` is not set outside development
    #[must_use]
    pub fn api_base_url(&self) -> String {
        let url = match self {
            Self::Production | Self::Staging => env::var("PINBOARD_API_URL")
                .expect("PINBOARD_API_URL environment variable is not set"),
            Self::Development { .. } => env::var("PINBOARD_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000/api".to_string()),
        };

        url.trim_end_matches('/').to_string()
    }

    /// Path of the auth provider's token endpoint
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn login_path(&self) -> String {
        env::var("PINBOARD_LOGIN_PATH").unwrap_or_else(|_| "/users/login/".to_string())
    }

    /// Path of the auth provider's logout endpoint, `None` when logout is
    /// purely local
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn logout_path(&self) -> Option<String> {
        match env::var("PINBOARD_LOGOUT_PATH") {
            Ok(path) if path.trim().is_empty() => None,
            Ok(path) => Some(path),
            Err(_) => Some("/users/logout/".to_string()),
        }
    }

    /// Bucket holding uploaded images
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn storage_bucket(&self) -> String {
        env::var("STORAGE_BUCKET").unwrap_or_else(|_| "test-bucket".to_string())
    }

    /// Base under which public object URLs are built
    ///
    /// # Panics
    ///
    /// Panics if `STORAGE_PUBLIC_URL` is not set outside development
    #[must_use]
    pub fn storage_public_base_url(&self) -> String {
        let url = match self {
            Self::Production | Self::Staging => env::var("STORAGE_PUBLIC_URL")
                .expect("STORAGE_PUBLIC_URL environment variable is not set"),
            Self::Development { .. } => env::var("STORAGE_PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:4566".to_string()),
        };

        url.trim_end_matches('/').to_string()
    }

    /// Returns the endpoint URL to use for the storage service
    #[must_use]
    pub fn override_storage_endpoint_url(&self) -> Option<String> {
        match self {
            Self::Production | Self::Staging => env::var("STORAGE_ENDPOINT_URL").ok(),
            // LocalStack endpoint for development
            Self::Development { .. } => Some(
                env::var("STORAGE_ENDPOINT_URL")
                    .unwrap_or_else(|_| "http://localhost:4566".to_string()),
            ),
        }
    }

    /// How long a status banner stays up before it is cleared
    #[must_use]
    pub fn status_clear_delay(&self) -> Duration {
        match self {
            Self::Production | Self::Staging => DEFAULT_STATUS_CLEAR_DELAY,
            Self::Development {
                status_clear_override,
            } => status_clear_override.map_or(DEFAULT_STATUS_CLEAR_DELAY, Duration::from_millis),
        }
    }

    /// Timeout applied to every HTTP call
    #[must_use]
    #[allow(clippy::unused_self)]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_storage_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// S3-compatible storage client configuration
    pub async fn s3_client_config(&self) -> aws_sdk_s3::Config {
        let aws_config = self.aws_config().await;
        let s3_config: aws_sdk_s3::Config = (&aws_config).into();
        let mut builder = s3_config.to_builder();

        // Override "force path style" to true for compatibility with LocalStack
        // https://github.com/awslabs/aws-sdk-rust/discussions/874
        if matches!(self, Self::Development { .. }) {
            builder.set_force_path_style(Some(true));
        }

        builder.build()
    }

    /// Log level used when `RUST_LOG` is unset, `TRACING_LEVEL` overrides it
    #[must_use]
    pub fn tracing_level(&self) -> Level {
        env::var("TRACING_LEVEL")
            .ok()
            .and_then(|val| val.parse::<Level>().ok())
            .unwrap_or(match self {
                Self::Production | Self::Staging => Level::INFO,
                Self::Development { .. } => Level::DEBUG,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_environment_from_env() {
        // Test development (default)
        env::remove_var("APP_ENV");
        env::remove_var("STATUS_CLEAR_DELAY_MS");
        assert_eq!(
            Environment::from_env(),
            Environment::Development {
                status_clear_override: None
            }
        );

        env::set_var("APP_ENV", " Staging ");
        assert_eq!(Environment::from_env(), Environment::Staging);

        env::set_var("APP_ENV", "production");
        assert_eq!(Environment::from_env(), Environment::Production);

        env::remove_var("APP_ENV");
    }

    #[test]
    #[serial]
    #[should_panic(expected = "Invalid environment: invalid")]
    fn test_invalid_environment() {
        env::set_var("APP_ENV", "invalid");
        let _ = Environment::from_env();
    }

    #[test]
    #[serial]
    fn test_status_clear_delay() {
        let env = Environment::Development {
            status_clear_override: None,
        };
        assert_eq!(env.status_clear_delay(), Duration::from_secs(5));

        let env = Environment::Development {
            status_clear_override: Some(250),
        };
        assert_eq!(env.status_clear_delay(), Duration::from_millis(250));

        assert_eq!(
            Environment::Production.status_clear_delay(),
            Duration::from_secs(5)
        );
    }

    #[test]
    #[serial]
    fn test_development_defaults() {
        env::remove_var("PINBOARD_API_URL");
        env::remove_var("PINBOARD_LOGOUT_PATH");
        env::remove_var("STORAGE_BUCKET");

        let env = Environment::Development {
            status_clear_override: None,
        };
        assert_eq!(env.api_base_url(), "http://localhost:8000/api");
        assert_eq!(env.logout_path().as_deref(), Some("/users/logout/"));
        assert_eq!(env.storage_bucket(), "test-bucket");

        env::set_var("PINBOARD_API_URL", "https://pins.example.com/api/");
        assert_eq!(env.api_base_url(), "https://pins.example.com/api");

        env::set_var("PINBOARD_LOGOUT_PATH", "");
        assert_eq!(env.logout_path(), None);

        env::remove_var("PINBOARD_API_URL");
        env::remove_var("PINBOARD_LOGOUT_PATH");
    }
}
