//! HTTP plumbing shared by the REST and auth clients

use std::time::Duration;

use common_types::ApiErrorBody;
use reqwest::{Client, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use serde_json::Value;
use tracing::debug;

use crate::types::{ClientError, ClientResult};

/// Maximum number of idle connections to maintain per host
const MAX_IDLE_CONNECTIONS_PER_HOST: usize = 10;

/// Builds the traced HTTP client every backend call goes through
///
/// # Errors
///
/// Returns `ClientError::Http` if the underlying client cannot be created
pub fn build_http_client(timeout: Duration) -> ClientResult<ClientWithMiddleware> {
    let reqwest_client = Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS_PER_HOST)
        .build()?;

    Ok(ClientBuilder::new(reqwest_client)
        .with(TracingMiddleware::default())
        .build())
}

/// Reads a backend response into JSON.
///
/// * non-success status: `ClientError::Api` with whatever error envelope the
///   body carried
/// * success with an `error` field in the body: `ClientError::Rejected`
/// * success with an empty body: `Value::Null`
///
/// # Errors
///
/// See above; also `ClientError::Decode` for a success body that is not JSON
pub async fn read_json(response: Response) -> ClientResult<Value> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let value = serde_json::from_slice::<Value>(&bytes).unwrap_or(Value::Null);
        debug!(%status, "Backend returned an error response");
        return Err(ClientError::Api {
            status,
            body: ApiErrorBody::from_value(&value),
        });
    }

    if bytes.is_empty() {
        return Ok(Value::Null);
    }

    let value = serde_json::from_slice::<Value>(&bytes)
        .map_err(|e| ClientError::Decode(format!("{status} response is not JSON: {e}")))?;

    let body = ApiErrorBody::from_value(&value);
    if body.error.is_some() {
        return Err(ClientError::Rejected(body));
    }

    Ok(value)
}
