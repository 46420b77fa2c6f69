//! Wire types shared between the pinboard backend and its clients

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

/// Identifier of a pin
pub type PinId = i64;

/// Identifier of a comment
pub type CommentId = i64;

/// A user-created post managed by the backend.
///
/// Only `id` is typed. Every other field stays in `extra` as sent, so a pin
/// whose title or image has an unexpected shape still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub id: PinId,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Pin {
    /// A pin carrying nothing but its identifier
    #[must_use]
    pub fn with_id(id: PinId) -> Self {
        Self {
            id,
            extra: Map::new(),
        }
    }

    /// `title`, when the backend sent it as a string
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.text("title")
    }

    /// `description`, when the backend sent it as a string
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.text("description")
    }

    /// Public URL of the pinned image, when the backend sent it as a string
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.text("image")
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

/// A comment attached to a pin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<PinId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The authenticated user as returned by the login endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Access and refresh token pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: String,
}

/// Body of a successful login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

/// Metadata of the most recently uploaded image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub filename: String,
    pub public_url: String,
}

/// Account creation payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Credentials exchanged for a token pair
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Pin creation payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePinRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[validate(url)]
    pub image: String,
}

/// Comment creation payload; `pin` also selects the endpoint path
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CommentRequest {
    pub pin: PinId,
    #[validate(length(min = 1))]
    pub comment: String,
}

/// Like/unlike payload; `id` is the pin being (un)liked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeRequest {
    pub id: PinId,
}

/// Which field of an error body carries the human-readable text.
///
/// Most endpoints use `error`; the token endpoint reports failures in `detail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorField {
    Error,
    Detail,
}

/// Error envelope returned by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ApiErrorBody {
    /// Parses an error body leniently: anything that is not the expected
    /// envelope yields an empty body. A non-string `error` value is kept as its
    /// JSON text.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| {
            value.get(key).and_then(|v| match v {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
        };

        Self {
            error: text("error"),
            detail: text("detail"),
        }
    }

    /// The text held in `field`, if any
    #[must_use]
    pub fn message(&self, field: ErrorField) -> Option<&str> {
        match field {
            ErrorField::Error => self.error.as_deref(),
            ErrorField::Detail => self.detail.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn pin_keeps_unknown_fields() {
        let pin: Pin = serde_json::from_value(json!({
            "id": 7,
            "title": "sunset",
            "likes": 3,
        }))
        .unwrap();

        assert_eq!(pin.id, 7);
        assert_eq!(pin.title(), Some("sunset"));
        assert_eq!(pin.extra.get("likes"), Some(&json!(3)));
        assert_eq!(serde_json::to_value(&pin).unwrap()["likes"], json!(3));
    }

    #[test]
    fn pin_with_odd_field_shapes_still_loads() {
        let pins: Vec<Pin> =
            serde_json::from_value(json!([{ "id": 1, "image": { "url": "x" } }, { "id": 2 }]))
                .unwrap();

        assert_eq!(pins.len(), 2);
        assert_eq!(pins[0].image(), None);
        assert_eq!(pins[0].extra.get("image"), Some(&json!({ "url": "x" })));
        assert_eq!(pins[1].id, 2);
        assert_eq!(pins[1].description(), None);
    }

    #[test]
    fn pin_requires_id() {
        assert!(serde_json::from_value::<Pin>(json!({ "title": "no id" })).is_err());
    }

    #[test]
    fn login_response_flattens_tokens() {
        let response: LoginResponse = serde_json::from_value(json!({
            "user": { "id": 1, "username": "ada" },
            "access": "a",
            "refresh": "r",
        }))
        .unwrap();

        assert_eq!(response.user.username, "ada");
        assert_eq!(
            response.tokens,
            AuthTokens {
                access: "a".to_string(),
                refresh: "r".to_string(),
            }
        );
    }

    #[test]
    fn error_body_is_lenient() {
        let body = ApiErrorBody::from_value(&json!({ "error": "invalid" }));
        assert_eq!(body.message(ErrorField::Error), Some("invalid"));
        assert_eq!(body.message(ErrorField::Detail), None);

        let body = ApiErrorBody::from_value(&json!({ "error": { "title": ["required"] } }));
        assert_eq!(
            body.message(ErrorField::Error),
            Some(r#"{"title":["required"]}"#)
        );

        let body = ApiErrorBody::from_value(&json!(["not", "an", "object"]));
        assert_eq!(body, ApiErrorBody::default());
    }

    #[test]
    fn payload_validation() {
        let register = RegisterRequest {
            username: "ada".to_string(),
            email: "not-an-email".to_string(),
            password: "secret".to_string(),
        };
        assert!(register.validate().is_err());

        let pin = CreatePinRequest {
            title: "sunset".to_string(),
            description: None,
            image: "https://cdn.example.com/test-bucket/sunset.png".to_string(),
        };
        assert!(pin.validate().is_ok());

        let comment = CommentRequest {
            pin: 1,
            comment: String::new(),
        };
        assert!(comment.validate().is_err());
    }
}
