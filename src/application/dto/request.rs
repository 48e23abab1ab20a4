//! Request DTOs
//!
//! Data structures for API request bodies and query strings.

use serde::{Deserialize, Deserializer};
use validator::{Validate, ValidationError};

use crate::application::services::SendMessageDto;
use crate::domain::MessageType;

/// Create chatroom request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateChatroomRequest {
    #[validate(length(min = 3, max = 100, message = "Name must be 3-100 characters"))]
    pub name: String,
}

/// Send message request
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(custom(function = "validate_message_type"))]
    pub message_type: String,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(length(max = 4000, message = "Text must be at most 4000 characters"))]
    pub text_content: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(
        url(message = "Media URL must be a valid URL"),
        length(max = 2048, message = "Media URL must be at most 2048 characters")
    )]
    pub media_url: Option<String>,
}

/// Clients send `""` for fields a message type does not use.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

fn validate_message_type(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<MessageType>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("message_type").with_message("Unknown message type".into()))
}

impl From<SendMessageRequest> for SendMessageDto {
    fn from(request: SendMessageRequest) -> Self {
        Self {
            message_type: request.message_type,
            text_content: request.text_content,
            media_url: request.media_url,
        }
    }
}

/// Message history query parameters.
///
/// `limit` is kept as text: a value that does not parse is ignored and the
/// default page size applies.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQueryParams {
    pub limit: Option<String>,
}

impl MessageQueryParams {
    pub fn limit(&self) -> Option<i64> {
        self.limit.as_deref().and_then(|l| l.trim().parse().ok())
    }
}

/// Token passed on the WebSocket upgrade URL by browser clients.
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_message_request_validation() {
        let valid = SendMessageRequest {
            message_type: "picture".into(),
            text_content: None,
            media_url: Some("https://cdn.example.com/a.png".into()),
        };
        assert!(valid.validate().is_ok());

        let bad_type = SendMessageRequest {
            message_type: "sticker".into(),
            text_content: Some("hi".into()),
            media_url: None,
        };
        let errors = bad_type.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("message_type"));

        let bad_url = SendMessageRequest {
            message_type: "picture".into(),
            text_content: None,
            media_url: Some("not a url".into()),
        };
        let errors = bad_url.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("media_url"));
    }

    #[test]
    fn empty_strings_deserialize_as_absent() {
        let request: SendMessageRequest = serde_json::from_str(
            r#"{"message_type": "text", "text_content": "hi", "media_url": ""}"#,
        )
        .unwrap();
        assert_eq!(request.media_url, None);
        assert!(request.validate().is_ok());

        let request: SendMessageRequest =
            serde_json::from_str(r#"{"message_type": "picture", "media_url": "https://x.io/a.png"}"#)
                .unwrap();
        assert_eq!(request.text_content, None);
    }

    #[test]
    fn unparsable_limit_is_ignored() {
        let query = |limit: &str| MessageQueryParams {
            limit: Some(limit.into()),
        };
        assert_eq!(query("20").limit(), Some(20));
        assert_eq!(query("abc").limit(), None);
        assert_eq!(MessageQueryParams::default().limit(), None);
    }
}
