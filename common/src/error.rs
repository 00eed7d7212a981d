use std::fmt::Display;
use utoipa::ToSchema;

/// Standard error payload returned by the HTTP surface.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, ToSchema)]
pub struct ErrorInformation {
    /// A machine readable error type
    pub error: String,
    /// A human readable message
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorInformation {
    pub fn new(error: impl Display, message: impl Display) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            details: None,
        }
    }
}
