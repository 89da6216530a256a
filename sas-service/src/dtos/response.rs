use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response envelope shared by every endpoint: `code` is 1 on success and
/// 0 on failure, `data` carries the payload and serializes as null when
/// there is none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: i32,
    pub message: String,
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self {
            code: 1,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            code: 0,
            message: message.into(),
            data: None,
        }
    }
}
