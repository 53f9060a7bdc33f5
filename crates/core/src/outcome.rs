use serde::{Deserialize, Serialize};

use crate::records::Role;

/// JSON envelope returned by login and by every failed request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Outcome {
    /// Successful outcome with a message
    pub fn success(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            role: None,
            username: None,
        }
    }

    /// Failed outcome with a message
    pub fn failure(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            role: None,
            username: None,
        }
    }

    /// Successful login: "Doctor login successful."
    pub fn logged_in(role: Role, username: &str) -> Self {
        Self {
            success: true,
            message: format!("{} login successful.", role.title()),
            role: Some(role),
            username: Some(username.to_string()),
        }
    }
}
