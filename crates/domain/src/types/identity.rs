//! Authenticated user identity
//!
//! Returned by the login and current-identity endpoints.

use serde::{Deserialize, Serialize};

/// Identity of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub role: String,
}

impl Identity {
    /// Name for headers and menus, falling back to the email address
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(name), None) | (None, Some(name)) => name.to_string(),
            (None, None) => self.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(first: Option<&str>, last: Option<&str>) -> Identity {
        Identity {
            id: "u1".to_string(),
            email: "a@b.com".to_string(),
            first_name: first.map(str::to_string),
            last_name: last.map(str::to_string),
            role: "admin".to_string(),
        }
    }

    #[test]
    fn display_name_prefers_full_name() {
        assert_eq!(identity(Some("Ada"), Some("Lovelace")).display_name(), "Ada Lovelace");
        assert_eq!(identity(Some("Ada"), None).display_name(), "Ada");
        assert_eq!(identity(None, None).display_name(), "a@b.com");
    }

    #[test]
    fn deserializes_without_optional_names() {
        let user: Identity =
            serde_json::from_str(r#"{"id":"u1","email":"a@b.com","role":"admin"}"#).unwrap();
        assert_eq!(user, identity(None, None));
    }
}
