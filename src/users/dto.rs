use serde::{Deserialize, Serialize};

use super::repo::User;

/// Request body for account creation.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// Request body for token issuance.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub email: String,
    pub name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            name: user.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_response_never_leaks_credentials() {
        let response = UserResponse {
            email: "test@example.com".to_string(),
            name: "Test".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn update_request_fields_are_optional() {
        let req: UpdateMeRequest = serde_json::from_str(r#"{"name": "new name"}"#).unwrap();
        assert_eq!(req.name.as_deref(), Some("new name"));
        assert!(req.email.is_none());
        assert!(req.password.is_none());
    }
}
