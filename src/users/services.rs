use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::info;

use super::dto::UpdateMeRequest;
use super::repo::User;
use crate::auth::password::{hash_password, verify_password};
use crate::error::ApiError;

const MIN_PASSWORD_LEN: usize = 5;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() {
        return Err(ApiError::field("email", "must not be empty"));
    }
    if !is_valid_email(email) {
        return Err(ApiError::field("email", "enter a valid email address"));
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::field(
            "password",
            format!("must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}

async fn create(
    db: &PgPool,
    email: &str,
    password: &str,
    name: &str,
    is_staff: bool,
    is_superuser: bool,
) -> Result<User, ApiError> {
    let email = normalize_email(email);
    check_email(&email)?;
    check_password(password)?;

    if User::find_by_email(db, &email).await?.is_some() {
        return Err(ApiError::field("email", "already registered"));
    }

    let hash = hash_password(password)?;
    let user = User::create(db, &email, name, &hash, is_staff, is_superuser).await?;
    info!(user_id = %user.id, email = %user.email, "user created");
    Ok(user)
}

pub async fn create_user(
    db: &PgPool,
    email: &str,
    password: &str,
    name: &str,
) -> Result<User, ApiError> {
    create(db, email, password, name, false, false).await
}

/// Account with elevated flags, used by the CLI bootstrap.
pub async fn create_superuser(db: &PgPool, email: &str, password: &str) -> Result<User, ApiError> {
    create(db, email, password, "", true, true).await
}

/// Checks an email+password pair against the store. `None` means the
/// credentials do not match any active account.
pub async fn authenticate(
    db: &PgPool,
    email: &str,
    password: &str,
) -> Result<Option<User>, ApiError> {
    let email = normalize_email(email);
    let Some(user) = User::find_by_email(db, &email).await? else {
        return Ok(None);
    };
    if !user.is_active || !verify_password(password, &user.password_hash)? {
        return Ok(None);
    }
    Ok(Some(user))
}

/// Applies a partial profile update; a supplied password is rehashed.
pub async fn update_user(
    db: &PgPool,
    user: User,
    changes: UpdateMeRequest,
) -> Result<User, ApiError> {
    let email = match changes.email {
        Some(raw) => {
            let email = normalize_email(&raw);
            check_email(&email)?;
            if email != user.email && User::find_by_email(db, &email).await?.is_some() {
                return Err(ApiError::field("email", "already registered"));
            }
            email
        }
        None => user.email.clone(),
    };

    let name = changes.name.unwrap_or_else(|| user.name.clone());

    let password_hash = match changes.password {
        Some(password) => {
            check_password(&password)?;
            hash_password(&password)?
        }
        None => user.password_hash.clone(),
    };

    let updated = User::update_profile(db, user.id, &email, &name, &password_hash).await?;
    info!(user_id = %updated.id, "profile updated");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plausible_emails() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("one"));
        assert!(!is_valid_email("no-at.example.com"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_email("  igl@Gmail.COM "), "igl@gmail.com");
        assert_eq!(normalize_email("Test@Example.Com"), "test@example.com");
    }

    #[test]
    fn empty_email_is_a_field_error() {
        let err = check_email("").unwrap_err();
        match err {
            ApiError::Validation(errors) => assert!(errors.contains_key("email")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn short_password_is_a_field_error() {
        assert!(check_password("tes").is_err());
        assert!(check_password("testpass").is_ok());
    }
}
