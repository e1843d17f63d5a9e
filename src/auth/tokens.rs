use rand::{rngs::OsRng, RngCore};
use sqlx::PgPool;
use uuid::Uuid;

const KEY_BYTES: usize = 20;

/// New opaque token key: 20 OS-random bytes, hex-encoded.
pub fn generate_key() -> String {
    let mut buf = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Returns the user's token key, creating one on first issuance.
pub async fn get_or_create(db: &PgPool, user_id: Uuid) -> anyhow::Result<String> {
    let existing = sqlx::query_scalar::<_, String>(
        r#"
        SELECT key FROM auth_tokens WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    if let Some(key) = existing {
        return Ok(key);
    }

    let key = generate_key();
    // Concurrent first issuance can race on the unique user_id; keep whichever
    // row landed first.
    let inserted = sqlx::query_scalar::<_, String>(
        r#"
        INSERT INTO auth_tokens (key, user_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET key = auth_tokens.key
        RETURNING key
        "#,
    )
    .bind(&key)
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(inserted)
}

/// Resolves a presented key to an active user id.
pub async fn find_active_user(db: &PgPool, key: &str) -> anyhow::Result<Option<Uuid>> {
    let user_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT u.id
        FROM auth_tokens t
        JOIN users u ON u.id = t.user_id
        WHERE t.key = $1 AND u.is_active
        "#,
    )
    .bind(key)
    .fetch_optional(db)
    .await?;
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_40_hex_chars() {
        let key = generate_key();
        assert_eq!(key.len(), 40);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn keys_do_not_repeat() {
        let a = generate_key();
        let b = generate_key();
        assert_ne!(a, b);
    }
}
