// API-key identity
//
// Registration mints a random bearer key and keeps only its SHA-256. Handlers
// authenticate the key and pass the resolved user id explicitly into the
// executors; there is no implicit "current user" anywhere below this layer.

use axum::http::{header, HeaderMap};
use chrono::Utc;
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{MarketError, Result};
use crate::models::User;
use crate::store::LedgerStore;

const UNAUTHORIZED_MESSAGE: &str =
    "Unauthorized. Provide a valid API key in Authorization: Bearer <key>";

pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_api_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Create a funded account and hand back the record plus its plaintext key.
/// The key is shown exactly once; only the hash is persisted.
pub fn register_user(
    store: &LedgerStore,
    name: &str,
    starting_balance: f64,
) -> Result<(User, String)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(MarketError::InvalidArgument("name is required".into()));
    }
    if name.len() > 100 {
        return Err(MarketError::InvalidArgument(
            "name must be 100 characters or less".into(),
        ));
    }

    let api_key = generate_api_key();
    let user = User {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        balance: starting_balance,
        api_key_hash: hash_api_key(&api_key),
        created_at: Utc::now(),
    };
    store.create_user(&user)?;

    tracing::info!(user = %user.id, name = %user.name, balance = starting_balance, "user registered");
    Ok((user, api_key))
}

/// Resolve the bearer key in the Authorization header to a user.
pub fn authenticate(store: &LedgerStore, headers: &HeaderMap) -> Result<User> {
    let key = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");
    if key.is_empty() {
        return Err(MarketError::Unauthorized(UNAUTHORIZED_MESSAGE.into()));
    }

    store
        .get_user_by_api_key_hash(&hash_api_key(key))?
        .ok_or_else(|| MarketError::Unauthorized(UNAUTHORIZED_MESSAGE.into()))
}
