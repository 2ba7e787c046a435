use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;

use chirp_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::AppError;
use crate::state::{AppState, run_db};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 32;
pub const MIN_PASSWORD_LEN: usize = 8;

pub fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if len < MIN_USERNAME_LEN {
        return Err(AppError::invalid("username too short"));
    }
    if len > MAX_USERNAME_LEN {
        return Err(AppError::invalid("username too long"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::invalid("password too short"));
    }
    Ok(())
}

/// Hash with Argon2id and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = req.username.trim().to_string();
    validate_username(&username)?;
    validate_password(&req.password)?;

    let password_hash = hash_password(&req.password)?;
    let is_admin = state.admin_username.as_deref() == Some(username.as_str());

    let name = username.clone();
    let user_id = run_db(&state, move |db| db.create_user(&name, &password_hash, is_admin))
        .await?
        .ok_or(AppError::Conflict("username already exists"))?;

    info!("Registered user {} ({})", username, user_id);

    let token = create_token(&state.jwt_secret, user_id)?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = req.username.trim().to_string();
    let user = run_db(&state, move |db| db.get_user_by_username(&name))
        .await?
        .filter(|u| !u.is_deleted)
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&req.password, &user.password) {
        return Err(AppError::Unauthorized);
    }

    let token = create_token(&state.jwt_secret, user.id)?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        username: user.username.unwrap_or_default(),
        token,
    }))
}

pub fn create_token(secret: &str, user_id: i64) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token encoding failed: {}", e)))?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-phc-string"));
    }

    #[test]
    fn username_and_password_policy() {
        assert!(validate_username("al").is_err());
        assert!(validate_username("alice").is_ok());
        assert!(validate_username(&"x".repeat(33)).is_err());
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}
