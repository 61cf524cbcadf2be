use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dto::auth::{
        ChangePasswordRequest, Claims, LoginRequest, RegisterRequest, RegisterResponse,
        TokenResponse, UpdateProfileRequest,
    },
    entity::{
        Users,
        users::{ActiveModel as UserActive, Column as UserCol, Model as UserModel, Role},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 6;

/// Normalize a phone number to E.164: leading `+`, 8-15 digits, nothing else.
pub fn normalize_phone(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('+').ok_or_else(|| {
        AppError::Validation("phone_number must use international format, e.g. +84912345678".into())
    })?;

    if digits.len() < 8
        || digits.len() > 15
        || !digits.chars().all(|c| c.is_ascii_digit())
        || digits.starts_with('0')
    {
        return Err(AppError::Validation("phone_number is not a valid E.164 number".into()));
    }

    Ok(format!("+{digits}"))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn issue_token(config: &AppConfig, user_id: Uuid) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::days(config.token_ttl_days))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("failed to compute token expiry")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok(token)
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<RegisterResponse>> {
    let phone_number = normalize_phone(&payload.phone_number)?;

    let full_name = payload.full_name.trim().to_string();
    if full_name.is_empty() || full_name.len() > 100 {
        return Err(AppError::Validation(
            "full_name must be between 1 and 100 characters".into(),
        ));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let existing = Users::find()
        .filter(UserCol::PhoneNumber.eq(phone_number.as_str()))
        .one(&*state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Phone number already registered".into()));
    }

    let password_hash = hash_password(&payload.password)?;

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        phone_number: Set(phone_number),
        full_name: Set(full_name),
        password_hash: Set(password_hash),
        role: Set(Role::User),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&*state.orm)
    .await
    .map_err(|err| AppError::conflict_on_unique(err, "Phone number already registered"))?;

    tracing::info!(user_id = %user.id, "user registered");

    Ok(ApiResponse::success(
        "Registration successful",
        RegisterResponse {
            user_id: user.id.to_string(),
            phone_number: user.phone_number,
            full_name: user.full_name,
        },
        None,
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<TokenResponse>> {
    let phone_number = normalize_phone(&payload.phone_number)?;

    let user = Users::find()
        .filter(UserCol::PhoneNumber.eq(phone_number.as_str()))
        .one(&*state.orm)
        .await?;

    // Same rejection for unknown phone, wrong password, and inactive account.
    let user = match user {
        Some(u) if verify_password(&payload.password, &u.password_hash) && u.is_active => u,
        _ => return Err(AppError::Unauthorized),
    };

    let access_token = issue_token(&state.config, user.id)?;

    Ok(ApiResponse::success(
        "Logged in",
        TokenResponse {
            access_token,
            token_type: "bearer".into(),
            user: user_from_entity(user),
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_me(state: &AppState, auth: &AuthUser) -> AppResult<ApiResponse<User>> {
    let user = Users::find_by_id(auth.user_id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(ApiResponse::success("OK", user_from_entity(user), None))
}

pub async fn update_profile(
    state: &AppState,
    auth: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    let user = Users::find_by_id(auth.user_id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let mut active: UserActive = user.into();
    if let Some(full_name) = payload.full_name {
        let full_name = full_name.trim().to_string();
        if full_name.is_empty() || full_name.len() > 100 {
            return Err(AppError::Validation(
                "full_name must be between 1 and 100 characters".into(),
            ));
        }
        active.full_name = Set(full_name);
    }
    let user = active.update(&*state.orm).await?;

    Ok(ApiResponse::success("Profile updated", user_from_entity(user), None))
}

pub async fn change_password(
    state: &AppState,
    auth: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "new_password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let user = Users::find_by_id(auth.user_id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&payload.current_password, &user.password_hash) {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }

    let password_hash = hash_password(&payload.new_password)?;
    let mut active: UserActive = user.into();
    active.password_hash = Set(password_hash);
    active.update(&*state.orm).await?;

    Ok(ApiResponse::success(
        "Password changed",
        serde_json::json!({}),
        None,
    ))
}

pub fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        phone_number: model.phone_number,
        full_name: model.full_name,
        role: model.role,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_phone_accepts_e164() {
        assert_eq!(normalize_phone("+14155552671").unwrap(), "+14155552671");
        assert_eq!(normalize_phone(" +84912345678 ").unwrap(), "+84912345678");
    }

    #[test]
    fn normalize_phone_rejects_garbage() {
        assert!(normalize_phone("14155552671").is_err());
        assert!(normalize_phone("+1 415 555").is_err());
        assert!(normalize_phone("+12ab34567").is_err());
        assert!(normalize_phone("+123").is_err());
        assert!(normalize_phone("+1234567890123456").is_err());
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("secret1").unwrap();
        assert_ne!(hash, "secret1");
        assert!(!hash.contains("secret1"));
        assert!(verify_password("secret1", &hash));
        assert!(!verify_password("secret2", &hash));
    }

    #[test]
    fn token_round_trip() {
        use jsonwebtoken::{DecodingKey, Validation, decode};

        let config = AppConfig {
            database_url: String::new(),
            migrations_dir: "migrations".into(),
            host: "127.0.0.1".into(),
            port: 3000,
            jwt_secret: "test-secret".into(),
            token_ttl_days: 7,
            cors_origins: vec![],
            gemini_api_key: None,
            gemini_base_url: String::new(),
        };
        let user_id = Uuid::new_v4();
        let token = issue_token(&config, user_id).unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, user_id.to_string());
    }
}
