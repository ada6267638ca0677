// src/auth.rs

use std::sync::OnceLock;

use actix_web::{web, HttpResponse};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, error, info};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::{check_length, NewUser, User, UserId, UserView};
use crate::store::Store;

const BAD_CREDENTIALS: &str =
    "can not authenticate with the given credentials or the account has been deactivated";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// User id taken from a verified token, stored in request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUserId(pub UserId);

#[derive(Debug, Deserialize)]
pub struct SignupInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginInfo {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    pub name: String,
    pub token: String,
}

// JWT Creation
pub fn create_jwt(user_id: UserId, secret: &str, ttl_hours: i64) -> Result<String, ApiError> {
    let expiration = Utc::now() + Duration::hours(ttl_hours);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref())).map_err(|e| {
        error!("Error encoding token: {}", e);
        ApiError::Internal(e.to_string())
    })
}

// JWT Validation
pub fn validate_jwt(token: &str, secret: &str) -> Result<AuthenticatedUserId, String> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| format!("Token decode error: {}", e))?;
    token_data
        .claims
        .sub
        .parse()
        .map(AuthenticatedUserId)
        .map_err(|_| "Token subject is not a user id".to_string())
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates and stores a new account. The email is normalized before the
/// uniqueness check.
pub async fn register(store: &dyn Store, info: SignupInfo) -> Result<User, ApiError> {
    let email = normalize_email(&info.email);
    if !email_pattern().is_match(&email) {
        return Err(ApiError::Validation("enter a valid email address".to_string()));
    }
    check_length("email", &email, 1, 255)?;
    check_length("first_name", info.first_name.trim(), 1, 150)?;
    check_length("last_name", info.last_name.trim(), 1, 150)?;
    check_length("password", &info.password, 8, 128)?;

    let password_hash = hash(&info.password, DEFAULT_COST).map_err(|e| {
        error!("Error hashing password: {}", e);
        ApiError::Internal(e.to_string())
    })?;
    let user = store
        .insert_user(NewUser {
            first_name: info.first_name.trim().to_string(),
            last_name: info.last_name.trim().to_string(),
            email,
            password_hash,
        })
        .await
        .map_err(|e| ApiError::from_write(e, "a user with this email address already exists"))?;
    info!("User {} signed up", user.user_id);
    Ok(user)
}

/// Checks credentials and returns the matching active user. Every failure
/// carries the same message so callers cannot probe for accounts.
pub async fn authenticate(store: &dyn Store, info: LoginInfo) -> Result<User, ApiError> {
    let (email, password) = match (info.email, info.password) {
        (Some(email), Some(password)) => (email, password),
        _ => {
            return Err(ApiError::Validation(
                "please provide an email and a password".to_string(),
            ))
        }
    };

    let user = match store.user_by_email(&normalize_email(&email)).await? {
        Some(user) => user,
        None => {
            debug!("Login for unknown email");
            return Err(ApiError::Unauthenticated(BAD_CREDENTIALS.to_string()));
        }
    };
    let password_ok = verify(&password, &user.password).unwrap_or_else(|e| {
        error!("Error verifying password hash of user {}: {}", user.user_id, e);
        false
    });
    if !user.is_active || !password_ok {
        debug!("Login rejected for user {}", user.user_id);
        return Err(ApiError::Unauthenticated(BAD_CREDENTIALS.to_string()));
    }
    Ok(user)
}

// Signup Endpoint
pub async fn signup(
    data: web::Data<AppState>,
    signup_info: web::Json<SignupInfo>,
) -> Result<HttpResponse, ApiError> {
    let user = register(data.store.as_ref(), signup_info.into_inner()).await?;
    Ok(HttpResponse::Created().json(UserView::from(&user)))
}

// Login Endpoint
pub async fn login(
    data: web::Data<AppState>,
    login_info: web::Json<LoginInfo>,
) -> Result<HttpResponse, ApiError> {
    let user = authenticate(data.store.as_ref(), login_info.into_inner()).await?;
    let token = create_jwt(user.user_id, &data.config.jwt_secret, data.config.token_ttl_hours)?;
    info!("User {} logged in", user.user_id);
    Ok(HttpResponse::Ok().json(LoginResponse {
        user_id: user.user_id,
        name: user.full_name(),
        token,
    }))
}
