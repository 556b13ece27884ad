use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, SecondsFormat, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use uuid::Uuid;

use crate::config::Config;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{
    Claims, CreateUserRequest, LoginRequest, LoginResponse, User, UserIdentity, UserResponse,
};

/// Authentication service
pub struct AuthService;

impl AuthService {
    /// Register a new user
    pub async fn register(db: &Database, req: CreateUserRequest) -> Result<UserResponse> {
        let email = req.email.trim().to_lowercase();

        // Validate email
        if !email.contains('@') {
            return Err(AppError::BadRequest("Invalid email format".to_string()));
        }

        // Validate password
        if req.password.len() < 6 {
            return Err(AppError::BadRequest(
                "Password must be at least 6 characters".to_string(),
            ));
        }

        // Check if email already exists
        let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(db.pool())
            .await?;

        if existing.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let full_name = req
            .full_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        let password_hash = Self::hash_password(&req.password)?;

        let user_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        sqlx::query(
            r#"
            INSERT INTO users (id, email, full_name, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user_id)
        .bind(&email)
        .bind(&full_name)
        .bind(&password_hash)
        .bind(&now)
        .execute(db.pool())
        .await?;

        let user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(&user_id)
            .fetch_one(db.pool())
            .await?;

        tracing::info!("Registered user {}", user.id);
        Ok(UserResponse::from(user))
    }

    /// Login user
    pub async fn login(db: &Database, config: &Config, req: LoginRequest) -> Result<LoginResponse> {
        let email = req.email.trim().to_lowercase();

        let user: User = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

        if !Self::verify_password(&req.password, &user.password_hash)? {
            return Err(AppError::Unauthorized("Invalid email or password".to_string()));
        }

        let access_token = Self::generate_access_token(&user, config)?;

        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: config.jwt.access_token_expire_minutes * 60,
        })
    }

    /// Resolve a bearer token to the identity it was issued for. The user must still exist.
    pub async fn current_user(db: &Database, config: &Config, token: &str) -> Result<UserIdentity> {
        let claims = Self::validate_token(token, config)?;

        let (id, email): (String, String) =
            sqlx::query_as("SELECT id, email FROM users WHERE id = ?")
                .bind(&claims.sub)
                .fetch_optional(db.pool())
                .await?
                .ok_or_else(|| AppError::Unauthorized("Invalid token".to_string()))?;

        Ok(UserIdentity { id, email })
    }

    /// Generate access token
    fn generate_access_token(user: &User, config: &Config) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::minutes(config.jwt.access_token_expire_minutes as i64);

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt.secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Validate access token
    pub fn validate_token(token: &str, config: &Config) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt.secret.as_bytes()),
            &validation,
        )?;

        Ok(token_data.claims)
    }

    /// Hash password using Argon2
    fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?
            .to_string();

        Ok(password_hash)
    }

    /// Verify password against hash
    fn verify_password(password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
