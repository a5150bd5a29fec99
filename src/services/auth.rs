//! Password authentication and the signed credential.
//!
//! Passwords are stored as salted Argon2id hashes. A successful login or
//! registration yields a [`Session`]: an HS256 JWT carrying the user's id,
//! name, email and admin flag, valid for seven days.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{NewUser, User};
use crate::store::Store;
use crate::{Result, ShopError};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(length(min = 2, max = 255, message = "Name must be 2 to 255 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"), length(max = 255, message = "Email is too long"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// JWT payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub email: String,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

/// Identity resolved from a valid credential.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

impl CurrentUser {
    /// Grants the admin capability, or refuses with `Forbidden`.
    pub fn admin(&self) -> Result<Admin> {
        if self.is_admin { Ok(Admin(self.clone())) } else { Err(ShopError::Forbidden) }
    }
}

impl From<&User> for CurrentUser {
    fn from(u: &User) -> Self {
        Self { id: u.id, name: u.name.clone(), email: u.email.clone(), is_admin: u.is_admin }
    }
}

/// Proof that the caller passed the admin gate. Only [`CurrentUser::admin`]
/// can construct one, and every admin operation takes it as an argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Admin(CurrentUser);

impl Admin {
    pub fn user(&self) -> &CurrentUser { &self.0 }
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: CurrentUser,
    #[serde(skip_serializing)]
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AuthSettings {
    pub secret: String,
    pub token_ttl: Duration,
}

impl AuthSettings {
    pub const TOKEN_TTL_DAYS: i64 = 7;

    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into(), token_ttl: Duration::days(Self::TOKEN_TTL_DAYS) }
    }
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings").field("token_ttl", &self.token_ttl).finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    settings: AuthSettings,
    hasher: Argon2<'static>,
}

fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

impl AuthService {
    pub fn new(store: Arc<dyn Store>, settings: AuthSettings) -> Self {
        Self { store, settings, hasher: Argon2::default() }
    }

    /// Replaces the password hasher, e.g. with cheaper parameters.
    pub fn with_hasher(mut self, hasher: Argon2<'static>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn token_ttl(&self) -> Duration { self.settings.token_ttl }

    #[instrument(skip_all, fields(email = %form.email))]
    pub async fn register(&self, form: RegisterForm) -> Result<Session> {
        form.validate()?;
        let email = normalize_email(&form.email);
        if self.store.user_by_email(&email).await?.is_some() {
            return Err(ShopError::DuplicateUser);
        }
        let password_hash = self.hash_password(form.password).await?;
        let user = self
            .store
            .insert_user(&NewUser { name: form.name.trim().to_string(), email, password_hash })
            .await?;
        info!(user_id = %user.id, "user registered");
        self.issue(&CurrentUser::from(&user))
    }

    /// Unknown email and wrong password fail identically.
    #[instrument(skip_all, fields(email = %form.email))]
    pub async fn login(&self, form: LoginForm) -> Result<Session> {
        form.validate()?;
        let Some(user) = self.store.user_by_email(&normalize_email(&form.email)).await? else {
            debug!("login for unknown email");
            return Err(ShopError::InvalidCredentials);
        };
        if !self.verify_password(form.password, user.password_hash.clone()).await? {
            debug!(user_id = %user.id, "login with wrong password");
            return Err(ShopError::InvalidCredentials);
        }
        info!(user_id = %user.id, "user logged in");
        self.issue(&CurrentUser::from(&user))
    }

    /// Signs a credential for `user`, valid for the configured TTL.
    pub fn issue(&self, user: &CurrentUser) -> Result<Session> {
        self.issue_at(user, Utc::now())
    }

    fn issue_at(&self, user: &CurrentUser, now: DateTime<Utc>) -> Result<Session> {
        let expires_at = now + self.settings.token_ttl;
        let claims = Claims {
            sub: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.settings.secret.as_bytes()),
        )
        .map_err(|e| ShopError::Internal(format!("token creation failed: {e}")))?;
        Ok(Session { user: user.clone(), token, expires_at })
    }

    /// Checks signature and expiry; any failure means "not authenticated".
    pub fn verify(&self, token: &str) -> Result<CurrentUser> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let claims = decode::<Claims>(token, &DecodingKey::from_secret(self.settings.secret.as_bytes()), &validation)
            .map_err(|e| {
                debug!(error = %e, "credential rejected");
                ShopError::Unauthorized
            })?
            .claims;
        Ok(CurrentUser { id: claims.sub, name: claims.name, email: claims.email, is_admin: claims.is_admin })
    }

    async fn hash_password(&self, password: String) -> Result<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            hasher
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| ShopError::Internal(format!("password hashing failed: {e}")))
        })
        .await
        .map_err(|e| ShopError::Internal(e.to_string()))?
    }

    async fn verify_password(&self, password: String, stored_hash: String) -> Result<bool> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || match PasswordHash::new(&stored_hash) {
            Ok(parsed) => hasher.verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        })
        .await
        .map_err(|e| ShopError::Internal(e.to_string()))
    }
}
