use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{Principal, Session, TokenPair, User},
    storage::UserStore,
};

use super::validation::{is_valid_email, FieldErrors, EMAIL_INVALID, EMAIL_REQUIRED};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,     // user_id
    pub sid: String,     // session_id
    pub kind: TokenKind, // access or refresh
    pub iss: String,     // issuer
    pub exp: i64,        // expiry
    pub iat: i64,        // issued at
}

impl Claims {
    pub fn principal(&self) -> AppResult<Principal> {
        Ok(Principal {
            user_id: Uuid::parse_str(&self.sub).map_err(|_| AppError::InvalidToken)?,
            session_id: Uuid::parse_str(&self.sid).map_err(|_| AppError::InvalidToken)?,
        })
    }
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    config: Arc<Config>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, config: Arc<Config>) -> Self {
        Self { users, config }
    }

    // Registration
    pub async fn sign_up(&self, email: &str, password: &str) -> AppResult<(User, TokenPair)> {
        let email = normalize_email(email)?;

        if password.chars().count() < self.config.auth.min_password_len {
            let mut errors = FieldErrors::default();
            errors.insert(
                "password",
                &format!(
                    "Password must be at least {} characters",
                    self.config.auth.min_password_len
                ),
            );
            return Err(AppError::Validation(errors));
        }

        if self.users.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::UserAlreadyExists);
        }

        let password_hash = hash(password, self.config.auth.bcrypt_cost)
            .map_err(|e| anyhow::anyhow!("Hash error: {}", e))?;
        let user = self.users.insert_user(&email, &password_hash).await?;
        tracing::info!("Registered user {}", user.id);

        let tokens = self.open_session(user.id).await?;
        Ok((user, tokens))
    }

    // Login
    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<(User, TokenPair)> {
        let email = email.trim().to_lowercase();

        let user = self
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let valid = verify(password, &user.password_hash)
            .map_err(|e| anyhow::anyhow!("Verify error: {}", e))?;
        if !valid {
            tracing::debug!("Rejected sign-in for {}", user.id);
            return Err(AppError::InvalidCredentials);
        }

        let tokens = self.open_session(user.id).await?;
        Ok((user, tokens))
    }

    // Token validation
    pub fn validate_token(&self, token: &str, kind: TokenKind) -> AppResult<Claims> {
        let key = DecodingKey::from_secret(self.config.jwt.secret.as_bytes());
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.jwt.issuer]);

        let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| {
            if matches!(e.kind(), ErrorKind::ExpiredSignature) {
                AppError::TokenExpired
            } else {
                tracing::debug!("Rejected token: {}", e);
                AppError::InvalidToken
            }
        })?;

        if token_data.claims.kind != kind {
            return Err(AppError::InvalidToken);
        }
        Ok(token_data.claims)
    }

    /// Resolves an access token to the principal, requiring a live session.
    pub async fn authenticate(&self, access_token: &str) -> AppResult<Principal> {
        let claims = self.validate_token(access_token, TokenKind::Access)?;
        let principal = claims.principal()?;
        self.live_session(&principal).await?;
        Ok(principal)
    }

    // Refresh token
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let claims = self.validate_token(refresh_token, TokenKind::Refresh)?;
        let principal = claims.principal()?;
        self.live_session(&principal).await?;

        let session_expiry = self.refresh_expiry(Utc::now());
        self.users
            .extend_session(principal.session_id, session_expiry)
            .await?
            .ok_or(AppError::InvalidToken)?;

        self.generate_token_pair(principal.user_id, principal.session_id)
    }

    // Logout
    pub async fn sign_out(&self, principal: &Principal) -> AppResult<()> {
        self.users.delete_session(principal.session_id).await?;
        tracing::info!("Session {} signed out", principal.session_id);
        Ok(())
    }

    // Logout all devices
    pub async fn sign_out_all(&self, principal: &Principal) -> AppResult<u64> {
        let removed = self.users.delete_user_sessions(principal.user_id).await?;
        tracing::info!("Closed {} session(s) for {}", removed, principal.user_id);
        Ok(removed)
    }

    pub async fn current_user(&self, principal: &Principal) -> AppResult<User> {
        self.users
            .find_user(principal.user_id)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    // Helper methods
    async fn live_session(&self, principal: &Principal) -> AppResult<Session> {
        let session = self
            .users
            .find_session(principal.session_id)
            .await?
            .filter(|s| s.user_id == principal.user_id)
            .ok_or(AppError::InvalidToken)?;

        if session.is_expired(Utc::now()) {
            return Err(AppError::TokenExpired);
        }
        Ok(session)
    }

    async fn open_session(&self, user_id: Uuid) -> AppResult<TokenPair> {
        let session = self
            .users
            .insert_session(user_id, self.refresh_expiry(Utc::now()))
            .await?;
        self.generate_token_pair(user_id, session.id)
    }

    fn refresh_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(self.config.jwt.refresh_token_ttl.as_secs() as i64)
    }

    fn generate_token_pair(&self, user_id: Uuid, session_id: Uuid) -> AppResult<TokenPair> {
        let now = Utc::now();
        let access_exp = now + Duration::seconds(self.config.jwt.access_token_ttl.as_secs() as i64);
        let refresh_exp = self.refresh_expiry(now);

        let claims = |kind: TokenKind, exp: DateTime<Utc>| Claims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            kind,
            iss: self.config.jwt.issuer.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        let key = EncodingKey::from_secret(self.config.jwt.secret.as_bytes());

        let access_token = encode(&Header::default(), &claims(TokenKind::Access, access_exp), &key)?;
        let refresh_token =
            encode(&Header::default(), &claims(TokenKind::Refresh, refresh_exp), &key)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_at: access_exp,
        })
    }
}

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    let message = if email.is_empty() {
        EMAIL_REQUIRED
    } else if !is_valid_email(&email) {
        EMAIL_INVALID
    } else {
        return Ok(email);
    };

    let mut errors = FieldErrors::default();
    errors.insert("email", message);
    Err(AppError::Validation(errors))
}
