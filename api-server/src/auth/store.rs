use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

const USERNAME_MAX: usize = 80;
const PASSWORD_MIN: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    pub sub: String,
    pub jti: String,
    pub exp: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A verified bearer token and the user it belongs to
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub claims: AuthClaims,
    pub user: UserSummary,
}

/// Token issued at login
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserSummary,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    id: Uuid,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RevokedToken {
    jti: String,
    expires_at: usize,
}

#[derive(Debug, Default, Clone)]
struct AuthState {
    users: HashMap<Uuid, User>,
    revoked: HashMap<String, usize>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredAuthState {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    revoked_tokens: Vec<RevokedToken>,
}

impl From<StoredAuthState> for AuthState {
    fn from(value: StoredAuthState) -> Self {
        Self {
            users: value
                .users
                .into_iter()
                .map(|item| (item.id, item))
                .collect(),
            revoked: value
                .revoked_tokens
                .into_iter()
                .map(|item| (item.jti, item.expires_at))
                .collect(),
        }
    }
}

impl From<&AuthState> for StoredAuthState {
    fn from(value: &AuthState) -> Self {
        Self {
            users: value.users.values().cloned().collect(),
            revoked_tokens: value
                .revoked
                .iter()
                .map(|(jti, expires_at)| RevokedToken {
                    jti: jti.clone(),
                    expires_at: *expires_at,
                })
                .collect(),
        }
    }
}

/// Users, password hashes and revoked token ids, persisted as JSON
#[derive(Clone)]
pub struct AuthStore {
    state: Arc<RwLock<AuthState>>,
    file_path: PathBuf,
    jwt_secret: String,
    token_ttl_seconds: i64,
}

impl AuthStore {
    pub async fn new(
        base_dir: PathBuf,
        jwt_secret: impl Into<String>,
        token_ttl_seconds: i64,
    ) -> Result<Self, AuthError> {
        tokio::fs::create_dir_all(&base_dir).await.map_err(|err| {
            AuthError::Storage(format!("Failed to create auth directory: {}", err))
        })?;

        let file_path = base_dir.join("state.json");
        let state = load_state(&file_path).await?;

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            file_path,
            jwt_secret: jwt_secret.into(),
            token_ttl_seconds,
        })
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<UserSummary, AuthError> {
        let username = normalize_username(username)?;
        validate_password(password)?;

        let mut state = self.state.write().await;
        if state.users.values().any(|user| user.username == username) {
            return Err(AuthError::Conflict("Username already exists".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            username,
            password_hash: hash_password(password),
            created_at: Utc::now(),
        };
        let mut next = state.clone();
        next.users.insert(user.id, user.clone());
        persist_state(&self.file_path, &next).await?;
        *state = next;
        info!("Registered user {}", user.id);
        Ok(user_to_summary(&user))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginSession, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput(
                "Missing username or password".to_string(),
            ));
        }

        let state = self.state.read().await;
        let user = state
            .users
            .values()
            .find(|user| user.username == username)
            .cloned()
            .ok_or_else(|| AuthError::Unauthorized("Invalid credentials".to_string()))?;
        drop(state);
        if !verify_password(&user.password_hash, password) {
            return Err(AuthError::Unauthorized("Invalid credentials".to_string()));
        }

        let claims = self.issue_claims(user.id)?;
        let token = self.encode_claims(&claims)?;
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp as i64, 0)
            .ok_or_else(|| AuthError::Storage("Failed to encode token expiration".to_string()))?;
        Ok(LoginSession {
            token,
            expires_at,
            user: user_to_summary(&user),
        })
    }

    pub async fn authorize_bearer(&self, token: &str) -> Result<AuthSession, AuthError> {
        let claims = self.decode_claims(token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::Unauthorized("Invalid token subject".to_string()))?;

        let state = self.state.read().await;
        if state.revoked.contains_key(&claims.jti) {
            return Err(AuthError::Unauthorized("Token has been revoked".to_string()));
        }
        let user = state
            .users
            .get(&user_id)
            .ok_or_else(|| AuthError::Unauthorized("User not found".to_string()))?;

        Ok(AuthSession {
            user: user_to_summary(user),
            claims,
        })
    }

    /// Revoke the session's token; expired revocations are pruned on the way
    pub async fn logout(&self, session: &AuthSession) -> Result<(), AuthError> {
        let now = usize::try_from(Utc::now().timestamp()).unwrap_or_default();
        let mut state = self.state.write().await;
        let mut next = state.clone();
        next.revoked.retain(|_, expires_at| *expires_at > now);
        next.revoked
            .insert(session.claims.jti.clone(), session.claims.exp);
        persist_state(&self.file_path, &next).await?;
        *state = next;
        info!("User {} logged out", session.user.id);
        Ok(())
    }

    fn issue_claims(&self, user_id: Uuid) -> Result<AuthClaims, AuthError> {
        let exp = (Utc::now() + Duration::seconds(self.token_ttl_seconds)).timestamp();
        let exp = usize::try_from(exp)
            .map_err(|_| AuthError::Storage("Failed to encode token expiration".to_string()))?;

        Ok(AuthClaims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp,
        })
    }

    pub fn encode_claims(&self, claims: &AuthClaims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|err| AuthError::Storage(format!("Failed to encode JWT: {}", err)))
    }

    pub fn decode_claims(&self, token: &str) -> Result<AuthClaims, AuthError> {
        let decoded = decode::<AuthClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|err| AuthError::Unauthorized(format!("Invalid token: {}", err)))?;
        Ok(decoded.claims)
    }
}

fn user_to_summary(user: &User) -> UserSummary {
    UserSummary {
        id: user.id,
        username: user.username.clone(),
        created_at: user.created_at,
    }
}

async fn load_state(path: &Path) -> Result<AuthState, AuthError> {
    if !path.exists() {
        return Ok(AuthState::default());
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| AuthError::Storage(format!("Failed to read auth state: {}", err)))?;
    if content.trim().is_empty() {
        return Ok(AuthState::default());
    }
    let stored: StoredAuthState = serde_json::from_str(&content)
        .map_err(|err| AuthError::Storage(format!("Failed to parse auth state: {}", err)))?;
    Ok(stored.into())
}

async fn persist_state(path: &Path, state: &AuthState) -> Result<(), AuthError> {
    let content = serde_json::to_string_pretty(&StoredAuthState::from(state))
        .map_err(|err| AuthError::Storage(format!("Failed to serialize auth state: {}", err)))?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|err| {
            AuthError::Storage(format!("Failed to create auth parent dir: {}", err))
        })?;
    }
    tokio::fs::write(path, content)
        .await
        .map_err(|err| AuthError::Storage(format!("Failed to write auth state: {}", err)))?;
    Ok(())
}

fn normalize_username(username: &str) -> Result<String, AuthError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(AuthError::InvalidInput(
            "Missing username or password".to_string(),
        ));
    }
    if trimmed.chars().count() > USERNAME_MAX {
        return Err(AuthError::InvalidInput(format!(
            "Username must be at most {} characters",
            USERNAME_MAX
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::InvalidInput(
            "Missing username or password".to_string(),
        ));
    }
    if password.len() < PASSWORD_MIN {
        return Err(AuthError::InvalidInput(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN
        )));
    }
    Ok(())
}

fn hash_password(password: &str) -> String {
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();

    format!(
        "v1${}${}",
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(digest)
    )
}

fn verify_password(stored_hash: &str, password: &str) -> bool {
    let mut parts = stored_hash.split('$');
    let (Some("v1"), Some(encoded_salt), Some(encoded_digest)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    let Ok(salt) = URL_SAFE_NO_PAD.decode(encoded_salt) else {
        return false;
    };
    let Ok(expected_digest) = URL_SAFE_NO_PAD.decode(encoded_digest) else {
        return false;
    };

    let mut hasher = Sha256::new();
    hasher.update(&salt);
    hasher.update(password.as_bytes());
    let actual_digest = hasher.finalize();
    expected_digest == actual_digest.as_slice()
}
