//! Accounts and sessions. The rest of the crate only sees account ids and
//! `AuthUser`; password hashes and tokens stay in here.

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    ActiveValue::NotSet,
};
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    entity::{
        auth_accounts::{
            ActiveModel as AccountActive, Column as AccountCol, Entity as AuthAccounts,
            Model as AccountModel,
        },
        auth_sessions::{ActiveModel as SessionActive, Entity as AuthSessions, Model as SessionModel},
        users::{Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_SESSION: &str = "Session expired or revoked";

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn issue_token(
    secret: &str,
    account_id: Uuid,
    session_id: Uuid,
    expires_at: DateTime<Utc>,
) -> AppResult<String> {
    let claims = Claims {
        sub: account_id.to_string(),
        sid: session_id.to_string(),
        exp: expires_at.timestamp().max(0) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

/// Verify signature and expiry; returns (account id, session id).
pub fn decode_token(secret: &str, token: &str) -> AppResult<(Uuid, Uuid)> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    let account_id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid account id in token".into()))?;
    let session_id = Uuid::parse_str(&decoded.claims.sid)
        .map_err(|_| AppError::Unauthorized("Invalid session id in token".into()))?;
    Ok((account_id, session_id))
}

pub async fn create_account<C>(conn: &C, email: &str, password: &str) -> AppResult<AccountModel>
where
    C: ConnectionTrait,
{
    let existing = AuthAccounts::find()
        .filter(AccountCol::Email.eq(email))
        .one(conn)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest("Email is already taken".into()));
    }

    let account = AccountActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set(hash_password(password)?),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;
    tracing::info!(account_id = %account.id, "identity account created");
    Ok(account)
}

/// Delete an account; its profile row and sessions go with it.
pub async fn delete_account<C>(conn: &C, account_id: Uuid) -> AppResult<()>
where
    C: ConnectionTrait,
{
    let result = AuthAccounts::delete_by_id(account_id).exec(conn).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    tracing::info!(%account_id, "identity account deleted");
    Ok(())
}

pub struct SignedIn {
    pub token: String,
    pub session: SessionModel,
    pub profile: UserModel,
}

pub async fn sign_in(state: &AppState, email: &str, password: &str) -> AppResult<SignedIn> {
    let account = AuthAccounts::find()
        .filter(AccountCol::Email.eq(email))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    if !verify_password(password, &account.password_hash)? {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let profile = Users::find()
        .filter(UserCol::AuthUserId.eq(account.id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Failed to load user profile".into()))?;

    let expires_at = Utc::now()
        .checked_add_signed(Duration::hours(state.config.session_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let session = SessionActive {
        id: Set(Uuid::new_v4()),
        account_id: Set(account.id),
        expires_at: Set(expires_at.into()),
        revoked_at: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let token = issue_token(&state.config.jwt_secret, account.id, session.id, expires_at)?;
    Ok(SignedIn {
        token,
        session,
        profile,
    })
}

pub async fn sign_out(state: &AppState, session_id: Uuid) -> AppResult<()> {
    let session = AuthSessions::find_by_id(session_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if session.revoked_at.is_some() {
        return Ok(());
    }

    let mut active: SessionActive = session.into();
    active.revoked_at = Set(Some(Utc::now().into()));
    active.update(&state.orm).await?;
    Ok(())
}

/// Resolve a bearer token to the current user.
pub async fn session_user(state: &AppState, token: &str) -> AppResult<AuthUser> {
    let (account_id, session_id) = decode_token(&state.config.jwt_secret, token)?;

    let session = AuthSessions::find_by_id(session_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_SESSION.into()))?;
    let live = session.account_id == account_id
        && session.revoked_at.is_none()
        && session.expires_at.with_timezone(&Utc) > Utc::now();
    if !live {
        return Err(AppError::Unauthorized(INVALID_SESSION.into()));
    }

    let profile = Users::find()
        .filter(UserCol::AuthUserId.eq(account_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User profile not found".into()))?;

    Ok(AuthUser {
        user_id: profile.id,
        account_id,
        session_id,
        role: profile.role,
    })
}
