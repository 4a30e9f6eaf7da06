//! Credential issuance: password hashing, bearer tokens, signup and login.

use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AuthSettings;
use crate::db::models::{NewUser, User, VerificationTier};
use crate::error::{ApiResult, Error};
use crate::models::{AuthResponse, LoginRequest, MessageResponse, PublicUser, SignupRequest};
use crate::services::SharedClock;
use crate::store::Store;

const MIN_PASSWORD_LEN: usize = 8;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies HS256 bearer tokens. Expiry is judged by the injected
/// clock rather than the system time.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    clock: SharedClock,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_days: i64, clock: SharedClock) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(ttl_days),
            clock,
        }
    }

    pub fn issue(&self, user: &User) -> ApiResult<String> {
        let now = self.clock.utc();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| Error::internal(format!("failed to sign token: {err}")))
    }

    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|err| {
                warn!(error = %err, "rejected bearer token");
                Error::unauthorized("Invalid or expired token")
            })?
            .claims;

        if claims.exp <= self.clock.utc().timestamp() {
            return Err(Error::unauthorized("Invalid or expired token"));
        }
        Ok(claims)
    }
}

/// bcrypt hashing with a configurable cost.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> ApiResult<String> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    pub fn verify(&self, password: &str, hash: &str) -> ApiResult<bool> {
        Ok(bcrypt::verify(password, hash)?)
    }
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    tokens: TokenIssuer,
    hasher: PasswordHasher,
    clock: SharedClock,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, settings: &AuthSettings, clock: SharedClock) -> Self {
        Self {
            store,
            tokens: TokenIssuer::new(&settings.jwt_secret, settings.token_ttl_days, clock.clone()),
            hasher: PasswordHasher::new(settings.bcrypt_cost),
            clock,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn signup(&self, request: SignupRequest) -> ApiResult<AuthResponse> {
        let email = normalise_email(&request.email);
        validate_signup(&email, &request)?;

        if self.store.find_user_by_email(&email)?.is_some() {
            return Err(Error::conflict("Email already registered"));
        }

        let user = self.store.insert_user(NewUser {
            id: Uuid::new_v4(),
            email,
            password_hash: self.hasher.hash(&request.password)?,
            display_name: request.display_name.trim().to_owned(),
            verification_tier: VerificationTier::Unverified,
            city: non_blank(request.city),
            phone: non_blank(request.phone),
            created_at: self.clock.utc(),
        })?;

        info!(user_id = %user.id, "user signed up");
        self.respond_with_token(user)
    }

    pub fn login(&self, request: LoginRequest) -> ApiResult<AuthResponse> {
        let email = normalise_email(&request.email);
        let Some(user) = self.store.find_user_by_email(&email)? else {
            warn!("login attempt for unknown account");
            return Err(invalid_credentials());
        };

        if !self.hasher.verify(&request.password, &user.password_hash)? {
            warn!(user_id = %user.id, "login attempt with wrong password");
            return Err(invalid_credentials());
        }

        self.respond_with_token(user)
    }

    /// Always answers the same way so callers cannot probe which emails exist.
    pub fn forgot_password(&self, email: &str) -> ApiResult<MessageResponse> {
        if let Some(user) = self.store.find_user_by_email(&normalise_email(email))? {
            info!(user_id = %user.id, "password reset requested");
        }
        Ok(MessageResponse {
            message: "If an account exists, a reset link has been sent.".to_owned(),
        })
    }

    /// Profile of the token holder. A token for a deleted account is treated
    /// as invalid.
    pub fn me(&self, user_id: Uuid) -> ApiResult<PublicUser> {
        self.store
            .find_user(user_id)?
            .map(PublicUser::from)
            .ok_or_else(|| Error::unauthorized("Invalid or expired token"))
    }

    fn respond_with_token(&self, user: User) -> ApiResult<AuthResponse> {
        Ok(AuthResponse {
            access_token: self.tokens.issue(&user)?,
            user: user.into(),
        })
    }
}

fn invalid_credentials() -> Error {
    Error::unauthorized("Invalid credentials")
}

fn normalise_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn validate_signup(email: &str, request: &SignupRequest) -> ApiResult<()> {
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err(Error::invalid_request("email must be a valid email address"));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::invalid_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if request.display_name.trim().is_empty() {
        return Err(Error::invalid_request("displayName must not be empty"));
    }
    Ok(())
}
