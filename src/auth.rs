//! Console Authentication
//!
//! Bearer-token session for the dist-traceroute master API.
//!
//! # Session invariant
//!
//! The token and its decoded claims are written together under one lock and
//! cleared together. Tokens that are not JWTs are accepted as opaque bearer
//! values and decode to an empty claim set.
//!
//! # Flows
//!
//! - `AuthModule::fetch_auth_token` - exchange credentials for a token
//! - `AuthModule::logout` - drop the session and go to the login route
//! - `AuthState::unset_token` - called by the session-expiry interceptor on 401

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::http::ApiClient;
use crate::navigation::Navigator;

/// Decoded token claims
pub type Claims = serde_json::Map<String, Value>;

/// Login credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: &str, password: &str) -> Self {
        Self {
            user: user.to_string(),
            password: password.to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `Authorization` header produced from the current session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthHeader {
    #[serde(rename = "Authorization")]
    authorization: String,
}

impl AuthHeader {
    /// Header name
    pub const NAME: &'static str = "Authorization";

    fn bearer(token: &str) -> Self {
        Self {
            authorization: format!("Bearer {}", token),
        }
    }

    /// Header value, `Bearer <token>`
    pub fn value(&self) -> &str {
        &self.authorization
    }
}

#[derive(Debug, Clone, Default)]
struct Session {
    token: String,
    claims: Claims,
}

/// Session slice of the store
#[derive(Debug, Default)]
pub struct AuthState {
    session: RwLock<Session>,
}

impl AuthState {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Getters
    // ------------------------------------------------------------------

    /// True iff a token is held
    pub fn is_authorized(&self) -> bool {
        !self.session.read().token.is_empty()
    }

    /// Bearer header for the current token (empty bearer value when logged out)
    pub fn auth_header(&self) -> AuthHeader {
        AuthHeader::bearer(&self.session.read().token)
    }

    /// Claims decoded from the current token
    pub fn claims(&self) -> Claims {
        self.session.read().claims.clone()
    }

    /// Subject of the session, if the token carries one
    pub fn subject(&self) -> Option<String> {
        let session = self.session.read();
        claim(&session.claims, "sub")
            .or_else(|| claim(&session.claims, "Username"))
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// Expiry of the session from the `exp` claim
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let session = self.session.read();
        let exp = claim(&session.claims, "exp")?.as_i64()?;
        Utc.timestamp_opt(exp, 0).single()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Store a token together with its decoded claims
    pub fn set_token(&self, token: &str) -> Result<(), AuthError> {
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }

        let claims = match decode_claims(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Token is not a JWT, keeping it opaque: {}", e);
                Claims::new()
            }
        };

        let mut session = self.session.write();
        session.token = token.to_string();
        session.claims = claims;
        Ok(())
    }

    /// Drop token and claims
    pub fn unset_token(&self) {
        let mut session = self.session.write();
        session.token.clear();
        session.claims.clear();
    }
}

/// Look a claim up at top level, then inside the master's `Payload` object
fn claim<'a>(claims: &'a Claims, key: &str) -> Option<&'a Value> {
    claims
        .get(key)
        .or_else(|| claims.get("Payload").and_then(|p| p.get(key)))
}

/// Decode JWT claims without verifying the signature.
///
/// The signing secret lives on the master only; the console reads claims
/// for display and expiry, the server remains the one validating tokens.
pub fn decode_claims(token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// Login and logout actions
#[derive(Clone)]
pub struct AuthModule {
    state: Arc<AuthState>,
    api: ApiClient,
    navigator: Arc<dyn Navigator>,
    login_route: String,
}

impl AuthModule {
    pub fn new(
        state: Arc<AuthState>,
        api: ApiClient,
        navigator: Arc<dyn Navigator>,
        login_route: &str,
    ) -> Self {
        Self {
            state,
            api,
            navigator,
            login_route: login_route.to_string(),
        }
    }

    /// Read-only session state
    pub fn state(&self) -> &Arc<AuthState> {
        &self.state
    }

    pub fn is_authorized(&self) -> bool {
        self.state.is_authorized()
    }

    pub fn auth_header(&self) -> AuthHeader {
        self.state.auth_header()
    }

    pub fn claims(&self) -> Claims {
        self.state.claims()
    }

    /// Exchange credentials for a bearer token.
    ///
    /// Returns true when a token was stored. Failures are logged and leave
    /// the session untouched.
    pub async fn fetch_auth_token(&self, credentials: &Credentials) -> bool {
        let query = [
            ("user", credentials.user.clone()),
            ("password", credentials.password.clone()),
        ];

        let body = match self.api.get_text("/auth", &query).await {
            Ok(body) => body,
            Err(e) => {
                warn!(user = %credentials.user, "Credential exchange failed: {}", e);
                return false;
            }
        };

        let token = parse_token_body(&body);
        match self.state.set_token(&token) {
            Ok(()) => {
                info!(user = %credentials.user, "Authenticated");
                true
            }
            Err(e) => {
                warn!(user = %credentials.user, "Credential exchange returned no usable token: {}", e);
                false
            }
        }
    }

    /// Drop the session and navigate to the login route
    pub fn logout(&self) {
        self.state.unset_token();
        info!("Logged out");

        if self.navigator.current_path() != self.login_route {
            self.navigator.push(&self.login_route);
        }
    }
}

/// The master writes the raw token; tolerate a JSON string too
fn parse_token_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.starts_with('"') {
        if let Ok(Value::String(token)) = serde_json::from_str::<Value>(trimmed) {
            return token;
        }
    }
    trimmed.to_string()
}
