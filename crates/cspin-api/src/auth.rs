//! # Authentication & Authorization Middleware
//!
//! Bearer token middleware with two roles.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {role}:{principal}:{secret}
//! ```
//!
//! `role` is `player` or `admin`. `principal` may itself contain `:`; the
//! secret is everything after the last `:`. The secret is compared in
//! constant time against `AUTH_TOKEN`. Principals in the reserved `cspin:`
//! namespace are rejected, so no caller can act as the engine.
//!
//! The `admin` role opens the administrative routes. Whether the caller may
//! actually change thresholds is decided by the engine, which compares the
//! principal against the designated administrator.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cspin_core::Principal;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{AppError, ErrorBody, ErrorDetail};

// ── Role ────────────────────────────────────────────────────────────────────

/// Caller roles, ordered by privilege: `Player < Admin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Classifies, escalates and reads handles.
    Player,
    /// Everything a player can do, plus threshold administration.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Admin => "admin",
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Authenticated caller, injected by [`auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub role: Role,
    pub principal: Principal,
}

impl CallerIdentity {
    /// Whether the caller has at least `minimum`.
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }
}

/// Returns 401 if the middleware did not inject an identity.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Check that the caller has at least the required role. 403 otherwise.
pub fn require_role(caller: &CallerIdentity, minimum: Role) -> Result<(), AppError> {
    if caller.has_role(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            minimum.as_str(),
            caller.role.as_str()
        )))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// The shared bearer secret. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretToken(String);

impl SecretToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Auth configuration injected into request extensions.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// `None` disables authentication.
    pub token: Option<SecretToken>,
    /// Identity assumed by every request when authentication is disabled.
    pub default_principal: Principal,
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer secrets.
///
/// On a length mismatch a dummy comparison still runs.
fn constant_time_token_eq(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token of the form `{role}:{principal}:{secret}`.
pub fn parse_bearer_token(provided: &str, expected: &SecretToken) -> Result<CallerIdentity, String> {
    let (role_str, rest) = provided
        .split_once(':')
        .ok_or("invalid token format, expected {role}:{principal}:{secret}")?;
    let (principal_str, secret) = rest
        .rsplit_once(':')
        .ok_or("invalid token format, expected {role}:{principal}:{secret}")?;

    if !constant_time_token_eq(secret.as_bytes(), expected.as_bytes()) {
        return Err("invalid bearer token".into());
    }

    let role = match role_str {
        "player" => Role::Player,
        "admin" => Role::Admin,
        other => return Err(format!("unknown role: {other}")),
    };

    let principal = Principal::new(principal_str).map_err(|e| e.to_string())?;

    Ok(CallerIdentity { role, principal })
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the `Authorization` header and inject a [`CallerIdentity`].
///
/// With authentication disabled every request runs as an administrator
/// acting as [`AuthConfig::default_principal`].
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let Some(config) = request.extensions().get::<AuthConfig>().cloned() else {
        tracing::error!("auth middleware installed without AuthConfig extension");
        return unauthorized_response("authentication is not configured");
    };

    let Some(expected) = config.token.as_ref() else {
        request.extensions_mut().insert(CallerIdentity {
            role: Role::Admin,
            principal: config.default_principal.clone(),
        });
        return next.run(request).await;
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(provided) => match parse_bearer_token(provided, expected) {
                Ok(identity) => {
                    tracing::debug!(principal = %identity.principal, role = identity.role.as_str(), "caller authenticated");
                    request.extensions_mut().insert(identity);
                    next.run(request).await
                }
                Err(msg) => {
                    tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                    unauthorized_response(&msg)
                }
            },
            None => {
                tracing::warn!("authentication failed: non-Bearer authorization scheme");
                unauthorized_response("authorization header must use Bearer scheme")
            }
        },
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            unauthorized_response("missing authorization header")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn secret() -> SecretToken {
        SecretToken::new("s3cret")
    }

    fn test_app(token: Option<SecretToken>) -> Router {
        let auth_config = AuthConfig {
            token,
            default_principal: Principal::new("admin").unwrap(),
        };
        Router::new()
            .route(
                "/whoami",
                get(|caller: CallerIdentity| async move {
                    format!("{}:{}", caller.role.as_str(), caller.principal)
                }),
            )
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(auth_config))
    }

    async fn call(app: Router, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn parses_player_token() {
        let id = parse_bearer_token("player:alice:s3cret", &secret()).unwrap();
        assert_eq!(id.role, Role::Player);
        assert_eq!(id.principal.as_str(), "alice");
    }

    #[test]
    fn principal_may_contain_colons() {
        let id = parse_bearer_token("admin:org:ops:root:s3cret", &secret()).unwrap();
        assert_eq!(id.role, Role::Admin);
        assert_eq!(id.principal.as_str(), "org:ops:root");
    }

    #[test]
    fn rejects_wrong_secret_and_bad_shapes() {
        assert!(parse_bearer_token("player:alice:wrong", &secret()).is_err());
        assert!(parse_bearer_token("player:alice:s3cre", &secret()).is_err());
        assert!(parse_bearer_token("s3cret", &secret()).is_err());
        assert!(parse_bearer_token("player:s3cret", &secret()).is_err());
        assert!(parse_bearer_token("root:alice:s3cret", &secret())
            .unwrap_err()
            .contains("unknown role"));
    }

    #[test]
    fn rejects_reserved_principal() {
        let err = parse_bearer_token("player:cspin:engine:s3cret", &secret()).unwrap_err();
        assert!(err.contains("reserved"));
    }

    #[test]
    fn role_ordering() {
        assert!(Role::Admin > Role::Player);
        let player = CallerIdentity {
            role: Role::Player,
            principal: Principal::new("alice").unwrap(),
        };
        assert!(require_role(&player, Role::Player).is_ok());
        assert!(matches!(
            require_role(&player, Role::Admin),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn debug_redacts_secret() {
        let config = AuthConfig {
            token: Some(secret()),
            default_principal: Principal::new("admin").unwrap(),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("REDACTED"));
    }

    #[tokio::test]
    async fn valid_token_injects_identity() {
        let (status, body) = call(test_app(Some(secret())), Some("Bearer player:alice:s3cret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "player:alice");
    }

    #[tokio::test]
    async fn missing_header_rejected() {
        let (status, body) = call(test_app(Some(secret())), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let err: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(err["error"]["code"], "UNAUTHORIZED");
        assert!(err["error"]["message"].as_str().unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn non_bearer_scheme_rejected() {
        let (status, body) = call(test_app(Some(secret())), Some("Basic dXNlcjpwYXNz")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Bearer scheme"));
    }

    #[tokio::test]
    async fn auth_disabled_runs_as_admin() {
        let (status, body) = call(test_app(None), Some("Bearer player:alice:whatever")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "admin:admin");
    }
}
