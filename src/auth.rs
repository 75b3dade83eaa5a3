//! # Authentication
//!
//! Bearer authentication for the `/api` routes. A token is accepted when it
//! matches a configured operator token or is an HS256 JWT signed with the
//! configured secret.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::config::AppConfig;
use crate::error::{ApiError, unauthorized};
use crate::server::AppState;

/// How the caller proved its identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    OperatorToken,
    Jwt,
}

/// Authenticated caller, inserted into request extensions by [`auth_middleware`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// `operator` for static tokens, the JWT `sub` claim otherwise
    pub subject: String,
    pub method: AuthMethod,
}

/// Claims read from bearer JWTs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

/// Authentication middleware that validates bearer tokens
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;
    let caller = authenticate(&config, token)?;
    tracing::debug!(subject = %caller.subject, method = ?caller.method, "Authenticated request");

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))?
        .to_str()
        .map_err(|_| unauthorized(Some("Invalid Authorization header")))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
}

fn authenticate(config: &AppConfig, token: &str) -> Result<Caller, ApiError> {
    let is_operator = config
        .operator_tokens
        .iter()
        .any(|configured| ConstantTimeEq::ct_eq(token.as_bytes(), configured.as_bytes()).into());

    if is_operator {
        return Ok(Caller {
            subject: "operator".to_string(),
            method: AuthMethod::OperatorToken,
        });
    }

    if let Some(secret) = &config.jwt_secret {
        let validation = Validation::new(Algorithm::HS256);
        if let Ok(data) = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        ) {
            return Ok(Caller {
                subject: data.claims.sub,
                method: AuthMethod::Jwt,
            });
        }
    }

    Err(unauthorized(Some("Invalid bearer token")))
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .ok_or_else(|| unauthorized(Some("Authentication required")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use jsonwebtoken::{EncodingKey, Header, encode};
    use tower::ServiceExt;

    const SECRET: &str = "test-secret-at-least-16";

    fn create_test_config() -> Arc<AppConfig> {
        Arc::new(AppConfig {
            operator_tokens: vec!["test-token-123".to_string()],
            jwt_secret: Some(SECRET.to_string()),
            ..Default::default()
        })
    }

    fn jwt(secret: &str, exp_offset_secs: i64) -> String {
        let exp = (chrono::Utc::now().timestamp() + exp_offset_secs) as u64;
        encode(
            &Header::new(Algorithm::HS256),
            &Claims {
                sub: "editor@example.com".to_string(),
                exp,
            },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    async fn run_middleware(config: Arc<AppConfig>, authorization: Option<String>) -> Response {
        async fn handler(caller: Caller) -> String {
            caller.subject
        }

        let mut builder = Request::builder().uri("/test");
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }

        Router::new()
            .route("/test", get(handler))
            .layer(axum::middleware::from_fn_with_state(config, auth_middleware))
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn missing_auth_header_returns_401() {
        let response = run_middleware(create_test_config(), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_auth_scheme_returns_401() {
        let response =
            run_middleware(create_test_config(), Some("Basic dGVzdDoxMjM=".to_string())).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_token_returns_401() {
        let response =
            run_middleware(create_test_config(), Some("Bearer wrong-token".to_string())).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn operator_token_passes_through() {
        let response =
            run_middleware(create_test_config(), Some("Bearer test-token-123".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "operator");
    }

    #[tokio::test]
    async fn signed_jwt_passes_through() {
        let token = jwt(SECRET, 3600);
        let response = run_middleware(create_test_config(), Some(format!("Bearer {token}"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "editor@example.com");
    }

    #[tokio::test]
    async fn expired_or_foreign_jwt_returns_401() {
        let expired = jwt(SECRET, -3600);
        let response =
            run_middleware(create_test_config(), Some(format!("Bearer {expired}"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let foreign = jwt("some-other-secret-value", 3600);
        let response =
            run_middleware(create_test_config(), Some(format!("Bearer {foreign}"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn jwt_rejected_when_no_secret_configured() {
        let config = Arc::new(AppConfig {
            operator_tokens: vec!["token".to_string()],
            ..Default::default()
        });
        let token = jwt(SECRET, 3600);
        let response = run_middleware(config, Some(format!("Bearer {token}"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn multiple_tokens_supported() {
        let config = Arc::new(AppConfig {
            operator_tokens: vec!["token-one".to_string(), "token-two".to_string()],
            ..Default::default()
        });

        for candidate in ["token-one", "token-two"] {
            let response =
                run_middleware(Arc::clone(&config), Some(format!("Bearer {candidate}"))).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
}
