//! Bearer-token authentication middleware (spec §4.3).

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

/// Authentication/authorization context handed to the wrapped handler on
/// success.
#[derive(Clone, Debug)]
pub struct AuthInfo {
    pub token: String,
    pub claims: HashMap<String, Value>,
    pub scopes: Vec<String>,
}

impl AuthInfo {
    /// The sentinel used when `allow_unauthenticated` lets a request with no
    /// bearer token through (spec §4.3).
    pub fn anonymous() -> Self {
        Self {
            token: String::new(),
            claims: HashMap::new(),
            scopes: Vec::new(),
        }
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// Error produced by a [`TokenVerifier`].
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct VerifyError(pub String);

/// Verifies a bearer token and produces the caller's [`AuthInfo`].
///
/// Implementors own the actual token format (JWT, opaque, introspection
/// call, ...); the middleware only needs a yes/no plus claims and scopes.
#[async_trait::async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Option<AuthInfo>, VerifyError>;
}

/// Outcome of running [`AuthMiddleware::authenticate`].
pub enum AuthOutcome {
    Authenticated(AuthInfo),
    /// Missing/empty token, no token at all, or the verifier returned `None`.
    Unauthorized(String),
    /// Token verified but lacked a required scope.
    Forbidden(String),
}

/// Bearer-token extraction, verification, and scope enforcement (spec §4.3).
pub struct AuthMiddleware {
    verifier: Arc<dyn TokenVerifier>,
    required_scopes: Vec<String>,
    allow_unauthenticated: bool,
    pub realm: String,
}

impl AuthMiddleware {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            verifier,
            required_scopes: Vec::new(),
            allow_unauthenticated: false,
            realm: "mcp".to_string(),
        }
    }

    pub fn with_required_scopes(mut self, scopes: Vec<String>) -> Self {
        self.required_scopes = scopes;
        self
    }

    pub fn allow_unauthenticated(mut self, allow: bool) -> Self {
        self.allow_unauthenticated = allow;
        self
    }

    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    /// Extract the bearer token from an `Authorization` header value.
    /// The `Bearer` prefix match is case-sensitive, per spec §4.3.
    fn extract_bearer(authorization: Option<&str>) -> Option<&str> {
        let header = authorization?;
        header.strip_prefix("Bearer ").filter(|tok| !tok.is_empty())
    }

    /// Run the full extract/verify/scope-check sequence.
    pub async fn authenticate(&self, authorization: Option<&str>) -> AuthOutcome {
        let token = match Self::extract_bearer(authorization) {
            Some(tok) => tok,
            None => {
                if self.allow_unauthenticated {
                    return AuthOutcome::Authenticated(AuthInfo::anonymous());
                }
                return AuthOutcome::Unauthorized("Missing bearer token".to_string());
            }
        };

        let verified = match self.verifier.verify(token).await {
            Ok(Some(info)) => info,
            Ok(None) => {
                return AuthOutcome::Unauthorized("Invalid or expired token".to_string());
            }
            Err(e) => return AuthOutcome::Unauthorized(e.0),
        };

        for scope in &self.required_scopes {
            if !verified.has_scope(scope) {
                return AuthOutcome::Forbidden(format!("Missing required scope: {scope}"));
            }
        }

        AuthOutcome::Authenticated(verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticVerifier {
        valid_token: &'static str,
        scopes: Vec<String>,
    }

    #[async_trait::async_trait]
    impl TokenVerifier for StaticVerifier {
        async fn verify(&self, token: &str) -> Result<Option<AuthInfo>, VerifyError> {
            if token == self.valid_token {
                Ok(Some(AuthInfo {
                    token: token.to_string(),
                    claims: HashMap::new(),
                    scopes: self.scopes.clone(),
                }))
            } else {
                Ok(None)
            }
        }
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized_by_default() {
        let mw = AuthMiddleware::new(Arc::new(StaticVerifier {
            valid_token: "good",
            scopes: vec![],
        }));
        assert!(matches!(
            mw.authenticate(None).await,
            AuthOutcome::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn missing_token_allowed_when_configured() {
        let mw = AuthMiddleware::new(Arc::new(StaticVerifier {
            valid_token: "good",
            scopes: vec![],
        }))
        .allow_unauthenticated(true);

        match mw.authenticate(None).await {
            AuthOutcome::Authenticated(info) => assert_eq!(info.token, ""),
            _ => panic!("expected anonymous auth"),
        }
    }

    #[tokio::test]
    async fn invalid_token_is_unauthorized() {
        let mw = AuthMiddleware::new(Arc::new(StaticVerifier {
            valid_token: "good",
            scopes: vec![],
        }));
        assert!(matches!(
            mw.authenticate(Some("Bearer wrong")).await,
            AuthOutcome::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn valid_token_without_required_scope_is_forbidden() {
        let mw = AuthMiddleware::new(Arc::new(StaticVerifier {
            valid_token: "good",
            scopes: vec!["read".to_string()],
        }))
        .with_required_scopes(vec!["write".to_string()]);

        assert!(matches!(
            mw.authenticate(Some("Bearer good")).await,
            AuthOutcome::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn valid_token_with_required_scope_succeeds() {
        let mw = AuthMiddleware::new(Arc::new(StaticVerifier {
            valid_token: "good",
            scopes: vec!["write".to_string()],
        }))
        .with_required_scopes(vec!["write".to_string()]);

        assert!(matches!(
            mw.authenticate(Some("Bearer good")).await,
            AuthOutcome::Authenticated(_)
        ));
    }

    #[tokio::test]
    async fn lowercase_bearer_prefix_is_rejected() {
        let mw = AuthMiddleware::new(Arc::new(StaticVerifier {
            valid_token: "good",
            scopes: vec![],
        }));
        assert!(matches!(
            mw.authenticate(Some("bearer good")).await,
            AuthOutcome::Unauthorized(_)
        ));
    }
}
