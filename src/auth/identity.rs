use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use super::Role;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Who is calling, as far as the `Authorization` header says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    Customer(String),
    Pharmacy(String),
    /// A token was sent but it is malformed, forged or expired.
    Invalid,
}

impl Identity {
    pub fn role(&self) -> Option<Role> {
        match self {
            Identity::Customer(_) => Some(Role::Customer),
            Identity::Pharmacy(_) => Some(Role::Pharmacy),
            Identity::Anonymous | Identity::Invalid => None,
        }
    }

    pub fn customer_id(&self) -> ApiResult<&str> {
        match self {
            Identity::Customer(id) => Ok(id),
            other => Err(other.reject()),
        }
    }

    pub fn pharmacy_id(&self) -> ApiResult<&str> {
        match self {
            Identity::Pharmacy(id) => Ok(id),
            other => Err(other.reject()),
        }
    }

    /// Customer attribution for routes that also serve guests.
    pub fn optional_customer(&self) -> ApiResult<Option<&str>> {
        match self {
            Identity::Anonymous => Ok(None),
            Identity::Customer(id) => Ok(Some(id)),
            other => Err(other.reject()),
        }
    }

    fn reject(&self) -> ApiError {
        match self {
            Identity::Anonymous => ApiError::unauthorized("No token, authorization denied"),
            Identity::Invalid => ApiError::unauthorized("Token is not valid"),
            Identity::Customer(_) | Identity::Pharmacy(_) => ApiError::forbidden("Forbidden"),
        }
    }
}

fn bearer_token(value: &str) -> Option<&str> {
    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}

/// Decodes the bearer token once per request and stores the [`Identity`]
/// as a request extension.
pub async fn identify(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let identity = match req.headers().get(AUTHORIZATION) {
        None => Identity::Anonymous,
        Some(value) => match value.to_str().ok().and_then(bearer_token) {
            None => Identity::Invalid,
            Some(token) => match state.tokens.verify(token) {
                Ok(claims) => match claims.role {
                    Role::Customer => Identity::Customer(claims.id),
                    Role::Pharmacy => Identity::Pharmacy(claims.id),
                },
                Err(e) => {
                    log::debug!("Rejected bearer token: {}", e);
                    Identity::Invalid
                }
            },
        },
    };

    req.extensions_mut().insert(identity);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }

    #[test]
    fn role_guards_map_to_statuses() {
        let anonymous = Identity::Anonymous.customer_id().unwrap_err();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let invalid = Identity::Invalid.pharmacy_id().unwrap_err();
        assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);

        let wrong_role = Identity::Customer("c1".into()).pharmacy_id().unwrap_err();
        assert_eq!(wrong_role.status(), StatusCode::FORBIDDEN);

        assert_eq!(Identity::Pharmacy("p1".into()).pharmacy_id().unwrap(), "p1");
    }

    #[test]
    fn guests_may_stay_anonymous() {
        assert_eq!(Identity::Anonymous.optional_customer().unwrap(), None);
        assert_eq!(
            Identity::Customer("c1".into()).optional_customer().unwrap(),
            Some("c1")
        );
        assert!(Identity::Pharmacy("p1".into()).optional_customer().is_err());
        assert!(Identity::Invalid.optional_customer().is_err());
    }
}
