use crate::errors::ServiceError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Identity headers stamped by the authenticating gateway. This service never
/// verifies credentials itself; it trusts the upstream assertion and enforces
/// domain-level permissions only.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

impl FromStr for Role {
    type Err = ServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            other => Err(ServiceError::Unauthorized(format!(
                "Unknown role '{}' in {} header",
                other, USER_ROLE_HEADER
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Member => write!(f, "member"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// The caller on whose behalf a request runs.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Actor {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins may act on any record; members only on their own.
    pub fn can_act_for(&self, owner: Uuid) -> bool {
        self.is_admin() || self.user_id == owner
    }

    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "Administrator role required".to_string(),
            ))
        }
    }

    pub fn require_self_or_admin(&self, owner: Uuid) -> Result<(), ServiceError> {
        if self.can_act_for(owner) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "Only the owner or an administrator may do this".to_string(),
            ))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ServiceError::Unauthorized(format!("Missing {} header", USER_ID_HEADER))
            })?;
        let user_id = Uuid::parse_str(user_id).map_err(|_| {
            ServiceError::Unauthorized(format!("Invalid {} header", USER_ID_HEADER))
        })?;

        let role = match parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            Some(raw) => raw.parse::<Role>()?,
            // No asserted role means least privilege
            None => Role::Member,
        };

        let username = parts
            .headers
            .get(USER_NAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| user_id.to_string());

        Ok(Actor {
            user_id,
            username,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Json, Router,
    };
    use tower::ServiceExt;

    async fn whoami(actor: Actor) -> Json<Actor> {
        Json(actor)
    }

    fn app() -> Router {
        Router::new().route("/whoami", get(whoami))
    }

    #[tokio::test]
    async fn extracts_actor_from_headers() {
        let id = Uuid::new_v4();
        let response = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header(USER_ID_HEADER, id.to_string())
                    .header(USER_NAME_HEADER, "vera")
                    .header(USER_ROLE_HEADER, "admin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let actor: Actor = serde_json::from_slice(&body).unwrap();
        assert_eq!(actor.user_id, id);
        assert_eq!(actor.username, "vera");
        assert!(actor.is_admin());
    }

    #[tokio::test]
    async fn missing_user_id_is_unauthorized() {
        let response = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let response = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header(USER_ID_HEADER, Uuid::new_v4().to_string())
                    .header(USER_ROLE_HEADER, "superuser")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_role_defaults_to_member() {
        let response = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header(USER_ID_HEADER, Uuid::new_v4().to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let actor: Actor = serde_json::from_slice(&body).unwrap();
        assert_eq!(actor.role, Role::Member);
    }

    #[test]
    fn permission_helpers() {
        let owner = Uuid::new_v4();
        let member = Actor::new(owner, "sam", Role::Member);
        let other = Actor::new(Uuid::new_v4(), "kim", Role::Member);
        let admin = Actor::new(Uuid::new_v4(), "root", Role::Admin);

        assert!(member.require_self_or_admin(owner).is_ok());
        assert!(other.require_self_or_admin(owner).is_err());
        assert!(admin.require_self_or_admin(owner).is_ok());

        assert!(member.require_admin().is_err());
        assert!(admin.require_admin().is_ok());
    }
}
