//! Auth context extraction
//!
//! Authentication itself lives in the upstream session service; by the time
//! a request reaches this service the principal has already been verified
//! and is carried in trusted headers. This module extracts that principal
//! into an [`AuthContext`] and provides the authorization helpers the
//! handlers and services use.

use crate::errors::{AppError, Result};
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Principal role as supplied by the session layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Reader,
    Author,
    Admin,
}

impl Role {
    /// Parse a role header value; unknown values degrade to Reader
    pub fn from_header(value: &str) -> Self {
        match value {
            "admin" => Role::Admin,
            "author" => Role::Author,
            _ => Role::Reader,
        }
    }
}

/// Extracted authentication context available to handlers
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Authenticated user, if any. Anonymous requests carry `None`.
    pub user_id: Option<Uuid>,

    /// Role of the principal; anonymous requests are Readers.
    pub role: Role,

    /// Request ID for tracing
    pub request_id: String,
}

impl AuthContext {
    /// Build an anonymous context (mostly useful in tests)
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            role: Role::Reader,
            request_id: String::new(),
        }
    }

    /// Check whether the principal is an admin
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Require a signed-in user, returning the id
    pub fn require_user(&self) -> Result<Uuid> {
        self.user_id.ok_or_else(|| AppError::AuthenticationRequired {
            message: "This action requires a signed-in user".to_string(),
        })
    }

    /// Check whether the principal may modify a resource owned by `owner_id`
    pub fn can_modify(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.user_id == Some(owner_id)
    }

    /// Require ownership (or admin), returning Forbidden otherwise
    pub fn require_owner(&self, owner_id: Uuid) -> Result<()> {
        if self.can_modify(owner_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden {
                message: "Only the owner or an admin may modify this resource".to_string(),
            })
        }
    }
}

/// Axum extractor for AuthContext
///
/// Never rejects: a request without principal headers extracts as an
/// anonymous context, and the operation decides whether that is acceptable.
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        // Extract request ID
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // Extract the verified principal, if the session layer supplied one
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok());

        let role = parts
            .headers
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
            .map(Role::from_header)
            .unwrap_or(Role::Reader);

        Ok(AuthContext {
            user_id,
            role,
            request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::from_header("admin"), Role::Admin);
        assert_eq!(Role::from_header("author"), Role::Author);
        assert_eq!(Role::from_header("reader"), Role::Reader);
        assert_eq!(Role::from_header("garbage"), Role::Reader);
    }

    #[test]
    fn test_require_user() {
        let anon = AuthContext::anonymous();
        assert!(anon.require_user().is_err());

        let id = Uuid::new_v4();
        let ctx = AuthContext {
            user_id: Some(id),
            role: Role::Author,
            request_id: "r1".into(),
        };
        assert_eq!(ctx.require_user().unwrap(), id);
    }

    #[test]
    fn test_ownership() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        let ctx = AuthContext {
            user_id: Some(owner),
            role: Role::Author,
            request_id: "r1".into(),
        };
        assert!(ctx.can_modify(owner));
        assert!(!ctx.can_modify(other));
        assert!(ctx.require_owner(other).is_err());

        let admin = AuthContext {
            user_id: Some(other),
            role: Role::Admin,
            request_id: "r2".into(),
        };
        assert!(admin.can_modify(owner));
        assert!(admin.require_owner(owner).is_ok());
    }
}
