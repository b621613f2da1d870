use std::str::FromStr;

use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{config::jwt_secret, dto::auth::Claims, error::AppError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Moderator,
    User,
}

impl Role {
    /// Roles allowed to use the catalog, promotion and order endpoints.
    pub const STAFF: [Role; 3] = [Role::Admin, Role::Moderator, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "moderator" => Ok(Role::Moderator),
            "user" => Ok(Role::User),
            _ => Err(AppError::Forbidden),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

pub fn ensure_role(user: &AuthUser, allowed: &[Role]) -> Result<(), AppError> {
    if !allowed.contains(&user.role) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_staff(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, &Role::STAFF)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?
            .trim();

        let secret = jwt_secret()?;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

        let user_id = Uuid::parse_str(&decoded.claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

        Ok(AuthUser {
            user_id,
            role: decoded.claims.role.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_roles_pass() {
        for role in Role::STAFF {
            let user = AuthUser {
                user_id: Uuid::new_v4(),
                role,
            };
            assert!(ensure_staff(&user).is_ok());
        }
    }

    #[test]
    fn admin_only_rejects_moderator() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Moderator,
        };
        assert!(matches!(
            ensure_role(&user, &[Role::Admin]),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn unknown_role_is_forbidden() {
        assert!(matches!("guest".parse::<Role>(), Err(AppError::Forbidden)));
        assert_eq!("moderator".parse::<Role>().unwrap(), Role::Moderator);
    }
}
