//! Bearer token claims issued by the identity provider

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Parent,
    Driver,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    // Authorization checks
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator rights required".to_string()))
        }
    }

    pub fn require_driver(&self) -> Result<(), AppError> {
        match self.role {
            Role::Driver | Role::Admin => Ok(()),
            Role::Parent => Err(AppError::Authorization("Driver rights required".to_string())),
        }
    }

    /// Parents may only act for themselves; staff may act for anyone
    pub fn require_booking_access(&self, booked_by: Option<i32>) -> Result<(), AppError> {
        match self.role {
            Role::Driver | Role::Admin => Ok(()),
            Role::Parent if booked_by == Some(self.user_id) => Ok(()),
            Role::Parent => Err(AppError::Authorization("Not your booking".to_string())),
        }
    }
}
