use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::{Role, User};

/// Type of JWT: access or refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Snapshot of the user embedded in every token so role checks do not
/// need a database round-trip.
///
/// `email` and `role` default when absent: older tokens stay decodable,
/// and the extractors treat a missing email as missing credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    pub uid: Uuid,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl From<&User> for UserClaims {
    fn from(user: &User) -> Self {
        Self {
            uid: user.uid,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user: UserClaims, // embedded user snapshot
    pub exp: usize,       // expires at (unix timestamp)
    pub jti: Uuid,        // unique token id, the deny-list key
    pub refresh: bool,    // distinguishes refresh from access tokens
}

impl Claims {
    pub fn kind(&self) -> TokenKind {
        if self.refresh {
            TokenKind::Refresh
        } else {
            TokenKind::Access
        }
    }
}
