use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenKind, UserClaims};
use crate::config::JwtConfig;

/// Why a token failed to decode. Request handling collapses all of these
/// into one client-facing error; the split exists for logging.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token signature does not match")]
    BadSignature,
    #[error("malformed token: {0}")]
    Malformed(jsonwebtoken::errors::Error),
    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

/// Signing and verification keys plus the token lifetimes, built once at
/// startup so a bad algorithm name fails the boot instead of a request.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl JwtKeys {
    pub fn from_config(config: &JwtConfig) -> anyhow::Result<Self> {
        // Symmetric keys only; the secret doubles as the verification key.
        let algorithm = match config.algorithm.as_str() {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => anyhow::bail!("JWT algorithm {other:?} is not a supported HMAC variant"),
        };
        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            algorithm,
            access_ttl: Duration::from_secs(config.access_ttl_secs.max(0) as u64),
            refresh_ttl: Duration::from_secs((config.refresh_ttl_days.max(0) as u64) * 86_400),
        })
    }

    /// Mint a token for `user`. Every call produces a fresh `jti`, so two
    /// tokens for the same user never collide on the deny list.
    pub fn issue(&self, user: UserClaims, kind: TokenKind) -> Result<String, TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = OffsetDateTime::now_utc() + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            user,
            exp: exp.unix_timestamp() as usize,
            jti: Uuid::new_v4(),
            refresh: kind == TokenKind::Refresh,
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(TokenError::Signing)?;
        debug!(user_id = %claims.user.uid, refresh = claims.refresh, jti = %claims.jti, "token issued");
        Ok(token)
    }

    /// Decode and validate signature and expiry. Deny-list and kind checks
    /// happen in the extractors, not here.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::new(self.algorithm);
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed(e),
            }
        })?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::Role;

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: secret.into(),
            algorithm: "HS256".into(),
            access_ttl_secs: 300,
            refresh_ttl_days: 2,
        })
        .expect("build keys")
    }

    fn snapshot() -> UserClaims {
        UserClaims {
            uid: Uuid::new_v4(),
            email: "reader@example.com".into(),
            role: Role::User,
        }
    }

    #[test]
    fn issue_and_decode_access_token() {
        let keys = make_keys("dev-secret");
        let user = snapshot();
        let token = keys.issue(user.clone(), TokenKind::Access).expect("issue");
        let claims = keys.decode(&token).expect("decode");
        assert_eq!(claims.user, user);
        assert!(!claims.refresh);
        assert_eq!(claims.kind(), TokenKind::Access);
    }

    #[test]
    fn refresh_token_carries_the_flag() {
        let keys = make_keys("dev-secret");
        let token = keys.issue(snapshot(), TokenKind::Refresh).expect("issue");
        let claims = keys.decode(&token).expect("decode");
        assert!(claims.refresh);
        assert_eq!(claims.kind(), TokenKind::Refresh);
    }

    #[test]
    fn every_token_gets_a_distinct_jti() {
        let keys = make_keys("dev-secret");
        let user = snapshot();
        let a = keys.issue(user.clone(), TokenKind::Access).expect("issue");
        let b = keys.issue(user, TokenKind::Access).expect("issue");
        let ja = keys.decode(&a).expect("decode").jti;
        let jb = keys.decode(&b).expect("decode").jti;
        assert_ne!(ja, jb);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = make_keys("dev-secret");
        // Two hours in the past, well beyond the default validation leeway.
        let claims = Claims {
            user: snapshot(),
            exp: (OffsetDateTime::now_utc().unix_timestamp() - 7200) as usize,
            jti: Uuid::new_v4(),
            refresh: false,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"dev-secret"),
        )
        .expect("encode");
        let err = keys.decode(&token).unwrap_err();
        assert!(matches!(err, TokenError::Expired));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let keys = make_keys("dev-secret");
        let other = make_keys("other-secret");
        let token = keys.issue(snapshot(), TokenKind::Access).expect("issue");
        let err = other.decode(&token).unwrap_err();
        assert!(matches!(err, TokenError::BadSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let keys = make_keys("dev-secret");
        let err = keys.decode("definitely.not.a-token").unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn non_hmac_algorithms_are_refused_at_startup() {
        let err = JwtKeys::from_config(&JwtConfig {
            secret: "dev-secret".into(),
            algorithm: "RS256".into(),
            access_ttl_secs: 300,
            refresh_ttl_days: 2,
        })
        .unwrap_err();
        assert!(err.to_string().contains("HMAC"));
    }
}
