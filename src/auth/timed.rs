use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use time::OffsetDateTime;

type HmacSha256 = Hmac<Sha256>;

const CLOCK_SKEW_LEEWAY_SECS: i64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimedTokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token is older than the allowed age")]
    Expired,
}

/// URL-safe signed-timestamp codec for email verification links.
///
/// Deliberately simpler than the session JWTs: the payload is just the
/// email plus the issue time, so there is no jti to deny and nothing to
/// refresh. Shape: `base64url(payload).issued_at.hex(hmac_sha256)`.
#[derive(Clone)]
pub struct TimedTokenCodec {
    secret: Vec<u8>,
}

impl TimedTokenCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    pub fn issue(&self, payload: &str) -> String {
        let issued_at = OffsetDateTime::now_utc().unix_timestamp();
        let body = URL_SAFE_NO_PAD.encode(payload.as_bytes());
        let signature = self.sign(&body, issued_at);
        format!("{body}.{issued_at}.{signature}")
    }

    /// Recover the payload, rejecting tokens with a bad signature or an
    /// issue time more than `max_age_secs` in the past. The signature is
    /// checked first; age only means something on an authentic token.
    pub fn decode(&self, token: &str, max_age_secs: u64) -> Result<String, TimedTokenError> {
        let mut parts = token.split('.');
        let (Some(body), Some(ts), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TimedTokenError::Malformed);
        };
        let issued_at: i64 = ts.parse().map_err(|_| TimedTokenError::Malformed)?;

        let expected = hex::decode(signature).map_err(|_| TimedTokenError::Malformed)?;
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(body.as_bytes());
        mac.update(b".");
        mac.update(ts.as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| TimedTokenError::BadSignature)?;

        // A future issue time would make the age negative and the window
        // unbounded; 60s of leeway covers ordinary clock skew.
        let age = OffsetDateTime::now_utc().unix_timestamp() - issued_at;
        if age < -CLOCK_SKEW_LEEWAY_SECS || age > max_age_secs as i64 {
            return Err(TimedTokenError::Expired);
        }

        let payload = URL_SAFE_NO_PAD
            .decode(body.as_bytes())
            .map_err(|_| TimedTokenError::Malformed)?;
        String::from_utf8(payload).map_err(|_| TimedTokenError::Malformed)
    }

    fn sign(&self, body: &str, issued_at: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(body.as_bytes());
        mac.update(b".");
        mac.update(issued_at.to_string().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
